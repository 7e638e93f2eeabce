//! REST client for the file server.

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::file::{FileEntry, FileId};
use crate::settings::Settings;

/// Progress callback, called with whole percentages 0..=100.
pub type ProgressFn = Box<dyn FnMut(u8) + Send + 'static>;

/// A six-digit numeric secret gating a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupCode(String);

impl PickupCode {
    pub const LEN: usize = 6;

    /// Validate a code before it goes anywhere near the network.
    pub fn parse(code: &str) -> CanvasResult<Self> {
        let code = code.trim();
        if code.len() != Self::LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CanvasError::Validation(format!(
                "Pickup code must be {} digits",
                Self::LEN
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A file to upload and where to pin it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
    /// Horizontal position in percent.
    pub x: f64,
    /// Vertical position in percent.
    pub y: f64,
    pub pickup_code: Option<PickupCode>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>, x: f64, y: f64) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            data,
            x,
            y,
            pickup_code: None,
        }
    }

    /// Read a file from disk.
    pub fn from_path(path: &Path, x: f64, y: f64) -> CanvasResult<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, data, x, y))
    }

    pub fn with_pickup_code(mut self, code: PickupCode) -> Self {
        self.pickup_code = Some(code);
        self
    }

    /// Reject positions outside the canvas.
    pub fn validate(&self) -> CanvasResult<()> {
        for (axis, v) in [("x", self.x), ("y", self.y)] {
            if !(0.0..=100.0).contains(&v) {
                return Err(CanvasError::Validation(format!("{} must be within 0..=100, got {}", axis, v)));
            }
        }
        Ok(())
    }
}

/// Operations against the file server.
///
/// Implementations are shared with background threads, so they must be
/// `Send + Sync`.
pub trait FileApi: Send + Sync {
    /// Fetch all files. Returns an empty list when no server is configured.
    fn list_files(&self) -> CanvasResult<Vec<FileEntry>>;

    /// Upload a file, reporting progress.
    fn upload(&self, request: UploadRequest, progress: Option<ProgressFn>) -> CanvasResult<FileEntry>;

    /// Confirm a new position.
    fn update_position(&self, id: FileId, x: f64, y: f64) -> CanvasResult<()>;

    fn delete_file(&self, id: FileId) -> CanvasResult<()>;

    /// Check a pickup code without downloading.
    fn verify_pickup_code(&self, id: FileId, code: &PickupCode) -> CanvasResult<()>;

    /// URL that downloads the file.
    fn download_url(&self, id: FileId, code: Option<&PickupCode>) -> CanvasResult<String>;
}

#[derive(Debug, Serialize)]
struct PositionRequest {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// [`FileApi`] over HTTP.
pub struct HttpFileApi {
    settings: Settings,
    client: Client,
}

impl HttpFileApi {
    pub fn new(settings: Settings) -> CanvasResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Uploads can be large; only bound the connect phase.
            .timeout(None)
            .build()?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn base(&self) -> CanvasResult<String> {
        self.settings.api_base().ok_or(CanvasError::NotConfigured)
    }

    fn check(response: Response) -> CanvasResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(CanvasError::Server {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

/// Text for a failed request: the body's `message` if it has a non-empty
/// one, otherwise the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string())
}

impl FileApi for HttpFileApi {
    fn list_files(&self) -> CanvasResult<Vec<FileEntry>> {
        let Some(base) = self.settings.api_base() else {
            return Ok(Vec::new());
        };
        let response = self.client.get(format!("{}/v1/file/list", base)).send()?;
        let files = Self::check(response)?.json::<Vec<FileEntry>>()?;
        log::info!("Fetched {} files", files.len());
        Ok(files)
    }

    fn upload(&self, request: UploadRequest, progress: Option<ProgressFn>) -> CanvasResult<FileEntry> {
        let base = self.base()?;
        request.validate()?;

        let len = request.data.len() as u64;
        let reader = ProgressReader::new(request.data, progress);
        let mut part = multipart::Part::reader_with_length(reader, len).file_name(request.file_name.clone());
        if let Some(ref mime) = request.mime_type {
            part = part.mime_str(mime)?;
        }
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("x", request.x.to_string())
            .text("y", request.y.to_string());
        if let Some(code) = request.pickup_code {
            form = form.text("pickupCode", code.0);
        }

        log::info!("Uploading {} ({} bytes) at ({:.1}, {:.1})", request.file_name, len, request.x, request.y);
        let response = self.client.post(format!("{}/v1/file", base)).multipart(form).send()?;
        Ok(Self::check(response)?.json::<FileEntry>()?)
    }

    fn update_position(&self, id: FileId, x: f64, y: f64) -> CanvasResult<()> {
        let base = self.base()?;
        let response = self
            .client
            .patch(format!("{}/v1/file/{}", base, id))
            .json(&PositionRequest { x, y })
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn delete_file(&self, id: FileId) -> CanvasResult<()> {
        let base = self.base()?;
        let response = self.client.delete(format!("{}/v1/file/{}", base, id)).send()?;
        Self::check(response)?;
        Ok(())
    }

    fn verify_pickup_code(&self, id: FileId, code: &PickupCode) -> CanvasResult<()> {
        let base = self.base()?;
        let response = self
            .client
            .post(format!("{}/v1/file/{}/verify", base, id))
            .json(&VerifyRequest { code: code.as_str() })
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn download_url(&self, id: FileId, code: Option<&PickupCode>) -> CanvasResult<String> {
        download_url(&self.base()?, id, code)
    }
}

/// Build the download URL for `id` under `base`.
pub fn download_url(base: &str, id: FileId, code: Option<&PickupCode>) -> CanvasResult<String> {
    let mut url = url::Url::parse(&format!("{}/v1/file/download/{}", base, id))
        .map_err(|e| CanvasError::Validation(format!("Invalid server address: {}", e)))?;
    if let Some(code) = code {
        url.query_pairs_mut().append_pair("code", code.as_str());
    }
    Ok(url.to_string())
}

/// Reader that reports how much of the body has been consumed.
struct ProgressReader {
    inner: Cursor<Vec<u8>>,
    total: u64,
    last: Option<u8>,
    callback: Option<ProgressFn>,
}

impl ProgressReader {
    fn new(data: Vec<u8>, callback: Option<ProgressFn>) -> Self {
        let mut reader = Self {
            total: data.len() as u64,
            inner: Cursor::new(data),
            last: None,
            callback,
        };
        reader.report();
        reader
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.inner.position() as f64 / self.total as f64) * 100.0).round() as u8
    }

    fn report(&mut self) {
        let percent = self.percent();
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        if let Some(ref mut callback) = self.callback {
            callback(percent);
        }
    }
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.report();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_pickup_code_validation() {
        assert!(PickupCode::parse("123456").is_ok());
        assert_eq!(PickupCode::parse(" 012345 ").unwrap().as_str(), "012345");
        for bad in ["12345", "1234567", "12a456", "", "１２３４５６"] {
            assert!(matches!(PickupCode::parse(bad), Err(CanvasError::Validation(_))), "{bad}");
        }
    }

    #[test]
    fn test_upload_validation() {
        assert!(UploadRequest::new("a.png", vec![1], 30.0, 40.0).validate().is_ok());
        assert!(UploadRequest::new("a.png", vec![1], 100.0, 0.0).validate().is_ok());
        assert!(UploadRequest::new("a.png", vec![1], 101.0, 0.0).validate().is_err());
        assert!(UploadRequest::new("a.png", vec![1], 5.0, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_unconfigured_client() {
        let api = HttpFileApi::new(Settings::default()).unwrap();
        assert!(api.list_files().unwrap().is_empty());
        assert!(matches!(api.update_position(1, 0.0, 0.0), Err(CanvasError::NotConfigured)));
        assert!(matches!(api.delete_file(1), Err(CanvasError::NotConfigured)));
        assert!(matches!(
            api.upload(UploadRequest::new("a", vec![], 1.0, 1.0), None),
            Err(CanvasError::NotConfigured)
        ));
        assert!(matches!(api.download_url(1, None), Err(CanvasError::NotConfigured)));
    }

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(error_message(StatusCode::FORBIDDEN, r#"{"message":"Wrong pickup code"}"#), "Wrong pickup code");
        assert_eq!(error_message(StatusCode::NOT_FOUND, r#"{"message":""}"#), "Not Found");
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"error":"nope"}"#), "Bad Request");
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, "not json"), "Internal Server Error");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
    }

    #[test]
    fn test_error_message_unknown_status() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(error_message(status, ""), "Request failed");
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("https://files.example.com", 5, None).unwrap(),
            "https://files.example.com/v1/file/download/5"
        );
        let code = PickupCode::parse("654321").unwrap();
        assert_eq!(
            download_url("http://localhost:8080", 5, Some(&code)).unwrap(),
            "http://localhost:8080/v1/file/download/5?code=654321"
        );
    }

    #[test]
    fn test_progress_reader_reports_monotonic_percentages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut reader = ProgressReader::new(vec![0u8; 1000], Some(Box::new(move |p| sink.lock().unwrap().push(p))));

        let mut buf = [0u8; 100];
        while reader.read(&mut buf).unwrap() > 0 {}

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.len(), 11);
    }

    #[test]
    fn test_progress_reader_empty_body() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut reader = ProgressReader::new(Vec::new(), Some(Box::new(move |p| sink.lock().unwrap().push(p))));
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }
}
