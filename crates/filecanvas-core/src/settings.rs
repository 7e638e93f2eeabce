//! Server settings and deep links.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::file::FileId;

/// Environment variable holding the server address.
pub const SERVER_ENV: &str = "FILECANVAS_SERVER";
/// Environment variable selecting plain http/ws instead of https/wss.
pub const DEV_MODE_ENV: &str = "FILECANVAS_DEV";

/// Connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Server host (and optional port), without scheme.
    pub server: String,
    /// Use unencrypted http/ws.
    pub dev_mode: bool,
}

impl Settings {
    pub fn new(server: impl Into<String>, dev_mode: bool) -> Self {
        Self {
            server: server.into(),
            dev_mode,
        }
    }

    /// Read settings from the environment. Missing values leave the
    /// networked features disabled.
    pub fn from_env() -> Self {
        let server = std::env::var(SERVER_ENV).unwrap_or_default();
        let dev_mode = std::env::var(DEV_MODE_ENV)
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { server, dev_mode }
    }

    /// Whether a server address is set.
    pub fn is_configured(&self) -> bool {
        !self.server.trim().is_empty()
    }

    /// Base URL for REST calls, or `None` when unconfigured.
    pub fn api_base(&self) -> Option<String> {
        let server = self.server.trim();
        if server.is_empty() {
            return None;
        }
        let scheme = if self.dev_mode { "http" } else { "https" };
        Some(format!("{}://{}", scheme, server.trim_end_matches('/')))
    }

    /// URL of the realtime endpoint, or `None` when unconfigured.
    pub fn ws_url(&self) -> Option<String> {
        let server = self.server.trim();
        if server.is_empty() {
            return None;
        }
        let scheme = if self.dev_mode { "ws" } else { "wss" };
        Some(format!("{}://{}/_ws", scheme, server.trim_end_matches('/')))
    }
}

/// One-shot parameters carried by a shared link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
    /// Server to switch to.
    pub server: Option<String>,
    /// File to open once the canvas has loaded.
    pub file_id: Option<FileId>,
    /// Pickup code for `file_id`.
    pub code: Option<String>,
    /// The link with all of the above removed.
    pub stripped: Option<String>,
}

impl DeepLink {
    /// Extract `server`, `fileId` and `code` from a page URL.
    ///
    /// A `fileId` that is not a number is dropped; it could never match.
    pub fn parse(link: &str) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(link)?;
        let mut deep = DeepLink::default();
        let mut kept: Vec<(String, String)> = Vec::new();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "server" => deep.server = Some(value.into_owned()).filter(|s| !s.trim().is_empty()),
                "fileId" => {
                    deep.file_id = value.trim().parse().ok();
                    if deep.file_id.is_none() {
                        log::warn!("Ignoring non-numeric fileId in link: {}", value);
                    }
                }
                "code" => deep.code = Some(value.into_owned()).filter(|s| !s.is_empty()),
                _ => kept.push((key.into_owned(), value.into_owned())),
            }
        }

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        deep.stripped = Some(url.to_string());
        Ok(deep)
    }

    /// Whether the link carried anything.
    pub fn is_empty(&self) -> bool {
        self.server.is_none() && self.file_id.is_none() && self.code.is_none()
    }

    /// Seed `settings` with the linked server, if any.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(ref server) = self.server {
            settings.server = server.clone();
        }
    }
}

/// Build the link an uploader shares so that a recipient lands on the same
/// server with the file opened.
pub fn share_url(origin: &str, server: &str, file_id: FileId, code: Option<&str>) -> Result<String, url::ParseError> {
    let mut url = Url::parse(origin)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("server", server);
        query.append_pair("fileId", &file_id.to_string());
        if let Some(code) = code {
            query.append_pair("code", code);
        }
    }
    Ok(url.to_string())
}
