//! Headless shell: drives the controller loop and prints what a window
//! would show.

use std::time::{Duration, Instant};

use filecanvas_core::{
    CanvasController, CanvasError, ConnectionState, ControllerEvent, FileEntry, PickupCode, ProgressFn,
    Transport, UploadRequest,
};
use thiserror::Error;

use crate::cli::{Cli, Command};

/// Loop period, roughly one frame.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Upper bound on waiting for position confirmations before exiting.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
}

/// Owns a controller and runs one command against it.
pub struct Shell<T: Transport> {
    controller: CanvasController<T>,
    last_listing: Option<String>,
    last_state: Option<ConnectionState>,
}

impl<T: Transport> Shell<T> {
    pub fn new(controller: CanvasController<T>) -> Self {
        Self {
            controller,
            last_listing: None,
            last_state: None,
        }
    }

    pub fn controller(&self) -> &CanvasController<T> {
        &self.controller
    }

    /// Run the command from the command line. No subcommand means watch.
    pub fn run(&mut self, command: Option<Command>) -> Result<(), ShellError> {
        let result = self.dispatch(command);
        self.controller.teardown();
        result
    }

    fn dispatch(&mut self, command: Option<Command>) -> Result<(), ShellError> {
        let command = command.unwrap_or(Command::Watch { seconds: None });
        if let Command::Watch { seconds } = command {
            return self.watch(seconds.map(Duration::from_secs));
        }

        self.controller.load(Instant::now())?;
        match command {
            Command::Watch { .. } => Ok(()),
            Command::Upload { path, x, y, code, origin } => {
                let mut request = UploadRequest::from_path(&path, x, y)?;
                if let Some(ref code) = code {
                    request = request.with_pickup_code(PickupCode::parse(code)?);
                }
                let progress: ProgressFn = Box::new(|percent| log::info!("Upload {}%", percent));
                let entry = self.controller.upload(request, Some(progress))?;
                println!("Uploaded {} as file {}", entry.original_name, entry.id);
                if let Some(origin) = origin {
                    println!("{}", self.controller.share_url(&origin, entry.id, code.as_deref())?);
                }
                Ok(())
            }
            Command::Move { id, x, y } => {
                self.controller.move_file(id, x, y)?;
                self.flush_confirmations();
                Ok(())
            }
            Command::Delete { id } => {
                self.controller.delete(id)?;
                println!("Deleted file {}", id);
                Ok(())
            }
            Command::Open { id, code } => {
                let event = match code {
                    Some(code) => self.controller.open_with_code(id, &code)?,
                    None => self.controller.open(id)?,
                };
                self.handle_event(event);
                Ok(())
            }
        }
    }

    /// Follow the canvas until `limit` elapses, or forever.
    fn watch(&mut self, limit: Option<Duration>) -> Result<(), ShellError> {
        let started = Instant::now();
        if let Err(e) = self.controller.load(started) {
            // The realtime channel still runs; the canvas fills from deltas.
            eprintln!("Could not load files: {}", e);
        }
        if !self.controller.realtime_enabled() {
            eprintln!("No server configured; live updates are off");
        }
        loop {
            let now = Instant::now();
            for event in self.controller.tick(now) {
                self.handle_event(event);
            }
            self.report_changes();
            if limit.is_some_and(|limit| now.duration_since(started) >= limit) {
                return Ok(());
            }
            std::thread::sleep(FRAME_INTERVAL);
        }
    }

    /// Keep ticking until committed moves are confirmed or the timeout hits.
    fn flush_confirmations(&mut self) {
        let deadline = Instant::now() + CONFIRM_TIMEOUT;
        while self.controller.pending_confirmations() > 0 {
            let now = Instant::now();
            if now >= deadline {
                log::warn!("Giving up on {} position confirmations", self.controller.pending_confirmations());
                return;
            }
            self.controller.tick(now);
            std::thread::sleep(FRAME_INTERVAL);
        }
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::OpenFile { file_name, url, .. } => println!("{}: {}", file_name, url),
            ControllerEvent::PickupCodeRequired {
                id,
                file_name,
                suggested_code,
            } => match suggested_code {
                Some(code) => println!("{} needs a pickup code: filecanvas open {} --code {}", file_name, id, code),
                None => println!("{} needs a pickup code: filecanvas open {} --code <code>", file_name, id),
            },
        }
    }

    fn report_changes(&mut self) {
        let state = self.controller.connection_state();
        if self.last_state != Some(state) {
            println!("[{}]", describe_state(state));
            if let Some(due) = self.controller.reconnect_due() {
                log::debug!("Next connection attempt in {:?}", due.saturating_duration_since(Instant::now()));
            }
            self.last_state = Some(state);
        }
        let listing = render_listing(self.controller.files());
        if self.last_listing.as_deref() != Some(listing.as_str()) {
            print!("{}", listing);
            self.last_listing = Some(listing);
        }
    }
}

/// Build the controller for the command line and run it.
pub fn run(cli: Cli) -> Result<(), ShellError> {
    let deep_link = cli.deep_link().map_err(ShellError::InvalidLink)?;
    let controller = CanvasController::native(cli.settings(), deep_link)?;
    Shell::new(controller).run(cli.command)
}

pub fn describe_state(state: ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected => "offline".to_string(),
        ConnectionState::Connecting => "connecting".to_string(),
        ConnectionState::Open => "live".to_string(),
        ConnectionState::Reconnecting { delay } => format!("reconnecting in {}s", delay.as_secs()),
    }
}

/// One line per file, in display order.
pub fn render_listing(files: &[FileEntry]) -> String {
    if files.is_empty() {
        return "(canvas is empty)\n".to_string();
    }
    let mut out = String::new();
    for file in files {
        let lock = if file.has_pickup_code { " [code]" } else { "" };
        out.push_str(&format!(
            "{:>6}  {:>5.1}% {:>5.1}%  {:>9}  {}{}\n",
            file.id,
            file.x,
            file.y,
            format_size(file.size),
            file.original_name,
            lock
        ));
    }
    out
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
