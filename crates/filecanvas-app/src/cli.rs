//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use filecanvas_core::{DeepLink, Settings};

#[derive(Debug, Parser)]
#[command(name = "filecanvas")]
#[command(about = "Shared file canvas client", long_about = None)]
pub struct Cli {
    /// Server host and optional port, without scheme
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Use plain http/ws
    #[arg(long, global = true)]
    pub dev: bool,

    /// Shared link to follow (may carry server, fileId and code)
    #[arg(long, global = true)]
    pub link: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the canvas live and print changes
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Upload a file and pin it to the canvas
    Upload {
        path: PathBuf,
        /// Horizontal position in percent
        #[arg(long, default_value_t = 50.0)]
        x: f64,
        /// Vertical position in percent
        #[arg(long, default_value_t = 50.0)]
        y: f64,
        /// Six-digit pickup code protecting the download
        #[arg(long)]
        code: Option<String>,
        /// Page origin for the printed share link
        #[arg(long)]
        origin: Option<String>,
    },
    /// Move a file to a new position
    Move { id: u64, x: f64, y: f64 },
    /// Delete a file
    Delete { id: u64 },
    /// Print the download link of a file
    Open {
        id: u64,
        #[arg(long)]
        code: Option<String>,
    },
}

impl Cli {
    /// Settings from the environment, overridden by flags.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(ref server) = self.server {
            settings.server = server.clone();
        }
        if self.dev {
            settings.dev_mode = true;
        }
        settings
    }

    pub fn deep_link(&self) -> Result<DeepLink, String> {
        match self.link {
            Some(ref link) => DeepLink::parse(link).map_err(|e| e.to_string()),
            None => Ok(DeepLink::default()),
        }
    }
}
