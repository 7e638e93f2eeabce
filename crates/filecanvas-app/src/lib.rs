//! FileCanvas Application
//!
//! Headless shell around the canvas controller: argument parsing, the
//! event loop and text output.

mod cli;
mod shell;

pub use cli::{Cli, Command};
pub use shell::{format_size, render_listing, run, Shell, ShellError, FRAME_INTERVAL};
