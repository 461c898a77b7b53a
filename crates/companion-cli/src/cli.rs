//! CLI definitions for the companion tool.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "companion",
    version,
    about = "Drive a Companion runtime from block programs",
    after_help = "Examples:\n  companion yail --form-json Screen1.scm --blocks Screen1.bky --package appinventor.ai_me.Hello\n  companion send --config companion.toml --form-json Screen1.scm --blocks Screen1.bky\n  companion pair wifi:192.168.1.20:8001"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the program generated for one form.
    Yail {
        /// Form properties file (.scm).
        #[arg(long)]
        form_json: PathBuf,
        /// Blocks file (.bky).
        #[arg(long)]
        blocks: PathBuf,
        /// Form name (defaults to the form file stem).
        #[arg(long)]
        form: Option<String>,
        /// Package name (defaults to project.package from --config).
        #[arg(long)]
        package: Option<String>,
        /// Bridge configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Connect, send one form and print what the companion reports.
    Send {
        /// Bridge configuration file.
        #[arg(long, default_value = "companion.toml")]
        config: PathBuf,
        /// Form properties file (.scm).
        #[arg(long)]
        form_json: PathBuf,
        /// Blocks file (.bky).
        #[arg(long)]
        blocks: PathBuf,
        /// Form name (defaults to the form file stem).
        #[arg(long)]
        form: Option<String>,
        /// Number of poll cycles after sending.
        #[arg(long, default_value_t = 3)]
        polls: u32,
        /// The companion app is already running on the device.
        #[arg(long, action = ArgAction::SetTrue)]
        already_running: bool,
    },
    /// Show a pairing code for a connection descriptor.
    Pair {
        /// Connection descriptor encoded into the code.
        descriptor: String,
        /// Write an SVG image instead of printing to the terminal.
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Hard-reset the companion session.
    Reset {
        /// Bridge configuration file.
        #[arg(long, default_value = "companion.toml")]
        config: PathBuf,
    },
    /// Ask the companion to update itself.
    Update {
        /// Bridge configuration file.
        #[arg(long, default_value = "companion.toml")]
        config: PathBuf,
    },
    /// Print a translated editor message.
    Message {
        /// Message identifier (deleteButton, cancelButton).
        key: String,
        /// Bridge configuration file with [messages] overrides.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    /// Configuration file named on the command line, if any.
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Yail { config, .. } | Self::Message { config, .. } => config.as_ref(),
            Self::Send { config, .. } | Self::Reset { config } | Self::Update { config } => {
                Some(config)
            }
            Self::Pair { .. } => None,
        }
    }
}
