//! CLI entrypoint for the companion bridge.

mod cli;
mod commands;
mod transport;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use companion_bridge::BridgeConfig;

use cli::{Cli, Command};

fn main() {
    if let Err(err) = run() {
        eprintln!("companion error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match cli.command.config_path() {
        Some(path) => Some(
            BridgeConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
        ),
        None => None,
    };
    init_tracing(config.as_ref().map_or("info", |config| config.log_level.as_str()));

    match cli.command {
        Command::Yail {
            form_json,
            blocks,
            form,
            package,
            ..
        } => commands::yail(config.as_ref(), &form_json, &blocks, form, package),
        Command::Send {
            form_json,
            blocks,
            form,
            polls,
            already_running,
            ..
        } => commands::send(
            require(config)?,
            &form_json,
            &blocks,
            form,
            polls,
            already_running,
        ),
        Command::Pair { descriptor, svg } => commands::pair(&descriptor, svg.as_deref()),
        Command::Reset { .. } => commands::reset(require(config)?),
        Command::Update { .. } => commands::update(require(config)?),
        Command::Message { key, .. } => commands::message(config.as_ref(), &key),
    }
}

fn require(config: Option<BridgeConfig>) -> anyhow::Result<BridgeConfig> {
    config.context("this command needs a configuration file")
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
