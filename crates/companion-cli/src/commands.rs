//! Command implementations.

use std::path::Path;
use std::thread;

use anyhow::{bail, Context};
use smol_str::SmolStr;
use tracing::info;

use companion_bridge::{
    make_pairing_code, pairing_token, render_terminal, BridgeConfig, CompanionLink,
    DiagnosticWrapper, EditorBridge, GateOutcome, MessageCatalog, NoBlockStack, StartRequest,
    UpdateOutcome,
};
use companion_codegen::{CodeGenerator, ProgramSnapshot, YailGenerator};

use crate::transport::{LineTransport, RelayEndpoint};

type CliBridge = EditorBridge<LineTransport, NoBlockStack>;

/// Form named in reset and update sessions, which never send programs.
const IDLE_FORM: &str = "Screen1";

pub fn yail(
    config: Option<&BridgeConfig>,
    form_json: &Path,
    blocks: &Path,
    form: Option<String>,
    package: Option<String>,
) -> anyhow::Result<()> {
    let package = match (package, config) {
        (Some(package), _) => SmolStr::new(package),
        (None, Some(config)) => config.package.clone(),
        (None, None) => bail!("pass --package or --config"),
    };
    let generator = config.map_or_else(YailGenerator::default, BridgeConfig::generator);
    let snapshot = read_snapshot(form_json, blocks, form)?;
    let diagnostics = DiagnosticWrapper::new(NoBlockStack);
    let program = generator
        .generate(&snapshot, &package)
        .map_err(|err| diagnostics.wrap_categorized(&err, snapshot.form().clone()))?;
    print!("{}", program.text);
    Ok(())
}

pub fn send(
    config: BridgeConfig,
    form_json: &Path,
    blocks: &Path,
    form: Option<String>,
    polls: u32,
    already_running: bool,
) -> anyhow::Result<()> {
    let snapshot = read_snapshot(form_json, blocks, form)?;
    let mut bridge = connect(&config, snapshot.form().clone())?;
    bridge.start(StartRequest::for_kind(config.transport.kind, already_running))?;

    match bridge.send_form(&snapshot)? {
        GateOutcome::Delivered => info!("sent {}", snapshot.form()),
        GateOutcome::Skipped { current } => {
            bail!("{} is not the current form ({current})", snapshot.form())
        }
    }

    let mut failures = 0usize;
    for _ in 0..polls {
        thread::sleep(config.transport.poll_interval);
        let report = bridge.poll();
        for value in report.values {
            println!("{value}");
        }
        for record in report.failures {
            failures += 1;
            eprintln!("{record}");
            if !record.block_stack().is_empty() {
                eprintln!("  blocks: {}", record.block_stack().join(" > "));
            }
        }
    }
    if failures > 0 {
        bail!("companion reported {failures} error(s)");
    }
    Ok(())
}

pub fn pair(descriptor: &str, svg: Option<&Path>) -> anyhow::Result<()> {
    let token = pairing_token(descriptor)?;
    match svg {
        Some(path) => {
            let image = make_pairing_code(descriptor)?;
            std::fs::write(path, image).with_context(|| format!("writing {}", path.display()))?;
            println!("{token} -> {}", path.display());
        }
        None => {
            println!("{}", render_terminal(descriptor)?);
            println!("{token}");
        }
    }
    Ok(())
}

pub fn reset(config: BridgeConfig) -> anyhow::Result<()> {
    let mut bridge = connect(&config, IDLE_FORM.into())?;
    bridge.start(StartRequest::for_kind(config.transport.kind, true))?;
    let state = bridge.hard_reset()?;
    println!("session {state}");
    Ok(())
}

pub fn update(config: BridgeConfig) -> anyhow::Result<()> {
    let mut bridge = connect(&config, IDLE_FORM.into())?;
    bridge.start(StartRequest::for_kind(config.transport.kind, true))?;
    match bridge.trigger_update()? {
        UpdateOutcome::Requested { url } => println!("update requested from {url}"),
        UpdateOutcome::NoUpdateAvailable => println!("no update available"),
    }
    Ok(())
}

pub fn message(config: Option<&BridgeConfig>, key: &str) -> anyhow::Result<()> {
    let catalog = config.map_or_else(MessageCatalog::default, BridgeConfig::message_catalog);
    println!("{}", catalog.get_ode_message(key)?);
    Ok(())
}

fn connect(config: &BridgeConfig, form: SmolStr) -> anyhow::Result<CliBridge> {
    let endpoint = RelayEndpoint::parse(&config.transport.endpoint).map_err(anyhow::Error::msg)?;
    let transport = LineTransport::connect(&endpoint, Some(config.transport.poll_interval * 10))
        .with_context(|| format!("connecting to {}", config.transport.endpoint))?;
    let mut link = CompanionLink::new(transport);
    config.apply_to_link(&mut link);
    Ok(EditorBridge::new(
        config.package.clone(),
        form,
        config.generator(),
        link,
        NoBlockStack,
    )
    .with_messages(config.message_catalog()))
}

fn read_snapshot(
    form_json: &Path,
    blocks: &Path,
    form: Option<String>,
) -> anyhow::Result<ProgramSnapshot> {
    let form = match form {
        Some(form) => form,
        None => form_name(form_json)?,
    };
    let form_text = std::fs::read_to_string(form_json)
        .with_context(|| format!("reading {}", form_json.display()))?;
    let blocks_text = std::fs::read_to_string(blocks)
        .with_context(|| format!("reading {}", blocks.display()))?;
    Ok(ProgramSnapshot::new(form, form_text, blocks_text))
}

fn form_name(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a form name from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_name_comes_from_file_stem() {
        assert_eq!(
            form_name(Path::new("src/appinventor/Screen2.scm")).unwrap(),
            "Screen2"
        );
    }
}
