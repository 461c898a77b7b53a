//! `companion.toml` loading.

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use companion_codegen::{LanguageVersion, YailGenerator};

use crate::error::ConfigError;
use crate::link::CompanionLink;
use crate::messages::{MessageCatalog, OdeMessage};
use crate::session::TransportKind;
use crate::transport::CompanionTransport;

pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:9987";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub package: SmolStr,
    pub version: LanguageVersion,
    pub companion: CompanionConfig,
    pub transport: TransportConfig,
    pub log_level: SmolStr,
    pub messages: MessageOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanionConfig {
    pub preferred: Option<SmolStr>,
    pub update_url: Option<SmolStr>,
    pub acceptable_packages: Vec<SmolStr>,
    pub acceptable_companions: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint: SmolStr,
    pub kind: TransportKind,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOverrides {
    pub delete_button: Option<SmolStr>,
    pub cancel_button: Option<SmolStr>,
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string().into(),
            message: err.to_string().into(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: BridgeToml = toml::from_str(text)
            .map_err(|err| ConfigError::Invalid(format!("companion.toml: {err}").into()))?;
        raw.into_config()
    }

    /// Generator targeting the configured language versions.
    #[must_use]
    pub fn generator(&self) -> YailGenerator {
        YailGenerator::new(self.version)
    }

    #[must_use]
    pub fn message_catalog(&self) -> MessageCatalog {
        let mut catalog = MessageCatalog::default();
        if let Some(text) = &self.messages.delete_button {
            catalog = catalog.with_translation(OdeMessage::DeleteButton, text.clone());
        }
        if let Some(text) = &self.messages.cancel_button {
            catalog = catalog.with_translation(OdeMessage::CancelButton, text.clone());
        }
        catalog
    }

    /// Seed allow-lists and the preferred companion on `link`.
    pub fn apply_to_link<T: CompanionTransport>(&self, link: &mut CompanionLink<T>) {
        for package in &self.companion.acceptable_packages {
            link.add_acceptable_package(package.clone());
        }
        for version in &self.companion.acceptable_companions {
            link.add_acceptable_companion(version.clone());
        }
        if let Some(preferred) = &self.companion.preferred {
            link.set_preferred_companion(
                preferred.clone(),
                self.companion.update_url.as_deref().unwrap_or(""),
            );
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BridgeToml {
    project: ProjectSection,
    versions: Option<VersionsSection>,
    companion: Option<CompanionSection>,
    transport: Option<TransportSection>,
    log: Option<LogSection>,
    messages: Option<MessagesSection>,
}

#[derive(Debug, Deserialize)]
struct ProjectSection {
    package: String,
}

#[derive(Debug, Deserialize)]
struct VersionsSection {
    ya_version: Option<u32>,
    blocks_version: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompanionSection {
    preferred: Option<String>,
    update_url: Option<String>,
    acceptable_packages: Option<Vec<String>>,
    acceptable_companions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TransportSection {
    endpoint: Option<String>,
    kind: Option<String>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesSection {
    delete_button: Option<String>,
    cancel_button: Option<String>,
}

impl BridgeToml {
    fn into_config(self) -> Result<BridgeConfig, ConfigError> {
        let package = self.project.package.trim();
        if package.is_empty() {
            return Err(ConfigError::Invalid("project.package must not be empty".into()));
        }

        let defaults = LanguageVersion::default();
        let version = match self.versions {
            Some(section) => LanguageVersion::new(
                section.ya_version.unwrap_or(defaults.ya_version),
                section.blocks_version.unwrap_or(defaults.blocks_version),
            ),
            None => defaults,
        };

        let companion = match self.companion {
            Some(section) => {
                let preferred = non_blank(section.preferred);
                let update_url = non_blank(section.update_url);
                if update_url.is_some() && preferred.is_none() {
                    return Err(ConfigError::Invalid(
                        "companion.update_url requires companion.preferred".into(),
                    ));
                }
                CompanionConfig {
                    preferred,
                    update_url,
                    acceptable_packages: tokens(section.acceptable_packages),
                    acceptable_companions: tokens(section.acceptable_companions),
                }
            }
            None => CompanionConfig::default(),
        };

        let transport_section = self.transport.unwrap_or(TransportSection {
            endpoint: None,
            kind: None,
            poll_interval_ms: None,
        });
        let endpoint = transport_section
            .endpoint
            .map_or_else(|| SmolStr::new(DEFAULT_ENDPOINT), |text| SmolStr::new(text.trim()));
        if !(endpoint.starts_with("tcp://") || endpoint.starts_with("unix://")) {
            return Err(ConfigError::Invalid(
                format!("transport.endpoint '{endpoint}' must start with tcp:// or unix://").into(),
            ));
        }
        let kind = match transport_section.kind.as_deref() {
            Some(text) => TransportKind::parse(text).ok_or_else(|| {
                ConfigError::Invalid(format!("transport.kind '{text}'").into())
            })?,
            None => TransportKind::Wireless,
        };
        let poll_interval_ms = transport_section
            .poll_interval_ms
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "transport.poll_interval_ms must be greater than zero".into(),
            ));
        }

        let log_level = self
            .log
            .and_then(|section| section.level)
            .map_or_else(|| "info".to_string(), |level| level.trim().to_ascii_lowercase());
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::Invalid(
                format!("log.level '{log_level}'").into(),
            ));
        }

        let messages = self
            .messages
            .map(|section| MessageOverrides {
                delete_button: non_blank(section.delete_button),
                cancel_button: non_blank(section.cancel_button),
            })
            .unwrap_or_default();

        Ok(BridgeConfig {
            package: SmolStr::new(package),
            version,
            companion,
            transport: TransportConfig {
                endpoint,
                kind,
                poll_interval: Duration::from_millis(poll_interval_ms),
            },
            log_level: log_level.into(),
            messages,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<SmolStr> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .map(SmolStr::from)
}

fn tokens(values: Option<Vec<String>>) -> Vec<SmolStr> {
    values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| non_blank(Some(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
[project]
package = "appinventor.ai_user.HelloPurr"
"#,
        )
        .unwrap();
        assert_eq!(config.package, "appinventor.ai_user.HelloPurr");
        assert_eq!(config.version, LanguageVersion::default());
        assert_eq!(config.transport.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.transport.kind, TransportKind::Wireless);
        assert_eq!(config.transport.poll_interval, Duration::from_millis(500));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.companion, CompanionConfig::default());
    }

    #[test]
    fn missing_project_is_invalid() {
        let err = BridgeConfig::from_toml_str("[log]\nlevel = \"debug\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn bad_values_are_rejected() {
        for (section, message) in [
            ("[transport]\nkind = \"bluetooth\"", "transport.kind"),
            ("[transport]\npoll_interval_ms = 0", "poll_interval_ms"),
            ("[transport]\nendpoint = \"http://x\"", "transport.endpoint"),
            ("[log]\nlevel = \"loud\"", "log.level"),
            ("[companion]\nupdate_url = \"https://x\"", "companion.preferred"),
            (
                "[companion]\npreferred = \" \"\nupdate_url = \"https://x\"",
                "companion.preferred",
            ),
        ] {
            let text = format!("[project]\npackage = \"a.b\"\n{section}\n");
            let err = BridgeConfig::from_toml_str(&text).unwrap_err();
            assert!(err.to_string().contains(message), "{err}");
        }
    }

    #[test]
    fn catalog_takes_overrides() {
        let config = BridgeConfig::from_toml_str(
            "[project]\npackage = \"a.b\"\n[messages]\ndelete_button = \"Löschen\"\n",
        )
        .unwrap();
        let catalog = config.message_catalog();
        assert_eq!(catalog.get(OdeMessage::DeleteButton), "Löschen");
        assert_eq!(catalog.get(OdeMessage::CancelButton), "Cancel");
    }
}
