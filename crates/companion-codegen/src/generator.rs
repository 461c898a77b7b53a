//! Code generator trait and the YAIL implementation.

use serde_json::{Map, Value};
use smol_str::SmolStr;
use tracing::debug;

use crate::emit::{quote, Emitter};
use crate::error::GenerationError;
use crate::linearize::LinearGraph;
use crate::snapshot::ProgramSnapshot;
use crate::version::LanguageVersion;

const YAIL_HEADER: &str = "#|\n$Source $Yail\n|#";
const RUNTIME_REQUIRE: &str = "(require <com.google.youngandroid.runtime>)";

/// Program text produced from one snapshot. Never persisted by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    /// Form the program was generated for.
    pub form: SmolStr,
    /// Package the form was generated into.
    pub package: SmolStr,
    /// Generated YAIL text.
    pub text: String,
    /// Versions the text was generated against.
    pub version: LanguageVersion,
}

/// Pure transform from a snapshot to program text.
pub trait CodeGenerator {
    /// Generate the program for `snapshot` inside `package`.
    fn generate(
        &self,
        snapshot: &ProgramSnapshot,
        package: &str,
    ) -> Result<GeneratedProgram, GenerationError>;

    /// Versions this generator targets.
    fn language_version(&self) -> LanguageVersion;
}

/// Generates YAIL for the Companion interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct YailGenerator {
    version: LanguageVersion,
}

impl YailGenerator {
    /// Generator targeting `version`.
    #[must_use]
    pub fn new(version: LanguageVersion) -> Self {
        Self { version }
    }
}

impl CodeGenerator for YailGenerator {
    fn generate(
        &self,
        snapshot: &ProgramSnapshot,
        package: &str,
    ) -> Result<GeneratedProgram, GenerationError> {
        let package = validate_package(package)?;
        let form_value = snapshot.parse_form()?;
        let properties = form_value
            .get("Properties")
            .and_then(Value::as_object)
            .ok_or_else(|| GenerationError::InvalidForm("missing Properties object".into()))?;
        let form_name = properties
            .get("$Name")
            .and_then(Value::as_str)
            .ok_or_else(|| GenerationError::InvalidForm("missing form $Name".into()))?;
        if form_name != snapshot.form().as_str() {
            return Err(GenerationError::InvalidForm(
                format!(
                    "form json describes '{form_name}', expected '{}'",
                    snapshot.form()
                )
                .into(),
            ));
        }

        let graph = snapshot.parse_blocks()?;
        if let Some(found) = graph
            .header
            .as_ref()
            .and_then(|header| header.language_version)
        {
            if !self.version.accepts_blocks(found) {
                return Err(GenerationError::NewerBlocksVersion {
                    found,
                    supported: self.version.blocks_version,
                });
            }
        }
        let linear = LinearGraph::build(&graph)?;

        let mut lines = vec![
            YAIL_HEADER.to_string(),
            String::new(),
            format!("(define-form {package}.{form_name} {form_name})"),
            RUNTIME_REQUIRE.to_string(),
            format!(
                ";;; ya-version {} blocks-version {}",
                self.version.ya_version, self.version.blocks_version
            ),
        ];
        let form_setters = property_setters(form_name, properties);
        if !form_setters.is_empty() {
            lines.push(format!("(do-after-form-creation{form_setters})"));
        }
        if let Some(children) = properties.get("$Components").and_then(Value::as_array) {
            add_components(form_name, children, &mut lines)?;
        }

        let emitter = Emitter::new(&linear);
        let mut emitted = 0usize;
        for block in linear.roots() {
            if block.disabled {
                debug!("skipping disabled block {}", block.id);
                continue;
            }
            lines.push(emitter.top_level(block)?);
            emitted += 1;
        }
        lines.push("(init-runtime)".to_string());

        debug!(
            "generated {} for {} ({} top-level blocks)",
            package, form_name, emitted
        );
        let mut text = lines.join("\n");
        text.push('\n');
        Ok(GeneratedProgram {
            form: snapshot.form().clone(),
            package: SmolStr::new(package),
            text,
            version: self.version,
        })
    }

    fn language_version(&self) -> LanguageVersion {
        self.version
    }
}

fn validate_package(package: &str) -> Result<&str, GenerationError> {
    let package = package.trim();
    let valid = !package.is_empty()
        && package.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
    if valid {
        Ok(package)
    } else {
        Err(GenerationError::InvalidPackage(package.into()))
    }
}

fn add_components(
    parent: &str,
    children: &[Value],
    lines: &mut Vec<String>,
) -> Result<(), GenerationError> {
    for child in children {
        let properties = child
            .as_object()
            .ok_or_else(|| GenerationError::InvalidForm("component is not an object".into()))?;
        let name = component_key(properties, "$Name")?;
        let kind = component_key(properties, "$Type")?;
        let setters = property_setters(name, properties);
        lines.push(format!("(add-component {parent} {kind} {name}{setters})"));
        if let Some(nested) = properties.get("$Components").and_then(Value::as_array) {
            add_components(name, nested, lines)?;
        }
    }
    Ok(())
}

fn component_key<'v>(
    properties: &'v Map<String, Value>,
    key: &str,
) -> Result<&'v str, GenerationError> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GenerationError::InvalidForm(format!("component missing {key}").into()))
}

/// Setter forms for every designer property, sorted by property name. `$`
/// keys are structural and skipped.
fn property_setters(component: &str, properties: &Map<String, Value>) -> String {
    let mut names = properties
        .keys()
        .filter(|key| !key.starts_with('$') && key.as_str() != "Uuid")
        .collect::<Vec<_>>();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let value = match &properties[name.as_str()] {
                Value::String(text) => quote(text),
                other => quote(&other.to_string()),
            };
            format!(" (set-and-coerce-property! '{component} '{name} {value} 'any)")
        })
        .collect()
}
