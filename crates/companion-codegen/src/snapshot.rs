//! Program snapshots and the block graph model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::GenerationError;

/// Serialized state of one form: component metadata plus its block graph.
///
/// Snapshots are immutable values produced by the editor. They carry no identity
/// beyond the name of the form they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSnapshot {
    form: SmolStr,
    form_json: String,
    blocks_json: String,
}

impl ProgramSnapshot {
    /// Build a snapshot for `form`.
    pub fn new(
        form: impl Into<SmolStr>,
        form_json: impl Into<String>,
        blocks_json: impl Into<String>,
    ) -> Self {
        Self {
            form: form.into(),
            form_json: form_json.into(),
            blocks_json: blocks_json.into(),
        }
    }

    /// Name of the form this snapshot belongs to.
    #[must_use]
    pub fn form(&self) -> &SmolStr {
        &self.form
    }

    /// Raw form metadata.
    #[must_use]
    pub fn form_json(&self) -> &str {
        &self.form_json
    }

    /// Raw block graph.
    #[must_use]
    pub fn blocks_json(&self) -> &str {
        &self.blocks_json
    }

    /// Parse the form metadata.
    pub fn parse_form(&self) -> Result<Value, GenerationError> {
        serde_json::from_str(strip_form_envelope(&self.form_json))
            .map_err(|err| GenerationError::InvalidForm(err.to_string().into()))
    }

    /// Parse the block graph. An empty document is an empty workspace.
    pub fn parse_blocks(&self) -> Result<BlockGraph, GenerationError> {
        if self.blocks_json.trim().is_empty() {
            return Ok(BlockGraph::default());
        }
        serde_json::from_str(&self.blocks_json)
            .map_err(|err| GenerationError::InvalidBlocks(err.to_string().into()))
    }
}

/// Form files are stored wrapped in `#|` / `|#` comment markers.
fn strip_form_envelope(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("#|") else {
        return trimmed;
    };
    let rest = rest.trim_start();
    let rest = rest.strip_prefix("$JSON").unwrap_or(rest);
    rest.strip_suffix("|#").unwrap_or(rest).trim()
}

/// Header written by the blocks editor when saving a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksHeader {
    /// Blocks language version the workspace was saved with.
    #[serde(default)]
    pub language_version: Option<u32>,
    /// YAIL version the workspace was saved with.
    #[serde(default)]
    pub ya_version: Option<u32>,
}

/// A block workspace: blocks in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockGraph {
    /// Optional save header.
    #[serde(default)]
    pub header: Option<BlocksHeader>,
    /// All blocks, top-level or nested.
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// One block. Inputs and `next` refer to other blocks by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Workspace-unique id.
    pub id: SmolStr,
    /// Block type, e.g. `math_number`.
    #[serde(rename = "type")]
    pub kind: SmolStr,
    /// Field values by field name.
    #[serde(default)]
    pub fields: IndexMap<SmolStr, String>,
    /// Value and statement sockets, socket name to block id.
    #[serde(default)]
    pub inputs: IndexMap<SmolStr, SmolStr>,
    /// Following statement block.
    #[serde(default)]
    pub next: Option<SmolStr>,
    /// Disabled blocks are not generated.
    #[serde(default)]
    pub disabled: bool,
}

impl Block {
    /// Every outgoing link as `(socket, target)`, inputs first, then `next`.
    pub fn links(&self) -> impl Iterator<Item = (&str, &SmolStr)> {
        self.inputs
            .iter()
            .map(|(socket, target)| (socket.as_str(), target))
            .chain(self.next.iter().map(|target| ("next", target)))
    }
}
