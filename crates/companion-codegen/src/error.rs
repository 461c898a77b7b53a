//! Generation errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Reasons a snapshot could not be turned into program text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Form metadata is not valid JSON or lacks required properties.
    #[error("invalid form json: {0}")]
    InvalidForm(SmolStr),

    /// Block graph is not valid JSON.
    #[error("invalid blocks: {0}")]
    InvalidBlocks(SmolStr),

    /// Package name is empty or malformed.
    #[error("invalid package name '{0}'")]
    InvalidPackage(SmolStr),

    /// Two blocks share an id.
    #[error("duplicate block id '{0}'")]
    DuplicateBlock(SmolStr),

    /// A socket refers to a block id that does not exist.
    #[error("block '{block}' socket '{socket}' refers to missing block '{target}'")]
    MissingBlock {
        block: SmolStr,
        socket: SmolStr,
        target: SmolStr,
    },

    /// A block is plugged into more than one parent.
    #[error("block '{0}' is connected to more than one parent")]
    SharedBlock(SmolStr),

    /// Following inputs or `next` links returns to an already visited block.
    #[error("block graph contains a cycle through '{0}'")]
    Cycle(SmolStr),

    /// Sockets nest deeper than the emitter accepts.
    #[error("block '{block}' is nested deeper than {limit} levels")]
    TooDeep { block: SmolStr, limit: usize },

    /// A required socket has nothing plugged in.
    #[error("block '{block}' ({kind}) is missing socket '{socket}'")]
    MissingSocket {
        block: SmolStr,
        kind: SmolStr,
        socket: SmolStr,
    },

    /// A required field is absent.
    #[error("block '{block}' ({kind}) is missing field '{field}'")]
    MissingField {
        block: SmolStr,
        kind: SmolStr,
        field: SmolStr,
    },

    /// No translation exists for this block type.
    #[error("block '{block}' has unsupported type '{kind}'")]
    UnsupportedBlock { block: SmolStr, kind: SmolStr },

    /// A block-level translation step failed.
    #[error("block '{block}': {message}")]
    Evaluation { block: SmolStr, message: SmolStr },

    /// The blocks file was saved by a newer blocks language.
    #[error("blocks language version {found} is newer than supported version {supported}")]
    NewerBlocksVersion { found: u32, supported: u32 },
}

impl GenerationError {
    /// Block id the error points at, when there is one.
    #[must_use]
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateBlock(block)
            | Self::SharedBlock(block)
            | Self::Cycle(block)
            | Self::MissingBlock { block, .. }
            | Self::TooDeep { block, .. }
            | Self::MissingSocket { block, .. }
            | Self::MissingField { block, .. }
            | Self::UnsupportedBlock { block, .. }
            | Self::Evaluation { block, .. } => Some(block.as_str()),
            Self::InvalidForm(_)
            | Self::InvalidBlocks(_)
            | Self::InvalidPackage(_)
            | Self::NewerBlocksVersion { .. } => None,
        }
    }
}
