//! Bridge errors and their diagnostic categories.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

use companion_codegen::GenerationError;

use crate::session::{SessionEventKind, SessionState};

/// Category used when a failure carries no category of its own.
pub const DEFAULT_ERROR_KIND: &str = "RuntimeError";

/// Failures that know which diagnostic category they belong to.
pub trait ErrorCategory {
    /// Category name reported as a diagnostic's `error_kind`.
    fn error_kind(&self) -> &'static str;
}

/// Transport-level failures reported by a [`crate::CompanionTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The companion did not answer in time.
    #[error("timed out")]
    Timeout,

    /// The link to the device went away.
    #[error("link lost")]
    LinkLost,

    /// The companion answered with an error.
    #[error("companion rejected request: {0}")]
    Rejected(SmolStr),

    /// Socket or device I/O failed.
    #[error("i/o error: {0}")]
    Io(SmolStr),

    /// The companion sent something we could not decode.
    #[error("protocol error: {0}")]
    Protocol(SmolStr),
}

/// Errors returned by [`crate::CompanionLink`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Operation needs a connected session.
    #[error("companion not connected (session is {state})")]
    NotConnected { state: SessionState },

    /// The transport failed while carrying out `operation`.
    #[error("transport failure during {operation}: {source}")]
    TransportFailure {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// The session cannot take this event in its current state.
    #[error("cannot {event} while session is {state}")]
    InvalidTransition {
        state: SessionState,
        event: SessionEventKind,
    },

    /// The connected companion is not on the allow-list.
    #[error("companion '{version}' is not an acceptable companion")]
    IncompatibleCompanion { version: SmolStr },

    /// A command could not be serialized.
    #[error("could not encode command: {0}")]
    Encode(SmolStr),
}

/// Lookup of a message identifier outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected argument in message lookup: {0}")]
pub struct UnrecognizedMessageKey(pub SmolStr);

/// Pairing payload could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("connection descriptor is empty")]
    EmptyDescriptor,

    #[error("qr encoding failed: {0}")]
    Encode(SmolStr),
}

/// Configuration loading failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Io { path: SmolStr, message: SmolStr },

    #[error("invalid config '{0}'")]
    Invalid(SmolStr),
}

impl ErrorCategory for GenerationError {
    fn error_kind(&self) -> &'static str {
        "YailGenerationError"
    }
}

impl ErrorCategory for TransportError {
    fn error_kind(&self) -> &'static str {
        "TransportFailure"
    }
}

impl ErrorCategory for LinkError {
    fn error_kind(&self) -> &'static str {
        match self {
            Self::NotConnected { .. } => "NotConnectedError",
            Self::TransportFailure { .. } | Self::Encode(_) => "TransportFailure",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::IncompatibleCompanion { .. } => "IncompatibleCompanion",
        }
    }
}

impl ErrorCategory for UnrecognizedMessageKey {
    fn error_kind(&self) -> &'static str {
        "UnrecognizedMessageKey"
    }
}

impl ErrorCategory for PairingError {
    fn error_kind(&self) -> &'static str {
        "PairingError"
    }
}

impl ErrorCategory for ConfigError {
    fn error_kind(&self) -> &'static str {
        "ConfigError"
    }
}
