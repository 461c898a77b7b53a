//! Transport capability and the commands sent over it.
//!
//! The bridge never talks to USB, emulator or wireless links directly. Adapters
//! implement [`CompanionTransport`]; the link only sees its four operations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use companion_codegen::GeneratedProgram;

use crate::error::TransportError;
use crate::session::TransportKind;

/// Handshake parameters passed to the transport on `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Which link to open.
    pub kind: TransportKind,
    /// Skip launching the companion app; it is already running.
    pub already_running: bool,
}

/// What the companion reported during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Companion version string, when offered.
    #[serde(default)]
    pub version: Option<SmolStr>,
    /// Companion application package, when offered.
    #[serde(default)]
    pub package: Option<SmolStr>,
}

/// Outcome of one evaluation on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

/// An asynchronous result collected by `poll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionReply {
    pub status: ReplyStatus,
    /// Printed value for successful evaluations.
    #[serde(default)]
    pub value: Option<String>,
    /// Error description for failed evaluations.
    #[serde(default)]
    pub message: Option<String>,
    /// Error category reported by the companion.
    #[serde(default)]
    pub kind: Option<SmolStr>,
}

impl CompanionReply {
    #[must_use]
    pub fn ok(value: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Ok,
            value: Some(value.into()),
            message: None,
            kind: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, kind: Option<SmolStr>) -> Self {
        Self {
            status: ReplyStatus::Error,
            value: None,
            message: Some(message.into()),
            kind,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == ReplyStatus::Error
    }
}

/// Commands transmitted to the companion, serialized as tagged JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CompanionCommand {
    /// Evaluate a generated program.
    Program {
        form: SmolStr,
        package: SmolStr,
        text: String,
        ya_version: u32,
        blocks_version: u32,
    },
    /// Start the companion's self-update from `url`.
    Update { url: SmolStr },
    /// Drop the program state the companion holds for the editor.
    ResetProgram,
}

impl CompanionCommand {
    #[must_use]
    pub fn program(program: &GeneratedProgram) -> Self {
        Self::Program {
            form: program.form.clone(),
            package: program.package.clone(),
            text: program.text.clone(),
            ya_version: program.version.ya_version,
            blocks_version: program.version.blocks_version,
        }
    }

    /// Wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Inverse of [`Self::encode`], for adapters and tests.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Capability to reach a companion over one kind of link.
///
/// Calls may block on I/O but must not retry on their own; the link decides
/// what a failure means for the session.
pub trait CompanionTransport {
    /// Open the link and exchange version information.
    fn handshake(&mut self, request: &HandshakeRequest) -> Result<Handshake, TransportError>;

    /// Deliver an encoded [`CompanionCommand`].
    fn transmit(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Collect replies that arrived since the previous poll.
    fn poll(&mut self) -> Result<Vec<CompanionReply>, TransportError>;

    /// Tell the device to discard the session.
    fn reset(&mut self) -> Result<(), TransportError>;
}

impl<T: CompanionTransport + ?Sized> CompanionTransport for Box<T> {
    fn handshake(&mut self, request: &HandshakeRequest) -> Result<Handshake, TransportError> {
        (**self).handshake(request)
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(payload)
    }

    fn poll(&mut self) -> Result<Vec<CompanionReply>, TransportError> {
        (**self).poll()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}
