//! `companion-bridge` - keeps a visual block program in sync with a live
//! Companion runtime on a device.
//!
//! The pieces, leaves first:
//! - [`ActiveFormGate`] decides which form may push to the device.
//! - [`CompanionLink`] owns the transport and the session state machine.
//! - [`DiagnosticWrapper`] turns generation and remote failures into
//!   [`DiagnosticRecord`]s carrying the block stack at the time of failure.
//! - [`EditorBridge`] wires them together for one editing session.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Editor-facing façade.
pub mod bridge;
/// `companion.toml` loading.
pub mod config;
/// Diagnostic records and block stack capture.
pub mod diagnostic;
/// Error types and diagnostic categories.
pub mod error;
/// Current-form register.
pub mod gate;
/// Companion connection lifecycle.
pub mod link;
/// Translated editor messages.
pub mod messages;
/// QR pairing codes.
pub mod pairing;
/// Session state machine.
pub mod session;
/// Transport capability and wire commands.
pub mod transport;

pub use bridge::{EditorBridge, PollReport};
pub use config::BridgeConfig;
pub use diagnostic::{
    capture_context, BlockStackSnapshot, BlockStackSource, DiagnosticRecord, DiagnosticWrapper,
    NoBlockStack, StackUnavailable,
};
pub use error::{
    ConfigError, ErrorCategory, LinkError, PairingError, TransportError, UnrecognizedMessageKey,
    DEFAULT_ERROR_KIND,
};
pub use gate::{ActiveFormGate, FormName, FormSink, GateOutcome};
pub use link::{CompanionLink, UpdateOutcome};
pub use messages::{MessageCatalog, OdeMessage};
pub use pairing::{make_pairing_code, pairing_token, render_terminal};
pub use session::{CompanionSession, SessionState, StartRequest, TransportKind};
pub use transport::{
    CompanionCommand, CompanionReply, CompanionTransport, Handshake, HandshakeRequest, ReplyStatus,
};
