//! Companion session state machine.
//!
//! The transition table lives in [`CompanionSession::next_state`], a pure
//! function of (state, event). [`crate::CompanionLink`] drives it with the
//! outcomes of transport calls.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::LinkError;

/// Lifecycle state of one device connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session; `start` is allowed.
    Idle,
    /// Handshake in flight.
    Starting,
    /// Ready for programs, polls, updates and resets.
    Connected,
    /// A poll cycle is in progress.
    Polling,
    /// Hard reset in flight.
    Resetting,
    /// Transport loss observed; terminal until the next `start`.
    Disconnected,
}

impl SessionState {
    /// Every state, in declaration order.
    pub const ALL: [SessionState; 6] = [
        Self::Idle,
        Self::Starting,
        Self::Connected,
        Self::Polling,
        Self::Resetting,
        Self::Disconnected,
    ];

    /// Whether programs may be sent in this state.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Polling)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Connected => "connected",
            Self::Polling => "polling",
            Self::Resetting => "resetting",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the device is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Usb,
    Emulator,
    Wireless,
}

impl TransportKind {
    /// Pick the transport from the editor's start flags; USB wins over emulator.
    #[must_use]
    pub fn from_flags(for_emulator: bool, for_usb: bool) -> Self {
        if for_usb {
            Self::Usb
        } else if for_emulator {
            Self::Emulator
        } else {
            Self::Wireless
        }
    }

    /// Parse a config value (`usb`, `emulator`, `wireless`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "usb" => Some(Self::Usb),
            "emulator" => Some(Self::Emulator),
            "wireless" | "wifi" => Some(Self::Wireless),
            _ => None,
        }
    }

    /// Start flags `(for_emulator, for_usb)` selecting this transport.
    #[must_use]
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Usb => (false, true),
            Self::Emulator => (true, false),
            Self::Wireless => (false, false),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Usb => "usb",
            Self::Emulator => "emulator",
            Self::Wireless => "wireless",
        })
    }
}

/// Arguments of a `start` request, as the editor issues them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartRequest {
    /// The companion app is already running on the device.
    pub already_running: bool,
    pub for_emulator: bool,
    pub for_usb: bool,
}

impl StartRequest {
    /// Request that selects `kind`.
    #[must_use]
    pub fn for_kind(kind: TransportKind, already_running: bool) -> Self {
        let (for_emulator, for_usb) = kind.flags();
        Self {
            already_running,
            for_emulator,
            for_usb,
        }
    }

    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        TransportKind::from_flags(self.for_emulator, self.for_usb)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start(TransportKind),
    HandshakeSucceeded { version: Option<SmolStr> },
    HandshakeFailed,
    PollBegan,
    PollFinished,
    ResetRequested,
    ResetAcknowledged,
    ResetFailed,
    TransportLost,
}

/// Event names without payloads, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Start,
    HandshakeSucceeded,
    HandshakeFailed,
    PollBegan,
    PollFinished,
    ResetRequested,
    ResetAcknowledged,
    ResetFailed,
    TransportLost,
}

impl SessionEvent {
    #[must_use]
    pub fn kind(&self) -> SessionEventKind {
        match self {
            Self::Start(_) => SessionEventKind::Start,
            Self::HandshakeSucceeded { .. } => SessionEventKind::HandshakeSucceeded,
            Self::HandshakeFailed => SessionEventKind::HandshakeFailed,
            Self::PollBegan => SessionEventKind::PollBegan,
            Self::PollFinished => SessionEventKind::PollFinished,
            Self::ResetRequested => SessionEventKind::ResetRequested,
            Self::ResetAcknowledged => SessionEventKind::ResetAcknowledged,
            Self::ResetFailed => SessionEventKind::ResetFailed,
            Self::TransportLost => SessionEventKind::TransportLost,
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::HandshakeSucceeded => "complete handshake",
            Self::HandshakeFailed => "fail handshake",
            Self::PollBegan => "poll",
            Self::PollFinished => "finish poll",
            Self::ResetRequested => "hard reset",
            Self::ResetAcknowledged => "acknowledge reset",
            Self::ResetFailed => "fail reset",
            Self::TransportLost => "lose transport",
        })
    }
}

/// One device connection. Version information is cleared on every `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionSession {
    state: SessionState,
    transport_kind: Option<TransportKind>,
    companion_version: Option<SmolStr>,
    compatible: bool,
}

impl Default for CompanionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanionSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            transport_kind: None,
            companion_version: None,
            compatible: true,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.transport_kind
    }

    /// Version reported by the companion during the last handshake.
    #[must_use]
    pub fn companion_version(&self) -> Option<&str> {
        self.companion_version.as_deref()
    }

    /// False once a handshake reported a companion outside the allow-list.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.compatible
    }

    pub(crate) fn mark_incompatible(&mut self) {
        self.compatible = false;
    }

    /// Transition table. `None` means the event is not accepted in `state`.
    #[must_use]
    pub fn next_state(state: SessionState, event: &SessionEvent) -> Option<SessionState> {
        use SessionState as S;
        match (state, event) {
            (_, SessionEvent::TransportLost) => Some(S::Disconnected),
            (S::Idle | S::Disconnected, SessionEvent::Start(_)) => Some(S::Starting),
            (S::Starting, SessionEvent::HandshakeSucceeded { .. }) => Some(S::Connected),
            (S::Starting, SessionEvent::HandshakeFailed) => Some(S::Idle),
            (S::Connected, SessionEvent::PollBegan) => Some(S::Polling),
            (S::Polling, SessionEvent::PollFinished) => Some(S::Connected),
            (S::Connected | S::Polling, SessionEvent::ResetRequested) => Some(S::Resetting),
            (S::Resetting, SessionEvent::ResetAcknowledged) => Some(S::Idle),
            (S::Resetting, SessionEvent::ResetFailed) => Some(S::Disconnected),
            _ => None,
        }
    }

    /// Apply `event`, returning the new state. Rejected events leave the
    /// session untouched.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionState, LinkError> {
        let Some(next) = Self::next_state(self.state, &event) else {
            return Err(LinkError::InvalidTransition {
                state: self.state,
                event: event.kind(),
            });
        };
        debug!("companion session {} -> {} ({:?})", self.state, next, event.kind());
        match event {
            SessionEvent::Start(kind) => {
                self.transport_kind = Some(kind);
                self.companion_version = None;
                self.compatible = true;
            }
            SessionEvent::HandshakeSucceeded { version } => {
                self.companion_version = version;
            }
            _ => {}
        }
        self.state = next;
        Ok(next)
    }
}
