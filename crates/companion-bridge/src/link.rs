//! Connection lifecycle for one companion device.

#![allow(missing_docs)]

use indexmap::IndexSet;
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use companion_codegen::GeneratedProgram;

use crate::error::{LinkError, TransportError};
use crate::session::{CompanionSession, SessionEvent, SessionState, StartRequest};
use crate::transport::{CompanionCommand, CompanionReply, CompanionTransport, HandshakeRequest};

/// Result of [`CompanionLink::trigger_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// An update command pointing at `url` was sent.
    Requested { url: SmolStr },
    /// No update URL is configured.
    NoUpdateAvailable,
}

/// Owns the transport and drives the session state machine with its results.
///
/// Allow-lists and the preferred companion live here rather than on the
/// session, so they survive `hard_reset` and reconnects.
#[derive(Debug)]
pub struct CompanionLink<T> {
    transport: T,
    session: CompanionSession,
    acceptable_packages: IndexSet<SmolStr>,
    acceptable_companions: IndexSet<SmolStr>,
    preferred_companion: Option<SmolStr>,
    update_url: Option<SmolStr>,
}

impl<T: CompanionTransport> CompanionLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: CompanionSession::new(),
            acceptable_packages: IndexSet::new(),
            acceptable_companions: IndexSet::new(),
            preferred_companion: None,
            update_url: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn session(&self) -> &CompanionSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Allow a companion application package. Returns `false` if it was
    /// already present.
    pub fn add_acceptable_package(&mut self, package: impl Into<SmolStr>) -> bool {
        self.acceptable_packages.insert(package.into())
    }

    /// Allow a companion version. Returns `false` if it was already present.
    pub fn add_acceptable_companion(&mut self, version: impl Into<SmolStr>) -> bool {
        self.acceptable_companions.insert(version.into())
    }

    /// Membership in either allow-list.
    pub fn is_companion_acceptable(&self, token: &str) -> bool {
        self.acceptable_packages.contains(token) || self.acceptable_companions.contains(token)
    }

    /// Record the companion version the editor ships with and where to fetch
    /// it. An empty URL means no update is available.
    pub fn set_preferred_companion(&mut self, version: impl Into<SmolStr>, update_url: &str) {
        self.preferred_companion = Some(version.into());
        let url = update_url.trim();
        self.update_url = (!url.is_empty()).then(|| SmolStr::new(url));
    }

    pub fn preferred_companion(&self) -> Option<&str> {
        self.preferred_companion.as_deref()
    }

    pub fn update_url(&self) -> Option<&str> {
        self.update_url.as_deref()
    }

    /// Open a session. On handshake failure the session returns to `Idle` and
    /// the caller may retry.
    pub fn start(&mut self, request: StartRequest) -> Result<SessionState, LinkError> {
        let kind = request.transport_kind();
        self.session.apply(SessionEvent::Start(kind))?;
        info!("starting companion session over {kind}");

        let handshake = HandshakeRequest {
            kind,
            already_running: request.already_running,
        };
        let reply = match self.transport.handshake(&handshake) {
            Ok(reply) => reply,
            Err(source) => {
                warn!("companion handshake failed: {source}");
                self.session.apply(SessionEvent::HandshakeFailed)?;
                return Err(LinkError::TransportFailure {
                    operation: "start",
                    source,
                });
            }
        };

        let version = reply.version.clone();
        let state = self.session.apply(SessionEvent::HandshakeSucceeded {
            version: version.clone(),
        })?;
        if let Some(version) = version.as_deref() {
            if !self.handshake_accepted(version, reply.package.as_deref()) {
                warn!("companion {version} is not on the allow-list");
                self.session.mark_incompatible();
            }
        }
        info!(
            "companion connected (version {})",
            version.as_deref().unwrap_or("unknown")
        );
        Ok(state)
    }

    fn handshake_accepted(&self, version: &str, package: Option<&str>) -> bool {
        if self.acceptable_packages.is_empty() && self.acceptable_companions.is_empty() {
            return true;
        }
        self.is_companion_acceptable(version)
            || package.is_some_and(|package| self.is_companion_acceptable(package))
    }

    /// Collect asynchronous results. Outside `Connected` this does nothing;
    /// transport failures are logged and yield no replies.
    pub fn poll(&mut self) -> Vec<CompanionReply> {
        if self.session.state() != SessionState::Connected {
            debug!("poll skipped while session is {}", self.session.state());
            return Vec::new();
        }
        // Connected -> Polling is always accepted.
        let _ = self.session.apply(SessionEvent::PollBegan);
        let replies = match self.transport.poll() {
            Ok(replies) => replies,
            Err(err) => {
                warn!("companion poll failed: {err}");
                Vec::new()
            }
        };
        let _ = self.session.apply(SessionEvent::PollFinished);
        replies
    }

    /// Transmit a generated program to the device.
    pub fn send_generated_program(&mut self, program: &GeneratedProgram) -> Result<(), LinkError> {
        self.require_live()?;
        if !self.session.is_compatible() {
            return Err(LinkError::IncompatibleCompanion {
                version: self
                    .session
                    .companion_version()
                    .map(SmolStr::new)
                    .unwrap_or_default(),
            });
        }
        debug!(
            "sending program for {} ({} bytes)",
            program.form,
            program.text.len()
        );
        self.transmit("send", &CompanionCommand::program(program))
    }

    /// Ask the companion to update itself from the configured URL. The
    /// reported companion version is not compared against anything.
    pub fn trigger_update(&mut self) -> Result<UpdateOutcome, LinkError> {
        self.require_live()?;
        let Some(url) = self.update_url.clone() else {
            debug!("no companion update available");
            return Ok(UpdateOutcome::NoUpdateAvailable);
        };
        info!("requesting companion update from {url}");
        self.transmit("update", &CompanionCommand::Update { url: url.clone() })?;
        Ok(UpdateOutcome::Requested { url })
    }

    /// Drop the program state held by the companion. Returns `false` when no
    /// session is live.
    pub fn reset_program(&mut self) -> Result<bool, LinkError> {
        if !self.session.state().is_live() {
            debug!("reset skipped while session is {}", self.session.state());
            return Ok(false);
        }
        self.transmit("reset", &CompanionCommand::ResetProgram)?;
        Ok(true)
    }

    /// Abandon the session. Ends in `Idle` when the device acknowledges, in
    /// `Disconnected` otherwise.
    pub fn hard_reset(&mut self) -> Result<SessionState, LinkError> {
        self.require_live()?;
        self.session.apply(SessionEvent::ResetRequested)?;
        info!("hard resetting companion session");
        match self.transport.reset() {
            Ok(()) => self.session.apply(SessionEvent::ResetAcknowledged),
            Err(source) => {
                warn!("companion reset failed: {source}");
                self.session.apply(SessionEvent::ResetFailed)?;
                Err(LinkError::TransportFailure {
                    operation: "hard reset",
                    source,
                })
            }
        }
    }

    /// Record that the transport reported loss of the device.
    pub fn mark_disconnected(&mut self) -> SessionState {
        // TransportLost is accepted from every state.
        let _ = self.session.apply(SessionEvent::TransportLost);
        info!("companion disconnected");
        self.session.state()
    }

    fn require_live(&self) -> Result<(), LinkError> {
        let state = self.session.state();
        if state.is_live() {
            Ok(())
        } else {
            Err(LinkError::NotConnected { state })
        }
    }

    fn transmit(
        &mut self,
        operation: &'static str,
        command: &CompanionCommand,
    ) -> Result<(), LinkError> {
        let payload = command
            .encode()
            .map_err(|err| LinkError::Encode(err.to_string().into()))?;
        self.transport
            .transmit(&payload)
            .map_err(|source: TransportError| LinkError::TransportFailure { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Handshake;

    #[derive(Default)]
    struct Fake {
        version: Option<SmolStr>,
        fail_handshake: bool,
        fail_reset: bool,
        sent: Vec<CompanionCommand>,
    }

    impl CompanionTransport for Fake {
        fn handshake(&mut self, _: &HandshakeRequest) -> Result<Handshake, TransportError> {
            if self.fail_handshake {
                return Err(TransportError::Timeout);
            }
            Ok(Handshake {
                version: self.version.clone(),
                package: None,
            })
        }

        fn transmit(&mut self, payload: &[u8]) -> Result<(), TransportError> {
            self.sent.push(CompanionCommand::decode(payload).unwrap());
            Ok(())
        }

        fn poll(&mut self) -> Result<Vec<CompanionReply>, TransportError> {
            Ok(Vec::new())
        }

        fn reset(&mut self) -> Result<(), TransportError> {
            if self.fail_reset {
                Err(TransportError::LinkLost)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn failed_handshake_returns_to_idle() {
        let mut link = CompanionLink::new(Fake {
            fail_handshake: true,
            ..Fake::default()
        });
        let err = link.start(StartRequest::default()).unwrap_err();
        assert!(matches!(
            err,
            LinkError::TransportFailure {
                operation: "start",
                source: TransportError::Timeout
            }
        ));
        assert_eq!(link.state(), SessionState::Idle);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut link = CompanionLink::new(Fake::default());
        link.start(StartRequest::default()).unwrap();
        assert!(matches!(
            link.start(StartRequest::default()),
            Err(LinkError::InvalidTransition { .. })
        ));
        assert_eq!(link.state(), SessionState::Connected);
    }

    #[test]
    fn update_needs_url_and_skips_version_compare() {
        let mut link = CompanionLink::new(Fake {
            version: Some("2.70".into()),
            ..Fake::default()
        });
        assert!(matches!(
            link.trigger_update(),
            Err(LinkError::NotConnected { .. })
        ));
        link.start(StartRequest::default()).unwrap();
        assert_eq!(link.trigger_update(), Ok(UpdateOutcome::NoUpdateAvailable));

        // Same version as preferred; the update is still sent.
        link.set_preferred_companion("2.70", "https://example.org/c.apk");
        assert_eq!(
            link.trigger_update(),
            Ok(UpdateOutcome::Requested {
                url: "https://example.org/c.apk".into()
            })
        );
        assert_eq!(link.transport().sent.len(), 1);
    }

    #[test]
    fn reset_failure_disconnects() {
        let mut link = CompanionLink::new(Fake {
            fail_reset: true,
            ..Fake::default()
        });
        assert!(matches!(
            link.hard_reset(),
            Err(LinkError::NotConnected { .. })
        ));
        link.start(StartRequest::default()).unwrap();
        assert!(link.hard_reset().is_err());
        assert_eq!(link.state(), SessionState::Disconnected);

        link.transport_mut().fail_reset = false;
        link.start(StartRequest::default()).unwrap();
        assert_eq!(link.hard_reset(), Ok(SessionState::Idle));
    }

    #[test]
    fn reset_program_is_noop_when_idle() {
        let mut link = CompanionLink::new(Fake::default());
        assert_eq!(link.reset_program(), Ok(false));
        link.start(StartRequest::default()).unwrap();
        assert_eq!(link.reset_program(), Ok(true));
        assert_eq!(link.transport().sent, vec![CompanionCommand::ResetProgram]);
    }

    #[test]
    fn blank_update_url_means_none() {
        let mut link = CompanionLink::new(Fake::default());
        link.set_preferred_companion("2.70", "  ");
        assert_eq!(link.preferred_companion(), Some("2.70"));
        assert_eq!(link.update_url(), None);
    }
}
