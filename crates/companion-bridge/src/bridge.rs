//! Editor-facing façade for one editing session.
//!
//! Ties the form gate, the generator and the companion link together and turns
//! every failure that reaches the editor into a [`DiagnosticRecord`].

#![allow(missing_docs)]

use smol_str::SmolStr;
use tracing::debug;

use companion_codegen::{CodeGenerator, GeneratedProgram, ProgramSnapshot, YailGenerator};

use crate::diagnostic::{BlockStackSource, DiagnosticRecord, DiagnosticWrapper};
use crate::error::{LinkError, UnrecognizedMessageKey, DEFAULT_ERROR_KIND};
use crate::gate::{ActiveFormGate, FormName, GateOutcome};
use crate::link::{CompanionLink, UpdateOutcome};
use crate::messages::MessageCatalog;
use crate::session::{SessionState, StartRequest};
use crate::transport::{CompanionTransport, ReplyStatus};

const UNDESCRIBED_FAILURE: &str = "companion reported an error";

/// Replies gathered by one [`EditorBridge::poll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Printed values of successful evaluations.
    pub values: Vec<String>,
    /// Remote failures, wrapped against the current form.
    pub failures: Vec<DiagnosticRecord>,
}

impl PollReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.failures.is_empty()
    }
}

#[derive(Debug)]
pub struct EditorBridge<T, S, G = YailGenerator> {
    package: SmolStr,
    gate: ActiveFormGate,
    generator: G,
    link: CompanionLink<T>,
    diagnostics: DiagnosticWrapper<S>,
    messages: MessageCatalog,
}

impl<T, S, G> EditorBridge<T, S, G>
where
    T: CompanionTransport,
    S: BlockStackSource,
    G: CodeGenerator,
{
    pub fn new(
        package: impl Into<SmolStr>,
        initial_form: impl Into<FormName>,
        generator: G,
        link: CompanionLink<T>,
        stack_source: S,
    ) -> Self {
        Self {
            package: package.into(),
            gate: ActiveFormGate::new(initial_form),
            generator,
            link,
            diagnostics: DiagnosticWrapper::new(stack_source),
            messages: MessageCatalog::default(),
        }
    }

    #[must_use]
    pub fn with_messages(mut self, messages: MessageCatalog) -> Self {
        self.messages = messages;
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn current_form(&self) -> &FormName {
        self.gate.current()
    }

    pub fn link(&self) -> &CompanionLink<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut CompanionLink<T> {
        &mut self.link
    }

    pub fn diagnostics(&self) -> &DiagnosticWrapper<S> {
        &self.diagnostics
    }

    /// Switch the form the editor is working on. Returns the previous form.
    pub fn set_current_form(&mut self, form: impl Into<FormName>) -> FormName {
        self.gate.set_current(form)
    }

    /// Generate the program for `snapshot` without sending it.
    pub fn program_for(
        &self,
        snapshot: &ProgramSnapshot,
    ) -> Result<GeneratedProgram, DiagnosticRecord> {
        self.generator
            .generate(snapshot, &self.package)
            .map_err(|err| self.diagnostics.wrap_categorized(&err, snapshot.form().clone()))
    }

    /// Generate and transmit `snapshot` if its form is current.
    pub fn send_form(
        &mut self,
        snapshot: &ProgramSnapshot,
    ) -> Result<GateOutcome, DiagnosticRecord> {
        let Self {
            package,
            gate,
            generator,
            link,
            diagnostics,
            ..
        } = self;
        gate.send_if_current(
            snapshot.form(),
            snapshot,
            |snapshot: &ProgramSnapshot| -> Result<(), DiagnosticRecord> {
                let program = generator
                    .generate(snapshot, package)
                    .map_err(|err| diagnostics.wrap_categorized(&err, snapshot.form().clone()))?;
                link.send_generated_program(&program)
                    .map_err(|err| diagnostics.wrap_categorized(&err, program.form.clone()))
            },
        )
    }

    /// Collect remote results. Error replies become diagnostics attributed to
    /// the current form.
    pub fn poll(&mut self) -> PollReport {
        let form = self.gate.current().clone();
        let mut report = PollReport::default();
        for reply in self.link.poll() {
            match reply.status {
                ReplyStatus::Ok => report.values.push(reply.value.unwrap_or_default()),
                ReplyStatus::Error => {
                    let kind = reply
                        .kind
                        .unwrap_or_else(|| SmolStr::new(DEFAULT_ERROR_KIND));
                    let message = reply
                        .message
                        .unwrap_or_else(|| UNDESCRIBED_FAILURE.to_string());
                    report
                        .failures
                        .push(self.diagnostics.wrap_message(message, kind, form.clone()));
                }
            }
        }
        if !report.is_empty() {
            debug!(
                "poll collected {} values and {} failures",
                report.values.len(),
                report.failures.len()
            );
        }
        report
    }

    pub fn start(&mut self, request: StartRequest) -> Result<SessionState, LinkError> {
        self.link.start(request)
    }

    pub fn hard_reset(&mut self) -> Result<SessionState, LinkError> {
        self.link.hard_reset()
    }

    pub fn trigger_update(&mut self) -> Result<UpdateOutcome, LinkError> {
        self.link.trigger_update()
    }

    pub fn reset_program(&mut self) -> Result<bool, LinkError> {
        self.link.reset_program()
    }

    pub fn mark_disconnected(&mut self) -> SessionState {
        self.link.mark_disconnected()
    }

    /// Translated text for a message identifier.
    pub fn message(&self, key: &str) -> Result<&str, UnrecognizedMessageKey> {
        self.messages.get_ode_message(key)
    }
}
