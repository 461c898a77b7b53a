//! Register of the form currently being edited.
//!
//! Only the current form may push to the device; sends on behalf of any other
//! form are dropped.

use smol_str::SmolStr;
use tracing::debug;

/// Name identifying one editable surface.
pub type FormName = SmolStr;

/// What happened to a gated send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The payload reached the sink.
    Delivered,
    /// The form was not current; nothing was sent.
    Skipped {
        /// Form that was current at the time.
        current: FormName,
    },
}

impl GateOutcome {
    /// Whether the payload reached the sink.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Receiver of gated payloads.
pub trait FormSink<P> {
    /// Error returned by a failed delivery.
    type Error;

    /// Deliver `payload` on behalf of `form`.
    fn deliver(&mut self, form: &FormName, payload: P) -> Result<(), Self::Error>;
}

impl<P, E, F> FormSink<P> for F
where
    F: FnMut(P) -> Result<(), E>,
{
    type Error = E;

    fn deliver(&mut self, _form: &FormName, payload: P) -> Result<(), E> {
        self(payload)
    }
}

/// Single-writer register of the current form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFormGate {
    current: FormName,
}

impl ActiveFormGate {
    /// Gate with `initial` as the current form.
    pub fn new(initial: impl Into<FormName>) -> Self {
        Self {
            current: initial.into(),
        }
    }

    /// Replace the current form, returning the previous one. Last write wins.
    pub fn set_current(&mut self, form: impl Into<FormName>) -> FormName {
        let form = form.into();
        debug!("current form {} -> {}", self.current, form);
        std::mem::replace(&mut self.current, form)
    }

    /// Form that is currently allowed to send.
    #[must_use]
    pub fn current(&self) -> &FormName {
        &self.current
    }

    /// Whether `form` is the current form.
    #[must_use]
    pub fn is_current(&self, form: &str) -> bool {
        self.current == form
    }

    /// Forward `payload` to `sink` once if `form` is current, otherwise drop
    /// it. Sink errors are returned as is; nothing is retried.
    pub fn send_if_current<P, S>(
        &self,
        form: &FormName,
        payload: P,
        mut sink: S,
    ) -> Result<GateOutcome, S::Error>
    where
        S: FormSink<P>,
    {
        if !self.is_current(form) {
            debug!("not working on {} (while sending for {})", self.current, form);
            return Ok(GateOutcome::Skipped {
                current: self.current.clone(),
            });
        }
        sink.deliver(form, payload)?;
        Ok(GateOutcome::Delivered)
    }
}
