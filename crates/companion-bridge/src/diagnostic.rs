//! Structured diagnostics for generation and remote execution failures.
//!
//! Capturing the block stack is a separate step from building the record, so
//! a record is a plain value and construction cannot fail.

#![allow(missing_docs)]

use std::error::Error as StdError;

use serde::Serialize;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::warn;

use crate::error::{ErrorCategory, DEFAULT_ERROR_KIND};
use crate::gate::FormName;

/// The collaborator could not report a block stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("block stack unavailable: {0}")]
pub struct StackUnavailable(pub SmolStr);

/// Source of the running form's block stack.
pub trait BlockStackSource {
    /// Ordered block identifiers, innermost last.
    fn block_stack(&self) -> Result<Vec<SmolStr>, StackUnavailable>;
}

impl<F> BlockStackSource for F
where
    F: Fn() -> Result<Vec<SmolStr>, StackUnavailable>,
{
    fn block_stack(&self) -> Result<Vec<SmolStr>, StackUnavailable> {
        self()
    }
}

/// Source for hosts without a running form. Always yields an empty stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlockStack;

impl BlockStackSource for NoBlockStack {
    fn block_stack(&self) -> Result<Vec<SmolStr>, StackUnavailable> {
        Ok(Vec::new())
    }
}

/// Block stack captured at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BlockStackSnapshot(Vec<SmolStr>);

impl BlockStackSnapshot {
    /// Snapshot holding `blocks`.
    #[must_use]
    pub fn new(blocks: Vec<SmolStr>) -> Self {
        Self(blocks)
    }

    /// Captured block identifiers.
    #[must_use]
    pub fn blocks(&self) -> &[SmolStr] {
        &self.0
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read the active form's block stack. Failures are logged and produce an
/// empty snapshot.
pub fn capture_context<S: BlockStackSource + ?Sized>(source: &S) -> BlockStackSnapshot {
    match source.block_stack() {
        Ok(blocks) => BlockStackSnapshot(blocks),
        Err(err) => {
            warn!("{err}; reporting empty block stack");
            BlockStackSnapshot::default()
        }
    }
}

/// A failure ready to be shown in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{error_kind}: {message}")]
pub struct DiagnosticRecord {
    message: String,
    error_kind: SmolStr,
    block_stack: BlockStackSnapshot,
    form: FormName,
}

impl DiagnosticRecord {
    /// Record with an explicit message and kind.
    pub fn new(
        message: impl Into<String>,
        error_kind: impl Into<SmolStr>,
        form: impl Into<FormName>,
        block_stack: BlockStackSnapshot,
    ) -> Self {
        Self {
            message: message.into(),
            error_kind: error_kind.into(),
            block_stack,
            form: form.into(),
        }
    }

    /// Record for `failure`, using its display text and the default kind.
    pub fn from_failure<E: StdError + ?Sized>(
        failure: &E,
        form: impl Into<FormName>,
        block_stack: BlockStackSnapshot,
    ) -> Self {
        Self::new(failure.to_string(), DEFAULT_ERROR_KIND, form, block_stack)
    }

    /// Record for a failure that knows its own category.
    pub fn from_categorized<E: StdError + ErrorCategory + ?Sized>(
        failure: &E,
        form: impl Into<FormName>,
        block_stack: BlockStackSnapshot,
    ) -> Self {
        Self::new(failure.to_string(), failure.error_kind(), form, block_stack)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn error_kind(&self) -> &str {
        &self.error_kind
    }

    #[must_use]
    pub fn block_stack(&self) -> &[SmolStr] {
        self.block_stack.blocks()
    }

    /// Form the failure originated in. The block stack belongs to whichever
    /// form was active when the record was built.
    #[must_use]
    pub fn form(&self) -> &FormName {
        &self.form
    }
}

/// Builds [`DiagnosticRecord`]s with the stack read from `source`.
#[derive(Debug, Clone)]
pub struct DiagnosticWrapper<S> {
    source: S,
}

impl<S: BlockStackSource> DiagnosticWrapper<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn wrap_message(
        &self,
        message: impl Into<String>,
        error_kind: impl Into<SmolStr>,
        form: impl Into<FormName>,
    ) -> DiagnosticRecord {
        DiagnosticRecord::new(message, error_kind, form, capture_context(&self.source))
    }

    /// Wrap an uncategorized failure under [`DEFAULT_ERROR_KIND`].
    pub fn wrap_failure<E: StdError + ?Sized>(
        &self,
        failure: &E,
        form: impl Into<FormName>,
    ) -> DiagnosticRecord {
        DiagnosticRecord::from_failure(failure, form, capture_context(&self.source))
    }

    pub fn wrap_categorized<E: StdError + ErrorCategory + ?Sized>(
        &self,
        failure: &E,
        form: impl Into<FormName>,
    ) -> DiagnosticRecord {
        DiagnosticRecord::from_categorized(failure, form, capture_context(&self.source))
    }
}
