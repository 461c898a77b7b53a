//! `companion-codegen` - YAIL program generation from visual block graphs.
//!
//! The generator is a pure transform: a [`ProgramSnapshot`] (form metadata plus
//! block graph, both as JSON) and a package name go in, a [`GeneratedProgram`]
//! comes out. Failures are reported as [`GenerationError`]; turning them into
//! user-facing diagnostics is the caller's job.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod emit;
/// Generation errors.
pub mod error;
/// Code generator trait and the YAIL implementation.
pub mod generator;
mod linearize;
/// Program snapshots and block graph model.
pub mod snapshot;
/// Language version constants.
pub mod version;

pub use error::GenerationError;
pub use generator::{CodeGenerator, GeneratedProgram, YailGenerator};
pub use snapshot::{Block, BlockGraph, BlocksHeader, ProgramSnapshot};
pub use version::LanguageVersion;
