//! Core pipeline and domain logic for Docweave.
//!
//! This crate ties together range parsing, content extraction, source
//! resolution, bundle expansion, and live-bundle inlining into the
//! end-to-end `assemble` workflow.

pub mod assembler;
pub mod bundle;
pub mod extract;
pub mod inline;
pub mod ranges;
pub mod resolver;

pub use assembler::{assemble, dry_run, DryRunEntry, DryRunReport};
pub use extract::{Extractor, FileSlice};
