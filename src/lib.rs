//! libdiario - SAP accounting export parser, validator and journal builder
//! ---
//!
//! Ingests SAP-style ledger dumps (pipe-delimited document header and line
//! item exports, plus trial-balance sheets), checks their structural and
//! accounting correctness, merges header and line files into a unified
//! journal ("libro diario") and renders everything as a canonical
//! `{ metadata, headers, data }` artifact.
//!
//! The crate holds no ambient state: every call takes the file contents and
//! the caller-supplied execution identity and returns fresh values. Storage,
//! HTTP and user lookup are the caller's business.

/// Error taxonomy: structural failures escalate, field-level findings
/// become [`validation::ValidationResult`] data instead.
pub mod error;

/// Field-level format grammar: dates, times and decimal-comma amounts.
pub mod format;

/// Marker-driven parser for pipe-delimited SAP export text.
pub mod parser;

/// Typed document header / line item records and the merge key.
pub mod record;

/// The multi-phase validation engine and its report types.
pub mod validation;

/// Header/line-item merge into journal entries.
pub mod merge;

/// Canonical artifact construction.
pub mod convert;

/// One-submission orchestration: parse, validate, gate, merge, convert.
pub mod pipeline;

pub use convert::{CanonicalArtifact, ExecutionContext};
pub use error::{MergeError, ParseError, PipelineError};
pub use merge::JournalEntry;
pub use parser::{parse, ParsedFile};
pub use validation::{can_proceed, validate, FileOrigin, FileReport, ValidationStatus};
