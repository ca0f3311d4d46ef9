use thiserror::Error;

/// Structural parse failure. Fatal for the affected file: without a header
/// row there is nothing to validate or convert.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("export content is empty")]
    Empty,

    #[error("no header row found in export content")]
    HeaderNotFound,
}

/// The merge step found nothing to work with.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("no header or line records to merge")]
    NoRecords,
}

/// Internal validation fault. Never surfaces to callers: the engine
/// downgrades it to a single `general` error result in the file report.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required column not present: {0}")]
    MissingColumn(&'static str),
}

/// Submission-level failure returned by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{file}: {source}")]
    Parse { file: String, source: ParseError },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("submission has no files")]
    EmptySubmission,
}
