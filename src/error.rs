//! Error types for adforge operations.
//!
//! Defines error types for the major subsystems:
//! - Completion client (transport, timeout, API failures)
//! - Stage generation (malformed output, missing required fields)
//! - Prompt template loading

use thiserror::Error;

use crate::pipeline::Stage;

/// Number of characters of raw LLM output preserved in malformed-output errors.
pub const RAW_PREVIEW_LEN: usize = 500;

/// Errors that can occur while calling the hosted completion API.
///
/// Transport, timeout, and non-success statuses are not distinguished by
/// retryability; the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Missing API key: ADFORGE_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Missing API base URL: ADFORGE_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Completion response contained no text content")]
    EmptyResponse,

    #[error("Failed to decode completion response: {0}")]
    DecodeError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while running a generation stage.
///
/// Every variant carries the stage it occurred in, so a failed run always
/// surfaces as a stage-named error. A stage failure aborts the whole run;
/// there is no partial-context continuation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The completion call itself failed.
    #[error("{stage} stage failed: {source}")]
    Completion {
        stage: Stage,
        #[source]
        source: CompletionError,
    },

    /// The normalized response still failed JSON parsing.
    #[error("{stage} stage produced malformed output: {reason} (raw preview: {preview})")]
    MalformedOutput {
        stage: Stage,
        reason: String,
        /// First [`RAW_PREVIEW_LEN`] characters of the original raw text.
        preview: String,
    },

    /// The parsed result lacked a required field.
    #[error("{stage} stage result missing required field '{field}'")]
    MissingField { stage: Stage, field: &'static str },

    /// A result for this stage was already recorded in the context.
    #[error("{stage} stage result already recorded for this run")]
    StageAlreadyRecorded { stage: Stage },

    /// The hooks/scripts continuation was entered without a completed
    /// angles stage in the context.
    #[error("Continuation requires a completed {missing} stage in the context")]
    ContinuationMissingStage { missing: Stage },

    /// A selected angle id was not present in the angles result.
    #[error("Selected angle '{angle_id}' not found in the angles result")]
    UnknownAngle { angle_id: String },
}

impl GenerationError {
    /// Builds a [`GenerationError::MalformedOutput`] with a bounded preview of
    /// the original raw text.
    pub fn malformed(stage: Stage, reason: impl Into<String>, raw: &str) -> Self {
        let preview: String = raw.chars().take(RAW_PREVIEW_LEN).collect();
        GenerationError::MalformedOutput {
            stage,
            reason: reason.into(),
            preview,
        }
    }

    /// Returns the stage this error occurred in, when it names one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GenerationError::Completion { stage, .. }
            | GenerationError::MalformedOutput { stage, .. }
            | GenerationError::MissingField { stage, .. }
            | GenerationError::StageAlreadyRecorded { stage } => Some(*stage),
            GenerationError::ContinuationMissingStage { .. }
            | GenerationError::UnknownAngle { .. } => None,
        }
    }
}

/// Errors that can occur during prompt template loading.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to parse template file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Template file '{path}' declares no stage name")]
    MissingStageName { path: String },

    #[error("Duplicate template for stage '{0}' found during loading")]
    DuplicateStage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for stage generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;
