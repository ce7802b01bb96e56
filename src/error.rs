//! Error types
//!
//! Library-level failures are typed with `thiserror`. Host code (config,
//! CLI) wraps these with `anyhow` context.

use thiserror::Error;

/// Message shown to the user for any submission failure.
/// The underlying cause is logged, never displayed.
pub const SUBMISSION_FAILED_MESSAGE: &str =
    "There was an error submitting your request. Please try again.";

/// Catalog (year/make/model) lookup failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse catalog response: {0}")]
    Malformed(String),
}

/// Valuation pipeline failures, one variant per pipeline stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Valuation request failed: {0}")]
    ValuationTransport(#[source] reqwest::Error),

    #[error("Valuation service returned status {status}: {body}")]
    ValuationStatus { status: u16, body: String },

    #[error("Failed to parse valuation response: {0}")]
    MalformedValuation(String),

    #[error("Failed to encode sink payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Sink request failed: {0}")]
    SinkTransport(#[source] reqwest::Error),

    #[error("Sink rejected payload with status {0}")]
    SinkRejected(u16),

    #[error("Invalid redirect base URL '{url}': {reason}")]
    InvalidRedirect { url: String, reason: String },
}

impl PipelineError {
    /// The generic, user-facing text for this failure.
    pub fn user_message(&self) -> &'static str {
        SUBMISSION_FAILED_MESSAGE
    }
}

/// Unknown field name supplied by a host
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown form field: {0}")]
pub struct UnknownField(pub String);

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
