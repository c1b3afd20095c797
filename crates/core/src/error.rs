// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type.
///
/// Step failures are NOT represented here: the executor converts them
/// into `ActionResult`s and report entries. Only probe and report-write
/// failures propagate to the top level.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Probe error: {0}")]
    Probe(#[from] crate::port::ProbeError),

    #[error("Report write error: {0}")]
    ReportWrite(#[from] crate::port::ReportWriteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
