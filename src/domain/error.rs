//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the region tree and series rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("region not found: {0}")]
    NotFound(String),

    #[error("no year with population data for region: {0}")]
    EmptySeries(String),

    #[error("region has no child level: {0}")]
    NotExpandable(String),

    #[error("inconsistent child list for {code}: {message}")]
    MalformedChildren { code: String, message: String },
}
