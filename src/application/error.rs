//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::traits::SourceError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("data unavailable: {context}")]
    DataUnavailable {
        context: String,
        #[source]
        source: SourceError,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// Source unreachable or response malformed.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            ApplicationError::DataUnavailable { .. }
                | ApplicationError::Domain(DomainError::MalformedChildren { .. })
        )
    }

    /// No usable year; render a "no data" state, not a failure.
    pub fn is_empty_series(&self) -> bool {
        matches!(self, ApplicationError::Domain(DomainError::EmptySeries(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApplicationError::Domain(DomainError::NotFound(_)))
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
