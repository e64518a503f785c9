//! Error conversion helpers for data source calls
//!
//! Provides an extension trait that turns source failures into
//! `DataUnavailable` with the failing operation as context.

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::SourceResult;

/// Extension trait for converting `SourceResult` to `ApplicationResult` with context.
pub trait SourceResultExt<T> {
    /// Add operation context to a source error.
    ///
    /// # Example
    /// ```ignore
    /// source.list_districts(code).await
    ///     .with_source_context("list districts", code)?;
    /// ```
    fn with_source_context(self, action: &str, code: &str) -> ApplicationResult<T>;
}

impl<T> SourceResultExt<T> for SourceResult<T> {
    fn with_source_context(self, action: &str, code: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::DataUnavailable {
            context: format!("{}: {}", action, code),
            source: e,
        })
    }
}
