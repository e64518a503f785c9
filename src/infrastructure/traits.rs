//! I/O boundary traits for testability
//!
//! The data source is abstracted behind [`RegionSource`] so the navigator and
//! the reconciliation service can be tested against in-memory fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DistrictDetail, EnhancedDetail, RegionSummary, YearRecord};

/// Failures of the data source boundary.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("cannot decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("empty response: {0}")]
    Empty(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Read-only statistics provider keyed by region code and year.
#[async_trait]
pub trait RegionSource: Send + Sync {
    async fn list_provinces(&self) -> SourceResult<Vec<RegionSummary>>;

    async fn list_districts(&self, province_code: &str) -> SourceResult<Vec<RegionSummary>>;

    async fn list_subdistricts(&self, district_code: &str) -> SourceResult<Vec<RegionSummary>>;

    /// Cross-sectional record of one sub-district for one year.
    async fn get_year_record(&self, subdistrict_code: &str, year: i32) -> SourceResult<YearRecord>;

    /// Age-bucketed multi-year payload; empty when the region has none.
    async fn get_enhanced_detail(&self, subdistrict_code: &str) -> SourceResult<EnhancedDetail>;

    /// Years the provider has data for.
    async fn list_years(&self) -> SourceResult<Vec<i32>>;

    /// Plain multi-year household/house/company records.
    async fn get_timeseries(&self, subdistrict_code: &str)
        -> SourceResult<BTreeMap<i32, YearRecord>>;

    async fn get_district_detail(&self, district_code: &str) -> SourceResult<DistrictDetail>;
}
