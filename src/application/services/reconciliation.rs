//! Series and cross-section assembly for a selected sub-district
//!
//! Fetches the raw yearly sources and runs them through the domain
//! reconciliation functions. Nothing is cached between selections.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, SourceResultExt};
use crate::domain::{
    merge_sources, merge_year, reconcile_series, reconciled_cross_section, CrossSection,
    DomainError, ReconciledSeries,
};
use crate::infrastructure::traits::RegionSource;

/// Year shown when neither the settings nor the source name one.
pub const FALLBACK_YEAR: i32 = 2023;

/// Series state of a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "series", rename_all = "snake_case")]
pub enum SeriesOutcome {
    Ready(ReconciledSeries),
    /// No year had population data
    NoData,
}

impl SeriesOutcome {
    pub fn series(&self) -> Option<&ReconciledSeries> {
        match self {
            SeriesOutcome::Ready(series) => Some(series),
            SeriesOutcome::NoData => None,
        }
    }
}

/// Cross-sectional detail and multi-year series of one sub-district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubdistrictView {
    pub cross_section: CrossSection,
    pub series: SeriesOutcome,
}

/// Builds reconciled views from the data source.
pub struct ReconciliationService {
    source: Arc<dyn RegionSource>,
    year: Option<i32>,
}

impl ReconciliationService {
    /// `year` pins the cross-section year; None uses the newest available.
    pub fn new(source: Arc<dyn RegionSource>, year: Option<i32>) -> Self {
        Self { source, year }
    }

    /// Year of the cross-sectional view.
    pub async fn current_year(&self) -> ApplicationResult<i32> {
        if let Some(year) = self.year {
            return Ok(year);
        }
        let years = self
            .source
            .list_years()
            .await
            .with_source_context("list years", "all")?;
        Ok(years.into_iter().max().unwrap_or(FALLBACK_YEAR))
    }

    /// Reconciled multi-year series of `code`.
    ///
    /// Fails with `EmptySeries` when no year has population data.
    #[instrument(level = "debug", skip(self))]
    pub async fn series(&self, code: &str) -> ApplicationResult<ReconciledSeries> {
        let (enhanced, plain) = tokio::try_join!(
            async {
                self.source
                    .get_enhanced_detail(code)
                    .await
                    .with_source_context("enhanced detail", code)
            },
            async {
                self.source
                    .get_timeseries(code)
                    .await
                    .with_source_context("timeseries", code)
            },
        )?;
        let merged = merge_sources(&enhanced.records(), &plain);
        Ok(reconcile_series(code, &merged)?)
    }

    /// Cross-section of `code` for `year` with reconciled household numbers.
    #[instrument(level = "debug", skip(self))]
    pub async fn cross_section(&self, code: &str, year: i32) -> ApplicationResult<CrossSection> {
        let (record, enhanced) = tokio::try_join!(
            async {
                self.source
                    .get_year_record(code, year)
                    .await
                    .with_source_context("year record", code)
            },
            async {
                self.source
                    .get_enhanced_detail(code)
                    .await
                    .with_source_context("enhanced detail", code)
            },
        )?;
        let source = merge_year(enhanced.for_year(year), &record);
        Ok(reconciled_cross_section(code, year, source))
    }

    /// Both views of a sub-district from a single round of fetches.
    ///
    /// An empty series is reported as [`SeriesOutcome::NoData`]; any source
    /// failure fails the whole view.
    #[instrument(level = "debug", skip(self))]
    pub async fn subdistrict(&self, code: &str) -> ApplicationResult<SubdistrictView> {
        let year = self.current_year().await?;
        let (record, enhanced, plain) = tokio::try_join!(
            async {
                self.source
                    .get_year_record(code, year)
                    .await
                    .with_source_context("year record", code)
            },
            async {
                self.source
                    .get_enhanced_detail(code)
                    .await
                    .with_source_context("enhanced detail", code)
            },
            async {
                self.source
                    .get_timeseries(code)
                    .await
                    .with_source_context("timeseries", code)
            },
        )?;

        // Both views reconcile the same record for the current year.
        let merged = merge_sources(&enhanced.records(), &plain);
        let cross_section =
            reconciled_cross_section(code, year, merge_year(merged.get(&year), &record));
        let series = match reconcile_series(code, &merged) {
            Ok(series) => {
                info!("subdistrict {}: {} reconciled years", code, series.len());
                SeriesOutcome::Ready(series)
            }
            Err(DomainError::EmptySeries(_)) => {
                debug!("subdistrict {}: no usable year", code);
                SeriesOutcome::NoData
            }
            Err(e) => return Err(ApplicationError::Domain(e)),
        };

        Ok(SubdistrictView {
            cross_section,
            series,
        })
    }
}
