//! Time-series reconciliation
//!
//! Merges partially populated yearly records into one consistent series.
//!
//! Population precedence (highest first):
//! 1. `basic.total_population` when present and > 0
//! 2. `household.family_member_count`
//!
//! When the age-bucketed population wins, the household count is re-derived
//! as `round(population / avg_household_size)` so both numbers stay mutually
//! consistent. The same function backs the series, the cross-sectional
//! overwrite and metric extraction.

use std::collections::BTreeMap;

use tracing::{debug, instrument, trace};

use crate::domain::entities::{
    CrossSection, PopulationSource, ReconciledSeries, ReconciledYearEntry, YearRecord,
};
use crate::domain::error::DomainError;

/// Household size assumed when the household source reports none.
pub const DEFAULT_HOUSEHOLD_SIZE: f64 = 2.0;

/// Reconciled population figures of one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationFigures {
    pub population: u64,
    pub household_count: u64,
    pub avg_household_size: f64,
    pub source: PopulationSource,
}

/// Apply the population precedence rule to one record.
///
/// Returns None when neither a positive age-bucketed population nor a
/// household sub-object is present.
pub fn reconcile_population(record: &YearRecord) -> Option<PopulationFigures> {
    let reported_avg = record
        .household
        .as_ref()
        .and_then(|h| h.avg_family_member_count)
        .filter(|avg| avg.is_finite() && *avg > 0.0);

    match (&record.basic, &record.household) {
        (Some(basic), _) if basic.total_population.is_some_and(|p| p > 0) => {
            let population = basic.total_population.unwrap_or_default();
            let avg = reported_avg.unwrap_or(DEFAULT_HOUSEHOLD_SIZE);
            Some(PopulationFigures {
                population,
                household_count: derive_household_count(population, avg),
                avg_household_size: avg,
                source: PopulationSource::AgeBucketed,
            })
        }
        (_, Some(household)) => Some(PopulationFigures {
            population: household.family_member_count.unwrap_or(0),
            household_count: household.household_count.unwrap_or(0),
            avg_household_size: reported_avg.unwrap_or(0.0),
            source: PopulationSource::Household,
        }),
        _ => None,
    }
}

/// `round(population / avg_household_size)`, halves rounded up.
pub fn derive_household_count(population: u64, avg_household_size: f64) -> u64 {
    let derived = (population as f64 / avg_household_size).round();
    if derived.is_finite() && derived > 0.0 {
        derived as u64
    } else {
        0
    }
}

/// Reconcile one year. None means the year has no usable population data.
pub fn reconcile_year(year: i32, record: &YearRecord) -> Option<ReconciledYearEntry> {
    let figures = reconcile_population(record)?;
    let house = record.house.clone().unwrap_or_default();
    let company = record.company.clone().unwrap_or_default();

    Some(ReconciledYearEntry {
        year,
        population: figures.population,
        household_count: figures.household_count,
        avg_household_size: figures.avg_household_size,
        house_count: house.house_count.unwrap_or(0),
        detached_house_count: house.detached_house_count.unwrap_or(0),
        apartment_count: house.apartment_count.unwrap_or(0),
        multi_house_count: house.multi_house_count.unwrap_or(0),
        company_count: company.corp_count.unwrap_or(0),
        employee_count: company.employee_count.unwrap_or(0),
        avg_employee_count: company.avg_employee_count.unwrap_or(0.0),
        population_source: figures.source,
    })
}

/// Build the reconciled series of `code` from its yearly records.
///
/// Fails with [`DomainError::EmptySeries`] when no year carries population data.
#[instrument(level = "debug", skip(records), fields(years = records.len()))]
pub fn reconcile_series(
    code: &str,
    records: &BTreeMap<i32, YearRecord>,
) -> Result<ReconciledSeries, DomainError> {
    let entries: Vec<ReconciledYearEntry> = records
        .iter()
        .filter_map(|(&year, record)| {
            let entry = reconcile_year(year, record);
            if entry.is_none() {
                trace!("reconcile_series: dropping year {} of {}", year, code);
            }
            entry
        })
        .collect();

    if entries.is_empty() {
        debug!("reconcile_series: no usable year for {}", code);
        return Err(DomainError::EmptySeries(code.to_string()));
    }
    Ok(ReconciledSeries::new(code.to_string(), entries))
}

/// Merge two yearly sources; `primary` sub-objects win, `secondary` fills gaps.
pub fn merge_sources(
    primary: &BTreeMap<i32, YearRecord>,
    secondary: &BTreeMap<i32, YearRecord>,
) -> BTreeMap<i32, YearRecord> {
    let mut merged = secondary.clone();
    for (&year, record) in primary {
        let combined = match secondary.get(&year) {
            Some(other) => record.clone().merge_missing(other),
            None => record.clone(),
        };
        merged.insert(year, combined);
    }
    merged
}

/// Record of one year as the series sees it: `enhanced` sub-objects win,
/// `plain` fills gaps.
pub fn merge_year(enhanced: Option<&YearRecord>, plain: &YearRecord) -> YearRecord {
    match enhanced {
        Some(record) => record.clone().merge_missing(plain),
        None => plain.clone(),
    }
}

/// Cross-section of `source` with its household numbers reconciled.
pub fn reconciled_cross_section(code: &str, year: i32, source: YearRecord) -> CrossSection {
    let figures = reconcile_population(&source);
    let mut cross = CrossSection::from_record(code, year, source);
    if let Some(figures) = figures {
        augment_cross_section(&mut cross, &figures);
    }
    cross
}

/// Overwrite the cross-section's household numbers with reconciled `figures`.
///
/// A zero average household size leaves the reported average untouched.
pub fn augment_cross_section(cross: &mut CrossSection, figures: &PopulationFigures) {
    cross.population_source = Some(figures.source);
    let household = cross.household.get_or_insert_with(Default::default);
    household.family_member_count = Some(figures.population);
    household.household_count = Some(figures.household_count);
    if figures.avg_household_size > 0.0 {
        household.avg_family_member_count = Some(figures.avg_household_size);
    }
    debug!(
        "augment_cross_section: {} {} population={} households={} ({:?})",
        cross.code, cross.year, figures.population, figures.household_count, figures.source
    );
}

/// Growth from the first to the last value, in percent; 0 when the first value is 0.
pub fn growth_rate(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if first != 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}
