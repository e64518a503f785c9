//! Domain entities: regions, yearly records and reconciled series

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Administrative level of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionLevel {
    Province,
    District,
    Subdistrict,
}

impl RegionLevel {
    /// Level of this region's children, None for sub-districts.
    pub fn child(self) -> Option<Self> {
        match self {
            RegionLevel::Province => Some(RegionLevel::District),
            RegionLevel::District => Some(RegionLevel::Subdistrict),
            RegionLevel::Subdistrict => None,
        }
    }

    /// Zero-based depth in the hierarchy.
    pub fn depth(self) -> usize {
        match self {
            RegionLevel::Province => 0,
            RegionLevel::District => 1,
            RegionLevel::Subdistrict => 2,
        }
    }
}

impl fmt::Display for RegionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegionLevel::Province => "province",
            RegionLevel::District => "district",
            RegionLevel::Subdistrict => "sub-district",
        };
        write!(f, "{}", s)
    }
}

/// Summary of a region as returned by a list call.
///
/// The numbers are shown before the region is expanded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub code: String,
    pub name: String,
    /// Number of child regions reported upstream (0 for sub-districts)
    pub child_count: u32,
    pub population: u64,
    pub household_count: u64,
    pub company_count: u64,
}

impl RegionSummary {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Age-bucketed population statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_population: Option<u64>,
    pub avg_age: Option<f64>,
    pub aging_index: Option<f64>,
    pub oldage_support_ratio: Option<f64>,
    pub population_density: Option<f64>,
}

/// Population of one age bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroup {
    pub male: u64,
    pub female: u64,
    pub total: u64,
}

/// Household aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdStats {
    pub household_count: Option<u64>,
    pub family_member_count: Option<u64>,
    pub avg_family_member_count: Option<f64>,
}

/// Housing stock breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseStats {
    pub house_count: Option<u64>,
    pub detached_house_count: Option<u64>,
    pub apartment_count: Option<u64>,
    pub multi_house_count: Option<u64>,
}

/// Business registry counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyStats {
    pub corp_count: Option<u64>,
    pub employee_count: Option<u64>,
    pub avg_employee_count: Option<f64>,
    pub total_worker: Option<u64>,
}

/// Raw statistics of one region for one year.
///
/// Every sub-object is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    pub basic: Option<BasicStats>,
    /// Age bucket label -> population, ordered by label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub age_groups: BTreeMap<String, AgeGroup>,
    pub household: Option<HouseholdStats>,
    pub house: Option<HouseStats>,
    pub company: Option<CompanyStats>,
}

impl YearRecord {
    /// True when no sub-object is present.
    pub fn is_empty(&self) -> bool {
        self.basic.is_none()
            && self.age_groups.is_empty()
            && self.household.is_none()
            && self.house.is_none()
            && self.company.is_none()
    }

    /// Fill absent sub-objects from `other`; sub-objects already present win.
    pub fn merge_missing(mut self, other: &YearRecord) -> Self {
        if self.basic.is_none() {
            self.basic = other.basic.clone();
        }
        if self.age_groups.is_empty() {
            self.age_groups = other.age_groups.clone();
        }
        if self.household.is_none() {
            self.household = other.household.clone();
        }
        if self.house.is_none() {
            self.house = other.house.clone();
        }
        if self.company.is_none() {
            self.company = other.company.clone();
        }
        self
    }
}

/// Enhanced (age-bucketed) multi-year payload of one sub-district.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnhancedDetail {
    pub years: Vec<i32>,
    pub per_year: BTreeMap<i32, YearRecord>,
    /// Cross-section of the newest year
    pub latest: Option<YearRecord>,
}

impl EnhancedDetail {
    /// Enhanced record for `year`, falling back to `latest` when `year` is the newest.
    pub fn for_year(&self, year: i32) -> Option<&YearRecord> {
        if let Some(record) = self.per_year.get(&year) {
            return Some(record);
        }
        match self.newest_year() {
            Some(newest) if newest == year => self.latest.as_ref(),
            _ => None,
        }
    }

    /// Per-year records with `latest` filling in for a missing newest year.
    ///
    /// Agrees with [`EnhancedDetail::for_year`] for every year.
    pub fn records(&self) -> BTreeMap<i32, YearRecord> {
        let mut records = self.per_year.clone();
        if let (Some(newest), Some(latest)) = (self.newest_year(), &self.latest) {
            records.entry(newest).or_insert_with(|| latest.clone());
        }
        records
    }

    fn newest_year(&self) -> Option<i32> {
        self.years
            .iter()
            .copied()
            .chain(self.per_year.keys().copied())
            .max()
    }
}

/// Which upstream quantity the reconciled population came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationSource {
    /// `basic.total_population` of the age-bucketed source
    AgeBucketed,
    /// `household.family_member_count`
    Household,
}

/// Reconciled statistics of one region for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledYearEntry {
    pub year: i32,
    pub population: u64,
    pub household_count: u64,
    pub avg_household_size: f64,
    pub house_count: u64,
    pub detached_house_count: u64,
    pub apartment_count: u64,
    pub multi_house_count: u64,
    pub company_count: u64,
    pub employee_count: u64,
    pub avg_employee_count: f64,
    pub population_source: PopulationSource,
}

/// Numeric quantity that can be extracted from a reconciled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Population,
    HouseholdCount,
    AvgHouseholdSize,
    HouseCount,
    DetachedHouseCount,
    ApartmentCount,
    MultiHouseCount,
    CompanyCount,
    EmployeeCount,
    AvgEmployeeCount,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Population,
        Metric::HouseholdCount,
        Metric::AvgHouseholdSize,
        Metric::HouseCount,
        Metric::DetachedHouseCount,
        Metric::ApartmentCount,
        Metric::MultiHouseCount,
        Metric::CompanyCount,
        Metric::EmployeeCount,
        Metric::AvgEmployeeCount,
    ];

    pub fn value(self, entry: &ReconciledYearEntry) -> f64 {
        match self {
            Metric::Population => entry.population as f64,
            Metric::HouseholdCount => entry.household_count as f64,
            Metric::AvgHouseholdSize => entry.avg_household_size,
            Metric::HouseCount => entry.house_count as f64,
            Metric::DetachedHouseCount => entry.detached_house_count as f64,
            Metric::ApartmentCount => entry.apartment_count as f64,
            Metric::MultiHouseCount => entry.multi_house_count as f64,
            Metric::CompanyCount => entry.company_count as f64,
            Metric::EmployeeCount => entry.employee_count as f64,
            Metric::AvgEmployeeCount => entry.avg_employee_count,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Population => "population",
            Metric::HouseholdCount => "households",
            Metric::AvgHouseholdSize => "avg household size",
            Metric::HouseCount => "houses",
            Metric::DetachedHouseCount => "detached houses",
            Metric::ApartmentCount => "apartments",
            Metric::MultiHouseCount => "multi-family houses",
            Metric::CompanyCount => "companies",
            Metric::EmployeeCount => "employees",
            Metric::AvgEmployeeCount => "avg employees",
        }
    }
}

/// Year-ordered reconciled series of one region.
///
/// Years are strictly increasing and never duplicated; years without usable
/// data are omitted. Only the reconciliation functions construct it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledSeries {
    code: String,
    entries: Vec<ReconciledYearEntry>,
}

impl ReconciledSeries {
    pub(crate) fn new(code: String, entries: Vec<ReconciledYearEntry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].year < w[1].year));
        Self { code, entries }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn entries(&self) -> &[ReconciledYearEntry] {
        &self.entries
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries.iter().map(|e| e.year).collect()
    }

    pub fn get(&self, year: i32) -> Option<&ReconciledYearEntry> {
        self.entries
            .binary_search_by_key(&year, |e| e.year)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values of `metric` in year order.
    pub fn extract(&self, metric: Metric) -> Vec<f64> {
        self.entries.iter().map(|e| metric.value(e)).collect()
    }

    /// Growth of `metric` from the first to the last year, in percent.
    pub fn growth_rate(&self, metric: Metric) -> f64 {
        crate::domain::reconcile::growth_rate(&self.extract(metric))
    }
}

/// Cross-sectional detail of one sub-district for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossSection {
    pub code: String,
    pub year: i32,
    pub household: Option<HouseholdStats>,
    pub house: Option<HouseStats>,
    pub company: Option<CompanyStats>,
    /// Set once the household numbers have been reconciled
    pub population_source: Option<PopulationSource>,
}

impl CrossSection {
    pub fn from_record(code: impl Into<String>, year: i32, record: YearRecord) -> Self {
        Self {
            code: code.into(),
            year,
            household: record.household,
            house: record.house,
            company: record.company,
            population_source: None,
        }
    }

    pub fn population(&self) -> Option<u64> {
        self.household.as_ref().and_then(|h| h.family_member_count)
    }

    pub fn household_count(&self) -> Option<u64> {
        self.household.as_ref().and_then(|h| h.household_count)
    }
}

/// Technology-sector share of a district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechCategory {
    pub code: String,
    pub name: String,
    pub corp_count: u64,
    pub corp_percent: f64,
    pub corp_growth_rate: Option<f64>,
}

/// Business theme share of a district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessShare {
    pub name: String,
    pub percent: f64,
}

/// Cross-sectional commercial snapshot of a district.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistrictDetail {
    pub code: String,
    pub province_name: Option<String>,
    pub name: Option<String>,
    pub total_population: Option<u64>,
    pub male_percent: Option<f64>,
    pub apartment_percent: Option<f64>,
    pub apartment_count: Option<u64>,
    pub senior_percent: Option<f64>,
    pub one_person_household_percent: Option<f64>,
    pub tech_categories: Vec<TechCategory>,
    /// Ordered by upstream rank
    pub businesses: Vec<BusinessShare>,
}
