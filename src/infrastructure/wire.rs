//! JSON payloads of the statistics service
//!
//! Converted into domain types at the boundary. Numbers arrive as integers,
//! floats or numeric strings; empty `{}` sub-objects count as absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::{
    AgeGroup, BasicStats, BusinessShare, CompanyStats, DistrictDetail, EnhancedDetail, HouseStats,
    HouseholdStats, RegionSummary, TechCategory, YearRecord,
};

fn de_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn count(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0).round() as u64)
}

fn count_or_zero(value: Option<f64>) -> u64 {
    count(value).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Region lists
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProvinceListDto {
    pub sido_list: Vec<ProvinceDto>,
}

#[derive(Debug, Deserialize)]
pub struct ProvinceDto {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_number")]
    pub sigungu_count: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total_population: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total_household: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total_company: Option<f64>,
}

impl From<ProvinceDto> for RegionSummary {
    fn from(dto: ProvinceDto) -> Self {
        RegionSummary {
            code: dto.code,
            name: dto.name,
            child_count: count_or_zero(dto.sigungu_count) as u32,
            population: count_or_zero(dto.total_population),
            household_count: count_or_zero(dto.total_household),
            company_count: count_or_zero(dto.total_company),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DistrictListDto {
    pub sigungu_list: Vec<DistrictDto>,
}

#[derive(Debug, Deserialize)]
pub struct DistrictDto {
    pub sigungu_code: String,
    #[serde(default)]
    pub sigungu_name: String,
    #[serde(default, deserialize_with = "de_number")]
    pub emdong_count: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total_population: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total_household: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total_company: Option<f64>,
}

impl From<DistrictDto> for RegionSummary {
    fn from(dto: DistrictDto) -> Self {
        RegionSummary {
            code: dto.sigungu_code,
            name: dto.sigungu_name,
            child_count: count_or_zero(dto.emdong_count) as u32,
            population: count_or_zero(dto.total_population),
            household_count: count_or_zero(dto.total_household),
            company_count: count_or_zero(dto.total_company),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubdistrictListDto {
    pub emdong_list: Vec<SubdistrictDto>,
}

#[derive(Debug, Deserialize)]
pub struct SubdistrictDto {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_number")]
    pub population: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub household_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub company_cnt: Option<f64>,
}

impl From<SubdistrictDto> for RegionSummary {
    fn from(dto: SubdistrictDto) -> Self {
        RegionSummary {
            code: dto.code,
            name: dto.name,
            child_count: 0,
            population: count_or_zero(dto.population),
            household_count: count_or_zero(dto.household_cnt),
            company_count: count_or_zero(dto.company_cnt),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct YearsDto {
    pub years: Vec<String>,
}

// ---------------------------------------------------------------------------
// Yearly records
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct BasicDto {
    #[serde(default, deserialize_with = "de_number")]
    pub total_population: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub avg_age: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub aging_index: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub oldage_support_ratio: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub population_density: Option<f64>,
}

impl BasicDto {
    fn into_domain(self) -> Option<BasicStats> {
        let stats = BasicStats {
            total_population: count(self.total_population),
            avg_age: self.avg_age,
            aging_index: self.aging_index,
            oldage_support_ratio: self.oldage_support_ratio,
            population_density: self.population_density,
        };
        (stats != BasicStats::default()).then_some(stats)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AgeGroupDto {
    #[serde(default, deserialize_with = "de_number")]
    pub male: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub female: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub total: Option<f64>,
}

impl From<AgeGroupDto> for AgeGroup {
    fn from(dto: AgeGroupDto) -> Self {
        AgeGroup {
            male: count_or_zero(dto.male),
            female: count_or_zero(dto.female),
            total: count_or_zero(dto.total),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HouseholdDto {
    #[serde(default, deserialize_with = "de_number")]
    pub household_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub family_member_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub avg_family_member_cnt: Option<f64>,
}

impl HouseholdDto {
    fn into_domain(self) -> Option<HouseholdStats> {
        let stats = HouseholdStats {
            household_count: count(self.household_cnt),
            family_member_count: count(self.family_member_cnt),
            avg_family_member_count: self.avg_family_member_cnt,
        };
        (stats != HouseholdStats::default()).then_some(stats)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HouseDto {
    #[serde(default, deserialize_with = "de_number")]
    pub house_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub detached_house_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub apt_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub multi_house_cnt: Option<f64>,
}

impl HouseDto {
    fn into_domain(self) -> Option<HouseStats> {
        let stats = HouseStats {
            house_count: count(self.house_cnt),
            detached_house_count: count(self.detached_house_cnt),
            apartment_count: count(self.apt_cnt),
            multi_house_count: count(self.multi_house_cnt),
        };
        (stats != HouseStats::default()).then_some(stats)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyDto {
    #[serde(default, deserialize_with = "de_number")]
    pub corp_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub corp_emp_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub avg_corp_emp_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub tot_worker: Option<f64>,
}

impl CompanyDto {
    fn into_domain(self) -> Option<CompanyStats> {
        let stats = CompanyStats {
            corp_count: count(self.corp_cnt),
            employee_count: count(self.corp_emp_cnt),
            avg_employee_count: self.avg_corp_emp_cnt,
            total_worker: count(self.tot_worker),
        };
        (stats != CompanyStats::default()).then_some(stats)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct YearRecordDto {
    pub basic: Option<BasicDto>,
    #[serde(default)]
    pub age_groups: BTreeMap<String, AgeGroupDto>,
    pub household: Option<HouseholdDto>,
    pub house: Option<HouseDto>,
    pub company: Option<CompanyDto>,
}

impl From<YearRecordDto> for YearRecord {
    fn from(dto: YearRecordDto) -> Self {
        YearRecord {
            basic: dto.basic.and_then(BasicDto::into_domain),
            age_groups: dto
                .age_groups
                .into_iter()
                .map(|(label, group)| (label, group.into()))
                .collect(),
            household: dto.household.and_then(HouseholdDto::into_domain),
            house: dto.house.and_then(HouseDto::into_domain),
            company: dto.company.and_then(CompanyDto::into_domain),
        }
    }
}

/// Shared shape of the timeseries and enhanced endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SeriesDto {
    #[serde(default)]
    pub timeseries: BTreeMap<String, YearRecordDto>,
    #[serde(default)]
    pub years: Vec<String>,
    pub latest: Option<YearRecordDto>,
}

/// Parse a year key such as `"2023"`.
pub fn parse_year(raw: &str) -> Result<i32, String> {
    raw.trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid year '{}': {}", raw, e))
}

impl SeriesDto {
    pub fn into_records(self) -> Result<BTreeMap<i32, YearRecord>, String> {
        self.timeseries
            .into_iter()
            .map(|(year, record)| Ok((parse_year(&year)?, record.into())))
            .collect()
    }

    pub fn into_enhanced(self) -> Result<EnhancedDetail, String> {
        let years = self
            .years
            .iter()
            .map(|y| parse_year(y))
            .collect::<Result<Vec<_>, _>>()?;
        let latest = self
            .latest
            .map(YearRecord::from)
            .filter(|record| !record.is_empty());
        let per_year = SeriesDto {
            timeseries: self.timeseries,
            ..Default::default()
        }
        .into_records()?;
        Ok(EnhancedDetail {
            years,
            per_year,
            latest,
        })
    }
}

// ---------------------------------------------------------------------------
// District detail
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DistrictDetailDto {
    #[serde(default)]
    pub sigungu_code: String,
    #[serde(default)]
    pub commercial: CommercialDto,
    #[serde(default)]
    pub tech: TechDto,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommercialDto {
    pub sido_name: Option<String>,
    pub sigungu_name: Option<String>,
    #[serde(default)]
    pub gender: GenderDto,
    #[serde(default)]
    pub house_type: HouseTypeDto,
    #[serde(default)]
    pub region_summary: RegionSummaryDto,
    #[serde(default)]
    pub business_distribution: Vec<BusinessDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenderDto {
    #[serde(default, deserialize_with = "de_number")]
    pub total_population: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub male_per: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HouseTypeDto {
    #[serde(default, deserialize_with = "de_number")]
    pub apartment_per: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub apartment_cnt: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegionSummaryDto {
    #[serde(default, deserialize_with = "de_number")]
    pub senior_65_plus_per: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub one_person_family_per: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BusinessDto {
    pub s_theme_cd_nm: Option<String>,
    pub theme_nm: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub dist_per: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TechDto {
    #[serde(default)]
    pub tech_categories: BTreeMap<String, TechCategoryDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TechCategoryDto {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_number")]
    pub corp_cnt: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub corp_per: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub corp_growth_rate: Option<f64>,
}

impl DistrictDetailDto {
    pub fn into_domain(self, code: &str) -> DistrictDetail {
        let commercial = self.commercial;
        let code = if self.sigungu_code.is_empty() {
            code.to_string()
        } else {
            self.sigungu_code
        };
        DistrictDetail {
            code,
            province_name: commercial.sido_name,
            name: commercial.sigungu_name,
            total_population: count(commercial.gender.total_population),
            male_percent: commercial.gender.male_per,
            apartment_percent: commercial.house_type.apartment_per,
            apartment_count: count(commercial.house_type.apartment_cnt),
            senior_percent: commercial.region_summary.senior_65_plus_per,
            one_person_household_percent: commercial.region_summary.one_person_family_per,
            tech_categories: self
                .tech
                .tech_categories
                .into_iter()
                .map(|(code, tech)| TechCategory {
                    code,
                    name: tech.name,
                    corp_count: count_or_zero(tech.corp_cnt),
                    corp_percent: tech.corp_per.unwrap_or(0.0),
                    corp_growth_rate: tech.corp_growth_rate,
                })
                .collect(),
            businesses: commercial
                .business_distribution
                .into_iter()
                .map(|b| BusinessShare {
                    name: b.s_theme_cd_nm.or(b.theme_nm).unwrap_or_else(|| "-".into()),
                    percent: b.dist_per.unwrap_or(0.0),
                })
                .collect(),
        }
    }
}
