//! Plain-text rendering of tree rows, series and detail views

use itertools::Itertools;
use termtree::Tree;

use crate::domain::{
    CrossSection, DistrictDetail, FetchState, Metric, PopulationSource, ReconciledSeries,
    RegionLevel, TreeRow,
};

/// Metrics whose growth is shown under a series table.
pub const GROWTH_METRICS: [Metric; 4] = [
    Metric::Population,
    Metric::HouseholdCount,
    Metric::HouseCount,
    Metric::CompanyCount,
];

/// `1234567` -> `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let bytes = digits.as_bytes();
    let head = bytes.len() % 3;
    let mut groups: Vec<&str> = Vec::new();
    if head > 0 {
        groups.push(&digits[..head]);
    }
    groups.extend(
        bytes[head..]
            .chunks(3)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok()),
    );
    groups.join(",")
}

pub fn percent(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.1}%", value)
    } else {
        format!("{:.1}%", value)
    }
}

fn disclosure(row: &TreeRow) -> &'static str {
    if row.level == RegionLevel::Subdistrict {
        return "·";
    }
    match (row.fetch, row.expanded) {
        (FetchState::Fetching, _) => "…",
        (FetchState::Failed, _) => "✗",
        (_, true) => "▾",
        (_, false) => "▸",
    }
}

pub fn row_label(row: &TreeRow) -> String {
    let mut label = format!("{} {} [{}]", disclosure(row), row.name, row.code);
    if row.population > 0 {
        label.push_str(&format!(" pop {}", thousands(row.population)));
    }
    if row.level != RegionLevel::Subdistrict && row.child_count > 0 {
        label.push_str(&format!(" ({} {})", row.child_count, children_noun(row.level)));
    }
    label
}

fn children_noun(level: RegionLevel) -> &'static str {
    match level {
        RegionLevel::Province => "districts",
        _ => "sub-districts",
    }
}

/// Build a termtree from pre-order rows.
pub fn tree(title: &str, rows: &[&TreeRow]) -> Tree<String> {
    let mut pos = 0;
    Tree::new(title.to_string()).with_leaves(subtree(rows, &mut pos, 0))
}

fn subtree(rows: &[&TreeRow], pos: &mut usize, depth: usize) -> Vec<Tree<String>> {
    let mut leaves = Vec::new();
    while let Some(row) = rows.get(*pos) {
        if row.depth < depth {
            break;
        }
        *pos += 1;
        let children = subtree(rows, pos, row.depth + 1);
        leaves.push(Tree::new(row_label(row)).with_leaves(children));
    }
    leaves
}

/// Fixed-width table of a reconciled series.
pub fn series_table(series: &ReconciledSeries) -> Vec<String> {
    let mut lines = vec![format!(
        "{:>6} {:>12} {:>11} {:>8} {:>9} {:>10} {:>10}  {}",
        "year", "population", "households", "avg hh", "houses", "companies", "employees", "source"
    )];
    lines.extend(series.entries().iter().map(|e| {
        format!(
            "{:>6} {:>12} {:>11} {:>8.2} {:>9} {:>10} {:>10}  {}",
            e.year,
            thousands(e.population),
            thousands(e.household_count),
            e.avg_household_size,
            thousands(e.house_count),
            thousands(e.company_count),
            thousands(e.employee_count),
            source_label(e.population_source)
        )
    }));
    lines
}

pub fn growth_lines(series: &ReconciledSeries) -> Vec<String> {
    let years = series.years();
    let span = match (years.first(), years.last()) {
        (Some(first), Some(last)) => format!("{}-{}", first, last),
        _ => String::new(),
    };
    GROWTH_METRICS
        .iter()
        .map(|metric| {
            format!(
                "{} {}: {}",
                metric.label(),
                span,
                percent(series.growth_rate(*metric))
            )
        })
        .collect()
}

pub fn source_label(source: PopulationSource) -> &'static str {
    match source {
        PopulationSource::AgeBucketed => "age-bucketed",
        PopulationSource::Household => "household",
    }
}

fn opt_count(value: Option<u64>) -> String {
    value.map(thousands).unwrap_or_else(|| "-".into())
}

fn opt_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "-".into())
}

/// Label/value pairs of a sub-district cross-section.
pub fn cross_section_fields(cross: &CrossSection) -> Vec<(&'static str, String)> {
    let household = cross.household.clone().unwrap_or_default();
    let house = cross.house.clone().unwrap_or_default();
    let company = cross.company.clone().unwrap_or_default();
    let mut fields = vec![
        ("year", cross.year.to_string()),
        ("population", opt_count(household.family_member_count)),
        ("households", opt_count(household.household_count)),
        (
            "avg household size",
            household
                .avg_family_member_count
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".into()),
        ),
        ("houses", opt_count(house.house_count)),
        ("apartments", opt_count(house.apartment_count)),
        ("companies", opt_count(company.corp_count)),
        ("workers", opt_count(company.total_worker)),
    ];
    if let Some(source) = cross.population_source {
        fields.push(("population source", source_label(source).to_string()));
    }
    fields
}

/// Label/value pairs of a district snapshot.
pub fn district_fields(detail: &DistrictDetail) -> Vec<(&'static str, String)> {
    let name = [detail.province_name.as_deref(), detail.name.as_deref()]
        .into_iter()
        .flatten()
        .join(" ");
    vec![
        ("name", if name.is_empty() { "-".into() } else { name }),
        ("population", opt_count(detail.total_population)),
        ("male", opt_percent(detail.male_percent)),
        ("apartments", opt_percent(detail.apartment_percent)),
        ("65+", opt_percent(detail.senior_percent)),
        ("one-person households", opt_percent(detail.one_person_household_percent)),
    ]
}

pub fn business_lines(detail: &DistrictDetail, limit: usize) -> Vec<String> {
    detail
        .businesses
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, b)| format!("{:>2}. {} {:.1}%", i + 1, b.name, b.percent))
        .collect()
}

pub fn tech_lines(detail: &DistrictDetail) -> Vec<String> {
    detail
        .tech_categories
        .iter()
        .map(|t| {
            let growth = t
                .corp_growth_rate
                .map(|g| format!(", growth {}", percent(g)))
                .unwrap_or_default();
            format!(
                "{}: {} companies ({:.1}%{})",
                t.name,
                thousands(t.corp_count),
                t.corp_percent,
                growth
            )
        })
        .collect()
}
