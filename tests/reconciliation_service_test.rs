mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use regstat::application::services::{ReconciliationService, SeriesOutcome, FALLBACK_YEAR};
use regstat::domain::{
    CompanyStats, EnhancedDetail, HouseStats, Metric, PopulationSource, YearRecord,
};
use regstat::infrastructure::RegionSource;
use regstat::util::testing;

use common::{basic, household, FakeSource};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn service(fake: &Arc<FakeSource>, year: Option<i32>) -> ReconciliationService {
    let source: Arc<dyn RegionSource> = fake.clone();
    ReconciliationService::new(source, year)
}

fn household_year(members: u64, households: u64) -> YearRecord {
    YearRecord {
        household: Some(household(Some(members), Some(households), None)),
        ..Default::default()
    }
}

#[tokio::test]
async fn given_household_and_enhanced_years_when_building_series_then_each_year_reconciled() {
    let fake = FakeSource::new();
    fake.set_timeseries(
        "S",
        BTreeMap::from([
            (2021, household_year(1000, 410)),
            (
                2022,
                YearRecord {
                    household: Some(household(Some(900), Some(123), Some(2.2))),
                    house: Some(HouseStats {
                        house_count: Some(300),
                        apartment_count: Some(120),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ),
        ]),
    );
    fake.set_enhanced(
        "S",
        EnhancedDetail {
            years: vec![2022],
            per_year: BTreeMap::from([(
                2022,
                YearRecord {
                    basic: Some(basic(1100)),
                    ..Default::default()
                },
            )]),
            latest: None,
        },
    );

    let series = service(&fake, None).series("S").await.unwrap();

    assert_eq!(series.code(), "S");
    assert_eq!(series.years(), vec![2021, 2022]);
    let y2022 = series.get(2022).unwrap();
    assert_eq!(y2022.population, 1100);
    assert_eq!(y2022.household_count, 500);
    assert_eq!(y2022.population_source, PopulationSource::AgeBucketed);
    assert_eq!(y2022.house_count, 300);
    assert_eq!(y2022.apartment_count, 120);
    assert_eq!(series.extract(Metric::Population), vec![1000.0, 1100.0]);
    assert!((series.growth_rate(Metric::Population) - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn given_enhanced_sub_object_when_merging_then_enhanced_wins_over_plain() {
    let fake = FakeSource::new();
    fake.set_timeseries(
        "S",
        BTreeMap::from([(
            2022,
            YearRecord {
                company: Some(CompanyStats {
                    corp_count: Some(10),
                    ..Default::default()
                }),
                household: Some(household(Some(500), Some(200), Some(2.5))),
                ..Default::default()
            },
        )]),
    );
    fake.set_enhanced(
        "S",
        EnhancedDetail {
            years: vec![2022],
            per_year: BTreeMap::from([(
                2022,
                YearRecord {
                    company: Some(CompanyStats {
                        corp_count: Some(12),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )]),
            latest: None,
        },
    );

    let series = service(&fake, None).series("S").await.unwrap();

    let entry = series.get(2022).unwrap();
    assert_eq!(entry.company_count, 12);
    assert_eq!(entry.population, 500);
    assert_eq!(entry.household_count, 200);
}

#[tokio::test]
async fn given_no_population_in_any_year_when_building_series_then_empty_series() {
    let fake = FakeSource::new();
    fake.set_timeseries(
        "S",
        BTreeMap::from([(
            2022,
            YearRecord {
                company: Some(CompanyStats {
                    corp_count: Some(3),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )]),
    );

    let err = service(&fake, None).series("S").await.unwrap_err();

    assert!(err.is_empty_series());
    assert!(!err.is_data_unavailable());
}

#[tokio::test]
async fn given_timeseries_failure_when_building_series_then_data_unavailable() {
    let fake = FakeSource::new();
    fake.fail("get_timeseries:S");

    let err = service(&fake, None).series("S").await.unwrap_err();

    assert!(err.is_data_unavailable());
}

#[tokio::test]
async fn given_year_override_when_resolving_current_year_then_source_not_asked() {
    let fake = FakeSource::new();
    fake.set_years(&[2020, 2023]);

    let year = service(&fake, Some(2021)).current_year().await.unwrap();

    assert_eq!(year, 2021);
    assert_eq!(fake.call_count("list_years"), 0);
}

#[tokio::test]
async fn given_available_years_when_resolving_current_year_then_newest_wins() {
    let fake = FakeSource::new();
    fake.set_years(&[2023, 2020, 2022]);

    assert_eq!(service(&fake, None).current_year().await.unwrap(), 2023);
}

#[tokio::test]
async fn given_no_years_when_resolving_current_year_then_fallback() {
    let fake = FakeSource::new();

    assert_eq!(
        service(&fake, None).current_year().await.unwrap(),
        FALLBACK_YEAR
    );
}

#[tokio::test]
async fn given_years_failure_when_building_view_then_data_unavailable() {
    let fake = FakeSource::new();
    fake.fail("list_years");

    let err = service(&fake, None).subdistrict("S").await.unwrap_err();

    assert!(err.is_data_unavailable());
    assert_eq!(fake.call_count("get_timeseries:S"), 0);
}

#[tokio::test]
async fn given_age_bucketed_population_when_building_cross_section_then_households_rederived() {
    let fake = FakeSource::new();
    fake.set_record(
        "S",
        2022,
        YearRecord {
            household: Some(household(Some(900), Some(123), Some(2.2))),
            ..Default::default()
        },
    );
    fake.set_enhanced(
        "S",
        EnhancedDetail {
            years: vec![2022],
            per_year: BTreeMap::from([(
                2022,
                YearRecord {
                    basic: Some(basic(1100)),
                    ..Default::default()
                },
            )]),
            latest: None,
        },
    );

    let cross = service(&fake, None).cross_section("S", 2022).await.unwrap();

    assert_eq!(cross.population(), Some(1100));
    assert_eq!(cross.household_count(), Some(500));
    assert_eq!(cross.population_source, Some(PopulationSource::AgeBucketed));
}

#[tokio::test]
async fn given_household_only_when_building_cross_section_then_reported_numbers_kept() {
    let fake = FakeSource::new();
    fake.set_record("S", 2022, household_year(640, 300));

    let cross = service(&fake, None).cross_section("S", 2022).await.unwrap();

    assert_eq!(cross.population(), Some(640));
    assert_eq!(cross.household_count(), Some(300));
    assert_eq!(cross.population_source, Some(PopulationSource::Household));
}

#[tokio::test]
async fn given_subdistrict_when_building_view_then_cross_section_matches_series_year() {
    let fake = FakeSource::new();
    fake.set_years(&[2022]);
    fake.set_record(
        "S",
        2022,
        YearRecord {
            household: Some(household(Some(900), Some(123), Some(2.2))),
            ..Default::default()
        },
    );
    fake.set_timeseries(
        "S",
        BTreeMap::from([(
            2022,
            YearRecord {
                household: Some(household(Some(900), Some(123), Some(2.2))),
                ..Default::default()
            },
        )]),
    );
    fake.set_enhanced(
        "S",
        EnhancedDetail {
            years: vec![2022],
            per_year: BTreeMap::from([(
                2022,
                YearRecord {
                    basic: Some(basic(1100)),
                    ..Default::default()
                },
            )]),
            latest: None,
        },
    );

    let view = service(&fake, None).subdistrict("S").await.unwrap();

    let SeriesOutcome::Ready(series) = &view.series else {
        panic!("expected a series");
    };
    let entry = series.get(2022).unwrap();
    assert_eq!(view.cross_section.population(), Some(entry.population));
    assert_eq!(view.cross_section.household_count(), Some(entry.household_count));
    assert_eq!(entry.household_count, 500);
}

fn enhanced_with_household_average(year: i32, total: u64, avg: f64) -> EnhancedDetail {
    EnhancedDetail {
        years: vec![year],
        per_year: BTreeMap::from([(
            year,
            YearRecord {
                basic: Some(basic(total)),
                household: Some(household(None, None, Some(avg))),
                ..Default::default()
            },
        )]),
        latest: None,
    }
}

#[tokio::test]
async fn given_enhanced_household_average_when_building_both_views_then_household_counts_agree() {
    let fake = FakeSource::new();
    let plain = YearRecord {
        household: Some(household(Some(900), Some(360), Some(2.5))),
        ..Default::default()
    };
    fake.set_record("S", 2022, plain.clone());
    fake.set_timeseries("S", BTreeMap::from([(2022, plain)]));
    fake.set_enhanced("S", enhanced_with_household_average(2022, 1100, 2.2));
    let service = service(&fake, None);

    let series = service.series("S").await.unwrap();
    let cross = service.cross_section("S", 2022).await.unwrap();

    let entry = series.get(2022).unwrap();
    assert_eq!(entry.household_count, 500);
    assert_eq!(cross.household_count(), Some(500));
    assert_eq!(cross.population(), Some(1100));
    assert_eq!(
        cross.household.unwrap().avg_family_member_count,
        Some(entry.avg_household_size)
    );
}

#[tokio::test]
async fn given_enhanced_household_average_when_building_view_then_cross_section_matches_series() {
    let fake = FakeSource::new();
    fake.set_years(&[2022]);
    let plain = YearRecord {
        household: Some(household(Some(900), Some(360), Some(2.5))),
        ..Default::default()
    };
    fake.set_record("S", 2022, plain.clone());
    fake.set_timeseries("S", BTreeMap::from([(2022, plain)]));
    fake.set_enhanced("S", enhanced_with_household_average(2022, 1100, 2.2));

    let view = service(&fake, None).subdistrict("S").await.unwrap();

    let SeriesOutcome::Ready(series) = &view.series else {
        panic!("expected a series");
    };
    let entry = series.get(2022).unwrap();
    assert_eq!(entry.household_count, 500);
    assert_eq!(view.cross_section.household_count(), Some(500));
}

#[tokio::test]
async fn given_newest_year_only_in_latest_when_building_both_views_then_series_uses_latest_too() {
    let fake = FakeSource::new();
    fake.set_years(&[2023]);
    let plain = household_year(900, 123);
    fake.set_record("S", 2023, plain.clone());
    fake.set_timeseries("S", BTreeMap::from([(2022, household_year(880, 400)), (2023, plain)]));
    fake.set_enhanced(
        "S",
        EnhancedDetail {
            years: vec![2022, 2023],
            per_year: BTreeMap::new(),
            latest: Some(YearRecord {
                basic: Some(basic(1200)),
                ..Default::default()
            }),
        },
    );

    let view = service(&fake, None).subdistrict("S").await.unwrap();

    let SeriesOutcome::Ready(series) = &view.series else {
        panic!("expected a series");
    };
    let entry = series.get(2023).unwrap();
    assert_eq!(entry.population, 1200);
    assert_eq!(entry.household_count, 600);
    assert_eq!(entry.population_source, PopulationSource::AgeBucketed);
    assert_eq!(series.get(2022).unwrap().population, 880);
    assert_eq!(view.cross_section.population(), Some(1200));
    assert_eq!(view.cross_section.household_count(), Some(600));
}
