use demand_forecast::cleaning::CohortCleaner;
use demand_forecast::features::FeatureBuilder;
use demand_forecast::synthetic::SyntheticSales;
use demand_forecast::weekly::{cohort_series, WeeklyAggregator};
use demand_forecast::{Cohort, DataLoader, ForecastAdapter, ForecastConfig, SalesRecord};
use chrono::NaiveDate;
use demand_math::iqr_fences;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

// Two cohorts, the first with one obvious spike
fn create_sample_data() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    writeln!(file, "Date,Product,Region,Quantity_Sold,Stock_Level").unwrap();
    let north = [10, 11, 12, 10, 11, 13, 12, 11, 10, 95];
    for (i, q) in north.iter().enumerate() {
        writeln!(file, "2024-01-{:02},P1,North,{},{}", i + 1, q, 100 - i).unwrap();
    }
    let south = [4, 6, 5, 7, 5, 6, 4, 5, 6, 5, 7, 4];
    for (i, q) in south.iter().enumerate() {
        writeln!(file, "2024-01-{:02},P2,South,{},", i + 1, q).unwrap();
    }
    // dropped: no quantity, no region
    writeln!(file, "2024-01-13,P2,South,,").unwrap();
    writeln!(file, "2024-01-13,P2,,3,").unwrap();

    file
}

fn quantities_by_cohort<'a>(
    rows: impl Iterator<Item = &'a SalesRecord>,
) -> BTreeMap<Cohort, Vec<f64>> {
    let mut grouped: BTreeMap<Cohort, Vec<f64>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.cohort.clone())
            .or_default()
            .push(row.quantity_sold);
    }
    grouped
}

#[test]
fn test_full_preprocessing_workflow() {
    let data_file = create_sample_data();

    let raw = DataLoader::from_csv(data_file.path()).unwrap();
    assert_eq!(raw.len(), 24);

    let cleaned = CohortCleaner::default().clean(&raw).unwrap();
    assert_eq!(cleaned.report.invalid_rows, 2);
    assert_eq!(cleaned.report.outlier_rows, 1);
    assert_eq!(cleaned.report.cohorts, 2);

    let featured = FeatureBuilder::default().build(&cleaned.records).unwrap();
    assert_eq!(featured.len(), cleaned.records.len());

    let weekly = WeeklyAggregator::aggregate(&featured);
    // 2024-01-01 is a Monday: days 1-7 and 8-12 fall in two weeks per cohort
    assert_eq!(weekly.len(), 4);
}

#[test]
fn test_cleaned_values_lie_within_prefilter_fences() {
    let raw = DataLoader::from_csv(create_sample_data().path()).unwrap();
    let valid: Vec<SalesRecord> = raw.iter().filter_map(SalesRecord::from_raw).collect();
    let before = quantities_by_cohort(valid.iter());

    let cleaned = CohortCleaner::default().clean(&raw).unwrap();
    let after = quantities_by_cohort(cleaned.records.iter().map(|r| &r.sale));

    for (cohort, kept) in after {
        let fences = iqr_fences(&before[&cohort], 1.5).unwrap();
        assert!(kept.iter().all(|&q| fences.contains(q)), "{}", cohort);
    }
}

#[test]
fn test_lag_matches_position_in_cohort() {
    let raw = DataLoader::from_csv(create_sample_data().path()).unwrap();
    let cleaned = CohortCleaner::default().clean(&raw).unwrap();
    let featured = FeatureBuilder::default().build(&cleaned.records).unwrap();

    let mut by_cohort: BTreeMap<Cohort, Vec<_>> = BTreeMap::new();
    for row in &featured {
        by_cohort.entry(row.base.sale.cohort.clone()).or_default().push(row);
    }

    for rows in by_cohort.values() {
        for (i, row) in rows.iter().enumerate() {
            for k in [1, 7, 30] {
                let expected = i.checked_sub(k).map(|j| rows[j].base.sale.quantity_sold);
                assert_eq!(row.lag(k), expected);
            }
        }
    }
}

#[test]
fn test_weekly_sales_sum_to_daily_sales() {
    let raw = DataLoader::from_csv(create_sample_data().path()).unwrap();
    let cleaned = CohortCleaner::default().clean(&raw).unwrap();
    let featured = FeatureBuilder::default().build(&cleaned.records).unwrap();
    let weekly = WeeklyAggregator::aggregate(&featured);

    let daily = quantities_by_cohort(cleaned.records.iter().map(|r| &r.sale));
    for series in cohort_series(&weekly) {
        let weekly_total: f64 = series.sales.iter().sum();
        let daily_total: f64 = daily[&series.cohort].iter().sum();
        assert!((weekly_total - daily_total).abs() < 1e-9);
    }
}

#[test]
fn test_cleaning_twice_removes_nothing_more() {
    let raw = DataLoader::from_csv(create_sample_data().path()).unwrap();
    let cleaner = CohortCleaner::default();

    let once = cleaner.clean(&raw).unwrap();
    let again = cleaner
        .clean_records(once.records.iter().map(|r| r.sale.clone()).collect())
        .unwrap();

    assert_eq!(again.report.outlier_rows, 0);
    assert_eq!(again.records, once.records);
}

#[test]
fn test_synthetic_history_forecasts_every_cohort() {
    let rows = SyntheticSales {
        products: 2,
        regions: 2,
        days: 120,
        ..SyntheticSales::default()
    }
    .generate()
    .unwrap();

    let cleaned = CohortCleaner::default().clean(&rows).unwrap();
    let featured = FeatureBuilder::default().build(&cleaned.records).unwrap();
    let weekly = WeeklyAggregator::aggregate(&featured);

    let config = ForecastConfig::default();
    let run = ForecastAdapter::new(config.clone()).unwrap().run(&weekly).unwrap();

    assert!(run.failures.is_empty());
    assert_eq!(run.metrics.len(), 4);
    for metrics in &run.metrics {
        let points = run
            .points
            .iter()
            .filter(|p| p.cohort == metrics.cohort)
            .count();
        assert_eq!(points, metrics.n_weeks + config.horizon_weeks);
    }

    let first_future = run.future_points().next().unwrap();
    assert!(first_future.ds > NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
}
