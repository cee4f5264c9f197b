use demand_forecast::adapter::FailureReason;
use demand_forecast::synthetic::SyntheticSales;
use inventory_plan::report::{DASHBOARD_FILE, INVENTORY_FILE};
use stockcast::{Pipeline, PipelineConfig, PipelineError, Stage};
use std::io::Write;
use tempfile::TempDir;

fn synthetic_input(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sales.csv");
    SyntheticSales {
        products: 2,
        regions: 2,
        days: 90,
        ..SyntheticSales::default()
    }
    .write_csv(&path)
    .unwrap();
    path
}

#[test]
fn test_full_run_writes_every_artifact() {
    let dir = TempDir::new().unwrap();
    let input = synthetic_input(&dir);
    let out = dir.path().join("out");

    let pipeline = Pipeline::new(PipelineConfig::default(), &out).unwrap();
    let summary = pipeline.run(&input).unwrap();

    assert_eq!(summary.cohorts, 4);
    assert_eq!(summary.cohorts_forecast, Some(4));
    assert!(summary.skipped.is_empty());
    assert_eq!(summary.plan.as_ref().unwrap().cohorts(), 4);
    assert!(summary.cleaning.as_ref().unwrap().rows_in >= 360);

    for file in [
        "processed_sales_data.csv",
        "aggregated_weekly_sales.csv",
        "sales_forecasts_12weeks.csv",
        "model_evaluation_metrics.csv",
        "model_metrics.json",
        INVENTORY_FILE,
        DASHBOARD_FILE,
    ] {
        assert!(out.join(file).exists(), "{} missing", file);
    }
    assert!(summary.to_string().contains("4 cohorts processed, 0 skipped"));
}

#[test]
fn test_stages_run_separately_from_disk() {
    let dir = TempDir::new().unwrap();
    let input = synthetic_input(&dir);
    let pipeline = Pipeline::new(PipelineConfig::default(), dir.path().join("out")).unwrap();

    let preprocessed = pipeline.run_preprocess(&input).unwrap();
    let forecast = pipeline.run_forecast().unwrap();
    let optimized = pipeline.run_optimize().unwrap();

    assert_eq!(forecast.weekly_rows, preprocessed.weekly_rows);
    assert_eq!(forecast.cohorts_forecast, Some(4));
    assert_eq!(optimized.plan.unwrap().cohorts(), 4);
}

#[test]
fn test_forecast_without_weekly_aggregate() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default(), dir.path()).unwrap();

    match pipeline.run_forecast() {
        Err(PipelineError::MissingArtifact { stage, .. }) => assert_eq!(stage, Stage::Forecast),
        other => panic!("expected missing artifact, got {:?}", other.map(|_| ())),
    }
    match pipeline.run_optimize() {
        Err(PipelineError::MissingArtifact { stage, .. }) => assert_eq!(stage, Stage::Optimize),
        other => panic!("expected missing artifact, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_raw_input() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default(), dir.path()).unwrap();

    let err = pipeline.run(dir.path().join("nowhere.csv")).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::MissingArtifact {
            stage: Stage::Preprocess,
            ..
        }
    ));
    assert!(err.to_string().starts_with("preprocess stage cannot start"));
}

#[test]
fn test_short_cohort_is_skipped_but_still_planned() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sales.csv");
    let mut file = std::fs::File::create(&input).unwrap();
    writeln!(file, "Date,Product,Region,Quantity_Sold,Stock_Level").unwrap();
    for day in 1..=21 {
        writeln!(file, "2024-01-{:02},P1,North,{},50", day, 10 + day % 3).unwrap();
    }
    writeln!(file, "2024-01-03,P2,South,4,2").unwrap();
    drop(file);

    let pipeline = Pipeline::new(PipelineConfig::default(), dir.path().join("out")).unwrap();
    let summary = pipeline.run(&input).unwrap();

    assert_eq!(summary.cohorts_forecast, Some(1));
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].cohort.product, "P2");
    assert_eq!(summary.skipped[0].reason, FailureReason::InsufficientHistory);
    assert_eq!(summary.plan.unwrap().cohorts(), 2);
}

#[test]
fn test_invalid_config_is_rejected_before_processing() {
    let mut config = PipelineConfig::default();
    config.inventory.lead_time_weeks = 0;

    assert!(matches!(
        Pipeline::new(config, "unused"),
        Err(PipelineError::Config(_))
    ));
}
