//! Stage sequencing and the end-of-run summary

use crate::config::PipelineConfig;
use crate::{PipelineError, Result, Stage};
use chrono::NaiveDate;
use demand_forecast::adapter::CohortFailure;
use demand_forecast::cleaning::{CleaningReport, CohortCleaner};
use demand_forecast::export::{
    featured_frame, forecast_file_name, forecast_frame, metrics_frame, weekly_frame, write_csv,
    write_metrics_json, METRICS_CSV_FILE, METRICS_JSON_FILE, PROCESSED_SALES_FILE,
    WEEKLY_SALES_FILE,
};
use demand_forecast::features::FeatureBuilder;
use demand_forecast::weekly::cohort_series;
use demand_forecast::{
    DataLoader, ForecastAdapter, ForecastError, ForecastRun, WeeklyAggregate, WeeklyAggregator,
};
use inventory_plan::report::{write_plan, StatusSummary};
use inventory_plan::{InventoryPlanRow, InventoryPolicy};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a run did, stage by stage
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cleaning: Option<CleaningReport>,
    pub weekly_rows: usize,
    pub cohorts: usize,
    /// First and last week start in the weekly aggregate
    pub week_span: Option<(NaiveDate, NaiveDate)>,
    pub cohorts_forecast: Option<usize>,
    pub skipped: Vec<CohortFailure>,
    pub plan: Option<StatusSummary>,
}

impl RunSummary {
    fn from_weekly(weekly: &[WeeklyAggregate]) -> Self {
        let first = weekly.iter().map(|w| w.week_start).min();
        let last = weekly.iter().map(|w| w.week_start).max();

        Self {
            weekly_rows: weekly.len(),
            cohorts: cohort_series(weekly).len(),
            week_span: first.zip(last),
            ..Self::default()
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Summary:")?;
        if let Some(report) = &self.cleaning {
            writeln!(
                f,
                "  Rows: {} read, {} invalid, {} outliers, {} kept",
                report.rows_in,
                report.invalid_rows,
                report.outlier_rows,
                report.rows_kept()
            )?;
        }
        writeln!(f, "  Weekly rows: {} across {} cohorts", self.weekly_rows, self.cohorts)?;
        if let Some((first, last)) = self.week_span {
            writeln!(f, "  Weeks: {} to {}", first, last)?;
        }
        if let Some(forecast) = self.cohorts_forecast {
            writeln!(
                f,
                "  Forecast: {} cohorts processed, {} skipped",
                forecast,
                self.skipped.len()
            )?;
            for failure in &self.skipped {
                writeln!(f, "    - {}", failure)?;
            }
        }
        if let Some(plan) = &self.plan {
            write!(f, "{}", plan)?;
        }
        Ok(())
    }
}

/// Runs the stages against one output directory
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    output_dir: PathBuf,
}

impl Pipeline {
    /// Validates the configuration up front
    pub fn new<P: Into<PathBuf>>(config: PipelineConfig, output_dir: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            output_dir: output_dir.into(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn weekly_path(&self) -> PathBuf {
        self.output_dir.join(WEEKLY_SALES_FILE)
    }

    /// Clean, featurize and aggregate a raw sales file
    pub fn preprocess<P: AsRef<Path>>(
        &self,
        input: P,
    ) -> Result<(CleaningReport, Vec<WeeklyAggregate>)> {
        let input = input.as_ref();
        info!(input = %input.display(), "preprocessing");

        let raw = DataLoader::from_csv(input).map_err(|e| match e {
            ForecastError::MissingInput(_) => PipelineError::MissingArtifact {
                stage: Stage::Preprocess,
                precondition: format!("raw sales file {} exists", input.display()),
            },
            other => other.into(),
        })?;

        let cleaned = CohortCleaner::new(self.config.cleaning.clone())?.clean(&raw)?;
        if cleaned.records.is_empty() {
            return Err(PipelineError::MissingArtifact {
                stage: Stage::Preprocess,
                precondition: format!("{} has at least one valid sales row", input.display()),
            });
        }

        let featured = FeatureBuilder::new(self.config.features.clone())?.build(&cleaned.records)?;
        let weekly = WeeklyAggregator::aggregate(&featured);

        write_csv(
            &mut featured_frame(&featured)?,
            self.output_dir.join(PROCESSED_SALES_FILE),
        )?;
        write_csv(&mut weekly_frame(&weekly)?, self.weekly_path())?;

        Ok((cleaned.report, weekly))
    }

    /// Read back the weekly aggregate a previous preprocess run wrote
    pub fn load_weekly(&self, stage: Stage) -> Result<Vec<WeeklyAggregate>> {
        let path = self.weekly_path();
        let missing = || PipelineError::MissingArtifact {
            stage,
            precondition: format!(
                "{} exists and is not empty; run preprocess first",
                path.display()
            ),
        };

        let weekly = DataLoader::weekly_from_csv(&path).map_err(|e| match e {
            ForecastError::MissingInput(_) => missing(),
            other => other.into(),
        })?;
        if weekly.is_empty() {
            return Err(missing());
        }
        Ok(weekly)
    }

    /// Forecast every cohort and write forecasts and metrics
    pub fn forecast(&self, weekly: &[WeeklyAggregate]) -> Result<ForecastRun> {
        if weekly.is_empty() {
            return Err(PipelineError::MissingArtifact {
                stage: Stage::Forecast,
                precondition: "weekly aggregate is not empty".to_string(),
            });
        }

        let adapter = ForecastAdapter::new(self.config.forecast.clone())?;
        let run = adapter.run(weekly)?;

        write_csv(
            &mut forecast_frame(&run.points)?,
            self.output_dir
                .join(forecast_file_name(self.config.forecast.horizon_weeks)),
        )?;
        write_csv(
            &mut metrics_frame(&run.metrics)?,
            self.output_dir.join(METRICS_CSV_FILE),
        )?;
        write_metrics_json(&run.metrics, self.output_dir.join(METRICS_JSON_FILE))?;

        Ok(run)
    }

    /// Compute and write the inventory plan
    pub fn optimize(&self, weekly: &[WeeklyAggregate]) -> Result<Vec<InventoryPlanRow>> {
        if weekly.is_empty() {
            return Err(PipelineError::MissingArtifact {
                stage: Stage::Optimize,
                precondition: "weekly aggregate is not empty".to_string(),
            });
        }

        let policy = InventoryPolicy::new(self.config.inventory.clone())?;
        let plan = policy.plan(weekly)?;
        write_plan(&plan, &self.output_dir)?;

        Ok(plan)
    }

    /// All three stages on a raw sales file
    pub fn run<P: AsRef<Path>>(&self, input: P) -> Result<RunSummary> {
        let (report, weekly) = self.preprocess(input)?;
        let mut summary = RunSummary::from_weekly(&weekly);
        summary.cleaning = Some(report);

        self.record_forecast(&mut summary, self.forecast(&weekly)?);
        summary.plan = Some(StatusSummary::from_rows(&self.optimize(&weekly)?));

        self.log_summary(&summary);
        Ok(summary)
    }

    /// Preprocess only
    pub fn run_preprocess<P: AsRef<Path>>(&self, input: P) -> Result<RunSummary> {
        let (report, weekly) = self.preprocess(input)?;
        let mut summary = RunSummary::from_weekly(&weekly);
        summary.cleaning = Some(report);

        self.log_summary(&summary);
        Ok(summary)
    }

    /// Forecast from the weekly aggregate on disk
    pub fn run_forecast(&self) -> Result<RunSummary> {
        let weekly = self.load_weekly(Stage::Forecast)?;
        let mut summary = RunSummary::from_weekly(&weekly);
        self.record_forecast(&mut summary, self.forecast(&weekly)?);

        self.log_summary(&summary);
        Ok(summary)
    }

    /// Plan from the weekly aggregate on disk
    pub fn run_optimize(&self) -> Result<RunSummary> {
        let weekly = self.load_weekly(Stage::Optimize)?;
        let mut summary = RunSummary::from_weekly(&weekly);
        summary.plan = Some(StatusSummary::from_rows(&self.optimize(&weekly)?));

        self.log_summary(&summary);
        Ok(summary)
    }

    fn record_forecast(&self, summary: &mut RunSummary, run: ForecastRun) {
        summary.cohorts_forecast = Some(run.cohorts_forecast());
        summary.skipped = run.failures;
    }

    fn log_summary(&self, summary: &RunSummary) {
        info!(
            output_dir = %self.output_dir.display(),
            weekly_rows = summary.weekly_rows,
            cohorts = summary.cohorts,
            forecast = summary.cohorts_forecast.unwrap_or(0),
            skipped = summary.skipped.len(),
            "run finished"
        );
    }
}
