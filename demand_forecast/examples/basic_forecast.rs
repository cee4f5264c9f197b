use demand_forecast::cleaning::CohortCleaner;
use demand_forecast::features::FeatureBuilder;
use demand_forecast::synthetic::SyntheticSales;
use demand_forecast::{ForecastAdapter, ForecastConfig, ModelKind, WeeklyAggregator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Demand Forecast: Basic Forecasting Example");
    println!("==========================================\n");

    // Half a year of daily sales for a small catalogue
    let generator = SyntheticSales {
        products: 2,
        regions: 2,
        days: 180,
        ..SyntheticSales::default()
    };
    let raw = generator.generate()?;
    println!("Generated {} daily rows", raw.len());

    let cleaned = CohortCleaner::default().clean(&raw)?;
    println!(
        "Cleaning kept {} rows ({} invalid, {} outliers)\n",
        cleaned.report.rows_kept(),
        cleaned.report.invalid_rows,
        cleaned.report.outlier_rows
    );

    let featured = FeatureBuilder::default().build(&cleaned.records)?;
    let weekly = WeeklyAggregator::aggregate(&featured);
    println!("Aggregated {} cohort-weeks\n", weekly.len());

    // Same series, two model families
    for model in [ModelKind::default(), ModelKind::Ses { alpha: 0.3 }] {
        let config = ForecastConfig {
            horizon_weeks: 4,
            model: model.clone(),
            ..ForecastConfig::default()
        };
        let run = ForecastAdapter::new(config)?.run(&weekly)?;

        println!("Model: {:?}", model);
        for metrics in &run.metrics {
            let mape = metrics
                .mape
                .map(|m| format!("{:.1}%", m))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "  {}: MAE {:.2}, RMSE {:.2}, MAPE {} over {} weeks",
                metrics.cohort, metrics.mae, metrics.rmse, mape, metrics.n_weeks
            );
        }
        for failure in &run.failures {
            println!("  skipped {}", failure);
        }

        println!("  Next weeks:");
        for point in run.future_points() {
            println!(
                "    {} {}: {:.1} ({:.1}, {:.1})",
                point.cohort, point.ds, point.yhat, point.yhat_lower, point.yhat_upper
            );
        }
        println!();
    }

    Ok(())
}
