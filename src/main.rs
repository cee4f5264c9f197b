//! # stockcast
//!
//! Command-line driver for the demand planning pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a demo sales history
//! stockcast generate --output data/sales.csv
//!
//! # Run every stage
//! stockcast run --input data/sales.csv --output-dir output
//!
//! # Re-plan with a longer lead time from the existing weekly aggregate
//! stockcast --lead-time 3 optimize --output-dir output
//!
//! # Use a configuration file
//! stockcast --config stockcast.toml run --input data/sales.csv --output-dir output
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use demand_forecast::synthetic::SyntheticSales;
use std::path::PathBuf;
use stockcast::{ConfigOverrides, Pipeline, PipelineConfig, RunSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stockcast")]
#[command(about = "Weekly demand forecasts and inventory reorder plans from sales history")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Forecast horizon in weeks
    #[arg(long, global = true)]
    horizon: Option<usize>,

    /// Replenishment lead time in weeks
    #[arg(long, global = true)]
    lead_time: Option<u32>,

    /// Safety stock multiplier
    #[arg(long, global = true)]
    safety_multiplier: Option<f64>,

    /// Model family (holt, ses, moving_average)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run preprocessing, forecasting and optimisation
    Run {
        /// Raw sales CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for every artifact
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Clean, featurize and aggregate raw sales
    Preprocess {
        /// Raw sales CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for every artifact
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Forecast from the weekly aggregate in the output directory
    Forecast {
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Build the inventory plan from the weekly aggregate in the output directory
    Optimize {
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Write a synthetic sales history
    Generate {
        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "5")]
        products: usize,

        #[arg(long, default_value = "3")]
        regions: usize,

        #[arg(long, default_value = "365")]
        days: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    config.apply(&ConfigOverrides {
        horizon_weeks: cli.horizon,
        lead_time_weeks: cli.lead_time,
        safety_stock_multiplier: cli.safety_multiplier,
        model: cli.model.clone(),
    })?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let summary: RunSummary = match &cli.command {
        Commands::Generate {
            output,
            products,
            regions,
            days,
            seed,
        } => {
            let generator = SyntheticSales {
                products: *products,
                regions: *regions,
                days: *days,
                seed: *seed,
                ..SyntheticSales::default()
            };
            let rows = generator.write_csv(output)?;
            info!(rows, output = %output.display(), "wrote synthetic sales");
            return Ok(());
        }
        Commands::Run { input, output_dir } => {
            Pipeline::new(load_config(&cli)?, output_dir)?.run(input)?
        }
        Commands::Preprocess { input, output_dir } => {
            Pipeline::new(load_config(&cli)?, output_dir)?.run_preprocess(input)?
        }
        Commands::Forecast { output_dir } => {
            Pipeline::new(load_config(&cli)?, output_dir)?.run_forecast()?
        }
        Commands::Optimize { output_dir } => {
            Pipeline::new(load_config(&cli)?, output_dir)?.run_optimize()?
        }
    };

    println!("{}", summary);
    Ok(())
}
