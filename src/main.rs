//! CLI entry point for the taxi CO₂ pipeline.
//!
//! Provides subcommands for staging raw TLC trip exports, materializing the
//! derived feature tables, and producing the carbon analysis report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use taxi_co2::analyzers::analyzer::{build_report, log_report, write_report};
use taxi_co2::clean::{CleanConfig, clean_trips, sanity_counters};
use taxi_co2::features::{derive_co2, derive_features};
use taxi_co2::fetch::{BasicClient, fetch_bytes};
use taxi_co2::model::{EmissionsRate, RawTripRecord, TripFeatures, TripRecord};
use taxi_co2::output::{
    Materialization, ModelsConfig, TRIPS_CO2, TRIPS_FEATURES, read_records,
    read_records_from_bytes, write_table,
};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "taxi_co2")]
#[command(about = "A pipeline to derive CO2 features from TLC trip records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean raw yellow/green trip CSVs into the staged trips table
    Stage {
        /// Yellow trip CSVs (paths or URLs), tpep_* timestamp headers
        #[arg(long, value_name = "FILE_OR_URL")]
        yellow: Vec<String>,

        /// Green trip CSVs (paths or URLs), lpep_* timestamp headers
        #[arg(long, value_name = "FILE_OR_URL")]
        green: Vec<String>,

        /// Staged trips table to (re)create
        #[arg(short, long, default_value = "data/trips_clean.csv")]
        out: String,

        /// Calendar year trips must start in
        #[arg(long, default_value_t = 2024)]
        year: i32,

        /// Drop rows with non-positive pickup/dropoff zone ids
        #[arg(long, default_value_t = false)]
        enforce_positive_zones: bool,
    },
    /// Materialize the derived feature tables from staged trips
    Run {
        /// Staged trips table produced by `stage`
        #[arg(short, long, default_value = "data/trips_clean.csv")]
        trips: String,

        /// Emissions reference CSV (path or URL)
        #[arg(short, long, default_value = "seeds/vehicle_emissions.csv")]
        emissions: String,

        /// Directory the feature tables are written to
        #[arg(short, long, default_value = "data/marts")]
        out_dir: String,

        /// Optional JSON file mapping model name to view|table
        #[arg(short, long)]
        models: Option<String>,
    },
    /// Build the carbon analysis report over the feature table
    Analyze {
        /// Staged trips table, used when trips_features is a view
        #[arg(short, long, default_value = "data/trips_clean.csv")]
        trips: String,

        /// Emissions reference CSV (path or URL)
        #[arg(short, long, default_value = "seeds/vehicle_emissions.csv")]
        emissions: String,

        /// Directory the feature tables were written to
        #[arg(short, long, default_value = "data/marts")]
        out_dir: String,

        /// Optional JSON file mapping model name to view|table
        #[arg(short, long)]
        models: Option<String>,

        /// JSON report output path
        #[arg(short, long, default_value = "data/analysis.json")]
        report: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/taxi_co2.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("taxi_co2.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stage {
            yellow,
            green,
            out,
            year,
            enforce_positive_zones,
        } => {
            let config = CleanConfig {
                year,
                enforce_positive_zones,
            };
            stage(&yellow, &green, &out, &config).await?;
        }
        Commands::Run {
            trips,
            emissions,
            out_dir,
            models,
        } => {
            let models = load_models_config(models.as_deref())?;
            run(&trips, &emissions, &out_dir, &models).await?;
        }
        Commands::Analyze {
            trips,
            emissions,
            out_dir,
            models,
            report,
        } => {
            let models = load_models_config(models.as_deref())?;
            analyze(&trips, &emissions, &out_dir, &models, &report).await?;
        }
    }

    Ok(())
}

fn load_models_config(path: Option<&str>) -> Result<ModelsConfig> {
    match path {
        Some(p) => ModelsConfig::load(p),
        None => Ok(ModelsConfig::all_tables()),
    }
}

/// Loads input data from a local file path or fetches it over HTTP.
#[tracing::instrument(fields(source = %source))]
async fn fetcher(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new();
        fetch_bytes(&client, source).await?
    } else {
        std::fs::read(source)?
    };
    Ok(bytes)
}

/// Cleans all raw trip sources into one combined staged table, tagged by
/// color and fully replacing any previous run's output.
#[tracing::instrument(skip(yellow, green, config), fields(out, year = config.year))]
async fn stage(yellow: &[String], green: &[String], out: &str, config: &CleanConfig) -> Result<()> {
    let mut combined: Vec<TripRecord> = Vec::new();

    for (color, sources) in [("yellow", yellow), ("green", green)] {
        if sources.is_empty() {
            continue;
        }

        // Duplicates can span source files, so each color is gathered in
        // full before cleaning.
        let mut raws: Vec<RawTripRecord> = Vec::new();
        for source in sources {
            let bytes = fetcher(source).await?;
            let rows: Vec<RawTripRecord> = read_records_from_bytes(&bytes)?;
            info!(color, source = %source, rows = rows.len(), "Raw trips loaded");
            raws.extend(rows);
        }

        let (trips, outcome) = clean_trips(color, &raws, config);
        info!(
            color,
            input_rows = outcome.input_rows,
            kept = outcome.kept,
            dropped_by_filters = outcome.dropped_by_filters,
            dropped_duplicates = outcome.dropped_duplicates,
            "Cleaned trips"
        );

        combined.extend(trips);
    }

    let counters = sanity_counters(&combined);
    info!(?counters, "Post-clean sanity counters");

    if let (Some(first), Some(last)) = (
        combined.iter().map(|t| t.pickup_datetime).min(),
        combined.iter().map(|t| t.pickup_datetime).max(),
    ) {
        info!(first_pickup = %first, last_pickup = %last, "Pickup range");
    }

    write_table(out, &combined)?;
    Ok(())
}

/// Materializes the two feature models from the staged trips table,
/// honoring each model's view/table mode.
#[tracing::instrument(skip(models), fields(trips_path, emissions_source, out_dir))]
async fn run(
    trips_path: &str,
    emissions_source: &str,
    out_dir: &str,
    models: &ModelsConfig,
) -> Result<()> {
    let trips: Vec<TripRecord> = read_records(trips_path)?;
    let rates = load_emissions(emissions_source).await?;
    info!(
        trips = trips.len(),
        emission_rows = rates.len(),
        "Inputs loaded"
    );

    match models.mode(TRIPS_FEATURES) {
        Materialization::Table => {
            let rows = derive_features(&trips, &rates);
            write_table(&table_path(out_dir, TRIPS_FEATURES), &rows)?;
        }
        Materialization::View => {
            info!(model = TRIPS_FEATURES, "View model, not persisted");
        }
    }

    match models.mode(TRIPS_CO2) {
        Materialization::Table => {
            let rows = derive_co2(&trips);
            write_table(&table_path(out_dir, TRIPS_CO2), &rows)?;
        }
        Materialization::View => {
            info!(model = TRIPS_CO2, "View model, not persisted");
        }
    }

    Ok(())
}

/// Builds and writes the analysis report. The feature table is read back
/// from its CSV when materialized as a table, otherwise recomputed from the
/// staged trips (view semantics).
#[tracing::instrument(skip(models), fields(trips_path, out_dir, report_path))]
async fn analyze(
    trips_path: &str,
    emissions_source: &str,
    out_dir: &str,
    models: &ModelsConfig,
    report_path: &str,
) -> Result<()> {
    let features_path = table_path(out_dir, TRIPS_FEATURES);

    let rows: Vec<TripFeatures> = if models.mode(TRIPS_FEATURES) == Materialization::Table
        && Path::new(&features_path).exists()
    {
        read_records(&features_path)?
    } else {
        info!(model = TRIPS_FEATURES, "Recomputing view for analysis");
        let trips: Vec<TripRecord> = read_records(trips_path)?;
        let rates = load_emissions(emissions_source).await?;
        derive_features(&trips, &rates)
    };

    let report = build_report(&rows);
    log_report(&report);
    write_report(report_path, &report)?;

    info!(trips = rows.len(), "Analysis complete");
    Ok(())
}

async fn load_emissions(source: &str) -> Result<Vec<EmissionsRate>> {
    let bytes = fetcher(source).await?;
    read_records_from_bytes(&bytes)
}

fn table_path(out_dir: &str, model: &str) -> String {
    format!("{}/{}.csv", out_dir, model)
}
