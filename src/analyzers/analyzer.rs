use crate::analyzers::aggregate::{
    DIMENSIONS, heavy_light_buckets, largest_trip_per_color, monthly_totals,
};
use crate::analyzers::types::AnalysisReport;
use crate::model::TripFeatures;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Builds the full analysis report over a feature table: largest CO₂ trip
/// per color, heavy/light buckets for every time dimension, and monthly
/// totals.
pub fn build_report(rows: &[TripFeatures]) -> AnalysisReport {
    let buckets = DIMENSIONS
        .iter()
        .flat_map(|dim| heavy_light_buckets(rows, *dim))
        .collect();

    AnalysisReport {
        generated_at: chrono::Utc::now(),
        trip_count: rows.len(),
        largest_trips: largest_trip_per_color(rows),
        buckets,
        monthly_totals: monthly_totals(rows),
    }
}

/// Writes the report as pretty-printed JSON, replacing any previous file.
pub fn write_report(path: &str, report: &AnalysisReport) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_vec_pretty(report)?;
    fs::write(path, body).with_context(|| format!("writing report {}", path))?;
    info!(path, "Analysis report written");
    Ok(())
}

/// Logs the report's headline findings in human-readable form.
pub fn log_report(report: &AnalysisReport) {
    for extreme in &report.largest_trips {
        info!(
            color = %extreme.color,
            co2_kgs = format!("{:.3}", extreme.trip_co2_kgs),
            distance_miles = format!("{:.2}", extreme.trip_distance),
            pickup = %extreme.pickup_datetime,
            dropoff = %extreme.dropoff_datetime,
            "Largest CO2 trip"
        );
    }

    for summary in &report.buckets {
        info!(
            dimension = %summary.dimension,
            color = %summary.color,
            heavy = %summary.heavy.label,
            heavy_avg_kgs = format!("{:.3}", summary.heavy.avg_co2_kgs),
            light = %summary.light.label,
            light_avg_kgs = format!("{:.3}", summary.light.avg_co2_kgs),
            "Carbon heavy/light bucket"
        );
    }

    for total in &report.monthly_totals {
        info!(
            color = %total.color,
            month = total.month,
            total_co2_kgs = format!("{:.3}", total.total_co2_kgs),
            "Monthly CO2 total"
        );
    }
}
