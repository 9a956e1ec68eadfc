//! Data types used by the analysis report.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::model::naive_ts;

/// The single largest-CO₂ trip for one color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripExtreme {
    pub(crate) color: String,
    #[serde(with = "naive_ts")]
    pub(crate) pickup_datetime: NaiveDateTime,
    #[serde(with = "naive_ts")]
    pub(crate) dropoff_datetime: NaiveDateTime,
    pub(crate) trip_distance: f64,
    pub(crate) trip_co2_kgs: f64,
}

/// One bucket with its per-trip average CO₂.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketExtreme {
    pub(crate) bucket: u32,
    pub(crate) label: String,
    pub(crate) avg_co2_kgs: f64,
}

/// Heaviest and lightest bucket of one time dimension for one color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    pub(crate) dimension: String,
    pub(crate) color: String,
    pub(crate) heavy: BucketExtreme,
    pub(crate) light: BucketExtreme,
}

/// Total CO₂ per month for one color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub(crate) color: String,
    pub(crate) month: u32,
    pub(crate) total_co2_kgs: f64,
}

/// Complete analysis result, written as one JSON report file.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) trip_count: usize,
    pub(crate) largest_trips: Vec<TripExtreme>,
    pub(crate) buckets: Vec<BucketSummary>,
    pub(crate) monthly_totals: Vec<MonthlyTotal>,
}
