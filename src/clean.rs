//! Staging stage: filters raw TLC trips into the cleaned common schema.
//!
//! Mirrors the upstream cleaning contract: keep only trips inside the
//! configured year, with sane durations, distances, passenger counts, and
//! fares, then collapse exact duplicates.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::model::{RawTripRecord, TripRecord};

/// Knobs for the cleaning filters.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Calendar year trips must start in.
    pub year: i32,
    /// When set, rows with a non-positive pickup or dropoff zone id are
    /// dropped.
    pub enforce_positive_zones: bool,
}

impl Default for CleanConfig {
    fn default() -> Self {
        CleanConfig {
            year: 2024,
            enforce_positive_zones: false,
        }
    }
}

/// What happened to the raw rows of one color during cleaning.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanOutcome {
    pub input_rows: usize,
    pub kept: usize,
    pub dropped_by_filters: usize,
    pub dropped_duplicates: usize,
}

/// Duplicate key over the fields the upstream pipeline deduplicates on.
/// Floats are compared by bit pattern; duplicate rows are byte-identical
/// exports, not near-equal values.
#[derive(PartialEq, Eq, Hash)]
struct TripKey {
    pickup: NaiveDateTime,
    dropoff: NaiveDateTime,
    distance_bits: u64,
    pu: i32,
    dof: i32,
    vendor: i32,
    total_bits: u64,
    passengers: i32,
}

impl TripKey {
    fn of(t: &TripRecord) -> Self {
        TripKey {
            pickup: t.pickup_datetime,
            dropoff: t.dropoff_datetime,
            distance_bits: t.trip_distance.to_bits(),
            pu: t.pu_location_id,
            dof: t.do_location_id,
            vendor: t.vendor_id,
            total_bits: t.total_amount.to_bits(),
            passengers: t.passenger_count,
        }
    }
}

/// Cleans one color's raw rows into [`TripRecord`]s.
///
/// Rows failing any filter (including missing required values) are dropped;
/// exact duplicates collapse to their first occurrence.
pub fn clean_trips(color: &str, raws: &[RawTripRecord], config: &CleanConfig) -> (Vec<TripRecord>, CleanOutcome) {
    let year_start = start_of_year(config.year);
    let year_end = start_of_year(config.year + 1);
    let max_duration = TimeDelta::hours(24);

    let mut outcome = CleanOutcome {
        input_rows: raws.len(),
        ..Default::default()
    };

    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for raw in raws {
        let Some(trip) = cast_row(color, raw) else {
            outcome.dropped_by_filters += 1;
            continue;
        };

        let duration = trip.dropoff_datetime - trip.pickup_datetime;

        let passes = trip.pickup_datetime >= year_start
            && trip.pickup_datetime < year_end
            && trip.pickup_datetime <= trip.dropoff_datetime
            && duration <= max_duration
            && trip.trip_distance > 0.0
            && trip.trip_distance <= 100.0
            && (1..=6).contains(&trip.passenger_count)
            && (0.0..=1000.0).contains(&trip.total_amount)
            && (!config.enforce_positive_zones
                || (trip.pu_location_id > 0 && trip.do_location_id > 0));

        if !passes {
            outcome.dropped_by_filters += 1;
            continue;
        }

        if !seen.insert(TripKey::of(&trip)) {
            outcome.dropped_duplicates += 1;
            continue;
        }

        kept.push(trip);
    }

    outcome.kept = kept.len();
    (kept, outcome)
}

/// Casts a raw row to the cleaned schema; `None` when a required numeric
/// field is null.
fn cast_row(color: &str, raw: &RawTripRecord) -> Option<TripRecord> {
    Some(TripRecord {
        color: color.to_string(),
        pickup_datetime: raw.pickup_datetime,
        dropoff_datetime: raw.dropoff_datetime,
        passenger_count: raw.passenger_count? as i32,
        trip_distance: raw.trip_distance?,
        vendor_id: raw.vendor_id?,
        pu_location_id: raw.pu_location_id?,
        do_location_id: raw.do_location_id?,
        total_amount: raw.total_amount?,
    })
}

fn start_of_year(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .expect("January 1st exists for every year")
        .and_hms_opt(0, 0, 0)
        .expect("midnight exists")
}

/// Bad-value counters over a cleaned dataset. All fields should be zero
/// after cleaning; logged as a post-stage sanity check.
#[derive(Debug, Default, Clone, Copy)]
pub struct SanityCounters {
    pub zero_passengers: usize,
    pub zero_or_neg_distance: usize,
    pub over_100_miles: usize,
    pub negative_duration: usize,
    pub over_24h: usize,
}

pub fn sanity_counters(trips: &[TripRecord]) -> SanityCounters {
    let mut c = SanityCounters::default();
    for t in trips {
        if t.passenger_count == 0 {
            c.zero_passengers += 1;
        }
        if t.trip_distance <= 0.0 {
            c.zero_or_neg_distance += 1;
        }
        if t.dropoff_datetime < t.pickup_datetime {
            c.negative_duration += 1;
        }
        if t.trip_distance > 100.0 {
            c.over_100_miles += 1;
        }
        if t.dropoff_datetime - t.pickup_datetime > TimeDelta::hours(24) {
            c.over_24h += 1;
        }
    }
    c
}
