//! Feature derivation: CO₂ emissions, average speed, and calendar buckets
//! for cleaned trips.
//!
//! Two named outputs exist with distinct contracts:
//!
//! - [`derive_features`] (`trips_features`): CO₂ rate is the arithmetic mean
//!   of the emissions reference table.
//! - [`derive_co2`] (`trips_co2`): CO₂ rate is a fixed 404 g/mile, and the
//!   derived columns carry short names.
//!
//! Both map input rows 1:1 with no filtering; derivation is a pure function
//! of its inputs.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::model::{EmissionsRate, TripCo2, TripFeatures, TripRecord};

/// Fixed CO₂ rate used by the `trips_co2` output, in grams per mile.
pub const CONSTANT_RATE_G_PER_MILE: f64 = 404.0;

/// Where a derivation takes its grams-per-mile CO₂ rate from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateSource {
    /// Arithmetic mean over the emissions reference table; `None` when the
    /// table is empty.
    ComputedMean,
    /// A fixed rate, ignoring the reference table entirely.
    Constant(f64),
}

impl RateSource {
    fn resolve(&self, rates: &[EmissionsRate]) -> Option<f64> {
        match self {
            RateSource::ComputedMean => blended_rate(rates),
            RateSource::Constant(r) => Some(*r),
        }
    }
}

/// Mean `co2_grams_per_mile` across the reference table, blending all
/// vehicle types into one rate. `None` on an empty table; downstream CO₂
/// values then stay unset rather than erroring.
pub fn blended_rate(rates: &[EmissionsRate]) -> Option<f64> {
    if rates.is_empty() {
        return None;
    }
    let sum: f64 = rates.iter().map(|r| r.co2_grams_per_mile).sum();
    Some(sum / rates.len() as f64)
}

/// Trip duration in fractional hours. May be zero or negative when the
/// timestamps are equal or inverted; no clamping.
pub fn duration_hours(pickup: NaiveDateTime, dropoff: NaiveDateTime) -> f64 {
    (dropoff - pickup).num_seconds() as f64 / 3600.0
}

/// Calendar buckets extracted from a pickup timestamp, shared by both
/// output schemas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarParts {
    /// 0–23.
    pub hour: u32,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u32,
    /// ISO-8601 week number, 1–53.
    pub iso_week: u32,
    /// 1 = January .. 12 = December.
    pub month: u32,
}

impl CalendarParts {
    pub fn of(pickup: NaiveDateTime) -> Self {
        CalendarParts {
            hour: pickup.hour(),
            weekday: pickup.weekday().num_days_from_sunday(),
            iso_week: pickup.iso_week().week(),
            month: pickup.month(),
        }
    }
}

/// The derived columns for one trip, before they are fanned out into a
/// schema-specific output row.
struct DerivedColumns {
    co2_kgs: Option<f64>,
    avg_mph: Option<f64>,
    calendar: CalendarParts,
}

/// Single row-mapping path shared by both variants. `rate` is the already
/// resolved grams-per-mile rate (`None` propagates into the CO₂ column).
fn derive_row(trip: &TripRecord, rate: Option<f64>) -> DerivedColumns {
    let hours = duration_hours(trip.pickup_datetime, trip.dropoff_datetime);

    // grams/mile * miles / 1000 = kilograms
    let co2_kgs = rate.map(|r| trip.trip_distance * r / 1000.0);

    // Guard against zero or inverted durations; the field stays unset
    // rather than producing infinities or negative speeds.
    let avg_mph = if hours > 0.0 {
        Some(trip.trip_distance / hours)
    } else {
        None
    };

    DerivedColumns {
        co2_kgs,
        avg_mph,
        calendar: CalendarParts::of(trip.pickup_datetime),
    }
}

/// Produces the `trips_features` output: one [`TripFeatures`] per input trip,
/// CO₂ from the mean of the emissions reference table.
pub fn derive_features(trips: &[TripRecord], rates: &[EmissionsRate]) -> Vec<TripFeatures> {
    let rate = RateSource::ComputedMean.resolve(rates);

    trips
        .iter()
        .map(|trip| {
            let d = derive_row(trip, rate);
            TripFeatures {
                color: trip.color.clone(),
                pickup_datetime: trip.pickup_datetime,
                dropoff_datetime: trip.dropoff_datetime,
                passenger_count: trip.passenger_count,
                trip_distance: trip.trip_distance,
                vendor_id: trip.vendor_id,
                pu_location_id: trip.pu_location_id,
                do_location_id: trip.do_location_id,
                total_amount: trip.total_amount,
                trip_co2_kgs: d.co2_kgs,
                avg_mph: d.avg_mph,
                hour_of_day: d.calendar.hour,
                day_of_week: d.calendar.weekday,
                week_of_year: d.calendar.iso_week,
                month_of_year: d.calendar.month,
            }
        })
        .collect()
}

/// Produces the `trips_co2` output: one [`TripCo2`] per input trip, CO₂ from
/// the fixed [`CONSTANT_RATE_G_PER_MILE`] regardless of the reference table.
pub fn derive_co2(trips: &[TripRecord]) -> Vec<TripCo2> {
    let rate = RateSource::Constant(CONSTANT_RATE_G_PER_MILE).resolve(&[]);

    trips
        .iter()
        .map(|trip| {
            let d = derive_row(trip, rate);
            TripCo2 {
                color: trip.color.clone(),
                pickup_datetime: trip.pickup_datetime,
                dropoff_datetime: trip.dropoff_datetime,
                passenger_count: trip.passenger_count,
                trip_distance: trip.trip_distance,
                vendor_id: trip.vendor_id,
                pu_location_id: trip.pu_location_id,
                do_location_id: trip.do_location_id,
                total_amount: trip.total_amount,
                co2_kg: d.co2_kgs,
                avg_mph: d.avg_mph,
                trip_hour: d.calendar.hour,
                trip_dow: d.calendar.weekday,
                week_number: d.calendar.iso_week,
                month: d.calendar.month,
            }
        })
        .collect()
}
