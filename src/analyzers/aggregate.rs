use crate::analyzers::types::{BucketExtreme, BucketSummary, MonthlyTotal, TripExtreme};
use crate::analyzers::utility::mean;
use crate::model::TripFeatures;
use std::collections::BTreeMap;

/// A time dimension of the feature table that trips can be bucketed by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    HourOfDay,
    DayOfWeek,
    WeekOfYear,
    MonthOfYear,
}

pub const DIMENSIONS: [Dimension; 4] = [
    Dimension::HourOfDay,
    Dimension::DayOfWeek,
    Dimension::WeekOfYear,
    Dimension::MonthOfYear,
];

const DOW_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::HourOfDay => "hour_of_day",
            Dimension::DayOfWeek => "day_of_week",
            Dimension::WeekOfYear => "week_of_year",
            Dimension::MonthOfYear => "month_of_year",
        }
    }

    fn bucket(&self, row: &TripFeatures) -> u32 {
        match self {
            Dimension::HourOfDay => row.hour_of_day,
            Dimension::DayOfWeek => row.day_of_week,
            Dimension::WeekOfYear => row.week_of_year,
            Dimension::MonthOfYear => row.month_of_year,
        }
    }

    /// Human-readable form of a bucket value, e.g. `14:00`, `Fri`, `Week 11`.
    pub fn label(&self, bucket: u32) -> String {
        match self {
            Dimension::HourOfDay => format!("{:02}:00", bucket),
            Dimension::DayOfWeek => DOW_NAMES
                .get(bucket as usize)
                .map(|s| s.to_string())
                .unwrap_or_else(|| bucket.to_string()),
            Dimension::WeekOfYear => format!("Week {}", bucket),
            Dimension::MonthOfYear => bucket
                .checked_sub(1)
                .and_then(|i| MONTH_NAMES.get(i as usize))
                .map(|s| s.to_string())
                .unwrap_or_else(|| bucket.to_string()),
        }
    }
}

/// The single highest-CO₂ trip of each color, ordered by color.
/// Rows without a CO₂ value are ignored; a color with no valued rows is
/// absent from the result.
pub fn largest_trip_per_color(rows: &[TripFeatures]) -> Vec<TripExtreme> {
    let mut best: BTreeMap<&str, &TripFeatures> = BTreeMap::new();

    for row in rows {
        let Some(co2) = row.trip_co2_kgs else { continue };
        match best.get(row.color.as_str()) {
            Some(current) if current.trip_co2_kgs.unwrap_or(f64::NEG_INFINITY) >= co2 => {}
            _ => {
                best.insert(row.color.as_str(), row);
            }
        }
    }

    best.into_values()
        .map(|row| TripExtreme {
            color: row.color.clone(),
            pickup_datetime: row.pickup_datetime,
            dropoff_datetime: row.dropoff_datetime,
            trip_distance: row.trip_distance,
            trip_co2_kgs: row.trip_co2_kgs.unwrap_or_default(),
        })
        .collect()
}

/// Per color, the bucket of `dimension` with the highest and lowest average
/// CO₂ per trip. Ties resolve to the lowest bucket value.
pub fn heavy_light_buckets(rows: &[TripFeatures], dimension: Dimension) -> Vec<BucketSummary> {
    // (color, bucket) -> CO₂ series; BTreeMap keeps the output deterministic
    let mut series: BTreeMap<(&str, u32), Vec<f64>> = BTreeMap::new();
    for row in rows {
        let Some(co2) = row.trip_co2_kgs else { continue };
        series
            .entry((row.color.as_str(), dimension.bucket(row)))
            .or_default()
            .push(co2);
    }

    let mut averages: BTreeMap<&str, Vec<(u32, f64)>> = BTreeMap::new();
    for (&(color, bucket), values) in &series {
        averages.entry(color).or_default().push((bucket, mean(values)));
    }

    averages
        .into_iter()
        .map(|(color, buckets)| {
            let heavy = buckets
                .iter()
                .fold(buckets[0], |acc, &b| if b.1 > acc.1 { b } else { acc });
            let light = buckets
                .iter()
                .fold(buckets[0], |acc, &b| if b.1 < acc.1 { b } else { acc });

            BucketSummary {
                dimension: dimension.name().to_string(),
                color: color.to_string(),
                heavy: BucketExtreme {
                    bucket: heavy.0,
                    label: dimension.label(heavy.0),
                    avg_co2_kgs: heavy.1,
                },
                light: BucketExtreme {
                    bucket: light.0,
                    label: dimension.label(light.0),
                    avg_co2_kgs: light.1,
                },
            }
        })
        .collect()
}

/// Total CO₂ per (month, color), ordered by month then color. Rows without
/// a CO₂ value contribute nothing.
pub fn monthly_totals(rows: &[TripFeatures]) -> Vec<MonthlyTotal> {
    let mut totals: BTreeMap<(u32, &str), f64> = BTreeMap::new();
    for row in rows {
        let Some(co2) = row.trip_co2_kgs else { continue };
        *totals.entry((row.month_of_year, row.color.as_str())).or_default() += co2;
    }

    totals
        .into_iter()
        .map(|((month, color), total)| MonthlyTotal {
            color: color.to_string(),
            month,
            total_co2_kgs: total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive_features;
    use crate::model::{EmissionsRate, TripRecord, naive_ts};

    fn trip(color: &str, pickup: &str, dropoff: &str, distance: f64) -> TripRecord {
        TripRecord {
            color: color.to_string(),
            pickup_datetime: naive_ts::parse(pickup).unwrap(),
            dropoff_datetime: naive_ts::parse(dropoff).unwrap(),
            passenger_count: 1,
            trip_distance: distance,
            vendor_id: 1,
            pu_location_id: 100,
            do_location_id: 200,
            total_amount: 20.0,
        }
    }

    fn features(trips: &[TripRecord]) -> Vec<TripFeatures> {
        let rates = vec![EmissionsRate {
            vehicle_type: "car".to_string(),
            co2_grams_per_mile: 400.0,
        }];
        derive_features(trips, &rates)
    }

    #[test]
    fn test_largest_trip_per_color() {
        let rows = features(&[
            trip("yellow", "2024-01-05 08:00:00", "2024-01-05 09:00:00", 10.0),
            trip("yellow", "2024-02-10 08:00:00", "2024-02-10 09:00:00", 30.0),
            trip("green", "2024-03-20 08:00:00", "2024-03-20 09:00:00", 20.0),
        ]);

        let extremes = largest_trip_per_color(&rows);
        assert_eq!(extremes.len(), 2);
        // BTreeMap order: green before yellow
        assert_eq!(extremes[0].color, "green");
        assert_eq!(extremes[0].trip_co2_kgs, 20.0 * 400.0 / 1000.0);
        assert_eq!(extremes[1].color, "yellow");
        assert_eq!(extremes[1].trip_distance, 30.0);
    }

    #[test]
    fn test_largest_trip_ignores_null_co2() {
        let trips = vec![trip("yellow", "2024-01-05 08:00:00", "2024-01-05 09:00:00", 10.0)];
        let rows = derive_features(&trips, &[]); // empty rate table, all CO₂ None
        assert!(largest_trip_per_color(&rows).is_empty());
    }

    #[test]
    fn test_heavy_light_by_hour() {
        let rows = features(&[
            // Hour 8: two short trips
            trip("yellow", "2024-01-05 08:00:00", "2024-01-05 08:20:00", 2.0),
            trip("yellow", "2024-01-06 08:00:00", "2024-01-06 08:20:00", 4.0),
            // Hour 17: one long trip
            trip("yellow", "2024-01-05 17:00:00", "2024-01-05 18:00:00", 20.0),
        ]);

        let summaries = heavy_light_buckets(&rows, Dimension::HourOfDay);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.dimension, "hour_of_day");
        assert_eq!(s.heavy.bucket, 17);
        assert_eq!(s.heavy.label, "17:00");
        assert_eq!(s.heavy.avg_co2_kgs, 8.0);
        assert_eq!(s.light.bucket, 8);
        // avg of 0.8 and 1.6 kg
        assert!((s.light.avg_co2_kgs - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_heavy_light_per_color_isolated() {
        let rows = features(&[
            trip("yellow", "2024-01-07 08:00:00", "2024-01-07 09:00:00", 1.0),
            trip("green", "2024-01-08 09:00:00", "2024-01-08 10:00:00", 50.0),
        ]);

        let summaries = heavy_light_buckets(&rows, Dimension::DayOfWeek);
        assert_eq!(summaries.len(), 2);
        // One trip each: heavy == light within a color
        for s in &summaries {
            assert_eq!(s.heavy, s.light);
        }
        // 2024-01-07 was a Sunday
        assert_eq!(summaries[1].color, "yellow");
        assert_eq!(summaries[1].heavy.bucket, 0);
        assert_eq!(summaries[1].heavy.label, "Sun");
    }

    #[test]
    fn test_monthly_totals_ordered_by_month_then_color() {
        let rows = features(&[
            trip("yellow", "2024-03-05 08:00:00", "2024-03-05 09:00:00", 10.0),
            trip("green", "2024-03-06 08:00:00", "2024-03-06 09:00:00", 5.0),
            trip("yellow", "2024-01-05 08:00:00", "2024-01-05 09:00:00", 2.5),
            trip("yellow", "2024-03-07 08:00:00", "2024-03-07 09:00:00", 10.0),
        ]);

        let totals = monthly_totals(&rows);
        assert_eq!(totals.len(), 3);
        assert_eq!((totals[0].month, totals[0].color.as_str()), (1, "yellow"));
        assert_eq!(totals[0].total_co2_kgs, 1.0);
        assert_eq!((totals[1].month, totals[1].color.as_str()), (3, "green"));
        assert_eq!((totals[2].month, totals[2].color.as_str()), (3, "yellow"));
        assert_eq!(totals[2].total_co2_kgs, 8.0);
    }

    #[test]
    fn test_dimension_labels() {
        assert_eq!(Dimension::HourOfDay.label(7), "07:00");
        assert_eq!(Dimension::DayOfWeek.label(5), "Fri");
        assert_eq!(Dimension::WeekOfYear.label(11), "Week 11");
        assert_eq!(Dimension::MonthOfYear.label(3), "Mar");
        // Out-of-range buckets fall back to the raw number
        assert_eq!(Dimension::DayOfWeek.label(9), "9");
        assert_eq!(Dimension::MonthOfYear.label(13), "13");
    }
}
