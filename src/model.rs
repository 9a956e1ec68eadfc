//! Record schemas for every stage of the pipeline.
//!
//! Raw TLC exports, the cleaned trip schema, the emissions reference table,
//! and the two derived-feature output schemas.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Serde adapter for the naive timestamps TLC data carries.
///
/// Reads `2024-03-15 14:30:00` (optionally with fractional seconds or a `T`
/// separator), always writes the space-separated form without fractions.
/// No timezone conversion is ever applied.
pub mod naive_ts {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const READ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parses a timestamp string, trying each accepted format in order.
    pub fn parse(s: &str) -> chrono::ParseResult<NaiveDateTime> {
        let mut last_err = None;
        for fmt in READ_FORMATS {
            match NaiveDateTime::parse_from_str(s, fmt) {
                Ok(dt) => return Ok(dt),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.expect("READ_FORMATS is non-empty"))
    }
}

/// One row of a raw TLC trip export, yellow or green.
///
/// Yellow files name their timestamps `tpep_*`, green files `lpep_*`; the
/// serde aliases map both onto the common field names. Numeric fields are
/// optional because raw exports contain nulls; the cleaning filters drop
/// rows where a required value is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTripRecord {
    #[serde(
        alias = "tpep_pickup_datetime",
        alias = "lpep_pickup_datetime",
        with = "naive_ts"
    )]
    pub pickup_datetime: NaiveDateTime,
    #[serde(
        alias = "tpep_dropoff_datetime",
        alias = "lpep_dropoff_datetime",
        with = "naive_ts"
    )]
    pub dropoff_datetime: NaiveDateTime,
    pub passenger_count: Option<f64>,
    pub trip_distance: Option<f64>,
    #[serde(alias = "VendorID")]
    pub vendor_id: Option<i32>,
    #[serde(alias = "PULocationID")]
    pub pu_location_id: Option<i32>,
    #[serde(alias = "DOLocationID")]
    pub do_location_id: Option<i32>,
    pub total_amount: Option<f64>,
}

/// A cleaned trip, tagged with its service color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub color: String,
    #[serde(with = "naive_ts")]
    pub pickup_datetime: NaiveDateTime,
    #[serde(with = "naive_ts")]
    pub dropoff_datetime: NaiveDateTime,
    pub passenger_count: i32,
    pub trip_distance: f64,
    pub vendor_id: i32,
    pub pu_location_id: i32,
    pub do_location_id: i32,
    pub total_amount: f64,
}

/// One row of the static emissions reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsRate {
    pub vehicle_type: String,
    pub co2_grams_per_mile: f64,
}

/// `trips_features` output schema: mean-based CO₂ rate, long column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripFeatures {
    pub color: String,
    #[serde(with = "naive_ts")]
    pub pickup_datetime: NaiveDateTime,
    #[serde(with = "naive_ts")]
    pub dropoff_datetime: NaiveDateTime,
    pub passenger_count: i32,
    pub trip_distance: f64,
    pub vendor_id: i32,
    pub pu_location_id: i32,
    pub do_location_id: i32,
    pub total_amount: f64,
    pub trip_co2_kgs: Option<f64>,
    pub avg_mph: Option<f64>,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub week_of_year: u32,
    pub month_of_year: u32,
}

/// `trips_co2` output schema: constant 404 g/mile rate, short column names.
///
/// Historically divergent from [`TripFeatures`]; both column sets and rate
/// sources are part of each output's contract, so the two are never unified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCo2 {
    pub color: String,
    #[serde(with = "naive_ts")]
    pub pickup_datetime: NaiveDateTime,
    #[serde(with = "naive_ts")]
    pub dropoff_datetime: NaiveDateTime,
    pub passenger_count: i32,
    pub trip_distance: f64,
    pub vendor_id: i32,
    pub pu_location_id: i32,
    pub do_location_id: i32,
    pub total_amount: f64,
    pub co2_kg: Option<f64>,
    pub avg_mph: Option<f64>,
    pub trip_hour: u32,
    pub trip_dow: u32,
    pub week_number: u32,
    pub month: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_space_separated_timestamp() {
        let dt = naive_ts::parse("2024-03-15 14:30:00").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-15 14:30:00");
    }

    #[test]
    fn test_parse_t_separated_timestamp() {
        let dt = naive_ts::parse("2024-03-15T14:30:00").unwrap();
        assert_eq!(dt, naive_ts::parse("2024-03-15 14:30:00").unwrap());
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let dt = naive_ts::parse("2024-03-15 14:30:00.123").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "14:30:00");
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(naive_ts::parse("not a timestamp").is_err());
    }

    #[test]
    fn test_raw_record_accepts_yellow_headers() {
        let csv_data = "tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,VendorID,PULocationID,DOLocationID,total_amount\n\
                        2024-01-01 00:00:00,2024-01-01 00:30:00,1,5.0,2,100,200,25.5\n";
        let mut rdr = csv::Reader::from_reader(csv_data.as_bytes());
        let rows: Vec<RawTripRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trip_distance, Some(5.0));
        assert_eq!(rows[0].vendor_id, Some(2));
    }

    #[test]
    fn test_raw_record_accepts_green_headers() {
        let csv_data = "lpep_pickup_datetime,lpep_dropoff_datetime,passenger_count,trip_distance,VendorID,PULocationID,DOLocationID,total_amount\n\
                        2024-01-01 00:00:00,2024-01-01 00:30:00,1,5.0,2,100,200,25.5\n";
        let mut rdr = csv::Reader::from_reader(csv_data.as_bytes());
        let rows: Vec<RawTripRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].passenger_count, Some(1.0));
    }

    #[test]
    fn test_raw_record_null_fields() {
        let csv_data = "tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,VendorID,PULocationID,DOLocationID,total_amount\n\
                        2024-01-01 00:00:00,2024-01-01 00:30:00,,5.0,,100,200,\n";
        let mut rdr = csv::Reader::from_reader(csv_data.as_bytes());
        let rows: Vec<RawTripRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].passenger_count, None);
        assert_eq!(rows[0].vendor_id, None);
        assert_eq!(rows[0].total_amount, None);
    }

    #[test]
    fn test_trip_record_csv_round_trip() {
        let trip = TripRecord {
            color: "yellow".to_string(),
            pickup_datetime: naive_ts::parse("2024-01-01 00:00:00").unwrap(),
            dropoff_datetime: naive_ts::parse("2024-01-01 00:30:00").unwrap(),
            passenger_count: 2,
            trip_distance: 5.0,
            vendor_id: 1,
            pu_location_id: 100,
            do_location_id: 200,
            total_amount: 25.5,
        };

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(&trip).unwrap();
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert!(data.contains("2024-01-01 00:00:00"));

        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let back: Vec<TripRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(back, vec![trip]);
    }
}
