//! Tabular IO and materialization.
//!
//! Tables persist as headed CSV files with full-replace semantics: each run
//! writes a fresh file and renames it over the previous one, never appends.
//! The models config decides which outputs are persisted at all.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Name of the mean-rate feature materialization.
pub const TRIPS_FEATURES: &str = "trips_features";
/// Name of the constant-rate materialization.
pub const TRIPS_CO2: &str = "trips_co2";

/// How a named output is materialized.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    /// Persisted as a CSV table, wholly replaced each run.
    Table,
    /// Not persisted; recomputed from the staged trips on read.
    View,
}

/// Per-model materialization modes, loaded from a plain JSON object:
///
/// ```json
/// {
///   "trips_features": "table",
///   "trips_co2": "view"
/// }
/// ```
///
/// Models absent from the file default to `table`.
pub struct ModelsConfig {
    entries: HashMap<String, Materialization>,
}

impl ModelsConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading models config {}", path))?;
        let entries: HashMap<String, Materialization> = serde_json::from_str(&content)?;
        Ok(Self { entries })
    }

    /// All outputs are tables when no config file is given.
    pub fn all_tables() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn mode(&self, model: &str) -> Materialization {
        self.entries
            .get(model)
            .copied()
            .unwrap_or(Materialization::Table)
    }
}

/// Reads every row of a headed CSV file into `T`.
pub fn read_records<T: DeserializeOwned>(path: &str) -> Result<Vec<T>> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("deserializing row of {}", path))?;
        rows.push(record);
    }

    debug!(path, rows = rows.len(), "Read CSV records");
    Ok(rows)
}

/// Deserializes headed CSV rows out of an in-memory buffer (fetched inputs).
pub fn read_records_from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Writes `rows` as a headed CSV table at `path`, fully replacing any
/// previous contents. The write goes to a sibling temp file first so a
/// failed run never leaves a truncated table behind.
pub fn write_table<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    let target = Path::new(path);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = target.with_extension("csv.tmp");
    {
        let file = fs::File::create(&tmp).with_context(|| format!("creating {:?}", tmp))?;
        let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, target).with_context(|| format!("replacing {}", path))?;

    info!(path, rows = rows.len(), "Materialized table");
    Ok(())
}
