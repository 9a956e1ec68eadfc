//! Carbon analysis over the derived feature table.
//!
//! This module finds each color's largest-CO₂ trip, the most and least
//! carbon-heavy time buckets per dimension, and monthly totals, and writes
//! the results as one JSON report.

pub mod aggregate;
pub mod analyzer;
pub mod types;
pub mod utility;
