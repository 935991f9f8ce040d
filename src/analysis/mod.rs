//! Analysis modules.
//!
//! Aggregation of normalized label entries into per-year and
//! per-year-and-route rows.

pub mod aggregator;

pub use aggregator::*;
