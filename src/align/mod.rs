//! Series alignment into tabular records
//!
//! Decoded series become plain ordered tables: rows keyed by timestamp (or
//! region code), one column per keyword/geo/timeframe combination. Values
//! stay on whatever scale the upstream assigned; nothing here re-normalizes.

use crate::models::{KeywordSeries, RegionSeries, SeriesPoint};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A time-indexed table with one column per series
///
/// Rows are ordered chronologically; a cell is `None` when its series has
/// no sample at that timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTable {
    pub columns: Vec<String>,
    pub rows: Vec<TimeRow>,
}

/// One table row: a timestamp plus one cell per column
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<Option<f64>>,
    /// Whether any contributing sample was flagged as still forming
    pub is_partial: bool,
}

/// A multirange table: one branch column pair per (timeframe, geo) branch
///
/// Branches keep their own timestamps and align by ordinal position, so
/// ranges with different wall-clock endpoints never merge rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MultirangeTable {
    pub branches: Vec<BranchColumn>,
}

/// A labeled branch with its own timestamp axis
#[derive(Debug, Clone, PartialEq)]
pub struct BranchColumn {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

impl MultirangeTable {
    /// Number of ordinal rows (length of the longest branch)
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.branches
            .iter()
            .map(|b| b.points.len())
            .max()
            .unwrap_or(0)
    }

    /// The cells of ordinal row `i`, one per branch
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<Option<&SeriesPoint>> {
        self.branches.iter().map(|b| b.points.get(i)).collect()
    }
}

/// A region-indexed table with one column per keyword
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTable {
    pub columns: Vec<String>,
    pub rows: Vec<RegionRow>,
}

/// One region row: code, display name and one cell per keyword
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub region_code: String,
    pub region_name: String,
    pub values: Vec<Option<f64>>,
}

/// Align time-indexed series into one table keyed by timestamp
///
/// Series sharing timestamps land in the same row; values are carried
/// unchanged.
#[must_use]
pub fn align_time(series: &[KeywordSeries]) -> TimeTable {
    let columns: Vec<String> = series.iter().map(|s| s.keyword.clone()).collect();

    let mut index: BTreeMap<DateTime<Utc>, (Vec<Option<f64>>, bool)> = BTreeMap::new();
    for (col, s) in series.iter().enumerate() {
        for point in &s.points {
            let entry = index
                .entry(point.timestamp)
                .or_insert_with(|| (vec![None; series.len()], false));
            entry.0[col] = Some(point.value);
            entry.1 |= point.is_partial;
        }
    }

    let rows = index
        .into_iter()
        .map(|(timestamp, (values, is_partial))| TimeRow {
            timestamp,
            values,
            is_partial,
        })
        .collect();

    TimeTable { columns, rows }
}

/// Lay out multirange branches side by side without merging timestamps
#[must_use]
pub fn align_multirange(series: Vec<KeywordSeries>) -> MultirangeTable {
    MultirangeTable {
        branches: series
            .into_iter()
            .map(|s| BranchColumn {
                label: s.keyword,
                points: s.points,
            })
            .collect(),
    }
}

/// Align region-indexed series into one table keyed by region code
#[must_use]
pub fn align_region(series: &[RegionSeries]) -> RegionTable {
    let columns: Vec<String> = series.iter().map(|s| s.keyword.clone()).collect();

    let mut index: BTreeMap<String, (String, Vec<Option<f64>>)> = BTreeMap::new();
    for (col, s) in series.iter().enumerate() {
        for point in &s.points {
            let entry = index
                .entry(point.region_code.clone())
                .or_insert_with(|| (point.region_name.clone(), vec![None; series.len()]));
            entry.1[col] = Some(point.value);
        }
    }

    let rows = index
        .into_iter()
        .map(|(region_code, (region_name, values))| RegionRow {
            region_code,
            region_name,
            values,
        })
        .collect();

    RegionTable { columns, rows }
}

/// Column labels for a set of comparison branches
///
/// The keyword alone labels a column; the geo is appended when branches
/// differ by geo, and the timeframe when they differ by timeframe, so every
/// (interval, geo) pair stays distinguishable.
#[must_use]
pub fn branch_labels(keywords: &[String], geos: &[String], timeframes: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = keywords.to_vec();

    let distinct_geos = geos.iter().collect::<std::collections::HashSet<_>>().len();
    if distinct_geos > 1 {
        for (label, geo) in labels.iter_mut().zip(geos) {
            let shown = if geo.is_empty() { "world" } else { geo };
            *label = format!("{label} | {shown}");
        }
    }

    let distinct_tfs = timeframes
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len();
    if distinct_tfs > 1 {
        for (label, tf) in labels.iter_mut().zip(timeframes) {
            *label = format!("{label} | {tf}");
        }
    }

    labels
}
