//! Batch payload decoding
//!
//! The batch endpoints trade structure for density: a showcase timeline row
//! is just `[keyword, [values...]]` with no per-point timestamps, and a
//! trending-now entry is a positional tuple. Timestamps for showcase series
//! are synthesized from the request window's fixed step, anchored at the
//! request time floored to the step.

use super::{as_f64, DecodeError};
use crate::models::{BatchWindow, KeywordSeries, SeriesPoint, TrendingKeyword};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

/// Decode showcase timeline rows into one self-normalized series per keyword
///
/// Every series is scaled 0-100 against its own maximum; values from
/// different keywords in the same response are not comparable and are never
/// rescaled against each other here.
///
/// A complete window carries `window.expected_points()` values; one fewer is
/// tolerated because the trailing sample may not have formed yet at request
/// time. Anything else fails with [`DecodeError::PointCountMismatch`] naming
/// the keyword.
///
/// # Errors
///
/// [`DecodeError::EmptyResult`] when the row list is empty.
pub fn showcase_timeline(
    rows: &[Value],
    window: BatchWindow,
    anchor: DateTime<Utc>,
) -> Result<Vec<KeywordSeries>, DecodeError> {
    if rows.is_empty() {
        return Err(DecodeError::EmptyResult);
    }

    let step = window.step_secs();
    let expected = window.expected_points();
    // Whole steps only: the upstream emits samples on step boundaries.
    let anchor_floor = DateTime::<Utc>::from_timestamp(anchor.timestamp() / step * step, 0)
        .unwrap_or(anchor);

    let mut series = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let keyword = row
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Envelope(format!("batch row {row_idx} keyword")))?;
        let values = row
            .get(1)
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::Envelope(format!("batch row {row_idx} values")))?;

        if values.len() != expected && values.len() != expected - 1 {
            return Err(DecodeError::PointCountMismatch {
                keyword: keyword.to_string(),
                got: values.len(),
                expected,
            });
        }

        // A short series is missing its trailing sample, so its last point
        // sits one step before the anchor.
        let last = if values.len() == expected {
            anchor_floor
        } else {
            anchor_floor - Duration::seconds(step)
        };

        let points = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let offset = (values.len() - 1 - i) as i64;
                Ok(SeriesPoint {
                    timestamp: last - Duration::seconds(offset * step),
                    value: as_f64(value, &format!("batch row {row_idx} value[{i}]"))?,
                    is_partial: false,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        series.push(KeywordSeries::self_scaled(keyword, points));
    }

    debug!(
        keywords = series.len(),
        window = ?window,
        "decoded showcase timeline batch"
    );
    Ok(series)
}

/// Decode a trending-now keyword list
///
/// Entries are positional tuples; only the stable fields are kept. Start
/// and end markers arrive as one-element timestamp arrays.
///
/// # Errors
///
/// [`DecodeError::EmptyResult`] when the list is empty.
pub fn trending_now(entries: &[Value]) -> Result<Vec<TrendingKeyword>, DecodeError> {
    if entries.is_empty() {
        return Err(DecodeError::EmptyResult);
    }

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let keyword = entry
                .get(0)
                .and_then(Value::as_str)
                .ok_or_else(|| DecodeError::Envelope(format!("trending entry {idx} keyword")))?;
            let geo = entry.get(2).and_then(Value::as_str).unwrap_or_default();
            let volume = entry.get(6).and_then(Value::as_i64).unwrap_or(0);
            let volume_growth_pct = entry.get(8).and_then(Value::as_i64).unwrap_or(0);
            let trend_keywords = entry
                .get(9)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            Ok(TrendingKeyword {
                keyword: keyword.to_string(),
                geo: geo.to_string(),
                volume,
                volume_growth_pct,
                started_at: tuple_timestamp(entry.get(3)),
                ended_at: tuple_timestamp(entry.get(4)),
                trend_keywords,
            })
        })
        .collect()
}

/// Read a `[epoch_seconds]` marker, absent or null when not set
fn tuple_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let secs = value?.get(0)?.as_i64()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}
