//! Time-indexed payload decoding
//!
//! Handles the two timeline envelopes: the single `timelineData` list where
//! every entry carries one value per keyword, and the multirange variant
//! where every entry carries one `columnData` cell per branch.

use super::{as_f64, as_timestamp, DecodeError};
use crate::models::{KeywordSeries, SeriesPoint};
use serde_json::Value;

/// Decode a single-timeline payload into one series per keyword
///
/// Entry order is preserved as chronological order; points the upstream
/// flags with `isPartial` are marked as still forming.
///
/// # Errors
///
/// [`DecodeError::EmptyResult`] when the timeline is present but empty,
/// [`DecodeError::Envelope`]/[`DecodeError::NonNumeric`] on structural
/// failures.
pub fn interest_over_time(
    payload: &Value,
    keywords: &[String],
) -> Result<Vec<KeywordSeries>, DecodeError> {
    let timeline = timeline_entries(payload)?;
    if timeline.is_empty() {
        return Err(DecodeError::EmptyResult);
    }

    let mut series: Vec<Vec<SeriesPoint>> = vec![Vec::with_capacity(timeline.len()); keywords.len()];
    for (row_idx, entry) in timeline.iter().enumerate() {
        let timestamp = as_timestamp(
            entry
                .get("time")
                .ok_or_else(|| DecodeError::Envelope(format!("timelineData[{row_idx}].time")))?,
            &format!("timelineData[{row_idx}].time"),
        )?;
        let is_partial = entry
            .get("isPartial")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let values = entry
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::Envelope(format!("timelineData[{row_idx}].value")))?;
        if values.len() != keywords.len() {
            return Err(DecodeError::Envelope(format!(
                "timelineData[{row_idx}].value holds {} entries for {} keywords",
                values.len(),
                keywords.len()
            )));
        }

        for (col, value) in values.iter().enumerate() {
            series[col].push(SeriesPoint {
                timestamp,
                value: as_f64(value, &format!("timelineData[{row_idx}].value[{col}]"))?,
                is_partial,
            });
        }
    }

    Ok(keywords
        .iter()
        .zip(series)
        .map(|(kw, points)| KeywordSeries::global(kw.clone(), points))
        .collect())
}

/// Decode a multirange payload into one series per branch column
///
/// Each branch keeps its own timestamps; `-1` cells mark positions outside
/// the branch's range and are dropped. Branch labels default to
/// `branch_<i>` when fewer labels than columns are supplied.
///
/// # Errors
///
/// [`DecodeError::EmptyResult`] when no rows carry column data.
pub fn multirange(payload: &Value, labels: &[String]) -> Result<Vec<KeywordSeries>, DecodeError> {
    let timeline = timeline_entries(payload)?;
    let num_columns = timeline
        .first()
        .and_then(|entry| entry.get("columnData"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or(DecodeError::EmptyResult)?;

    let mut series: Vec<Vec<SeriesPoint>> = vec![Vec::with_capacity(timeline.len()); num_columns];
    for (row_idx, entry) in timeline.iter().enumerate() {
        let columns = entry
            .get("columnData")
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::Envelope(format!("timelineData[{row_idx}].columnData")))?;
        if columns.len() != num_columns {
            return Err(DecodeError::Envelope(format!(
                "timelineData[{row_idx}].columnData holds {} cells, expected {num_columns}",
                columns.len()
            )));
        }

        for (col, cell) in columns.iter().enumerate() {
            let location = format!("timelineData[{row_idx}].columnData[{col}]");
            let value = as_f64(
                cell.get("value")
                    .ok_or_else(|| DecodeError::Envelope(format!("{location}.value")))?,
                &format!("{location}.value"),
            )?;
            // -1 marks a position outside this branch's range
            if (value + 1.0).abs() < f64::EPSILON {
                continue;
            }
            let timestamp = as_timestamp(
                cell.get("time")
                    .ok_or_else(|| DecodeError::Envelope(format!("{location}.time")))?,
                &format!("{location}.time"),
            )?;
            let is_partial = cell
                .get("isPartial")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            series[col].push(SeriesPoint {
                timestamp,
                value,
                is_partial,
            });
        }
    }

    Ok(series
        .into_iter()
        .enumerate()
        .map(|(i, points)| {
            let label = labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("branch_{i}"));
            KeywordSeries::global(label, points)
        })
        .collect())
}

/// Pull the `default.timelineData` list out of a timeline payload
fn timeline_entries(payload: &Value) -> Result<&Vec<Value>, DecodeError> {
    payload
        .pointer("/default/timelineData")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::Envelope("default.timelineData".into()))
}
