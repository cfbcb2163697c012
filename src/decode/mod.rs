//! Upstream payload decoding
//!
//! The service answers with loosely-typed JSON in a handful of shapes:
//! time-indexed timelines (single and multirange), region-indexed maps,
//! ranked related-searches lists and compact batch arrays. Every shape has
//! its own explicit decoder behind a shape tag, so a
//! payload is never probed field-by-field. Responses are guarded with an
//! XSSI prefix and batch responses wrap their data in an RPC envelope; the
//! helpers here peel both layers.

pub mod batch;
pub mod region;
pub mod related;
pub mod timeline;

use crate::models::{BatchWindow, KeywordSeries, RegionSeries};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors produced while decoding an upstream payload
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not valid JSON
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A structural element the shape requires is missing
    #[error("Missing expected envelope element: {0}")]
    Envelope(String),

    /// A value field that should be numeric is not
    #[error("Non-numeric value field at {0}")]
    NonNumeric(String),

    /// Well-formed payload carrying no data (e.g. an obscure keyword)
    ///
    /// Distinguished from structural failures so callers can treat "no data"
    /// as a soft outcome rather than a broken response.
    #[error("Empty result: the response is well-formed but carries no data")]
    EmptyResult,

    /// A batch series whose length does not fit its window
    #[error("Point count mismatch for {keyword:?}: decoded {got} points, expected {expected} for this window")]
    PointCountMismatch {
        keyword: String,
        got: usize,
        expected: usize,
    },

    /// No embedded token block in an explore page
    #[error("No embedded request token found in response")]
    MissingToken,
}

impl DecodeError {
    /// Whether the condition is a soft "no data" outcome
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult)
    }
}

/// Shape tag selecting a decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Time-indexed series (single timeline or multirange columns)
    Time,
    /// Region-indexed values
    Region,
    /// Compact per-keyword batch arrays
    Batch {
        window: BatchWindow,
        anchor: DateTime<Utc>,
    },
}

/// Records produced by [`decode`]
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Time(Vec<KeywordSeries>),
    Region(Vec<RegionSeries>),
    Batch(Vec<KeywordSeries>),
}

/// Decode a raw payload according to its shape tag
///
/// `labels` names the requested keyword/branch combinations in request
/// order. This is the tagged entry point; the shape-specific functions in
/// [`timeline`], [`region`] and [`batch`] are available directly when the
/// caller already knows the shape.
///
/// # Errors
///
/// See [`DecodeError`]; [`DecodeError::EmptyResult`] signals a well-formed
/// but data-less payload.
pub fn decode(
    payload: &str,
    shape: PayloadShape,
    labels: &[String],
) -> Result<Decoded, DecodeError> {
    match shape {
        PayloadShape::Time => {
            let value = parse_guarded_json(payload)?;
            if has_multirange_columns(&value) {
                Ok(Decoded::Time(timeline::multirange(&value, labels)?))
            } else {
                Ok(Decoded::Time(timeline::interest_over_time(&value, labels)?))
            }
        }
        PayloadShape::Region => {
            let value = parse_guarded_json(payload)?;
            Ok(Decoded::Region(region::interest_by_region(&value, labels)?))
        }
        PayloadShape::Batch { window, anchor } => {
            let inner = batch_rpc_payload(payload)?;
            let rows = inner
                .get(1)
                .and_then(Value::as_array)
                .ok_or_else(|| DecodeError::Envelope("batch row list".into()))?;
            Ok(Decoded::Batch(batch::showcase_timeline(rows, window, anchor)?))
        }
    }
}

/// Strip the XSSI guard and parse the JSON document
///
/// Protected responses prefix their JSON with `)]}'` on its own line; the
/// document proper is the last line of the body.
pub fn parse_guarded_json(text: &str) -> Result<Value, DecodeError> {
    let last_line = text.rsplit_once('\n').map_or(text, |(_, rest)| rest);
    Ok(serde_json::from_str(last_line.trim())?)
}

/// Unwrap a batch RPC envelope down to its inner data document
///
/// Batch responses are a guarded JSON array whose first row carries the
/// RPC result as a nested JSON string.
pub fn batch_rpc_payload(text: &str) -> Result<Value, DecodeError> {
    let outer = parse_guarded_json(text)?;
    let inner_text = outer
        .get(0)
        .and_then(|row| row.get(2))
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Envelope("batch RPC result string".into()))?;
    Ok(serde_json::from_str(inner_text)?)
}

/// Extract the JSON document embedded in an explore page script blob
///
/// Explore pages carry the widget token inside `JSON.parse('...')` with
/// hex-escaped braces and quotes.
pub fn extract_embedded_json(text: &str) -> Result<Value, DecodeError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let pattern = RE.get_or_init(|| Regex::new(r"JSON\.parse\('([^']+)'\)").unwrap());

    let escaped = pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .ok_or(DecodeError::MissingToken)?;
    Ok(serde_json::from_str(&decode_escape_text(escaped.as_str()))?)
}

/// Undo the `\xNN` hex escaping used in embedded script blobs
fn decode_escape_text(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let hex = RE.get_or_init(|| Regex::new(r"\\x([0-9a-fA-F]{2})").unwrap());

    let replaced = hex.replace_all(text, |caps: &regex::Captures<'_>| {
        u8::from_str_radix(&caps[1], 16)
            .ok()
            .map(|b| (b as char).to_string())
            .unwrap_or_default()
    });
    replaced.replace("\\\\", "\\")
}

/// Whether a timeline payload carries multirange column data
fn has_multirange_columns(value: &Value) -> bool {
    value
        .pointer("/default/timelineData/0/columnData")
        .is_some()
}

/// Read a numeric field, naming its location on failure
pub(crate) fn as_f64(value: &Value, location: &str) -> Result<f64, DecodeError> {
    value
        .as_f64()
        .ok_or_else(|| DecodeError::NonNumeric(location.to_string()))
}

/// Read an epoch-seconds timestamp that may arrive as string or number
pub(crate) fn as_timestamp(value: &Value, location: &str) -> Result<DateTime<Utc>, DecodeError> {
    let secs = match value {
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| DecodeError::NonNumeric(location.to_string()))?,
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| DecodeError::NonNumeric(location.to_string()))?,
        _ => return Err(DecodeError::NonNumeric(location.to_string())),
    };
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| DecodeError::NonNumeric(location.to_string()))
}
