//! Ranked related-searches decoding

use super::{as_f64, DecodeError};
use crate::models::{RelatedGroup, RelatedItem, TopicRef};
use serde_json::Value;

/// Decode a related-searches payload into top and rising lists
///
/// The payload carries up to two ranked lists: the first holds the
/// most-searched entries, the second the fastest-growing ones. Entries are
/// queries or knowledge-graph topics; both shapes decode into
/// [`RelatedItem`] with the topic identity attached where present.
///
/// # Errors
///
/// [`DecodeError::EmptyResult`] when no list carries entries,
/// [`DecodeError::Envelope`]/[`DecodeError::NonNumeric`] on structural
/// failures.
pub fn ranked_lists(payload: &Value) -> Result<RelatedGroup, DecodeError> {
    let lists = payload
        .pointer("/default/rankedList")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::Envelope("default.rankedList".into()))?;

    let top = decode_list(lists.first(), "rankedList[0]")?;
    let rising = decode_list(lists.get(1), "rankedList[1]")?;
    if top.is_empty() && rising.is_empty() {
        return Err(DecodeError::EmptyResult);
    }

    Ok(RelatedGroup { top, rising })
}

/// Decode one ranked list; a missing list is an empty one
fn decode_list(list: Option<&Value>, location: &str) -> Result<Vec<RelatedItem>, DecodeError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let entries = list
        .get("rankedKeyword")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::Envelope(format!("{location}.rankedKeyword")))?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| decode_entry(entry, &format!("{location}.rankedKeyword[{idx}]")))
        .collect()
}

fn decode_entry(entry: &Value, location: &str) -> Result<RelatedItem, DecodeError> {
    let value = as_f64(
        entry.get("value").unwrap_or(&Value::Null),
        &format!("{location}.value"),
    )?;
    let formatted_value = entry
        .get("formattedValue")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(topic) = entry.get("topic") {
        let title = topic
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Envelope(format!("{location}.topic.title")))?;
        let id = topic
            .get("mid")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Envelope(format!("{location}.topic.mid")))?;
        let kind = topic
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(RelatedItem {
            label: title.to_string(),
            value,
            formatted_value,
            topic: Some(TopicRef {
                id: id.to_string(),
                kind,
            }),
        })
    } else {
        let query = entry
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Envelope(format!("{location}.query")))?;
        Ok(RelatedItem {
            label: query.to_string(),
            value,
            formatted_value,
            topic: None,
        })
    }
}
