//! Region-indexed payload decoding

use super::{as_f64, DecodeError};
use crate::models::{RegionPoint, RegionSeries};
use serde_json::Value;

/// Decode a region-map payload into one series per keyword
///
/// Region codes and names pass through unresolved; mapping codes to
/// canonical display names is a lookup concern outside this crate. Entries
/// the upstream marks as having no data for a keyword are skipped for that
/// keyword only.
///
/// # Errors
///
/// [`DecodeError::EmptyResult`] when no region carries data,
/// [`DecodeError::Envelope`]/[`DecodeError::NonNumeric`] on structural
/// failures.
pub fn interest_by_region(
    payload: &Value,
    keywords: &[String],
) -> Result<Vec<RegionSeries>, DecodeError> {
    let entries = payload
        .pointer("/default/geoMapData")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::Envelope("default.geoMapData".into()))?;
    if entries.is_empty() {
        return Err(DecodeError::EmptyResult);
    }

    let mut series: Vec<Vec<RegionPoint>> = vec![Vec::new(); keywords.len()];
    for (row_idx, entry) in entries.iter().enumerate() {
        let code = entry
            .get("geoCode")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Envelope(format!("geoMapData[{row_idx}].geoCode")))?;
        let name = entry
            .get("geoName")
            .and_then(Value::as_str)
            .unwrap_or(code);

        let values = entry
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::Envelope(format!("geoMapData[{row_idx}].value")))?;
        if values.len() != keywords.len() {
            return Err(DecodeError::Envelope(format!(
                "geoMapData[{row_idx}].value holds {} entries for {} keywords",
                values.len(),
                keywords.len()
            )));
        }

        let has_data = entry.get("hasData").and_then(Value::as_array);
        for (col, value) in values.iter().enumerate() {
            let keyword_has_data = has_data
                .and_then(|flags| flags.get(col))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if !keyword_has_data {
                continue;
            }
            series[col].push(RegionPoint {
                region_code: code.to_string(),
                region_name: name.to_string(),
                value: as_f64(value, &format!("geoMapData[{row_idx}].value[{col}]"))?,
            });
        }
    }

    if series.iter().all(Vec::is_empty) {
        return Err(DecodeError::EmptyResult);
    }

    Ok(keywords
        .iter()
        .zip(series)
        .map(|(kw, points)| RegionSeries {
            keyword: kw.clone(),
            points,
        })
        .collect())
}
