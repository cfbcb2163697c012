// Core data structures for the trends client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sample of a time-indexed interest series
///
/// Created by the decoder from a single payload entry; immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Sample timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// Interest value on the scale the upstream assigned (0-100)
    pub value: f64,

    /// Whether the upstream flagged this sample as still forming
    pub is_partial: bool,
}

/// How a series' values were scaled by the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationScope {
    /// Scaled against the maximum across all keywords in the response
    Global,

    /// Scaled 0-100 against this keyword's own maximum only (batch mode)
    SelfScaled,
}

/// A labeled interest-over-time series for one keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSeries {
    pub keyword: String,
    pub points: Vec<SeriesPoint>,
    pub normalization_scope: NormalizationScope,
}

impl KeywordSeries {
    /// Create a globally-normalized series (explore mode)
    #[must_use]
    pub fn global(keyword: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            keyword: keyword.into(),
            points,
            normalization_scope: NormalizationScope::Global,
        }
    }

    /// Create a self-normalized series (batch-showcase mode)
    #[must_use]
    pub fn self_scaled(keyword: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            keyword: keyword.into(),
            points,
            normalization_scope: NormalizationScope::SelfScaled,
        }
    }
}

/// One region's interest value for a keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPoint {
    /// Upstream region code, passed through unresolved (e.g. "US-NY")
    pub region_code: String,

    /// Region display name as the upstream sent it
    pub region_name: String,

    /// Interest value (0-100)
    pub value: f64,
}

/// A labeled region-indexed series for one keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSeries {
    pub keyword: String,
    pub points: Vec<RegionPoint>,
}

/// Geographic granularity for region-indexed requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoResolution {
    Country,
    Region,
    City,
}

impl GeoResolution {
    /// Request parameter value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "COUNTRY",
            Self::Region => "REGION",
            Self::City => "CITY",
        }
    }
}

impl std::fmt::Display for GeoResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time window for batch-showcase requests
///
/// Each window maps to a wire code and a fixed sampling step; the upstream
/// sends only values, so point timestamps are synthesized from the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchWindow {
    /// 31 points, one every 8 minutes
    Past4H,
    /// 91 points, one every 16 minutes
    Past24H,
    /// 181 points, one every 16 minutes
    Past48H,
    /// 43 points, one every 4 hours
    Past7D,
}

impl BatchWindow {
    /// Wire code the batch endpoint expects
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::Past4H => 2,
            Self::Past24H => 3,
            Self::Past48H => 5,
            Self::Past7D => 4,
        }
    }

    /// Sampling step in seconds
    #[must_use]
    pub fn step_secs(&self) -> i64 {
        match self {
            Self::Past4H => 480,
            Self::Past24H | Self::Past48H => 960,
            Self::Past7D => 14_400,
        }
    }

    /// Number of points a complete window carries
    #[must_use]
    pub fn expected_points(&self) -> usize {
        match self {
            Self::Past4H => 31,
            Self::Past24H => 91,
            Self::Past48H => 181,
            Self::Past7D => 43,
        }
    }
}

/// Knowledge-graph identity of a related topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    /// Opaque topic id (e.g. "/m/05z1_")
    pub id: String,

    /// Topic kind as the upstream labels it (e.g. "Programming language")
    pub kind: String,
}

/// One entry of a ranked related-searches list
///
/// Entries are either plain queries or knowledge-graph topics; topics carry
/// a [`TopicRef`] next to their display title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedItem {
    /// Query text, or the topic's display title
    pub label: String,

    /// Relative interest (top lists) or growth percentage (rising lists)
    pub value: f64,

    /// Display form of the value as the upstream sent it ("100", "Breakout")
    pub formatted_value: String,

    /// Topic identity when the entry is a topic rather than a query
    pub topic: Option<TopicRef>,
}

/// Top and rising ranked lists from one related-searches response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedGroup {
    /// Most-searched related entries, scaled 0-100
    pub top: Vec<RelatedItem>,

    /// Fastest-growing related entries, value in growth percent
    pub rising: Vec<RelatedItem>,
}

/// A trending search term from the trending-now feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingKeyword {
    /// The trending search term
    pub keyword: String,

    /// Geo code the trend was observed in
    pub geo: String,

    /// Approximate search volume
    pub volume: i64,

    /// Volume growth in percent
    pub volume_growth_pct: i64,

    /// When the trend started
    pub started_at: Option<DateTime<Utc>>,

    /// When the trend ended, if it is already over
    pub ended_at: Option<DateTime<Utc>>,

    /// Related search terms
    pub trend_keywords: Vec<String>,
}

impl TrendingKeyword {
    /// Whether the upstream marked the trend as finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

impl std::fmt::Display for TrendingKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {}%+)", self.keyword, self.volume, self.volume_growth_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_batch_window_codes() {
        assert_eq!(BatchWindow::Past4H.code(), 2);
        assert_eq!(BatchWindow::Past24H.code(), 3);
        assert_eq!(BatchWindow::Past48H.code(), 5);
        assert_eq!(BatchWindow::Past7D.code(), 4);
    }

    #[test]
    fn test_batch_window_geometry() {
        // Point count and step together must cover the window.
        for w in [BatchWindow::Past4H, BatchWindow::Past24H, BatchWindow::Past48H, BatchWindow::Past7D] {
            let covered = w.step_secs() * (w.expected_points() as i64 - 1);
            let window_secs = match w {
                BatchWindow::Past4H => 4 * 3600,
                BatchWindow::Past24H => 24 * 3600,
                BatchWindow::Past48H => 48 * 3600,
                BatchWindow::Past7D => 7 * 24 * 3600,
            };
            assert_eq!(covered, window_secs, "window {w:?}");
        }
    }

    #[test]
    fn test_geo_resolution_params() {
        assert_eq!(GeoResolution::Country.as_str(), "COUNTRY");
        assert_eq!(GeoResolution::Region.as_str(), "REGION");
        assert_eq!(GeoResolution::City.as_str(), "CITY");
    }

    #[test]
    fn test_trending_keyword_finished() {
        let kw = TrendingKeyword {
            keyword: "aurora".into(),
            geo: "US".into(),
            volume: 50_000,
            volume_growth_pct: 400,
            started_at: Some(Utc.with_ymd_and_hms(2024, 9, 13, 10, 0, 0).unwrap()),
            ended_at: None,
            trend_keywords: vec!["aurora borealis".into()],
        };
        assert!(!kw.is_finished());
    }

    #[test]
    fn test_series_point_serde() {
        let p = SeriesPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 9, 13, 10, 0, 0).unwrap(),
            value: 42.0,
            is_partial: false,
        };
        let json = serde_json::to_string(&p).unwrap();
        let restored: SeriesPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, p);
    }
}
