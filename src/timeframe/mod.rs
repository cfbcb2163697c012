//! Timeframe parsing and normalization
//!
//! The upstream service accepts time ranges in several human-friendly shapes:
//! fixed relative forms (`"now 4-H"`, `"today 12-m"`), anchored offsets
//! (`"2024-03-25 5-d"`), absolute date ranges and hour-precision ranges.
//! This module turns all of them into a canonical [`TimeInterval`] with
//! resolved endpoints, an inferred unit and the data resolution tier the
//! service will answer with.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Date format without time component
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date format with hour component
const DATE_T_FORMAT: &str = "%Y-%m-%dT%H";

/// Earliest date the service serves data for
const SERVICE_EPOCH: (i32, u32, u32) = (2004, 1, 1);

/// Fixed timeframes the upstream accepts verbatim
const FIXED_TIMEFRAMES: &[&str] = &[
    "now 1-H", "now 4-H", "now 1-d", "now 7-d", "today 1-m", "today 3-m", "today 12-m",
    "today 5-y", "all",
];

/// Hour-precision inputs may span at most this many hours
const HOUR_PRECISION_LIMIT_HOURS: i64 = 8 * 24;

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2})?$").unwrap())
}

fn offset_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)-?([Hdmy])$").unwrap())
}

/// Errors that can occur while parsing a timeframe string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeframeError {
    /// Input matched none of the recognized grammars
    #[error("Malformed timeframe: {0:?}. Expected '<date> <offset>', '<date> <date>', a fixed form like 'now 4-H', or 'all'")]
    Malformed(String),

    /// Hour-precision input spanning 8 days or more
    #[error("Unsupported precision: {0:?} spans 8 days or more, which exceeds what hourly data supports. Use 'YYYY-MM-DD' endpoints instead")]
    UnsupportedPrecision(String),
}

/// Granularity inferred from the timeframe grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TimeUnit {
    /// `H`-suffixed offsets and hour-precision endpoints
    Hour,
    /// `d`-suffixed offsets and bare date ranges
    Day,
    /// `m`/`y`-suffixed offsets and the `all` sentinel
    Month,
}

/// Data resolution tier the upstream assigns to a span
///
/// All timeframes in a comparable request must fall into the same tier,
/// otherwise the service would normalize series sampled at different rates
/// against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Resolution {
    OneMinute,
    EightMinutes,
    SixteenMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Resolution {
    /// Derive the resolution tier from a span
    #[must_use]
    pub fn from_span(span: Duration) -> Self {
        if span < Duration::hours(5) {
            Self::OneMinute
        } else if span < Duration::hours(36) {
            Self::EightMinutes
        } else if span < Duration::hours(72) {
            Self::SixteenMinutes
        } else if span < Duration::days(8) {
            Self::OneHour
        } else if span < Duration::days(270) {
            Self::OneDay
        } else if span < Duration::days(1900) {
            Self::OneWeek
        } else {
            Self::OneMonth
        }
    }

    /// Human-readable tier name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1 minute",
            Self::EightMinutes => "8 minutes",
            Self::SixteenMinutes => "16 minutes",
            Self::OneHour => "1 hour",
            Self::OneDay => "1 day",
            Self::OneWeek => "1 week",
            Self::OneMonth => "1 month",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed, resolved time interval
///
/// `start <= end` always holds. `raw` keeps the original input so error
/// messages and request parameters can reproduce it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeInterval {
    raw: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    unit: TimeUnit,
    /// Fixed upstream forms are forwarded verbatim instead of as date pairs
    fixed: bool,
}

impl TimeInterval {
    /// Parse a timeframe string, resolving relative anchors against the
    /// current UTC time
    ///
    /// # Errors
    ///
    /// Returns [`TimeframeError::Malformed`] when the input matches none of
    /// the recognized grammars and [`TimeframeError::UnsupportedPrecision`]
    /// when an hour-precision input spans 8 days or more.
    pub fn parse(input: &str) -> Result<Self, TimeframeError> {
        Self::parse_at(input, Utc::now())
    }

    /// Parse a timeframe string against an explicit clock
    ///
    /// Parsing is a pure function of `(input, now)`, which keeps tests
    /// deterministic.
    pub fn parse_at(input: &str, now: DateTime<Utc>) -> Result<Self, TimeframeError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(TimeframeError::Malformed(input.to_string()));
        }

        if raw == "all" {
            let (y, m, d) = SERVICE_EPOCH;
            let start = Utc
                .with_ymd_and_hms(y, m, d, 0, 0, 0)
                .single()
                .expect("service epoch is a valid date");
            return Ok(Self {
                raw: raw.to_string(),
                start,
                end: truncate_to_day(now),
                unit: TimeUnit::Month,
                fixed: true,
            });
        }

        // Relative anchors become concrete endpoints: "now" carries hour
        // precision, "today" does not.
        let substituted = raw
            .replace("now", &now.format(DATE_T_FORMAT).to_string())
            .replace("today", &now.format(DATE_FORMAT).to_string());

        let parts: Vec<&str> = substituted.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(TimeframeError::Malformed(raw.to_string()));
        }

        let (first, second) = (parts[0], parts[1]);
        if !date_pattern().is_match(first) {
            return Err(TimeframeError::Malformed(raw.to_string()));
        }

        let relative = raw.starts_with("now") || raw.starts_with("today");
        let mut interval = if date_pattern().is_match(second) {
            Self::from_date_pair(raw, first, second)?
        } else if offset_pattern().is_match(second) {
            Self::from_anchored_offset(raw, first, second, relative)?
        } else {
            return Err(TimeframeError::Malformed(raw.to_string()));
        };

        interval.fixed = FIXED_TIMEFRAMES.contains(&raw);
        Ok(interval)
    }

    /// Absolute range: both endpoints are literal dates, possibly with hours
    fn from_date_pair(raw: &str, first: &str, second: &str) -> Result<Self, TimeframeError> {
        let hour_precision = first.contains('T') || second.contains('T');

        let mut start = decode_endpoint(raw, first)?;
        let mut end = decode_endpoint(raw, second)?;

        // Widen mixed-precision endpoints: a date-only start begins at
        // midnight, a date-only end runs through the whole day.
        if hour_precision {
            if !first.contains('T') {
                start = truncate_to_day(start);
            }
            if !second.contains('T') {
                end = truncate_to_day(end) + Duration::days(1);
            }
        }

        if start > end {
            return Err(TimeframeError::Malformed(raw.to_string()));
        }
        if hour_precision && end - start >= Duration::hours(HOUR_PRECISION_LIMIT_HOURS) {
            return Err(TimeframeError::UnsupportedPrecision(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            start,
            end,
            unit: if hour_precision { TimeUnit::Hour } else { TimeUnit::Day },
            fixed: false,
        })
    }

    /// Anchored offset: the interval ends at the anchor and spans the offset
    /// backward in time
    fn from_anchored_offset(
        raw: &str,
        anchor: &str,
        offset: &str,
        relative: bool,
    ) -> Result<Self, TimeframeError> {
        let caps = offset_pattern()
            .captures(offset)
            .ok_or_else(|| TimeframeError::Malformed(raw.to_string()))?;
        let count: u32 = caps[1]
            .parse()
            .map_err(|_| TimeframeError::Malformed(raw.to_string()))?;
        if count == 0 {
            return Err(TimeframeError::Malformed(raw.to_string()));
        }
        let unit_char = caps[2].chars().next().unwrap_or('d');

        let end = decode_endpoint(raw, anchor)?;
        let (start, mut unit) = match unit_char {
            'H' => (end - Duration::hours(i64::from(count)), TimeUnit::Hour),
            'd' => (
                end - Duration::days(i64::from(count)),
                // Hour-precision anchors keep hourly granularity so that
                // canonical() preserves the anchor's hour component.
                if anchor.contains('T') { TimeUnit::Hour } else { TimeUnit::Day },
            ),
            'm' => (
                end.checked_sub_months(Months::new(count))
                    .ok_or_else(|| TimeframeError::Malformed(raw.to_string()))?,
                TimeUnit::Month,
            ),
            'y' => (
                end.checked_sub_months(Months::new(count.saturating_mul(12)))
                    .ok_or_else(|| TimeframeError::Malformed(raw.to_string()))?,
                TimeUnit::Month,
            ),
            _ => return Err(TimeframeError::Malformed(raw.to_string())),
        };

        let spans_too_long_for_hours =
            end - start >= Duration::hours(HOUR_PRECISION_LIMIT_HOURS);
        if anchor.contains('T') && spans_too_long_for_hours {
            if relative {
                // "now 300-H" style inputs fall back to daily granularity
                // instead of failing: the caller asked for a relative window,
                // not for hourly data specifically.
                unit = TimeUnit::Day;
            } else {
                return Err(TimeframeError::UnsupportedPrecision(raw.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            start,
            end,
            unit,
            fixed: false,
        })
    }

    /// The original input string
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Resolved interval start (UTC)
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Resolved interval end (UTC)
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Granularity inferred from the input grammar
    #[must_use]
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Duration covered by the interval
    #[must_use]
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Data resolution tier the upstream assigns to this span
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        Resolution::from_span(self.span())
    }

    /// Canonical request form
    ///
    /// Fixed upstream forms pass through verbatim; everything else becomes a
    /// resolved `"<start> <end>"` pair, with hour components only when the
    /// interval carries hourly granularity. Re-parsing the canonical form
    /// yields an interval with the same endpoints and resolution.
    #[must_use]
    pub fn canonical(&self) -> String {
        if self.fixed {
            return self.raw.clone();
        }
        let fmt = match self.unit {
            TimeUnit::Hour => DATE_T_FORMAT,
            TimeUnit::Day | TimeUnit::Month => DATE_FORMAT,
        };
        format!("{} {}", self.start.format(fmt), self.end.format(fmt))
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Decode a `YYYY-MM-DD` or `YYYY-MM-DDTHH` endpoint
fn decode_endpoint(raw: &str, s: &str) -> Result<DateTime<Utc>, TimeframeError> {
    let naive: NaiveDateTime = if s.contains('T') {
        // chrono refuses to build a NaiveDateTime without a minute field, so
        // pad the hour-precision endpoint with ":00" before parsing.
        NaiveDateTime::parse_from_str(&format!("{s}:00"), "%Y-%m-%dT%H:%M")
            .map_err(|_| TimeframeError::Malformed(raw.to_string()))?
    } else {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map_err(|_| TimeframeError::Malformed(raw.to_string()))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TimeframeError::Malformed(raw.to_string()))?
    };
    Ok(Utc.from_utc_datetime(&naive))
}

/// Drop the time-of-day component
fn truncate_to_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(dt.year(), dt.month(), dt.day(), 0, 0, 0)
        .single()
        .unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 13, 22, 30, 0).unwrap()
    }

    #[test]
    fn test_fixed_forms_pass_through() {
        for tf in FIXED_TIMEFRAMES {
            let iv = TimeInterval::parse_at(tf, clock()).unwrap();
            assert_eq!(iv.canonical(), *tf, "fixed form should stay verbatim");
        }
    }

    #[test]
    fn test_now_hours() {
        let iv = TimeInterval::parse_at("now 5-H", clock()).unwrap();
        assert_eq!(iv.unit(), TimeUnit::Hour);
        assert_eq!(iv.span(), Duration::hours(5));
        // "now" resolves with hour precision, minutes truncated
        assert_eq!(iv.end(), Utc.with_ymd_and_hms(2024, 9, 13, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_today_days() {
        let iv = TimeInterval::parse_at("today 10-d", clock()).unwrap();
        assert_eq!(iv.unit(), TimeUnit::Day);
        assert_eq!(iv.span(), Duration::days(10));
        assert_eq!(iv.end(), Utc.with_ymd_and_hms(2024, 9, 13, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_anchored_offset_runs_backward() {
        let iv = TimeInterval::parse_at("2024-09-12 1-y", clock()).unwrap();
        assert_eq!(iv.canonical(), "2023-09-12 2024-09-12");
        assert_eq!(iv.unit(), TimeUnit::Month);
    }

    #[test]
    fn test_month_offset() {
        let iv = TimeInterval::parse_at("2024-09-12 1-m", clock()).unwrap();
        assert_eq!(iv.canonical(), "2024-08-12 2024-09-12");
    }

    #[test]
    fn test_hour_anchor_offset() {
        let iv = TimeInterval::parse_at("2024-09-12T23 5-H", clock()).unwrap();
        assert_eq!(iv.canonical(), "2024-09-12T18 2024-09-12T23");
        assert_eq!(iv.unit(), TimeUnit::Hour);
    }

    #[test]
    fn test_hour_anchor_day_offset() {
        let iv = TimeInterval::parse_at("2024-09-12T23 1-d", clock()).unwrap();
        assert_eq!(iv.canonical(), "2024-09-11T23 2024-09-12T23");
    }

    #[test]
    fn test_date_range() {
        let iv = TimeInterval::parse_at("2024-01-01 2024-12-31", clock()).unwrap();
        assert_eq!(iv.unit(), TimeUnit::Day);
        assert_eq!(iv.canonical(), "2024-01-01 2024-12-31");
    }

    #[test]
    fn test_mixed_precision_widens_end() {
        let iv = TimeInterval::parse_at("2024-09-12T23 2024-09-13", clock()).unwrap();
        assert_eq!(iv.canonical(), "2024-09-12T23 2024-09-14T00");
    }

    #[test]
    fn test_mixed_precision_widens_start() {
        let iv = TimeInterval::parse_at("2024-09-12 2024-09-13T12", clock()).unwrap();
        assert_eq!(iv.canonical(), "2024-09-12T00 2024-09-13T12");
    }

    #[test]
    fn test_hour_range_too_long() {
        let err = TimeInterval::parse_at("2024-09-01T00 2024-09-20T00", clock()).unwrap_err();
        assert!(matches!(err, TimeframeError::UnsupportedPrecision(_)));
    }

    #[test]
    fn test_hour_anchor_offset_too_long() {
        let err = TimeInterval::parse_at("2024-09-12T23 8-d", clock()).unwrap_err();
        assert!(matches!(err, TimeframeError::UnsupportedPrecision(_)));
    }

    #[test]
    fn test_now_long_hours_reclassifies_to_days() {
        // 300 hours is past the hourly limit; relative inputs degrade to
        // daily granularity instead of failing.
        let iv = TimeInterval::parse_at("now 300-H", clock()).unwrap();
        assert_eq!(iv.unit(), TimeUnit::Day);
        assert_eq!(iv.span(), Duration::hours(300));
    }

    #[test]
    fn test_all_sentinel() {
        let iv = TimeInterval::parse_at("all", clock()).unwrap();
        assert_eq!(iv.start(), Utc.with_ymd_and_hms(2004, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(iv.unit(), TimeUnit::Month);
        assert_eq!(iv.canonical(), "all");
        assert_eq!(iv.resolution(), Resolution::OneMonth);
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in ["", "tomorrow 5-d", "2024-09-12T23 invalid", "2024/09/12 5-d", "now", "now 5-d extra"] {
            let err = TimeInterval::parse_at(bad, clock()).unwrap_err();
            assert!(matches!(err, TimeframeError::Malformed(_)), "input {bad:?}");
        }
    }

    #[test]
    fn test_malformed_names_input() {
        let err = TimeInterval::parse_at("definitely not a timeframe", clock()).unwrap_err();
        assert!(err.to_string().contains("definitely not a timeframe"));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = TimeInterval::parse_at("2024-12-31 2024-01-01", clock()).unwrap_err();
        assert!(matches!(err, TimeframeError::Malformed(_)));
    }

    #[test]
    fn test_resolution_tiers() {
        let cases = [
            ("now 4-H", Resolution::OneMinute),
            ("now 1-d", Resolution::EightMinutes),
            ("now 2-d", Resolution::SixteenMinutes),
            ("now 7-d", Resolution::OneHour),
            ("today 1-m", Resolution::OneDay),
            ("today 12-m", Resolution::OneWeek),
            ("today 5-y", Resolution::OneWeek),
            ("all", Resolution::OneMonth),
        ];
        for (tf, expected) in cases {
            let iv = TimeInterval::parse_at(tf, clock()).unwrap();
            assert_eq!(iv.resolution(), expected, "timeframe {tf:?}");
        }
    }

    #[test]
    fn test_canonical_roundtrip() {
        for tf in ["2024-09-12T23 5-H", "2024-09-12 1-m", "2024-01-01 2024-12-31", "today 10-d"] {
            let iv = TimeInterval::parse_at(tf, clock()).unwrap();
            let again = TimeInterval::parse_at(&iv.canonical(), clock()).unwrap();
            assert_eq!(again.start(), iv.start(), "timeframe {tf:?}");
            assert_eq!(again.end(), iv.end(), "timeframe {tf:?}");
            assert_eq!(again.resolution(), iv.resolution(), "timeframe {tf:?}");
        }
    }
}
