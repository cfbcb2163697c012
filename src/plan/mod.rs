//! Request plan validation
//!
//! The upstream service only accepts comparable multi-series requests when
//! every timeframe resolves to the same data resolution and the longest span
//! is at most twice the shortest one; outside those bounds the service's
//! cross-series normalization is meaningless. [`validate`] enforces both
//! rules and pairs timeframes with geo codes before anything is sent.

pub mod build;

use crate::timeframe::{Resolution, TimeInterval};
use thiserror::Error;

pub use build::{BatchRequest, ExploreRequest, MAX_BATCH_KEYWORDS};

/// Errors produced while validating or building a request plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Timeframes resolve to different data resolutions
    #[error("Inconsistent resolution: {first:?} resolves to {first_resolution} but {second:?} resolves to {second_resolution}")]
    InconsistentResolution {
        first: String,
        first_resolution: Resolution,
        second: String,
        second_resolution: Resolution,
    },

    /// Longest span more than twice the shortest
    #[error("Span ratio exceeded: {longest:?} covers more than twice the span of {shortest:?}")]
    SpanRatioExceeded { longest: String, shortest: String },

    /// Timeframe and geo lists cannot be paired
    #[error("Shape mismatch: cannot pair {intervals} timeframe(s) with {geos} geo code(s)")]
    ShapeMismatch { intervals: usize, geos: usize },

    /// Input sizes cannot be broadcast against each other
    #[error("Shape mismatch: unable to combine inputs of lengths {0:?}")]
    AmbiguousBroadcast(Vec<usize>),

    /// A geo or category code that looks like unresolved free text
    #[error("Unresolved code: {0:?} does not look like a resolved geo/category code; resolve it through a lookup first")]
    UnresolvedCode(String),

    /// More keywords than one batch call supports
    #[error("Batch size exceeded: {0} keywords requested, the batch endpoint accepts at most {MAX_BATCH_KEYWORDS}")]
    BatchSizeExceeded(usize),
}

/// How a validated plan will be issued upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// One timeframe, one geo: a plain explore request
    SingleRange,
    /// Several (timeframe, geo) branches compared in one explore request
    Multirange,
    /// Many keywords fetched through the batch endpoint, each self-normalized
    BatchShowcase,
}

/// A validated set of request parameters
///
/// Invariant: `intervals` and `geos` have equal, non-zero length; in
/// multirange mode every interval shares the same resolution.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    intervals: Vec<TimeInterval>,
    geos: Vec<String>,
    category: Option<String>,
    mode: PlanMode,
}

impl RequestPlan {
    /// Validated timeframe branches
    #[must_use]
    pub fn intervals(&self) -> &[TimeInterval] {
        &self.intervals
    }

    /// Geo codes, broadcast to match the intervals
    #[must_use]
    pub fn geos(&self) -> &[String] {
        &self.geos
    }

    /// Optional category code
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Attach a category code to the plan
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn mode(&self) -> PlanMode {
        self.mode
    }
}

/// Validate timeframes and geo codes into a request plan
///
/// A single geo broadcasts across all intervals; otherwise the lists must
/// have equal lengths. An empty geo list means worldwide.
///
/// # Errors
///
/// - [`PlanError::InconsistentResolution`] when intervals resolve to
///   different data resolutions;
/// - [`PlanError::SpanRatioExceeded`] when the longest span is more than
///   twice the shortest (exactly twice is accepted);
/// - [`PlanError::ShapeMismatch`] when the lists cannot be paired.
pub fn validate(
    intervals: Vec<TimeInterval>,
    geos: Vec<String>,
) -> Result<RequestPlan, PlanError> {
    if intervals.is_empty() {
        return Err(PlanError::ShapeMismatch {
            intervals: 0,
            geos: geos.len(),
        });
    }

    let geos = if geos.is_empty() {
        vec![String::new()]
    } else {
        geos
    };

    if intervals.len() == 1 && geos.len() == 1 {
        return Ok(RequestPlan {
            intervals,
            geos,
            category: None,
            mode: PlanMode::SingleRange,
        });
    }

    check_consistent_resolution(&intervals)?;
    check_span_ratio(&intervals)?;

    let geos = if geos.len() == 1 {
        vec![geos[0].clone(); intervals.len()]
    } else if geos.len() == intervals.len() {
        geos
    } else {
        return Err(PlanError::ShapeMismatch {
            intervals: intervals.len(),
            geos: geos.len(),
        });
    };

    Ok(RequestPlan {
        intervals,
        geos,
        category: None,
        mode: PlanMode::Multirange,
    })
}

/// All intervals must fall into the same resolution tier
fn check_consistent_resolution(intervals: &[TimeInterval]) -> Result<(), PlanError> {
    let first = &intervals[0];
    for other in &intervals[1..] {
        if other.resolution() != first.resolution() {
            return Err(PlanError::InconsistentResolution {
                first: first.raw().to_string(),
                first_resolution: first.resolution(),
                second: other.raw().to_string(),
                second_resolution: other.resolution(),
            });
        }
    }
    Ok(())
}

/// The longest span may be at most twice the shortest, boundary inclusive
fn check_span_ratio(intervals: &[TimeInterval]) -> Result<(), PlanError> {
    let shortest = intervals
        .iter()
        .min_by_key(|iv| iv.span())
        .expect("intervals is non-empty");
    let longest = intervals
        .iter()
        .max_by_key(|iv| iv.span())
        .expect("intervals is non-empty");

    if longest.span().num_seconds() > 2 * shortest.span().num_seconds() {
        return Err(PlanError::SpanRatioExceeded {
            longest: longest.raw().to_string(),
            shortest: shortest.raw().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn iv(s: &str) -> TimeInterval {
        let now = Utc.with_ymd_and_hms(2024, 9, 13, 22, 0, 0).unwrap();
        TimeInterval::parse_at(s, now).unwrap()
    }

    #[test]
    fn test_single_interval_single_geo() {
        let plan = validate(vec![iv("today 3-m")], vec!["US".into()]).unwrap();
        assert_eq!(plan.mode(), PlanMode::SingleRange);
        assert_eq!(plan.geos(), ["US"]);
    }

    #[test]
    fn test_single_interval_no_geo_is_worldwide() {
        let plan = validate(vec![iv("today 3-m")], vec![]).unwrap();
        assert_eq!(plan.geos(), [""]);
    }

    #[test]
    fn test_inconsistent_resolution_rejected() {
        let err = validate(vec![iv("now 4-H"), iv("today 3-m")], vec!["US".into()]).unwrap_err();
        match err {
            PlanError::InconsistentResolution { first, second, .. } => {
                assert_eq!(first, "now 4-H");
                assert_eq!(second, "today 3-m");
            }
            other => panic!("expected InconsistentResolution, got {other:?}"),
        }
    }

    #[test]
    fn test_span_ratio_exceeded() {
        let err = validate(
            vec![iv("2024-01-01 10-d"), iv("2024-01-01 25-d")],
            vec!["US".into()],
        )
        .unwrap_err();
        match err {
            PlanError::SpanRatioExceeded { longest, shortest } => {
                assert_eq!(longest, "2024-01-01 25-d");
                assert_eq!(shortest, "2024-01-01 10-d");
            }
            other => panic!("expected SpanRatioExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_span_ratio_boundary_is_inclusive() {
        // Exactly 2.0x passes.
        let plan = validate(
            vec![iv("2024-01-01 10-d"), iv("2024-01-01 20-d")],
            vec!["US".into()],
        )
        .unwrap();
        assert_eq!(plan.mode(), PlanMode::Multirange);
    }

    #[test]
    fn test_geo_broadcast() {
        let plan = validate(
            vec![iv("2024-01-25 12-d"), iv("2024-06-20 23-d")],
            vec!["US".into()],
        )
        .unwrap();
        assert_eq!(plan.geos(), ["US", "US"]);
        assert_eq!(plan.mode(), PlanMode::Multirange);
    }

    #[test]
    fn test_two_branch_multirange_plan() {
        // 23/12 is under the 2x ratio, so two branches with distinct geos pass.
        let plan = validate(
            vec![iv("2024-01-25 12-d"), iv("2024-06-20 23-d")],
            vec!["US".into(), "GB".into()],
        )
        .unwrap();
        assert_eq!(plan.mode(), PlanMode::Multirange);
        assert_eq!(plan.geos(), ["US", "GB"]);
        assert_eq!(plan.intervals().len(), 2);
    }

    #[test]
    fn test_empty_intervals_rejected() {
        let err = validate(vec![], vec!["US".into()]).unwrap_err();
        assert!(matches!(err, PlanError::ShapeMismatch { intervals: 0, geos: 1 }));

        let err = validate(vec![], vec![]).unwrap_err();
        assert!(matches!(err, PlanError::ShapeMismatch { intervals: 0, geos: 0 }));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = validate(
            vec![iv("2024-01-25 12-d"), iv("2024-06-20 23-d")],
            vec!["US".into(), "GB".into(), "DE".into()],
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::ShapeMismatch { intervals: 2, geos: 3 }));
    }

    #[test]
    fn test_category_attachment() {
        let plan = validate(vec![iv("today 3-m")], vec![])
            .unwrap()
            .with_category("13");
        assert_eq!(plan.category(), Some("13"));
    }
}
