//! Upstream call construction
//!
//! Turns a validated [`RequestPlan`](super::RequestPlan) plus keywords into
//! the parameter payloads the upstream endpoints expect: the explore `req`
//! JSON for single/multirange requests and the `f.req` envelope for
//! batch-showcase requests. Geo and category codes are forwarded as-is;
//! resolving free text into codes is a lookup concern outside this crate.

use crate::models::BatchWindow;
use crate::plan::{PlanError, RequestPlan};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Hard upstream limit on keywords per batch call
pub const MAX_BATCH_KEYWORDS: usize = 500;

/// RPC id of the showcase timeline batch endpoint
pub const SHOWCASE_RPC_ID: &str = "jpdkv";

/// RPC id of the trending-now batch endpoint
pub const TRENDING_NOW_RPC_ID: &str = "i0OFE";

fn geo_code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Worldwide (empty), country ("US") or subdivision ("US-NY", "GB-ENG")
    RE.get_or_init(|| Regex::new(r"^$|^[A-Z]{2}(-[A-Z0-9]{1,4})?$").unwrap())
}

/// An explore-endpoint call specification
///
/// `req` is the JSON document the upstream expects in its `req` query
/// parameter; the transport layer adds language/timezone on top.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreRequest {
    pub req: Value,
}

impl ExploreRequest {
    /// The `req` parameter serialized for the query string
    #[must_use]
    pub fn req_param(&self) -> String {
        self.req.to_string()
    }
}

/// A batch-endpoint call specification
///
/// The batch transport wraps one RPC id and a JSON argument blob into a
/// form-encoded `f.req` body.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub rpc_id: &'static str,
    pub payload: Value,
}

impl BatchRequest {
    /// Form body for the batch endpoint
    #[must_use]
    pub fn form_body(&self) -> String {
        let inner = json!([[[self.rpc_id, self.payload.to_string(), null, "generic"]]]);
        format!("f.req={inner}")
    }
}

/// Build the explore call for a validated plan
///
/// Keywords, timeframes and geos broadcast against each other: every list
/// length must divide the longest one, and each item cycles to fill it.
///
/// # Errors
///
/// - [`PlanError::AmbiguousBroadcast`] when the input lengths cannot be
///   combined;
/// - [`PlanError::UnresolvedCode`] when a geo or category code looks like
///   free text that was never resolved.
pub fn explore(
    plan: &RequestPlan,
    keywords: &[String],
    property: &str,
) -> Result<ExploreRequest, PlanError> {
    for geo in plan.geos() {
        validate_geo_code(geo)?;
    }
    let category = match plan.category() {
        Some(cat) => {
            if cat.is_empty() || !cat.chars().all(|c| c.is_ascii_digit()) {
                return Err(PlanError::UnresolvedCode(cat.to_string()));
            }
            cat.parse::<u64>().unwrap_or(0)
        }
        None => 0,
    };

    let timeframes: Vec<String> = plan.intervals().iter().map(|iv| iv.canonical()).collect();
    let items = broadcast_items(keywords, &timeframes, plan.geos())?;

    let comparison: Vec<Value> = items
        .into_iter()
        .map(|(keyword, time, geo)| json!({ "keyword": keyword, "time": time, "geo": geo }))
        .collect();

    Ok(ExploreRequest {
        req: json!({
            "comparisonItem": comparison,
            "category": category,
            "property": property,
        }),
    })
}

/// Build the batch-showcase call for a keyword set
///
/// # Errors
///
/// - [`PlanError::BatchSizeExceeded`] when more than
///   [`MAX_BATCH_KEYWORDS`] keywords are supplied;
/// - [`PlanError::UnresolvedCode`] when the geo code looks unresolved.
pub fn showcase(
    keywords: &[String],
    geo: &str,
    window: BatchWindow,
) -> Result<BatchRequest, PlanError> {
    if keywords.len() > MAX_BATCH_KEYWORDS {
        return Err(PlanError::BatchSizeExceeded(keywords.len()));
    }
    validate_geo_code(geo)?;

    let rows: Vec<Value> = keywords
        .iter()
        .map(|kw| json!([geo, kw, window.code(), 0, 3]))
        .collect();

    Ok(BatchRequest {
        rpc_id: SHOWCASE_RPC_ID,
        payload: json!([null, null, rows]),
    })
}

/// Build the trending-now call
///
/// # Errors
///
/// Returns [`PlanError::UnresolvedCode`] when the geo code looks unresolved.
pub fn trending_now(
    geo: &str,
    language: &str,
    hours: u32,
    num_news: u32,
) -> Result<BatchRequest, PlanError> {
    validate_geo_code(geo)?;
    Ok(BatchRequest {
        rpc_id: TRENDING_NOW_RPC_ID,
        payload: json!([null, null, geo, num_news, language, hours, 1]),
    })
}

/// Zip keywords, timeframes and geos into comparison items
///
/// Mirrors the upstream convention: the longest list sets the branch count
/// and shorter lists repeat, as long as their lengths divide evenly.
pub(crate) fn broadcast_items(
    keywords: &[String],
    timeframes: &[String],
    geos: &[String],
) -> Result<Vec<(String, String, String)>, PlanError> {
    let lengths = [keywords.len(), timeframes.len(), geos.len()];
    let max_len = lengths.into_iter().max().unwrap_or(1);
    if lengths.iter().any(|&len| len == 0 || max_len % len != 0) {
        return Err(PlanError::AmbiguousBroadcast(lengths.to_vec()));
    }

    let items = (0..max_len)
        .map(|i| {
            (
                keywords[i % keywords.len()].clone(),
                timeframes[i % timeframes.len()].clone(),
                geos[i % geos.len()].clone(),
            )
        })
        .collect();
    Ok(items)
}

/// Reject geo inputs that look like free-text searches rather than codes
fn validate_geo_code(geo: &str) -> Result<(), PlanError> {
    if geo_code_pattern().is_match(geo) {
        Ok(())
    } else {
        Err(PlanError::UnresolvedCode(geo.to_string()))
    }
}
