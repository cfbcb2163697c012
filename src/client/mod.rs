//! High-level search-interest client
//!
//! This module ties the pipeline together: timeframes are parsed and
//! validated into a request plan, the plan becomes an explore call, the
//! explore embed page hands back a widget token, and the widget data
//! endpoint returns the payload that the decoders turn into aligned tables.
//!
//! Batch endpoints (showcase timelines, trending now) skip the token dance
//! and post an RPC envelope directly.

pub mod fetcher;

use crate::align::{self, MultirangeTable, RegionTable, TimeTable};
use crate::config::Config;
use crate::decode::{self, DecodeError, Decoded, PayloadShape};
use crate::error::{Error, Result};
use crate::models::{BatchWindow, GeoResolution, RelatedGroup, TrendingKeyword};
use crate::plan::{self, build, PlanMode};
use crate::timeframe::TimeInterval;
use chrono::Utc;
use fetcher::Fetcher;
use serde_json::{json, Value};
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://trends.google.com";

const EMBED_TIMESERIES_PATH: &str = "/trends/embed/explore/TIMESERIES";
const EMBED_GEO_MAP_PATH: &str = "/trends/embed/explore/GEO_MAP";
const EMBED_RELATED_QUERIES_PATH: &str = "/trends/embed/explore/RELATED_QUERIES";
const EMBED_RELATED_TOPICS_PATH: &str = "/trends/embed/explore/RELATED_TOPICS";
const WIDGET_MULTILINE_PATH: &str = "/trends/api/widgetdata/multiline";
const WIDGET_MULTIRANGE_PATH: &str = "/trends/api/widgetdata/multirange";
const WIDGET_COMPAREDGEO_PATH: &str = "/trends/api/widgetdata/comparedgeo";
const WIDGET_RELATEDSEARCHES_PATH: &str = "/trends/api/widgetdata/relatedsearches";
const BATCH_EXECUTE_PATH: &str = "/_/TrendsUi/data/batchexecute";

/// Widget type tag announcing a multirange payload
const MULTIRANGE_WIDGET_TYPE: &str = "fe_multi_range_chart";

/// Optional explore-request settings
#[derive(Debug, Clone, Default)]
pub struct ExploreOptions {
    /// Numeric category code; `None` means all categories
    pub category: Option<String>,

    /// Search property ("" for web, "news", "images", "youtube", "froogle")
    pub property: String,
}

/// An interest-over-time result
///
/// Single-range requests align into one timestamp-keyed table; multirange
/// requests keep one column per branch because the branches cover different
/// wall-clock windows.
#[derive(Debug, Clone, PartialEq)]
pub enum InterestOverTime {
    Single(TimeTable),
    Multirange(MultirangeTable),
}

/// Search-interest client
///
/// # Examples
///
/// ```rust,ignore
/// use trendwind::client::{ExploreOptions, Trends};
///
/// let client = Trends::new()?;
/// let result = client
///     .interest_over_time(&["rust"], &["today 3-m"], &["US"], &ExploreOptions::default())
///     .await?;
/// ```
pub struct Trends {
    fetcher: Fetcher,
    config: Config,
    base_url: String,
}

impl Trends {
    /// Create a client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a client from a configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings and `Error::Fetch` if
    /// the HTTP client cannot be created.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().map_err(Error::from)?;

        let rps = config.transport.rate_limit.ceil().max(1.0) as u32;
        let mut fetcher = Fetcher::with_config(
            rps,
            config.transport.max_retries,
            config.request_timeout(),
            config.transport.enable_cookies,
        )?;
        fetcher.set_language(&config.request.language);
        if let Some(agent) = &config.transport.user_agent {
            fetcher.set_user_agent(agent.clone());
        }

        Ok(Self {
            fetcher,
            config,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Create a client pointed at a custom base URL for testing
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Trends::with_config`].
    pub fn with_base_url(base_url: &str, config: Config) -> Result<Self> {
        url::Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid base url {base_url:?}: {e}")))?;
        let mut client = Self::with_config(config)?;
        client.base_url = base_url.trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Fetch interest-over-time series for up to five keywords
    ///
    /// Timeframes are parsed and normalized first; multiple timeframes form
    /// a multirange comparison and must share a resolution tier and stay
    /// within a 2x span ratio.
    ///
    /// # Arguments
    ///
    /// * `keywords` - Search terms to compare
    /// * `timeframes` - Timeframe expressions (e.g. `"today 3-m"`)
    /// * `geos` - Geo codes; empty means worldwide
    ///
    /// # Errors
    ///
    /// `Error::Timeframe` and `Error::Plan` for invalid input,
    /// `Error::Fetch` for transport failures, `Error::Decode` for malformed
    /// payloads.
    #[instrument(skip(self, options))]
    pub async fn interest_over_time(
        &self,
        keywords: &[&str],
        timeframes: &[&str],
        geos: &[&str],
        options: &ExploreOptions,
    ) -> Result<InterestOverTime> {
        let intervals = timeframes
            .iter()
            .map(|tf| TimeInterval::parse(tf))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let geos: Vec<String> = geos.iter().map(|g| g.to_string()).collect();
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();

        let mut request_plan = plan::validate(intervals, geos)?;
        if let Some(category) = &options.category {
            request_plan = request_plan.with_category(category.clone());
        }
        let call = build::explore(&request_plan, &keywords, &options.property)?;

        let widget = self.embed_widget(EMBED_TIMESERIES_PATH, &call).await?;
        let token = widget_token(&widget)?;
        let request = widget_request(&widget)?;

        let multirange = widget_is_multirange(&widget, request_plan.mode());
        let path = if multirange {
            WIDGET_MULTIRANGE_PATH
        } else {
            WIDGET_MULTILINE_PATH
        };
        let payload = self.widget_data(path, &request, token).await?;

        if multirange {
            let canonical: Vec<String> = request_plan
                .intervals()
                .iter()
                .map(TimeInterval::canonical)
                .collect();
            let items = build::broadcast_items(&keywords, &canonical, request_plan.geos())?;
            let (kws, tfs, branch_geos) = unzip_items(items);
            let labels = align::branch_labels(&kws, &branch_geos, &tfs);

            let series = decode::timeline::multirange(&payload, &labels)?;
            Ok(InterestOverTime::Multirange(align::align_multirange(
                series,
            )))
        } else {
            let series = decode::timeline::interest_over_time(&payload, &keywords)?;
            Ok(InterestOverTime::Single(align::align_time(&series)))
        }
    }

    /// Fetch interest-by-region values for up to five keywords
    ///
    /// # Arguments
    ///
    /// * `keywords` - Search terms to compare
    /// * `timeframe` - One timeframe expression
    /// * `geo` - Geo code scoping the map; empty means worldwide
    /// * `resolution` - Granularity of the returned regions
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Trends::interest_over_time`].
    #[instrument(skip(self))]
    pub async fn interest_by_region(
        &self,
        keywords: &[&str],
        timeframe: &str,
        geo: &str,
        resolution: GeoResolution,
    ) -> Result<RegionTable> {
        let interval = TimeInterval::parse(timeframe)?;
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();

        let request_plan = plan::validate(vec![interval], vec![geo.to_string()])?;
        let call = build::explore(&request_plan, &keywords, "")?;

        let widget = self.embed_widget(EMBED_GEO_MAP_PATH, &call).await?;
        let token = widget_token(&widget)?;
        let mut request = widget_request(&widget)?;
        request["resolution"] = json!(resolution.as_str());

        let payload = self.widget_data(WIDGET_COMPAREDGEO_PATH, &request, token).await?;
        let series = decode::region::interest_by_region(&payload, &keywords)?;
        Ok(align::align_region(&series))
    }

    /// Fetch the top and rising queries searched alongside a keyword
    ///
    /// Top entries are scaled 0-100; rising entries carry a growth
    /// percentage, with extreme growth formatted as "Breakout" upstream.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Trends::interest_over_time`];
    /// `Error::Decode` with an empty-result condition for keywords the
    /// upstream has no related data for.
    #[instrument(skip(self, options))]
    pub async fn related_queries(
        &self,
        keyword: &str,
        timeframe: &str,
        geo: &str,
        options: &ExploreOptions,
    ) -> Result<RelatedGroup> {
        self.related(EMBED_RELATED_QUERIES_PATH, keyword, timeframe, geo, options)
            .await
    }

    /// Fetch the top and rising topics searched alongside a keyword
    ///
    /// Entries are knowledge-graph topics; each carries its opaque id and
    /// kind next to the display title.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Trends::related_queries`].
    #[instrument(skip(self, options))]
    pub async fn related_topics(
        &self,
        keyword: &str,
        timeframe: &str,
        geo: &str,
        options: &ExploreOptions,
    ) -> Result<RelatedGroup> {
        self.related(EMBED_RELATED_TOPICS_PATH, keyword, timeframe, geo, options)
            .await
    }

    /// Shared token dance for the two related-searches variants
    async fn related(
        &self,
        embed_path: &str,
        keyword: &str,
        timeframe: &str,
        geo: &str,
        options: &ExploreOptions,
    ) -> Result<RelatedGroup> {
        let interval = TimeInterval::parse(timeframe)?;
        let mut request_plan = plan::validate(vec![interval], vec![geo.to_string()])?;
        if let Some(category) = &options.category {
            request_plan = request_plan.with_category(category.clone());
        }
        let call = build::explore(&request_plan, &[keyword.to_string()], &options.property)?;

        let widget = self.embed_widget(embed_path, &call).await?;
        let token = widget_token(&widget)?;
        let request = widget_request(&widget)?;

        let payload = self
            .widget_data(WIDGET_RELATEDSEARCHES_PATH, &request, token)
            .await?;
        Ok(decode::related::ranked_lists(&payload)?)
    }

    /// Fetch independent showcase timelines for up to 500 keywords
    ///
    /// Every returned column is normalized against its own peak; values are
    /// not comparable across columns.
    ///
    /// # Errors
    ///
    /// `Error::Plan` when the batch limit is exceeded, otherwise the usual
    /// transport and decode failures.
    #[instrument(skip(self, keywords), fields(keywords = keywords.len()))]
    pub async fn showcase_timeline(
        &self,
        keywords: &[&str],
        geo: &str,
        window: BatchWindow,
    ) -> Result<TimeTable> {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        let call = build::showcase(&keywords, geo, window)?;

        let anchor = Utc::now();
        let body = self.batch_execute(&call).await?;
        match decode::decode(&body, PayloadShape::Batch { window, anchor }, &[])? {
            Decoded::Batch(series) => Ok(align::align_time(&series)),
            _ => Err(DecodeError::Envelope("batch payload".into()).into()),
        }
    }

    /// Fetch currently trending keywords for a geo
    ///
    /// # Arguments
    ///
    /// * `geo` - Country-level geo code
    /// * `hours` - Lookback window in hours (upstream accepts 4 to 191)
    ///
    /// # Errors
    ///
    /// The usual transport and decode failures.
    #[instrument(skip(self))]
    pub async fn trending_now(&self, geo: &str, hours: u32) -> Result<Vec<TrendingKeyword>> {
        let language = self
            .config
            .request
            .language
            .split('-')
            .next()
            .unwrap_or("en");
        let call = build::trending_now(geo, language, hours, 0)?;

        let body = self.batch_execute(&call).await?;
        let inner = decode::batch_rpc_payload(&body)?;
        let entries = inner
            .get(1)
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::Envelope("trending entry list".into()))?;
        Ok(decode::batch::trending_now(entries)?)
    }

    /// GET an embed page and pull out its widget document
    async fn embed_widget(
        &self,
        path: &str,
        call: &build::ExploreRequest,
    ) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let params = [
            ("hl", self.config.request.language.clone()),
            ("tz", self.config.request.tz_offset_minutes.to_string()),
            ("req", call.req_param()),
        ];
        let page = self.fetcher.get(&url, &params).await?;
        debug!(path, bytes = page.len(), "fetched embed page");
        Ok(decode::extract_embedded_json(&page)?)
    }

    /// GET a widget data endpoint with the token from the embed page
    async fn widget_data(&self, path: &str, request: &Value, token: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let params = [
            ("hl", self.config.request.language.clone()),
            ("tz", self.config.request.tz_offset_minutes.to_string()),
            ("req", request.to_string()),
            ("token", token.to_string()),
        ];
        let body = self.fetcher.get(&url, &params).await?;
        Ok(decode::parse_guarded_json(&body)?)
    }

    /// POST an RPC envelope to the batch endpoint
    async fn batch_execute(&self, call: &build::BatchRequest) -> Result<String> {
        let url = format!("{}{BATCH_EXECUTE_PATH}", self.base_url);
        let params = [
            ("rpcids", call.rpc_id.to_string()),
            ("hl", self.config.request.language.clone()),
        ];
        Ok(self.fetcher.post_form(&url, &params, call.form_body()).await?)
    }
}

/// The widget token the data endpoints require
fn widget_token(widget: &Value) -> Result<&str> {
    widget
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingToken.into())
}

/// The request document to forward to the data endpoint
fn widget_request(widget: &Value) -> Result<Value> {
    widget
        .get("request")
        .cloned()
        .ok_or_else(|| DecodeError::Envelope("widget.request".into()).into())
}

/// Whether the widget announces a multirange payload
///
/// The embed page tags multirange widgets with a dedicated chart type;
/// the plan mode decides when the tag is absent.
fn widget_is_multirange(widget: &Value, mode: PlanMode) -> bool {
    match widget.get("type").and_then(Value::as_str) {
        Some(tag) => tag == MULTIRANGE_WIDGET_TYPE,
        None => mode == PlanMode::Multirange,
    }
}

/// Split comparison items back into parallel label columns
fn unzip_items(items: Vec<(String, String, String)>) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut kws = Vec::with_capacity(items.len());
    let mut tfs = Vec::with_capacity(items.len());
    let mut geos = Vec::with_capacity(items.len());
    for (kw, tf, geo) in items {
        kws.push(kw);
        tfs.push(tf);
        geos.push(geo);
    }
    (kws, tfs, geos)
}
