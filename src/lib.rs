//! trendwind - Search-interest data client
//!
//! A client for fetching and decoding search-interest data: interest over
//! time, interest by region, related queries and topics, batch showcase
//! timelines and trending keywords.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`timeframe`] - Timeframe parsing, normalization and resolution tiers
//! - [`plan`] - Request validation and upstream call construction
//! - [`client`] - HTTP client with rate limiting and the widget token dance
//! - [`decode`] - Payload decoding for every response shape
//! - [`align`] - Alignment of decoded series into tabular records
//! - [`models`] - Core data structures and types
//! - [`config`] - Configuration management and settings
//!
//! # Example
//!
//! ```no_run
//! use trendwind::client::{ExploreOptions, Trends};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Trends::new()?;
//!     let result = client
//!         .interest_over_time(&["rust"], &["today 3-m"], &["US"], &ExploreOptions::default())
//!         .await?;
//!     println!("{result:?}");
//!     Ok(())
//! }
//! ```

pub mod align;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod plan;
pub mod timeframe;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::align::{MultirangeTable, RegionTable, TimeTable};
    pub use crate::client::{ExploreOptions, InterestOverTime, Trends};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{
        BatchWindow, GeoResolution, KeywordSeries, RelatedGroup, TrendingKeyword,
    };
    pub use crate::timeframe::{Resolution, TimeInterval};
}

// Direct re-exports for convenience
pub use models::{
    BatchWindow, GeoResolution, KeywordSeries, RegionSeries, RelatedGroup, RelatedItem,
    TrendingKeyword,
};
pub use timeframe::TimeInterval;
