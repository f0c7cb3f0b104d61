//! ewx-md
//!
//! Market-data boundary for event-window analysis.
//!
//! This crate owns the bar and series types, the provider abstraction and the
//! concrete historical providers (Yahoo chart endpoint, offline CSV).
//! It does **not** know about events, trading calendars or charts; callers
//! hand the fetched [`PriceSeries`] to `ewx-window`.

pub mod ingest_csv;
pub mod provider;
pub mod quality;
pub mod series;
pub mod yahoo;

pub use ingest_csv::CsvFileProvider;
pub use provider::{ProviderError, RawBar};
pub use series::{Bar, PriceSeries, SeriesError};
pub use yahoo::YahooChartProvider;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Supported sampling intervals.
///
/// Canonical user-facing values: `1m`, `5m`, `15m`, `30m`, `1h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
        }
    }

    /// Yahoo chart `interval` query value.
    pub fn as_yahoo_interval(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "60m",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Interval::M1 => Duration::minutes(1),
            Interval::M5 => Duration::minutes(5),
            Interval::M15 => Duration::minutes(15),
            Interval::M30 => Duration::minutes(30),
            Interval::H1 => Duration::hours(1),
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1min" => Ok(Interval::M1),
            "5m" | "5min" => Ok(Interval::M5),
            "15m" | "15min" => Ok(Interval::M15),
            "30m" | "30min" => Ok(Interval::M30),
            "1h" | "60m" | "60min" => Ok(Interval::H1),
            other => Err(anyhow!(
                "invalid interval '{}'. expected one of: 1m | 5m | 15m | 30m | 1h",
                other
            )),
        }
    }
}

/// Fetch request for a provider.
///
/// `start` and `end` are inclusive instants; providers that only accept
/// coarser bounds must over-fetch and let the caller filter.
#[derive(Debug, Clone)]
pub struct FetchBarsRequest {
    pub symbol: String,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Pluggable historical provider interface.
///
/// Implementations return bars in UTC in whatever order the upstream supplies
/// them; [`PriceSeries::from_raw`] sorts, de-duplicates and localises.
/// An empty `Vec` means "no data for this request" and is not an error here.
#[async_trait::async_trait]
pub trait HistoricalProvider: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_bars(&self, req: &FetchBarsRequest) -> Result<Vec<RawBar>, ProviderError>;
}
