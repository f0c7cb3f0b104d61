//! Yahoo Finance chart-endpoint provider.
//!
//! Speaks `GET {base_url}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=..`
//! and decodes the `chart.result[0]` arrays into [`RawBar`] values.
//! Rows where any OHLC value is `null` are skipped (the endpoint emits them for
//! halted intervals). A "Not Found" API error is reported as an empty result,
//! which callers treat as "no data for this request".

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ProviderError, RawBar};
use crate::{FetchBarsRequest, HistoricalProvider};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; ewx/0.0.1)";

#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::new_with_base_url(DEFAULT_BASE_URL.to_string(), timeout)
    }

    pub fn new_with_base_url(base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        if base_url.trim().is_empty() {
            return Err(ProviderError::Config("yahoo base_url is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Config(format!("http client build failed: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn build_chart_url(&self, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        )
    }
}

#[async_trait::async_trait]
impl HistoricalProvider for YahooChartProvider {
    fn source_name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_bars(&self, req: &FetchBarsRequest) -> Result<Vec<RawBar>, ProviderError> {
        let url = self.build_chart_url(&req.symbol);
        let period1 = req.start.timestamp().to_string();
        // period2 is exclusive upstream; nudge it so `end` itself is included.
        let period2 = (req.end.timestamp() + 1).to_string();

        debug!(symbol = %req.symbol, %url, period1 = %period1, period2 = %period2, "yahoo chart request");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", req.interval.as_yahoo_interval()),
                ("includePrePost", "true"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("yahoo request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("yahoo response read failed: {e}")))?;

        match parse_chart_response(&body) {
            Ok(bars) if status.is_success() => Ok(bars),
            // A 404 with a decodable "Not Found" body has already been mapped to empty.
            Ok(bars) if bars.is_empty() => {
                warn!(symbol = %req.symbol, status = status.as_u16(), "yahoo returned no data");
                Ok(bars)
            }
            Ok(_) => Err(ProviderError::Api {
                code: Some(status.as_u16().to_string()),
                message: "unexpected http status with chart payload".to_string(),
            }),
            Err(e) if !status.is_success() => Err(ProviderError::Api {
                code: Some(status.as_u16().to_string()),
                message: format!("yahoo http error: {e}"),
            }),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Decode a chart endpoint body into raw bars.
pub fn parse_chart_response(body: &str) -> Result<Vec<RawBar>, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("yahoo chart json: {e}")))?;

    if let Some(err) = envelope.chart.error {
        if err.code.as_deref() == Some("Not Found") {
            return Ok(Vec::new());
        }
        return Err(ProviderError::Api {
            code: err.code,
            message: err.description.unwrap_or_else(|| "unknown".to_string()),
        });
    }

    let result = match envelope.chart.result.and_then(|r| r.into_iter().next()) {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };

    // Market closed for the whole range: result present, no timestamps.
    let timestamps = match result.timestamp {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };
    let quote = match result.indicators.quote.into_iter().next() {
        Some(q) => q,
        None => return Ok(Vec::new()),
    };

    let mut out = Vec::with_capacity(timestamps.len());
    for (i, &secs) in timestamps.iter().enumerate() {
        let ts = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| ProviderError::Decode(format!("yahoo timestamp out of range: {secs}")))?;

        let (Some(open), Some(high), Some(low), Some(close)) = (
            cell(&quote.open, i),
            cell(&quote.high, i),
            cell(&quote.low, i),
            cell(&quote.close, i),
        ) else {
            continue;
        };

        let volume = cell(&quote.volume, i)
            .filter(|v| *v >= 0.0)
            .map(|v| v as u64)
            .unwrap_or(0);

        out.push(RawBar {
            ts,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(out)
}

fn cell(col: &[Option<f64>], i: usize) -> Option<f64> {
    col.get(i).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// -----------------
// Tests (no network)
// -----------------
