//! ewx-testkit
//!
//! Deterministic fixtures for event-window scenarios: an in-memory provider,
//! synthetic bar builders and config helpers. No network, no wall clock.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use ewx_calendar::TradingCalendarRule;
use ewx_config::{load_layered_yaml_from_strings, AnalysisConfig, LoadedConfig, DEFAULT_YAML};
use ewx_md::{FetchBarsRequest, HistoricalProvider, ProviderError, RawBar};

// ---------------------------------------------------------------------------
// FixtureProvider
// ---------------------------------------------------------------------------

/// Serves a fixed set of bars, filtered to the requested range.
pub struct FixtureProvider {
    bars: Vec<RawBar>,
    failure: Option<ProviderError>,
    calls: AtomicUsize,
}

impl FixtureProvider {
    pub fn new(bars: Vec<RawBar>) -> Self {
        Self {
            bars,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with no bars.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Always answers with `err`.
    pub fn failing(err: ProviderError) -> Self {
        Self {
            bars: Vec::new(),
            failure: Some(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HistoricalProvider for FixtureProvider {
    fn source_name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_bars(&self, req: &FetchBarsRequest) -> Result<Vec<RawBar>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| b.ts >= req.start && b.ts <= req.end)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Bar builders
// ---------------------------------------------------------------------------

/// Local wall time in `tz`. Panics on a nonexistent time; fixtures only.
pub fn local(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    tz.with_ymd_and_hms(y, m, d, h, min, 0)
        .earliest()
        .unwrap_or_else(|| panic!("nonexistent local time {y}-{m}-{d} {h}:{min} in {tz}"))
}

/// Bars every `step` over `[from, to]`. `px(i, ts)` gives `(open, close)`;
/// high/low straddle them by 0.5.
pub fn bars_between<F>(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    step: Duration,
    mut px: F,
) -> Vec<RawBar>
where
    F: FnMut(usize, DateTime<Utc>) -> (f64, f64),
{
    let mut out = Vec::new();
    let mut ts = from;
    let mut i = 0;
    while ts <= to {
        let (open, close) = px(i, ts);
        out.push(RawBar {
            ts,
            open,
            high: open.max(close) + 0.5,
            low: open.min(close) - 0.5,
            close,
            volume: 100 + i as u64,
        });
        ts += step;
        i += 1;
    }
    out
}

/// Drop bars that start while `rule` is closed (weekends, daily break).
pub fn tradable_only(bars: Vec<RawBar>, rule: &TradingCalendarRule) -> Vec<RawBar> {
    bars.into_iter().filter(|b| rule.is_tradable(&b.ts)).collect()
}

/// 5-minute gold-like bars over `[from, to]` that drift up 0.1 per bar and
/// gap up by `jump` at `event`: the last pre-event close is `base + 0.1 * n`
/// and the first post-event open is that value plus `jump`.
pub fn release_bars(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    event: DateTime<Utc>,
    base: f64,
    jump: f64,
) -> Vec<RawBar> {
    bars_between(from, to, Duration::minutes(5), |i, ts| {
        let drift = base + 0.1 * i as f64;
        if ts < event {
            (drift, drift + 0.1)
        } else {
            (drift + jump, drift + jump + 0.1)
        }
    })
}

// ---------------------------------------------------------------------------
// Files + config
// ---------------------------------------------------------------------------

/// `ts,open,high,low,close,volume` with RFC 3339 timestamps.
pub fn write_bars_csv(path: &Path, bars: &[RawBar]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create bars csv: {}", path.display()))?;
    w.write_record(["ts", "open", "high", "low", "close", "volume"])?;
    for b in bars {
        w.write_record([
            b.ts.to_rfc3339(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    w.flush()
        .with_context(|| format!("flush bars csv: {}", path.display()))?;
    Ok(())
}

/// Built-in defaults with chart/summary redirected under `out_dir`, then
/// `overlay` on top.
pub fn load_test_config(out_dir: &Path, overlay: &str) -> Result<(LoadedConfig, AnalysisConfig)> {
    let redirect = format!(
        "chart: {{path: '{}'}}\nartifacts: {{summary_path: '{}'}}\n",
        out_dir.join("chart.svg").display(),
        out_dir.join("summary.json").display()
    );
    let loaded = load_layered_yaml_from_strings(&[DEFAULT_YAML, redirect.as_str(), overlay])?;
    let cfg = loaded.analysis()?;
    Ok((loaded, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn fixture_filters_to_request_range() {
        let p = FixtureProvider::new(bars_between(
            utc(10, 12, 0),
            utc(10, 13, 0),
            Duration::minutes(5),
            |_, _| (1.0, 1.0),
        ));
        let got = p
            .fetch_bars(&FetchBarsRequest {
                symbol: "GC=F".into(),
                interval: ewx_md::Interval::M5,
                start: utc(10, 12, 30),
                end: utc(10, 12, 40),
            })
            .await
            .unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(p.calls(), 1);
    }

    #[test]
    fn release_bars_gap_at_event() {
        let bars = release_bars(utc(10, 16, 20), utc(10, 16, 40), utc(10, 16, 30), 100.0, 1.5);
        // i=1 is the last pre-event bar, i=2 the first post-event bar.
        assert!((bars[1].close - 100.2).abs() < 1e-9);
        assert!((bars[2].open - 101.7).abs() < 1e-9);
    }

    #[test]
    fn tradable_only_drops_daily_break() {
        // 2025-06-10 20:55Z..22:05Z = 16:55..18:05 EDT.
        let bars = bars_between(utc(10, 20, 55), utc(10, 22, 5), Duration::minutes(5), |_, _| {
            (1.0, 1.0)
        });
        let kept = tradable_only(bars, &TradingCalendarRule::comex_metals());
        let labels: Vec<String> = kept
            .iter()
            .map(|b| b.ts.with_timezone(&New_York).format("%H:%M").to_string())
            .collect();
        assert_eq!(labels, vec!["16:55", "18:00", "18:05"]);
    }

    #[test]
    fn test_config_redirects_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let (_, cfg) = load_test_config(dir.path(), "{}").unwrap();
        assert_eq!(cfg.chart.path, dir.path().join("chart.svg"));
        assert_eq!(
            cfg.artifacts.summary_path.as_deref(),
            Some(dir.path().join("summary.json").as_path())
        );
    }
}
