use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use ewx_calendar::{parse_time, DailyBreak, TradingCalendarRule, WeekTime, WeeklySession};
use ewx_md::Interval;
use ewx_window::{EventWindow, Instrument};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const MAX_WINDOW_HOURS: u32 = 72;
pub const CHART_PX_RANGE: (u32, u32) = (200, 8000);
pub const TIMEOUT_SECS_RANGE: (u64, u64) = (1, 300);

// ---------------------------------------------------------------------------
// Typed schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    pub instrument: InstrumentConfig,
    pub calendar: CalendarConfig,
    pub event: EventConfig,
    pub window: WindowConfig,
    pub provider: ProviderConfig,
    pub chart: ChartConfig,
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub display_name: String,
    /// IANA name, e.g. `America/New_York`.
    pub timezone: String,
}

/// Tradable-hours rule.
///
/// Not `deny_unknown_fields`: switching `kind` in an overlay leaves the base
/// layer's session keys in the merged document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarConfig {
    AlwaysOn,
    WeeklySession {
        /// e.g. `Sun 18:00`
        open: String,
        /// e.g. `Fri 17:00`
        close: String,
        #[serde(default)]
        daily_break: Option<BreakConfig>,
        #[serde(default)]
        holidays: Vec<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakConfig {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    pub label: String,
    /// Exchange-local wall time (`YYYY-MM-DD HH:MM[:SS]`) or RFC 3339.
    pub local_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    pub lookback_hours: u32,
    pub lookforward_hours: u32,
    pub min_samples: usize,
    pub interval: Interval,
    pub fetch_padding_hours: u32,
    pub require_full_coverage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSource {
    Yahoo,
    Csv,
}

impl ProviderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderSource::Yahoo => "yahoo",
            ProviderSource::Csv => "csv",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(ProviderSource::Yahoo),
            "csv" => Ok(ProviderSource::Csv),
            other => bail!("invalid provider source '{other}'. expected: yahoo | csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub source: ProviderSource,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Required when `source: csv`.
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// JSON run summary; skipped when unset.
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Validation + builders
// ---------------------------------------------------------------------------

impl AnalysisConfig {
    /// Range and parse checks. Every builder below succeeds on a config that
    /// passed `validate`.
    pub fn validate(&self) -> Result<()> {
        if self.instrument.symbol.trim().is_empty() {
            bail!("CONFIG_INVALID instrument.symbol must not be empty");
        }
        self.timezone()?;
        self.calendar_rule()?;
        self.event_instant()?;

        let w = &self.window;
        for (name, v) in [
            ("lookback_hours", w.lookback_hours),
            ("lookforward_hours", w.lookforward_hours),
        ] {
            if v == 0 || v > MAX_WINDOW_HOURS {
                bail!("CONFIG_INVALID window.{name}={v} must be in 1..={MAX_WINDOW_HOURS}");
            }
        }
        if w.min_samples == 0 {
            bail!("CONFIG_INVALID window.min_samples must be >= 1");
        }
        let widest = w.lookback_hours.max(w.lookforward_hours);
        if w.fetch_padding_hours < widest {
            bail!(
                "CONFIG_INVALID window.fetch_padding_hours={} must be >= max(lookback_hours, lookforward_hours)={}",
                w.fetch_padding_hours,
                widest
            );
        }

        let p = &self.provider;
        let (lo, hi) = TIMEOUT_SECS_RANGE;
        if p.timeout_secs < lo || p.timeout_secs > hi {
            bail!(
                "CONFIG_INVALID provider.timeout_secs={} must be in {lo}..={hi}",
                p.timeout_secs
            );
        }
        match p.source {
            ProviderSource::Yahoo if p.base_url.trim().is_empty() => {
                bail!("CONFIG_INVALID provider.base_url must not be empty for source=yahoo")
            }
            ProviderSource::Csv if p.csv_path.is_none() => {
                bail!("CONFIG_INVALID provider.csv_path is required for source=csv")
            }
            _ => {}
        }

        let (lo, hi) = CHART_PX_RANGE;
        for (name, v) in [("width", self.chart.width), ("height", self.chart.height)] {
            if v < lo || v > hi {
                bail!("CONFIG_INVALID chart.{name}={v} must be in {lo}..={hi}");
            }
        }
        if self.chart.path.as_os_str().is_empty() {
            bail!("CONFIG_INVALID chart.path must not be empty");
        }

        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.instrument
            .timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("CONFIG_INVALID unknown timezone '{}'", self.instrument.timezone))
    }

    pub fn calendar_rule(&self) -> Result<TradingCalendarRule> {
        match &self.calendar {
            CalendarConfig::AlwaysOn => Ok(TradingCalendarRule::AlwaysOn),
            CalendarConfig::WeeklySession {
                open,
                close,
                daily_break,
                holidays,
            } => {
                let daily_break = daily_break
                    .as_ref()
                    .map(|b| -> Result<DailyBreak> {
                        Ok(DailyBreak {
                            start: parse_time(&b.start).context("calendar.daily_break.start")?,
                            end: parse_time(&b.end).context("calendar.daily_break.end")?,
                        })
                    })
                    .transpose()?;
                Ok(TradingCalendarRule::WeeklySession(WeeklySession {
                    tz: self.timezone()?,
                    open: WeekTime::parse(open).context("calendar.open")?,
                    close: WeekTime::parse(close).context("calendar.close")?,
                    daily_break,
                    holidays: holidays.clone(),
                }))
            }
        }
    }

    pub fn instrument(&self) -> Result<Instrument> {
        Ok(Instrument {
            symbol: self.instrument.symbol.clone(),
            display_name: self.instrument.display_name.clone(),
            tz: self.timezone()?,
            rule: self.calendar_rule()?,
        })
    }

    /// Event instant in the exchange timezone.
    ///
    /// A wall time repeated by a DST fall-back resolves to the earlier
    /// instant; a wall time skipped by spring-forward is an error.
    pub fn event_instant(&self) -> Result<DateTime<Tz>> {
        parse_event_time(&self.event.local_time, self.timezone()?)
    }

    pub fn event_window(&self) -> Result<EventWindow> {
        Ok(EventWindow::new(
            self.event_instant()?,
            Duration::hours(i64::from(self.window.lookback_hours)),
            Duration::hours(i64::from(self.window.lookforward_hours)),
        ))
    }

    pub fn fetch_padding(&self) -> Duration {
        Duration::hours(i64::from(self.window.fetch_padding_hours))
    }

    pub fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.provider.timeout_secs)
    }
}

pub fn parse_event_time(raw: &str, tz: Tz) -> Result<DateTime<Tz>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&tz));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .with_context(|| {
            format!("CONFIG_INVALID event time '{raw}'. expected 'YYYY-MM-DD HH:MM[:SS]' or RFC 3339")
        })?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("CONFIG_INVALID event time '{raw}' does not exist in {tz}"))
}

// ---------------------------------------------------------------------------
// CLI overrides
// ---------------------------------------------------------------------------

/// Per-run overrides, applied as the last config layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub event: Option<String>,
    pub symbol: Option<String>,
    pub source: Option<ProviderSource>,
    pub interval: Option<Interval>,
    /// Implies `source: csv` unless `source` is given explicitly.
    pub csv: Option<PathBuf>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.event.is_none()
            && self.symbol.is_none()
            && self.source.is_none()
            && self.interval.is_none()
            && self.csv.is_none()
    }

    pub fn to_layer(&self) -> Value {
        let mut root = Map::new();
        if let Some(e) = &self.event {
            root.insert("event".into(), json!({ "local_time": e }));
        }
        if let Some(s) = &self.symbol {
            root.insert("instrument".into(), json!({ "symbol": s }));
        }
        if let Some(i) = &self.interval {
            root.insert("window".into(), json!({ "interval": i.as_str() }));
        }

        let mut provider = Map::new();
        let source = self
            .source
            .or_else(|| self.csv.as_ref().map(|_| ProviderSource::Csv));
        if let Some(src) = source {
            provider.insert("source".into(), json!(src.as_str()));
        }
        if let Some(p) = &self.csv {
            provider.insert("csv_path".into(), json!(p.to_string_lossy()));
        }
        if !provider.is_empty() {
            root.insert("provider".into(), Value::Object(provider));
        }

        Value::Object(root)
    }
}
