use std::fmt;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use ewx_calendar::{ClosedReason, TradingCalendarRule};
use ewx_md::{Bar, ProviderError, SeriesError};
use serde::{Deserialize, Serialize};

/// The traded instrument and its exchange conventions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    /// Provider symbol, e.g. `GC=F`.
    pub symbol: String,
    /// Human name used in chart titles, e.g. `Gold Futures`.
    pub display_name: String,
    /// Exchange timezone; every bar is localised to it.
    pub tz: Tz,
    pub rule: TradingCalendarRule,
}

/// Time range of interest around one event.
///
/// The range is inclusive at both ends: `[event - lookback, event + lookforward]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventWindow {
    pub event: DateTime<Tz>,
    pub lookback: Duration,
    pub lookforward: Duration,
}

impl EventWindow {
    pub fn new(event: DateTime<Tz>, lookback: Duration, lookforward: Duration) -> Self {
        Self {
            event,
            lookback,
            lookforward,
        }
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.event - self.lookback
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.event + self.lookforward
    }

    pub fn contains(&self, ts: &DateTime<Tz>) -> bool {
        *ts >= self.start() && *ts <= self.end()
    }
}

/// Borrowed, contiguous run of bars from a windowed series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<'a> {
    bars: &'a [Bar],
}

impl<'a> Segment<'a> {
    pub fn new(bars: &'a [Bar]) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&'a Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&'a Bar> {
        self.bars.last()
    }
}

/// Summary statistics across the event boundary.
///
/// Every price field is optional; a missing side leaves its fields `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Close of the last bar strictly before the event.
    pub pre_close: Option<f64>,
    /// Open of the first bar at or after the event.
    pub post_open: Option<f64>,
    /// `(post_open / pre_close - 1) * 100`.
    pub immediate_change_pct: Option<f64>,
    pub post_high: Option<f64>,
    pub post_low: Option<f64>,
    /// `(last post close / pre_close - 1) * 100`.
    pub window_change_pct: Option<f64>,
    pub pre_count: usize,
    pub post_count: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a windowed series cannot support the analysis.
#[derive(Clone, Debug, PartialEq)]
pub enum Shortfall {
    TooFewSamples {
        found: usize,
        required: usize,
    },
    /// Source series starts after the window start.
    StartsLate {
        first: DateTime<Tz>,
        window_start: DateTime<Tz>,
    },
    /// Last source bar starts more than one interval before the window end.
    EndsEarly {
        last: DateTime<Tz>,
        window_end: DateTime<Tz>,
    },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::TooFewSamples { found, required } => {
                write!(f, "{found} bar(s) in window, at least {required} required")
            }
            Shortfall::StartsLate {
                first,
                window_start,
            } => write!(
                f,
                "data starts at {} after window start {}",
                first.format("%Y-%m-%d %H:%M %Z"),
                window_start.format("%Y-%m-%d %H:%M %Z")
            ),
            Shortfall::EndsEarly { last, window_end } => write!(
                f,
                "data ends at {} before window end {}",
                last.format("%Y-%m-%d %H:%M %Z"),
                window_end.format("%Y-%m-%d %H:%M %Z")
            ),
        }
    }
}

#[derive(Debug)]
pub enum WindowError {
    /// The provider returned no bars (market closed or bad symbol).
    DataUnavailable {
        symbol: String,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },
    /// The event instant falls in a closed period of the instrument's rule.
    OutsideTradingHours {
        event: DateTime<Tz>,
        reason: ClosedReason,
    },
    InsufficientData(Shortfall),
    /// Transport or decode failure inside the provider.
    Provider(ProviderError),
    /// Provider bars could not form a valid series.
    MalformedSeries(SeriesError),
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::DataUnavailable { symbol, start, end } => write!(
                f,
                "no data available for {symbol} between {} and {}",
                start.format("%Y-%m-%d %H:%M %Z"),
                end.format("%Y-%m-%d %H:%M %Z")
            ),
            WindowError::OutsideTradingHours { event, reason } => write!(
                f,
                "event at {} is outside trading hours: {reason}",
                event.format("%Y-%m-%d %H:%M %Z (%A)")
            ),
            WindowError::InsufficientData(s) => write!(f, "insufficient data: {s}"),
            WindowError::Provider(e) => write!(f, "provider error: {e}"),
            WindowError::MalformedSeries(e) => write!(f, "malformed series: {e}"),
        }
    }
}

impl std::error::Error for WindowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WindowError::Provider(e) => Some(e),
            WindowError::MalformedSeries(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProviderError> for WindowError {
    fn from(e: ProviderError) -> Self {
        WindowError::Provider(e)
    }
}

impl From<SeriesError> for WindowError {
    fn from(e: SeriesError) -> Self {
        WindowError::MalformedSeries(e)
    }
}
