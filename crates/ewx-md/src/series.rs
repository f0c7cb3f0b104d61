//! Localised, validated price series.
//!
//! [`PriceSeries`] is the read-only tabular time series the rest of the
//! workspace operates on: one symbol, one sampling interval, one exchange
//! timezone, bars with strictly increasing timestamps.

use std::fmt;

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

use crate::provider::RawBar;
use crate::Interval;

// ---------------------------------------------------------------------------
// Bar
// ---------------------------------------------------------------------------

/// One OHLCV sample, timestamped in the exchange's local timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Start of the sampling interval.
    pub ts: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// `ts` at `index` is not strictly after its predecessor.
    NonIncreasing {
        index: usize,
        prev: String,
        ts: String,
    },
    /// A price field is NaN, infinite or negative.
    InvalidPrice {
        index: usize,
        field: &'static str,
        value: f64,
    },
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::NonIncreasing { index, prev, ts } => write!(
                f,
                "bar {index} timestamp {ts} is not strictly after previous {prev}"
            ),
            SeriesError::InvalidPrice {
                index,
                field,
                value,
            } => write!(f, "bar {index} has invalid {field} price: {value}"),
        }
    }
}

impl std::error::Error for SeriesError {}

// ---------------------------------------------------------------------------
// PriceSeries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    interval: Interval,
    tz: Tz,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series from already-localised bars.
    ///
    /// Rejects non-increasing timestamps and non-finite / negative prices.
    /// An empty series is valid; callers decide whether emptiness is fatal.
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        tz: Tz,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        for (i, b) in bars.iter().enumerate() {
            for (field, value) in [
                ("open", b.open),
                ("high", b.high),
                ("low", b.low),
                ("close", b.close),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(SeriesError::InvalidPrice {
                        index: i,
                        field,
                        value,
                    });
                }
            }
        }

        for (i, w) in bars.windows(2).enumerate() {
            if w[1].ts <= w[0].ts {
                return Err(SeriesError::NonIncreasing {
                    index: i + 1,
                    prev: w[0].ts.to_rfc3339(),
                    ts: w[1].ts.to_rfc3339(),
                });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            interval,
            tz,
            bars,
        })
    }

    /// Build a series from provider output.
    ///
    /// Bars are sorted by timestamp, duplicates keep the last occurrence, and
    /// every timestamp is converted to `tz`.
    pub fn from_raw(
        symbol: impl Into<String>,
        interval: Interval,
        tz: Tz,
        mut raw: Vec<RawBar>,
    ) -> Result<Self, SeriesError> {
        // Stable sort: among equal timestamps the later provider row stays last.
        raw.sort_by_key(|b| b.ts);

        let mut bars: Vec<Bar> = Vec::with_capacity(raw.len());
        for r in raw {
            let bar = Bar {
                ts: r.ts.with_timezone(&tz),
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            };
            match bars.last_mut() {
                Some(prev) if prev.ts == bar.ts => *prev = bar,
                _ => bars.push(bar),
            }
        }

        Self::new(symbol, interval, tz, bars)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Copy of this series restricted to bars with `start <= ts <= end`.
    pub fn between<Z: TimeZone>(&self, start: &DateTime<Z>, end: &DateTime<Z>) -> PriceSeries {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.ts >= *start && b.ts <= *end)
            .copied()
            .collect();
        PriceSeries {
            symbol: self.symbol.clone(),
            interval: self.interval,
            tz: self.tz,
            bars,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
