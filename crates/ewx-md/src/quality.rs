//! Data-quality report for a single [`PriceSeries`].
//!
//! Reports gaps: consecutive bars whose spacing exceeds the series interval.
//! Gaps are informational. Intraday futures data legitimately pauses for the
//! daily maintenance break and weekends; callers log the report, they do not
//! fail on it.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::series::PriceSeries;

/// A gap event between two consecutive bars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapIssue {
    /// `ts` of the bar *before* the gap.
    pub prev_ts: DateTime<Tz>,
    /// `ts` of the bar *after* the gap.
    pub next_ts: DateTime<Tz>,
    /// Number of interval slots with no bar.
    pub missing_bars: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapReport {
    pub total_bars: usize,
    pub interval_secs: i64,
    pub earliest: Option<DateTime<Tz>>,
    pub latest: Option<DateTime<Tz>>,
    /// Gaps in chronological order.
    pub gaps: Vec<GapIssue>,
}

impl GapReport {
    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn missing_bars(&self) -> i64 {
        self.gaps.iter().map(|g| g.missing_bars).sum()
    }
}

impl fmt::Display for GapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bars={} interval_secs={} gaps={} missing_bars={}",
            self.total_bars,
            self.interval_secs,
            self.gaps.len(),
            self.missing_bars()
        )?;
        for g in &self.gaps {
            write!(
                f,
                "\n  gap {} -> {} missing={}",
                g.prev_ts.format("%Y-%m-%d %H:%M %Z"),
                g.next_ts.format("%Y-%m-%d %H:%M %Z"),
                g.missing_bars
            )?;
        }
        Ok(())
    }
}

pub fn build_gap_report(series: &PriceSeries) -> GapReport {
    let step = series.interval().duration().num_seconds();
    let bars = series.bars();

    let gaps = bars
        .windows(2)
        .filter_map(|w| {
            let delta = (w[1].ts - w[0].ts).num_seconds();
            (delta > step).then(|| GapIssue {
                prev_ts: w[0].ts,
                next_ts: w[1].ts,
                missing_bars: delta / step - 1 + i64::from(delta % step != 0),
            })
        })
        .collect();

    GapReport {
        total_bars: bars.len(),
        interval_secs: step,
        earliest: series.first().map(|b| b.ts),
        latest: series.last().map(|b| b.ts),
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Interval, RawBar};
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::New_York;

    fn series(minutes: &[u32]) -> PriceSeries {
        let raw = minutes
            .iter()
            .map(|m| RawBar {
                ts: Utc.with_ymd_and_hms(2025, 6, 10, 16, 0, 0).unwrap()
                    + chrono::Duration::minutes(i64::from(*m)),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 0,
            })
            .collect();
        PriceSeries::from_raw("GC=F", Interval::M5, New_York, raw).unwrap()
    }

    #[test]
    fn contiguous_series_is_clean() {
        let r = build_gap_report(&series(&[0, 5, 10, 15]));
        assert!(r.is_clean());
        assert_eq!(r.total_bars, 4);
        assert_eq!(r.interval_secs, 300);
    }

    #[test]
    fn gap_counts_missing_slots() {
        // 10 -> 30 skips 15, 20, 25.
        let r = build_gap_report(&series(&[0, 5, 10, 30, 35]));
        assert_eq!(r.gaps.len(), 1);
        assert_eq!(r.gaps[0].missing_bars, 3);
        assert_eq!(r.missing_bars(), 3);
        assert!(r.to_string().contains("gaps=1"));
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let r = build_gap_report(&series(&[]));
        assert_eq!(r.total_bars, 0);
        assert!(r.earliest.is_none());
        assert!(r.latest.is_none());
    }
}
