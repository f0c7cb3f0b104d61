use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use ewx_calendar::TradingCalendarRule;
use ewx_md::{FetchBarsRequest, HistoricalProvider, Interval, PriceSeries};
use tracing::{debug, info};

use crate::{EventWindow, Instrument, Segment, Shortfall, Stats, WindowError};

/// Fetch `[event - padding, event + padding]` at `interval` and localise it to
/// the instrument's exchange timezone.
///
/// An empty provider response is [`WindowError::DataUnavailable`].
pub async fn fetch(
    provider: &dyn HistoricalProvider,
    instrument: &Instrument,
    event: &DateTime<Tz>,
    interval: Interval,
    padding: Duration,
) -> Result<PriceSeries, WindowError> {
    let start = *event - padding;
    let end = *event + padding;
    let req = FetchBarsRequest {
        symbol: instrument.symbol.clone(),
        interval,
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
    };

    debug!(
        source = provider.source_name(),
        symbol = %req.symbol,
        interval = interval.as_str(),
        start = %req.start,
        end = %req.end,
        "fetching bars"
    );
    let raw = provider.fetch_bars(&req).await?;
    if raw.is_empty() {
        return Err(WindowError::DataUnavailable {
            symbol: instrument.symbol.clone(),
            start,
            end,
        });
    }

    let series = PriceSeries::from_raw(&instrument.symbol, interval, instrument.tz, raw)?;
    info!(
        source = provider.source_name(),
        symbol = %instrument.symbol,
        bars = series.len(),
        "fetched series"
    );
    Ok(series)
}

/// Reject an event that falls in a closed period of `rule`.
pub fn validate_trading_window(
    event: &DateTime<Tz>,
    rule: &TradingCalendarRule,
) -> Result<(), WindowError> {
    rule.check(event)
        .map_err(|reason| WindowError::OutsideTradingHours {
            event: *event,
            reason,
        })
}

/// Restrict `series` to the inclusive window.
///
/// With `require_full_coverage`, the source series must start at or before the
/// window start and its last bar must start no earlier than one interval before
/// the window end.
pub fn slice_window(
    series: &PriceSeries,
    window: &EventWindow,
    min_samples: usize,
    require_full_coverage: bool,
) -> Result<PriceSeries, WindowError> {
    let start = window.start();
    let end = window.end();
    let windowed = series.between(&start, &end);

    if windowed.len() < min_samples {
        return Err(WindowError::InsufficientData(Shortfall::TooFewSamples {
            found: windowed.len(),
            required: min_samples,
        }));
    }

    if require_full_coverage {
        if let (Some(first), Some(last)) = (series.first(), series.last()) {
            if first.ts > start {
                return Err(WindowError::InsufficientData(Shortfall::StartsLate {
                    first: first.ts,
                    window_start: start,
                }));
            }
            if last.ts < end - series.interval().duration() {
                return Err(WindowError::InsufficientData(Shortfall::EndsEarly {
                    last: last.ts,
                    window_end: end,
                }));
            }
        }
    }

    Ok(windowed)
}

/// Split at the event: `pre` is strictly before, `post` is at or after.
pub fn partition<'a>(
    windowed: &'a PriceSeries,
    event: &DateTime<Tz>,
) -> (Segment<'a>, Segment<'a>) {
    let bars = windowed.bars();
    let idx = bars.partition_point(|b| b.ts < *event);
    let (pre, post) = bars.split_at(idx);
    (Segment::new(pre), Segment::new(post))
}

pub fn summarize(pre: &Segment<'_>, post: &Segment<'_>) -> Stats {
    let pre_close = pre.last().map(|b| b.close);
    let post_open = post.first().map(|b| b.open);
    let post_last_close = post.last().map(|b| b.close);

    let post_high = post
        .bars()
        .iter()
        .map(|b| b.high)
        .reduce(f64::max);
    let post_low = post.bars().iter().map(|b| b.low).reduce(f64::min);

    Stats {
        pre_close,
        post_open,
        immediate_change_pct: pct_change(pre_close, post_open),
        post_high,
        post_low,
        window_change_pct: pct_change(pre_close, post_last_close),
        pre_count: pre.len(),
        post_count: post.len(),
    }
}

fn pct_change(base: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (base, value) {
        (Some(b), Some(v)) if b != 0.0 => Some((v / b - 1.0) * 100.0),
        _ => None,
    }
}
