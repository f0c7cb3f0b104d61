//! Typed config validation.
//!
//! GREEN when:
//! - built-in defaults validate and build the gold-futures instrument
//! - every documented range is enforced at its edges
//! - unknown keys and bad enum values are rejected
//! - csv source without a path is rejected

use chrono::{NaiveDate, TimeZone};
use chrono_tz::America::New_York;
use ewx_calendar::{ClosedReason, TradingCalendarRule};
use ewx_config::{load_layered_yaml_from_strings, AnalysisConfig, ProviderSource, DEFAULT_YAML};
use ewx_md::Interval;

fn with(overlay: &str) -> anyhow::Result<AnalysisConfig> {
    load_layered_yaml_from_strings(&[DEFAULT_YAML, overlay])?.analysis()
}

fn rejected(overlay: &str, needle: &str) {
    let err = with(overlay).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains(needle), "expected '{needle}' in: {msg}");
}

#[test]
fn defaults_build_gold_futures_release() {
    let cfg = with("{}").unwrap();
    assert_eq!(cfg.window.interval, Interval::M5);
    assert_eq!(cfg.provider.source, ProviderSource::Yahoo);
    assert_eq!(cfg.provider_timeout().as_secs(), 30);
    assert_eq!(cfg.fetch_padding().num_hours(), 24);

    let inst = cfg.instrument().unwrap();
    assert_eq!(inst.symbol, "GC=F");
    assert_eq!(inst.tz, New_York);
    assert_eq!(inst.rule, TradingCalendarRule::comex_metals());

    let w = cfg.event_window().unwrap();
    assert_eq!(
        w.event,
        New_York.with_ymd_and_hms(2025, 6, 10, 12, 30, 0).unwrap()
    );
    assert_eq!(w.start(), New_York.with_ymd_and_hms(2025, 6, 10, 8, 30, 0).unwrap());
    assert_eq!(w.end(), New_York.with_ymd_and_hms(2025, 6, 10, 16, 30, 0).unwrap());
}

#[test]
fn window_hours_range_edges() {
    with("window: {lookback_hours: 72, lookforward_hours: 72, fetch_padding_hours: 72}").unwrap();
    rejected("window: {lookback_hours: 0}", "window.lookback_hours=0");
    rejected(
        "window: {lookforward_hours: 73, fetch_padding_hours: 80}",
        "window.lookforward_hours=73",
    );
}

#[test]
fn padding_must_cover_window() {
    rejected(
        "window: {lookback_hours: 6, fetch_padding_hours: 5}",
        "fetch_padding_hours=5",
    );
}

#[test]
fn min_samples_at_least_one() {
    with("window: {min_samples: 1}").unwrap();
    rejected("window: {min_samples: 0}", "min_samples");
}

#[test]
fn chart_and_timeout_ranges() {
    with("chart: {width: 200, height: 8000}").unwrap();
    rejected("chart: {width: 199}", "chart.width=199");
    rejected("chart: {height: 8001}", "chart.height=8001");
    rejected("provider: {timeout_secs: 0}", "provider.timeout_secs=0");
    rejected("provider: {timeout_secs: 301}", "provider.timeout_secs=301");
}

#[test]
fn unknown_keys_and_values_rejected() {
    rejected("window: {lookbehind_hours: 4}", "analysis schema");
    rejected("window: {interval: 2h}", "analysis schema");
    rejected("provider: {source: bloomberg}", "analysis schema");
}

#[test]
fn bad_timezone_and_event_time_rejected() {
    rejected("instrument: {timezone: Mars/Olympus}", "unknown timezone");
    rejected("event: {local_time: 'next tuesday'}", "event time");
}

#[test]
fn csv_source_needs_path() {
    rejected("provider: {source: csv}", "csv_path is required");
    let cfg = with("provider: {source: csv, csv_path: bars.csv}").unwrap();
    assert_eq!(cfg.provider.source, ProviderSource::Csv);
}

#[test]
fn bad_session_time_rejected() {
    rejected("calendar: {open: 'Someday 18:00'}", "calendar.open");
}

#[test]
fn holidays_and_always_on() {
    let cfg = with("calendar: {holidays: ['2025-07-04']}").unwrap();
    let rule = cfg.calendar_rule().unwrap();
    let t = New_York.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap();
    assert_eq!(
        rule.check(&t),
        Err(ClosedReason::Holiday(
            NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()
        ))
    );

    let cfg = with("calendar: {kind: always_on}").unwrap();
    assert_eq!(cfg.calendar_rule().unwrap(), TradingCalendarRule::AlwaysOn);
}
