//! Offline replay: bars written to CSV, loaded through the configured CSV
//! provider, analysed exactly like live data.

use chrono::{DateTime, TimeZone, Utc};
use ewx_calendar::TradingCalendarRule;
use ewx_runtime::{build_provider, run_event_window};
use ewx_testkit::{load_test_config, release_bars, tradable_only, write_bars_csv};

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
}

#[tokio::test]
async fn scenario_csv_source_replays_release() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("gc_5m.csv");
    let bars = tradable_only(
        release_bars(utc(9, 12, 0), utc(11, 18, 0), utc(10, 16, 30), 3300.0, 15.0),
        &TradingCalendarRule::comex_metals(),
    );
    write_bars_csv(&csv_path, &bars).unwrap();

    let overlay = format!(
        "provider: {{source: csv, csv_path: '{}'}}",
        csv_path.display()
    );
    let (loaded, cfg) = load_test_config(dir.path(), &overlay).unwrap();
    let provider = build_provider(&cfg).unwrap();
    assert_eq!(provider.source_name(), "csv");

    let report = run_event_window(provider.as_ref(), &cfg, &loaded.config_hash)
        .await
        .unwrap();

    assert_eq!(report.source, "csv");
    assert_eq!(report.windowed.len(), 97);
    assert_eq!(report.stats.pre_count, 48);
    assert!((report.stats.post_open.unwrap() - report.stats.pre_close.unwrap() - 15.0).abs() < 1e-6);
    assert!(dir.path().join("chart.svg").exists());
}

#[tokio::test]
async fn scenario_missing_csv_fails_at_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = format!(
        "provider: {{source: csv, csv_path: '{}'}}",
        dir.path().join("nope.csv").display()
    );
    let (loaded, cfg) = load_test_config(dir.path(), &overlay).unwrap();
    let provider = build_provider(&cfg).unwrap();

    let err = run_event_window(provider.as_ref(), &cfg, &loaded.config_hash)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), ewx_runtime::Stage::Fetch);
    assert!(matches!(
        err.window_error(),
        Some(ewx_window::WindowError::Provider(_))
    ));
}
