use assert_cmd::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use ewx_calendar::TradingCalendarRule;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
}

/// Mon 2025-06-09 through Wed 2025-06-11 while COMEX metals trade, with a
/// +15.0 gap at the 12:30 EDT Tuesday release.
fn write_gold_csv(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("gc_5m.csv");
    let bars = ewx_testkit::tradable_only(
        ewx_testkit::release_bars(utc(9, 12, 0), utc(11, 18, 0), utc(10, 16, 30), 3300.0, 15.0),
        &TradingCalendarRule::comex_metals(),
    );
    ewx_testkit::write_bars_csv(&path, &bars).unwrap();
    path
}

fn ewx(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ewx").unwrap();
    cmd.current_dir(dir).env_remove("EWX_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn cli_analyze_csv_replay_prints_stats_and_writes_chart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = write_gold_csv(dir.path());

    ewx(dir.path())
        .arg("analyze")
        .arg("--csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ticker: GC=F | Event: 2025-06-10 12:30 EDT (Tuesday)"))
        .stdout(predicate::str::contains("Data Points: 97 (Pre: 48, Post: 49)"))
        .stdout(predicate::str::contains("Immediate Change: "))
        .stdout(predicate::str::contains("Source: csv"));

    let svg = std::fs::read_to_string(dir.path().join("gold_ppi_analysis.svg"))?;
    assert!(svg.contains("Gold Futures (GC=F) Around PPI Release"));
    Ok(())
}

#[test]
fn cli_analyze_weekend_event_reports_error_without_chart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = write_gold_csv(dir.path());

    ewx(dir.path())
        .args(["analyze", "--event", "2025-06-08 10:00"])
        .arg("--csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains(" ERROR "))
        .stdout(predicate::str::contains("stage validate_trading_window"))
        .stdout(predicate::str::contains("Troubleshooting Tips:"))
        .stdout(predicate::str::contains("trades Sun 18:00 to Fri 17:00"));

    assert!(!dir.path().join("gold_ppi_analysis.svg").exists());
    Ok(())
}

#[test]
fn cli_analyze_config_file_redirects_summary() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = write_gold_csv(dir.path());
    std::fs::write(
        dir.path().join("run.yaml"),
        "chart:\n  path: out/chart.svg\nartifacts:\n  summary_path: out/summary.json\n",
    )?;

    ewx(dir.path())
        .args(["analyze", "--config", "run.yaml", "--csv"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary: out/summary.json"));

    assert!(dir.path().join("out/chart.svg").exists());
    let raw = std::fs::read_to_string(dir.path().join("out/summary.json"))?;
    assert!(raw.contains(r#""data_points": 97"#));
    Ok(())
}

#[test]
fn cli_analyze_reads_config_from_env() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = write_gold_csv(dir.path());
    std::fs::write(dir.path().join("thin.yaml"), "window:\n  min_samples: 500\n")?;

    ewx(dir.path())
        .env("EWX_CONFIG", "thin.yaml")
        .arg("analyze")
        .arg("--csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("stage slice_window"))
        .stdout(predicate::str::contains("at least 500 bars"));
    Ok(())
}

#[test]
fn cli_analyze_missing_config_reports_error_and_exits_zero() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    ewx(dir.path())
        .args(["analyze", "--config", "nope.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(" ERROR "))
        .stdout(predicate::str::contains("stage config"))
        .stdout(predicate::str::contains("failed to read yaml path: nope.yaml"))
        .stdout(predicate::str::contains("default calendar trades Sun 18:00 to Fri 17:00"));
    Ok(())
}

#[test]
fn cli_analyze_unknown_source_reports_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    ewx(dir.path())
        .args(["analyze", "--source", "bloomberg"])
        .assert()
        .success()
        .stdout(predicate::str::contains(" ERROR "))
        .stdout(predicate::str::contains("invalid provider source 'bloomberg'"));
    Ok(())
}

#[test]
fn cli_analyze_unknown_interval_reports_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    ewx(dir.path())
        .args(["analyze", "--interval", "2h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("invalid interval '2h'"));
    Ok(())
}

#[test]
fn cli_analyze_event_skipped_by_dst_reports_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = write_gold_csv(dir.path());

    // 02:30 on 2025-03-09 is skipped by the New York spring-forward.
    ewx(dir.path())
        .args(["analyze", "--event", "2025-03-09 02:30", "--csv"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains(" ERROR "))
        .stdout(predicate::str::contains("does not exist in America/New_York"))
        .stdout(predicate::str::contains("Troubleshooting Tips:"));

    assert!(!dir.path().join("gold_ppi_analysis.svg").exists());
    Ok(())
}

#[test]
fn cli_analyze_unparseable_event_reports_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    ewx(dir.path())
        .args(["analyze", "--event", "not-a-date"])
        .assert()
        .success()
        .stdout(predicate::str::contains(" ERROR "))
        .stdout(predicate::str::contains("not-a-date"));
    Ok(())
}
