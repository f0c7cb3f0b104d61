//! `ewx analyze`: one event-window run, printed as a human report.
//!
//! Every failure, from an unreadable config file to a thin window, is
//! reported as an ERROR banner with troubleshooting tips and exits 0.

use anyhow::{Context, Result};
use ewx_calendar::{ClosedReason, TradingCalendarRule};
use ewx_config::{AnalysisConfig, LoadedConfig, Overrides, ProviderSource};
use ewx_md::Interval;
use ewx_runtime::{build_provider, run_event_window, PipelineError, RunReport, Stage};
use ewx_window::{Shortfall, WindowError};

use super::{banner, load_config};

/// Raw `analyze` flags; parsed here so bad values get the error banner too.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    pub config_paths: Vec<String>,
    pub event: Option<String>,
    pub symbol: Option<String>,
    pub source: Option<String>,
    pub interval: Option<String>,
    pub csv: Option<std::path::PathBuf>,
}

impl AnalyzeArgs {
    pub fn overrides(&self) -> Result<Overrides> {
        Ok(Overrides {
            event: self.event.clone(),
            symbol: self.symbol.clone(),
            source: self
                .source
                .as_deref()
                .map(ProviderSource::parse)
                .transpose()?,
            interval: self
                .interval
                .as_deref()
                .map(Interval::parse)
                .transpose()?,
            csv: self.csv.clone(),
        })
    }
}

pub async fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let (loaded, cfg) = match resolve(args) {
        Ok(v) => v,
        Err(err) => {
            print_setup_failure(None, &err);
            return Ok(());
        }
    };
    let provider = match build_provider(&cfg) {
        Ok(p) => p,
        Err(err) => {
            print_setup_failure(Some(&cfg), &err);
            return Ok(());
        }
    };
    tracing::debug!(
        config_hash = %loaded.config_hash,
        source = provider.source_name(),
        "config resolved"
    );

    match run_event_window(provider.as_ref(), &cfg, &loaded.config_hash).await {
        Ok(report) => print_report(&report),
        Err(err) => {
            let rule = rule_or_default(&cfg);
            print_failure(&cfg, &rule, &err);
        }
    }
    Ok(())
}

fn resolve(args: &AnalyzeArgs) -> Result<(LoadedConfig, AnalysisConfig)> {
    let overrides = args.overrides()?;
    let mut loaded = load_config(&args.config_paths)?;
    if !overrides.is_empty() {
        loaded = loaded
            .with_overlay(overrides.to_layer())
            .context("apply command-line overrides failed")?;
    }
    let cfg = loaded.analysis()?;
    cfg.event_instant()?;
    Ok((loaded, cfg))
}

/// The configured rule, or the built-in metals session when it is malformed.
fn rule_or_default(cfg: &AnalysisConfig) -> TradingCalendarRule {
    cfg.calendar_rule()
        .unwrap_or_else(|_| TradingCalendarRule::comex_metals())
}

fn money(v: Option<f64>) -> String {
    v.map(|x| format!("${x:.2}")).unwrap_or_else(|| "n/a".to_string())
}

fn pct(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}%")).unwrap_or_else(|| "n/a".to_string())
}

fn print_report(r: &RunReport) {
    let s = &r.stats;
    let event = &r.window.event;

    println!("{}", banner(&format!("{} Analysis", r.event_label)));
    println!(
        "Ticker: {} | Event: {}",
        r.instrument.symbol,
        event.format("%Y-%m-%d %H:%M %Z (%A)")
    );
    println!(
        "Window: {} to {}",
        r.window.start().format("%Y-%m-%d %H:%M"),
        r.window.end().format("%Y-%m-%d %H:%M %Z")
    );
    if let Some(session) = &r.session {
        println!(
            "Session: {} to {}",
            session.open.format("%a %Y-%m-%d %H:%M"),
            session.close.format("%a %Y-%m-%d %H:%M %Z")
        );
    }
    println!(
        "Data Points: {} (Pre: {}, Post: {})",
        r.windowed.len(),
        s.pre_count,
        s.post_count
    );
    println!("Pre-Event Close: {}", money(s.pre_close));
    println!("Post-Event Open: {}", money(s.post_open));
    println!("Immediate Change: {}", pct(s.immediate_change_pct));
    println!("Post-Event High: {}", money(s.post_high));
    println!("Post-Event Low: {}", money(s.post_low));
    println!("Window Change: {}", pct(s.window_change_pct));
    if !r.gaps.is_clean() {
        println!(
            "Gaps: {} ({} missing bar(s))",
            r.gaps.gaps.len(),
            r.gaps.missing_bars()
        );
    }
    println!(
        "Chart: {} ({} bytes)",
        r.chart.path.display(),
        r.chart.bytes
    );
    if let Some(p) = &r.summary_path {
        println!("Summary: {}", p.display());
    }
    println!("Source: {} | Run: {} | Config: {}", r.source, r.run_id, r.config_hash);
    println!("{}", "=".repeat(80));
}

fn print_failure(cfg: &AnalysisConfig, rule: &TradingCalendarRule, err: &PipelineError) {
    println!("{}", banner("ERROR"));
    println!(
        "Failed to analyze {} around {} (stage {}): {err}",
        cfg.instrument.symbol,
        cfg.event.label,
        err.stage().as_str()
    );
    println!();
    println!("Troubleshooting Tips:");
    for tip in troubleshooting_tips(cfg, rule, err) {
        println!("  - {tip}");
    }
    println!("{}", "=".repeat(80));
}

/// Config or provider wiring failed before any data was requested.
fn print_setup_failure(cfg: Option<&AnalysisConfig>, err: &anyhow::Error) {
    println!("{}", banner("ERROR"));
    println!("Failed to analyze (stage {}): {err:#}", Stage::Config.as_str());
    println!();
    println!("Troubleshooting Tips:");
    for tip in setup_tips(cfg) {
        println!("  - {tip}");
    }
    println!("{}", "=".repeat(80));
}

pub fn setup_tips(cfg: Option<&AnalysisConfig>) -> Vec<String> {
    let mut tips = vec![
        "check the --config files and EWX_CONFIG for typos and unknown keys".to_string(),
        "event times are wall-clock in the instrument timezone, e.g. \"2025-06-10 12:30\"; times skipped by a DST change do not exist".to_string(),
    ];
    match cfg {
        Some(cfg) => {
            tips.push(format!(
                "{} {}",
                cfg.instrument.display_name,
                rule_or_default(cfg).describe()
            ));
            if cfg.provider.source == ProviderSource::Csv {
                tips.push("source csv needs provider.csv_path or --csv".to_string());
            }
        }
        None => tips.push(format!(
            "default calendar {}",
            TradingCalendarRule::comex_metals().describe()
        )),
    }
    tips
}

/// Hints keyed on what went wrong.
pub fn troubleshooting_tips(
    cfg: &AnalysisConfig,
    rule: &TradingCalendarRule,
    err: &PipelineError,
) -> Vec<String> {
    let mut tips = Vec::new();
    match err.window_error() {
        Some(WindowError::OutsideTradingHours { reason, .. }) => {
            tips.push(format!("{} {}", cfg.instrument.display_name, rule.describe()));
            match reason {
                ClosedReason::Weekend => {
                    tips.push("choose an event time on a trading day".to_string())
                }
                ClosedReason::DailyBreak => {
                    tips.push("the event falls in the daily maintenance break".to_string())
                }
                ClosedReason::Holiday(d) => tips.push(format!("{d} is an exchange holiday")),
            }
        }
        Some(WindowError::DataUnavailable { .. }) => {
            tips.push(format!(
                "check that '{}' is a valid ticker for source {}",
                cfg.instrument.symbol,
                cfg.provider.source.as_str()
            ));
            tips.push(
                "intraday history is only kept for a limited period; try a more recent date"
                    .to_string(),
            );
        }
        Some(WindowError::InsufficientData(shortfall)) => {
            match shortfall {
                Shortfall::TooFewSamples { required, .. } => tips.push(format!(
                    "at least {required} bars are needed; lower window.min_samples or widen the window"
                )),
                Shortfall::StartsLate { .. } | Shortfall::EndsEarly { .. } => tips.push(
                    "the data does not span the whole window; set window.require_full_coverage: false to accept partial windows"
                        .to_string(),
                ),
            }
            tips.push(format!("{} {}", cfg.instrument.display_name, rule.describe()));
        }
        Some(WindowError::Provider(_)) | Some(WindowError::MalformedSeries(_)) => {
            tips.push("check network connectivity and the provider settings".to_string());
            if let Some(p) = &cfg.provider.csv_path {
                tips.push(format!("verify the CSV file at {}", p.display()));
            }
        }
        None if err.stage() == Stage::Config => tips.extend(setup_tips(Some(cfg))),
        None => {
            tips.push("check that the chart path is writable".to_string());
        }
    }
    tips
}
