//! ewx-runtime
//!
//! Runs one event-window analysis end to end:
//!
//! ```text
//! fetch -> validate_trading_window -> slice_window -> partition -> summarize -> render
//! ```
//!
//! The first failing stage aborts the run. Nothing is written unless every
//! stage before `render` succeeded.

use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use ewx_artifacts::{ChartArtifact, ChartRef, ChartSpec, RunSummary, SessionBounds};
use ewx_calendar::Session;
use ewx_config::{AnalysisConfig, ProviderSource};
use ewx_md::quality::{build_gap_report, GapReport};
use ewx_md::{CsvFileProvider, HistoricalProvider, PriceSeries, YahooChartProvider};
use ewx_window::{
    fetch, partition, slice_window, summarize, validate_trading_window, EventWindow, Instrument,
    Stats, WindowError,
};
use tracing::{info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Fetch,
    Validate,
    Slice,
    Artifact,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Fetch => "fetch",
            Stage::Validate => "validate_trading_window",
            Stage::Slice => "slice_window",
            Stage::Artifact => "artifact",
        }
    }
}

#[derive(Debug)]
pub enum PipelineError {
    /// The validated config could not be turned into runtime inputs.
    Config(anyhow::Error),
    Fetch(WindowError),
    Validate(WindowError),
    Slice(WindowError),
    /// Chart or summary could not be written.
    Artifact(anyhow::Error),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Config,
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::Validate(_) => Stage::Validate,
            PipelineError::Slice(_) => Stage::Slice,
            PipelineError::Artifact(_) => Stage::Artifact,
        }
    }

    pub fn window_error(&self) -> Option<&WindowError> {
        match self {
            PipelineError::Fetch(e) | PipelineError::Validate(e) | PipelineError::Slice(e) => {
                Some(e)
            }
            PipelineError::Config(_) | PipelineError::Artifact(_) => None,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Fetch(e) | PipelineError::Validate(e) | PipelineError::Slice(e) => {
                write!(f, "{e}")
            }
            PipelineError::Config(e) | PipelineError::Artifact(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.window_error()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub config_hash: String,
    pub source: &'static str,
    pub instrument: Instrument,
    pub event_label: String,
    pub window: EventWindow,
    /// Trading session containing the event; `None` for 24/7 rules.
    pub session: Option<Session>,
    pub windowed: PriceSeries,
    pub stats: Stats,
    pub gaps: GapReport,
    pub chart: ChartArtifact,
    pub summary_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Provider wiring
// ---------------------------------------------------------------------------

/// Concrete provider for `cfg.provider.source`.
pub fn build_provider(cfg: &AnalysisConfig) -> anyhow::Result<Box<dyn HistoricalProvider>> {
    match cfg.provider.source {
        ProviderSource::Yahoo => {
            let p = YahooChartProvider::new_with_base_url(
                cfg.provider.base_url.clone(),
                cfg.provider_timeout(),
            )
            .map_err(|e| anyhow::anyhow!("yahoo provider init failed: {e}"))?;
            Ok(Box::new(p))
        }
        ProviderSource::Csv => {
            let path = cfg
                .provider
                .csv_path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("provider.csv_path is required for source=csv"))?;
            Ok(Box::new(CsvFileProvider::new(path)))
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub async fn run_event_window(
    provider: &dyn HistoricalProvider,
    cfg: &AnalysisConfig,
    config_hash: &str,
) -> Result<RunReport, PipelineError> {
    let run_id = Uuid::new_v4();
    let instrument = cfg.instrument().map_err(PipelineError::Config)?;
    let window = cfg.event_window().map_err(PipelineError::Config)?;
    let event = window.event;

    info!(
        %run_id,
        symbol = %instrument.symbol,
        event = %event.to_rfc3339(),
        source = provider.source_name(),
        "event-window run starting"
    );

    let series = fetch(
        provider,
        &instrument,
        &event,
        cfg.window.interval,
        cfg.fetch_padding(),
    )
    .await
    .map_err(PipelineError::Fetch)?;

    validate_trading_window(&event, &instrument.rule).map_err(PipelineError::Validate)?;
    let session = instrument.rule.session_containing(&event);

    let windowed = slice_window(
        &series,
        &window,
        cfg.window.min_samples,
        cfg.window.require_full_coverage,
    )
    .map_err(PipelineError::Slice)?;

    let gaps = build_gap_report(&windowed);
    if !gaps.is_clean() {
        warn!(symbol = %instrument.symbol, "gaps in windowed series: {gaps}");
    }

    let (pre, post) = partition(&windowed, &event);
    let stats = summarize(&pre, &post);
    info!(
        pre = stats.pre_count,
        post = stats.post_count,
        immediate_change_pct = ?stats.immediate_change_pct,
        "window summarised"
    );

    let chart = ewx_artifacts::render(
        &windowed,
        &event,
        &ChartSpec {
            path: cfg.chart.path.clone(),
            width: cfg.chart.width,
            height: cfg.chart.height,
            display_name: instrument.display_name.clone(),
            event_label: cfg.event.label.clone(),
        },
    )
    .map_err(PipelineError::Artifact)?;
    info!(path = %chart.path.display(), bytes = chart.bytes, "chart written");

    let mut report = RunReport {
        run_id,
        config_hash: config_hash.to_string(),
        source: provider.source_name(),
        instrument,
        event_label: cfg.event.label.clone(),
        window,
        session,
        windowed,
        stats,
        gaps,
        chart,
        summary_path: None,
    };

    if let Some(path) = &cfg.artifacts.summary_path {
        let written = ewx_artifacts::write_run_summary(path, &run_summary(&report))
            .map_err(PipelineError::Artifact)?;
        info!(path = %written.display(), "run summary written");
        report.summary_path = Some(written);
    }

    Ok(report)
}

pub fn run_summary(report: &RunReport) -> RunSummary {
    RunSummary {
        schema_version: ewx_artifacts::SUMMARY_SCHEMA_VERSION,
        run_id: report.run_id,
        created_at_utc: Utc::now(),
        config_hash: report.config_hash.clone(),
        source: report.source.to_string(),
        symbol: report.instrument.symbol.clone(),
        interval: report.windowed.interval().as_str().to_string(),
        event_label: report.event_label.clone(),
        event_time: report.window.event.fixed_offset(),
        window_start: report.window.start().fixed_offset(),
        window_end: report.window.end().fixed_offset(),
        session: report.session.as_ref().map(|s| SessionBounds {
            open: s.open.fixed_offset(),
            close: s.close.fixed_offset(),
        }),
        data_points: report.windowed.len(),
        gaps: report.gaps.gaps.len(),
        missing_bars: report.gaps.missing_bars(),
        stats: report.stats,
        chart: ChartRef::from(&report.chart),
    }
}
