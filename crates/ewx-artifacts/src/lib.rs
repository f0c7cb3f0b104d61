//! ewx-artifacts
//!
//! Files an analysis run leaves behind: the SVG chart and an optional JSON
//! run summary recording what was analysed and with which config hash.

mod chart;

pub use chart::{render, render_svg, ChartArtifact, ChartSpec};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use ewx_window::Stats;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SUMMARY_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub config_hash: String,
    pub source: String,
    pub symbol: String,
    pub interval: String,
    pub event_label: String,
    pub event_time: DateTime<FixedOffset>,
    pub window_start: DateTime<FixedOffset>,
    pub window_end: DateTime<FixedOffset>,
    /// Trading session around the event, when the rule defines one.
    pub session: Option<SessionBounds>,
    pub data_points: usize,
    pub gaps: usize,
    pub missing_bars: i64,
    pub stats: Stats,
    pub chart: ChartRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBounds {
    pub open: DateTime<FixedOffset>,
    pub close: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRef {
    pub path: String,
    pub bytes: u64,
}

impl From<&ChartArtifact> for ChartRef {
    fn from(a: &ChartArtifact) -> Self {
        Self {
            path: a.path.display().to_string(),
            bytes: a.bytes,
        }
    }
}

/// Pretty JSON with a trailing newline; overwrites any existing file.
pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create summary dir failed: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary).context("serialize run summary failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write run summary failed: {}", path.display()))?;
    Ok(path.to_path_buf())
}

pub fn read_run_summary(path: &Path) -> Result<RunSummary> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read run summary failed: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parse run summary failed: {}", path.display()))
}
