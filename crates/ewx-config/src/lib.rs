//! ewx-config
//!
//! Layered YAML configuration for event-window analyses.
//!
//! Layers merge in order (built-in defaults, then each file, then CLI
//! overrides); later layers win key-by-key. The merged document is rendered
//! as canonical JSON and hashed with SHA-256 so every run records exactly
//! which configuration produced it. [`LoadedConfig::analysis`] turns the
//! merged document into a typed, validated [`AnalysisConfig`].

mod analysis;

pub use analysis::*;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Built-in base layer. Reproduces the June 2025 PPI release study on gold
/// futures; every other layer is an override on top of it.
pub const DEFAULT_YAML: &str = r#"
instrument:
  symbol: "GC=F"
  display_name: "Gold Futures"
  timezone: "America/New_York"
calendar:
  kind: weekly_session
  open: "Sun 18:00"
  close: "Fri 17:00"
  daily_break:
    start: "17:00"
    end: "18:00"
  holidays: []
event:
  label: "PPI Release"
  local_time: "2025-06-10 12:30:00"
window:
  lookback_hours: 4
  lookforward_hours: 4
  min_samples: 5
  interval: "5m"
  fetch_padding_hours: 24
  require_full_coverage: true
provider:
  source: yahoo
  base_url: "https://query1.finance.yahoo.com"
  timeout_secs: 30
  csv_path: null
chart:
  path: "gold_ppi_analysis.svg"
  width: 1400
  height: 700
artifacts:
  summary_path: null
"#;

/// Environment variable holding comma-separated config paths, used when no
/// `--config` flag is given.
pub const CONFIG_ENV_VAR: &str = "EWX_CONFIG";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    fn from_merged(merged: Value) -> Result<Self> {
        let canonical_json = canonicalize_json(&merged)?;
        let config_hash = sha256_hex(canonical_json.as_bytes());
        Ok(Self {
            config_hash,
            canonical_json,
            config_json: merged,
        })
    }

    /// Merge one more layer on top and re-hash.
    pub fn with_overlay(self, overlay: Value) -> Result<Self> {
        Self::from_merged(deep_merge(self.config_json, overlay))
    }

    /// Typed view of the merged document. Fails on unknown keys, wrong types
    /// or out-of-range values.
    pub fn analysis(&self) -> Result<AnalysisConfig> {
        let cfg: AnalysisConfig = serde_json::from_value(self.config_json.clone())
            .context("config does not match the analysis schema")?;
        cfg.validate()?;
        Ok(cfg)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = read_docs(paths)?;
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// [`DEFAULT_YAML`] followed by `paths`.
pub fn load_with_defaults(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = read_docs(paths)?;
    let mut doc_refs: Vec<&str> = Vec::with_capacity(docs.len() + 1);
    doc_refs.push(DEFAULT_YAML);
    doc_refs.extend(docs.iter().map(|s| s.as_str()));
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }
    LoadedConfig::from_merged(merged)
}

/// Split an `EWX_CONFIG`-style value into paths, dropping blanks.
pub fn split_config_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_docs(paths: &[&str]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|p| {
            fs::read_to_string(Path::new(p))
                .with_context(|| format!("failed to read yaml path: {p}"))
        })
        .collect()
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON. `serde_json::Map` is key-sorted (no `preserve_order`), so
/// source key order never reaches the hash.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
