//! Command handler modules for ewx.
//!
//! Config resolution shared by every command lives here.

pub mod analyze;
pub mod session;

use anyhow::Result;
use ewx_config::{LoadedConfig, CONFIG_ENV_VAR};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// `--config` paths when given, otherwise the comma-separated list in
/// `EWX_CONFIG`, otherwise none (built-in defaults only).
pub fn resolve_config_paths(flag_paths: &[String]) -> Vec<String> {
    if !flag_paths.is_empty() {
        return flag_paths.to_vec();
    }
    std::env::var(CONFIG_ENV_VAR)
        .map(|raw| ewx_config::split_config_paths(&raw))
        .unwrap_or_default()
}

/// Defaults, then each resolved config file.
pub fn load_config(flag_paths: &[String]) -> Result<LoadedConfig> {
    let paths = resolve_config_paths(flag_paths);
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    ewx_config::load_with_defaults(&path_refs)
}

/// `=====  title  =====` banner, 80 columns wide.
pub fn banner(title: &str) -> String {
    format!("{:=^80}", format!(" {title} "))
}
