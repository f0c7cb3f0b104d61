//! Provider boundary types: the raw bar and the provider error.
//!
//! No concrete provider implementations and no series validation belong here.

use std::fmt;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Raw bar
// ---------------------------------------------------------------------------

/// A single OHLCV bar as returned by an upstream data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    /// Start of the sampling interval, UTC.
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded volume (contracts / shares). Providers that omit it report 0.
    pub volume: u64,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a provider implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<String>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (path, base URL) is missing or invalid.
    Config(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api {
                code: Some(c),
                message,
            } => {
                write!(f, "provider api error code={c}: {message}")
            }
            ProviderError::Api {
                code: None,
                message,
            } => {
                write!(f, "provider api error: {message}")
            }
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
