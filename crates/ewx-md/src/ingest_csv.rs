//! Offline CSV provider.
//!
//! Replays a previously captured intraday series so an analysis can run
//! without the network.
//!
//! ## CSV column contract (header required, case-insensitive)
//!
//! | Column   | Example                     | Notes                                   |
//! |----------|-----------------------------|-----------------------------------------|
//! | `ts`     | `2025-06-10T16:30:00Z`      | RFC 3339, or UTC epoch seconds          |
//! | `open`   | `3331.0`                    |                                         |
//! | `high`   | `3335.5`                    |                                         |
//! | `low`    | `3330.2`                    |                                         |
//! | `close`  | `3334.9`                    |                                         |
//! | `volume` | `1430`                      | optional column; blank counts as 0      |
//!
//! The file may hold any span; rows outside the request range are dropped.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::provider::{ProviderError, RawBar};
use crate::{FetchBarsRequest, HistoricalProvider};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum CsvIngestError {
    /// An I/O or CSV-library error.
    Io(String),
    /// A record field could not be parsed into the expected type.
    ParseField {
        row: usize,
        field: &'static str,
        raw: String,
    },
}

impl fmt::Display for CsvIngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvIngestError::Io(msg) => write!(f, "csv io error: {msg}"),
            CsvIngestError::ParseField { row, field, raw } => {
                write!(
                    f,
                    "csv row {row}: cannot parse field '{field}' from value '{raw}'"
                )
            }
        }
    }
}

impl std::error::Error for CsvIngestError {}

impl From<CsvIngestError> for ProviderError {
    fn from(e: CsvIngestError) -> Self {
        match e {
            CsvIngestError::Io(msg) => ProviderError::Transport(msg),
            other => ProviderError::Decode(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRecord {
    ts: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<u64>,
}

/// Parse a timestamp cell: RFC 3339 first, then integer epoch seconds.
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Parse CSV text into raw bars, in file order.
pub fn parse_csv_str(src: &str) -> Result<Vec<RawBar>, CsvIngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(src.as_bytes());

    // Normalise header case so `Close` and `close` both bind.
    let headers = rdr
        .headers()
        .map_err(|e| CsvIngestError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect::<csv::StringRecord>();
    rdr.set_headers(headers);

    let mut out = Vec::new();
    for (i, rec) in rdr.deserialize::<CsvRecord>().enumerate() {
        let row = i + 2; // 1-based, header = 1
        let rec = rec.map_err(|e| CsvIngestError::ParseField {
            row,
            field: "record",
            raw: e.to_string(),
        })?;

        let ts = parse_ts(&rec.ts).ok_or_else(|| CsvIngestError::ParseField {
            row,
            field: "ts",
            raw: rec.ts.clone(),
        })?;

        out.push(RawBar {
            ts,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close: rec.close,
            volume: rec.volume.unwrap_or(0),
        });
    }

    Ok(out)
}

pub fn parse_csv_file(path: &Path) -> Result<Vec<RawBar>, CsvIngestError> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| CsvIngestError::Io(format!("read '{}': {e}", path.display())))?;
    parse_csv_str(&src)
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// File-backed provider. The file is re-read on every fetch.
#[derive(Debug, Clone)]
pub struct CsvFileProvider {
    path: PathBuf,
}

impl CsvFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl HistoricalProvider for CsvFileProvider {
    fn source_name(&self) -> &'static str {
        "csv"
    }

    async fn fetch_bars(&self, req: &FetchBarsRequest) -> Result<Vec<RawBar>, ProviderError> {
        let all = parse_csv_file(&self.path)?;
        let total = all.len();
        let bars: Vec<RawBar> = all
            .into_iter()
            .filter(|b| b.ts >= req.start && b.ts <= req.end)
            .collect();
        debug!(
            path = %self.path.display(),
            rows = total,
            in_range = bars.len(),
            "csv provider read"
        );
        Ok(bars)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interval;
    use chrono::TimeZone;
    use std::io::Write;

    const CSV: &str = "ts,open,high,low,close,volume
2025-06-10T16:25:00Z,3330.0,3331.0,3329.5,3330.5,100
2025-06-10T16:30:00Z,3330.5,3336.0,3330.0,3335.0,900
1749573300,3335.0,3337.0,3334.0,3336.5,
";

    #[test]
    fn parses_rfc3339_and_epoch_rows() {
        let bars = parse_csv_str(CSV).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(
            bars[1].ts,
            Utc.with_ymd_and_hms(2025, 6, 10, 16, 30, 0).unwrap()
        );
        assert_eq!(bars[2].ts.timestamp(), 1_749_573_300);
        assert_eq!(bars[2].volume, 0);
    }

    #[test]
    fn header_case_is_ignored() {
        let src = "TS,Open,High,Low,Close,Volume\n2025-06-10T16:25:00Z,1,2,0.5,1.5,7\n";
        let bars = parse_csv_str(src).unwrap();
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(bars[0].volume, 7);
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let src = "ts,open,high,low,close,volume\nyesterday,1,2,0.5,1.5,7\n";
        let err = parse_csv_str(src).unwrap_err();
        let s = err.to_string();
        assert!(s.contains("row 2"), "{s}");
        assert!(s.contains("ts"), "{s}");
    }

    #[test]
    fn bad_price_reports_row() {
        let src = "ts,open,high,low,close,volume\n2025-06-10T16:25:00Z,abc,2,0.5,1.5,7\n";
        assert!(matches!(
            parse_csv_str(src).unwrap_err(),
            CsvIngestError::ParseField { row: 2, .. }
        ));
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_csv_str("ts,open,high,low,close,volume\n")
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn provider_filters_to_request_range() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(CSV.as_bytes()).unwrap();

        let provider = CsvFileProvider::new(f.path());
        let req = FetchBarsRequest {
            symbol: "GC=F".to_string(),
            interval: Interval::M5,
            start: Utc.with_ymd_and_hms(2025, 6, 10, 16, 30, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 10, 16, 35, 0).unwrap(),
        };
        let bars = provider.fetch_bars(&req).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(provider.source_name(), "csv");
    }

    #[tokio::test]
    async fn missing_file_is_transport_error() {
        let provider = CsvFileProvider::new("/definitely/not/here.csv");
        let req = FetchBarsRequest {
            symbol: "GC=F".to_string(),
            interval: Interval::M5,
            start: Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap(),
        };
        assert!(matches!(
            provider.fetch_bars(&req).await.unwrap_err(),
            ProviderError::Transport(_)
        ));
    }
}
