use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "ewx")]
#[command(about = "Event-window extractor: price action around scheduled releases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, validate and chart the window around one event
    Analyze {
        /// Layered config paths in merge order (falls back to EWX_CONFIG)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Event wall time in the instrument timezone, e.g. "2025-06-10 12:30"
        #[arg(long)]
        event: Option<String>,

        /// Ticker override (e.g. GC=F, SI=F)
        #[arg(long)]
        symbol: Option<String>,

        /// Bar source: yahoo | csv
        #[arg(long)]
        source: Option<String>,

        /// Bar interval override: 1m | 5m | 15m | 30m | 1h
        #[arg(long)]
        interval: Option<String>,

        /// Replay bars from a CSV file (implies --source csv)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Report whether the instrument trades at a given instant
    Session {
        /// Layered config paths in merge order (falls back to EWX_CONFIG)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Wall time in the instrument timezone, or RFC 3339
        #[arg(long)]
        at: String,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order, applied on top of the built-in defaults
        paths: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Analyze {
            config_paths,
            event,
            symbol,
            source,
            interval,
            csv,
        } => {
            let args = commands::analyze::AnalyzeArgs {
                config_paths,
                event,
                symbol,
                source,
                interval,
                csv,
            };
            commands::analyze::analyze(&args).await?;
        }

        Commands::Session { config_paths, at } => {
            commands::session::session(&config_paths, &at)?;
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = ewx_config::load_with_defaults(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays a clean report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
