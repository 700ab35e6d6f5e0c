//! metricd — the metricgrid daemon.
//!
//! Scrapes the endpoints listed in `metricd.toml`, keeps their history in
//! memory, and reports dashboard aggregates.
//!
//! # Usage
//!
//! ```text
//! metricd --config metricd.toml scrape --format exposition
//! metricd --config metricd.toml watch --interval 5s
//! metricd parse payload.txt
//! ```

mod config;
mod http_fetch;
mod runner;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{MetricdConfig, parse_duration};

const DEFAULT_LOG_FILTER: &str = "info,metricd=debug,metricgrid=debug";

#[derive(Parser)]
#[command(name = "metricd", about = "metricgrid scrape daemon")]
struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true, default_value = "metricd.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every configured endpoint once and print the result.
    Scrape {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Refresh the dashboard on an interval until Ctrl-C.
    Watch {
        /// Override the configured refresh interval ("5s", "500ms", "1m").
        #[arg(long)]
        interval: Option<String>,

        /// Print each refreshed view as a JSON line on stdout.
        #[arg(long)]
        print: bool,
    },
    /// Parse a local exposition payload and print it as JSON.
    Parse {
        /// File holding the payload.
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Dashboard view as JSON.
    Json,
    /// Per-endpoint scrape results in exposition format.
    Exposition,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Parse { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let snapshot = metricgrid_exposition::parse(&payload);
            info!(
                path = %file.display(),
                samples = snapshot.samples().len(),
                metrics = snapshot.metadata().len(),
                "payload parsed"
            );
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Command::Scrape { format } => {
            let settings = load_settings(&cli.config)?;
            runner::scrape_once(settings, format).await
        }
        Command::Watch { interval, print } => {
            let mut settings = load_settings(&cli.config)?;
            if let Some(raw) = interval {
                settings.refresh_interval = parse_duration(&raw)
                    .with_context(|| format!("invalid --interval {raw:?}"))?;
            }
            runner::watch(settings, print).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_settings(path: &std::path::Path) -> anyhow::Result<config::Settings> {
    let settings = MetricdConfig::from_file(path)?.resolve()?;
    info!(
        path = %path.display(),
        endpoints = settings.registrations.len(),
        definitions = settings.registry.len(),
        pinned = settings.pinned.len(),
        "configuration loaded"
    );
    Ok(settings)
}
