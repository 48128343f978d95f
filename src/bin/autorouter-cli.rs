use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;

use auto_router::config::{load_config, AutoRouterConfig, ObservabilityConfig};
use auto_router::observability::{logging, LogSink};
use auto_router::statistics::StatisticsManager;

#[derive(Parser)]
#[command(name = "autorouter-cli")]
#[command(about = "Reports and maintenance for auto-router event logs", long_about = None)]
struct Cli {
    /// Read log locations from this configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event log to work on. Overrides the configuration.
    #[arg(short, long)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Breakdown of one UTC day
    Daily {
        /// Day to report, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Also write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summary of the last N days
    Summary {
        #[arg(short, long, default_value_t = 7)]
        days: u32,

        /// Also write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Drop events older than N days
    Clean {
        /// Days to keep (default: configured retention)
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Fetch live metrics from a running server
    Metrics {
        #[arg(short, long, default_value = "http://localhost:3000/__autorouter")]
        url: String,

        /// Bearer token for the stats endpoints
        #[arg(short, long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AutoRouterConfig::default(),
    };
    logging::init(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..config.observability.clone()
    });

    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.metrics_log_path));
    let statistics = StatisticsManager::new(Arc::new(LogSink::new(log_path)))
        .with_trail(Arc::new(LogSink::new(&config.operational_log_path)));

    match cli.command {
        Commands::Daily { date, output } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let report = tokio::task::spawn_blocking(move || {
                let report = statistics.generate_daily_report(date)?;
                if let Some(path) = output {
                    statistics.write_report(&report, &path)?;
                }
                Ok::<_, auto_router::statistics::StatsError>(report)
            })
            .await??;
            print_json(&report)?;
        }
        Commands::Summary { days, output } => {
            let report = tokio::task::spawn_blocking(move || {
                let report = statistics.generate_summary_report(days)?;
                if let Some(path) = output {
                    statistics.write_report(&report, &path)?;
                }
                Ok::<_, auto_router::statistics::StatsError>(report)
            })
            .await??;
            print_json(&report)?;
        }
        Commands::Clean { days } => {
            let days = days.unwrap_or(config.retention.days_to_keep);
            let removed =
                tokio::task::spawn_blocking(move || statistics.clean_old_logs(days)).await??;
            println!("Removed {removed} entries older than {days} days");
        }
        Commands::Metrics { url, key } => {
            let client = reqwest::Client::new();
            let mut headers = HeaderMap::new();
            if let Some(key) = key.or(config.admin.api_key) {
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
            }

            let res = client
                .get(format!("{}/metrics", url.trim_end_matches('/')))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: stats endpoint returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    print_json(&json)?;
    Ok(())
}
