//! alert-thresholds: how many alerts a delay threshold would have suppressed
//!
//! Usage:
//!   alert-thresholds --percent-to-remove 50 --recover-within "5 minutes"
//!   alert-thresholds -p 90 -r 10m --time-period "2 weeks" --more-than 10 --sort-by threshold
//!
//! Reads incident history from the InfluxDB configured in config.toml. For every incident
//! signature that fired more than `--more-than` times in `--time-period` and whose resolve-time
//! percentile is within `--recover-within`, prints the threshold that would have hidden
//! `--percent-to-remove` percent of them.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process;

use alert_engine::{SortBy, ThresholdRecommendation};
use dashboard::fetch::{threshold_recommendations, ThresholdRequest};
use dashboard::influx::InfluxStore;
use dashboard::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "alert-thresholds", version, about)]
struct Args {
    /// Percentage of alerts the threshold should suppress (1-100)
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u32).range(1..=100))]
    percent_to_remove: u32,

    /// How far back to look, e.g. "1 day", "2 weeks"
    #[arg(short = 't', long, default_value = "1 day")]
    time_period: String,

    /// Ignore signatures with fewer alerts than this
    #[arg(short = 'm', long, default_value_t = 5)]
    more_than: u64,

    /// Only consider signatures that recover within this duration, e.g. "5 minutes"
    #[arg(short = 'r', long)]
    recover_within: String,

    /// frequency, threshold (alias: percentile) or incident_key
    #[arg(short = 's', long, default_value = "frequency")]
    sort_by: SortBy,

    /// Config file (defaults to $PIGEONHOLE_CONFIG, then config.toml)
    #[arg(short = 'c', long, env = "PIGEONHOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn describe(rec: &ThresholdRecommendation) -> String {
    format!(
        "{}: {} out of {} alerts would not have been generated with a threshold of {}",
        rec.incident_key, rec.fixed_count, rec.count, rec.formatted_threshold
    )
}

async fn run(args: Args) -> anyhow::Result<Vec<ThresholdRecommendation>> {
    let path = args.config.unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&path)?;
    let store = InfluxStore::new(&config.influxdb).context("influxdb client")?;

    let request = ThresholdRequest {
        percentage: args.percent_to_remove,
        time_period: args.time_period,
        more_than: args.more_than,
        recover_within: args.recover_within,
        sort_by: args.sort_by,
    };
    tracing::debug!(?request, config = %path.display(), "recommending thresholds");

    let recs = threshold_recommendations(&store, &request, chrono::Utc::now()).await?;
    Ok(recs)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dashboard::telemetry::init_tracing(&args.log_level);

    match run(args).await {
        Ok(recs) => {
            for rec in &recs {
                println!("{}", describe(rec));
            }
            println!("Total: {}", recs.len());
        }
        Err(e) => {
            eprintln!("alert-thresholds: {:#}", e);
            process::exit(1);
        }
    }
}
