//! webguard-scan - analyse URLs from the command line
//!
//! Runs the same batch pipeline the server uses, without persistence,
//! and prints the finished job as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use webguard_core::constants;
use webguard_core::logic::analysis::{
    AnalysisWorker, FetchConfig, HeuristicExtractor, HttpFetcher, NullArtifactStore,
};
use webguard_core::logic::batch::{BatchConfig, BatchCoordinator, JobStore};
use webguard_core::logic::callback::{CallbackConfig, CallbackDispatcher};
use webguard_core::logic::threat::{rules, WeightConfig};

/// Fuse phishing signals for one or more URLs.
#[derive(Parser, Debug)]
#[command(name = "webguard-scan", version, about)]
struct Cli {
    /// URLs to analyse
    #[arg(required = true)]
    urls: Vec<String>,

    /// URLs analysed at once
    #[arg(long, env = "WEBGUARD_CONCURRENCY", default_value_t = constants::DEFAULT_CONCURRENCY_LIMIT)]
    concurrency: usize,

    /// Per-URL budget in seconds
    #[arg(long, env = "WEBGUARD_WORKER_TIMEOUT_SECS", default_value_t = constants::DEFAULT_WORKER_TIMEOUT_SECS)]
    timeout: u64,

    /// Weight of the text detector
    #[arg(long, env = "FUSION_WEIGHT_TEXT", default_value_t = rules::TEXT_WEIGHT)]
    text_weight: f64,

    /// Weight of the anomaly detector
    #[arg(long, env = "FUSION_WEIGHT_ANOMALY", default_value_t = rules::ANOMALY_WEIGHT)]
    anomaly_weight: f64,

    /// Weight of the rule detector
    #[arg(long, env = "FUSION_WEIGHT_RULES", default_value_t = rules::RULES_WEIGHT)]
    rules_weight: f64,

    /// POST the results here when done
    #[arg(long)]
    callback: Option<String>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    log::info!("Starting {} v{} scan", constants::APP_NAME, constants::APP_VERSION);

    let weights = WeightConfig::new(cli.text_weight, cli.anomaly_weight, cli.rules_weight)
        .context("invalid fusion weights")?;
    let fetcher = HttpFetcher::new(FetchConfig::default()).context("failed to build HTTP client")?;
    let dispatcher = CallbackDispatcher::new(CallbackConfig::default())
        .context("failed to build callback client")?;

    let worker = AnalysisWorker::new(
        Arc::new(fetcher),
        Arc::new(HeuristicExtractor::new()),
        Arc::new(NullArtifactStore),
        Arc::new(weights),
    );

    let coordinator = BatchCoordinator::new(
        Arc::new(JobStore::new()),
        Arc::new(worker),
        Arc::new(dispatcher),
        BatchConfig {
            worker_timeout: Duration::from_secs(cli.timeout),
            ..BatchConfig::default()
        },
    );

    let job_id = coordinator.submit(cli.urls, cli.callback, Some(cli.concurrency))?;

    let job = loop {
        let job = coordinator.get_job(&job_id)?;
        if job.is_completed() {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    // Callback delivery runs after completion; give it a moment to finish
    if job.callback_url.is_some() {
        for _ in 0..600 {
            let stats = coordinator.dispatcher().stats();
            if stats.delivered + stats.failed > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    let report = job.snapshot();
    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", output);

    log::info!("Scanned {} URLs, {} errors", report.total, report.failed);

    Ok(())
}
