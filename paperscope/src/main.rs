/*
paperscope - scheduled ingestion job main.rs
One invocation performs one run: fetch the DASH feed, analyze each paper
with the configured chat-completion API, upsert the results into Supabase.
The schedule trigger (cron or similar) lives outside this binary.
*/

use anyhow::Result;
use clap::Parser;
use common::{Config, Secrets};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use paperscope::pipeline;

#[derive(Parser, Debug)]
#[command(name = "paperscope", about = "Harvard DASH -> AI analysis -> Supabase ingestion job")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the feed URL from the config
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Override the per-run paper cap from the config
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Analyze papers but skip the database write
    #[arg(long)]
    dry_run: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths: packaged defaults, then an optional override
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let mut config = Config::load_with_defaults(
        default_path.exists().then_some(default_path.as_path()),
        override_path.as_deref(),
    )
    .await?;
    info!(defaults = ?default_path, overrides = ?override_path, "configuration loaded");

    if let Some(url) = args.feed_url {
        config.feed.url = Some(url);
    }
    if let Some(limit) = args.limit {
        config.feed.max_papers_per_run = Some(limit);
    }

    // Secrets are validated together, before any network client exists.
    let secrets = match Secrets::from_env() {
        Ok(secrets) => secrets,
        Err(e) => {
            error!(error = %e, "environment validation failed");
            return Err(e.into());
        }
    };
    info!("environment validated");

    // Per-item failures are reported in the summary but leave the exit
    // status at zero; only configuration and feed-level errors are fatal.
    let summary = pipeline::run_pipeline(&config, &secrets, args.dry_run).await?;

    info!(
        fetched = summary.fetched,
        stored = summary.stored,
        failed = summary.failed,
        dry_run = args.dry_run,
        "run complete"
    );
    Ok(())
}
