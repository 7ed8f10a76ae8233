use anyhow::{Context, Result};
use common::{Config, Secrets};
use tracing::{error, info, warn};

use crate::ingestion;
use crate::llm::{self, remote::RemoteAnalysisProvider};
use crate::storage::{PaperRow, PaperStore};

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub stored: usize,
    pub failed: usize,
}

/// Executes one fetch → analyze → persist run.
///
/// Feed-level failure aborts with an error; an empty feed is a successful
/// no-op. Analysis or persistence failure for one paper is logged, counted
/// and does not stop the loop. With `dry_run` set, papers are analyzed but
/// nothing is written.
pub async fn run_pipeline(config: &Config, secrets: &Secrets, dry_run: bool) -> Result<RunSummary> {
    let feed_url = config.feed.url().to_string();

    info!(feed_url = %feed_url, "fetching feed");
    let feed = ingestion::fetch_feed(&feed_url, config.feed.fetch_timeout())
        .await
        .context("feed fetch failed")?;

    let papers = ingestion::collect_papers(&feed, config.feed.max_papers());
    if papers.is_empty() {
        warn!("no entries found in feed, nothing to process");
        return Ok(RunSummary::default());
    }
    info!(count = papers.len(), "collected papers from feed");

    let provider = RemoteAnalysisProvider::new(
        &secrets.ai_endpoint,
        &secrets.ai_key,
        config.analysis.model(),
    )
    .with_defaults(
        config.analysis.timeout(),
        config.analysis.max_tokens(),
        config.analysis.temperature(),
    );

    let store = PaperStore::new(
        &secrets.supabase_url,
        &secrets.supabase_key,
        config.storage.table(),
        config.storage.timeout(),
    )
    .context("invalid storage configuration")?;

    let mut summary = RunSummary {
        fetched: papers.len(),
        ..RunSummary::default()
    };

    for (i, paper) in papers.iter().enumerate() {
        info!(
            index = i + 1,
            total = papers.len(),
            title = %paper.title,
            "analyzing paper"
        );

        let analysis =
            match llm::analyze_paper(&provider, paper, config.analysis.max_text_chars()).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    error!(paper_id = %paper.paper_id, error = %e, "analysis failed");
                    summary.failed += 1;
                    continue;
                }
            };
        info!(
            paper_id = %paper.paper_id,
            topic = %analysis.topic,
            tokens = analysis.usage.total_tokens,
            "analysis complete"
        );

        if dry_run {
            info!(paper_id = %paper.paper_id, "dry run, skipping upsert");
            continue;
        }

        let row = match PaperRow::build(
            paper,
            &analysis,
            &feed_url,
            provider.model(),
            config.storage.summary_max_chars(),
        ) {
            Ok(row) => row,
            Err(e) => {
                error!(paper_id = %paper.paper_id, error = %e, "row assembly failed");
                summary.failed += 1;
                continue;
            }
        };

        match store.upsert(&row).await {
            Ok(()) => summary.stored += 1,
            Err(e) => {
                error!(paper_id = %paper.paper_id, error = %e, "upsert failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
