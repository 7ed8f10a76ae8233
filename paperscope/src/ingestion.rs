use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::errors::FetchError;

/// One candidate paper extracted from a feed entry.
///
/// `paper_id` is never empty for a yielded record; entries with neither an id
/// nor a link are skipped during collection.
#[derive(Debug, Clone)]
pub struct Paper {
    pub paper_id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub authors: String,
    pub published: Option<DateTime<Utc>>,
}

/// Fetches a feed from the given URL and parses it.
/// Single attempt: a failing feed aborts the run, so there is no point
/// retrying inside the fetcher.
pub async fn fetch_feed(url: &str, timeout_secs: u64) -> Result<Feed, FetchError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("Paperscope/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let bytes = response.bytes().await?;
    Ok(parser::parse(bytes.as_ref())?)
}

/// Maps at most `limit` feed entries to `Paper` records.
///
/// Field defaults mirror what the destination table expects: a missing title
/// becomes "Untitled", missing authors become "Unknown", everything else is
/// left empty.
pub fn collect_papers(feed: &Feed, limit: usize) -> Vec<Paper> {
    let mut papers = Vec::new();

    for entry in &feed.entries {
        if papers.len() >= limit {
            break;
        }

        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        // The entry id is the upsert key; fall back to the link when the
        // feed does not carry one.
        let paper_id = if entry.id.is_empty() {
            link.clone()
        } else {
            entry.id.clone()
        };
        if paper_id.is_empty() {
            debug!(title = ?entry.title.as_ref().map(|t| &t.content), "skipping entry without id or link");
            continue;
        }

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let authors: Vec<String> = entry
            .authors
            .iter()
            .map(|p| p.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        let authors = if authors.is_empty() {
            "Unknown".to_string()
        } else {
            authors.join(", ")
        };

        let summary = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .unwrap_or_default();

        papers.push(Paper {
            paper_id,
            title,
            link,
            summary,
            authors,
            published: entry.published,
        });
    }

    papers
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>DASH</title>
    <link>https://dash.harvard.edu</link>
    <description>Recent submissions</description>
    <item>
      <title>Neural Correlates of Memory</title>
      <link>https://dash.harvard.edu/handle/1</link>
      <guid>urn:dash:1</guid>
      <description>An abstract about memory.</description>
      <author>Alice Smith</author>
      <pubDate>Mon, 05 Feb 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Climate Feedback Loops</title>
      <link>https://dash.harvard.edu/handle/2</link>
      <guid>urn:dash:2</guid>
      <description>An abstract about climate.</description>
    </item>
    <item>
      <link>https://dash.harvard.edu/handle/3</link>
      <guid>urn:dash:3</guid>
      <description>No title on this one.</description>
    </item>
  </channel>
</rss>"#;

    fn fixture_feed() -> Feed {
        parser::parse(FIXTURE.as_bytes()).expect("fixture parses")
    }

    #[test]
    fn collects_all_entries_under_the_cap() {
        let papers = collect_papers(&fixture_feed(), 10);
        assert_eq!(papers.len(), 3);
        assert!(papers.iter().all(|p| !p.paper_id.is_empty()));
    }

    #[test]
    fn respects_the_per_run_cap() {
        let papers = collect_papers(&fixture_feed(), 2);
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Neural Correlates of Memory");
        assert_eq!(papers[1].title, "Climate Feedback Loops");
    }

    #[test]
    fn missing_author_defaults_to_unknown() {
        let papers = collect_papers(&fixture_feed(), 10);
        assert_eq!(papers[0].authors, "Alice Smith");
        assert_eq!(papers[1].authors, "Unknown");
    }

    #[test]
    fn missing_title_defaults_to_untitled() {
        let papers = collect_papers(&fixture_feed(), 10);
        assert_eq!(papers[2].title, "Untitled");
        assert_eq!(papers[2].summary, "No title on this one.");
    }

    #[test]
    fn published_date_is_parsed_when_present() {
        let papers = collect_papers(&fixture_feed(), 10);
        assert!(papers[0].published.is_some());
        assert!(papers[1].published.is_none());
    }
}
