use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::errors::PersistError;
use crate::ingestion::Paper;
use crate::llm::Analysis;

/// Constant `source` label written with every row.
pub const SOURCE_LABEL: &str = "Harvard DASH";

/// One row of the destination table, serialized as the PostgREST JSON body.
/// `ai_findings` and `ai_keywords` are JSON-encoded arrays inside string
/// columns, matching the table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRow {
    pub paper_id: String,
    pub title: String,
    pub authors: String,
    pub published_date: Option<String>,
    pub link: String,
    pub summary: String,
    pub ai_topic: String,
    pub ai_findings: String,
    pub ai_methodology: String,
    pub ai_significance: String,
    pub ai_keywords: String,
    pub processed_at: String,
    pub source: String,
    pub metadata: serde_json::Value,
}

impl PaperRow {
    /// Assembles the row for one analyzed paper. The stored abstract is
    /// truncated, `processed_at` is stamped here, and the metadata object
    /// records how the row was produced (including whether the analysis is
    /// a placeholder).
    pub fn build(
        paper: &Paper,
        analysis: &Analysis,
        feed_url: &str,
        model: &str,
        summary_max_chars: usize,
    ) -> Result<Self, PersistError> {
        let mut metadata = serde_json::json!({
            "feed_url": feed_url,
            "processed_by": "paperscope",
            "ai_model": model,
        });
        if analysis.fallback {
            metadata["analysis_fallback"] = serde_json::Value::Bool(true);
        }

        Ok(Self {
            paper_id: paper.paper_id.clone(),
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            published_date: paper.published.map(|d| d.to_rfc3339()),
            link: paper.link.clone(),
            summary: truncate_chars(&paper.summary, summary_max_chars),
            ai_topic: analysis.topic.clone(),
            ai_findings: serde_json::to_string(&analysis.findings)?,
            ai_methodology: analysis.methodology.clone(),
            ai_significance: analysis.significance.clone(),
            ai_keywords: serde_json::to_string(&analysis.keywords)?,
            processed_at: Utc::now().to_rfc3339(),
            source: SOURCE_LABEL.to_string(),
            metadata,
        })
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// PostgREST-backed store for the destination table.
///
/// An upsert is a POST with `on_conflict=paper_id` and merge-duplicates
/// resolution, so re-processing a feed entry overwrites its row instead of
/// duplicating it.
pub struct PaperStore {
    endpoint: Url,
    service_key: String,
    client: reqwest::Client,
}

impl PaperStore {
    pub fn new(
        base_url: &str,
        service_key: impl Into<String>,
        table: &str,
        timeout_secs: u64,
    ) -> Result<Self, PersistError> {
        let endpoint = Url::parse(&format!(
            "{}/rest/v1/{}",
            base_url.trim_end_matches('/'),
            table
        ))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("Paperscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint,
            service_key: service_key.into(),
            client,
        })
    }

    /// Upserts one row, keyed on `paper_id`.
    pub async fn upsert(&self, row: &PaperRow) -> Result<(), PersistError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("on_conflict", "paper_id");

        let response = self
            .client
            .post(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PersistError::Auth(status));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistError::Api { status, body });
        }

        info!(paper_id = %row.paper_id, "row upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::UsageMetadata;

    fn sample_paper() -> Paper {
        Paper {
            paper_id: "urn:dash:1".to_string(),
            title: "A Paper".to_string(),
            link: "https://dash.harvard.edu/handle/1".to_string(),
            summary: "a".repeat(900),
            authors: "Alice Smith".to_string(),
            published: None,
        }
    }

    fn sample_analysis(fallback: bool) -> Analysis {
        Analysis {
            topic: "Astrophysics".to_string(),
            findings: vec!["f1".to_string(), "f2".to_string()],
            methodology: "Survey".to_string(),
            significance: "High".to_string(),
            keywords: vec!["k1".to_string()],
            fallback,
            usage: UsageMetadata::default(),
        }
    }

    #[test]
    fn build_truncates_summary_and_stamps_fields() {
        let row = PaperRow::build(
            &sample_paper(),
            &sample_analysis(false),
            "https://feed.example/rss",
            "gpt-3.5-turbo",
            500,
        )
        .unwrap();

        assert_eq!(row.paper_id, "urn:dash:1");
        assert_eq!(row.summary.chars().count(), 500);
        assert_eq!(row.source, SOURCE_LABEL);
        assert!(!row.processed_at.is_empty());
        assert_eq!(row.ai_findings, r#"["f1","f2"]"#);
        assert_eq!(row.ai_keywords, r#"["k1"]"#);
        assert_eq!(row.metadata["ai_model"], "gpt-3.5-turbo");
        assert_eq!(row.metadata["processed_by"], "paperscope");
        assert!(row.metadata.get("analysis_fallback").is_none());
    }

    #[test]
    fn build_marks_placeholder_analyses() {
        let row = PaperRow::build(
            &sample_paper(),
            &sample_analysis(true),
            "https://feed.example/rss",
            "gpt-3.5-turbo",
            500,
        )
        .unwrap();
        assert_eq!(row.metadata["analysis_fallback"], true);
    }

    #[test]
    fn store_rejects_invalid_base_url() {
        let err = PaperStore::new("not a url", "svc", "harvard_papers", 5);
        assert!(matches!(err, Err(PersistError::Url(_))));
    }
}
