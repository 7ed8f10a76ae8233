use thiserror::Error;

/// Feed-level failures. These abort the whole run: with no entries there is
/// nothing to process.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed fetch returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("feed is not parsable: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Per-paper analysis failures. The run loop logs these, counts the item as
/// failed and moves on; unparsable model *content* is not an error (the
/// analyzer falls back to a placeholder instead).
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("analysis request timed out after {0}s")]
    Timeout(u64),
    #[error("analysis API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed completion response: {0}")]
    Protocol(String),
}

/// Per-paper persistence failures. Also counted per item without stopping
/// the loop.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage authentication rejected ({0})")]
    Auth(reqwest::StatusCode),
    #[error("storage upsert failed ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid storage URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("row serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
