/*!
common/src/lib.rs

Shared configuration types and environment validation for Paperscope.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default config file with an optional override
- Secrets, the four required environment variables, validated together
  before any network client is built
*/

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default Harvard DASH site-wide RSS feed.
pub const DEFAULT_FEED_URL: &str = "https://dash.harvard.edu/feed/rss_1.0/site";

/// Environment variable names for the four required secrets.
pub const ENV_AI_ENDPOINT: &str = "AZURE_AI_ENDPOINT";
pub const ENV_AI_KEY: &str = "AZURE_AI_KEY";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "SUPABASE_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

/// Feed polling configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL; defaults to the Harvard DASH site feed
    pub url: Option<String>,
    /// Upper bound on entries processed per run
    pub max_papers_per_run: Option<usize>,
    pub fetch_timeout_seconds: Option<u64>,
}

impl FeedConfig {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_FEED_URL)
    }

    pub fn max_papers(&self) -> usize {
        self.max_papers_per_run.unwrap_or(10)
    }

    pub fn fetch_timeout(&self) -> u64 {
        self.fetch_timeout_seconds.unwrap_or(10)
    }
}

/// Analysis (chat-completion) configuration section.
/// The endpoint and key are NOT here; they come from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub model: Option<String>,
    /// Character budget for paper text sent to the model
    pub max_text_chars: Option<usize>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

impl AnalysisConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("gpt-3.5-turbo")
    }

    pub fn max_text_chars(&self) -> usize {
        self.max_text_chars.unwrap_or(8000)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(800)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.3)
    }

    pub fn timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }
}

/// Destination table configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub table: Option<String>,
    /// Stored abstract is truncated to this many characters
    pub summary_max_chars: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl StorageConfig {
    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or("harvard_papers")
    }

    pub fn summary_max_chars(&self) -> usize {
        self.summary_max_chars.unwrap_or(500)
    }

    pub fn timeout(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = read_config_file(path.as_ref()).await?;
        Ok(toml::from_str(&data)?)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged key-by-key (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = read_config_file(path).await?;
            let value: toml::Value = toml::from_str(&data)?;
            merge_toml(&mut merged, value);
        }

        Ok(merged.try_into()?)
    }
}

async fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// The four required secrets, read from the environment.
///
/// Validation is all-or-nothing: every missing variable is reported at once,
/// and nothing network-facing is constructed until this succeeds.
#[derive(Debug, Clone)]
pub struct Secrets {
    /// Base URL of the OpenAI-compatible chat-completion endpoint
    pub ai_endpoint: String,
    pub ai_key: String,
    /// Supabase project URL (PostgREST lives under /rest/v1)
    pub supabase_url: String,
    /// Service-role key used for both apikey and bearer headers
    pub supabase_key: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |name: &str| match lookup(name) {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let secrets = Self {
            ai_endpoint: require(ENV_AI_ENDPOINT),
            ai_key: require(ENV_AI_KEY),
            supabase_url: require(ENV_SUPABASE_URL),
            supabase_key: require(ENV_SUPABASE_KEY),
        };

        if missing.is_empty() {
            Ok(secrets)
        } else {
            Err(ConfigError::MissingEnv(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn config_from_string_applies_defaults() {
        let toml = r#"
            [feed]
            max_papers_per_run = 3

            [analysis]
            model = "gpt-4o-mini"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.feed.max_papers(), 3);
        assert_eq!(cfg.feed.url(), DEFAULT_FEED_URL);
        assert_eq!(cfg.analysis.model(), "gpt-4o-mini");
        assert_eq!(cfg.analysis.max_text_chars(), 8000);
        assert_eq!(cfg.storage.table(), "harvard_papers");
        assert_eq!(cfg.storage.summary_max_chars(), 500);
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.feed.max_papers(), 10);
        assert_eq!(cfg.analysis.max_tokens(), 800);
        assert!((cfg.analysis.temperature() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn merge_override_wins_per_key() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [feed]
            url = "https://example.org/a.rss"
            max_papers_per_run = 10
        "#,
        )
        .unwrap();
        let over: toml::Value = toml::from_str(
            r#"
            [feed]
            max_papers_per_run = 2
        "#,
        )
        .unwrap();

        merge_toml(&mut base, over);
        let cfg: Config = base.try_into().unwrap();
        assert_eq!(cfg.feed.url(), "https://example.org/a.rss");
        assert_eq!(cfg.feed.max_papers(), 2);
    }

    #[test]
    fn secrets_report_all_missing_variables() {
        let env: HashMap<&str, &str> = HashMap::from([(ENV_AI_ENDPOINT, "https://ai.example")]);
        let err = Secrets::from_lookup(|name| env.get(name).map(|v| v.to_string()))
            .expect_err("should be missing");

        match err {
            ConfigError::MissingEnv(names) => {
                assert_eq!(names, vec![ENV_AI_KEY, ENV_SUPABASE_URL, ENV_SUPABASE_KEY]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn secrets_reject_blank_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_AI_ENDPOINT, "https://ai.example"),
            (ENV_AI_KEY, "   "),
            (ENV_SUPABASE_URL, "https://db.example"),
            (ENV_SUPABASE_KEY, "svc"),
        ]);
        let err = Secrets::from_lookup(|name| env.get(name).map(|v| v.to_string()))
            .expect_err("blank key should not validate");
        assert!(matches!(err, ConfigError::MissingEnv(names) if names == vec![ENV_AI_KEY]));
    }

    #[test]
    fn secrets_succeed_with_all_present() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_AI_ENDPOINT, "https://ai.example"),
            (ENV_AI_KEY, "ai-key"),
            (ENV_SUPABASE_URL, "https://db.example"),
            (ENV_SUPABASE_KEY, "svc"),
        ]);
        let secrets = Secrets::from_lookup(|name| env.get(name).map(|v| v.to_string()))
            .expect("all present");
        assert_eq!(secrets.ai_endpoint, "https://ai.example");
        assert_eq!(secrets.supabase_key, "svc");
    }
}
