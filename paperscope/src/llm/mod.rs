use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AnalysisError;
use crate::ingestion::Paper;

pub mod remote;

/// Core trait for analysis providers. The trait only covers transport;
/// prompt construction and response parsing live in [`analyze_paper`] so
/// every provider shares them.
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Run one chat completion for the given request
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, AnalysisError>;
}

/// Request structure for a chat completion
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Optional system message, sent before the user prompt
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from a chat completion
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Structured analysis of one paper, as returned by the model.
///
/// All five fields default, mirroring how tolerant the consumer has to be of
/// models that omit keys. `fallback` marks records built by
/// [`placeholder_analysis`] rather than parsed from model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub methodology: String,
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(skip)]
    pub fallback: bool,
    #[serde(skip)]
    pub usage: UsageMetadata,
}

const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are an expert academic paper analyzer. Analyze this Harvard research paper and provide a structured response with:

1. Main Topic/Field (one phrase)
2. Key Findings (2-3 bullet points)
3. Methodology (brief description)
4. Significance (1-2 sentences)
5. Keywords (5-7 relevant terms)

Format your response as clean JSON with keys: topic, findings, methodology, significance, keywords";

/// Analyzes one paper: builds the prompt, runs the completion, parses the
/// five-field JSON out of the reply.
///
/// Transport and API failures propagate as errors. A reply that carries no
/// parsable JSON does NOT fail the item; it yields a placeholder analysis
/// with the `fallback` marker set, so the run keeps the paper with whatever
/// the model said stuffed into the text fields.
pub async fn analyze_paper<P: AnalysisProvider + ?Sized>(
    provider: &P,
    paper: &Paper,
    max_text_chars: usize,
) -> Result<Analysis, AnalysisError> {
    let request = LlmRequest {
        system: Some(ANALYSIS_SYSTEM_PROMPT.to_string()),
        prompt: paper_prompt(paper, max_text_chars),
        max_tokens: None,
        temperature: None,
        timeout_seconds: None,
    };

    let response = provider.generate(request).await?;

    let mut analysis = match parse_analysis(&response.content) {
        Some(analysis) => analysis,
        None => {
            warn!(
                paper_id = %paper.paper_id,
                "model reply carried no parsable JSON, storing placeholder analysis"
            );
            placeholder_analysis(&response.content)
        }
    };
    analysis.usage = response.usage;
    Ok(analysis)
}

/// Builds the user message: a metadata header plus the abstract, truncated
/// to the configured character budget.
fn paper_prompt(paper: &Paper, max_text_chars: usize) -> String {
    let summary: String = paper.summary.chars().take(max_text_chars).collect();
    let published = paper
        .published
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();

    format!(
        "Title: {}\nAuthors: {}\nPublished: {}\n\nSummary:\n{}\n",
        paper.title, paper.authors, published, summary
    )
}

fn parse_analysis(content: &str) -> Option<Analysis> {
    let json = extract_json_object(content)?;
    serde_json::from_str(&json).ok()
}

/// Fixed analysis used when the model reply is not parsable. The text fields
/// carry the head of the raw reply so a human can still see what came back.
fn placeholder_analysis(content: &str) -> Analysis {
    Analysis {
        topic: "Academic Research".to_string(),
        findings: vec![content.chars().take(200).collect()],
        methodology: "See summary".to_string(),
        significance: content.chars().take(300).collect(),
        keywords: vec![
            "research".to_string(),
            "Harvard".to_string(),
            "academic".to_string(),
        ],
        fallback: true,
        usage: UsageMetadata::default(),
    }
}

/// Helper to extract a JSON object from text that might wrap it in markdown
/// fences or surrounding prose.
pub fn extract_json_object(text: &str) -> Option<String> {
    // Fenced block first, preferring an explicit ```json fence
    for fence in ["```json", "```"] {
        if let Some(start) = text.find(fence) {
            let rest = &text[start + fence.len()..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }

    // Otherwise take the outermost brace pair
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}
