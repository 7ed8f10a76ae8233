use chrono::Utc;
use paperscope::ingestion::Paper;
use paperscope::llm::{self, remote::RemoteAnalysisProvider};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let endpoint = std::env::var(common::ENV_AI_ENDPOINT)
        .expect("Set AZURE_AI_ENDPOINT to the chat-completion endpoint");
    let api_key = std::env::var(common::ENV_AI_KEY).expect("Set AZURE_AI_KEY");
    let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

    println!("\n{}", "=".repeat(60));
    println!("Probing analysis provider");
    println!("Endpoint: {}", endpoint);
    println!("Model: {}", model);
    println!("{}", "=".repeat(60));

    let provider = RemoteAnalysisProvider::new(&endpoint, &api_key, &model)
        .with_defaults(30, 800, 0.3);

    let paper = Paper {
        paper_id: "urn:probe:1".to_string(),
        title: "Ownership and Memory Safety Without Garbage Collection".to_string(),
        link: String::new(),
        summary: "We study a static ownership discipline that guarantees memory \
                  safety and data-race freedom without a runtime garbage collector. \
                  Using a corpus of systems software, we show that affine types and \
                  borrow tracking eliminate entire classes of defects while keeping \
                  runtime overhead indistinguishable from manual management."
            .to_string(),
        authors: "A. Researcher, B. Scholar".to_string(),
        published: Some(Utc::now()),
    };

    println!("\n[Probe] Analyzing: {}...", &paper.title[..40.min(paper.title.len())]);
    match llm::analyze_paper(&provider, &paper, 8000).await {
        Ok(analysis) => {
            println!("✓ Success!{}", if analysis.fallback { " (placeholder fallback)" } else { "" });
            println!("  Topic: {}", analysis.topic);
            println!("  Findings ({} items):", analysis.findings.len());
            for (i, finding) in analysis.findings.iter().enumerate() {
                println!("    {}. {}", i + 1, finding);
            }
            println!("  Methodology: {}", analysis.methodology);
            println!("  Significance: {}", analysis.significance);
            println!("  Keywords: {:?}", analysis.keywords);
            println!(
                "  Usage: {} tokens (prompt: {}, completion: {})",
                analysis.usage.total_tokens,
                analysis.usage.prompt_tokens,
                analysis.usage.completion_tokens
            );
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Probe completed");
    println!("{}", "=".repeat(60));
}
