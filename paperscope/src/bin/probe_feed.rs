use common::DEFAULT_FEED_URL;
use paperscope::ingestion;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());

    println!("\n{}", "=".repeat(60));
    println!("Probing feed: {}", url);
    println!("{}", "=".repeat(60));

    match ingestion::fetch_feed(&url, 10).await {
        Ok(feed) => {
            println!("✓ Success!");
            println!("  Title: {:?}", feed.title.as_ref().map(|t| &t.content));
            println!("  Entries: {}", feed.entries.len());

            let papers = ingestion::collect_papers(&feed, 5);
            println!("\n  First {} papers:", papers.len());
            for (i, paper) in papers.iter().enumerate() {
                println!("    {}. {}", i + 1, paper.title);
                println!("       ID: {}", paper.paper_id);
                println!("       Authors: {}", paper.authors);
                println!("       Abstract: {} chars", paper.summary.len());
            }
        }
        Err(e) => {
            println!("✗ Failed: {}", e);
        }
    }
}
