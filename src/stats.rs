//! Vector store statistics.
//!
//! Provides a quick summary of what's uploaded: record count, embedding
//! dimension and a per-source breakdown. Used by `docmind stats`.

use anyhow::Result;
use docmind_core::store::VectorStore;

use crate::config::Config;
use crate::pipeline;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = pipeline::open_store(config).await?;

    let total = store.count().await?;
    let sources = store.source_counts().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("DocuMind: Store Stats");
    println!("=====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Dimensions:  {}", store.dims());
    println!();
    println!("  Records:     {}", total);
    println!("  Sources:     {}", sources.len());

    if !sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<40} {:>8}", "SOURCE", "CHUNKS");
        println!("  {}", "-".repeat(49));
        for (source, count) in &sources {
            println!("  {:<40} {:>8}", source, count);
        }
    }

    println!();

    store.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
