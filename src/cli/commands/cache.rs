//! Cache command - inspect or reset the output cache

use crate::cache::{CacheDocument, ContentCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::PackResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> PackResult<()> {
    let cache = ContentCache::new(config.cache_path());

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format).await,
        CacheAction::Clear => clear(&cache).await,
    }
}

async fn list_entries(cache: &ContentCache, format: OutputFormat) -> PackResult<()> {
    let document = cache.entries().await;

    match format {
        OutputFormat::Table => print_table(cache, &document),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
        OutputFormat::Plain => {
            for fingerprint in document.keys() {
                println!("{}", fingerprint);
            }
        }
    }

    Ok(())
}

fn print_table(cache: &ContentCache, document: &CacheDocument) {
    let ctx = UiContext::detect();

    if document.is_empty() {
        ui::step_info(&ctx, &format!("No cache records in {}", cache.path().display()));
        return;
    }

    println!("{:<14} {}", style("JOB").bold(), style("OUTPUTS").bold());
    println!("{}", "-".repeat(60));

    for (fingerprint, entries) in document {
        let outputs: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        println!(
            "{:<14} {}",
            &fingerprint[..fingerprint.len().min(12)],
            outputs.join(", ")
        );
    }

    println!();
    println!(
        "Total: {} record(s) in {}",
        document.len(),
        cache.path().display()
    );
}

async fn clear(cache: &ContentCache) -> PackResult<()> {
    let ctx = UiContext::detect();
    let removed = cache.clear().await?;
    ui::step_ok(
        &ctx,
        &format!(
            "Removed {} record(s) from {}",
            removed,
            cache.path().display()
        ),
    );
    Ok(())
}
