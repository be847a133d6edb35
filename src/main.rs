mod batch;
mod config;
mod models;
mod normalize;
mod scrapers;
mod store;

use anyhow::{Context, Result};
use tracing::{info, warn, Level};

use batch::BatchRunner;
use config::Config;
use models::BatchResult;
use scrapers::types::ExtractionMethod;
use scrapers::{BrowserExtractor, FirecrawlExtractor};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🚗 Car Scout - Alba Cars UAE extractor");
    info!("======================================");

    let cfg = Config::from_env()?;

    let urls = load_urls(&cfg).await?;
    if urls.is_empty() {
        warn!("No listing URLs to process");
    }
    info!(
        "Processing {} listings with the {:?} method",
        urls.len(),
        cfg.method
    );

    let runner = BatchRunner::new(cfg.delay, cfg.retry);
    let mut batches: Vec<BatchResult> = Vec::new();

    match cfg.method {
        ExtractionMethod::Firecrawl => {
            let extractor = FirecrawlExtractor::new(&cfg.firecrawl_api_url, cfg.firecrawl_key()?)?;
            batches.push(runner.run(&extractor, &urls).await);
        }
        ExtractionMethod::Browser => {
            let extractor = BrowserExtractor::new(&cfg)?;
            batches.push(runner.run(&extractor, &urls).await);
        }
        ExtractionMethod::Combined => {
            // Specs from the remote service first, then a browser pass for
            // carousel images and the inspection report; the assembler
            // merges the two per listing.
            let firecrawl = FirecrawlExtractor::new(&cfg.firecrawl_api_url, cfg.firecrawl_key()?)?;
            batches.push(runner.run(&firecrawl, &urls).await);

            let browser = BrowserExtractor::new(&cfg)?;
            batches.push(runner.run(&browser, &urls).await);
        }
    }

    let succeeded: usize = batches.iter().map(|b| b.succeeded()).sum();
    let failed: usize = batches.iter().map(|b| b.failed()).sum();
    info!("✅ Extraction passes done: {succeeded} succeeded, {failed} failed");

    let vehicles = store::assemble(&batches);

    for (i, vehicle) in vehicles.iter().enumerate() {
        println!(
            "{}. {} {} ({})",
            i + 1,
            vehicle.make.as_deref().unwrap_or("?"),
            vehicle.model.as_deref().unwrap_or("?"),
            vehicle.id
        );
        if let Some(price) = vehicle.price_aed {
            println!("   Price: AED {price}");
        }
        if let Some(km) = vehicle.mileage_km {
            println!("   Mileage: {km} km");
        }
        println!("   Images: {}", vehicle.images.len());
        println!();
    }

    store::write_database(&cfg.output_file, vehicles, &cfg.base_url)?;
    info!("💾 Saved database to {}", cfg.output_file.display());

    Ok(())
}

/// Listing URLs from the configured file, or discovered from the listing
/// page when no file is given.
async fn load_urls(cfg: &Config) -> Result<Vec<String>> {
    if let Some(file) = &cfg.urls_file {
        let raw = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read URL list {}", file.display()))?;

        let mut urls: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        urls.truncate(cfg.max_vehicles);

        info!("Loaded {} listing URLs from {}", urls.len(), file.display());
        Ok(urls)
    } else {
        let client = scrapers::listing::build_client()?;
        scrapers::listing::fetch_vehicle_urls(&client, &cfg.listing_url, &cfg.base_url, cfg.max_vehicles)
            .await
    }
}
