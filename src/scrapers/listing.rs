//! Vehicle URL discovery from the dealer's listing page.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info};

use crate::scrapers::selectors::listing_page;

/// Plain HTTP client for the listing page; detail pages need rendering,
/// but the search page links are present in the initial markup.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .context("Failed to create HTTP client")
}

/// Fetch the listing page and pull up to `cap` vehicle detail URLs.
pub async fn fetch_vehicle_urls(
    client: &Client,
    listing_url: &str,
    base_url: &str,
    cap: usize,
) -> Result<Vec<String>> {
    debug!("Fetching listing page: {listing_url}");

    let response = client
        .get(listing_url)
        .send()
        .await
        .context("Failed to fetch listing page")?;

    if !response.status().is_success() {
        anyhow::bail!("Listing page returned status {}", response.status());
    }

    let html = response
        .text()
        .await
        .context("Failed to read listing page body")?;

    let mut urls = extract_vehicle_urls(&html, base_url);
    urls.truncate(cap);
    info!("Found {} vehicle URLs on listing page", urls.len());

    Ok(urls)
}

/// Select detail-page links, absolutize, and de-duplicate keeping
/// first-seen order.
pub fn extract_vehicle_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = base_url.trim_end_matches('/');

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for el in document.select(&listing_page::VEHICLE_LINK) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let clean = href.split('?').next().unwrap_or(href);
        let full = if clean.starts_with("http") {
            clean.to_string()
        } else {
            format!("{base}{clean}")
        };
        if seen.insert(full.clone()) {
            urls.push(full);
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_absolutized_unique_urls_in_order() {
        let html = r#"
            <a href="/buy-used-cars/vehicle/10194-volvo-xc40?src=grid">Volvo</a>
            <a href="/buy-used-cars/vehicle/10193-gmc-sierra">GMC</a>
            <a href="/buy-used-cars/vehicle/10194-volvo-xc40">Volvo again</a>
            <a href="https://albacars.ae/buy-used-cars/vehicle/10192-bmw-x5">BMW</a>
            <a href="/financing">Financing</a>
        "#;

        let urls = extract_vehicle_urls(html, "https://albacars.ae");

        assert_eq!(
            urls,
            vec![
                "https://albacars.ae/buy-used-cars/vehicle/10194-volvo-xc40",
                "https://albacars.ae/buy-used-cars/vehicle/10193-gmc-sierra",
                "https://albacars.ae/buy-used-cars/vehicle/10192-bmw-x5",
            ]
        );
    }

    #[test]
    fn empty_page_yields_no_urls() {
        assert!(extract_vehicle_urls("<html><body></body></html>", "https://albacars.ae").is_empty());
    }
}
