//! Remote structured-extraction client (Firecrawl-style `/v1/scrape`).
//!
//! The service renders the page and returns fields matching a supplied
//! JSON schema, so this extractor never touches the DOM itself.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::Listing;
use crate::normalize;
use crate::scrapers::traits::ListingExtractor;

pub struct FirecrawlExtractor {
    client: Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ScrapeRequest {
    url: String,
    formats: Vec<&'static str>,
    extract: ExtractRequest,
}

#[derive(Debug, Serialize)]
struct ExtractRequest {
    schema: serde_json::Value,
    prompt: &'static str,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeData {
    extract: Option<VehicleExtract>,
    html: Option<String>,
}

/// Semi-structured result the service returns for one vehicle page.
/// Everything is optional; the service omits what it cannot find.
#[derive(Debug, Default, Deserialize)]
struct VehicleExtract {
    make: Option<String>,
    model: Option<String>,
    /// Number or string depending on what the page showed.
    year: Option<serde_json::Value>,
    price: Option<String>,
    mileage: Option<String>,
    warranty: Option<String>,
    service_contract: Option<String>,
    spec: Option<String>,
    cylinders: Option<String>,
    #[serde(default)]
    key_features: Vec<String>,
    description: Option<String>,
    #[serde(default)]
    all_image_urls: Vec<String>,
}

const EXTRACTION_PROMPT: &str = "Extract vehicle information: make, model, year, \
price, mileage, warranty status, service contract, regional spec, cylinders, \
all key features as a list, the About-section description, and every vehicle \
image URL visible on the page.";

fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "make": {"type": "string"},
            "model": {"type": "string"},
            "year": {"type": "integer"},
            "price": {"type": "string"},
            "mileage": {"type": "string"},
            "warranty": {"type": "string"},
            "service_contract": {"type": "string"},
            "spec": {"type": "string"},
            "cylinders": {"type": "string"},
            "key_features": {"type": "array", "items": {"type": "string"}},
            "description": {"type": "string"},
            "all_image_urls": {"type": "array", "items": {"type": "string"}}
        }
    })
}

impl FirecrawlExtractor {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeData> {
        let request = ScrapeRequest {
            url: url.to_string(),
            formats: vec!["extract", "html"],
            extract: ExtractRequest {
                schema: extraction_schema(),
                prompt: EXTRACTION_PROMPT,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/scrape", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Extraction service request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Extraction service returned status {}", response.status());
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .context("Failed to decode extraction service response")?;

        if !body.success {
            anyhow::bail!(
                "Extraction service reported failure: {}",
                body.error.unwrap_or_else(|| "no error detail".to_string())
            );
        }

        Ok(body.data.unwrap_or_default())
    }
}

/// Normalize the service's semi-structured fields into a record. Fields
/// the service omitted stay absent.
fn into_listing(url: &str, data: ScrapeData) -> Listing {
    let mut listing = Listing::new(url);
    let extract = data.extract.unwrap_or_default();

    listing.make = extract.make.map(|s| normalize::tidy_text(&s)).filter(|s| !s.is_empty());
    listing.model = extract.model.map(|s| normalize::tidy_text(&s)).filter(|s| !s.is_empty());
    listing.year = extract.year.as_ref().and_then(normalize::year_from_json);
    listing.price_aed = extract.price.as_deref().and_then(normalize::parse_price);
    listing.mileage_km = extract.mileage.as_deref().and_then(normalize::parse_mileage);
    listing.description = extract
        .description
        .map(|s| normalize::tidy_text(&s))
        .filter(|s| !s.is_empty());

    // Site labels go into the spec map verbatim.
    let labelled = [
        ("warranty", extract.warranty),
        ("service_contract", extract.service_contract),
        ("spec", extract.spec),
        ("cylinders", extract.cylinders),
    ];
    for (label, value) in labelled {
        if let Some(v) = value {
            let v = normalize::tidy_text(&v);
            if !v.is_empty() {
                listing.specifications.insert(label.to_string(), v);
            }
        }
    }

    listing.key_features = extract
        .key_features
        .iter()
        .map(|f| normalize::tidy_text(f))
        .filter(|f| !f.is_empty())
        .collect();

    listing.images = extract
        .all_image_urls
        .iter()
        .filter_map(|u| normalize::clean_image_url(u))
        .collect();

    // Some responses only carry images inside the rendered HTML.
    if listing.images.is_empty() {
        if let Some(html) = &data.html {
            listing.images = normalize::extract_cdn_image_urls(html);
        }
    }

    listing
}

#[async_trait]
impl ListingExtractor for FirecrawlExtractor {
    async fn extract(&self, url: &str) -> Result<Listing> {
        debug!("Requesting structured extraction for {url}");
        let data = self.scrape(url).await?;

        if data.extract.is_none() {
            warn!("Service returned no structured fields for {url}");
        }

        let listing = into_listing(url, data);
        info!(
            id = %listing.id,
            images = listing.images.len(),
            features = listing.key_features.len(),
            "Structured extraction complete"
        );
        Ok(listing)
    }

    fn method_name(&self) -> &'static str {
        "firecrawl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_payload_normalizes_into_listing() {
        let payload = json!({
            "extract": {
                "make": "Volvo",
                "model": "XC40",
                "year": 2022,
                "price": "AED 109,999",
                "mileage": "59,000 km",
                "warranty": "Under Warranty",
                "service_contract": "Paid add-on",
                "spec": "GCC SPECS",
                "cylinders": "4",
                "key_features": ["Wireless Charger", "  ", "Cruise Control"],
                "description": "2022 Volvo XC40 in Blue.",
                "all_image_urls": [
                    "https://d3n77ly3akjihy.cloudfront.net/vehicles/a/1.jpeg?format=webp&width=640&quality=10",
                    "https://example.com/not-a-vehicle.jpeg"
                ]
            }
        });
        let data: ScrapeData = serde_json::from_value(payload).unwrap();

        let listing = into_listing("https://albacars.ae/buy-used-cars/vehicle/10194-volvo-xc40", data);

        assert_eq!(listing.id, "10194-volvo-xc40");
        assert_eq!(listing.make.as_deref(), Some("Volvo"));
        assert_eq!(listing.year, Some(2022));
        assert_eq!(listing.price_aed, Some(109_999));
        assert_eq!(listing.mileage_km, Some(59_000));
        assert_eq!(listing.key_features, vec!["Wireless Charger", "Cruise Control"]);
        assert_eq!(listing.specifications["spec"], "GCC SPECS");
        assert_eq!(listing.specifications["warranty"], "Under Warranty");
        assert_eq!(listing.images.len(), 1);
        assert!(listing.images[0].ends_with("format=webp&width=3840&quality=50"));
    }

    #[test]
    fn missing_extract_falls_back_to_html_image_scan() {
        let payload = json!({
            "html": "<img src=\"https://d3n77ly3akjihy.cloudfront.net/vehicles/b/2.jpeg\">"
        });
        let data: ScrapeData = serde_json::from_value(payload).unwrap();

        let listing = into_listing("https://albacars.ae/buy-used-cars/vehicle/9667-bmw-x2", data);

        assert_eq!(listing.price_aed, None);
        assert_eq!(listing.images.len(), 1);
        assert!(listing.images[0].contains("/b/2.jpeg"));
    }

    #[test]
    fn year_as_string_still_parses() {
        let payload = json!({ "extract": { "year": "2019" } });
        let data: ScrapeData = serde_json::from_value(payload).unwrap();

        let listing = into_listing("https://albacars.ae/buy-used-cars/vehicle/1-kia", data);

        assert_eq!(listing.year, Some(2019));
    }
}
