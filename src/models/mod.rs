use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize;

/// One vehicle listing scraped from a detail page.
///
/// A field the page did not expose stays `None`; absent is distinct from
/// zero everywhere in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub url: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub variant: Option<String>,
    pub year: Option<u16>,
    pub price_aed: Option<u64>,
    pub mileage_km: Option<u64>,
    pub stock_number: Option<String>,
    /// Attribute name -> value, keys taken from the site's own labels
    /// (warranty, service_contract, spec, cylinders, ...).
    pub specifications: BTreeMap<String, String>,
    pub key_features: Vec<String>,
    pub description: Option<String>,
    /// CDN image URLs in carousel discovery order.
    pub images: Vec<String>,
    pub inspection_report: Option<InspectionReport>,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    /// Empty record for a listing URL; populated by whichever extractor runs.
    pub fn new(url: &str) -> Self {
        Self {
            id: normalize::listing_id_from_url(url),
            url: url.to_string(),
            make: None,
            model: None,
            variant: None,
            year: None,
            price_aed: None,
            mileage_km: None,
            stock_number: None,
            specifications: BTreeMap::new(),
            key_features: Vec::new(),
            description: None,
            images: Vec::new(),
            inspection_report: None,
            scraped_at: Utc::now(),
        }
    }
}

/// Inspection report parsed from the "View full report" modal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionReport {
    /// Category (exterior, engine, electricals, suspension, interior)
    /// -> findings in page order.
    pub sections: BTreeMap<String, Vec<String>>,
    /// The dealer's inspection guarantee line, when shown.
    pub note: Option<String>,
}

/// Outcome of one listing in a batch run.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub url: String,
    pub listing: Option<Listing>,
    pub error: Option<String>,
}

/// Ordered per-item outcomes of one orchestrated run.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchResult {
    pub fn push_success(&mut self, url: &str, listing: Listing) {
        self.outcomes.push(ItemOutcome {
            url: url.to_string(),
            listing: Some(listing),
            error: None,
        });
    }

    pub fn push_failure(&mut self, url: &str, error: String) {
        self.outcomes.push(ItemOutcome {
            url: url.to_string(),
            listing: None,
            error: Some(error),
        });
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.listing.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn listings(&self) -> impl Iterator<Item = &Listing> {
        self.outcomes.iter().filter_map(|o| o.listing.as_ref())
    }

    /// (url, reason) for every failed item.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_deref().map(|e| (o.url.as_str(), e)))
    }
}

/// Metadata header of the output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionInfo {
    pub extracted_at: DateTime<Utc>,
    pub total_vehicles: usize,
    pub total_images: usize,
    pub source_website: String,
    pub scraper_version: String,
}

/// The merged JSON database written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDocument {
    pub extraction_info: ExtractionInfo,
    pub vehicles: Vec<Listing>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_counts_add_up() {
        let mut batch = BatchResult::default();
        batch.push_success("https://x/vehicle/1-a", Listing::new("https://x/vehicle/1-a"));
        batch.push_failure("https://x/vehicle/2-b", "timeout".to_string());
        batch.push_failure("https://x/vehicle/3-c", "no such page".to_string());

        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 2);
        assert_eq!(batch.succeeded() + batch.failed(), batch.outcomes.len());

        let reasons: Vec<_> = batch.failures().map(|(_, e)| e).collect();
        assert_eq!(reasons, vec!["timeout", "no such page"]);
    }

    #[test]
    fn absent_price_serializes_as_null_not_zero() {
        let listing = Listing::new("https://albacars.ae/buy-used-cars/vehicle/9667-bmw-x2");
        let json = serde_json::to_value(&listing).unwrap();

        assert_eq!(json["price_aed"], serde_json::Value::Null);
        assert_eq!(json["mileage_km"], serde_json::Value::Null);
        assert_ne!(json["price_aed"], serde_json::json!(0));
        assert_eq!(json["id"], "9667-bmw-x2");
    }
}
