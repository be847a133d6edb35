//! Merging extraction passes and writing the JSON database.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::models::{BatchResult, DatabaseDocument, ExtractionInfo, Listing};

/// Fold batch results into one listing per identifier, first-seen order.
///
/// Passes are applied in invocation order; see [`merge_into`] for the
/// per-field rule.
pub fn assemble(batches: &[BatchResult]) -> Vec<Listing> {
    let mut order = Vec::new();
    let mut by_id: HashMap<String, Listing> = HashMap::new();

    for batch in batches {
        for listing in batch.listings() {
            match by_id.get_mut(&listing.id) {
                Some(existing) => merge_into(existing, listing.clone()),
                None => {
                    order.push(listing.id.clone());
                    by_id.insert(listing.id.clone(), listing.clone());
                }
            }
        }
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

/// Union of present fields, last write wins.
///
/// A field counts as present when it is `Some` or a non-empty collection;
/// an absent field in the later pass never erases an earlier value. The
/// specification map merges per key.
pub fn merge_into(base: &mut Listing, later: Listing) {
    if later.make.is_some() {
        base.make = later.make;
    }
    if later.model.is_some() {
        base.model = later.model;
    }
    if later.variant.is_some() {
        base.variant = later.variant;
    }
    if later.year.is_some() {
        base.year = later.year;
    }
    if later.price_aed.is_some() {
        base.price_aed = later.price_aed;
    }
    if later.mileage_km.is_some() {
        base.mileage_km = later.mileage_km;
    }
    if later.stock_number.is_some() {
        base.stock_number = later.stock_number;
    }
    if later.description.is_some() {
        base.description = later.description;
    }
    if !later.specifications.is_empty() {
        base.specifications.extend(later.specifications);
    }
    if !later.key_features.is_empty() {
        base.key_features = later.key_features;
    }
    if !later.images.is_empty() {
        base.images = later.images;
    }
    if later.inspection_report.is_some() {
        base.inspection_report = later.inspection_report;
    }
    base.scraped_at = later.scraped_at;
}

/// Build the document and write it in one call. Failure here is fatal to
/// the run; there is no partial-write recovery.
pub fn write_database(path: &Path, vehicles: Vec<Listing>, source_website: &str) -> Result<()> {
    let document = DatabaseDocument {
        extraction_info: ExtractionInfo {
            extracted_at: Utc::now(),
            total_vehicles: vehicles.len(),
            total_images: vehicles.iter().map(|v| v.images.len()).sum(),
            source_website: source_website.to_string(),
            scraper_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        vehicles,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(&document).context("Failed to serialize database")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        path = %path.display(),
        vehicles = document.extraction_info.total_vehicles,
        images = document.extraction_info.total_images,
        "Database saved"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id_slug: &str) -> Listing {
        Listing::new(&format!("https://albacars.ae/buy-used-cars/vehicle/{id_slug}"))
    }

    #[test]
    fn later_pass_supplies_missing_images() {
        let mut base = listing("10194-volvo-xc40");
        base.price_aed = Some(109_999);
        // Pass A saw no images.
        assert!(base.images.is_empty());

        let mut later = listing("10194-volvo-xc40");
        later.images = vec!["u1".to_string(), "u2".to_string()];

        merge_into(&mut base, later);

        assert_eq!(base.images, vec!["u1", "u2"]);
        // Absent fields in the later pass keep the earlier value.
        assert_eq!(base.price_aed, Some(109_999));
    }

    #[test]
    fn later_pass_wins_on_conflict() {
        let mut base = listing("1-car");
        base.price_aed = Some(100_000);
        base.specifications.insert("spec".into(), "US SPECS".into());

        let mut later = listing("1-car");
        later.price_aed = Some(95_000);
        later.specifications.insert("spec".into(), "GCC SPECS".into());
        later.specifications.insert("warranty".into(), "Under Warranty".into());

        merge_into(&mut base, later);

        assert_eq!(base.price_aed, Some(95_000));
        assert_eq!(base.specifications["spec"], "GCC SPECS");
        assert_eq!(base.specifications["warranty"], "Under Warranty");
    }

    #[test]
    fn assemble_keeps_identifiers_unique_in_first_seen_order() {
        let mut pass_a = BatchResult::default();
        let mut volvo = listing("10194-volvo-xc40");
        volvo.make = Some("Volvo".into());
        let url = volvo.url.clone();
        pass_a.push_success(&url, volvo);
        let bmw = listing("9667-bmw-x2");
        let url = bmw.url.clone();
        pass_a.push_success(&url, bmw);

        let mut pass_b = BatchResult::default();
        let mut volvo_again = listing("10194-volvo-xc40");
        volvo_again.images = vec!["u1".to_string()];
        let url = volvo_again.url.clone();
        pass_b.push_success(&url, volvo_again);

        let merged = assemble(&[pass_a, pass_b]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "10194-volvo-xc40");
        assert_eq!(merged[0].make.as_deref(), Some("Volvo"));
        assert_eq!(merged[0].images, vec!["u1"]);
        assert_eq!(merged[1].id, "9667-bmw-x2");
    }

    #[test]
    fn all_failed_batch_still_writes_a_valid_document() {
        let mut batch = BatchResult::default();
        for i in 0..3 {
            batch.push_failure(
                &format!("https://albacars.ae/buy-used-cars/vehicle/{i}-x"),
                "boom".to_string(),
            );
        }

        let vehicles = assemble(&[batch]);
        assert!(vehicles.is_empty());

        let path = std::env::temp_dir().join(format!(
            "car-scout-test-{}-empty.json",
            std::process::id()
        ));
        write_database(&path, vehicles, "https://albacars.ae").unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let doc: DatabaseDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc.extraction_info.total_vehicles, 0);
        assert!(doc.vehicles.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn document_header_counts_vehicles_and_images() {
        let mut car = listing("5-car");
        car.images = vec!["a".to_string(), "b".to_string()];

        let path = std::env::temp_dir().join(format!(
            "car-scout-test-{}-header.json",
            std::process::id()
        ));
        write_database(&path, vec![car], "https://albacars.ae").unwrap();

        let doc: DatabaseDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.extraction_info.total_vehicles, 1);
        assert_eq!(doc.extraction_info.total_images, 2);
        assert_eq!(doc.extraction_info.source_website, "https://albacars.ae");
        assert!(!doc.extraction_info.scraper_version.is_empty());

        let _ = fs::remove_file(&path);
    }
}
