//! Browser-based extractor using headless Chrome.
//!
//! Detail pages render most fields client-side, so this path drives a real
//! tab: navigate, settle, capture the DOM, then pull fields with selectors.
//! The carousel walker and the inspection-report modal also run here since
//! both need live clicks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{InspectionReport, Listing};
use crate::normalize;
use crate::scrapers::carousel::{CarouselPage, CarouselWalker};
use crate::scrapers::selectors::vehicle_page;
use crate::scrapers::traits::ListingExtractor;
use crate::scrapers::types::WalkerConfig;

/// Section headings of the inspection-report modal.
const INSPECTION_SECTIONS: [&str; 5] =
    ["exterior", "engine", "electricals", "suspension", "interior"];

const ADVANCE_CAROUSEL_JS: &str = r#"
(() => {
    const btn = document.querySelector(
        'button[aria-label*="next" i], .carousel-next, .slick-next, button[aria-label*="slide"]'
    );
    if (!btn) return false;
    btn.click();
    return true;
})()
"#;

const OPEN_REPORT_JS: &str = r#"
(() => {
    const nodes = Array.from(document.querySelectorAll('button, a, div[role="button"]'));
    const btn = nodes.find(n => (n.textContent || '').includes('View full report'));
    if (!btn) return false;
    btn.click();
    return true;
})()
"#;

pub struct BrowserExtractor {
    browser: Browser,
    page_settle: Duration,
    walker: WalkerConfig,
    with_inspection: bool,
}

impl BrowserExtractor {
    /// Launch one headless Chrome for the duration of the run; dropped
    /// with the extractor.
    pub fn new(cfg: &Config) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            page_settle: cfg.page_settle,
            walker: cfg.walker,
            with_inspection: cfg.with_inspection,
        })
    }

    fn extract_listing(&self, url: &str) -> Result<Listing> {
        let tab = self.browser.new_tab()?;

        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;
        thread::sleep(self.page_settle);

        let html = page_html(&tab)?;
        let mut listing = parse_vehicle_page(&html, url);

        // Walk the carousel for lazily attached photos.
        let mut carousel = TabCarousel { tab: &tab };
        let walked = CarouselWalker::new(self.walker).collect(&mut carousel);
        for image in walked {
            if !listing.images.contains(&image) {
                listing.images.push(image);
            }
        }

        if self.with_inspection {
            listing.inspection_report = self.extract_inspection(&tab);
        }

        info!(
            id = %listing.id,
            images = listing.images.len(),
            features = listing.key_features.len(),
            inspection = listing.inspection_report.is_some(),
            "Browser extraction complete"
        );

        Ok(listing)
    }

    /// Open the "View full report" modal and parse its sections.
    /// Any failure here degrades to `None`; the listing still counts.
    fn extract_inspection(&self, tab: &Arc<Tab>) -> Option<InspectionReport> {
        let opened = match tab.evaluate(OPEN_REPORT_JS, false) {
            Ok(result) => result.value == Some(serde_json::Value::Bool(true)),
            Err(e) => {
                warn!(error = %e, "Could not evaluate report-button click");
                false
            }
        };

        if !opened {
            debug!("'View full report' control not found");
            return None;
        }

        thread::sleep(self.page_settle);

        let body_text = match tab.evaluate("document.body.innerText", false) {
            Ok(result) => result.value.and_then(|v| v.as_str().map(str::to_string))?,
            Err(e) => {
                warn!(error = %e, "Could not read modal text");
                return None;
            }
        };

        let sections = parse_inspection_sections(&body_text);
        if sections.is_empty() {
            debug!("Report modal opened but no sections parsed");
            return None;
        }

        let note = body_text
            .lines()
            .map(str::trim)
            .find(|l| l.contains("three thorough inspections"))
            .map(str::to_string);

        Some(InspectionReport { sections, note })
    }
}

#[async_trait]
impl ListingExtractor for BrowserExtractor {
    async fn extract(&self, url: &str) -> Result<Listing> {
        self.extract_listing(url)
    }

    fn method_name(&self) -> &'static str {
        "browser"
    }
}

/// Live-tab view of the image carousel for the walker.
struct TabCarousel<'a> {
    tab: &'a Arc<Tab>,
}

impl CarouselPage for TabCarousel<'_> {
    fn advance(&mut self) -> Result<bool> {
        let result = self.tab.evaluate(ADVANCE_CAROUSEL_JS, false)?;
        Ok(result.value == Some(serde_json::Value::Bool(true)))
    }

    fn visible_images(&mut self) -> Result<Vec<String>> {
        let html = page_html(self.tab)?;
        Ok(collect_images(&Html::parse_document(&html)))
    }
}

/// Current DOM as a string.
fn page_html(tab: &Arc<Tab>) -> Result<String> {
    let result = tab.evaluate("document.documentElement.outerHTML", false)?;
    result
        .value
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|html| !html.is_empty())
        .context("Page returned empty HTML")
}

/// Pull every located field out of a captured detail page. Missing nodes
/// leave the field absent.
fn parse_vehicle_page(html: &str, url: &str) -> Listing {
    let document = Html::parse_document(html);
    let mut listing = Listing::new(url);

    // Title: "Volvo XC40 T4 Momentum" -> make / model / variant.
    if let Some(title_el) = document.select(&vehicle_page::TITLE).next() {
        let title = normalize::tidy_text(&title_el.text().collect::<String>());
        let mut words = title.split_whitespace();
        listing.make = words.next().map(str::to_string);
        listing.model = words.next().map(str::to_string);
        let variant = words.collect::<Vec<_>>().join(" ");
        if !variant.is_empty() {
            listing.variant = Some(variant);
        }
    }

    // Visible text as tokens, for label-based pulls.
    let tokens: Vec<String> = document
        .select(&vehicle_page::BODY)
        .next()
        .map(|body| {
            body.text()
                .map(normalize::tidy_text)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    // The asking price is the AED amount that is not a monthly installment.
    listing.price_aed = tokens
        .iter()
        .filter(|t| t.contains("AED") && !t.to_lowercase().contains("month"))
        .find_map(|t| normalize::parse_price(t));

    listing.stock_number = tokens.iter().enumerate().find_map(|(i, t)| {
        if let Some(rest) = t.strip_prefix("Stock no:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
            // Label and value split across elements.
            return tokens.get(i + 1).cloned();
        }
        None
    });

    // Car Overview cards: classify each value by its shape or label.
    for item in document.select(&vehicle_page::OVERVIEW_ITEM) {
        let text = normalize::tidy_text(&item.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        let lower = text.to_lowercase();

        if let Some(year) = normalize::parse_year(&text) {
            if listing.year.is_none() {
                listing.year = Some(year);
            }
        } else if let Some(km) = normalize::parse_mileage(&text) {
            if listing.mileage_km.is_none() {
                listing.mileage_km = Some(km);
            }
        } else if lower.contains("warranty") {
            listing.specifications.entry("warranty".into()).or_insert(text);
        } else if lower.contains("add-on") || lower.contains("service contract") {
            listing
                .specifications
                .entry("service_contract".into())
                .or_insert(text);
        } else if lower.contains("specs") {
            listing.specifications.entry("spec".into()).or_insert(text);
        } else if let Some(cylinders) = normalize::parse_cylinders(&text) {
            listing
                .specifications
                .entry("cylinders".into())
                .or_insert(cylinders.to_string());
        }
    }

    for el in document.select(&vehicle_page::FEATURE) {
        let feature = normalize::tidy_text(&el.text().collect::<String>());
        if feature.len() > 2 && !listing.key_features.contains(&feature) {
            listing.key_features.push(feature);
        }
    }

    listing.description = document
        .select(&vehicle_page::DESCRIPTION)
        .next()
        .map(|el| normalize::tidy_text(&el.text().collect::<String>()))
        .filter(|d| !d.is_empty());

    listing.images = collect_images(&document);

    listing
}

/// CDN vehicle photos currently in the DOM, document order, de-duplicated.
fn collect_images(document: &Html) -> Vec<String> {
    let mut images = Vec::new();
    for img in document.select(&vehicle_page::IMAGE) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if let Some(clean) = normalize::clean_image_url(src) {
            if !images.contains(&clean) {
                images.push(clean);
            }
        }
    }
    images
}

/// Split modal body text into category -> findings.
fn parse_inspection_sections(text: &str) -> BTreeMap<String, Vec<String>> {
    let mut sections: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let lower = line.to_lowercase();
        if INSPECTION_SECTIONS.contains(&lower.as_str()) {
            sections.entry(lower.clone()).or_default();
            current = Some(lower);
        } else if let Some(section) = &current {
            if line.len() > 5 {
                if let Some(findings) = sections.get_mut(section) {
                    findings.push(line.to_string());
                }
            }
        }
    }

    // Headings with no findings are navigation echoes, not report content.
    sections.retain(|_, findings| !findings.is_empty());
    sections
}
