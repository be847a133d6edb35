//! Raw scraped text -> typed fields.
//!
//! Every parser here degrades to `None` on malformed input so a missing or
//! garbled value stays absent in the record instead of becoming a zero.

use std::sync::LazyLock;

use regex::Regex;

/// CDN host serving the dealer's vehicle photos.
pub const CDN_HOST: &str = "d3n77ly3akjihy.cloudfront.net";

/// Render parameters the site appends to carousel images.
const RENDER_PARAMS: &str = "format=webp&width=3840&quality=50";

static NUMBER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]*").unwrap());

static CDN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://d3n77ly3akjihy\.cloudfront\.net/vehicles/[^"'\s)]+?\.(?:jpeg|jpg|png|webp)(?:\?[^"'\s)]*)?"#)
        .unwrap()
});

/// Decode NBSP variants and trim.
pub fn tidy_text(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace('\u{00A0}', " ")
        .trim()
        .to_string()
}

/// First number run in a price label: "AED 109,999" -> 109999.
pub fn parse_price(text: &str) -> Option<u64> {
    let cleaned = tidy_text(text);
    let m = NUMBER_RUN.find(&cleaned)?;
    m.as_str().replace(',', "").parse().ok()
}

/// Mileage label with a km marker: "59,000 km" -> 59000.
pub fn parse_mileage(text: &str) -> Option<u64> {
    let cleaned = tidy_text(text);
    if !cleaned.to_lowercase().contains("km") {
        return None;
    }
    let m = NUMBER_RUN.find(&cleaned)?;
    m.as_str().replace(',', "").parse().ok()
}

/// A bare plausible model year: exactly four digits.
pub fn parse_year(text: &str) -> Option<u16> {
    let cleaned = tidy_text(text);
    if cleaned.len() != 4 || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: u16 = cleaned.parse().ok()?;
    (1950..=2099).contains(&year).then_some(year)
}

/// Cylinder count shown as a single digit on the overview card.
pub fn parse_cylinders(text: &str) -> Option<u8> {
    let cleaned = tidy_text(text);
    if cleaned.len() != 1 {
        return None;
    }
    cleaned.parse().ok()
}

/// The remote service returns `year` as either a JSON number or a string.
pub fn year_from_json(value: &serde_json::Value) -> Option<u16> {
    match value {
        serde_json::Value::Number(n) => {
            let year = u16::try_from(n.as_u64()?).ok()?;
            (1950..=2099).contains(&year).then_some(year)
        }
        serde_json::Value::String(s) => parse_year(s),
        _ => None,
    }
}

/// Canonicalize a vehicle-photo URL.
///
/// Only the dealer CDN's `/vehicles/` images qualify; the render query
/// string is replaced with the site default so the same image dedupes no
/// matter which variant the DOM happened to expose.
pub fn clean_image_url(raw: &str) -> Option<String> {
    let url = tidy_text(raw);
    if !url.starts_with("https://") || !url.contains(CDN_HOST) || !url.contains("/vehicles/") {
        return None;
    }
    let path = url.split('?').next().unwrap_or(&url);
    Some(format!("{path}?{RENDER_PARAMS}"))
}

/// Scan free-form HTML/markdown for vehicle-photo URLs, first-seen order.
pub fn extract_cdn_image_urls(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for m in CDN_IMAGE.find_iter(text) {
        if let Some(clean) = clean_image_url(m.as_str()) {
            if !urls.contains(&clean) {
                urls.push(clean);
            }
        }
    }
    urls
}

/// Listing identifier: last path segment of the source URL, query stripped.
/// "https://albacars.ae/buy-used-cars/vehicle/9667-bmw-x2" -> "9667-bmw-x2".
pub fn listing_id_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_parses_common_forms() {
        assert_eq!(parse_price("AED 109,999"), Some(109_999));
        assert_eq!(parse_price("AED\u{00A0}109,999 (Exclusive of VAT)"), Some(109_999));
        assert_eq!(parse_price("Call us"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn mileage_requires_km_marker() {
        assert_eq!(parse_mileage("59,000 km"), Some(59_000));
        assert_eq!(parse_mileage("59,000"), None);
        assert_eq!(parse_mileage("km"), None);
    }

    #[test]
    fn year_rejects_junk() {
        assert_eq!(parse_year("2022"), Some(2022));
        assert_eq!(parse_year(" 2022 "), Some(2022));
        assert_eq!(parse_year("20222"), None);
        assert_eq!(parse_year("1776"), None);
        assert_eq!(parse_year("twenty"), None);
    }

    #[test]
    fn year_from_json_accepts_number_or_string() {
        assert_eq!(year_from_json(&serde_json::json!(2022)), Some(2022));
        assert_eq!(year_from_json(&serde_json::json!("2022")), Some(2022));
        assert_eq!(year_from_json(&serde_json::json!(null)), None);
        assert_eq!(year_from_json(&serde_json::json!(-3)), None);
    }

    #[test]
    fn cylinders_single_digit_only() {
        assert_eq!(parse_cylinders("4"), Some(4));
        assert_eq!(parse_cylinders("12"), None);
        assert_eq!(parse_cylinders("V8"), None);
    }

    #[test]
    fn image_urls_canonicalize_and_filter() {
        let with_params = "https://d3n77ly3akjihy.cloudfront.net/vehicles/abc/def.jpeg?format=webp&width=640&quality=10";
        let bare = "https://d3n77ly3akjihy.cloudfront.net/vehicles/abc/def.jpeg";
        let expected = "https://d3n77ly3akjihy.cloudfront.net/vehicles/abc/def.jpeg?format=webp&width=3840&quality=50";

        assert_eq!(clean_image_url(with_params).as_deref(), Some(expected));
        assert_eq!(clean_image_url(bare).as_deref(), Some(expected));
        assert_eq!(clean_image_url("https://example.com/car.jpeg"), None);
        assert_eq!(
            clean_image_url("https://d3n77ly3akjihy.cloudfront.net/logos/brand.png"),
            None
        );
    }

    #[test]
    fn cdn_scan_dedupes_query_variants() {
        let html = r#"<img src="https://d3n77ly3akjihy.cloudfront.net/vehicles/a/1.jpeg?format=webp&width=640&quality=10">
            <img src="https://d3n77ly3akjihy.cloudfront.net/vehicles/a/1.jpeg">
            <img src="https://d3n77ly3akjihy.cloudfront.net/vehicles/a/2.webp">
            <img src="https://cdn.other.net/vehicles/a/3.jpeg">"#;

        let urls = extract_cdn_image_urls(html);
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("/a/1.jpeg"));
        assert!(urls[1].contains("/a/2.webp"));
    }

    #[test]
    fn listing_id_is_last_path_segment() {
        assert_eq!(
            listing_id_from_url("https://albacars.ae/buy-used-cars/vehicle/9667-bmw-x2-xdrive-20i"),
            "9667-bmw-x2-xdrive-20i"
        );
        assert_eq!(
            listing_id_from_url("https://albacars.ae/buy-used-cars/vehicle/10194-volvo-xc40?src=list"),
            "10194-volvo-xc40"
        );
        assert_eq!(listing_id_from_url("https://albacars.ae/"), "albacars.ae");
    }
}
