//! CSS selectors for the dealer's pages.
//!
//! Kept in one place so a site redesign only touches this file. When a
//! field stops parsing, capture the page HTML and update the selector here.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for the used-cars listing (search) page.
pub mod listing_page {
    use super::*;

    /// Links to individual vehicle detail pages.
    pub static VEHICLE_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(r#"a[href*="/buy-used-cars/vehicle/"]"#).unwrap());
}

/// Selectors for one vehicle's detail page.
pub mod vehicle_page {
    use super::*;

    /// Page title, "Volvo XC40 T4 Momentum".
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

    pub static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

    /// Car Overview card values (year, mileage, warranty, spec, cylinders).
    pub static OVERVIEW_ITEM: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            ".rounded-3xl .text-xs, \
             .rounded-3xl .text-sm",
        )
        .unwrap()
    });

    /// Key-feature rows.
    pub static FEATURE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".flex.items-center span:last-child").unwrap());

    /// About-section description block.
    pub static DESCRIPTION: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".vehicle-description, .description").unwrap());

    /// Every image; CDN filtering happens on the src attribute.
    pub static IMAGE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img[src]").unwrap());
}
