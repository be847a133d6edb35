use crate::models::Listing;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for all single-page extractors.
/// The batch orchestrator only sees this, so extraction methods can be
/// swapped (or stubbed in tests) without touching the run loop.
#[async_trait]
pub trait ListingExtractor: Send + Sync {
    /// Extract one listing from its detail-page URL.
    /// Fields that cannot be located are left absent, not defaulted.
    async fn extract(&self, url: &str) -> Result<Listing>;

    /// Short name of the extraction method, for logs.
    fn method_name(&self) -> &'static str;
}
