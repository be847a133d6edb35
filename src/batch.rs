//! Sequential batch orchestration over a list of listing URLs.

use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::models::{BatchResult, Listing};
use crate::scrapers::traits::ListingExtractor;
use crate::scrapers::types::RetryPolicy;

pub struct BatchRunner {
    delay: Duration,
    retry: RetryPolicy,
}

impl BatchRunner {
    pub fn new(delay: Duration, retry: RetryPolicy) -> Self {
        Self { delay, retry }
    }

    /// Run the extractor over every URL, one at a time, with the fixed
    /// inter-item delay. A failed item is recorded and the run continues.
    pub async fn run(&self, extractor: &dyn ListingExtractor, urls: &[String]) -> BatchResult {
        let total = urls.len();
        let mut batch = BatchResult::default();

        info!(total, method = extractor.method_name(), "Starting batch run");

        for (i, url) in urls.iter().enumerate() {
            info!(item = i + 1, total, url = %url, "Processing listing");

            match self.extract_with_retry(extractor, url).await {
                Ok(listing) => {
                    info!(id = %listing.id, "Listing extracted");
                    batch.push_success(url, listing);
                }
                Err(e) => {
                    error!(url = %url, error = %e, "Listing failed");
                    batch.push_failure(url, format!("{e:#}"));
                }
            }

            // Pace requests so the source is not hammered.
            if i + 1 < total {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            "Batch run finished"
        );
        for (url, reason) in batch.failures() {
            warn!(url, reason, "Failed item");
        }

        batch
    }

    async fn extract_with_retry(
        &self,
        extractor: &dyn ListingExtractor,
        url: &str,
    ) -> Result<Listing> {
        let mut last_err = None;

        for attempt in 1..=self.retry.max_attempts {
            match extractor.extract(url).await {
                Ok(listing) => return Ok(listing),
                Err(e) => {
                    warn!(
                        url,
                        attempt,
                        max = self.retry.max_attempts,
                        error = %e,
                        "Extraction attempt failed"
                    );
                    last_err = Some(e);
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("retry policy allowed no attempts")))
    }
}
