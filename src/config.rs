use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::scrapers::types::{ExtractionMethod, RetryPolicy, WalkerConfig};

/// Run configuration, read once from the environment and passed into each
/// component at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub listing_url: String,
    /// Newline-separated listing URLs; when unset, URLs are discovered
    /// from the listing page.
    pub urls_file: Option<PathBuf>,
    pub output_file: PathBuf,
    pub method: ExtractionMethod,
    pub max_vehicles: usize,
    /// Fixed pause between listings.
    pub delay: Duration,
    /// Wait after navigation for client-side content to attach.
    pub page_settle: Duration,
    pub with_inspection: bool,
    pub retry: RetryPolicy,
    pub walker: WalkerConfig,
    pub firecrawl_api_url: String,
    pub firecrawl_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let method: ExtractionMethod = env_or("EXTRACT_METHOD", "browser").parse()?;

        let cfg = Self {
            base_url: env_or("ALBA_BASE_URL", "https://albacars.ae"),
            listing_url: env_or("ALBA_LISTING_URL", "https://albacars.ae/buy-used-cars-uae"),
            urls_file: env::var("URLS_FILE").ok().map(PathBuf::from),
            output_file: PathBuf::from(env_or("OUTPUT_FILE", "data/vehicles_database.json")),
            method,
            max_vehicles: parse_or("MAX_VEHICLES", 10)?,
            delay: Duration::from_millis(parse_or("DELAY_MS", 2000)?),
            page_settle: Duration::from_millis(parse_or("PAGE_SETTLE_MS", 5000)?),
            with_inspection: parse_or("WITH_INSPECTION", true)?,
            retry: RetryPolicy {
                max_attempts: parse_or("RETRY_MAX_ATTEMPTS", 3)?,
                backoff: Duration::from_millis(parse_or("RETRY_BACKOFF_MS", 2000)?),
            },
            walker: WalkerConfig {
                max_steps: parse_or("CAROUSEL_MAX_STEPS", 20)?,
                settle: Duration::from_millis(parse_or("CAROUSEL_SETTLE_MS", 1500)?),
            },
            firecrawl_api_url: env_or("FIRECRAWL_API_URL", "https://api.firecrawl.dev"),
            firecrawl_api_key: env::var("FIRECRAWL_API_KEY").ok(),
        };

        if matches!(
            cfg.method,
            ExtractionMethod::Firecrawl | ExtractionMethod::Combined
        ) && cfg.firecrawl_api_key.is_none()
        {
            anyhow::bail!(
                "FIRECRAWL_API_KEY must be set for the {:?} extraction method",
                cfg.method
            );
        }

        Ok(cfg)
    }

    pub fn firecrawl_key(&self) -> Result<&str> {
        self.firecrawl_api_key
            .as_deref()
            .context("FIRECRAWL_API_KEY is not set")
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Missing variable -> default; present but malformed -> error.
fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_defaults_when_unset_and_rejects_junk() {
        env::remove_var("CAR_SCOUT_TEST_UNSET");
        assert_eq!(parse_or::<usize>("CAR_SCOUT_TEST_UNSET", 7).unwrap(), 7);

        env::set_var("CAR_SCOUT_TEST_NUM", "12");
        assert_eq!(parse_or::<usize>("CAR_SCOUT_TEST_NUM", 7).unwrap(), 12);
        env::remove_var("CAR_SCOUT_TEST_NUM");

        env::set_var("CAR_SCOUT_TEST_BAD", "twelve");
        assert!(parse_or::<usize>("CAR_SCOUT_TEST_BAD", 7).is_err());
        env::remove_var("CAR_SCOUT_TEST_BAD");
    }
}
