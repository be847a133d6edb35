use std::str::FromStr;
use std::time::Duration;

/// How a listing page gets turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Remote structured-extraction service.
    Firecrawl,
    /// Local headless-Chrome session with selector pulls.
    Browser,
    /// Firecrawl pass for specs, then a browser pass for images and the
    /// inspection report, merged by the assembler.
    Combined,
}

impl FromStr for ExtractionMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firecrawl" => Ok(Self::Firecrawl),
            "browser" => Ok(Self::Browser),
            "combined" | "both" => Ok(Self::Combined),
            other => anyhow::bail!("unknown extraction method: {other}"),
        }
    }
}

/// Bounded retry for one listing: attempts are capped and spaced by a
/// fixed backoff, stated here instead of ad hoc sleep loops.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Carousel walker limits: how many "next" triggers before giving up, and
/// how long to let newly revealed images attach after each trigger.
#[derive(Debug, Clone, Copy)]
pub struct WalkerConfig {
    pub max_steps: usize,
    pub settle: Duration,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            settle: Duration::from_millis(1500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_known_names() {
        assert_eq!(
            "firecrawl".parse::<ExtractionMethod>().unwrap(),
            ExtractionMethod::Firecrawl
        );
        assert_eq!(
            "Browser".parse::<ExtractionMethod>().unwrap(),
            ExtractionMethod::Browser
        );
        assert_eq!(
            "both".parse::<ExtractionMethod>().unwrap(),
            ExtractionMethod::Combined
        );
        assert!("carrier-pigeon".parse::<ExtractionMethod>().is_err());
    }
}
