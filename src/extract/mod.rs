//! Extraction interfaces for declared sources.
//!
//! Extractors turn one source into its complete list of content records.
//! They are invoked concurrently across sources, have no side effects beyond
//! returning data, and never write to shared state. Partial results are not
//! supported: a successful extraction is the full record set for that source
//! at that point in time.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::retry::RetryPolicy;
use crate::domain::{ContentRecord, Source};

// Re-export the HTTP extractor
pub use http::HttpExtractor;

/// Extraction failure, attributable to its source.
///
/// Transient failures (timeouts, connection resets, HTTP 5xx/429) are retried
/// internally by [`extract_with_retry`]; permanent failures (malformed or
/// unavailable source) surface immediately.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("transient extraction failure for source {ordinal}: {message}")]
    Transient { ordinal: u32, message: String },

    #[error("permanent extraction failure for source {ordinal}: {message}")]
    Permanent { ordinal: u32, message: String },
}

impl ExtractError {
    /// Ordinal of the source this failure belongs to
    pub fn ordinal(&self) -> u32 {
        match self {
            Self::Transient { ordinal, .. } | Self::Permanent { ordinal, .. } => *ordinal,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Trait for source extractors
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable extractor name
    fn name(&self) -> &str;

    /// Produce the complete record set for one source
    async fn extract(&self, source: &Source) -> Result<Vec<ContentRecord>, ExtractError>;
}

/// Run one extraction with transient-failure retries.
///
/// Permanent failures and retry-budget exhaustion both propagate to the
/// caller; how they are handled (abort vs. skip with warning) is the
/// runner's failure-mode decision, not ours.
pub async fn extract_with_retry<E: Extractor + ?Sized>(
    extractor: &E,
    source: &Source,
    policy: &RetryPolicy,
) -> Result<Vec<ContentRecord>, ExtractError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match extractor.extract(source).await {
            Ok(records) => {
                debug!(
                    ordinal = source.ordinal,
                    records = records.len(),
                    attempt,
                    "extraction complete"
                );
                return Ok(records);
            }
            Err(err) if err.is_transient() && policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    ordinal = source.ordinal,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "extraction failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
