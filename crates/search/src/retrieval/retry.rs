//! Timeout and retry wrapper for similarity-search collaborators

use super::{Chunk, SimilaritySearch};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use citerank_common::config::VectorStoreConfig;
use citerank_common::errors::{AppError, Result};
use citerank_common::metrics;
use std::time::Duration;
use tracing::warn;

/// Wraps a [`SimilaritySearch`] with a per-call timeout and capped
/// exponential backoff.
///
/// Only transient failures are retried, at most `max_retries` times.
pub struct RetryingSearch<S> {
    inner: S,
    timeout: Duration,
    max_retries: u32,
    policy: ExponentialBackoff,
}

impl<S: SimilaritySearch> RetryingSearch<S> {
    pub fn new(inner: S, timeout: Duration, max_retries: u32) -> Self {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(None)
            .build();

        Self { inner, timeout, max_retries, policy }
    }

    pub fn from_config(inner: S, config: &VectorStoreConfig) -> Self {
        Self::new(inner, Duration::from_secs(config.timeout_secs), config.max_retries)
    }

    /// Replace the backoff schedule
    pub fn with_backoff(mut self, policy: ExponentialBackoff) -> Self {
        self.policy = policy;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn attempt(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        match tokio::time::timeout(self.timeout, self.inner.search(query, k)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::CollaboratorTimeout {
                service: self.inner.name().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl<S: SimilaritySearch> SimilaritySearch for RetryingSearch<S> {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let mut attempt = 0u32;

        retry(self.policy.clone(), || {
            attempt += 1;
            let current = attempt;

            async move {
                self.attempt(query, k).await.map_err(|e| {
                    let kind = if matches!(e, AppError::CollaboratorTimeout { .. }) {
                        "timeout"
                    } else {
                        "unavailable"
                    };
                    metrics::record_collaborator_error(self.inner.name(), kind);

                    if e.is_transient() && current <= self.max_retries {
                        warn!(
                            service = self.inner.name(),
                            attempt = current,
                            max_retries = self.max_retries,
                            error = %e,
                            "Similarity search failed, retrying"
                        );
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::testing::FlakySearch;

    fn fast(inner: FlakySearch, max_retries: u32) -> RetryingSearch<FlakySearch> {
        RetryingSearch::new(inner, Duration::from_secs(1), max_retries).with_backoff(
            ExponentialBackoffBuilder::new()
                .with_initial_interval(Duration::from_millis(1))
                .with_max_interval(Duration::from_millis(5))
                .with_max_elapsed_time(None)
                .build(),
        )
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failure() {
        let search = fast(FlakySearch::new(1), 1);

        let chunks = search.search("q", 10).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(search.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries_plus_one_attempts() {
        let search = fast(FlakySearch::new(10), 2);

        let err = search.search("q", 10).await.unwrap_err();
        assert!(matches!(err, AppError::CollaboratorUnavailable { .. }));
        assert_eq!(search.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        struct Broken;

        #[async_trait]
        impl SimilaritySearch for Broken {
            async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Chunk>> {
                Err(AppError::Internal { message: "corrupt index".into() })
            }

            fn name(&self) -> &str {
                "broken"
            }
        }

        let search = RetryingSearch::new(Broken, Duration::from_secs(1), 3);
        let err = search.search("q", 5).await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_slow_collaborator_times_out() {
        struct Slow;

        #[async_trait]
        impl SimilaritySearch for Slow {
            async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Chunk>> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Vec::new())
            }

            fn name(&self) -> &str {
                "slow"
            }
        }

        let search = RetryingSearch::new(Slow, Duration::from_millis(10), 0);
        let err = search.search("q", 5).await.unwrap_err();
        match err {
            AppError::CollaboratorTimeout { service, timeout_ms } => {
                assert_eq!(service, "slow");
                assert_eq!(timeout_ms, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
