//! Holds the rate snapshot the basket reads from and keeps it fresh.
//!
//! Until the first successful fetch the query serves
//! [`RateCatalog::fallback`]. A failed refetch keeps the previous snapshot and
//! only raises the error flag, which in turn shortens the refetch interval.

use super::util::with_retry;
use crate::core::cache::Cache;
use crate::core::config::RefetchConfig;
use crate::core::rates::{CurrencyConvertRateModel, MAIN_BASE_CURRENCY, RateCatalog, RatesProvider};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CACHE_KEY: &str = "convert-rates";

pub type RatesCache = dyn Cache<String, Vec<CurrencyConvertRateModel>>;

#[derive(Debug, Clone, PartialEq)]
pub struct RefetchPolicy {
    /// How long a fetched response is reused without asking the server.
    pub stale_time: Duration,
    pub interval: Duration,
    /// Refetch interval while the last refetch failed.
    pub error_interval: Duration,
    pub retries: usize,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for RefetchPolicy {
    fn default() -> Self {
        Self::from(&RefetchConfig::default())
    }
}

impl From<&RefetchConfig> for RefetchPolicy {
    fn from(config: &RefetchConfig) -> Self {
        Self {
            stale_time: config.stale_time(),
            interval: config.interval(),
            error_interval: config.error_interval(),
            retries: config.retries,
            retry_base_delay: config.retry_base_delay(),
            retry_max_delay: config.retry_max_delay(),
        }
    }
}

pub struct RatesQuery {
    provider: Arc<dyn RatesProvider>,
    cache: Arc<RatesCache>,
    policy: RefetchPolicy,
    snapshot: Arc<RateCatalog>,
    is_error: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl RatesQuery {
    pub fn new(provider: Arc<dyn RatesProvider>, cache: Arc<RatesCache>, policy: RefetchPolicy) -> Self {
        Self {
            provider,
            cache,
            policy,
            snapshot: Arc::new(RateCatalog::fallback()),
            is_error: false,
            updated_at: None,
        }
    }

    pub fn snapshot(&self) -> Arc<RateCatalog> {
        Arc::clone(&self.snapshot)
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Time the served rates were last fetched from the provider; `None`
    /// while on the fallback.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn refetch_interval(&self) -> Duration {
        if self.is_error {
            self.policy.error_interval
        } else {
            self.policy.interval
        }
    }

    /// Refreshes the snapshot and returns it.
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// returned for the caller to report.
    pub async fn refetch(&mut self) -> Result<Arc<RateCatalog>> {
        let key = CACHE_KEY.to_string();
        let (rates, fetched) = match self.cache.get(&key).await {
            Some(rates) => (rates, false),
            None => match self.fetch_with_retry().await {
                Ok(rates) => (rates, true),
                Err(e) => {
                    warn!(error = %e, "Failed to fetch convert rates, keeping previous snapshot");
                    self.is_error = true;
                    return Err(e);
                }
            },
        };

        let catalog = match RateCatalog::new(MAIN_BASE_CURRENCY, rates.clone()) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Received invalid convert rates, keeping previous snapshot");
                self.is_error = true;
                return Err(e).context("Received invalid convert rates");
            }
        };

        if fetched {
            self.cache
                .put(key, rates, Some(self.policy.stale_time))
                .await;
            self.updated_at = Some(Utc::now());
            info!(
                currencies = catalog.supported_currencies().len(),
                "Fetched convert rates"
            );
        } else {
            debug!("Reusing cached convert rates");
        }

        self.snapshot = Arc::new(catalog);
        self.is_error = false;
        Ok(self.snapshot())
    }

    async fn fetch_with_retry(&self) -> Result<Vec<CurrencyConvertRateModel>> {
        let provider = Arc::clone(&self.provider);
        with_retry(
            move || {
                let provider = Arc::clone(&provider);
                async move { provider.fetch_rates().await }
            },
            self.policy.retries,
            self.policy.retry_base_delay,
            self.policy.retry_max_delay,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::Staleness;
    use crate::store::MemoryCache;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockRatesProvider {
        calls: AtomicUsize,
        failures: usize,
        rates: Vec<CurrencyConvertRateModel>,
    }

    impl MockRatesProvider {
        fn new(failures: usize, rates: Vec<CurrencyConvertRateModel>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
                rates,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RatesProvider for MockRatesProvider {
        async fn fetch_rates(&self) -> Result<Vec<CurrencyConvertRateModel>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(anyhow!("connection refused"))
            } else {
                Ok(self.rates.clone())
            }
        }
    }

    fn live_rates() -> Vec<CurrencyConvertRateModel> {
        let now = Utc::now();
        [("USD", Decimal::ONE), ("EUR", Decimal::new(91, 2))]
            .into_iter()
            .map(|(quote, rate)| CurrencyConvertRateModel {
                base_currency: "USD".to_string(),
                quote_currency: quote.to_string(),
                convert_rate: rate,
                rate_at: Some(now),
            })
            .collect()
    }

    fn query(provider: Arc<MockRatesProvider>) -> RatesQuery {
        RatesQuery::new(
            provider,
            Arc::new(MemoryCache::<String, Vec<CurrencyConvertRateModel>>::new()),
            RefetchPolicy::default(),
        )
    }

    #[test]
    fn test_starts_with_fallback_snapshot() {
        let query = query(MockRatesProvider::new(0, live_rates()));
        assert_eq!(*query.snapshot(), RateCatalog::fallback());
        assert!(!query.is_error());
        assert!(query.updated_at().is_none());
        assert_eq!(query.refetch_interval(), Duration::from_secs(15 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_replaces_snapshot() {
        let provider = MockRatesProvider::new(2, live_rates());
        let mut query = query(Arc::clone(&provider));

        let catalog = query.refetch().await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert_eq!(catalog.get_rate("EUR").unwrap().convert_rate, Decimal::new(91, 2));
        assert!(!catalog.supports("UAH"));
        assert_eq!(catalog.staleness_status(["USD", "EUR"], Utc::now()), Staleness::Ok);
        assert!(!query.is_error());
        assert!(query.updated_at().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_reuses_response_within_stale_time() {
        let provider = MockRatesProvider::new(0, live_rates());
        let mut query = query(Arc::clone(&provider));

        query.refetch().await.unwrap();
        let fetched_at = query.updated_at();
        query.refetch().await.unwrap();
        assert_eq!(provider.calls(), 1);
        assert_eq!(query.updated_at(), fetched_at);

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        query.refetch().await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refetch_keeps_snapshot_and_flags_error() {
        let provider = MockRatesProvider::new(usize::MAX, live_rates());
        let mut query = query(Arc::clone(&provider));

        let result = query.refetch().await;

        assert_eq!(result.unwrap_err().to_string(), "connection refused");
        assert_eq!(provider.calls(), 5);
        assert!(query.is_error());
        assert_eq!(*query.snapshot(), RateCatalog::fallback());
        assert_eq!(query.refetch_interval(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_rates_are_rejected() {
        let rates = live_rates().into_iter().skip(1).collect();
        let provider = MockRatesProvider::new(0, rates);
        let mut query = query(Arc::clone(&provider));

        let result = query.refetch().await;

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Received invalid convert rates")
        );
        assert!(query.is_error());
        assert_eq!(*query.snapshot(), RateCatalog::fallback());
    }

    #[test]
    fn test_policy_from_config() {
        let config = RefetchConfig {
            interval_secs: 60,
            retries: 1,
            ..RefetchConfig::default()
        };
        let policy = RefetchPolicy::from(&config);
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert_eq!(policy.retries, 1);
        assert_eq!(policy.error_interval, Duration::from_secs(10));
        assert_eq!(policy.retry_max_delay, Duration::from_secs(150));
    }
}
