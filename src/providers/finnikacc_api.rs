use crate::core::rates::{CurrencyConvertRateModel, RatesProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, instrument};

const CONVERT_RATES_ENDPOINT: &str = "/api-web-app/convert-rates";

/// Fetches the rate table served by the finnikacc web API.
pub struct ApiRatesProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ApiRatesProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("finnikacc/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl RatesProvider for ApiRatesProvider {
    #[instrument(name = "ConvertRatesFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_rates(&self) -> Result<Vec<CurrencyConvertRateModel>> {
        let url = format!("{}{}", self.base_url, CONVERT_RATES_ENDPOINT);
        debug!("Requesting convert rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for {}",
                response.status(),
                CONVERT_RATES_ENDPOINT
            ));
        }

        let text = response.text().await?;
        let rates: Vec<CurrencyConvertRateModel> = serde_json::from_str(&text).map_err(|e| {
            anyhow!(
                "Failed to parse JSON response for {}: {}",
                CONVERT_RATES_ENDPOINT,
                e
            )
        })?;

        debug!(count = rates.len(), "Received convert rates");
        Ok(rates)
    }
}
