//! Conversion rates relative to the main base currency

use super::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

/// Currency every catalog rate is quoted against.
pub const MAIN_BASE_CURRENCY: &str = "USD";

/// One quote currency's rate relative to the main base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyConvertRateModel {
    pub base_currency: String,
    pub quote_currency: String,
    pub convert_rate: Decimal,
    #[serde(default)]
    pub rate_at: Option<DateTime<Utc>>,
}

/// How old the oldest relevant rate observation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Staleness {
    Ok,
    SlightlyOutdated,
    JustOutdated,
    VeryOutdated,
}

impl Staleness {
    pub fn from_age(age: Duration) -> Self {
        if age > Duration::hours(48) {
            Staleness::VeryOutdated
        } else if age > Duration::hours(24) {
            Staleness::JustOutdated
        } else if age > Duration::hours(4) {
            Staleness::SlightlyOutdated
        } else {
            Staleness::Ok
        }
    }
}

impl Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Staleness::Ok => "up to date",
                Staleness::SlightlyOutdated => "slightly outdated",
                Staleness::JustOutdated => "outdated",
                Staleness::VeryOutdated => "very outdated",
            }
        )
    }
}

/// Immutable snapshot of the rates returned by one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RateCatalog {
    main_base: usize,
    rates: Vec<CurrencyConvertRateModel>,
}

impl RateCatalog {
    /// Builds a catalog, rejecting data that breaks the rate invariants.
    ///
    /// Every entry must be quoted against `main_base` with a positive rate,
    /// quote currencies must be unique, and the main base must be listed
    /// with a rate of exactly one. Entries keep their given order.
    pub fn new(main_base: &str, rates: Vec<CurrencyConvertRateModel>) -> Result<Self> {
        let mut seen = HashSet::new();
        for rate in &rates {
            if rate.base_currency != main_base {
                return Err(Error::InvalidOperation(format!(
                    "rate for {} is quoted against {}, expected {}",
                    rate.quote_currency, rate.base_currency, main_base
                )));
            }
            if rate.convert_rate <= Decimal::ZERO {
                return Err(Error::InvalidRate {
                    currency: rate.quote_currency.clone(),
                    rate: rate.convert_rate,
                });
            }
            if !seen.insert(rate.quote_currency.as_str()) {
                return Err(Error::InvalidOperation(format!(
                    "duplicate rate for {}",
                    rate.quote_currency
                )));
            }
        }

        let main_index = rates
            .iter()
            .position(|r| r.quote_currency == main_base)
            .ok_or_else(|| Error::NotFound(main_base.to_string()))?;
        let own = &rates[main_index];
        if own.convert_rate != Decimal::ONE {
            return Err(Error::InvalidRate {
                currency: own.quote_currency.clone(),
                rate: own.convert_rate,
            });
        }

        Ok(Self {
            main_base: main_index,
            rates,
        })
    }

    /// Built-in snapshot used until the first successful fetch.
    ///
    /// Its observation times are the Unix epoch, so the staleness status
    /// reports very outdated data right away.
    pub fn fallback() -> Self {
        let rates = [
            ("USD", Decimal::ONE),
            ("EUR", Decimal::new(86, 2)),
            ("GBP", Decimal::new(75, 2)),
            ("PLN", Decimal::new(37, 1)),
            ("UAH", Decimal::new(4171, 2)),
        ]
        .into_iter()
        .map(|(quote, rate)| CurrencyConvertRateModel {
            base_currency: MAIN_BASE_CURRENCY.to_string(),
            quote_currency: quote.to_string(),
            convert_rate: rate,
            rate_at: Some(DateTime::UNIX_EPOCH),
        })
        .collect();

        Self {
            main_base: 0,
            rates,
        }
    }

    fn find(&self, currency: &str) -> Option<&CurrencyConvertRateModel> {
        self.rates.iter().find(|r| r.quote_currency == currency)
    }

    pub fn supports(&self, currency: &str) -> bool {
        self.find(currency).is_some()
    }

    pub fn get_rate(&self, currency: &str) -> Result<&CurrencyConvertRateModel> {
        self.find(currency)
            .ok_or_else(|| Error::NotFound(currency.to_string()))
    }

    pub fn main_base_currency(&self) -> &CurrencyConvertRateModel {
        &self.rates[self.main_base]
    }

    pub fn supported_currencies(&self) -> &[CurrencyConvertRateModel] {
        &self.rates
    }

    /// Classifies the oldest observation among `currencies`.
    ///
    /// Unsupported codes are ignored and a rate without an observation time
    /// counts as observed at the Unix epoch.
    pub fn staleness_status<'a, I>(&self, currencies: I, now: DateTime<Utc>) -> Staleness
    where
        I: IntoIterator<Item = &'a str>,
    {
        let oldest = currencies
            .into_iter()
            .filter_map(|currency| self.find(currency))
            .map(|rate| rate.rate_at.unwrap_or(DateTime::UNIX_EPOCH))
            .min();

        match oldest {
            Some(observed_at) => Staleness::from_age(now - observed_at),
            None => Staleness::Ok,
        }
    }
}

#[async_trait]
pub trait RatesProvider: Send + Sync {
    async fn fetch_rates(&self) -> anyhow::Result<Vec<CurrencyConvertRateModel>>;
}
