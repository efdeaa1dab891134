//! The conversion basket: a set of currency rows kept proportional to the
//! row the user last typed an amount into.
//!
//! The first row is always the main base currency. Exactly one row is the
//! current base; every other row's amount is derived from it through the
//! rates of the shared [`RateCatalog`]. Each mutation computes a fresh row set
//! and commits it only when every step succeeded, so a rejected operation
//! never leaves the basket half-updated.

use super::error::{Error, Result};
use super::rates::{RateCatalog, Staleness};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Amount seeded into the main base row of a new basket.
pub const DEFAULT_AMOUNT: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyConvRow {
    pub currency: String,
    pub amount: Decimal,
    pub conv_rate_main_base: Decimal,
    pub conv_rate_current_base: Decimal,
    pub is_main_base: bool,
    pub is_current_base: bool,
}

impl CurrencyConvRow {
    fn new(currency: &str, amount: Decimal, rate: Decimal) -> Self {
        Self {
            currency: currency.to_string(),
            amount,
            conv_rate_main_base: rate,
            conv_rate_current_base: rate,
            is_main_base: false,
            is_current_base: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversionBasket {
    catalog: Arc<RateCatalog>,
    // rows[0] is the main base; it is created first and can never be removed
    rows: Vec<CurrencyConvRow>,
    // observation times of rates kept after the catalog stopped listing them
    carried_rate_at: HashMap<String, DateTime<Utc>>,
}

impl ConversionBasket {
    pub fn new(catalog: Arc<RateCatalog>) -> Self {
        let main = catalog.main_base_currency();
        let mut row = CurrencyConvRow::new(&main.quote_currency, DEFAULT_AMOUNT, Decimal::ONE);
        row.is_main_base = true;
        row.is_current_base = true;

        Self {
            rows: vec![row],
            catalog,
            carried_rate_at: HashMap::new(),
        }
    }

    /// Creates a basket whose main base row starts at `amount`.
    pub fn with_amount(catalog: Arc<RateCatalog>, amount: Decimal) -> Result<Self> {
        check_amount(amount)?;
        let mut basket = Self::new(catalog);
        basket.rows[0].amount = amount;
        Ok(basket)
    }

    pub fn rows(&self) -> &[CurrencyConvRow] {
        &self.rows
    }

    pub fn catalog(&self) -> &Arc<RateCatalog> {
        &self.catalog
    }

    pub fn main_base(&self) -> &CurrencyConvRow {
        &self.rows[0]
    }

    pub fn current_base(&self) -> &CurrencyConvRow {
        &self.rows[self.current_index()]
    }

    /// Supported currencies that are not yet in the basket, in catalog order.
    pub fn available_currencies(&self) -> Vec<&str> {
        self.catalog
            .supported_currencies()
            .iter()
            .map(|rate| rate.quote_currency.as_str())
            .filter(|currency| !self.contains(currency))
            .collect()
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.position(currency).is_some()
    }

    pub fn can_remove(&self, currency: &str) -> bool {
        currency != self.main_base().currency
    }

    pub fn add_row(&mut self, currency: &str) -> Result<&[CurrencyConvRow]> {
        if self.contains(currency) {
            return Err(Error::InvalidOperation(format!(
                "{currency} is already in the basket"
            )));
        }
        if !self.catalog.supports(currency) {
            return Err(Error::InvalidOperation(format!(
                "{currency} is not a supported currency"
            )));
        }

        let rate = self.catalog.get_rate(currency)?.convert_rate;
        let mut rows = self.rows.clone();
        rows.push(CurrencyConvRow::new(currency, Decimal::ZERO, rate));
        let current = self.current_index();
        self.commit(recompute(&rows, current)?);

        debug!(currency, "Added basket row");
        Ok(&self.rows)
    }

    /// Removes a row. A row that is not in the basket is ignored; removing the
    /// current base hands that role back to the main base.
    pub fn remove_row(&mut self, currency: &str) -> Result<&[CurrencyConvRow]> {
        if !self.can_remove(currency) {
            return Err(Error::InvalidOperation(format!(
                "{currency} is the main base currency and cannot be removed"
            )));
        }
        let Some(index) = self.position(currency) else {
            return Ok(&self.rows);
        };

        let mut rows = self.rows.clone();
        let removed = rows.remove(index);
        if removed.is_current_base {
            debug!(currency, "Removed current base, falling back to main base");
            rows = recompute(&rows, 0)?;
        }
        self.commit(rows);
        self.carried_rate_at.remove(currency);

        debug!(currency, "Removed basket row");
        Ok(&self.rows)
    }

    /// Makes `currency` the current base and recomputes every other row from
    /// its amount. Unknown currencies are ignored.
    pub fn set_current_base(&mut self, currency: &str) -> Result<&[CurrencyConvRow]> {
        let Some(index) = self.position(currency) else {
            return Ok(&self.rows);
        };
        self.commit(recompute(&self.rows, index)?);

        debug!(currency, "Set current base");
        Ok(&self.rows)
    }

    /// Stores `amount` on the row for `currency` and makes it the current base.
    pub fn update_amount(&mut self, currency: &str, amount: Decimal) -> Result<&[CurrencyConvRow]> {
        check_amount(amount)?;
        let Some(index) = self.position(currency) else {
            return Ok(&self.rows);
        };

        let mut rows = self.rows.clone();
        rows[index].amount = amount;
        self.commit(recompute(&rows, index)?);

        debug!(currency, %amount, "Updated amount");
        Ok(&self.rows)
    }

    /// Swaps in a refetched rate snapshot and recomputes from the current base.
    ///
    /// Rows whose currency the new snapshot no longer lists keep their
    /// previous rate along with its observation time.
    pub fn replace_catalog(&mut self, catalog: Arc<RateCatalog>) -> Result<&[CurrencyConvRow]> {
        let new_main = &catalog.main_base_currency().quote_currency;
        if *new_main != self.main_base().currency {
            return Err(Error::InvalidOperation(format!(
                "rates are quoted against {new_main}, basket main base is {}",
                self.main_base().currency
            )));
        }

        let mut rows = self.rows.clone();
        let mut carried_rate_at = HashMap::new();
        for row in rows.iter_mut().filter(|row| !row.is_main_base) {
            match catalog.get_rate(&row.currency) {
                Ok(rate) => row.conv_rate_main_base = rate.convert_rate,
                Err(_) => {
                    warn!(
                        currency = %row.currency,
                        "Rate missing from refreshed snapshot, keeping previous rate"
                    );
                    let observed_at = self
                        .rate_observed_at(&row.currency)
                        .unwrap_or(DateTime::UNIX_EPOCH);
                    carried_rate_at.insert(row.currency.clone(), observed_at);
                }
            }
        }
        let rows = recompute(&rows, self.current_index())?;

        self.catalog = catalog;
        self.carried_rate_at = carried_rate_at;
        self.commit(rows);
        debug!("Replaced rate catalog");
        Ok(&self.rows)
    }

    /// Staleness of the rates backing the rows currently in the basket,
    /// including rates carried over from an earlier snapshot.
    pub fn staleness(&self, now: DateTime<Utc>) -> Staleness {
        let oldest = self
            .rows
            .iter()
            .filter_map(|row| self.rate_observed_at(&row.currency))
            .min();

        match oldest {
            Some(observed_at) => Staleness::from_age(now - observed_at),
            None => Staleness::Ok,
        }
    }

    /// When the rate in use for `currency` was observed. A catalog rate
    /// without a timestamp counts as observed at the Unix epoch.
    fn rate_observed_at(&self, currency: &str) -> Option<DateTime<Utc>> {
        match self.catalog.get_rate(currency) {
            Ok(rate) => Some(rate.rate_at.unwrap_or(DateTime::UNIX_EPOCH)),
            Err(_) => self.carried_rate_at.get(currency).copied(),
        }
    }

    fn position(&self, currency: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.currency == currency)
    }

    fn current_index(&self) -> usize {
        self.rows
            .iter()
            .position(|row| row.is_current_base)
            .unwrap_or(0)
    }

    fn commit(&mut self, rows: Vec<CurrencyConvRow>) {
        self.rows = rows;
    }
}

fn check_amount(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::InvalidOperation(format!(
            "amount must not be negative, got {amount}"
        )));
    }
    Ok(())
}

/// Rebuilds `rows` with `rows[base]` as the current base.
fn recompute(rows: &[CurrencyConvRow], base: usize) -> Result<Vec<CurrencyConvRow>> {
    let base_rate = rows[base].conv_rate_main_base;
    let base_amount = rows[base].amount;

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let mut row = row.clone();
            if index == base {
                row.is_current_base = true;
                row.conv_rate_current_base = Decimal::ONE;
            } else {
                row.is_current_base = false;
                row.conv_rate_current_base = row
                    .conv_rate_main_base
                    .checked_div(base_rate)
                    .ok_or(Error::Overflow)?;
                row.amount = base_amount
                    .checked_mul(row.conv_rate_current_base)
                    .ok_or(Error::Overflow)?;
            }
            Ok(row)
        })
        .collect()
}
