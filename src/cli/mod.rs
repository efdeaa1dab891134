pub mod basket;
pub mod convert;
pub mod rates;
pub mod setup;
pub mod ui;

use crate::core::amount::{is_exact_amount, parse_decimal};
use crate::core::basket::DEFAULT_AMOUNT;
use crate::core::config::AppConfig;
use crate::core::{ConversionBasket, RateCatalog};
use crate::providers::RatesQuery;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

/// Refetches rates behind a spinner. A failed fetch is reported and the
/// query's previous snapshot is returned instead.
pub async fn fetch_rates(query: &mut RatesQuery) -> Arc<RateCatalog> {
    let pb = ui::new_spinner("Fetching convert rates...");
    let result = query.refetch().await;
    pb.finish_and_clear();

    match result {
        Ok(catalog) => catalog,
        Err(e) => {
            let source = if query.updated_at().is_some() {
                "last fetched"
            } else {
                "built-in"
            };
            println!(
                "{}",
                ui::style_text(
                    &format!("Could not refresh rates ({e}); using {source} rates"),
                    ui::StyleType::Warning
                )
            );
            query.snapshot()
        }
    }
}

/// Warning shown when `parse_decimal` read `input` as something other than
/// what was typed, e.g. a dropped sign or unparseable text.
pub fn amount_warning(input: &str, parsed: Decimal) -> Option<String> {
    if is_exact_amount(input) {
        None
    } else {
        Some(format!("Read '{input}' as {parsed}"))
    }
}

/// Parses a typed amount, warning when the input had to be reinterpreted.
/// Unparseable text reads as zero; empty input yields `None`.
pub fn read_amount(input: &str) -> Option<Decimal> {
    let input = input.trim();
    let amount = parse_decimal(input, Decimal::ZERO)?;
    if let Some(message) = amount_warning(input, amount) {
        warn!(input, %amount, "Amount input was reinterpreted");
        println!("{}", ui::style_text(&message, ui::StyleType::Warning));
    }
    Some(amount)
}

/// Builds a basket holding the main base plus `currencies`. Codes the
/// catalog does not support are skipped with a warning.
pub fn build_basket<S: AsRef<str>>(
    config: &AppConfig,
    catalog: Arc<RateCatalog>,
    currencies: &[S],
) -> Result<ConversionBasket> {
    let amount = config.default_amount.unwrap_or(DEFAULT_AMOUNT);
    let mut basket = ConversionBasket::with_amount(catalog, amount)
        .context("Invalid default_amount in config")?;

    for currency in currencies {
        let currency = currency.as_ref().trim().to_uppercase();
        if basket.contains(&currency) {
            continue;
        }
        if !basket.catalog().supports(&currency) {
            warn!(%currency, "Skipping unsupported currency");
            println!(
                "{}",
                ui::style_text(
                    &format!("Skipping unsupported currency {currency}"),
                    ui::StyleType::Warning
                )
            );
            continue;
        }
        basket.add_row(&currency)?;
    }
    Ok(basket)
}
