use super::ui;
use crate::core::config::AppConfig;
use crate::core::{ConversionBasket, RateCatalog};
use crate::providers::RatesQuery;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Converts `amount` of `from` into `to`, or into the configured currencies
/// when `to` is empty.
pub async fn run(
    query: &mut RatesQuery,
    config: &AppConfig,
    amount: &str,
    from: &str,
    to: &[String],
) -> Result<()> {
    let catalog = super::fetch_rates(query).await;
    let basket = convert(config, catalog, amount, from, to)?;
    let base = basket.current_base();
    println!(
        "{} {:.2} {}\n",
        ui::style_text("Converting", ui::StyleType::Label),
        base.amount,
        base.currency
    );
    println!("{}", basket.display_as_table(Utc::now()));
    Ok(())
}

fn convert(
    config: &AppConfig,
    catalog: Arc<RateCatalog>,
    amount: &str,
    from: &str,
    to: &[String],
) -> Result<ConversionBasket> {
    let amount = super::read_amount(amount).ok_or_else(|| anyhow!("An amount is required"))?;
    let from = from.trim().to_uppercase();
    if !catalog.supports(&from) {
        anyhow::bail!("Unsupported currency: {}", from);
    }

    let targets: &[String] = if to.is_empty() { &config.currencies } else { to };
    let mut basket = super::build_basket(config, catalog, targets)?;
    if !basket.contains(&from) {
        basket.add_row(&from)?;
    }
    basket
        .update_amount(&from, amount)
        .with_context(|| format!("Failed to convert {amount} {from}"))?;

    debug!(%amount, %from, rows = basket.rows().len(), "Converted amount");
    Ok(basket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn row_amount(basket: &ConversionBasket, currency: &str) -> Decimal {
        basket
            .rows()
            .iter()
            .find(|r| r.currency == currency)
            .map(|r| r.amount)
            .unwrap()
    }

    #[test]
    fn test_convert_into_given_currencies() {
        let config = AppConfig::default();
        let catalog = Arc::new(RateCatalog::fallback());
        let to = vec!["usd".to_string(), "uah".to_string()];

        let basket = convert(&config, catalog, "75", "gbp", &to).unwrap();

        let currencies: Vec<_> = basket.rows().iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(currencies, vec!["USD", "UAH", "GBP"]);
        assert_eq!(basket.current_base().currency, "GBP");
        assert_eq!(row_amount(&basket, "GBP"), Decimal::new(75, 0));
        assert_eq!(row_amount(&basket, "USD").round_dp(10), Decimal::new(100, 0));
        assert_eq!(row_amount(&basket, "UAH").round_dp(10), Decimal::new(4171, 0));
    }

    #[test]
    fn test_convert_uses_configured_currencies() {
        let config = AppConfig {
            currencies: vec!["EUR".to_string()],
            ..AppConfig::default()
        };
        let basket = convert(&config, Arc::new(RateCatalog::fallback()), "10", "USD", &[]).unwrap();

        assert_eq!(basket.rows().len(), 2);
        assert_eq!(row_amount(&basket, "EUR"), Decimal::new(86, 1));
    }

    #[test]
    fn test_convert_rejects_bad_input() {
        let config = AppConfig::default();
        let catalog = Arc::new(RateCatalog::fallback());

        let unsupported = convert(&config, Arc::clone(&catalog), "10", "XXX", &[]);
        assert!(unsupported.unwrap_err().to_string().contains("Unsupported currency"));

        let empty = convert(&config, catalog, "", "EUR", &[]);
        assert!(empty.unwrap_err().to_string().contains("amount is required"));
    }

    #[test]
    fn test_convert_reads_reinterpreted_amount() {
        let config = AppConfig::default();
        let to = vec!["USD".to_string()];

        let basket = convert(&config, Arc::new(RateCatalog::fallback()), "-5", "EUR", &to).unwrap();
        assert_eq!(row_amount(&basket, "EUR"), Decimal::new(5, 0));
    }
}
