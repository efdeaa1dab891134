use super::ui;
use crate::core::RateCatalog;
use crate::providers::RatesQuery;
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Cell;

impl RateCatalog {
    pub fn display_as_table(&self, now: DateTime<Utc>) -> String {
        let main_base = &self.main_base_currency().quote_currency;

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Rate (per 1 {main_base})")),
            ui::header_cell("Observed at"),
        ]);

        for rate in self.supported_currencies() {
            let observed_at = rate.rate_at.map_or_else(
                || Cell::new("N/A"),
                |at| Cell::new(at.format("%Y-%m-%d %H:%M UTC")),
            );
            table.add_row(vec![
                Cell::new(&rate.quote_currency),
                ui::decimal_cell(rate.convert_rate, 4),
                observed_at,
            ]);
        }

        let currencies = self
            .supported_currencies()
            .iter()
            .map(|rate| rate.quote_currency.as_str());
        format!(
            "{}\n\n{}\n\n{}: {}",
            ui::style_text("Convert rates", ui::StyleType::Title),
            table,
            ui::style_text("Status", ui::StyleType::Label),
            ui::staleness_text(self.staleness_status(currencies, now))
        )
    }
}

pub async fn run(query: &mut RatesQuery) -> Result<()> {
    let catalog = super::fetch_rates(query).await;
    println!("{}", catalog.display_as_table(Utc::now()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_fallback_rates() {
        let output = RateCatalog::fallback().display_as_table(Utc::now());

        assert!(output.contains("Rate (per 1 USD)"));
        for currency in ["USD", "EUR", "GBP", "PLN", "UAH"] {
            assert!(output.contains(currency), "missing {currency}");
        }
        assert!(output.contains("41.7100"));
        assert!(output.contains("1970-01-01 00:00 UTC"));
        assert!(output.contains("very outdated"));
    }
}
