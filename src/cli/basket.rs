use super::ui;
use crate::core::config::AppConfig;
use crate::core::{ConversionBasket, error};
use crate::providers::RatesQuery;
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  add <CUR>           add a currency to the basket
  remove <CUR>        remove a currency
  base <CUR>          recompute everything from the amount of <CUR>
  set <CUR> <AMOUNT>  type an amount into <CUR>
  list                currencies that can still be added
  show                print the basket
  refresh             refetch convert rates
  help                print this help
  quit                leave the session";

impl ConversionBasket {
    pub fn display_as_table(&self, now: DateTime<Utc>) -> String {
        let base = &self.current_base().currency;

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Amount"),
            ui::header_cell(&format!("Rate (per 1 {base})")),
            ui::header_cell(""),
        ]);

        for row in self.rows() {
            let mut markers = Vec::new();
            if row.is_current_base {
                markers.push("base");
            }
            if row.is_main_base {
                markers.push("main");
            }
            table.add_row(vec![
                Cell::new(&row.currency),
                ui::amount_cell(row.amount, row.is_current_base),
                ui::decimal_cell(row.conv_rate_current_base, 6),
                Cell::new(markers.join(", ")),
            ]);
        }

        format!(
            "{}\n\n{}: {}",
            table,
            ui::style_text("Rates", ui::StyleType::Label),
            ui::staleness_text(self.staleness(now))
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BasketCommand {
    Add(String),
    Remove(String),
    Base(String),
    Set(String, Decimal),
    List,
    Show,
    Refresh,
    Help,
    Quit,
}

fn next_currency<'a>(parts: &mut impl Iterator<Item = &'a str>, command: &str) -> Result<String> {
    parts
        .next()
        .map(str::to_uppercase)
        .ok_or_else(|| anyhow!("Missing currency for '{}'", command))
}

impl FromStr for BasketCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| anyhow!("Empty command"))?
            .to_lowercase();

        let command = match name.as_str() {
            "add" => BasketCommand::Add(next_currency(&mut parts, &name)?),
            "remove" | "rm" => BasketCommand::Remove(next_currency(&mut parts, &name)?),
            "base" => BasketCommand::Base(next_currency(&mut parts, &name)?),
            "set" => {
                let currency = next_currency(&mut parts, &name)?;
                let input: String = parts.collect();
                let amount = super::read_amount(&input)
                    .ok_or_else(|| anyhow!("Missing amount for '{}'", currency))?;
                BasketCommand::Set(currency, amount)
            }
            "list" | "ls" => BasketCommand::List,
            "show" => BasketCommand::Show,
            "refresh" => BasketCommand::Refresh,
            "help" | "?" => BasketCommand::Help,
            "quit" | "exit" | "q" => BasketCommand::Quit,
            other => bail!("Unknown command '{}', try 'help'", other),
        };
        Ok(command)
    }
}

/// Applies a basket-only command and returns the text to print.
pub fn apply(
    basket: &mut ConversionBasket,
    command: &BasketCommand,
    now: DateTime<Utc>,
) -> error::Result<String> {
    match command {
        BasketCommand::Add(currency) => {
            basket.add_row(currency)?;
        }
        BasketCommand::Remove(currency) => {
            basket.remove_row(currency)?;
        }
        BasketCommand::Base(currency) => {
            basket.set_current_base(currency)?;
        }
        BasketCommand::Set(currency, amount) => {
            basket.update_amount(currency, *amount)?;
        }
        BasketCommand::List => {
            let available = basket.available_currencies();
            return Ok(if available.is_empty() {
                "All supported currencies are in the basket".to_string()
            } else {
                format!("Available: {}", available.join(", "))
            });
        }
        BasketCommand::Help => return Ok(HELP.to_string()),
        BasketCommand::Show | BasketCommand::Refresh | BasketCommand::Quit => {}
    }
    Ok(basket.display_as_table(now))
}

async fn refresh(query: &mut RatesQuery, basket: &mut ConversionBasket) {
    let catalog = super::fetch_rates(query).await;
    if let Err(e) = basket.replace_catalog(catalog) {
        println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
    }
}

fn prompt() -> std::io::Result<()> {
    print!("{} ", ui::style_text(">", ui::StyleType::Subtle));
    std::io::stdout().flush()
}

/// Runs an interactive session on stdin until `quit` or end of input.
pub async fn run(query: &mut RatesQuery, config: &AppConfig) -> Result<()> {
    let catalog = super::fetch_rates(query).await;
    let mut basket = super::build_basket(config, catalog, &config.currencies)?;

    println!("{}", basket.display_as_table(Utc::now()));
    println!("{}", ui::style_text("Type 'help' for commands", ui::StyleType::Subtle));

    session(query, &mut basket, BufReader::new(tokio::io::stdin())).await
}

/// Reads commands from `input` until `quit` or end of input. Rates are
/// refetched whenever the query's interval elapses, whether or not commands
/// keep arriving; a manual refresh restarts the interval.
async fn session<R>(query: &mut RatesQuery, basket: &mut ConversionBasket, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let refetch_timer = tokio::time::sleep(query.refetch_interval());
    tokio::pin!(refetch_timer);

    loop {
        prompt()?;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match line.parse::<BasketCommand>() {
                    Ok(BasketCommand::Quit) => break,
                    Ok(BasketCommand::Refresh) => {
                        refresh(query, basket).await;
                        refetch_timer.as_mut().reset(Instant::now() + query.refetch_interval());
                        println!("{}", basket.display_as_table(Utc::now()));
                    }
                    Ok(command) => {
                        debug!(?command, "Applying basket command");
                        match apply(basket, &command, Utc::now()) {
                            Ok(output) => println!("{output}"),
                            Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
                        }
                    }
                    Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
                }
            }
            () = &mut refetch_timer => {
                info!("Refetch interval elapsed");
                println!();
                refresh(query, basket).await;
                refetch_timer.as_mut().reset(Instant::now() + query.refetch_interval());
            }
        }
    }

    println!();
    Ok(())
}
