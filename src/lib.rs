pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::CurrencyConvertRateModel;
use crate::core::config::AppConfig;
use crate::providers::query::RatesCache;
use crate::providers::{ApiRatesProvider, RatesQuery, RefetchPolicy};
use crate::store::MemoryCache;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rates,
    Convert {
        amount: String,
        from: String,
        to: Vec<String>,
    },
    Basket,
}

/// Builds the rate query described by `config`.
pub fn rates_query(config: &AppConfig) -> Result<RatesQuery> {
    let provider = ApiRatesProvider::new(config.api_base_url())?;
    let cache: Arc<RatesCache> =
        Arc::new(MemoryCache::<String, Vec<CurrencyConvertRateModel>>::new());
    Ok(RatesQuery::new(
        Arc::new(provider),
        cache,
        RefetchPolicy::from(&config.refetch),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("finnikacc starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let mut query = rates_query(&config)?;

    match command {
        AppCommand::Rates => cli::rates::run(&mut query).await,
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(&mut query, &config, &amount, &from, &to).await
        }
        AppCommand::Basket => cli::basket::run(&mut query, &config).await,
    }
}
