//! Core business logic: rates, the conversion basket and shared plumbing

pub mod amount;
pub mod basket;
pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use basket::{ConversionBasket, CurrencyConvRow};
pub use error::Error;
pub use rates::{CurrencyConvertRateModel, RateCatalog, RatesProvider, Staleness};
