pub mod finnikacc_api;
pub mod query;
pub mod util;

pub use finnikacc_api::ApiRatesProvider;
pub use query::{RatesQuery, RefetchPolicy};
