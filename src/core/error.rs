//! Errors raised by the rate catalog and the conversion basket.

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested change would break a basket or catalog invariant.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No rate is known for the currency.
    #[error("Currency not found: {0}")]
    NotFound(String),

    #[error("Invalid rate {rate} for currency {currency}")]
    InvalidRate { currency: String, rate: Decimal },

    #[error("Arithmetic overflow while converting amounts")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, Error>;
