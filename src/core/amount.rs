//! Parsing of user-typed amounts.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a loosely formatted amount such as `"1 234,5"` or `"$12.30"`.
///
/// Empty input yields `None`. Otherwise the first comma is read as the
/// decimal separator and every character other than digits and dots is
/// dropped; if nothing parseable remains, `default` is returned.
pub fn parse_decimal(input: &str, default: Decimal) -> Option<Decimal> {
    if input.is_empty() {
        return None;
    }

    let cleaned: String = input
        .replacen(',', ".", 1)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return Some(default);
    }
    Some(Decimal::from_str(&cleaned).unwrap_or(default))
}

/// Whether `input` reads as a non-negative number once digit grouping
/// whitespace is dropped and a decimal comma becomes a dot. Anything else
/// is altered by [`parse_decimal`].
pub fn is_exact_amount(input: &str) -> bool {
    let normalized: String = input
        .replacen(',', ".", 1)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    Decimal::from_str(&normalized).is_ok_and(|amount| !amount.is_sign_negative())
}
