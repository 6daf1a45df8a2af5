use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Format an amount for display with two fractional digits.
/// Example: 50 -> "50.00", -12.5 -> "-12.50"
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Parse a decimal string into an exact amount.
/// Example: "50.00" -> 50.00, "12.5" -> 12.5, "100" -> 100
pub fn parse_amount(input: &str) -> Result<Decimal, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }
    Decimal::from_str(input).map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount format: {0}")]
    InvalidFormat(String),
}
