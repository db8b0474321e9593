// 💵 Money - decimal amounts, never floats

use crate::error::{LedgerError, LedgerResult};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Amounts are arbitrary-precision decimals.
pub type Money = Decimal;

/// Amounts stored in a ledger carry at most this many decimal digits.
pub const MAX_DECIMALS: u32 = 2;

/// Width of the amount column in listing files.
pub const AMOUNT_WIDTH: usize = 14;

/// Returns true if `amount` needs no more than two decimal digits.
pub fn is_within_cents(amount: Money) -> bool {
    amount.normalize().scale() <= MAX_DECIMALS
}

/// Rejects amounts with more than two decimal digits.
pub fn ensure_cents(amount: Money) -> LedgerResult<Money> {
    if is_within_cents(amount) {
        Ok(amount)
    } else {
        Err(LedgerError::InvalidAmountFormat { amount })
    }
}

/// Formats with exactly two decimals.
pub fn format_amount(amount: Money) -> String {
    let mut amount = amount.round_dp(MAX_DECIMALS);
    amount.rescale(MAX_DECIMALS);
    amount.to_string()
}

pub fn parse_amount(text: &str) -> LedgerResult<Money> {
    Decimal::from_str(text.trim())
        .map_err(|e| LedgerError::parse("Amount", format!("{text:?}: {e}")))
}

pub fn sum(amounts: impl IntoIterator<Item = Money>) -> Money {
    amounts.into_iter().fold(Money::ZERO, |total, amount| total + amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cents_validation() {
        assert!(is_within_cents(dec!(12)));
        assert!(is_within_cents(dec!(-12.34)));
        assert!(is_within_cents(dec!(12.3400)));
        assert!(!is_within_cents(dec!(-12.3456)));

        let err = ensure_cents(dec!(0.001)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmountFormat { .. }));
    }

    #[test]
    fn test_format_amount_pads_to_two_decimals() {
        assert_eq!(format_amount(dec!(12)), "12.00");
        assert_eq!(format_amount(dec!(-120.9)), "-120.90");
        assert_eq!(format_amount(dec!(1000000.85)), "1000000.85");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("42.5").unwrap(), dec!(42.5));
        assert_eq!(parse_amount(" -12.00 ").unwrap(), dec!(-12));
        assert!(parse_amount("$12.5").is_err());
    }

    #[test]
    fn test_sum() {
        assert_eq!(sum([dec!(10), dec!(20), dec!(30)]), dec!(60));
        assert_eq!(sum(Vec::new()), Money::ZERO);
    }
}
