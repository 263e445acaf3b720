use rust_decimal::{Decimal, RoundingStrategy};

/// Currency amounts carry two fraction digits.
pub const MONEY_SCALE: u32 = 2;

/// Round to two fraction digits, half away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount with exactly two fraction digits ("1020.00").
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = round2(amount);
    rounded.rescale(MONEY_SCALE);
    rounded.to_string()
}

/// Validate that an amount is positive and has at most two fraction digits.
pub fn validate_positive(amount: Decimal, field: &str) -> Result<(), String> {
    if amount <= Decimal::ZERO {
        return Err(format!("{} must be greater than zero", field));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        ));
    }
    Ok(())
}
