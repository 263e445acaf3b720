// Property and example tests for BNPL schedules and late fees

use chrono::{Datelike, NaiveDate, Timelike, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use solartrust::core::money::round2;
use solartrust::core::ErrorKind;
use solartrust::modules::payments::models::TransactionType;
use solartrust::modules::payments::services::PaymentCalculator;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 12000 over 12 months with no downpayment is twelve rows of 1000.00
#[test]
fn test_even_schedule() {
    let plan = PaymentCalculator::build_schedule(dec!(12000), Decimal::ZERO, 12, day(2025, 11, 1)).unwrap();

    assert_eq!(plan.monthly_emi, dec!(1000.00));
    assert_eq!(plan.lines.len(), 12);
    assert!(plan.lines.iter().all(|l| l.amount == dec!(1000.00)));
}

#[test]
fn test_schedule_after_downpayment() {
    let plan = PaymentCalculator::build_schedule(dec!(10000), dec!(1000), 3, day(2025, 11, 1)).unwrap();

    assert_eq!(plan.financed_amount, dec!(9000));
    let amounts: Vec<Decimal> = plan.lines.iter().map(|l| l.amount).collect();
    assert_eq!(amounts, vec![dec!(3000.00), dec!(3000.00), dec!(3000.00)]);
}

#[test]
fn test_due_dates_are_end_of_day_month_steps() {
    let plan = PaymentCalculator::build_schedule(dec!(12000), Decimal::ZERO, 3, day(2025, 1, 31)).unwrap();

    let first = plan.lines[0].due_date;
    assert_eq!(first.date_naive(), day(2025, 2, 28));
    assert_eq!((first.hour(), first.minute(), first.second()), (23, 59, 59));
    assert_eq!(plan.lines[1].due_date.date_naive(), day(2025, 3, 31));
    assert_eq!(plan.lines[2].due_date.date_naive().month(), 4);
}

#[test]
fn test_installment_count_bounds() {
    for count in [2, 25, 0, -1] {
        let err = PaymentCalculator::build_schedule(dec!(12000), Decimal::ZERO, count, day(2025, 11, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(PaymentCalculator::build_schedule(dec!(12000), Decimal::ZERO, 24, day(2025, 11, 1)).is_ok());
}

#[test]
fn test_emi_below_minimum_rejected() {
    let err = PaymentCalculator::build_schedule(dec!(1000), Decimal::ZERO, 12, day(2025, 11, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().contains("83.33"), "{}", err.message());
}

#[test]
fn test_downpayment_must_be_below_total() {
    let err = PaymentCalculator::build_schedule(dec!(5000), dec!(5000), 3, day(2025, 11, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_credit_shortfall() {
    assert_eq!(PaymentCalculator::credit_shortfall(dec!(10000), dec!(7000)), dec!(3000));
    assert_eq!(PaymentCalculator::credit_shortfall(dec!(10000), dec!(15000)), Decimal::ZERO);
    assert_eq!(PaymentCalculator::credit_to_deduct(dec!(10000), dec!(15000)), dec!(10000));
    assert_eq!(PaymentCalculator::credit_to_deduct(dec!(10000), dec!(7000)), dec!(7000));
}

/// 10 days late on 1000.00: two started weeks, 2%
#[test]
fn test_late_fee_ten_days() {
    let charge = PaymentCalculator::installment_charge(dec!(1000.00), day(2025, 12, 1), day(2025, 12, 11));

    assert_eq!(charge.overdue_days, 10);
    assert_eq!(charge.late_fee, dec!(20.00));
    assert_eq!(charge.required_total, dec!(1020.00));
}

#[test]
fn test_late_fee_boundaries() {
    assert_eq!(PaymentCalculator::late_fee(dec!(1000), 0), Decimal::ZERO);
    assert_eq!(PaymentCalculator::late_fee(dec!(1000), 1), dec!(10.00));
    assert_eq!(PaymentCalculator::late_fee(dec!(1000), 7), dec!(10.00));
    assert_eq!(PaymentCalculator::late_fee(dec!(1000), 8), dec!(20.00));
    assert_eq!(PaymentCalculator::late_fee(dec!(1000), 70), dec!(100.00));
    assert_eq!(PaymentCalculator::late_fee(dec!(1000), 400), dec!(100.00));
}

#[test]
fn test_paying_early_is_not_overdue() {
    assert_eq!(PaymentCalculator::overdue_days(day(2025, 12, 1), day(2025, 11, 20)), 0);
}

#[test]
fn test_reference_code_shape() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
    let code = PaymentCalculator::reference_code(TransactionType::Installment, now);

    let parts: Vec<&str> = code.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1], "20250601");
    assert_eq!(parts[2].len(), 8);
    assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
}

proptest! {
    /// The schedule always sums exactly to the financed amount
    #[test]
    fn prop_schedule_sums_to_financed(
        total_cents in 100_000i64..100_000_000,
        downpayment_pct in 0u32..50,
        count in 3i32..=24,
    ) {
        let total = Decimal::new(total_cents, 2);
        let downpayment = round2(total * Decimal::from(downpayment_pct) / dec!(100));

        if let Ok(plan) = PaymentCalculator::build_schedule(total, downpayment, count, day(2025, 11, 1)) {
            let sum: Decimal = plan.lines.iter().map(|l| l.amount).sum();
            prop_assert_eq!(sum, total - downpayment);
            prop_assert_eq!(plan.lines.len(), count as usize);
            prop_assert!(plan.lines.iter().all(|l| l.amount > Decimal::ZERO));
        }
    }

    /// Late fees never exceed 10% of the installment
    #[test]
    fn prop_late_fee_is_capped(amount_cents in 10_000i64..10_000_000, days in 0i32..2000) {
        let amount = Decimal::new(amount_cents, 2);
        let fee = PaymentCalculator::late_fee(amount, days);
        prop_assert!(fee >= Decimal::ZERO);
        prop_assert!(fee <= round2(amount * dec!(0.10)));
    }
}
