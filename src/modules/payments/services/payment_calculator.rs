use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::core::money::{format_amount, round2};
use crate::core::time::{add_months, date_stamp, days_past, end_of_day};
use crate::core::{AppError, Result};
use crate::modules::payments::models::TransactionType;

pub const MIN_INSTALLMENTS: i32 = 3;
pub const MAX_INSTALLMENTS: i32 = 24;

/// Smallest monthly installment the BNPL product accepts
pub const MIN_MONTHLY_EMI: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// 1% per started week overdue
const LATE_FEE_WEEKLY_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Late fees never exceed 10% of the installment
const LATE_FEE_CAP_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// One row of a generated schedule, before it is bound to a payment
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleLine {
    pub installment_number: i32,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
}

/// Amortization of the financed part of a BNPL purchase
#[derive(Debug, Clone, PartialEq)]
pub struct BnplPlan {
    pub downpayment: Decimal,
    /// `total - downpayment`, the amount spread across the schedule
    pub financed_amount: Decimal,
    pub monthly_emi: Decimal,
    pub lines: Vec<ScheduleLine>,
}

/// What a caller owes for one installment on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentCharge {
    pub overdue_days: i32,
    pub late_fee: Decimal,
    pub required_total: Decimal,
}

/// Pure payment arithmetic. No I/O, no clock: callers pass `today`.
pub struct PaymentCalculator;

impl PaymentCalculator {
    pub fn validate_installment_count(count: i32) -> Result<()> {
        if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
            return Err(AppError::validation(format!(
                "Number of installments must be between {} and {}, got {}",
                MIN_INSTALLMENTS, MAX_INSTALLMENTS, count
            )));
        }
        Ok(())
    }

    /// Build the BNPL schedule.
    ///
    /// Rows 1..n-1 carry `round2(financed / n)`; row n absorbs the rounding remainder so the
    /// schedule sums exactly to `total - downpayment`. Row `i` is due at the end of
    /// `today + i` months.
    pub fn build_schedule(
        total: Decimal,
        downpayment: Decimal,
        count: i32,
        today: NaiveDate,
    ) -> Result<BnplPlan> {
        Self::validate_installment_count(count)?;

        if total <= Decimal::ZERO {
            return Err(AppError::validation("Total amount must be positive"));
        }

        if downpayment < Decimal::ZERO {
            return Err(AppError::validation("Downpayment cannot be negative"));
        }

        if downpayment >= total {
            return Err(AppError::validation(format!(
                "Downpayment must be less than the total amount of {}",
                format_amount(total)
            )));
        }

        let financed_amount = total - downpayment;
        let emi = round2(financed_amount / Decimal::from(count));

        if emi < MIN_MONTHLY_EMI {
            return Err(AppError::validation(format!(
                "Monthly installment of {} is below the minimum of {}",
                format_amount(emi),
                format_amount(MIN_MONTHLY_EMI)
            )));
        }

        let mut lines = Vec::with_capacity(count as usize);
        for number in 1..=count {
            let amount = if number == count {
                financed_amount - emi * Decimal::from(count - 1)
            } else {
                emi
            };

            let due_day = add_months(today, number as u32)
                .ok_or_else(|| AppError::internal("Installment due date is out of range"))?;

            lines.push(ScheduleLine {
                installment_number: number,
                amount,
                due_date: end_of_day(due_day),
            });
        }

        debug!(
            total = %total,
            downpayment = %downpayment,
            installments = count,
            emi = %emi,
            last = %lines.last().map(|l| l.amount).unwrap_or_default(),
            "Built BNPL schedule"
        );

        Ok(BnplPlan {
            downpayment,
            financed_amount,
            monthly_emi: emi,
            lines,
        })
    }

    /// Part of the total the user's credit does not cover (never negative)
    pub fn credit_shortfall(total: Decimal, credit: Decimal) -> Decimal {
        (total - credit.max(Decimal::ZERO)).max(Decimal::ZERO)
    }

    /// Credit consumed by a BNPL purchase: `min(credit, total)`
    pub fn credit_to_deduct(total: Decimal, credit: Decimal) -> Decimal {
        credit.max(Decimal::ZERO).min(total)
    }

    /// Whole days past the due day, 0 if not yet due
    pub fn overdue_days(due_day: NaiveDate, today: NaiveDate) -> i32 {
        i32::try_from(days_past(due_day, today)).unwrap_or(i32::MAX)
    }

    /// `round2(min(10%, ceil(days / 7) * 1%) * amount)`
    pub fn late_fee(amount: Decimal, overdue_days: i32) -> Decimal {
        if overdue_days <= 0 {
            return Decimal::ZERO;
        }

        let weeks = (overdue_days + 6) / 7;
        let rate = (LATE_FEE_WEEKLY_RATE * Decimal::from(weeks)).min(LATE_FEE_CAP_RATE);
        round2(rate * amount)
    }

    pub fn installment_charge(amount: Decimal, due_day: NaiveDate, today: NaiveDate) -> InstallmentCharge {
        let overdue_days = Self::overdue_days(due_day, today);
        let late_fee = Self::late_fee(amount, overdue_days);

        InstallmentCharge {
            overdue_days,
            late_fee,
            required_total: amount + late_fee,
        }
    }

    /// `{PREFIX}-{YYYYMMDD}-{8 upper-case hex}`, e.g. `INS-20250601-9F2C41AB`
    pub fn reference_code(transaction_type: TransactionType, now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        format!(
            "{}-{}-{}",
            transaction_type.reference_prefix(),
            date_stamp(now),
            suffix
        )
    }
}
