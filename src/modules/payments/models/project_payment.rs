use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::money::{format_amount, validate_positive};
use crate::core::{AppError, Result};

/// Payment record of a project, created once at payment-method selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPayment {
    pub id: String,
    pub project_id: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub downpayment_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downpayment_paid_at: Option<DateTime<Utc>>,
    /// Principal collected so far; `paid_amount + remaining_amount == total_amount`
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub number_of_installments: i32,
    pub monthly_emi: Decimal,
    /// Credit deducted from the user's ledger at BNPL selection
    pub credit_amount_used: Decimal,
    /// Late fees are collected on top of principal and tracked separately
    pub late_fees_collected: Decimal,
    pub admin_paid_contractor: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ContractorRelease>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata of the admin's fund release to the contractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractorRelease {
    pub amount: Decimal,
    pub released_by: String,
    pub released_at: DateTime<Utc>,
    pub reference: String,
    pub bank_details: BankDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_holder: String,
    pub iban: String,
}

impl BankDetails {
    pub fn validate(&self) -> Result<()> {
        if self.bank_name.trim().is_empty() {
            return Err(AppError::validation("Bank name is required"));
        }
        if self.account_holder.trim().is_empty() {
            return Err(AppError::validation("Account holder is required"));
        }
        if self.iban.trim().is_empty() {
            return Err(AppError::validation("IBAN is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    SinglePay,
    Bnpl,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinglePay => "single_pay",
            Self::Bnpl => "bnpl",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "single_pay" => Ok(Self::SinglePay),
            "bnpl" => Ok(Self::Bnpl),
            _ => Err(AppError::validation(format!("Invalid payment method: {}", value))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyPaid => "partially_paid",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "partially_paid" => Ok(Self::PartiallyPaid),
            "completed" => Ok(Self::Completed),
            _ => Err(AppError::validation(format!("Invalid payment status: {}", value))),
        }
    }
}

impl ProjectPayment {
    fn base(project_id: &str, method: PaymentMethod, total_amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            total_amount,
            downpayment_amount: Decimal::ZERO,
            downpayment_paid_at: None,
            paid_amount: Decimal::ZERO,
            remaining_amount: total_amount,
            number_of_installments: 0,
            monthly_emi: Decimal::ZERO,
            credit_amount_used: Decimal::ZERO,
            late_fees_collected: Decimal::ZERO,
            admin_paid_contractor: false,
            release: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_single_pay(project_id: &str, total_amount: Decimal, now: DateTime<Utc>) -> Self {
        Self::base(project_id, PaymentMethod::SinglePay, total_amount, now)
    }

    pub fn new_bnpl(
        project_id: &str,
        total_amount: Decimal,
        downpayment_amount: Decimal,
        number_of_installments: i32,
        monthly_emi: Decimal,
        credit_amount_used: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let mut payment = Self::base(project_id, PaymentMethod::Bnpl, total_amount, now);
        payment.downpayment_amount = downpayment_amount;
        payment.number_of_installments = number_of_installments;
        payment.monthly_emi = monthly_emi;
        payment.credit_amount_used = credit_amount_used;
        payment
    }

    pub fn is_bnpl(&self) -> bool {
        self.payment_method == PaymentMethod::Bnpl
    }

    pub fn is_completed(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    pub fn requires_downpayment(&self) -> bool {
        self.is_bnpl() && self.downpayment_amount > Decimal::ZERO
    }

    pub fn downpayment_settled(&self) -> bool {
        !self.requires_downpayment() || self.downpayment_paid_at.is_some()
    }

    /// Apply collected principal, keeping the balance identity intact
    pub fn apply_principal(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(AppError::validation("Payment amount must be positive"));
        }

        if amount > self.remaining_amount {
            return Err(AppError::validation(format!(
                "Payment of {} exceeds remaining balance of {}",
                format_amount(amount),
                format_amount(self.remaining_amount)
            )));
        }

        self.paid_amount += amount;
        self.remaining_amount = self.total_amount - self.paid_amount;
        self.payment_status = if self.remaining_amount.is_zero() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::PartiallyPaid
        };
        self.updated_at = now;

        debug_assert!(self.is_balanced());
        Ok(())
    }

    pub fn apply_downpayment(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.requires_downpayment() {
            return Err(AppError::business_rule("This payment has no downpayment to collect"));
        }

        if self.downpayment_paid_at.is_some() {
            return Err(AppError::business_rule("Downpayment has already been paid"));
        }

        self.apply_principal(self.downpayment_amount, now)?;
        self.downpayment_paid_at = Some(now);
        Ok(())
    }

    pub fn add_late_fee(&mut self, late_fee: Decimal, now: DateTime<Utc>) {
        self.late_fees_collected += late_fee;
        self.updated_at = now;
    }

    /// Mark funds as released to the contractor. A second release is rejected.
    pub fn release_to_contractor(
        &mut self,
        amount: Decimal,
        admin_id: &str,
        reference: String,
        bank_details: BankDetails,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.admin_paid_contractor {
            return Err(AppError::business_rule(
                "Payment has already been released to the contractor",
            ));
        }

        if amount <= Decimal::ZERO || amount > self.total_amount {
            return Err(AppError::validation(format!(
                "Release amount must be between 0.01 and {}",
                format_amount(self.total_amount)
            )));
        }
        validate_positive(amount, "Release amount").map_err(AppError::validation)?;

        bank_details.validate()?;

        self.admin_paid_contractor = true;
        self.release = Some(ContractorRelease {
            amount,
            released_by: admin_id.to_string(),
            released_at: now,
            reference,
            bank_details,
        });
        self.updated_at = now;

        Ok(())
    }

    pub fn is_balanced(&self) -> bool {
        self.paid_amount + self.remaining_amount == self.total_amount
    }
}
