use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{AppError, Result};

/// One row of a BNPL installment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: String,
    pub payment_id: String,
    pub project_id: String,
    /// Sequential number (1..N), unique per payment
    pub installment_number: i32,
    pub amount: Decimal,
    /// End of the due day, UTC
    pub due_date: DateTime<Utc>,
    pub status: InstallmentStatus,
    /// Amount actually charged, late fee included
    pub paid_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub overdue_days: i32,
    pub late_fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Upcoming,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallmentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "upcoming" => Ok(Self::Upcoming),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            _ => Err(AppError::validation(format!("Invalid installment status: {}", value))),
        }
    }
}

impl Installment {
    pub fn new(
        payment_id: &str,
        project_id: &str,
        installment_number: i32,
        amount: Decimal,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_id: payment_id.to_string(),
            project_id: project_id.to_string(),
            installment_number,
            amount,
            due_date,
            status: InstallmentStatus::Upcoming,
            paid_amount: Decimal::ZERO,
            paid_at: None,
            overdue_days: 0,
            late_fee: Decimal::ZERO,
            transaction_reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    pub fn due_day(&self) -> NaiveDate {
        self.due_date.date_naive()
    }

    /// Sequential enforcement: every lower-numbered installment must be paid first
    pub fn can_be_paid(&self, schedule: &[Installment]) -> bool {
        schedule
            .iter()
            .filter(|other| other.installment_number < self.installment_number)
            .all(Installment::is_paid)
    }

    /// Status as seen on `today`; unpaid rows past their due day read as overdue
    pub fn status_on(&self, today: NaiveDate) -> InstallmentStatus {
        match self.status {
            InstallmentStatus::Paid => InstallmentStatus::Paid,
            _ if self.due_day() < today => InstallmentStatus::Overdue,
            _ => InstallmentStatus::Upcoming,
        }
    }

    pub fn mark_paid(
        &mut self,
        charged: Decimal,
        overdue_days: i32,
        late_fee: Decimal,
        reference: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_paid() {
            return Err(AppError::business_rule(format!(
                "Installment {} is already paid",
                self.installment_number
            )));
        }

        self.status = InstallmentStatus::Paid;
        self.paid_amount = charged;
        self.overdue_days = overdue_days;
        self.late_fee = late_fee;
        self.transaction_reference = Some(reference);
        self.paid_at = Some(now);
        self.updated_at = now;

        Ok(())
    }
}
