use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Ledger row for a successful charge or contractor release. Failed charges are not recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    pub project_id: String,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_id: Option<String>,
    pub transaction_type: TransactionType,
    /// Total moved, late fee included
    pub amount: Decimal,
    pub late_fee: Decimal,
    /// Internal reference code
    pub reference_code: String,
    /// Processor reference, absent for contractor releases
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    FullPayment,
    Downpayment,
    Installment,
    ContractorRelease,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullPayment => "full_payment",
            Self::Downpayment => "downpayment",
            Self::Installment => "installment",
            Self::ContractorRelease => "contractor_release",
        }
    }

    /// Prefix used for generated reference codes
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            Self::FullPayment => "FUL",
            Self::Downpayment => "DWN",
            Self::Installment => "INS",
            Self::ContractorRelease => "REL",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "full_payment" => Ok(Self::FullPayment),
            "downpayment" => Ok(Self::Downpayment),
            "installment" => Ok(Self::Installment),
            "contractor_release" => Ok(Self::ContractorRelease),
            _ => Err(AppError::validation(format!("Invalid transaction type: {}", value))),
        }
    }
}

impl PaymentTransaction {
    pub fn new(
        project_id: &str,
        payment_id: &str,
        transaction_type: TransactionType,
        amount: Decimal,
        reference_code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            payment_id: payment_id.to_string(),
            installment_id: None,
            transaction_type,
            amount,
            late_fee: Decimal::ZERO,
            reference_code,
            gateway_reference: None,
            created_at: now,
        }
    }

    pub fn for_installment(mut self, installment_id: &str, late_fee: Decimal) -> Self {
        self.installment_id = Some(installment_id.to_string());
        self.late_fee = late_fee;
        self
    }

    pub fn with_gateway_reference(mut self, reference: String) -> Self {
        self.gateway_reference = Some(reference);
        self
    }
}
