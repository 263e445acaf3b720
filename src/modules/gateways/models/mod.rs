//! Wire types exchanged with the marketplace's peer services.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Admin review state of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSpecs {
    #[serde(default)]
    pub system_size_kwp: Decimal,
}

/// Contractor quote as returned by the quote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub request_id: String,
    pub contractor_id: String,
    pub user_id: String,
    pub admin_status: QuoteStatus,
    pub base_price: Decimal,
    #[serde(default)]
    pub system_specs: SystemSpecs,
    #[serde(default)]
    pub converted_to_project: bool,
}

/// Credit-risk flag maintained by the user service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagStatus {
    Green,
    Yellow,
    Red,
}

impl FlagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

/// User profile slice needed for BNPL eligibility and OTP delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditProfile {
    pub id: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub flag_status: FlagStatus,
    #[serde(default)]
    pub sama_credit_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditOperation {
    Deduct,
    Add,
}

/// Body of `PATCH /users/{id}/credit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditAdjustment {
    pub amount: Decimal,
    pub operation: CreditOperation,
    pub project_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    pub before_amount: Decimal,
    pub after_amount: Decimal,
}

/// Charge submitted to the payment processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub payer_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeResult {
    pub success: bool,
    pub reference: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// SMS carrying an installation completion code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpMessage {
    pub phone: String,
    pub message: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DispatchAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
