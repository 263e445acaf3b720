use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Caller, Result};
use crate::modules::payments::models::{
    BankDetails, Installment, PaymentMethod, PaymentTransaction, ProjectPayment,
};
use crate::modules::projects::models::ProjectAggregate;

use super::payment_calculator::PaymentCalculator;

/// Request body for payment-method selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectPaymentInput {
    pub method: PaymentMethod,
    #[serde(default)]
    pub downpayment_amount: Option<Decimal>,
    #[serde(default)]
    pub number_of_installments: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AmountInput {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInput {
    pub amount: Decimal,
    pub bank_details: BankDetails,
}

/// Installment as seen today, with the late fee it would incur if paid now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentView {
    pub installment: Installment,
    pub projected_late_fee: Decimal,
    pub amount_due: Decimal,
}

impl InstallmentView {
    pub fn project(installment: &Installment, today: NaiveDate) -> Self {
        let mut installment = installment.clone();

        if installment.is_paid() {
            return Self {
                projected_late_fee: Decimal::ZERO,
                amount_due: Decimal::ZERO,
                installment,
            };
        }

        let charge = PaymentCalculator::installment_charge(installment.amount, installment.due_day(), today);
        installment.status = installment.status_on(today);
        installment.overdue_days = charge.overdue_days;

        Self {
            projected_late_fee: charge.late_fee,
            amount_due: charge.required_total,
            installment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub payment: ProjectPayment,
    pub installments: Vec<InstallmentView>,
    pub transactions: Vec<PaymentTransaction>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_installment_id: Option<String>,
}

/// Payment and installment operations of a project.
///
/// Implemented locally by `PaymentService` and remotely by `RemotePaymentEngine`.
#[async_trait]
pub trait PaymentEngine: Send + Sync {
    async fn select_payment_method(
        &self,
        caller: &Caller,
        project_id: &str,
        input: SelectPaymentInput,
    ) -> Result<ProjectAggregate>;

    async fn process_full_payment(
        &self,
        caller: &Caller,
        project_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate>;

    async fn process_downpayment(
        &self,
        caller: &Caller,
        project_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate>;

    async fn pay_installment(
        &self,
        caller: &Caller,
        project_id: &str,
        installment_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate>;

    async fn release_payment_to_contractor(
        &self,
        caller: &Caller,
        project_id: &str,
        input: ReleaseInput,
    ) -> Result<ProjectAggregate>;

    async fn get_payment_summary(&self, caller: &Caller, project_id: &str) -> Result<PaymentSummary>;
}
