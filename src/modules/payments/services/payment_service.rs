use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::money::{format_amount, validate_positive};
use crate::core::{AppError, Caller, Clock, Result};
use crate::modules::gateways::{
    ChargeRequest, CreditAdjustment, CreditOperation, FlagStatus, PaymentProcessor,
    UserCreditGateway,
};
use crate::modules::payments::models::{
    Installment, PaymentMethod, PaymentTransaction, ProjectPayment, TransactionType,
};
use crate::modules::projects::models::{
    ProjectAggregate, ProjectStatus, TimelineEntry, TimelineEventType,
};
use crate::modules::projects::repositories::{ProjectStore, UnitOfWork};
use crate::modules::projects::services::access;

use super::payment_calculator::PaymentCalculator;
use super::payment_engine::{
    InstallmentView, PaymentEngine, PaymentSummary, ReleaseInput, SelectPaymentInput,
};

/// Local payment engine: owns payment selection, collection and release
pub struct PaymentService {
    store: Arc<dyn ProjectStore>,
    users: Arc<dyn UserCreditGateway>,
    processor: Arc<dyn PaymentProcessor>,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        users: Arc<dyn UserCreditGateway>,
        processor: Arc<dyn PaymentProcessor>,
        clock: Arc<dyn Clock>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            users,
            processor,
            clock,
            currency: currency.into(),
        }
    }

    async fn reload(&self, project_id: &str) -> Result<ProjectAggregate> {
        self.store
            .load_aggregate(project_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Project {} not found", project_id)))
    }

    fn payment_of(aggregate: &ProjectAggregate) -> Result<ProjectPayment> {
        aggregate.payment.clone().ok_or_else(|| {
            AppError::business_rule("A payment method must be selected first")
        })
    }

    fn validate_amount(amount: Decimal) -> Result<()> {
        validate_positive(amount, "Amount").map_err(AppError::validation)
    }

    /// Charge the payer. A decline is a `Payment` error and nothing is recorded.
    async fn charge(
        &self,
        aggregate: &ProjectAggregate,
        reference: &str,
        amount: Decimal,
        description: String,
    ) -> Result<String> {
        let request = ChargeRequest {
            reference: reference.to_string(),
            amount,
            currency: self.currency.clone(),
            description,
            payer_id: aggregate.project.user_id.clone(),
        };

        let result = self.processor.charge(&request).await?;

        if !result.success {
            warn!(
                project_id = %aggregate.project.id,
                reference = %reference,
                amount = %amount,
                processor = self.processor.name(),
                message = ?result.message,
                "Charge declined"
            );
            return Err(AppError::payment(
                result
                    .message
                    .unwrap_or_else(|| "Payment was declined".to_string()),
            ));
        }

        Ok(result.reference)
    }

    /// Commit a unit of work that follows a successful charge
    async fn commit_after_charge(&self, unit: UnitOfWork, reference: &str) -> Result<()> {
        let project_id = unit.project.id.clone();
        if let Err(e) = self.store.commit(unit).await {
            // The processor has already taken the money; the reference is the reconciliation key
            error!(
                project_id = %project_id,
                reference = %reference,
                error = %e,
                "Charge succeeded but recording it failed"
            );
            return Err(e);
        }
        Ok(())
    }

    async fn select_single_pay(&self, caller: &Caller, aggregate: ProjectAggregate) -> Result<ProjectAggregate> {
        let now = self.clock.now();
        let mut project = aggregate.project;
        let payment = ProjectPayment::new_single_pay(&project.id, project.total_amount, now);

        project.transition_to(ProjectStatus::PaymentProcessing, now)?;

        let entry = TimelineEntry::new(
            &project.id,
            TimelineEventType::PaymentMethodSelected,
            "Single payment selected",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "method": PaymentMethod::SinglePay,
            "total_amount": format_amount(payment.total_amount),
        }));

        let project_id = project.id.clone();
        self.store
            .commit(UnitOfWork::new(project).insert_payment(payment).append(entry))
            .await?;

        info!(project_id = %project_id, method = "single_pay", "Payment method selected");

        self.reload(&project_id).await
    }

    async fn select_bnpl(
        &self,
        caller: &Caller,
        aggregate: ProjectAggregate,
        input: SelectPaymentInput,
    ) -> Result<ProjectAggregate> {
        let mut project = aggregate.project;
        let total = project.total_amount;

        let count = input
            .number_of_installments
            .ok_or_else(|| AppError::validation("number_of_installments is required for BNPL"))?;
        PaymentCalculator::validate_installment_count(count)?;

        let downpayment = input.downpayment_amount.unwrap_or(Decimal::ZERO);
        if downpayment < Decimal::ZERO {
            return Err(AppError::validation("Downpayment cannot be negative"));
        }
        if downpayment > Decimal::ZERO {
            validate_positive(downpayment, "Downpayment").map_err(AppError::validation)?;
        }
        if downpayment >= total {
            return Err(AppError::validation(format!(
                "Downpayment must be less than the total amount of {}",
                format_amount(total)
            )));
        }

        let profile = self.users.fetch_profile(&project.user_id).await?;

        if profile.flag_status != FlagStatus::Green {
            return Err(AppError::business_rule(format!(
                "BNPL is only available to users with GREEN credit status (current: {})",
                profile.flag_status.as_str()
            )));
        }

        let credit = profile.sama_credit_amount;
        let shortfall = PaymentCalculator::credit_shortfall(total, credit);
        if shortfall > Decimal::ZERO && downpayment < shortfall {
            return Err(AppError::business_rule(format!(
                "Insufficient credit: a downpayment of at least {} is required",
                format_amount(shortfall)
            )));
        }

        let now = self.clock.now();
        let plan = PaymentCalculator::build_schedule(total, downpayment, count, self.clock.today())?;
        let credit_used = PaymentCalculator::credit_to_deduct(total, credit);

        let payment = ProjectPayment::new_bnpl(
            &project.id,
            total,
            downpayment,
            count,
            plan.monthly_emi,
            credit_used,
            now,
        );

        let installments: Vec<Installment> = plan
            .lines
            .iter()
            .map(|line| {
                Installment::new(
                    &payment.id,
                    &project.id,
                    line.installment_number,
                    line.amount,
                    line.due_date,
                    now,
                )
            })
            .collect();

        project.transition_to(ProjectStatus::PaymentProcessing, now)?;

        let entry = TimelineEntry::new(
            &project.id,
            TimelineEventType::PaymentMethodSelected,
            "BNPL selected",
            caller,
            now,
        )
        .with_description(format!(
            "{} installments of {}",
            count,
            format_amount(plan.monthly_emi)
        ))
        .with_metadata(serde_json::json!({
            "method": PaymentMethod::Bnpl,
            "total_amount": format_amount(total),
            "downpayment_amount": format_amount(downpayment),
            "number_of_installments": count,
            "monthly_emi": format_amount(plan.monthly_emi),
            "credit_amount_used": format_amount(credit_used),
        }));

        let project_id = project.id.clone();
        let user_id = project.user_id.clone();
        let unit = UnitOfWork::new(project)
            .insert_payment(payment)
            .insert_installments(installments)
            .append(entry);

        // Credit moves only after every check has passed
        if credit_used > Decimal::ZERO {
            self.users
                .adjust_credit(
                    &user_id,
                    &CreditAdjustment {
                        amount: credit_used,
                        operation: CreditOperation::Deduct,
                        project_id: project_id.clone(),
                        reason: "BNPL purchase".to_string(),
                    },
                )
                .await?;
        }

        if let Err(commit_error) = self.store.commit(unit).await {
            if credit_used > Decimal::ZERO {
                self.restore_credit(&user_id, &project_id, credit_used).await;
            }
            return Err(commit_error);
        }

        info!(
            project_id = %project_id,
            method = "bnpl",
            installments = count,
            emi = %plan.monthly_emi,
            credit_used = %credit_used,
            "Payment method selected"
        );

        self.reload(&project_id).await
    }

    /// Compensate a credit deduction whose commit failed
    async fn restore_credit(&self, user_id: &str, project_id: &str, amount: Decimal) {
        let adjustment = CreditAdjustment {
            amount,
            operation: CreditOperation::Add,
            project_id: project_id.to_string(),
            reason: "BNPL selection rolled back".to_string(),
        };

        match self.users.adjust_credit(user_id, &adjustment).await {
            Ok(_) => warn!(
                project_id = %project_id,
                user_id = %user_id,
                amount = %amount,
                "Restored credit after failed BNPL commit"
            ),
            Err(e) => error!(
                project_id = %project_id,
                user_id = %user_id,
                amount = %amount,
                error = %e,
                "Failed to restore credit after failed BNPL commit"
            ),
        }
    }
}

#[async_trait]
impl PaymentEngine for PaymentService {
    async fn select_payment_method(
        &self,
        caller: &Caller,
        project_id: &str,
        input: SelectPaymentInput,
    ) -> Result<ProjectAggregate> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner(&aggregate.project, caller, "select a payment method")?;

        if aggregate.payment.is_some() {
            return Err(AppError::conflict(
                "A payment method has already been selected for this project",
            ));
        }

        if aggregate.project.status != ProjectStatus::PaymentPending {
            return Err(AppError::business_rule(format!(
                "Payment method can only be selected while payment is pending (current: {})",
                aggregate.project.status
            )));
        }

        match input.method {
            PaymentMethod::SinglePay => self.select_single_pay(caller, aggregate).await,
            PaymentMethod::Bnpl => self.select_bnpl(caller, aggregate, input).await,
        }
    }

    async fn process_full_payment(
        &self,
        caller: &Caller,
        project_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner(&aggregate.project, caller, "make payments")?;
        Self::validate_amount(amount)?;

        let mut payment = Self::payment_of(&aggregate)?;
        if payment.is_bnpl() {
            return Err(AppError::business_rule(
                "Full payment is only available for single-pay projects",
            ));
        }
        if payment.is_completed() {
            return Err(AppError::business_rule("Payment has already been completed"));
        }
        if aggregate.project.status != ProjectStatus::PaymentProcessing {
            return Err(AppError::business_rule(format!(
                "Project is not awaiting payment (current: {})",
                aggregate.project.status
            )));
        }

        let due = payment.remaining_amount;
        if amount != due {
            return Err(AppError::validation(format!(
                "Full payment must be exactly {}",
                format_amount(due)
            )));
        }

        let now = self.clock.now();
        let reference = PaymentCalculator::reference_code(TransactionType::FullPayment, now);
        let gateway_reference = self
            .charge(
                &aggregate,
                &reference,
                due,
                format!("Full payment for project {}", project_id),
            )
            .await?;

        payment.apply_principal(due, now)?;

        let transaction = PaymentTransaction::new(
            project_id,
            &payment.id,
            TransactionType::FullPayment,
            due,
            reference.clone(),
            now,
        )
        .with_gateway_reference(gateway_reference);

        let mut project = aggregate.project;
        project.transition_to(ProjectStatus::PaymentCompleted, now)?;

        let received = TimelineEntry::new(
            project_id,
            TimelineEventType::PaymentReceived,
            "Full payment received",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "amount": format_amount(due),
            "reference": reference,
        }));
        let completed = TimelineEntry::new(
            project_id,
            TimelineEventType::PaymentCompleted,
            "Payment completed",
            caller,
            now,
        );

        let unit = UnitOfWork::new(project)
            .update_payment(payment)
            .record_transaction(transaction)
            .append(received)
            .append(completed);
        self.commit_after_charge(unit, &reference).await?;

        info!(project_id = %project_id, amount = %due, reference = %reference, "Full payment processed");

        self.reload(project_id).await
    }

    async fn process_downpayment(
        &self,
        caller: &Caller,
        project_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner(&aggregate.project, caller, "make payments")?;
        aggregate.project.ensure_active()?;
        Self::validate_amount(amount)?;

        let mut payment = Self::payment_of(&aggregate)?;
        if !payment.is_bnpl() {
            return Err(AppError::business_rule("Downpayments only apply to BNPL payments"));
        }
        if !payment.requires_downpayment() {
            return Err(AppError::business_rule("This payment has no downpayment to collect"));
        }
        if payment.downpayment_paid_at.is_some() {
            return Err(AppError::business_rule("Downpayment has already been paid"));
        }

        let due = payment.downpayment_amount;
        if amount != due {
            return Err(AppError::validation(format!(
                "Downpayment must be exactly {}",
                format_amount(due)
            )));
        }

        let now = self.clock.now();
        let reference = PaymentCalculator::reference_code(TransactionType::Downpayment, now);
        let gateway_reference = self
            .charge(
                &aggregate,
                &reference,
                due,
                format!("Downpayment for project {}", project_id),
            )
            .await?;

        payment.apply_downpayment(now)?;

        let transaction = PaymentTransaction::new(
            project_id,
            &payment.id,
            TransactionType::Downpayment,
            due,
            reference.clone(),
            now,
        )
        .with_gateway_reference(gateway_reference);

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::DownpaymentReceived,
            "Downpayment received",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "amount": format_amount(due),
            "reference": reference,
            "remaining_amount": format_amount(payment.remaining_amount),
        }));

        let unit = UnitOfWork::new(aggregate.project)
            .update_payment(payment)
            .record_transaction(transaction)
            .append(entry);
        self.commit_after_charge(unit, &reference).await?;

        info!(project_id = %project_id, amount = %due, reference = %reference, "Downpayment processed");

        self.reload(project_id).await
    }

    async fn pay_installment(
        &self,
        caller: &Caller,
        project_id: &str,
        installment_id: &str,
        amount: Decimal,
    ) -> Result<ProjectAggregate> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner(&aggregate.project, caller, "make payments")?;
        aggregate.project.ensure_active()?;
        Self::validate_amount(amount)?;

        let mut payment = Self::payment_of(&aggregate)?;
        if !payment.is_bnpl() {
            return Err(AppError::business_rule("Installments only apply to BNPL payments"));
        }
        if !payment.downpayment_settled() {
            return Err(AppError::business_rule(format!(
                "The downpayment of {} must be paid before installments",
                format_amount(payment.downpayment_amount)
            )));
        }

        let mut installment = aggregate
            .installments
            .iter()
            .find(|i| i.id == installment_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Installment {} not found", installment_id)))?;

        if installment.is_paid() {
            return Err(AppError::business_rule(format!(
                "Installment {} is already paid",
                installment.installment_number
            )));
        }

        if !installment.can_be_paid(&aggregate.installments) {
            let next = aggregate
                .next_payable_installment()
                .map(|i| i.installment_number)
                .unwrap_or(1);
            return Err(AppError::business_rule(format!(
                "Installment {} must be paid before installment {}",
                next, installment.installment_number
            )));
        }

        let now = self.clock.now();
        let charge = PaymentCalculator::installment_charge(installment.amount, installment.due_day(), self.clock.today());

        if amount < charge.required_total {
            return Err(AppError::validation(format!(
                "Insufficient amount: required total is {} (installment {} + late fee {})",
                format_amount(charge.required_total),
                format_amount(installment.amount),
                format_amount(charge.late_fee)
            )));
        }

        let reference = PaymentCalculator::reference_code(TransactionType::Installment, now);
        let gateway_reference = self
            .charge(
                &aggregate,
                &reference,
                charge.required_total,
                format!(
                    "Installment {} for project {}",
                    installment.installment_number, project_id
                ),
            )
            .await?;

        installment.mark_paid(
            charge.required_total,
            charge.overdue_days,
            charge.late_fee,
            reference.clone(),
            now,
        )?;
        payment.apply_principal(installment.amount, now)?;
        if charge.late_fee > Decimal::ZERO {
            payment.add_late_fee(charge.late_fee, now);
        }

        let transaction = PaymentTransaction::new(
            project_id,
            &payment.id,
            TransactionType::Installment,
            charge.required_total,
            reference.clone(),
            now,
        )
        .for_installment(&installment.id, charge.late_fee)
        .with_gateway_reference(gateway_reference);

        let paid_entry = TimelineEntry::new(
            project_id,
            TimelineEventType::InstallmentPaid,
            format!("Installment {} paid", installment.installment_number),
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "installment_number": installment.installment_number,
            "amount": format_amount(installment.amount),
            "late_fee": format_amount(charge.late_fee),
            "overdue_days": charge.overdue_days,
            "reference": reference,
        }));

        let no_unpaid_left = aggregate
            .installments
            .iter()
            .all(|i| i.is_paid() || i.id == installment.id);

        let mut project = aggregate.project;
        let installment_number = installment.installment_number;
        let mut unit_timeline = vec![paid_entry];

        if no_unpaid_left && payment.is_completed() {
            // A project that already moved on to installation keeps its status
            if project.status == ProjectStatus::PaymentProcessing {
                project.transition_to(ProjectStatus::PaymentCompleted, now)?;
            }
            unit_timeline.push(TimelineEntry::new(
                project_id,
                TimelineEventType::PaymentCompleted,
                "All installments paid",
                caller,
                now,
            ));
        }

        let mut unit = UnitOfWork::new(project)
            .update_payment(payment)
            .update_installment(installment)
            .record_transaction(transaction);
        for entry in unit_timeline {
            unit = unit.append(entry);
        }
        self.commit_after_charge(unit, &reference).await?;

        info!(
            project_id = %project_id,
            installment = installment_number,
            charged = %charge.required_total,
            late_fee = %charge.late_fee,
            overdue_days = charge.overdue_days,
            "Installment paid"
        );

        self.reload(project_id).await
    }

    async fn release_payment_to_contractor(
        &self,
        caller: &Caller,
        project_id: &str,
        input: ReleaseInput,
    ) -> Result<ProjectAggregate> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_admin(caller, "release payments to contractors")?;

        if aggregate.project.status == ProjectStatus::Cancelled {
            return Err(AppError::business_rule("Cannot release payment for a cancelled project"));
        }

        let mut payment = aggregate
            .payment
            .clone()
            .ok_or_else(|| AppError::not_found("No payment exists for this project"))?;

        input.bank_details.validate()?;

        let now = self.clock.now();
        let reference = PaymentCalculator::reference_code(TransactionType::ContractorRelease, now);

        payment.release_to_contractor(
            input.amount,
            &caller.id,
            reference.clone(),
            input.bank_details,
            now,
        )?;

        if !payment.is_completed() {
            // Release before full repayment leaves the platform carrying the credit risk
            warn!(
                project_id = %project_id,
                released = %input.amount,
                remaining = %payment.remaining_amount,
                "Releasing funds before the user has completed payment"
            );
        }

        let transaction = PaymentTransaction::new(
            project_id,
            &payment.id,
            TransactionType::ContractorRelease,
            input.amount,
            reference.clone(),
            now,
        );

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::PaymentReleased,
            "Payment released to contractor",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "amount": format_amount(input.amount),
            "reference": reference,
            "payment_status": payment.payment_status,
        }));

        self.store
            .commit(
                UnitOfWork::new(aggregate.project)
                    .update_payment(payment)
                    .record_transaction(transaction)
                    .append(entry),
            )
            .await?;

        info!(
            project_id = %project_id,
            admin_id = %caller.id,
            amount = %input.amount,
            reference = %reference,
            "Payment released to contractor"
        );

        self.reload(project_id).await
    }

    async fn get_payment_summary(&self, caller: &Caller, project_id: &str) -> Result<PaymentSummary> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;

        let payment = aggregate
            .payment
            .clone()
            .ok_or_else(|| AppError::not_found("No payment method has been selected for this project"))?;

        let today = self.clock.today();
        let installments = aggregate
            .installments
            .iter()
            .map(|i| InstallmentView::project(i, today))
            .collect();

        Ok(PaymentSummary {
            payment,
            installments,
            next_installment_id: aggregate.next_payable_installment().map(|i| i.id.clone()),
            transactions: aggregate.transactions,
        })
    }
}
