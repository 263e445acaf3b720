use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{AppError, Caller, Clock, Result};
use crate::modules::gateways::{NotificationGateway, OtpMessage, UserCreditGateway};
use crate::modules::installations::models::{OtpOutcome, ProjectInstallation};
use crate::modules::payments::models::{PaymentStatus, ProjectPayment};
use crate::modules::projects::models::{
    ProjectAggregate, ProjectStatus, TimelineEntry, TimelineEventType,
};
use crate::modules::projects::repositories::{ProjectStore, UnitOfWork};
use crate::modules::projects::services::access;

use super::otp::{hash_otp, otp_matches, OtpGenerator};

pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;
pub const DEFAULT_MAX_OTP_ATTEMPTS: i32 = 3;

/// Completion code lifetime and attempt budget
#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub max_attempts: i32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(DEFAULT_OTP_TTL_MINUTES),
            max_attempts: DEFAULT_MAX_OTP_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteInput {
    pub equipment_installed: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyInput {
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheckInput {
    pub passed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Installation scheduling, work tracking and OTP-verified handover
pub struct InstallationService {
    store: Arc<dyn ProjectStore>,
    users: Arc<dyn UserCreditGateway>,
    notifier: Arc<dyn NotificationGateway>,
    otp: Arc<dyn OtpGenerator>,
    clock: Arc<dyn Clock>,
    policy: OtpPolicy,
}

impl InstallationService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        users: Arc<dyn UserCreditGateway>,
        notifier: Arc<dyn NotificationGateway>,
        otp: Arc<dyn OtpGenerator>,
        clock: Arc<dyn Clock>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            store,
            users,
            notifier,
            otp,
            clock,
            policy,
        }
    }

    async fn reload(&self, caller: &Caller, project_id: &str) -> Result<ProjectAggregate> {
        access::load_visible(self.store.as_ref(), caller, project_id).await
    }

    fn installation_of(aggregate: &ProjectAggregate) -> Result<ProjectInstallation> {
        aggregate
            .installation
            .clone()
            .ok_or_else(|| AppError::business_rule("Installation has not been scheduled"))
    }

    /// Payment must be far enough along for the contractor to come on site
    fn ensure_schedulable(aggregate: &ProjectAggregate) -> Result<ProjectPayment> {
        let payment = aggregate.payment.clone().ok_or_else(|| {
            AppError::business_rule("A payment method must be selected before scheduling installation")
        })?;

        if payment.is_bnpl() {
            if !matches!(
                payment.payment_status,
                PaymentStatus::PartiallyPaid | PaymentStatus::Completed
            ) {
                return Err(AppError::business_rule(
                    "BNPL projects need a first payment before installation can be scheduled",
                ));
            }
        } else if !payment.is_completed() {
            return Err(AppError::business_rule(
                "Payment must be completed before installation can be scheduled",
            ));
        }

        let status = aggregate.project.status;
        let allowed = match status {
            ProjectStatus::PaymentProcessing => payment.is_bnpl(),
            ProjectStatus::PaymentCompleted | ProjectStatus::InstallationScheduled => true,
            _ => false,
        };
        if !allowed {
            return Err(AppError::business_rule(format!(
                "Installation cannot be scheduled while the project is {}",
                status
            )));
        }

        Ok(payment)
    }

    /// Generate, hash and deliver a fresh completion code to the project owner.
    ///
    /// Returns the hash to store. Nothing is persisted here.
    async fn issue_otp(&self, aggregate: &ProjectAggregate, installation_id: &str) -> Result<String> {
        let code = self.otp.generate();
        let profile = self.users.fetch_profile(&aggregate.project.user_id).await?;

        let phone = profile
            .phone
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AppError::business_rule("Project owner has no phone number on file"))?;

        let message = OtpMessage {
            phone,
            message: format!(
                "Your solar installation verification code is {}. It expires in {} minutes.",
                code,
                self.policy.ttl.num_minutes()
            ),
            project_id: aggregate.project.id.clone(),
        };

        if let Err(e) = self.notifier.send_otp(&message).await {
            warn!(project_id = %aggregate.project.id, error = %e, "Failed to deliver completion OTP");
            return Err(e);
        }

        hash_otp(installation_id, &code)
    }

    pub async fn schedule_installation(
        &self,
        caller: &Caller,
        project_id: &str,
        input: ScheduleInput,
    ) -> Result<ProjectAggregate> {
        let aggregate = self.reload(caller, project_id).await?;
        access::require_contractor_or_admin(&aggregate.project, caller, "schedule installation")?;
        aggregate.project.ensure_active()?;
        Self::ensure_schedulable(&aggregate)?;

        let now = self.clock.now();
        if input.scheduled_date.date_naive() < now.date_naive() {
            return Err(AppError::validation("Scheduled date cannot be in the past"));
        }

        let notes = trimmed(input.notes);
        let mut project = aggregate.project;
        let rescheduled = aggregate.installation.is_some();

        let unit_installation = match aggregate.installation {
            Some(mut installation) => {
                installation.reschedule(input.scheduled_date, notes, now)?;
                installation
            }
            None => ProjectInstallation::new(
                project_id,
                input.scheduled_date,
                notes,
                self.policy.max_attempts,
                now,
            ),
        };

        if project.status != ProjectStatus::InstallationScheduled {
            project.transition_to(ProjectStatus::InstallationScheduled, now)?;
        }

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::InstallationScheduled,
            if rescheduled { "Installation rescheduled" } else { "Installation scheduled" },
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "scheduled_date": unit_installation.scheduled_date,
            "rescheduled": rescheduled,
        }));

        let unit = UnitOfWork::new(project);
        let unit = if rescheduled {
            unit.update_installation(unit_installation.clone())
        } else {
            unit.insert_installation(unit_installation.clone())
        };
        self.store.commit(unit.append(entry)).await?;

        info!(
            project_id = %project_id,
            installation_id = %unit_installation.id,
            scheduled_date = %unit_installation.scheduled_date,
            rescheduled,
            "Installation scheduled"
        );

        self.reload(caller, project_id).await
    }

    pub async fn start_installation(&self, caller: &Caller, project_id: &str) -> Result<ProjectAggregate> {
        let aggregate = self.reload(caller, project_id).await?;
        access::require_contractor(&aggregate.project, caller, "start installation")?;
        aggregate.project.ensure_active()?;

        let mut installation = Self::installation_of(&aggregate)?;
        let mut project = aggregate.project;
        let now = self.clock.now();

        installation.start(now)?;
        project.transition_to(ProjectStatus::InstallationInProgress, now)?;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::InstallationStarted,
            "Installation started",
            caller,
            now,
        );

        self.store
            .commit(UnitOfWork::new(project).update_installation(installation).append(entry))
            .await?;

        info!(project_id = %project_id, contractor_id = %caller.id, "Installation started");

        self.reload(caller, project_id).await
    }

    pub async fn complete_installation(
        &self,
        caller: &Caller,
        project_id: &str,
        input: CompleteInput,
    ) -> Result<ProjectAggregate> {
        let aggregate = self.reload(caller, project_id).await?;
        access::require_contractor(&aggregate.project, caller, "complete installation")?;
        aggregate.project.ensure_active()?;

        let equipment: Vec<String> = input
            .equipment_installed
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        if equipment.is_empty() {
            return Err(AppError::validation("equipment_installed must list at least one item"));
        }

        let mut installation = Self::installation_of(&aggregate)?;
        let now = self.clock.now();

        // Status check happens before anything is sent to the owner
        installation.ensure_completable()?;
        let otp_hash = self.issue_otp(&aggregate, &installation.id).await?;
        installation.complete(
            equipment,
            trimmed(input.notes),
            otp_hash,
            self.policy.ttl,
            self.policy.max_attempts,
            now,
        )?;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::InstallationCompleted,
            "Installation completed, awaiting owner verification",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "equipment_installed": installation.equipment_installed,
        }));

        self.store
            .commit(
                UnitOfWork::new(aggregate.project)
                    .update_installation(installation)
                    .append(entry),
            )
            .await?;

        info!(project_id = %project_id, "Installation completed; verification code sent");

        self.reload(caller, project_id).await
    }

    pub async fn resend_completion_otp(&self, caller: &Caller, project_id: &str) -> Result<ProjectAggregate> {
        let aggregate = self.reload(caller, project_id).await?;
        access::require_contractor(&aggregate.project, caller, "resend the verification code")?;
        aggregate.project.ensure_active()?;

        let mut installation = Self::installation_of(&aggregate)?;
        let now = self.clock.now();

        installation.ensure_awaiting_verification()?;
        let otp_hash = self.issue_otp(&aggregate, &installation.id).await?;
        installation.reissue_otp(otp_hash, self.policy.ttl, self.policy.max_attempts, now)?;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::OtpResent,
            "Verification code resent",
            caller,
            now,
        );

        self.store
            .commit(
                UnitOfWork::new(aggregate.project)
                    .update_installation(installation)
                    .append(entry),
            )
            .await?;

        info!(project_id = %project_id, "Verification code resent");

        self.reload(caller, project_id).await
    }

    pub async fn verify_completion(
        &self,
        caller: &Caller,
        project_id: &str,
        otp: &str,
    ) -> Result<ProjectAggregate> {
        let aggregate = self.reload(caller, project_id).await?;
        access::require_owner(&aggregate.project, caller, "verify installation")?;
        aggregate.project.ensure_active()?;

        let otp = otp.trim();
        if otp.is_empty() {
            return Err(AppError::validation("otp is required"));
        }

        let mut installation = Self::installation_of(&aggregate)?;
        let mut project = aggregate.project;
        let now = self.clock.now();

        let installation_id = installation.id.clone();
        match installation.verify_otp(|stored| otp_matches(&installation_id, otp, stored), now)? {
            OtpOutcome::Mismatch { remaining_attempts } => {
                // The consumed attempt must survive the error
                self.store
                    .commit(UnitOfWork::new(project).update_installation(installation))
                    .await?;

                warn!(project_id = %project_id, remaining_attempts, "Invalid verification code");

                Err(AppError::validation(format!(
                    "Invalid OTP. {} attempt(s) remaining",
                    remaining_attempts
                )))
            }
            OtpOutcome::Verified => {
                project.transition_to(ProjectStatus::InstallationCompleted, now)?;

                let entry = TimelineEntry::new(
                    project_id,
                    TimelineEventType::InstallationVerified,
                    "Installation verified by owner",
                    caller,
                    now,
                );

                self.store
                    .commit(UnitOfWork::new(project).update_installation(installation).append(entry))
                    .await?;

                info!(project_id = %project_id, user_id = %caller.id, "Installation verified");

                self.reload(caller, project_id).await
            }
        }
    }

    pub async fn perform_quality_check(
        &self,
        caller: &Caller,
        project_id: &str,
        input: QualityCheckInput,
    ) -> Result<ProjectAggregate> {
        let aggregate = self.reload(caller, project_id).await?;
        access::require_admin(caller, "perform quality checks")?;

        let mut installation = Self::installation_of(&aggregate)?;
        let now = self.clock.now();
        let notes = trimmed(input.notes);

        installation.record_quality_check(input.passed, notes.clone(), caller, now);

        let mut entry = TimelineEntry::new(
            project_id,
            TimelineEventType::QualityCheck,
            if input.passed { "Quality check passed" } else { "Quality check failed" },
            caller,
            now,
        )
        .with_metadata(serde_json::json!({ "passed": input.passed }));
        if let Some(notes) = notes {
            entry = entry.with_description(notes);
        }

        self.store
            .commit(
                UnitOfWork::new(aggregate.project)
                    .update_installation(installation)
                    .append(entry),
            )
            .await?;

        info!(project_id = %project_id, passed = input.passed, inspector = %caller.id, "Quality check recorded");

        self.reload(caller, project_id).await
    }
}
