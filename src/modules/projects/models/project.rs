use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{AppError, Caller, Result};

/// Solar installation project, the aggregate root of the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub contractor_id: String,
    /// One project per quote (unique)
    pub quote_id: String,
    pub request_id: String,
    pub total_amount: Decimal,
    pub system_size_kwp: Decimal,
    pub status: ProjectStatus,
    /// Status to restore when an on-hold project resumes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_before_hold: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// Optimistic concurrency counter, bumped by every committed unit of work
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    PaymentPending,
    PaymentProcessing,
    PaymentCompleted,
    InstallationScheduled,
    InstallationInProgress,
    InstallationCompleted,
    Completed,
    Cancelled,
    OnHold,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 9] = [
        Self::PaymentPending,
        Self::PaymentProcessing,
        Self::PaymentCompleted,
        Self::InstallationScheduled,
        Self::InstallationInProgress,
        Self::InstallationCompleted,
        Self::Completed,
        Self::Cancelled,
        Self::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentPending => "payment_pending",
            Self::PaymentProcessing => "payment_processing",
            Self::PaymentCompleted => "payment_completed",
            Self::InstallationScheduled => "installation_scheduled",
            Self::InstallationInProgress => "installation_in_progress",
            Self::InstallationCompleted => "installation_completed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::OnHold => "on_hold",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Installation work has not started yet, so the project can still be unwound.
    pub fn is_pre_installation(&self) -> bool {
        matches!(
            self,
            Self::PaymentPending
                | Self::PaymentProcessing
                | Self::PaymentCompleted
                | Self::InstallationScheduled
        )
    }

    /// Lifecycle transition table. `OnHold` exits are further restricted to the
    /// remembered status by [`Project::resume`].
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        if self.is_terminal() || *self == next {
            return false;
        }

        match (self, next) {
            (_, OnHold) => true,
            (OnHold, _) => true,
            (PaymentPending, PaymentProcessing) => true,
            (PaymentProcessing, PaymentCompleted) => true,
            // BNPL: scheduling is gated on partial payment, not completion
            (PaymentProcessing, InstallationScheduled) => true,
            (PaymentCompleted, InstallationScheduled) => true,
            (InstallationScheduled, InstallationInProgress) => true,
            (InstallationInProgress, InstallationCompleted) => true,
            (InstallationCompleted, Completed) => true,
            (from, Cancelled) => from.is_pre_installation(),
            _ => false,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| AppError::validation(format!("Invalid project status: {}", value)))
    }
}

impl TryFrom<String> for ProjectStatus {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Project {
    /// Create a project in `payment_pending` from an approved quote
    pub fn new(
        user_id: String,
        contractor_id: String,
        quote_id: String,
        request_id: String,
        total_amount: Decimal,
        system_size_kwp: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if total_amount <= Decimal::ZERO {
            return Err(AppError::validation("Project total amount must be positive"));
        }

        if system_size_kwp < Decimal::ZERO {
            return Err(AppError::validation("System size cannot be negative"));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            contractor_id,
            quote_id,
            request_id,
            total_amount,
            system_size_kwp,
            status: ProjectStatus::PaymentPending,
            status_before_hold: None,
            notes: None,
            site_address: None,
            cancellation_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            completed_at: None,
        })
    }

    pub fn is_owner(&self, caller: &Caller) -> bool {
        caller.id == self.user_id
    }

    pub fn is_assigned_contractor(&self, caller: &Caller) -> bool {
        caller.id == self.contractor_id
    }

    /// Owner, assigned contractor, admin tier and internal services may see the project.
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        use crate::core::Role;

        match caller.role {
            Role::User => self.is_owner(caller),
            Role::Contractor => self.is_assigned_contractor(caller),
            Role::Admin | Role::SuperAdmin | Role::System => true,
        }
    }

    /// Move along the lifecycle, rejecting transitions the table does not allow
    pub fn transition_to(&mut self, next: ProjectStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::business_rule(format!(
                "Cannot move project from {} to {}",
                self.status, next
            )));
        }

        self.status = next;
        self.updated_at = now;

        if next == ProjectStatus::Completed {
            self.completed_at = Some(now);
        }

        Ok(())
    }

    /// Effective stage for cancellation checks (looks through `on_hold`)
    fn effective_status(&self) -> ProjectStatus {
        match (self.status, self.status_before_hold) {
            (ProjectStatus::OnHold, Some(previous)) => previous,
            (status, _) => status,
        }
    }

    /// Cancel the project. Installation work in flight or done cannot be unwound.
    pub fn cancel(&mut self, reason: String, now: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(AppError::business_rule(format!(
                "Project is already {}",
                self.status
            )));
        }

        if !self.effective_status().is_pre_installation() {
            return Err(AppError::business_rule(format!(
                "Project cannot be cancelled once installation has started (status: {})",
                self.effective_status()
            )));
        }

        self.status = ProjectStatus::Cancelled;
        self.status_before_hold = None;
        self.cancellation_reason = Some(reason);
        self.cancelled_at = Some(now);
        self.updated_at = now;

        Ok(())
    }

    pub fn hold(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == ProjectStatus::OnHold {
            return Err(AppError::business_rule("Project is already on hold"));
        }

        let previous = self.status;
        self.transition_to(ProjectStatus::OnHold, now)?;
        self.status_before_hold = Some(previous);

        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<ProjectStatus> {
        if self.status != ProjectStatus::OnHold {
            return Err(AppError::business_rule("Project is not on hold"));
        }

        let previous = self
            .status_before_hold
            .take()
            .ok_or_else(|| AppError::internal("On-hold project has no previous status"))?;

        self.status = previous;
        self.updated_at = now;

        Ok(previous)
    }

    /// Guard for operations that only make sense on a live project
    pub fn ensure_active(&self) -> Result<()> {
        match self.status {
            ProjectStatus::Cancelled | ProjectStatus::Completed => Err(AppError::business_rule(
                format!("Project is {}", self.status),
            )),
            ProjectStatus::OnHold => Err(AppError::business_rule("Project is on hold")),
            _ => Ok(()),
        }
    }
}
