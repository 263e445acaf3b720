use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{AppError, Caller, Result};

/// Immutable fact in a project's audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: String,
    pub project_id: String,
    pub event_type: TimelineEventType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub actor_id: String,
    pub actor_role: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventType {
    ProjectCreated,
    ProjectUpdated,
    ProjectCancelled,
    ProjectOnHold,
    ProjectResumed,
    StatusChanged,
    PaymentMethodSelected,
    PaymentReceived,
    DownpaymentReceived,
    InstallmentPaid,
    PaymentCompleted,
    PaymentReleased,
    InstallationScheduled,
    InstallationStarted,
    InstallationCompleted,
    OtpResent,
    InstallationVerified,
    QualityCheck,
    ReviewSubmitted,
    ReviewResponse,
    ProjectCompleted,
    Note,
}

impl TimelineEventType {
    pub const ALL: [TimelineEventType; 22] = [
        Self::ProjectCreated,
        Self::ProjectUpdated,
        Self::ProjectCancelled,
        Self::ProjectOnHold,
        Self::ProjectResumed,
        Self::StatusChanged,
        Self::PaymentMethodSelected,
        Self::PaymentReceived,
        Self::DownpaymentReceived,
        Self::InstallmentPaid,
        Self::PaymentCompleted,
        Self::PaymentReleased,
        Self::InstallationScheduled,
        Self::InstallationStarted,
        Self::InstallationCompleted,
        Self::OtpResent,
        Self::InstallationVerified,
        Self::QualityCheck,
        Self::ReviewSubmitted,
        Self::ReviewResponse,
        Self::ProjectCompleted,
        Self::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::ProjectUpdated => "project_updated",
            Self::ProjectCancelled => "project_cancelled",
            Self::ProjectOnHold => "project_on_hold",
            Self::ProjectResumed => "project_resumed",
            Self::StatusChanged => "status_changed",
            Self::PaymentMethodSelected => "payment_method_selected",
            Self::PaymentReceived => "payment_received",
            Self::DownpaymentReceived => "downpayment_received",
            Self::InstallmentPaid => "installment_paid",
            Self::PaymentCompleted => "payment_completed",
            Self::PaymentReleased => "payment_released",
            Self::InstallationScheduled => "installation_scheduled",
            Self::InstallationStarted => "installation_started",
            Self::InstallationCompleted => "installation_completed",
            Self::OtpResent => "otp_resent",
            Self::InstallationVerified => "installation_verified",
            Self::QualityCheck => "quality_check",
            Self::ReviewSubmitted => "review_submitted",
            Self::ReviewResponse => "review_response",
            Self::ProjectCompleted => "project_completed",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for TimelineEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimelineEventType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == value)
            .ok_or_else(|| AppError::validation(format!("Invalid timeline event type: {}", value)))
    }
}

impl TimelineEntry {
    pub fn new(
        project_id: &str,
        event_type: TimelineEventType,
        title: impl Into<String>,
        actor: &Caller,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            event_type,
            title: title.into(),
            description: None,
            actor_id: actor.id.clone(),
            actor_role: actor.role.to_string(),
            metadata: serde_json::Value::Object(Default::default()),
            created_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
