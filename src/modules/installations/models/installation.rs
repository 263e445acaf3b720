use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{AppError, Caller, Result};

/// Installation record of a project, created on first scheduling
///
/// OTP fields are write-only: they are persisted but never serialized into responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInstallation {
    pub id: String,
    pub project_id: String,
    pub status: InstallationStatus,
    pub scheduled_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub otp_hash: Option<String>,
    #[serde(skip_serializing, default)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_attempts: i32,
    pub max_otp_attempts: i32,
    pub equipment_installed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_check: Option<QualityCheck>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin pass/fail annotation on an installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub checked_by: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    Scheduled,
    InProgress,
    AwaitingVerification,
    Verified,
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::AwaitingVerification => "awaiting_verification",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallationStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "awaiting_verification" => Ok(Self::AwaitingVerification),
            "verified" => Ok(Self::Verified),
            _ => Err(AppError::validation(format!("Invalid installation status: {}", value))),
        }
    }
}

/// Result of comparing a submitted OTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    Verified,
    Mismatch { remaining_attempts: i32 },
}

impl ProjectInstallation {
    pub fn new(
        project_id: &str,
        scheduled_date: DateTime<Utc>,
        notes: Option<String>,
        max_otp_attempts: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            status: InstallationStatus::Scheduled,
            scheduled_date,
            started_at: None,
            completed_at: None,
            verified_at: None,
            otp_hash: None,
            otp_expires_at: None,
            otp_attempts: 0,
            max_otp_attempts,
            equipment_installed: Vec::new(),
            installation_notes: notes,
            quality_check: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn expect_status(&self, expected: InstallationStatus, action: &str) -> Result<()> {
        if self.status != expected {
            return Err(AppError::business_rule(format!(
                "Cannot {}: installation is {} (expected {})",
                action, self.status, expected
            )));
        }
        Ok(())
    }

    pub fn reschedule(
        &mut self,
        scheduled_date: DateTime<Utc>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.expect_status(InstallationStatus::Scheduled, "reschedule installation")?;
        self.scheduled_date = scheduled_date;
        if notes.is_some() {
            self.installation_notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == InstallationStatus::InProgress {
            return Err(AppError::business_rule("Installation has already been started"));
        }
        self.expect_status(InstallationStatus::Scheduled, "start installation")?;
        self.status = InstallationStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Whether `complete` would accept the record; checked before a code is sent
    pub fn ensure_completable(&self) -> Result<()> {
        self.expect_status(InstallationStatus::InProgress, "complete installation")
    }

    /// Whether `reissue_otp` would accept the record; checked before a code is sent
    pub fn ensure_awaiting_verification(&self) -> Result<()> {
        self.expect_status(InstallationStatus::AwaitingVerification, "resend OTP")
    }

    /// Record completion and arm a fresh OTP (hash only)
    pub fn complete(
        &mut self,
        equipment_installed: Vec<String>,
        notes: Option<String>,
        otp_hash: String,
        otp_ttl: Duration,
        max_otp_attempts: i32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_completable()?;
        self.status = InstallationStatus::AwaitingVerification;
        self.equipment_installed = equipment_installed;
        if notes.is_some() {
            self.installation_notes = notes;
        }
        self.completed_at = Some(now);
        self.arm_otp(otp_hash, otp_ttl, max_otp_attempts, now);
        Ok(())
    }

    /// Start a new completion cycle with a fresh OTP
    pub fn reissue_otp(
        &mut self,
        otp_hash: String,
        otp_ttl: Duration,
        max_otp_attempts: i32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_awaiting_verification()?;
        self.arm_otp(otp_hash, otp_ttl, max_otp_attempts, now);
        Ok(())
    }

    fn arm_otp(&mut self, otp_hash: String, otp_ttl: Duration, max_otp_attempts: i32, now: DateTime<Utc>) {
        self.otp_hash = Some(otp_hash);
        self.otp_expires_at = Some(now + otp_ttl);
        self.otp_attempts = 0;
        self.max_otp_attempts = max_otp_attempts;
        self.updated_at = now;
    }

    /// Check a submitted code; `matches` receives the stored hash.
    ///
    /// Lockout and expiry are checked before the code and leave the record unchanged.
    /// A mismatch consumes one attempt; the caller must persist it.
    pub fn verify_otp(
        &mut self,
        matches: impl FnOnce(&str) -> bool,
        now: DateTime<Utc>,
    ) -> Result<OtpOutcome> {
        self.expect_status(InstallationStatus::AwaitingVerification, "verify installation")?;

        if self.otp_attempts >= self.max_otp_attempts {
            return Err(AppError::business_rule(
                "Maximum OTP attempts exceeded. Ask the contractor to resend a new code",
            ));
        }

        let (stored_hash, expires_at) = match (&self.otp_hash, self.otp_expires_at) {
            (Some(hash), Some(expires_at)) => (hash.clone(), expires_at),
            _ => return Err(AppError::business_rule("No OTP has been issued for this installation")),
        };

        if now > expires_at {
            return Err(AppError::business_rule(
                "OTP has expired. Ask the contractor to resend a new code",
            ));
        }

        if !matches(&stored_hash) {
            self.otp_attempts += 1;
            self.updated_at = now;
            return Ok(OtpOutcome::Mismatch {
                remaining_attempts: self.max_otp_attempts - self.otp_attempts,
            });
        }

        self.status = InstallationStatus::Verified;
        self.verified_at = Some(now);
        self.otp_hash = None;
        self.otp_expires_at = None;
        self.updated_at = now;

        Ok(OtpOutcome::Verified)
    }

    pub fn record_quality_check(
        &mut self,
        passed: bool,
        notes: Option<String>,
        inspector: &Caller,
        now: DateTime<Utc>,
    ) {
        self.quality_check = Some(QualityCheck {
            passed,
            notes,
            checked_by: inspector.id.clone(),
            checked_at: now,
        });
        self.updated_at = now;
    }
}
