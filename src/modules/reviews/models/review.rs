use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Post-completion review of a project (one per project)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReview {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub contractor_id: String,
    pub rating: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_rating: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeliness_rating: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_rating: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professionalism_rating: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Write-once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ratings submitted by the project owner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    #[serde(default)]
    pub quality_rating: Option<i16>,
    #[serde(default)]
    pub timeliness_rating: Option<i16>,
    #[serde(default)]
    pub communication_rating: Option<i16>,
    #[serde(default)]
    pub professionalism_rating: Option<i16>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn check_rating(name: &str, value: i16) -> Result<()> {
    if !(1..=5).contains(&value) {
        return Err(AppError::validation(format!(
            "{} must be between 1 and 5, got {}",
            name, value
        )));
    }
    Ok(())
}

impl ReviewInput {
    pub fn validate(&self) -> Result<()> {
        check_rating("rating", self.rating)?;

        let sub_ratings = [
            ("quality_rating", self.quality_rating),
            ("timeliness_rating", self.timeliness_rating),
            ("communication_rating", self.communication_rating),
            ("professionalism_rating", self.professionalism_rating),
        ];
        for (name, value) in sub_ratings {
            if let Some(value) = value {
                check_rating(name, value)?;
            }
        }

        if let Some(comment) = &self.comment {
            if comment.chars().count() > 2000 {
                return Err(AppError::validation("Comment must be at most 2000 characters"));
            }
        }

        Ok(())
    }
}

impl ProjectReview {
    pub fn new(
        project_id: &str,
        user_id: &str,
        contractor_id: &str,
        input: ReviewInput,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        input.validate()?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            contractor_id: contractor_id.to_string(),
            rating: input.rating,
            quality_rating: input.quality_rating,
            timeliness_rating: input.timeliness_rating,
            communication_rating: input.communication_rating,
            professionalism_rating: input.professionalism_rating,
            comment: input.comment.filter(|c| !c.trim().is_empty()),
            contractor_response: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn respond(&mut self, response: String, now: DateTime<Utc>) -> Result<()> {
        if self.contractor_response.is_some() {
            return Err(AppError::business_rule(
                "Contractor has already responded to this review",
            ));
        }

        let response = response.trim().to_string();
        if response.is_empty() {
            return Err(AppError::validation("Response cannot be empty"));
        }

        self.contractor_response = Some(response);
        self.responded_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
