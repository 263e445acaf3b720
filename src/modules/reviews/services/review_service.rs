use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::core::{AppError, Caller, Clock, Result};
use crate::modules::projects::models::{ProjectStatus, TimelineEntry, TimelineEventType};
use crate::modules::projects::repositories::{ProjectStore, UnitOfWork};
use crate::modules::projects::services::access;
use crate::modules::reviews::models::{ProjectReview, ReviewInput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseInput {
    pub response: String,
}

/// Owner reviews and contractor responses
pub struct ReviewService {
    store: Arc<dyn ProjectStore>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn ProjectStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Submit the owner's review. This closes the project.
    pub async fn create_review(
        &self,
        caller: &Caller,
        project_id: &str,
        input: ReviewInput,
    ) -> Result<ProjectReview> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner(&aggregate.project, caller, "review the project")?;

        if aggregate.review.is_some() {
            return Err(AppError::conflict("This project has already been reviewed"));
        }

        let mut project = aggregate.project;
        if !matches!(
            project.status,
            ProjectStatus::InstallationCompleted | ProjectStatus::Completed
        ) {
            return Err(AppError::business_rule(format!(
                "Reviews can only be submitted after installation is verified (status: {})",
                project.status
            )));
        }

        let now = self.clock.now();
        let review = ProjectReview::new(
            project_id,
            &project.user_id,
            &project.contractor_id,
            input,
            now,
        )?;

        let mut unit_entries = vec![TimelineEntry::new(
            project_id,
            TimelineEventType::ReviewSubmitted,
            format!("Review submitted ({}/5)", review.rating),
            caller,
            now,
        )
        .with_metadata(serde_json::json!({ "rating": review.rating }))];

        if project.status != ProjectStatus::Completed {
            project.transition_to(ProjectStatus::Completed, now)?;
            unit_entries.push(TimelineEntry::new(
                project_id,
                TimelineEventType::ProjectCompleted,
                "Project completed",
                caller,
                now,
            ));
        }

        let unit = unit_entries
            .into_iter()
            .fold(UnitOfWork::new(project).insert_review(review.clone()), |unit, entry| {
                unit.append(entry)
            });
        self.store.commit(unit).await?;

        info!(project_id = %project_id, rating = review.rating, "Review submitted; project completed");

        Ok(review)
    }

    pub async fn respond_to_review(
        &self,
        caller: &Caller,
        project_id: &str,
        response: &str,
    ) -> Result<ProjectReview> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_contractor(&aggregate.project, caller, "respond to the review")?;

        let mut review = aggregate
            .review
            .ok_or_else(|| AppError::not_found(format!("Review for project {} not found", project_id)))?;

        let now = self.clock.now();
        review.respond(response.to_string(), now)?;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::ReviewResponse,
            "Contractor responded to review",
            caller,
            now,
        );

        self.store
            .commit(
                UnitOfWork::new(aggregate.project)
                    .update_review(review.clone())
                    .append(entry),
            )
            .await?;

        info!(project_id = %project_id, contractor_id = %caller.id, "Review response recorded");

        Ok(review)
    }

    pub async fn get_review(&self, caller: &Caller, project_id: &str) -> Result<ProjectReview> {
        access::load_visible(self.store.as_ref(), caller, project_id)
            .await?
            .review
            .ok_or_else(|| AppError::not_found(format!("Review for project {} not found", project_id)))
    }
}
