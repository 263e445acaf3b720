use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::money::{format_amount, round2};
use crate::core::{AppError, Caller, Clock, Result, Role};
use crate::modules::gateways::{QuoteGateway, QuoteStatus};
use crate::modules::projects::models::{
    Project, ProjectAggregate, ProjectStatus, TimelineEntry, TimelineEventType,
};
use crate::modules::projects::repositories::{ProjectFilter, ProjectStore, UnitOfWork};

use super::access;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub request_id: String,
    pub contractor_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub site_address: Option<String>,
    #[serde(default)]
    pub system_size_kwp: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Status change requested by a peer service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeInput {
    pub status: ProjectStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Timeline entry appended by a peer service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineInput {
    pub event_type: TimelineEventType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Project slice exposed to peer services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub user_id: String,
    pub contractor_id: String,
    pub quote_id: String,
    pub total_amount: Decimal,
    pub status: ProjectStatus,
}

impl From<&Project> for ProjectInfo {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            user_id: project.user_id.clone(),
            contractor_id: project.contractor_id.clone(),
            quote_id: project.quote_id.clone(),
            total_amount: project.total_amount,
            status: project.status,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Project lifecycle: creation from a quote, edits, cancellation and hold
pub struct ProjectService {
    store: Arc<dyn ProjectStore>,
    quotes: Arc<dyn QuoteGateway>,
    clock: Arc<dyn Clock>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn ProjectStore>, quotes: Arc<dyn QuoteGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { store, quotes, clock }
    }

    pub async fn create_project(&self, caller: &Caller, input: CreateProjectInput) -> Result<ProjectAggregate> {
        if caller.role != Role::User {
            return Err(AppError::forbidden("Only users can create projects"));
        }

        let request_id = required(&input.request_id, "request_id")?;
        let contractor_id = required(&input.contractor_id, "contractor_id")?;

        let quote = self.quotes.fetch_quote(&request_id, &contractor_id).await?;

        if quote.user_id != caller.id {
            return Err(AppError::business_rule("Quote does not belong to this user"));
        }
        if quote.admin_status != QuoteStatus::Approved {
            return Err(AppError::business_rule(format!(
                "Quote must be approved before it can become a project (status: {})",
                quote.admin_status.as_str()
            )));
        }
        if quote.converted_to_project {
            return Err(AppError::business_rule("Quote has already been converted to a project"));
        }
        if self.store.find_project_by_quote(&quote.id).await?.is_some() {
            return Err(AppError::conflict(format!(
                "A project already exists for quote '{}'",
                quote.id
            )));
        }

        let now = self.clock.now();
        let project = Project::new(
            caller.id.clone(),
            quote.contractor_id.clone(),
            quote.id.clone(),
            quote.request_id.clone(),
            round2(quote.base_price),
            quote.system_specs.system_size_kwp,
            now,
        )?;

        let entry = TimelineEntry::new(
            &project.id,
            TimelineEventType::ProjectCreated,
            "Project created",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "quote_id": project.quote_id,
            "contractor_id": project.contractor_id,
            "total_amount": format_amount(project.total_amount),
        }));

        self.store.insert_project(&project, &entry).await?;

        info!(
            project_id = %project.id,
            quote_id = %project.quote_id,
            user_id = %project.user_id,
            contractor_id = %project.contractor_id,
            total = %project.total_amount,
            "Project created"
        );

        Ok(ProjectAggregate::new(project))
    }

    pub async fn get_project(&self, caller: &Caller, project_id: &str) -> Result<ProjectAggregate> {
        access::load_visible(self.store.as_ref(), caller, project_id).await
    }

    pub async fn list_projects(&self, caller: &Caller, query: ListProjectsQuery) -> Result<Vec<Project>> {
        let mut filter = ProjectFilter {
            status: query.status,
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: query.offset.unwrap_or(0),
            ..Default::default()
        };

        match caller.role {
            Role::User => filter.user_id = Some(caller.id.clone()),
            Role::Contractor => filter.contractor_id = Some(caller.id.clone()),
            Role::Admin | Role::SuperAdmin | Role::System => {}
        }

        self.store.list_projects(&filter).await
    }

    pub async fn get_timeline(&self, caller: &Caller, project_id: &str) -> Result<Vec<TimelineEntry>> {
        let project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        self.store.list_timeline(&project.id).await
    }

    pub async fn update_project(
        &self,
        caller: &Caller,
        project_id: &str,
        input: UpdateProjectInput,
    ) -> Result<ProjectAggregate> {
        let mut project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner_or_admin(&project, caller, "update the project")?;

        if project.status.is_terminal() {
            return Err(AppError::business_rule(format!(
                "Project is {} and can no longer be updated",
                project.status
            )));
        }

        let notes = non_empty(input.notes);
        let site_address = non_empty(input.site_address);

        if let Some(size) = input.system_size_kwp {
            if size <= Decimal::ZERO {
                return Err(AppError::validation("system_size_kwp must be positive"));
            }
        }

        let mut changed = Vec::new();
        if let Some(notes) = notes {
            project.notes = Some(notes);
            changed.push("notes");
        }
        if let Some(site_address) = site_address {
            project.site_address = Some(site_address);
            changed.push("site_address");
        }
        if let Some(size) = input.system_size_kwp {
            project.system_size_kwp = size;
            changed.push("system_size_kwp");
        }

        if changed.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let now = self.clock.now();
        project.updated_at = now;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::ProjectUpdated,
            "Project updated",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({ "fields": changed }));

        self.store.commit(UnitOfWork::new(project).append(entry)).await?;

        info!(project_id = %project_id, fields = ?changed, "Project updated");

        self.get_project(caller, project_id).await
    }

    pub async fn cancel_project(&self, caller: &Caller, project_id: &str, reason: &str) -> Result<ProjectAggregate> {
        let aggregate = access::load_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_owner_or_admin(&aggregate.project, caller, "cancel the project")?;
        let reason = required(reason, "reason")?;

        let mut project = aggregate.project;
        let previous = project.status;
        let now = self.clock.now();
        project.cancel(reason.clone(), now)?;

        if let Some(payment) = aggregate.payment.as_ref().filter(|p| p.credit_amount_used > Decimal::ZERO) {
            warn!(
                project_id = %project_id,
                credit_used = %payment.credit_amount_used,
                "Cancelled project had deducted credit; it is not restored automatically"
            );
        }

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::ProjectCancelled,
            "Project cancelled",
            caller,
            now,
        )
        .with_description(reason)
        .with_metadata(serde_json::json!({ "previous_status": previous }));

        self.store.commit(UnitOfWork::new(project).append(entry)).await?;

        info!(project_id = %project_id, from = %previous, by = %caller.id, "Project cancelled");

        self.get_project(caller, project_id).await
    }

    pub async fn hold_project(&self, caller: &Caller, project_id: &str, reason: &str) -> Result<ProjectAggregate> {
        let mut project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_admin(caller, "put projects on hold")?;
        let reason = required(reason, "reason")?;

        let previous = project.status;
        let now = self.clock.now();
        project.hold(now)?;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::ProjectOnHold,
            "Project put on hold",
            caller,
            now,
        )
        .with_description(reason)
        .with_metadata(serde_json::json!({ "previous_status": previous }));

        self.store.commit(UnitOfWork::new(project).append(entry)).await?;

        info!(project_id = %project_id, from = %previous, "Project put on hold");

        self.get_project(caller, project_id).await
    }

    pub async fn resume_project(&self, caller: &Caller, project_id: &str) -> Result<ProjectAggregate> {
        let mut project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        access::require_admin(caller, "resume projects")?;

        let now = self.clock.now();
        let restored = project.resume(now)?;

        let entry = TimelineEntry::new(
            project_id,
            TimelineEventType::ProjectResumed,
            "Project resumed",
            caller,
            now,
        )
        .with_metadata(serde_json::json!({ "restored_status": restored }));

        self.store.commit(UnitOfWork::new(project).append(entry)).await?;

        info!(project_id = %project_id, to = %restored, "Project resumed");

        self.get_project(caller, project_id).await
    }

    pub async fn project_info(&self, caller: &Caller, project_id: &str) -> Result<ProjectInfo> {
        let project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        Ok(ProjectInfo::from(&project))
    }

    /// Apply a status change requested over the internal API
    pub async fn change_status(
        &self,
        caller: &Caller,
        project_id: &str,
        input: StatusChangeInput,
    ) -> Result<ProjectInfo> {
        let mut project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        let previous = project.status;
        let reason = non_empty(input.reason);
        let now = self.clock.now();

        match input.status {
            ProjectStatus::OnHold => project.hold(now)?,
            ProjectStatus::Cancelled => project.cancel(
                reason.clone().unwrap_or_else(|| "Cancelled by internal service".to_string()),
                now,
            )?,
            target if project.status == ProjectStatus::OnHold => {
                if project.status_before_hold != Some(target) {
                    return Err(AppError::business_rule(format!(
                        "An on-hold project can only resume to {}",
                        project
                            .status_before_hold
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "its previous status".to_string())
                    )));
                }
                project.resume(now)?;
            }
            target => project.transition_to(target, now)?,
        }

        let mut entry = TimelineEntry::new(
            project_id,
            TimelineEventType::StatusChanged,
            format!("Status changed to {}", project.status),
            caller,
            now,
        )
        .with_metadata(serde_json::json!({
            "from": previous,
            "to": project.status,
        }));
        if let Some(reason) = reason {
            entry = entry.with_description(reason);
        }

        let info = ProjectInfo::from(&project);
        self.store.commit(UnitOfWork::new(project).append(entry)).await?;

        info!(project_id = %project_id, from = %previous, to = %info.status, "Status changed by internal service");

        Ok(info)
    }

    /// Append a timeline entry on behalf of a peer service
    pub async fn append_timeline(
        &self,
        caller: &Caller,
        project_id: &str,
        input: TimelineInput,
    ) -> Result<TimelineEntry> {
        let project = access::find_visible(self.store.as_ref(), caller, project_id).await?;
        let title = required(&input.title, "title")?;

        let actor = match non_empty(input.actor_id) {
            Some(actor_id) => Caller::new(actor_id, Role::System),
            None => caller.clone(),
        };

        let mut entry = TimelineEntry::new(project_id, input.event_type, title, &actor, self.clock.now());
        if let Some(description) = non_empty(input.description) {
            entry = entry.with_description(description);
        }
        if let Some(metadata) = input.metadata {
            entry = entry.with_metadata(metadata);
        }

        self.store
            .commit(UnitOfWork::new(project).append(entry.clone()))
            .await?;

        Ok(entry)
    }
}
