use crate::core::{AppError, Caller, Result, Role};
use crate::modules::projects::models::{Project, ProjectAggregate};
use crate::modules::projects::repositories::ProjectStore;

/// Load a project aggregate the caller is allowed to see.
///
/// Invisible and missing projects are indistinguishable: both are `NotFound`.
pub async fn load_visible(
    store: &dyn ProjectStore,
    caller: &Caller,
    project_id: &str,
) -> Result<ProjectAggregate> {
    match store.load_aggregate(project_id).await? {
        Some(aggregate) if aggregate.project.is_visible_to(caller) => Ok(aggregate),
        _ => Err(AppError::not_found(format!("Project {} not found", project_id))),
    }
}

pub async fn find_visible(store: &dyn ProjectStore, caller: &Caller, project_id: &str) -> Result<Project> {
    match store.find_project(project_id).await? {
        Some(project) if project.is_visible_to(caller) => Ok(project),
        _ => Err(AppError::not_found(format!("Project {} not found", project_id))),
    }
}

pub fn require_owner(project: &Project, caller: &Caller, action: &str) -> Result<()> {
    if caller.role == Role::User && project.is_owner(caller) {
        return Ok(());
    }
    Err(AppError::forbidden(format!("Only the project owner can {}", action)))
}

pub fn require_contractor(project: &Project, caller: &Caller, action: &str) -> Result<()> {
    if caller.role == Role::Contractor && project.is_assigned_contractor(caller) {
        return Ok(());
    }
    Err(AppError::forbidden(format!(
        "Only the assigned contractor can {}",
        action
    )))
}

pub fn require_admin(caller: &Caller, action: &str) -> Result<()> {
    if caller.is_admin() {
        return Ok(());
    }
    Err(AppError::forbidden(format!("Only administrators can {}", action)))
}

/// Owner or admin tier
pub fn require_owner_or_admin(project: &Project, caller: &Caller, action: &str) -> Result<()> {
    if caller.is_admin() || require_owner(project, caller, action).is_ok() {
        return Ok(());
    }
    Err(AppError::forbidden(format!(
        "Only the project owner or an administrator can {}",
        action
    )))
}

/// Assigned contractor or admin tier
pub fn require_contractor_or_admin(project: &Project, caller: &Caller, action: &str) -> Result<()> {
    if caller.is_admin() || require_contractor(project, caller, action).is_ok() {
        return Ok(());
    }
    Err(AppError::forbidden(format!(
        "Only the assigned contractor or an administrator can {}",
        action
    )))
}
