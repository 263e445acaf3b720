use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::{Caller, Result};
use crate::modules::projects::services::{
    CreateProjectInput, ListProjectsQuery, ProjectService, UpdateProjectInput,
};

type Service = web::Data<Arc<ProjectService>>;

#[derive(Debug, Deserialize)]
pub struct ReasonInput {
    #[serde(default)]
    pub reason: String,
}

/// Create a project from an approved quote
/// POST /api/projects
pub async fn create_project(
    service: Service,
    caller: web::ReqData<Caller>,
    request: web::Json<CreateProjectInput>,
) -> Result<HttpResponse> {
    let project = service.create_project(&caller, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

/// GET /api/projects
pub async fn list_projects(
    service: Service,
    caller: web::ReqData<Caller>,
    query: web::Query<ListProjectsQuery>,
) -> Result<HttpResponse> {
    let projects = service.list_projects(&caller, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// GET /api/projects/{id}
pub async fn get_project(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let project = service.get_project(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// PATCH /api/projects/{id}
pub async fn update_project(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<UpdateProjectInput>,
) -> Result<HttpResponse> {
    let project = service
        .update_project(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{id}/cancel
pub async fn cancel_project(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<ReasonInput>,
) -> Result<HttpResponse> {
    let project = service.cancel_project(&caller, &path, &request.reason).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{id}/hold
pub async fn hold_project(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<ReasonInput>,
) -> Result<HttpResponse> {
    let project = service.hold_project(&caller, &path, &request.reason).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{id}/resume
pub async fn resume_project(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let project = service.resume_project(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// GET /api/projects/{id}/timeline
pub async fn get_timeline(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let entries = service.get_timeline(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Configure project routes.
///
/// Registered as resources rather than a `/projects` scope so the nested
/// payment, installation and review scopes stay reachable.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/projects")
            .route(web::post().to(create_project))
            .route(web::get().to(list_projects)),
    )
    .service(
        web::resource("/projects/{id}")
            .route(web::get().to(get_project))
            .route(web::patch().to(update_project)),
    )
    .route("/projects/{id}/cancel", web::post().to(cancel_project))
    .route("/projects/{id}/hold", web::post().to(hold_project))
    .route("/projects/{id}/resume", web::post().to(resume_project))
    .route("/projects/{id}/timeline", web::get().to(get_timeline));
}
