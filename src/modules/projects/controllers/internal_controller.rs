use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{Caller, Result};
use crate::modules::projects::services::{ProjectService, StatusChangeInput, TimelineInput};

type Service = web::Data<Arc<ProjectService>>;

/// GET /internal/projects/{id}/info
pub async fn project_info(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let info = service.project_info(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(info))
}

/// PATCH /internal/projects/{id}/status
pub async fn change_status(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<StatusChangeInput>,
) -> Result<HttpResponse> {
    let info = service
        .change_status(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(info))
}

/// POST /internal/projects/{id}/timeline
pub async fn append_timeline(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<TimelineInput>,
) -> Result<HttpResponse> {
    let entry = service
        .append_timeline(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(entry))
}

/// Configure the service-to-service routes (mounted under `/internal`)
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects/{id}")
            .route("/info", web::get().to(project_info))
            .route("/status", web::patch().to(change_status))
            .route("/timeline", web::post().to(append_timeline)),
    );
}
