use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{Caller, Result};
use crate::modules::installations::services::{
    CompleteInput, InstallationService, QualityCheckInput, ScheduleInput, VerifyInput,
};

type Service = web::Data<Arc<InstallationService>>;

/// POST /api/projects/{project_id}/installation/schedule
pub async fn schedule_installation(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<ScheduleInput>,
) -> Result<HttpResponse> {
    let project = service
        .schedule_installation(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/installation/start
pub async fn start_installation(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let project = service.start_installation(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/installation/complete
///
/// Sends the verification code to the owner; the code itself is never returned.
pub async fn complete_installation(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<CompleteInput>,
) -> Result<HttpResponse> {
    let project = service
        .complete_installation(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/installation/resend-otp
pub async fn resend_otp(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let project = service.resend_completion_otp(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/installation/verify
pub async fn verify_completion(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<VerifyInput>,
) -> Result<HttpResponse> {
    let project = service
        .verify_completion(&caller, &path, &request.otp)
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/installation/quality-check
pub async fn quality_check(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<QualityCheckInput>,
) -> Result<HttpResponse> {
    let project = service
        .perform_quality_check(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Configure installation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects/{project_id}/installation")
            .route("/schedule", web::post().to(schedule_installation))
            .route("/start", web::post().to(start_installation))
            .route("/complete", web::post().to(complete_installation))
            .route("/resend-otp", web::post().to(resend_otp))
            .route("/verify", web::post().to(verify_completion))
            .route("/quality-check", web::post().to(quality_check)),
    );
}
