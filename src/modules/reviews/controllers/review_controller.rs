use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{Caller, Result};
use crate::modules::reviews::models::ReviewInput;
use crate::modules::reviews::services::{ResponseInput, ReviewService};

type Service = web::Data<Arc<ReviewService>>;

/// POST /api/projects/{project_id}/review
pub async fn create_review(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<ReviewInput>,
) -> Result<HttpResponse> {
    let review = service
        .create_review(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(review))
}

/// GET /api/projects/{project_id}/review
pub async fn get_review(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let review = service.get_review(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(review))
}

/// POST /api/projects/{project_id}/review/response
pub async fn respond_to_review(
    service: Service,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<ResponseInput>,
) -> Result<HttpResponse> {
    let review = service
        .respond_to_review(&caller, &path, &request.response)
        .await?;
    Ok(HttpResponse::Ok().json(review))
}

/// Configure review routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects/{project_id}/review")
            .route("", web::post().to(create_review))
            .route("", web::get().to(get_review))
            .route("/response", web::post().to(respond_to_review)),
    );
}
