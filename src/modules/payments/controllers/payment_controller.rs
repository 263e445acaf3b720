use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::{Caller, Result};
use crate::modules::payments::services::{
    AmountInput, PaymentEngine, ReleaseInput, SelectPaymentInput,
};

type Engine = web::Data<Arc<dyn PaymentEngine>>;

/// POST /api/projects/{project_id}/payment/method
pub async fn select_payment_method(
    engine: Engine,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<SelectPaymentInput>,
) -> Result<HttpResponse> {
    let project = engine
        .select_payment_method(&caller, &path, request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(project))
}

/// GET /api/projects/{project_id}/payment
///
/// Installment status and late fees are projected for today; nothing is persisted.
pub async fn get_payment_summary(
    engine: Engine,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let summary = engine.get_payment_summary(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// POST /api/projects/{project_id}/payment/full
pub async fn process_full_payment(
    engine: Engine,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<AmountInput>,
) -> Result<HttpResponse> {
    let project = engine
        .process_full_payment(&caller, &path, request.amount)
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/payment/downpayment
pub async fn process_downpayment(
    engine: Engine,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<AmountInput>,
) -> Result<HttpResponse> {
    let project = engine
        .process_downpayment(&caller, &path, request.amount)
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/payment/installments/{installment_id}
pub async fn pay_installment(
    engine: Engine,
    caller: web::ReqData<Caller>,
    path: web::Path<(String, String)>,
    request: web::Json<AmountInput>,
) -> Result<HttpResponse> {
    let (project_id, installment_id) = path.into_inner();
    let project = engine
        .pay_installment(&caller, &project_id, &installment_id, request.amount)
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// POST /api/projects/{project_id}/payment/release
pub async fn release_payment(
    engine: Engine,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    request: web::Json<ReleaseInput>,
) -> Result<HttpResponse> {
    let project = engine
        .release_payment_to_contractor(&caller, &path, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Configure payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/projects/{project_id}/payment")
            .route("", web::get().to(get_payment_summary))
            .route("/method", web::post().to(select_payment_method))
            .route("/full", web::post().to(process_full_payment))
            .route("/downpayment", web::post().to(process_downpayment))
            .route(
                "/installments/{installment_id}",
                web::post().to(pay_installment),
            )
            .route("/release", web::post().to(release_payment)),
    );
}
