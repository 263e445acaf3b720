// HTTP contract for the caller-facing `/api` surface

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use helpers::*;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use solartrust::app;
use solartrust::core::Caller;
use solartrust::modules::payments::services::PaymentSummary;
use solartrust::modules::projects::{Project, ProjectAggregate, ProjectStatus, TimelineEntry};
use solartrust::modules::reviews::models::ProjectReview;

/// Status of a response, including errors raised by middleware
macro_rules! status_of {
    ($app:expr, $req:expr) => {
        match test::try_call_service($app, $req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        }
    };
}

#[actix_web::test]
async fn test_requests_without_identity_are_rejected() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = test::TestRequest::get().uri("/api/projects").to_request();
    assert_eq!(status_of!(&app, req), StatusCode::UNAUTHORIZED);

    // Signature for a different role
    let forged = test::TestRequest::get()
        .uri("/api/projects")
        .insert_header(("X-User-Id", USER_ID))
        .insert_header(("X-User-Role", "admin"))
        .insert_header((
            "X-Identity-Signature",
            solartrust::middleware::sign_identity(IDENTITY_SECRET, USER_ID, "user").unwrap(),
        ))
        .to_request();
    assert_eq!(status_of!(&app, forged), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_health_is_open() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_create_and_fetch_project() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let input = h.approved_quote(dec!(15000));
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(test::TestRequest::post().uri("/api/projects"), &user())
        .set_json(&input)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: ProjectAggregate = test::read_body_json(resp).await;
    assert_eq!(created.project.status, ProjectStatus::PaymentPending);
    assert_eq!(created.project.total_amount, dec!(15000));

    let req = signed(
        test::TestRequest::get().uri(&format!("/api/projects/{}", created.project.id)),
        &contractor(),
    )
    .to_request();
    let fetched: ProjectAggregate = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched.project.id, created.project.id);

    // Same quote again
    let req = signed(test::TestRequest::post().uri("/api/projects"), &user())
        .set_json(&input)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["kind"], "conflict");
}

#[actix_web::test]
async fn test_invisible_project_is_not_found() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let project = h.create_project(dec!(15000)).await.project;
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(
        test::TestRequest::get().uri(&format!("/api/projects/{}", project.id)),
        &Caller::user("user-2"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_list_is_scoped_and_filterable() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    h.create_project(dec!(15000)).await;
    h.paid_single_pay_project(dec!(12000)).await;
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(test::TestRequest::get().uri("/api/projects"), &user()).to_request();
    let all: Vec<Project> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.len(), 2);

    let req = signed(
        test::TestRequest::get().uri("/api/projects?status=payment_completed"),
        &user(),
    )
    .to_request();
    let paid: Vec<Project> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].status, ProjectStatus::PaymentCompleted);

    let req = signed(test::TestRequest::get().uri("/api/projects"), &Caller::user("user-2")).to_request();
    let none: Vec<Project> = test::call_and_read_body_json(&app, req).await;
    assert!(none.is_empty());

    let req = signed(test::TestRequest::get().uri("/api/projects?status=archived"), &user()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_update_cancel_and_timeline() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let project = h.create_project(dec!(15000)).await.project;
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(
        test::TestRequest::patch().uri(&format!("/api/projects/{}", project.id)),
        &user(),
    )
    .set_json(json!({ "site_address": "12 Olaya St, Riyadh" }))
    .to_request();
    let updated: ProjectAggregate = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated.project.site_address.as_deref(), Some("12 Olaya St, Riyadh"));

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/cancel", project.id)),
        &user(),
    )
    .set_json(json!({}))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/cancel", project.id)),
        &user(),
    )
    .set_json(json!({ "reason": "Found a cheaper offer" }))
    .to_request();
    let cancelled: ProjectAggregate = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cancelled.project.status, ProjectStatus::Cancelled);

    let req = signed(
        test::TestRequest::get().uri(&format!("/api/projects/{}/timeline", project.id)),
        &user(),
    )
    .to_request();
    let timeline: Vec<TimelineEntry> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(timeline.len(), 3);
}

#[actix_web::test]
async fn test_hold_requires_admin() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let project = h.create_project(dec!(15000)).await.project;
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let hold = |caller: &Caller| {
        signed(
            test::TestRequest::post().uri(&format!("/api/projects/{}/hold", project.id)),
            caller,
        )
        .set_json(json!({ "reason": "Permit review" }))
        .to_request()
    };

    let resp = test::call_service(&app, hold(&user())).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let held: ProjectAggregate = test::call_and_read_body_json(&app, hold(&admin())).await;
    assert_eq!(held.project.status, ProjectStatus::OnHold);

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/resume", project.id)),
        &admin(),
    )
    .to_request();
    let resumed: ProjectAggregate = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resumed.project.status, ProjectStatus::PaymentPending);
}

#[actix_web::test]
async fn test_payment_routes() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let project = h.create_project(dec!(15000)).await.project;
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/payment/method", project.id)),
        &user(),
    )
    .set_json(json!({ "method": "single_pay" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/payment/full", project.id)),
        &user(),
    )
    .set_json(json!({ "amount": "15000.00" }))
    .to_request();
    let paid: ProjectAggregate = test::call_and_read_body_json(&app, req).await;
    assert_eq!(paid.project.status, ProjectStatus::PaymentCompleted);

    let req = signed(
        test::TestRequest::get().uri(&format!("/api/projects/{}/payment", project.id)),
        &contractor(),
    )
    .to_request();
    let summary: PaymentSummary = test::call_and_read_body_json(&app, req).await;
    assert!(summary.payment.is_completed());
    assert_eq!(summary.transactions.len(), 1);
}

#[actix_web::test]
async fn test_declined_payment_maps_to_402() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let project = h.create_project(dec!(15000)).await.project;
    h.services
        .payments
        .select_payment_method(
            &user(),
            &project.id,
            solartrust::modules::payments::services::SelectPaymentInput {
                method: solartrust::modules::payments::models::PaymentMethod::SinglePay,
                downpayment_amount: None,
                number_of_installments: None,
            },
        )
        .await
        .unwrap();
    h.processor.decline_next();
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/payment/full", project.id)),
        &user(),
    )
    .set_json(json!({ "amount": "15000" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["kind"], "payment");
}

#[actix_web::test]
async fn test_installation_and_review_routes() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let project = h.awaiting_verification().await.project;
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let verify = |otp: &str| {
        signed(
            test::TestRequest::post().uri(&format!("/api/projects/{}/installation/verify", project.id)),
            &user(),
        )
        .set_json(json!({ "otp": otp }))
        .to_request()
    };

    let resp = test::call_service(&app, verify("111111")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let verified: ProjectAggregate = test::call_and_read_body_json(&app, verify(TEST_OTP)).await;
    assert_eq!(verified.project.status, ProjectStatus::InstallationCompleted);

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/review", project.id)),
        &user(),
    )
    .set_json(json!({ "rating": 4, "comment": "Good work" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = signed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/review/response", project.id)),
        &contractor(),
    )
    .set_json(json!({ "response": "Thanks!" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = signed(
        test::TestRequest::get().uri(&format!("/api/projects/{}/review", project.id)),
        &admin(),
    )
    .to_request();
    let review: ProjectReview = test::call_and_read_body_json(&app, req).await;
    assert_eq!(review.rating, 4);
    assert_eq!(review.contractor_response.as_deref(), Some("Thanks!"));
}

#[actix_web::test]
async fn test_malformed_json_is_validation_error() {
    let h = TestHarness::new();
    let auth = TestHarness::auth();
    let app = test::init_service(App::new().configure(|cfg| app::configure(cfg, &h.services, &auth))).await;

    let req = signed(test::TestRequest::post().uri("/api/projects"), &user())
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"request_id\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["kind"], "validation");
}
