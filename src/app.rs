//! Service container and HTTP route wiring.

use actix_web::web;
use std::sync::Arc;

use crate::core::Clock;
use crate::middleware::{
    json_error_handler, path_error_handler, query_error_handler, IdentityAuth, ServiceKeyAuth,
};
use crate::modules::gateways::{NotificationGateway, PaymentProcessor, QuoteGateway, UserCreditGateway};
use crate::modules::installations::{InstallationService, OtpGenerator, OtpPolicy};
use crate::modules::payments::{PaymentEngine, PaymentService};
use crate::modules::projects::{ProjectService, ProjectStore};
use crate::modules::reviews::ReviewService;
use crate::modules::{health, installations, payments, projects, reviews};

/// Everything the services are built from
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ProjectStore>,
    pub quotes: Arc<dyn QuoteGateway>,
    pub users: Arc<dyn UserCreditGateway>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub otp: Arc<dyn OtpGenerator>,
    pub clock: Arc<dyn Clock>,
    pub otp_policy: OtpPolicy,
    pub currency: String,
}

/// Shared service handles registered as actix app data
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn ProjectStore>,
    pub projects: Arc<ProjectService>,
    pub payments: Arc<dyn PaymentEngine>,
    pub installations: Arc<InstallationService>,
    pub reviews: Arc<ReviewService>,
}

impl AppServices {
    /// Build every service around the local payment engine
    pub fn build(deps: Collaborators) -> Self {
        let payments: Arc<dyn PaymentEngine> = Arc::new(PaymentService::new(
            deps.store.clone(),
            deps.users.clone(),
            deps.processor.clone(),
            deps.clock.clone(),
            deps.currency.clone(),
        ));
        Self::with_payment_engine(deps, payments)
    }

    /// Build every service around a given payment engine (local or remote)
    pub fn with_payment_engine(deps: Collaborators, payments: Arc<dyn PaymentEngine>) -> Self {
        Self {
            projects: Arc::new(ProjectService::new(
                deps.store.clone(),
                deps.quotes.clone(),
                deps.clock.clone(),
            )),
            installations: Arc::new(InstallationService::new(
                deps.store.clone(),
                deps.users.clone(),
                deps.notifier.clone(),
                deps.otp.clone(),
                deps.clock.clone(),
                deps.otp_policy,
            )),
            reviews: Arc::new(ReviewService::new(deps.store.clone(), deps.clock.clone())),
            store: deps.store,
            payments,
        }
    }
}

/// Authentication material for the two API surfaces
#[derive(Clone)]
pub struct AuthSettings {
    pub identity_secret: Vec<u8>,
    pub internal_api_key_hash: String,
}

/// Register app data and every route.
///
/// `/api` requires a signed caller identity, `/internal` a service key, `/health` is open.
pub fn configure(cfg: &mut web::ServiceConfig, services: &AppServices, auth: &AuthSettings) {
    cfg.app_data(web::Data::new(services.store.clone()))
        .app_data(web::Data::new(services.projects.clone()))
        .app_data(web::Data::new(services.payments.clone()))
        .app_data(web::Data::new(services.installations.clone()))
        .app_data(web::Data::new(services.reviews.clone()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .configure(health::configure)
        .service(
            web::scope("/api")
                .wrap(IdentityAuth::new(auth.identity_secret.clone()))
                .configure(payments::configure)
                .configure(installations::configure)
                .configure(reviews::configure)
                .configure(projects::configure),
        )
        .service(
            web::scope("/internal")
                .wrap(ServiceKeyAuth::new(auth.internal_api_key_hash.clone()))
                .configure(projects::internal_controller::configure),
        );
}
