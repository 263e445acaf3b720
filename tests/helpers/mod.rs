// Test harness shared by the contract and integration suites.
//
// Every collaborator is in-process: the in-memory project store, the gateway
// fakes, a fixed clock and a fixed OTP generator. Tests drive the services
// directly or through the actix app built by `app::configure`.

#![allow(dead_code)]

pub mod test_data;

pub use test_data::*;

use actix_web::test::TestRequest;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use solartrust::app::{AppServices, AuthSettings, Collaborators};
use solartrust::core::{Caller, FixedClock};
use solartrust::middleware::auth::{
    sign_identity, IDENTITY_SIGNATURE_HEADER, SERVICE_KEY_HEADER, USER_ID_HEADER, USER_ROLE_HEADER,
};
use solartrust::middleware::hash_api_key;
use solartrust::modules::gateways::fakes::{
    FakeNotificationGateway, FakePaymentProcessor, FakeQuoteGateway, FakeUserCreditGateway,
};
use solartrust::modules::gateways::FlagStatus;
use solartrust::modules::installations::services::{CompleteInput, FixedOtpGenerator, ScheduleInput};
use solartrust::modules::installations::OtpPolicy;
use solartrust::modules::payments::models::PaymentMethod;
use solartrust::modules::payments::services::SelectPaymentInput;
use solartrust::modules::projects::services::CreateProjectInput;
use solartrust::modules::projects::{InMemoryProjectStore, ProjectAggregate};

pub const IDENTITY_SECRET: &[u8] = b"test-identity-secret";
pub const SERVICE_KEY: &str = "internal-test-key";
pub const TEST_OTP: &str = "482913";

pub const USER_ID: &str = "user-1";
pub const CONTRACTOR_ID: &str = "contractor-1";
pub const ADMIN_ID: &str = "admin-1";

pub fn user() -> Caller {
    Caller::user(USER_ID)
}

pub fn contractor() -> Caller {
    Caller::contractor(CONTRACTOR_ID)
}

pub fn admin() -> Caller {
    Caller::admin(ADMIN_ID)
}

/// 2025-11-01 10:00 UTC
pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 1, 10, 0, 0).unwrap()
}

pub struct TestHarness {
    pub store: Arc<InMemoryProjectStore>,
    pub quotes: Arc<FakeQuoteGateway>,
    pub users: Arc<FakeUserCreditGateway>,
    pub processor: Arc<FakePaymentProcessor>,
    pub notifier: Arc<FakeNotificationGateway>,
    pub clock: FixedClock,
    pub services: AppServices,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryProjectStore::new());
        let quotes = Arc::new(FakeQuoteGateway::new());
        let users = Arc::new(FakeUserCreditGateway::new());
        let processor = Arc::new(FakePaymentProcessor::new());
        let notifier = Arc::new(FakeNotificationGateway::new());
        let clock = FixedClock::new(start_time());

        users.insert_user(USER_ID, FlagStatus::Green, dec!(50000));

        let services = AppServices::build(Collaborators {
            store: store.clone(),
            quotes: quotes.clone(),
            users: users.clone(),
            processor: processor.clone(),
            notifier: notifier.clone(),
            otp: Arc::new(FixedOtpGenerator::new(TEST_OTP)),
            clock: Arc::new(clock.clone()),
            otp_policy: OtpPolicy::default(),
            currency: "SAR".to_string(),
        });

        Self {
            store,
            quotes,
            users,
            processor,
            notifier,
            clock,
            services,
        }
    }

    pub fn auth() -> AuthSettings {
        AuthSettings {
            identity_secret: IDENTITY_SECRET.to_vec(),
            internal_api_key_hash: hash_api_key(SERVICE_KEY).unwrap(),
        }
    }

    /// Register an approved quote for the default user and contractor
    pub fn approved_quote(&self, base_price: Decimal) -> CreateProjectInput {
        let quote = quote_for(USER_ID, CONTRACTOR_ID, base_price);
        let input = CreateProjectInput {
            request_id: quote.request_id.clone(),
            contractor_id: quote.contractor_id.clone(),
        };
        self.quotes.insert(quote);
        input
    }

    pub async fn create_project(&self, base_price: Decimal) -> ProjectAggregate {
        let input = self.approved_quote(base_price);
        self.services
            .projects
            .create_project(&user(), input)
            .await
            .expect("project creation")
    }

    /// Project with single pay selected and paid in full
    pub async fn paid_single_pay_project(&self, total: Decimal) -> ProjectAggregate {
        let project = self.create_project(total).await;
        let id = project.project.id.clone();

        self.services
            .payments
            .select_payment_method(
                &user(),
                &id,
                SelectPaymentInput {
                    method: PaymentMethod::SinglePay,
                    downpayment_amount: None,
                    number_of_installments: None,
                },
            )
            .await
            .expect("select single pay");

        self.services
            .payments
            .process_full_payment(&user(), &id, total)
            .await
            .expect("full payment")
    }

    /// Project with BNPL selected (nothing paid yet)
    pub async fn bnpl_project(&self, total: Decimal, downpayment: Decimal, installments: i32) -> ProjectAggregate {
        let project = self.create_project(total).await;

        self.services
            .payments
            .select_payment_method(
                &user(),
                &project.project.id,
                SelectPaymentInput {
                    method: PaymentMethod::Bnpl,
                    downpayment_amount: Some(downpayment),
                    number_of_installments: Some(installments),
                },
            )
            .await
            .expect("select bnpl")
    }

    /// Paid project with installation scheduled for tomorrow and started
    pub async fn installation_in_progress(&self) -> ProjectAggregate {
        let project = self.paid_single_pay_project(dec!(15000)).await;
        let id = project.project.id.clone();

        self.services
            .installations
            .schedule_installation(
                &contractor(),
                &id,
                ScheduleInput {
                    scheduled_date: start_time() + chrono::Duration::days(1),
                    notes: None,
                },
            )
            .await
            .expect("schedule installation");

        self.services
            .installations
            .start_installation(&contractor(), &id)
            .await
            .expect("start installation")
    }

    /// Installation completed, code sent to the owner
    pub async fn awaiting_verification(&self) -> ProjectAggregate {
        let project = self.installation_in_progress().await;

        self.services
            .installations
            .complete_installation(
                &contractor(),
                &project.project.id,
                CompleteInput {
                    equipment_installed: vec!["12x 450W panel".to_string(), "8kW inverter".to_string()],
                    notes: None,
                },
            )
            .await
            .expect("complete installation")
    }

    /// Installation verified by the owner, ready for review
    pub async fn verified_project(&self) -> ProjectAggregate {
        let project = self.awaiting_verification().await;

        self.services
            .installations
            .verify_completion(&user(), &project.project.id, TEST_OTP)
            .await
            .expect("verify installation")
    }
}

/// Attach signed identity headers for `caller`
pub fn signed(request: TestRequest, caller: &Caller) -> TestRequest {
    let role = caller.role.as_str();
    request
        .insert_header((USER_ID_HEADER, caller.id.as_str()))
        .insert_header((USER_ROLE_HEADER, role))
        .insert_header((
            IDENTITY_SIGNATURE_HEADER,
            sign_identity(IDENTITY_SECRET, &caller.id, role).unwrap(),
        ))
}

/// Attach the internal service key
pub fn with_service_key(request: TestRequest) -> TestRequest {
    request.insert_header((SERVICE_KEY_HEADER, SERVICE_KEY))
}
