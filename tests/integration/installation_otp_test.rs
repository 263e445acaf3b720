// Installation scheduling, completion codes and owner verification

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Duration;
use helpers::*;
use rust_decimal_macros::dec;

use solartrust::core::{Caller, ErrorKind};
use solartrust::modules::gateways::FlagStatus;
use solartrust::modules::installations::models::InstallationStatus;
use solartrust::modules::installations::services::otp::otp_matches;
use solartrust::modules::installations::services::{CompleteInput, QualityCheckInput, ScheduleInput};
use solartrust::modules::payments::models::PaymentMethod;
use solartrust::modules::payments::services::SelectPaymentInput;
use solartrust::modules::projects::{ProjectStatus, TimelineEventType};

fn tomorrow() -> ScheduleInput {
    ScheduleInput {
        scheduled_date: start_time() + Duration::days(1),
        notes: Some("Morning slot".to_string()),
    }
}

fn equipment() -> CompleteInput {
    CompleteInput {
        equipment_installed: vec!["12x 450W panel".to_string(), "8kW inverter".to_string()],
        notes: Some("Roof mount, south facing".to_string()),
    }
}

#[tokio::test]
async fn test_single_pay_must_be_complete_before_scheduling() {
    let h = TestHarness::new();
    let project = h.create_project(dec!(15000)).await.project;

    // No payment method yet
    let err = h
        .services
        .installations
        .schedule_installation(&contractor(), &project.id, tomorrow())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    h.services
        .payments
        .select_payment_method(
            &user(),
            &project.id,
            SelectPaymentInput {
                method: PaymentMethod::SinglePay,
                downpayment_amount: None,
                number_of_installments: None,
            },
        )
        .await
        .unwrap();

    let err = h
        .services
        .installations
        .schedule_installation(&contractor(), &project.id, tomorrow())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn test_schedule_and_reschedule() {
    let h = TestHarness::new();
    let project = h.paid_single_pay_project(dec!(15000)).await.project;

    let err = h
        .services
        .installations
        .schedule_installation(&user(), &project.id, tomorrow())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let yesterday = ScheduleInput {
        scheduled_date: start_time() - Duration::days(1),
        notes: None,
    };
    let err = h
        .services
        .installations
        .schedule_installation(&contractor(), &project.id, yesterday)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let scheduled = h
        .services
        .installations
        .schedule_installation(&contractor(), &project.id, tomorrow())
        .await
        .unwrap();
    assert_eq!(scheduled.project.status, ProjectStatus::InstallationScheduled);
    let installation = scheduled.installation.as_ref().unwrap();
    assert_eq!(installation.status, InstallationStatus::Scheduled);
    let installation_id = installation.id.clone();

    let later = ScheduleInput {
        scheduled_date: start_time() + Duration::days(5),
        notes: None,
    };
    let rescheduled = h
        .services
        .installations
        .schedule_installation(&admin(), &project.id, later)
        .await
        .unwrap();
    let installation = rescheduled.installation.as_ref().unwrap();
    assert_eq!(installation.id, installation_id);
    assert_eq!(installation.scheduled_date, start_time() + Duration::days(5));
    assert_eq!(installation.installation_notes.as_deref(), Some("Morning slot"));
}

#[tokio::test]
async fn test_start_is_contractor_only_and_once() {
    let h = TestHarness::new();
    let project = h.paid_single_pay_project(dec!(15000)).await.project;
    h.services
        .installations
        .schedule_installation(&contractor(), &project.id, tomorrow())
        .await
        .unwrap();

    let err = h
        .services
        .installations
        .start_installation(&Caller::contractor("contractor-2"), &project.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let started = h.services.installations.start_installation(&contractor(), &project.id).await.unwrap();
    assert_eq!(started.project.status, ProjectStatus::InstallationInProgress);
    assert!(started.installation.as_ref().unwrap().started_at.is_some());

    let err = h
        .services
        .installations
        .start_installation(&contractor(), &project.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn test_completion_sends_code_to_owner() {
    let h = TestHarness::new();
    let project = h.installation_in_progress().await.project;

    let err = h
        .services
        .installations
        .complete_installation(
            &contractor(),
            &project.id,
            CompleteInput {
                equipment_installed: vec!["  ".to_string()],
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.notifier.sent().is_empty());

    let completed = h
        .services
        .installations
        .complete_installation(&contractor(), &project.id, equipment())
        .await
        .unwrap();

    let installation = completed.installation.as_ref().unwrap();
    assert_eq!(installation.status, InstallationStatus::AwaitingVerification);
    assert_eq!(installation.equipment_installed.len(), 2);
    assert_eq!(installation.otp_expires_at, Some(start_time() + Duration::minutes(10)));
    let stored = installation.otp_hash.as_deref().unwrap();
    assert_ne!(stored, TEST_OTP);
    assert!(otp_matches(&installation.id, TEST_OTP, stored));
    // Project stays in progress until the owner confirms
    assert_eq!(completed.project.status, ProjectStatus::InstallationInProgress);

    let message = h.notifier.last().unwrap();
    assert!(message.message.contains(TEST_OTP));
    assert_eq!(message.project_id, project.id);
}

#[tokio::test]
async fn test_out_of_order_completion_sends_no_code() {
    let h = TestHarness::new();
    let project = h.installation_in_progress().await.project;

    // Nothing to resend before completion
    let err = h
        .services
        .installations
        .resend_completion_otp(&contractor(), &project.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(h.notifier.sent().is_empty());

    h.services
        .installations
        .complete_installation(&contractor(), &project.id, equipment())
        .await
        .unwrap();
    assert_eq!(h.notifier.sent().len(), 1);

    let err = h
        .services
        .installations
        .complete_installation(&contractor(), &project.id, equipment())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_leaves_installation_in_progress() {
    let h = TestHarness::new();
    let project = h.installation_in_progress().await.project;
    h.notifier.fail_next();

    let err = h
        .services
        .installations
        .complete_installation(&contractor(), &project.id, equipment())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);

    let aggregate = h.services.projects.get_project(&contractor(), &project.id).await.unwrap();
    assert_eq!(aggregate.installation.unwrap().status, InstallationStatus::InProgress);

    // A retry goes through
    h.services
        .installations
        .complete_installation(&contractor(), &project.id, equipment())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_owner_without_phone_cannot_receive_code() {
    let h = TestHarness::new();
    let project = h.installation_in_progress().await.project;
    h.users.insert_profile(solartrust::modules::gateways::CreditProfile {
        id: USER_ID.to_string(),
        phone: None,
        flag_status: FlagStatus::Green,
        sama_credit_amount: dec!(0),
    });

    let err = h
        .services
        .installations
        .complete_installation(&contractor(), &project.id, equipment())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_wrong_code_consumes_attempts_until_lockout() {
    let h = TestHarness::new();
    let project = h.awaiting_verification().await.project;

    for remaining in [2, 1, 0] {
        let err = h
            .services
            .installations
            .verify_completion(&user(), &project.id, "000000")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(
            err.message().contains(&format!("{} attempt(s) remaining", remaining)),
            "{}",
            err.message()
        );
    }

    let stored = h.services.projects.get_project(&user(), &project.id).await.unwrap();
    assert_eq!(stored.installation.unwrap().otp_attempts, 3);

    // Locked out even with the right code
    let err = h
        .services
        .installations
        .verify_completion(&user(), &project.id, TEST_OTP)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    // Resend starts a fresh cycle
    let resent = h.services.installations.resend_completion_otp(&contractor(), &project.id).await.unwrap();
    assert_eq!(resent.installation.as_ref().unwrap().otp_attempts, 0);
    assert_eq!(h.notifier.sent().len(), 2);

    let verified = h
        .services
        .installations
        .verify_completion(&user(), &project.id, TEST_OTP)
        .await
        .unwrap();
    assert_eq!(verified.project.status, ProjectStatus::InstallationCompleted);
}

#[tokio::test]
async fn test_expired_code_rejected() {
    let h = TestHarness::new();
    let project = h.awaiting_verification().await.project;
    h.clock.advance(Duration::minutes(11));

    let err = h
        .services
        .installations
        .verify_completion(&user(), &project.id, TEST_OTP)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(err.message().contains("expired"), "{}", err.message());

    // Expiry does not burn an attempt
    let stored = h.services.projects.get_project(&user(), &project.id).await.unwrap();
    assert_eq!(stored.installation.unwrap().otp_attempts, 0);

    h.services.installations.resend_completion_otp(&contractor(), &project.id).await.unwrap();
    let verified = h
        .services
        .installations
        .verify_completion(&user(), &project.id, &format!(" {} ", TEST_OTP))
        .await
        .unwrap();
    assert_eq!(verified.installation.unwrap().status, InstallationStatus::Verified);
}

#[tokio::test]
async fn test_only_owner_verifies() {
    let h = TestHarness::new();
    let project = h.awaiting_verification().await.project;

    for caller in [contractor(), admin()] {
        let err = h
            .services
            .installations
            .verify_completion(&caller, &project.id, TEST_OTP)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

#[tokio::test]
async fn test_verification_records_timeline() {
    let h = TestHarness::new();
    let verified = h.verified_project().await;
    let installation = verified.installation.as_ref().unwrap();

    assert!(installation.verified_at.is_some());
    assert!(installation.otp_hash.is_none());

    let events: Vec<TimelineEventType> = h
        .services
        .projects
        .get_timeline(&user(), &verified.project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(events.ends_with(&[
        TimelineEventType::InstallationScheduled,
        TimelineEventType::InstallationStarted,
        TimelineEventType::InstallationCompleted,
        TimelineEventType::InstallationVerified,
    ]));
}

#[tokio::test]
async fn test_quality_check_by_admin() {
    let h = TestHarness::new();
    let project = h.verified_project().await.project;

    let err = h
        .services
        .installations
        .perform_quality_check(
            &contractor(),
            &project.id,
            QualityCheckInput {
                passed: true,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let checked = h
        .services
        .installations
        .perform_quality_check(
            &admin(),
            &project.id,
            QualityCheckInput {
                passed: false,
                notes: Some("Loose conduit on east side".to_string()),
            },
        )
        .await
        .unwrap();

    let check = checked.installation.unwrap().quality_check.unwrap();
    assert!(!check.passed);
    assert_eq!(check.checked_by, ADMIN_ID);
    assert_eq!(check.notes.as_deref(), Some("Loose conduit on east side"));
}
