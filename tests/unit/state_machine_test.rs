// Lifecycle rules for projects, payments and installments

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use solartrust::core::ErrorKind;
use solartrust::modules::payments::models::{Installment, InstallmentStatus, PaymentStatus, ProjectPayment};
use solartrust::modules::projects::{Project, ProjectStatus};

use ProjectStatus::*;

fn project_in(status: ProjectStatus) -> Project {
    let mut project = Project::new(
        "user-1".to_string(),
        "contractor-1".to_string(),
        "quote-1".to_string(),
        "request-1".to_string(),
        dec!(15000),
        dec!(8.5),
        Utc::now(),
    )
    .unwrap();
    project.status = status;
    project
}

#[test]
fn test_forward_path_is_allowed() {
    let path = [
        PaymentPending,
        PaymentProcessing,
        PaymentCompleted,
        InstallationScheduled,
        InstallationInProgress,
        InstallationCompleted,
        Completed,
    ];

    let mut project = project_in(PaymentPending);
    for next in &path[1..] {
        project.transition_to(*next, Utc::now()).unwrap();
    }
    assert_eq!(project.status, Completed);
    assert!(project.completed_at.is_some());
}

#[test]
fn test_bnpl_can_schedule_from_processing() {
    assert!(PaymentProcessing.can_transition_to(InstallationScheduled));
}

#[test]
fn test_skipping_and_going_back_rejected() {
    let rejected = [
        (PaymentPending, PaymentCompleted),
        (PaymentPending, InstallationScheduled),
        (PaymentCompleted, PaymentProcessing),
        (InstallationScheduled, InstallationCompleted),
        (InstallationInProgress, Completed),
        (InstallationCompleted, InstallationInProgress),
    ];

    for (from, to) in rejected {
        assert!(!from.can_transition_to(to), "{} -> {} should be rejected", from, to);

        let mut project = project_in(from);
        let err = project.transition_to(to, Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(project.status, from);
    }
}

#[test]
fn test_terminal_states_have_no_exits() {
    for terminal in [Completed, Cancelled] {
        assert!(terminal.is_terminal());
        for next in ProjectStatus::ALL {
            assert!(!terminal.can_transition_to(next));
        }
    }
}

#[test]
fn test_self_transition_rejected() {
    for status in ProjectStatus::ALL {
        assert!(!status.can_transition_to(status));
    }
}

#[test]
fn test_cancel_allowed_before_installation_starts() {
    for status in [PaymentPending, PaymentProcessing, PaymentCompleted, InstallationScheduled] {
        let mut project = project_in(status);
        project.cancel("Customer withdrew".to_string(), Utc::now()).unwrap();
        assert_eq!(project.status, Cancelled);
        assert_eq!(project.cancellation_reason.as_deref(), Some("Customer withdrew"));
        assert!(project.cancelled_at.is_some());
    }
}

#[test]
fn test_cancel_rejected_once_work_started() {
    for status in [InstallationInProgress, InstallationCompleted, Completed, Cancelled] {
        let mut project = project_in(status);
        let err = project.cancel("too late".to_string(), Utc::now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(project.status, status);
    }
}

#[test]
fn test_hold_remembers_previous_status() {
    let mut project = project_in(InstallationScheduled);
    project.hold(Utc::now()).unwrap();

    assert_eq!(project.status, OnHold);
    assert_eq!(project.status_before_hold, Some(InstallationScheduled));
    assert_eq!(project.ensure_active().unwrap_err().kind(), ErrorKind::BusinessRule);

    let err = project.hold(Utc::now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);

    assert_eq!(project.resume(Utc::now()).unwrap(), InstallationScheduled);
    assert_eq!(project.status, InstallationScheduled);
    assert!(project.status_before_hold.is_none());
    assert!(project.ensure_active().is_ok());
}

#[test]
fn test_resume_requires_hold() {
    let mut project = project_in(PaymentCompleted);
    let err = project.resume(Utc::now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[test]
fn test_hold_rejected_on_terminal_project() {
    let mut project = project_in(Completed);
    assert!(project.hold(Utc::now()).is_err());
    assert_eq!(project.status, Completed);
}

#[test]
fn test_payment_status_follows_balance() {
    let now = Utc::now();
    let mut payment = ProjectPayment::new_bnpl("project-1", dec!(10000), dec!(1000), 3, dec!(3000), dec!(10000), now);
    assert_eq!(payment.payment_status, PaymentStatus::Pending);

    payment.apply_downpayment(now).unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::PartiallyPaid);
    assert!(payment.downpayment_settled());
    assert!(payment.apply_downpayment(now).is_err());

    for _ in 0..3 {
        payment.apply_principal(dec!(3000), now).unwrap();
        assert!(payment.is_balanced());
    }
    assert_eq!(payment.payment_status, PaymentStatus::Completed);
    assert_eq!(payment.remaining_amount, dec!(0));

    let err = payment.apply_principal(dec!(1), now).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_installments_are_paid_in_order() {
    let now = Utc.with_ymd_and_hms(2025, 11, 1, 10, 0, 0).unwrap();
    let mut schedule: Vec<Installment> = (1..=3)
        .map(|n| Installment::new("payment-1", "project-1", n, dec!(1000), now + Duration::days(30 * n as i64), now))
        .collect();

    assert!(schedule[0].can_be_paid(&schedule));
    assert!(!schedule[1].can_be_paid(&schedule));

    schedule[0]
        .mark_paid(dec!(1000), 0, dec!(0), "INS-1".to_string(), now)
        .unwrap();
    assert!(schedule[1].can_be_paid(&schedule));
    assert!(!schedule[2].can_be_paid(&schedule));

    let err = schedule[0]
        .mark_paid(dec!(1000), 0, dec!(0), "INS-2".to_string(), now)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[test]
fn test_installment_reads_overdue_after_due_day() {
    let now = Utc.with_ymd_and_hms(2025, 11, 1, 10, 0, 0).unwrap();
    let due = Utc.with_ymd_and_hms(2025, 12, 1, 23, 59, 59).unwrap();
    let installment = Installment::new("payment-1", "project-1", 1, dec!(1000), due, now);

    let day = |d: u32| NaiveDate::from_ymd_opt(2025, 12, d).unwrap();
    assert_eq!(installment.status_on(day(1)), InstallmentStatus::Upcoming);
    assert_eq!(installment.status_on(day(2)), InstallmentStatus::Overdue);
}
