// Single pay: one exact charge completes the payment

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use rust_decimal_macros::dec;

use solartrust::core::ErrorKind;
use solartrust::modules::payments::models::{PaymentMethod, PaymentStatus, TransactionType};
use solartrust::modules::payments::services::{ReleaseInput, SelectPaymentInput};
use solartrust::modules::projects::{ProjectAggregate, ProjectStatus, TimelineEventType};

fn single_pay() -> SelectPaymentInput {
    SelectPaymentInput {
        method: PaymentMethod::SinglePay,
        downpayment_amount: None,
        number_of_installments: None,
    }
}

async fn selected(h: &TestHarness, total: rust_decimal::Decimal) -> ProjectAggregate {
    let project = h.create_project(total).await.project;
    h.services
        .payments
        .select_payment_method(&user(), &project.id, single_pay())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_select_single_pay() {
    let h = TestHarness::new();
    let aggregate = selected(&h, dec!(15000)).await;

    let payment = aggregate.payment.as_ref().unwrap();
    assert_eq!(payment.payment_method, PaymentMethod::SinglePay);
    assert_eq!(payment.payment_status, PaymentStatus::Pending);
    assert_eq!(payment.remaining_amount, dec!(15000));
    assert!(aggregate.installments.is_empty());
    assert_eq!(aggregate.project.status, ProjectStatus::PaymentProcessing);
    // Single pay never touches credit
    assert!(h.users.adjustments().is_empty());
}

#[tokio::test]
async fn test_only_owner_selects_method() {
    let h = TestHarness::new();
    let project = h.create_project(dec!(15000)).await.project;

    for caller in [contractor(), admin()] {
        let err = h
            .services
            .payments
            .select_payment_method(&caller, &project.id, single_pay())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

#[tokio::test]
async fn test_full_payment_must_be_exact() {
    let h = TestHarness::new();
    let aggregate = selected(&h, dec!(15000)).await;
    let id = aggregate.project.id.clone();

    for amount in [dec!(14999.99), dec!(15000.01)] {
        let err = h
            .services
            .payments
            .process_full_payment(&user(), &id, amount)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("15000.00"), "{}", err.message());
    }

    let err = h
        .services
        .payments
        .process_full_payment(&user(), &id, dec!(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.processor.charges().is_empty());
}

#[tokio::test]
async fn test_full_payment_completes_project_payment() {
    let h = TestHarness::new();
    let aggregate = selected(&h, dec!(15000)).await;
    let id = aggregate.project.id.clone();

    let paid = h
        .services
        .payments
        .process_full_payment(&user(), &id, dec!(15000))
        .await
        .unwrap();

    let payment = paid.payment.as_ref().unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Completed);
    assert_eq!(payment.paid_amount, dec!(15000));
    assert_eq!(payment.remaining_amount, dec!(0));
    assert_eq!(paid.project.status, ProjectStatus::PaymentCompleted);

    assert_eq!(paid.transactions.len(), 1);
    let transaction = &paid.transactions[0];
    assert_eq!(transaction.transaction_type, TransactionType::FullPayment);
    assert!(transaction.reference_code.starts_with("FUL-20251101-"));

    let charges = h.processor.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, dec!(15000));
    assert_eq!(charges[0].currency, "SAR");
    assert_eq!(charges[0].payer_id, USER_ID);

    let events: Vec<TimelineEventType> = h
        .services
        .projects
        .get_timeline(&user(), &id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        events,
        vec![
            TimelineEventType::ProjectCreated,
            TimelineEventType::PaymentMethodSelected,
            TimelineEventType::PaymentReceived,
            TimelineEventType::PaymentCompleted,
        ]
    );

    let err = h
        .services
        .payments
        .process_full_payment(&user(), &id, dec!(15000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn test_declined_charge_records_nothing() {
    let h = TestHarness::new();
    let aggregate = selected(&h, dec!(15000)).await;
    let id = aggregate.project.id.clone();
    h.processor.decline_next();

    let err = h
        .services
        .payments
        .process_full_payment(&user(), &id, dec!(15000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Payment);
    assert_eq!(err.message(), "Card declined");

    let after = h.services.projects.get_project(&user(), &id).await.unwrap();
    assert_eq!(after, aggregate);

    // The next attempt goes through
    h.services
        .payments
        .process_full_payment(&user(), &id, dec!(15000))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_processor_outage_is_unavailable() {
    let h = TestHarness::new();
    let aggregate = selected(&h, dec!(15000)).await;
    h.processor.fail_next();

    let err = h
        .services
        .payments
        .process_full_payment(&user(), &aggregate.project.id, dec!(15000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn test_bnpl_only_operations_rejected() {
    let h = TestHarness::new();
    let aggregate = selected(&h, dec!(15000)).await;
    let id = aggregate.project.id.clone();

    let err = h
        .services
        .payments
        .process_downpayment(&user(), &id, dec!(1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn test_summary_and_release() {
    let h = TestHarness::new();
    let paid = h.paid_single_pay_project(dec!(15000)).await;
    let id = paid.project.id.clone();

    let summary = h.services.payments.get_payment_summary(&contractor(), &id).await.unwrap();
    assert!(summary.installments.is_empty());
    assert!(summary.next_installment_id.is_none());
    assert_eq!(summary.transactions.len(), 1);

    let released = h
        .services
        .payments
        .release_payment_to_contractor(
            &admin(),
            &id,
            ReleaseInput {
                amount: dec!(15000),
                bank_details: bank_details(),
            },
        )
        .await
        .unwrap();

    let payment = released.payment.as_ref().unwrap();
    assert!(payment.admin_paid_contractor);
    assert_eq!(released.transactions.len(), 2);
    assert_eq!(released.transactions[1].transaction_type, TransactionType::ContractorRelease);

    let err = h
        .services
        .payments
        .release_payment_to_contractor(
            &admin(),
            &id,
            ReleaseInput {
                amount: dec!(15000),
                bank_details: bank_details(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}

#[tokio::test]
async fn test_release_rejected_for_cancelled_project() {
    let h = TestHarness::new();
    let paid = h.paid_single_pay_project(dec!(15000)).await;
    let id = paid.project.id.clone();
    h.services.projects.cancel_project(&admin(), &id, "Duplicate order").await.unwrap();

    let err = h
        .services
        .payments
        .release_payment_to_contractor(
            &admin(),
            &id,
            ReleaseInput {
                amount: dec!(15000),
                bank_details: bank_details(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
}
