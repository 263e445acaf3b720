//! Deterministic in-process gateways.
//!
//! Used by the test suite and by local runs without the peer services.
//! Every fake records what it was asked to do and can be told to fail.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::core::{AppError, Result};

use super::models::{
    ChargeRequest, ChargeResult, CreditAdjustment, CreditBalance, CreditOperation, CreditProfile,
    FlagStatus, OtpMessage, Quote,
};
use super::services::{NotificationGateway, PaymentProcessor, QuoteGateway, UserCreditGateway};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take_flag(flag: &AtomicBool) -> bool {
    flag.swap(false, Ordering::SeqCst)
}

/// Quote service backed by a map keyed on `(request_id, contractor_id)`
#[derive(Debug, Default)]
pub struct FakeQuoteGateway {
    quotes: Mutex<HashMap<(String, String), Quote>>,
    unavailable: AtomicBool,
}

impl FakeQuoteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, quote: Quote) {
        lock(&self.quotes).insert((quote.request_id.clone(), quote.contractor_id.clone()), quote);
    }

    /// Next call fails with `ServiceUnavailable`
    pub fn fail_next(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteGateway for FakeQuoteGateway {
    async fn fetch_quote(&self, request_id: &str, contractor_id: &str) -> Result<Quote> {
        if take_flag(&self.unavailable) {
            return Err(AppError::unavailable("Quote service is unreachable"));
        }

        lock(&self.quotes)
            .get(&(request_id.to_string(), contractor_id.to_string()))
            .cloned()
            .ok_or_else(|| AppError::not_found("Quote service resource not found"))
    }
}

/// User service holding profiles and a credit ledger
#[derive(Debug, Default)]
pub struct FakeUserCreditGateway {
    profiles: Mutex<HashMap<String, CreditProfile>>,
    adjustments: Mutex<Vec<(String, CreditAdjustment)>>,
    fail_next_adjustment: AtomicBool,
}

impl FakeUserCreditGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: CreditProfile) {
        lock(&self.profiles).insert(profile.id.clone(), profile);
    }

    /// Convenience for a profile with a phone number
    pub fn insert_user(&self, user_id: &str, flag_status: FlagStatus, credit: Decimal) {
        self.insert_profile(CreditProfile {
            id: user_id.to_string(),
            phone: Some(format!("+9665{:08}", user_id.len())),
            flag_status,
            sama_credit_amount: credit,
        });
    }

    pub fn credit_of(&self, user_id: &str) -> Option<Decimal> {
        lock(&self.profiles).get(user_id).map(|p| p.sama_credit_amount)
    }

    /// Every adjustment applied so far, in call order
    pub fn adjustments(&self) -> Vec<(String, CreditAdjustment)> {
        lock(&self.adjustments).clone()
    }

    pub fn fail_next_adjustment(&self) {
        self.fail_next_adjustment.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserCreditGateway for FakeUserCreditGateway {
    async fn fetch_profile(&self, user_id: &str) -> Result<CreditProfile> {
        lock(&self.profiles)
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("User service resource not found"))
    }

    async fn adjust_credit(&self, user_id: &str, adjustment: &CreditAdjustment) -> Result<CreditBalance> {
        if take_flag(&self.fail_next_adjustment) {
            return Err(AppError::unavailable("User service is unreachable"));
        }

        let mut profiles = lock(&self.profiles);
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| AppError::not_found("User service resource not found"))?;

        let before_amount = profile.sama_credit_amount;
        profile.sama_credit_amount = match adjustment.operation {
            CreditOperation::Deduct => before_amount - adjustment.amount,
            CreditOperation::Add => before_amount + adjustment.amount,
        };
        let after_amount = profile.sama_credit_amount;
        drop(profiles);

        lock(&self.adjustments).push((user_id.to_string(), adjustment.clone()));

        Ok(CreditBalance {
            before_amount,
            after_amount,
        })
    }
}

/// Payment processor that approves unless told to decline
#[derive(Debug, Default)]
pub struct FakePaymentProcessor {
    charges: Mutex<Vec<ChargeRequest>>,
    decline_next: AtomicBool,
    unavailable: AtomicBool,
}

impl FakePaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decline_next(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }

    pub fn fail_next(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Approved and declined charges, in call order
    pub fn charges(&self) -> Vec<ChargeRequest> {
        lock(&self.charges).clone()
    }
}

#[async_trait]
impl PaymentProcessor for FakePaymentProcessor {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        if take_flag(&self.unavailable) {
            return Err(AppError::unavailable("Payment processor timed out"));
        }

        lock(&self.charges).push(request.clone());

        if take_flag(&self.decline_next) {
            return Ok(ChargeResult {
                success: false,
                reference: String::new(),
                message: Some("Card declined".to_string()),
            });
        }

        Ok(ChargeResult {
            success: true,
            reference: format!("GW-{}", request.reference),
            message: None,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// SMS gateway that keeps every message it accepted
#[derive(Debug, Default)]
pub struct FakeNotificationGateway {
    sent: Mutex<Vec<OtpMessage>>,
    fail_next: AtomicBool,
}

impl FakeNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OtpMessage> {
        lock(&self.sent).clone()
    }

    pub fn last(&self) -> Option<OtpMessage> {
        lock(&self.sent).last().cloned()
    }
}

#[async_trait]
impl NotificationGateway for FakeNotificationGateway {
    async fn send_otp(&self, message: &OtpMessage) -> Result<()> {
        if take_flag(&self.fail_next) {
            return Err(AppError::unavailable("Notification service refused the OTP message"));
        }

        lock(&self.sent).push(message.clone());
        Ok(())
    }
}
