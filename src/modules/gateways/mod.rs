pub mod fakes;
pub mod models;
pub mod services;

pub use models::{
    ChargeRequest, ChargeResult, CreditAdjustment, CreditBalance, CreditOperation, CreditProfile,
    FlagStatus, OtpMessage, Quote, QuoteStatus, SystemSpecs,
};
pub use services::{
    HttpNotificationGateway, HttpPaymentProcessor, HttpQuoteGateway, HttpUserCreditGateway,
    MockPaymentProcessor, NotificationGateway, PaymentProcessor, QuoteGateway, UserCreditGateway,
};
