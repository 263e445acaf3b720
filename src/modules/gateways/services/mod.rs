pub mod http_client;
pub mod notification;
pub mod payment_processor;
pub mod quote;
pub mod user_credit;

pub use http_client::GatewayClient;
pub use notification::{HttpNotificationGateway, NotificationGateway};
pub use payment_processor::{HttpPaymentProcessor, MockPaymentProcessor, PaymentProcessor};
pub use quote::{HttpQuoteGateway, QuoteGateway};
pub use user_credit::{HttpUserCreditGateway, UserCreditGateway};
