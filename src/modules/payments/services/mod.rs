pub mod payment_calculator;
pub mod payment_engine;
pub mod payment_service;
pub mod remote_engine;

pub use payment_calculator::{BnplPlan, InstallmentCharge, PaymentCalculator, ScheduleLine};
pub use payment_engine::{
    AmountInput, InstallmentView, PaymentEngine, PaymentSummary, ReleaseInput, SelectPaymentInput,
};
pub use payment_service::PaymentService;
pub use remote_engine::RemotePaymentEngine;
