pub mod installment;
pub mod payment_transaction;
pub mod project_payment;

pub use installment::{Installment, InstallmentStatus};
pub use payment_transaction::{PaymentTransaction, TransactionType};
pub use project_payment::{
    BankDetails, ContractorRelease, PaymentMethod, PaymentStatus, ProjectPayment,
};
