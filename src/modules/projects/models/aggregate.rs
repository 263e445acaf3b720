use serde::{Deserialize, Serialize};

use crate::modules::installations::models::ProjectInstallation;
use crate::modules::payments::models::{Installment, PaymentTransaction, ProjectPayment};
use crate::modules::reviews::models::ProjectReview;

use super::Project;

/// A project with every child row it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAggregate {
    pub project: Project,
    pub payment: Option<ProjectPayment>,
    /// Ordered by installment number
    pub installments: Vec<Installment>,
    pub transactions: Vec<PaymentTransaction>,
    pub installation: Option<ProjectInstallation>,
    pub review: Option<ProjectReview>,
}

impl ProjectAggregate {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            payment: None,
            installments: Vec::new(),
            transactions: Vec::new(),
            installation: None,
            review: None,
        }
    }

    pub fn unpaid_installments(&self) -> impl Iterator<Item = &Installment> {
        self.installments.iter().filter(|i| !i.is_paid())
    }

    /// Lowest-numbered unpaid installment
    pub fn next_payable_installment(&self) -> Option<&Installment> {
        self.unpaid_installments().min_by_key(|i| i.installment_number)
    }
}
