use async_trait::async_trait;

use crate::core::Result;
use crate::modules::installations::models::ProjectInstallation;
use crate::modules::payments::models::{Installment, PaymentTransaction, ProjectPayment};
use crate::modules::projects::models::{
    Project, ProjectAggregate, ProjectStatus, TimelineEntry,
};
use crate::modules::reviews::models::ProjectReview;

/// Row write inside a unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum Write<T> {
    Insert(T),
    Update(T),
}

impl<T> Write<T> {
    pub fn row(&self) -> &T {
        match self {
            Write::Insert(row) | Write::Update(row) => row,
        }
    }
}

/// Everything one orchestrator operation changes on a project.
///
/// The project row is written conditionally on `expected_version`; child rows and
/// timeline entries are written in the same transaction. Either all of it lands or none.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    pub project: Project,
    pub expected_version: i64,
    pub payment: Option<Write<ProjectPayment>>,
    pub installments: Vec<Write<Installment>>,
    pub transactions: Vec<PaymentTransaction>,
    pub installation: Option<Write<ProjectInstallation>>,
    pub review: Option<Write<ProjectReview>>,
    pub timeline: Vec<TimelineEntry>,
}

impl UnitOfWork {
    /// Start a unit of work for `project` as read (its version is the guard)
    pub fn new(project: Project) -> Self {
        let expected_version = project.version;
        Self {
            project,
            expected_version,
            payment: None,
            installments: Vec::new(),
            transactions: Vec::new(),
            installation: None,
            review: None,
            timeline: Vec::new(),
        }
    }

    pub fn insert_payment(mut self, payment: ProjectPayment) -> Self {
        self.payment = Some(Write::Insert(payment));
        self
    }

    pub fn update_payment(mut self, payment: ProjectPayment) -> Self {
        self.payment = Some(Write::Update(payment));
        self
    }

    pub fn insert_installments(mut self, installments: Vec<Installment>) -> Self {
        self.installments
            .extend(installments.into_iter().map(Write::Insert));
        self
    }

    pub fn update_installment(mut self, installment: Installment) -> Self {
        self.installments.push(Write::Update(installment));
        self
    }

    pub fn record_transaction(mut self, transaction: PaymentTransaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn insert_installation(mut self, installation: ProjectInstallation) -> Self {
        self.installation = Some(Write::Insert(installation));
        self
    }

    pub fn update_installation(mut self, installation: ProjectInstallation) -> Self {
        self.installation = Some(Write::Update(installation));
        self
    }

    pub fn insert_review(mut self, review: ProjectReview) -> Self {
        self.review = Some(Write::Insert(review));
        self
    }

    pub fn update_review(mut self, review: ProjectReview) -> Self {
        self.review = Some(Write::Update(review));
        self
    }

    pub fn append(mut self, entry: TimelineEntry) -> Self {
        self.timeline.push(entry);
        self
    }
}

/// Project listing filter
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub user_id: Option<String>,
    pub contractor_id: Option<String>,
    pub status: Option<ProjectStatus>,
    pub limit: u32,
    pub offset: u32,
}

/// Transactional store owning the project aggregate
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a new project with its creation entry. A second project for the same quote is a `Conflict`.
    async fn insert_project(&self, project: &Project, entry: &TimelineEntry) -> Result<()>;

    async fn find_project(&self, id: &str) -> Result<Option<Project>>;

    async fn find_project_by_quote(&self, quote_id: &str) -> Result<Option<Project>>;

    async fn load_aggregate(&self, id: &str) -> Result<Option<ProjectAggregate>>;

    /// Projects ordered newest first
    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>>;

    /// Timeline entries ordered oldest first
    async fn list_timeline(&self, project_id: &str) -> Result<Vec<TimelineEntry>>;

    /// Apply a unit of work atomically. A stale `expected_version` or a duplicate
    /// single-row child is a `Conflict` and nothing is written.
    async fn commit(&self, unit: UnitOfWork) -> Result<()>;

    /// Connectivity probe for health checks
    async fn ping(&self) -> Result<()>;
}
