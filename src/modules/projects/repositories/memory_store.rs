use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::installations::models::ProjectInstallation;
use crate::modules::payments::models::{Installment, PaymentTransaction, ProjectPayment};
use crate::modules::projects::models::{Project, ProjectAggregate, TimelineEntry};
use crate::modules::reviews::models::ProjectReview;

use super::store::{ProjectFilter, ProjectStore, UnitOfWork, Write};

#[derive(Debug, Default)]
struct MemoryState {
    projects: HashMap<String, Project>,
    payments: HashMap<String, ProjectPayment>,
    installments: HashMap<String, Vec<Installment>>,
    transactions: HashMap<String, Vec<PaymentTransaction>>,
    installations: HashMap<String, ProjectInstallation>,
    reviews: HashMap<String, ProjectReview>,
    timeline: HashMap<String, Vec<TimelineEntry>>,
}

/// Process-local store with the same atomicity and uniqueness rules as the MySQL store.
///
/// Backs the test suite and `STORE_MODE=memory` runs.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    state: RwLock<MemoryState>,
    fail_next_commit: AtomicBool,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection: the next `commit` fails with an internal error and writes nothing.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of committed timeline entries for a project
    pub async fn timeline_len(&self, project_id: &str) -> usize {
        let state = self.state.read().await;
        state.timeline.get(project_id).map_or(0, Vec::len)
    }
}

fn check_single_row<T>(
    write: &Option<Write<T>>,
    existing: Option<&T>,
    id_of: impl Fn(&T) -> &str,
    what: &str,
) -> Result<()> {
    match write {
        Some(Write::Insert(_)) if existing.is_some() => Err(AppError::conflict(format!(
            "{} already exists for this project",
            what
        ))),
        Some(Write::Update(row)) => match existing {
            Some(current) if id_of(current) == id_of(row) => Ok(()),
            _ => Err(AppError::not_found(format!("{} not found", what))),
        },
        _ => Ok(()),
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn insert_project(&self, project: &Project, entry: &TimelineEntry) -> Result<()> {
        let mut state = self.state.write().await;

        if state.projects.values().any(|p| p.quote_id == project.quote_id) {
            return Err(AppError::conflict(format!(
                "A project already exists for quote '{}'",
                project.quote_id
            )));
        }

        if state.projects.contains_key(&project.id) {
            return Err(AppError::conflict("Project id already exists"));
        }

        state.projects.insert(project.id.clone(), project.clone());
        state
            .timeline
            .entry(project.id.clone())
            .or_default()
            .push(entry.clone());

        Ok(())
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>> {
        let state = self.state.read().await;
        Ok(state.projects.get(id).cloned())
    }

    async fn find_project_by_quote(&self, quote_id: &str) -> Result<Option<Project>> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .values()
            .find(|p| p.quote_id == quote_id)
            .cloned())
    }

    async fn load_aggregate(&self, id: &str) -> Result<Option<ProjectAggregate>> {
        let state = self.state.read().await;

        let Some(project) = state.projects.get(id).cloned() else {
            return Ok(None);
        };

        let mut installments = state.installments.get(id).cloned().unwrap_or_default();
        installments.sort_by_key(|i| i.installment_number);

        Ok(Some(ProjectAggregate {
            project,
            payment: state.payments.get(id).cloned(),
            installments,
            transactions: state.transactions.get(id).cloned().unwrap_or_default(),
            installation: state.installations.get(id).cloned(),
            review: state.reviews.get(id).cloned(),
        }))
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let state = self.state.read().await;

        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| filter.user_id.as_ref().map_or(true, |u| &p.user_id == u))
            .filter(|p| {
                filter
                    .contractor_id
                    .as_ref()
                    .map_or(true, |c| &p.contractor_id == c)
            })
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();

        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(projects
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn list_timeline(&self, project_id: &str) -> Result<Vec<TimelineEntry>> {
        let state = self.state.read().await;
        let mut entries = state.timeline.get(project_id).cloned().unwrap_or_default();
        // Stable sort keeps append order for equal timestamps
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::internal("Injected commit failure"));
        }

        let mut state = self.state.write().await;
        let project_id = unit.project.id.clone();

        // Validate everything before touching state
        let current = state
            .projects
            .get(&project_id)
            .ok_or_else(|| AppError::not_found("Project not found"))?;

        if current.version != unit.expected_version {
            return Err(AppError::conflict(
                "Project was modified concurrently, please retry",
            ));
        }

        check_single_row(
            &unit.payment,
            state.payments.get(&project_id),
            |p| p.id.as_str(),
            "Payment",
        )?;
        check_single_row(
            &unit.installation,
            state.installations.get(&project_id),
            |i| i.id.as_str(),
            "Installation",
        )?;
        check_single_row(
            &unit.review,
            state.reviews.get(&project_id),
            |r| r.id.as_str(),
            "Review",
        )?;

        let existing_installments = state.installments.get(&project_id);
        for write in &unit.installments {
            let row = write.row();
            let clash = existing_installments.map_or(false, |rows| {
                rows.iter().any(|r| {
                    r.payment_id == row.payment_id && r.installment_number == row.installment_number
                })
            });
            match write {
                Write::Insert(_) if clash => {
                    return Err(AppError::conflict(format!(
                        "Installment {} already exists",
                        row.installment_number
                    )))
                }
                Write::Update(_)
                    if !existing_installments
                        .map_or(false, |rows| rows.iter().any(|r| r.id == row.id)) =>
                {
                    return Err(AppError::not_found("Installment not found"))
                }
                _ => {}
            }
        }

        // Apply
        let mut project = unit.project;
        project.version = unit.expected_version + 1;
        state.projects.insert(project_id.clone(), project);

        if let Some(write) = unit.payment {
            let payment = match write {
                Write::Insert(p) | Write::Update(p) => p,
            };
            state.payments.insert(project_id.clone(), payment);
        }

        for write in unit.installments {
            let rows = state.installments.entry(project_id.clone()).or_default();
            match write {
                Write::Insert(row) => rows.push(row),
                Write::Update(row) => {
                    if let Some(existing) = rows.iter_mut().find(|r| r.id == row.id) {
                        *existing = row;
                    }
                }
            }
        }

        state
            .transactions
            .entry(project_id.clone())
            .or_default()
            .extend(unit.transactions);

        if let Some(write) = unit.installation {
            let installation = match write {
                Write::Insert(i) | Write::Update(i) => i,
            };
            state.installations.insert(project_id.clone(), installation);
        }

        if let Some(write) = unit.review {
            let review = match write {
                Write::Insert(r) | Write::Update(r) => r,
            };
            state.reviews.insert(project_id.clone(), review);
        }

        state
            .timeline
            .entry(project_id)
            .or_default()
            .extend(unit.timeline);

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
