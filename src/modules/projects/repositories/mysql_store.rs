// MySqlProjectStore: ProjectStore over MySQL
//
// Every commit runs in one transaction:
// 1. Conditional project update (WHERE version = expected), bumping the version
// 2. Child inserts/updates (payment, installments, ledger, installation, review)
// 3. Timeline appends
// Unique constraints back the single-creation invariants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder, Transaction};

use crate::core::{AppError, Result};
use crate::modules::installations::models::{ProjectInstallation, QualityCheck};
use crate::modules::payments::models::{
    BankDetails, ContractorRelease, Installment, PaymentTransaction, ProjectPayment,
};
use crate::modules::projects::models::{Project, ProjectAggregate, TimelineEntry};
use crate::modules::reviews::models::ProjectReview;

use super::store::{ProjectFilter, ProjectStore, UnitOfWork, Write};

/// Repository for the project aggregate
pub struct MySqlProjectStore {
    pool: MySqlPool,
}

impl MySqlProjectStore {
    /// Create a new store over an existing pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Map unique violations to `Conflict`, everything else to `Internal`
fn map_write_error(e: sqlx::Error, what: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::conflict(format!("{} already exists", what));
        }
    }
    AppError::Internal(format!("Failed to write {}: {}", what, e))
}

fn map_read_error(e: sqlx::Error, what: &str) -> AppError {
    AppError::Internal(format!("Failed to fetch {}: {}", what, e))
}

const PROJECT_COLUMNS: &str = r#"
    id, user_id, contractor_id, quote_id, request_id, total_amount, system_size_kwp,
    status, status_before_hold, notes, site_address, cancellation_reason, version,
    created_at, updated_at, cancelled_at, completed_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, project_id, payment_method, payment_status, total_amount, downpayment_amount,
    downpayment_paid_at, paid_amount, remaining_amount, number_of_installments, monthly_emi,
    credit_amount_used, late_fees_collected, admin_paid_contractor, released_amount,
    released_by, released_at, release_reference, release_bank_name, release_account_holder,
    release_iban, created_at, updated_at
"#;

const INSTALLMENT_COLUMNS: &str = r#"
    id, payment_id, project_id, installment_number, amount, due_date, status, paid_amount,
    paid_at, overdue_days, late_fee, transaction_reference, created_at, updated_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    id, project_id, payment_id, installment_id, transaction_type, amount, late_fee,
    reference_code, gateway_reference, created_at
"#;

const INSTALLATION_COLUMNS: &str = r#"
    id, project_id, status, scheduled_date, started_at, completed_at, verified_at, otp_hash,
    otp_expires_at, otp_attempts, max_otp_attempts, equipment_installed, installation_notes,
    quality_check_passed, quality_check_notes, quality_checked_by, quality_checked_at,
    created_at, updated_at
"#;

const REVIEW_COLUMNS: &str = r#"
    id, project_id, user_id, contractor_id, rating, quality_rating, timeliness_rating,
    communication_rating, professionalism_rating, comment, contractor_response, responded_at,
    created_at, updated_at
"#;

const TIMELINE_COLUMNS: &str = r#"
    id, project_id, event_type, title, description, actor_id, actor_role, metadata, created_at
"#;

impl MySqlProjectStore {
    async fn insert_timeline(
        tx: &mut Transaction<'_, MySql>,
        entry: &TimelineEntry,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_timeline (
                id, project_id, event_type, title, description, actor_id, actor_role,
                metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.project_id)
        .bind(entry.event_type.as_str())
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(&entry.actor_id)
        .bind(&entry.actor_role)
        .bind(Json(&entry.metadata))
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_error(e, "timeline entry"))?;

        Ok(())
    }

    async fn update_project(
        tx: &mut Transaction<'_, MySql>,
        project: &Project,
        expected_version: i64,
    ) -> Result<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE projects
            SET
                system_size_kwp = ?,
                status = ?,
                status_before_hold = ?,
                notes = ?,
                site_address = ?,
                cancellation_reason = ?,
                version = version + 1,
                updated_at = ?,
                cancelled_at = ?,
                completed_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(project.system_size_kwp)
        .bind(project.status.as_str())
        .bind(project.status_before_hold.map(|s| s.as_str()))
        .bind(&project.notes)
        .bind(&project.site_address)
        .bind(&project.cancellation_reason)
        .bind(project.updated_at)
        .bind(project.cancelled_at)
        .bind(project.completed_at)
        .bind(&project.id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_error(e, "project"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::conflict(
                "Project was modified concurrently, please retry",
            ));
        }

        Ok(())
    }

    async fn write_payment(tx: &mut Transaction<'_, MySql>, write: &Write<ProjectPayment>) -> Result<()> {
        let (sql, payment) = match write {
            Write::Insert(p) => (
                r#"
                INSERT INTO project_payments (
                    payment_method, payment_status, total_amount, downpayment_amount,
                    downpayment_paid_at, paid_amount, remaining_amount, number_of_installments,
                    monthly_emi, credit_amount_used, late_fees_collected, admin_paid_contractor,
                    released_amount, released_by, released_at, release_reference,
                    release_bank_name, release_account_holder, release_iban, created_at,
                    updated_at, id, project_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                p,
            ),
            Write::Update(p) => (
                r#"
                UPDATE project_payments
                SET
                    payment_method = ?, payment_status = ?, total_amount = ?,
                    downpayment_amount = ?, downpayment_paid_at = ?, paid_amount = ?,
                    remaining_amount = ?, number_of_installments = ?, monthly_emi = ?,
                    credit_amount_used = ?, late_fees_collected = ?, admin_paid_contractor = ?,
                    released_amount = ?, released_by = ?, released_at = ?, release_reference = ?,
                    release_bank_name = ?, release_account_holder = ?, release_iban = ?,
                    created_at = ?, updated_at = ?
                WHERE id = ? AND project_id = ?
                "#,
                p,
            ),
        };

        let release = payment.release.as_ref();

        let rows_affected = sqlx::query(sql)
            .bind(payment.payment_method.as_str())
            .bind(payment.payment_status.as_str())
            .bind(payment.total_amount)
            .bind(payment.downpayment_amount)
            .bind(payment.downpayment_paid_at)
            .bind(payment.paid_amount)
            .bind(payment.remaining_amount)
            .bind(payment.number_of_installments)
            .bind(payment.monthly_emi)
            .bind(payment.credit_amount_used)
            .bind(payment.late_fees_collected)
            .bind(payment.admin_paid_contractor)
            .bind(release.map(|r| r.amount))
            .bind(release.map(|r| r.released_by.clone()))
            .bind(release.map(|r| r.released_at))
            .bind(release.map(|r| r.reference.clone()))
            .bind(release.map(|r| r.bank_details.bank_name.clone()))
            .bind(release.map(|r| r.bank_details.account_holder.clone()))
            .bind(release.map(|r| r.bank_details.iban.clone()))
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .bind(&payment.id)
            .bind(&payment.project_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_write_error(e, "Payment"))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Payment not found"));
        }

        Ok(())
    }

    async fn write_installment(tx: &mut Transaction<'_, MySql>, write: &Write<Installment>) -> Result<()> {
        match write {
            Write::Insert(i) => {
                sqlx::query(
                    r#"
                    INSERT INTO installment_schedules (
                        id, payment_id, project_id, installment_number, amount, due_date, status,
                        paid_amount, paid_at, overdue_days, late_fee, transaction_reference,
                        created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&i.id)
                .bind(&i.payment_id)
                .bind(&i.project_id)
                .bind(i.installment_number)
                .bind(i.amount)
                .bind(i.due_date)
                .bind(i.status.as_str())
                .bind(i.paid_amount)
                .bind(i.paid_at)
                .bind(i.overdue_days)
                .bind(i.late_fee)
                .bind(&i.transaction_reference)
                .bind(i.created_at)
                .bind(i.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_write_error(e, "Installment"))?;
            }
            Write::Update(i) => {
                let rows_affected = sqlx::query(
                    r#"
                    UPDATE installment_schedules
                    SET
                        status = ?, paid_amount = ?, paid_at = ?, overdue_days = ?,
                        late_fee = ?, transaction_reference = ?, updated_at = ?
                    WHERE id = ? AND project_id = ?
                    "#,
                )
                .bind(i.status.as_str())
                .bind(i.paid_amount)
                .bind(i.paid_at)
                .bind(i.overdue_days)
                .bind(i.late_fee)
                .bind(&i.transaction_reference)
                .bind(i.updated_at)
                .bind(&i.id)
                .bind(&i.project_id)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_write_error(e, "Installment"))?
                .rows_affected();

                if rows_affected == 0 {
                    return Err(AppError::not_found("Installment not found"));
                }
            }
        }

        Ok(())
    }

    async fn insert_transaction(tx: &mut Transaction<'_, MySql>, t: &PaymentTransaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_transactions (
                id, project_id, payment_id, installment_id, transaction_type, amount, late_fee,
                reference_code, gateway_reference, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&t.id)
        .bind(&t.project_id)
        .bind(&t.payment_id)
        .bind(&t.installment_id)
        .bind(t.transaction_type.as_str())
        .bind(t.amount)
        .bind(t.late_fee)
        .bind(&t.reference_code)
        .bind(&t.gateway_reference)
        .bind(t.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_error(e, "Transaction"))?;

        Ok(())
    }

    async fn write_installation(
        tx: &mut Transaction<'_, MySql>,
        write: &Write<ProjectInstallation>,
    ) -> Result<()> {
        let (sql, i) = match write {
            Write::Insert(i) => (
                r#"
                INSERT INTO project_installations (
                    status, scheduled_date, started_at, completed_at, verified_at, otp_hash,
                    otp_expires_at, otp_attempts, max_otp_attempts, equipment_installed,
                    installation_notes, quality_check_passed, quality_check_notes,
                    quality_checked_by, quality_checked_at, created_at, updated_at,
                    id, project_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                i,
            ),
            Write::Update(i) => (
                r#"
                UPDATE project_installations
                SET
                    status = ?, scheduled_date = ?, started_at = ?, completed_at = ?,
                    verified_at = ?, otp_hash = ?, otp_expires_at = ?, otp_attempts = ?,
                    max_otp_attempts = ?, equipment_installed = ?, installation_notes = ?,
                    quality_check_passed = ?, quality_check_notes = ?, quality_checked_by = ?,
                    quality_checked_at = ?, created_at = ?, updated_at = ?
                WHERE id = ? AND project_id = ?
                "#,
                i,
            ),
        };

        let qc = i.quality_check.as_ref();

        let rows_affected = sqlx::query(sql)
            .bind(i.status.as_str())
            .bind(i.scheduled_date)
            .bind(i.started_at)
            .bind(i.completed_at)
            .bind(i.verified_at)
            .bind(&i.otp_hash)
            .bind(i.otp_expires_at)
            .bind(i.otp_attempts)
            .bind(i.max_otp_attempts)
            .bind(Json(&i.equipment_installed))
            .bind(&i.installation_notes)
            .bind(qc.map(|q| q.passed))
            .bind(qc.and_then(|q| q.notes.clone()))
            .bind(qc.map(|q| q.checked_by.clone()))
            .bind(qc.map(|q| q.checked_at))
            .bind(i.created_at)
            .bind(i.updated_at)
            .bind(&i.id)
            .bind(&i.project_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_write_error(e, "Installation"))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Installation not found"));
        }

        Ok(())
    }

    async fn write_review(tx: &mut Transaction<'_, MySql>, write: &Write<ProjectReview>) -> Result<()> {
        let (sql, r) = match write {
            Write::Insert(r) => (
                r#"
                INSERT INTO project_reviews (
                    user_id, contractor_id, rating, quality_rating, timeliness_rating,
                    communication_rating, professionalism_rating, comment, contractor_response,
                    responded_at, created_at, updated_at, id, project_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                r,
            ),
            Write::Update(r) => (
                r#"
                UPDATE project_reviews
                SET
                    user_id = ?, contractor_id = ?, rating = ?, quality_rating = ?,
                    timeliness_rating = ?, communication_rating = ?, professionalism_rating = ?,
                    comment = ?, contractor_response = ?, responded_at = ?, created_at = ?,
                    updated_at = ?
                WHERE id = ? AND project_id = ?
                "#,
                r,
            ),
        };

        let rows_affected = sqlx::query(sql)
            .bind(&r.user_id)
            .bind(&r.contractor_id)
            .bind(r.rating)
            .bind(r.quality_rating)
            .bind(r.timeliness_rating)
            .bind(r.communication_rating)
            .bind(r.professionalism_rating)
            .bind(&r.comment)
            .bind(&r.contractor_response)
            .bind(r.responded_at)
            .bind(r.created_at)
            .bind(r.updated_at)
            .bind(&r.id)
            .bind(&r.project_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_write_error(e, "Review"))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found("Review not found"));
        }

        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MySqlProjectStore {
    async fn insert_project(&self, project: &Project, entry: &TimelineEntry) -> Result<()> {
        let mut tx = self.pool.begin().await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, user_id, contractor_id, quote_id, request_id, total_amount, system_size_kwp,
                status, status_before_hold, notes, site_address, cancellation_reason, version,
                created_at, updated_at, cancelled_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.id)
        .bind(&project.user_id)
        .bind(&project.contractor_id)
        .bind(&project.quote_id)
        .bind(&project.request_id)
        .bind(project.total_amount)
        .bind(project.system_size_kwp)
        .bind(project.status.as_str())
        .bind(project.status_before_hold.map(|s| s.as_str()))
        .bind(&project.notes)
        .bind(&project.site_address)
        .bind(&project.cancellation_reason)
        .bind(project.version)
        .bind(project.created_at)
        .bind(project.updated_at)
        .bind(project.cancelled_at)
        .bind(project.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::conflict(format!(
                        "A project already exists for quote '{}'",
                        project.quote_id
                    ));
                }
            }
            AppError::Internal(format!("Failed to create project: {}", e))
        })?;

        Self::insert_timeline(&mut tx, entry).await?;

        tx.commit().await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "project"))?;

        row.map(Project::try_from).transpose()
    }

    async fn find_project_by_quote(&self, quote_id: &str) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE quote_id = ?",
            PROJECT_COLUMNS
        ))
        .bind(quote_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "project"))?;

        row.map(Project::try_from).transpose()
    }

    async fn load_aggregate(&self, id: &str) -> Result<Option<ProjectAggregate>> {
        let Some(project) = self.find_project(id).await? else {
            return Ok(None);
        };

        let payment = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM project_payments WHERE project_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "payment"))?
        .map(ProjectPayment::try_from)
        .transpose()?;

        let installments = sqlx::query_as::<_, InstallmentRow>(&format!(
            "SELECT {} FROM installment_schedules WHERE project_id = ? ORDER BY installment_number ASC",
            INSTALLMENT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "installments"))?
        .into_iter()
        .map(Installment::try_from)
        .collect::<Result<Vec<_>>>()?;

        let transactions = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM payment_transactions WHERE project_id = ? ORDER BY created_at ASC",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "transactions"))?
        .into_iter()
        .map(PaymentTransaction::try_from)
        .collect::<Result<Vec<_>>>()?;

        let installation = sqlx::query_as::<_, InstallationRow>(&format!(
            "SELECT {} FROM project_installations WHERE project_id = ?",
            INSTALLATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "installation"))?
        .map(ProjectInstallation::try_from)
        .transpose()?;

        let review = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM project_reviews WHERE project_id = ?",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "review"))?
        .map(ProjectReview::from);

        Ok(Some(ProjectAggregate {
            project,
            payment,
            installments,
            transactions,
            installation,
            review,
        }))
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let mut query = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM projects WHERE 1 = 1",
            PROJECT_COLUMNS
        ));

        if let Some(user_id) = &filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(contractor_id) = &filter.contractor_id {
            query.push(" AND contractor_id = ").push_bind(contractor_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        query
            .push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        query
            .build_query_as::<ProjectRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_read_error(e, "projects"))?
            .into_iter()
            .map(Project::try_from)
            .collect()
    }

    async fn list_timeline(&self, project_id: &str) -> Result<Vec<TimelineEntry>> {
        sqlx::query_as::<_, TimelineRow>(&format!(
            "SELECT {} FROM project_timeline WHERE project_id = ? ORDER BY seq ASC",
            TIMELINE_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_read_error(e, "timeline"))?
        .into_iter()
        .map(TimelineEntry::try_from)
        .collect()
    }

    async fn commit(&self, unit: UnitOfWork) -> Result<()> {
        let mut tx = self.pool.begin().await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        // Version guard first: it takes the row lock that serializes writers
        Self::update_project(&mut tx, &unit.project, unit.expected_version).await?;

        if let Some(write) = &unit.payment {
            Self::write_payment(&mut tx, write).await?;
        }

        for write in &unit.installments {
            Self::write_installment(&mut tx, write).await?;
        }

        for transaction in &unit.transactions {
            Self::insert_transaction(&mut tx, transaction).await?;
        }

        if let Some(write) = &unit.installation {
            Self::write_installation(&mut tx, write).await?;
        }

        if let Some(write) = &unit.review {
            Self::write_review(&mut tx, write).await?;
        }

        for entry in &unit.timeline {
            Self::insert_timeline(&mut tx, entry).await?;
        }

        // Dropping `tx` on any error above rolls everything back
        tx.commit().await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}

/// Database row representation for the projects table
#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    user_id: String,
    contractor_id: String,
    quote_id: String,
    request_id: String,
    total_amount: Decimal,
    system_size_kwp: Decimal,
    status: String,
    status_before_hold: Option<String>,
    notes: Option<String>,
    site_address: Option<String>,
    cancellation_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: row.id,
            user_id: row.user_id,
            contractor_id: row.contractor_id,
            quote_id: row.quote_id,
            request_id: row.request_id,
            total_amount: row.total_amount,
            system_size_kwp: row.system_size_kwp,
            status: row.status.parse()?,
            status_before_hold: row.status_before_hold.map(|s| s.parse()).transpose()?,
            notes: row.notes,
            site_address: row.site_address,
            cancellation_reason: row.cancellation_reason,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            cancelled_at: row.cancelled_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: String,
    project_id: String,
    payment_method: String,
    payment_status: String,
    total_amount: Decimal,
    downpayment_amount: Decimal,
    downpayment_paid_at: Option<DateTime<Utc>>,
    paid_amount: Decimal,
    remaining_amount: Decimal,
    number_of_installments: i32,
    monthly_emi: Decimal,
    credit_amount_used: Decimal,
    late_fees_collected: Decimal,
    admin_paid_contractor: bool,
    released_amount: Option<Decimal>,
    released_by: Option<String>,
    released_at: Option<DateTime<Utc>>,
    release_reference: Option<String>,
    release_bank_name: Option<String>,
    release_account_holder: Option<String>,
    release_iban: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for ProjectPayment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let release = match (row.released_amount, row.released_by, row.released_at) {
            (Some(amount), Some(released_by), Some(released_at)) => Some(ContractorRelease {
                amount,
                released_by,
                released_at,
                reference: row.release_reference.unwrap_or_default(),
                bank_details: BankDetails {
                    bank_name: row.release_bank_name.unwrap_or_default(),
                    account_holder: row.release_account_holder.unwrap_or_default(),
                    iban: row.release_iban.unwrap_or_default(),
                },
            }),
            _ => None,
        };

        Ok(ProjectPayment {
            id: row.id,
            project_id: row.project_id,
            payment_method: row.payment_method.parse()?,
            payment_status: row.payment_status.parse()?,
            total_amount: row.total_amount,
            downpayment_amount: row.downpayment_amount,
            downpayment_paid_at: row.downpayment_paid_at,
            paid_amount: row.paid_amount,
            remaining_amount: row.remaining_amount,
            number_of_installments: row.number_of_installments,
            monthly_emi: row.monthly_emi,
            credit_amount_used: row.credit_amount_used,
            late_fees_collected: row.late_fees_collected,
            admin_paid_contractor: row.admin_paid_contractor,
            release,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InstallmentRow {
    id: String,
    payment_id: String,
    project_id: String,
    installment_number: i32,
    amount: Decimal,
    due_date: DateTime<Utc>,
    status: String,
    paid_amount: Decimal,
    paid_at: Option<DateTime<Utc>>,
    overdue_days: i32,
    late_fee: Decimal,
    transaction_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InstallmentRow> for Installment {
    type Error = AppError;

    fn try_from(row: InstallmentRow) -> Result<Self> {
        Ok(Installment {
            id: row.id,
            payment_id: row.payment_id,
            project_id: row.project_id,
            installment_number: row.installment_number,
            amount: row.amount,
            due_date: row.due_date,
            status: row.status.parse()?,
            paid_amount: row.paid_amount,
            paid_at: row.paid_at,
            overdue_days: row.overdue_days,
            late_fee: row.late_fee,
            transaction_reference: row.transaction_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    project_id: String,
    payment_id: String,
    installment_id: Option<String>,
    transaction_type: String,
    amount: Decimal,
    late_fee: Decimal,
    reference_code: String,
    gateway_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(PaymentTransaction {
            id: row.id,
            project_id: row.project_id,
            payment_id: row.payment_id,
            installment_id: row.installment_id,
            transaction_type: row.transaction_type.parse()?,
            amount: row.amount,
            late_fee: row.late_fee,
            reference_code: row.reference_code,
            gateway_reference: row.gateway_reference,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InstallationRow {
    id: String,
    project_id: String,
    status: String,
    scheduled_date: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    otp_hash: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
    otp_attempts: i32,
    max_otp_attempts: i32,
    equipment_installed: Json<Vec<String>>,
    installation_notes: Option<String>,
    quality_check_passed: Option<bool>,
    quality_check_notes: Option<String>,
    quality_checked_by: Option<String>,
    quality_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InstallationRow> for ProjectInstallation {
    type Error = AppError;

    fn try_from(row: InstallationRow) -> Result<Self> {
        let quality_check = match (row.quality_check_passed, row.quality_checked_by, row.quality_checked_at) {
            (Some(passed), Some(checked_by), Some(checked_at)) => Some(QualityCheck {
                passed,
                notes: row.quality_check_notes,
                checked_by,
                checked_at,
            }),
            _ => None,
        };

        Ok(ProjectInstallation {
            id: row.id,
            project_id: row.project_id,
            status: row.status.parse()?,
            scheduled_date: row.scheduled_date,
            started_at: row.started_at,
            completed_at: row.completed_at,
            verified_at: row.verified_at,
            otp_hash: row.otp_hash,
            otp_expires_at: row.otp_expires_at,
            otp_attempts: row.otp_attempts,
            max_otp_attempts: row.max_otp_attempts,
            equipment_installed: row.equipment_installed.0,
            installation_notes: row.installation_notes,
            quality_check,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    project_id: String,
    user_id: String,
    contractor_id: String,
    rating: i16,
    quality_rating: Option<i16>,
    timeliness_rating: Option<i16>,
    communication_rating: Option<i16>,
    professionalism_rating: Option<i16>,
    comment: Option<String>,
    contractor_response: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for ProjectReview {
    fn from(row: ReviewRow) -> Self {
        ProjectReview {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            contractor_id: row.contractor_id,
            rating: row.rating,
            quality_rating: row.quality_rating,
            timeliness_rating: row.timeliness_rating,
            communication_rating: row.communication_rating,
            professionalism_rating: row.professionalism_rating,
            comment: row.comment,
            contractor_response: row.contractor_response,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TimelineRow {
    id: String,
    project_id: String,
    event_type: String,
    title: String,
    description: Option<String>,
    actor_id: String,
    actor_role: String,
    metadata: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TimelineRow> for TimelineEntry {
    type Error = AppError;

    fn try_from(row: TimelineRow) -> Result<Self> {
        Ok(TimelineEntry {
            id: row.id,
            project_id: row.project_id,
            event_type: row.event_type.parse()?,
            title: row.title,
            description: row.description,
            actor_id: row.actor_id,
            actor_role: row.actor_role,
            metadata: row.metadata.0,
            created_at: row.created_at,
        })
    }
}
