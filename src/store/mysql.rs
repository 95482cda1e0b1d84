//! MySQL-backed [`PayrollStore`].
//!
//! Queries are runtime-bound so the crate builds without a live database;
//! dynamic SQL (the id IN-list) is assembled the same way as the update
//! builder the rest of the service uses.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::error::{PayrollError, PayrollResult};
use crate::model::{
    EmployeeSnapshot, NewNotification, NewRun, Payslip, PayslipDraft, PayrollRun, RunStatus,
    RunTotals,
};
use crate::store::PayrollStore;

const RUN_COLUMNS: &str = "id, period_id, start_date, end_date, status, total_gross, total_net, \
                           employee_count, processed_at, last_error";

const PAYSLIP_COLUMNS: &str = "id, run_id, employee_id, start_date, end_date, basic_salary, \
                               house_allowance, transport_allowance, other_allowances, \
                               overtime_hours, overtime_rate, overtime_pay, gross_salary, \
                               pension, tax, medical_levy, other_deductions, total_deductions, \
                               net_pay, needs_review, breakdown, document_path, is_sent, status";

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, basic_salary, \
                                house_allowance, transport_allowance, other_allowances, \
                                overtime_hours, overtime_rate, employment_type, manager_id, \
                                is_active";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl PayrollStore for MySqlStore {
    async fn create_run(&self, new: NewRun) -> PayrollResult<PayrollRun> {
        let result = sqlx::query(
            "INSERT INTO payroll_runs (period_id, start_date, end_date, status) \
             VALUES (?, ?, ?, 'draft')",
        )
        .bind(&new.period_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.run(id).await?.ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id,
        })
    }

    async fn run(&self, id: u64) -> PayrollResult<Option<PayrollRun>> {
        let run = sqlx::query_as::<_, PayrollRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM payroll_runs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(run)
    }

    async fn list_runs(&self, page: u32, per_page: u32) -> PayrollResult<(Vec<PayrollRun>, i64)> {
        let offset = (page.max(1) - 1) * per_page;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payroll_runs")
            .fetch_one(&self.pool)
            .await?;

        let runs = sqlx::query_as::<_, PayrollRun>(&format!(
            "SELECT {RUN_COLUMNS} FROM payroll_runs ORDER BY start_date DESC, id DESC \
             LIMIT ? OFFSET ?"
        ))
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((runs, total))
    }

    async fn claim_run(&self, id: u64) -> PayrollResult<PayrollRun> {
        // Single UPDATE as the compare-and-set; the row lock serializes
        // concurrent claimers and exactly one observes an eligible status.
        let result = sqlx::query(
            "UPDATE payroll_runs SET status = 'processing', last_error = NULL \
             WHERE id = ? AND status IN ('draft', 'failed')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.run(id).await? {
                None => Err(PayrollError::NotFound {
                    entity: "payroll run",
                    id,
                }),
                Some(run) => Err(PayrollError::Conflict {
                    run_id: id,
                    status: run.status.to_string(),
                    message: "cannot start calculation".to_string(),
                }),
            };
        }

        self.run(id).await?.ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id,
        })
    }

    async fn complete_run(
        &self,
        id: u64,
        totals: RunTotals,
        processed_at: NaiveDateTime,
    ) -> PayrollResult<()> {
        sqlx::query(
            "UPDATE payroll_runs SET status = 'completed', total_gross = ?, total_net = ?, \
             employee_count = ?, processed_at = ?, last_error = NULL WHERE id = ?",
        )
        .bind(totals.total_gross)
        .bind(totals.total_net)
        .bind(totals.employee_count)
        .bind(processed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_run(&self, id: u64, reason: &str) -> PayrollResult<()> {
        sqlx::query("UPDATE payroll_runs SET status = 'failed', last_error = ? WHERE id = ?")
            .bind(reason)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_payslip(&self, draft: &PayslipDraft) -> PayrollResult<u64> {
        sqlx::query(
            "INSERT INTO payslips (run_id, employee_id, start_date, end_date, basic_salary, \
             house_allowance, transport_allowance, other_allowances, overtime_hours, \
             overtime_rate, overtime_pay, gross_salary, pension, tax, medical_levy, \
             other_deductions, total_deductions, net_pay, needs_review, breakdown, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft') \
             ON DUPLICATE KEY UPDATE start_date = VALUES(start_date), \
             end_date = VALUES(end_date), basic_salary = VALUES(basic_salary), \
             house_allowance = VALUES(house_allowance), \
             transport_allowance = VALUES(transport_allowance), \
             other_allowances = VALUES(other_allowances), \
             overtime_hours = VALUES(overtime_hours), overtime_rate = VALUES(overtime_rate), \
             overtime_pay = VALUES(overtime_pay), gross_salary = VALUES(gross_salary), \
             pension = VALUES(pension), tax = VALUES(tax), \
             medical_levy = VALUES(medical_levy), other_deductions = VALUES(other_deductions), \
             total_deductions = VALUES(total_deductions), net_pay = VALUES(net_pay), \
             needs_review = VALUES(needs_review), breakdown = VALUES(breakdown)",
        )
        .bind(draft.run_id)
        .bind(draft.employee_id)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.basic_salary)
        .bind(draft.house_allowance)
        .bind(draft.transport_allowance)
        .bind(draft.other_allowances)
        .bind(draft.overtime_hours)
        .bind(draft.overtime_rate)
        .bind(draft.overtime_pay)
        .bind(draft.gross_salary)
        .bind(draft.pension)
        .bind(draft.tax)
        .bind(draft.medical_levy)
        .bind(draft.other_deductions)
        .bind(draft.total_deductions)
        .bind(draft.net_pay)
        .bind(draft.needs_review)
        .bind(&draft.breakdown)
        .execute(&self.pool)
        .await?;

        // last_insert_id is unreliable on the duplicate-key path; re-read by
        // the unique (run, employee) pair instead.
        let id: u64 =
            sqlx::query_scalar("SELECT id FROM payslips WHERE run_id = ? AND employee_id = ?")
                .bind(draft.run_id)
                .bind(draft.employee_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(id)
    }

    async fn payslip(&self, id: u64) -> PayrollResult<Option<Payslip>> {
        let slip = sqlx::query_as::<_, Payslip>(&format!(
            "SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(slip)
    }

    async fn payslips_for_run(&self, run_id: u64) -> PayrollResult<Vec<Payslip>> {
        let slips = sqlx::query_as::<_, Payslip>(&format!(
            "SELECT {PAYSLIP_COLUMNS} FROM payslips WHERE run_id = ? ORDER BY employee_id"
        ))
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(slips)
    }

    async fn run_totals(&self, run_id: u64) -> PayrollResult<RunTotals> {
        let (total_gross, total_net, employee_count): (Decimal, Decimal, i64) =
            sqlx::query_as(
                "SELECT COALESCE(SUM(gross_salary), 0), COALESCE(SUM(net_pay), 0), COUNT(*) \
                 FROM payslips WHERE run_id = ?",
            )
            .bind(run_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(RunTotals {
            total_gross,
            total_net,
            employee_count: employee_count as u32,
        })
    }

    async fn set_document_path(&self, payslip_id: u64, path: &str) -> PayrollResult<()> {
        let result = sqlx::query(
            "UPDATE payslips SET document_path = ?, \
             status = IF(status = 'sent', status, 'generated') WHERE id = ?",
        )
        .bind(path)
        .bind(payslip_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.payslip(payslip_id).await?.is_none() {
            return Err(PayrollError::NotFound {
                entity: "payslip",
                id: payslip_id,
            });
        }
        Ok(())
    }

    async fn mark_sent(&self, payslip_id: u64) -> PayrollResult<()> {
        sqlx::query("UPDATE payslips SET is_sent = TRUE, status = 'sent' WHERE id = ?")
            .bind(payslip_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn employee_snapshots(
        &self,
        ids: Option<&[u64]>,
    ) -> PayrollResult<Vec<EmployeeSnapshot>> {
        let snapshots = match ids {
            None => {
                sqlx::query_as::<_, EmployeeSnapshot>(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE is_active = TRUE ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            Some([]) => Vec::new(),
            Some(ids) => {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees \
                     WHERE is_active = TRUE AND id IN ({placeholders}) ORDER BY id"
                );
                let mut query = sqlx::query_as::<_, EmployeeSnapshot>(&sql);
                for id in ids {
                    query = query.bind(id);
                }
                query.fetch_all(&self.pool).await?
            }
        };
        Ok(snapshots)
    }

    async fn employee_snapshot(&self, id: u64) -> PayrollResult<Option<EmployeeSnapshot>> {
        let snapshot = sqlx::query_as::<_, EmployeeSnapshot>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(snapshot)
    }

    async fn record_notification(&self, notification: &NewNotification) -> PayrollResult<u64> {
        let result = sqlx::query(
            "INSERT INTO notifications (employee_id, payslip_id, subject, body) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(notification.employee_id)
        .bind(notification.payslip_id)
        .bind(&notification.subject)
        .bind(&notification.body)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }
}

// Status columns come back as strings; keep the enum in sync with the
// VARCHAR values written above.
#[cfg(test)]
mod tests {
    use crate::model::RunStatus;
    use std::str::FromStr;

    #[test]
    fn claim_eligible_statuses_match_enum_strings() {
        for s in ["draft", "failed"] {
            assert!(RunStatus::from_str(s).is_ok());
        }
    }
}
