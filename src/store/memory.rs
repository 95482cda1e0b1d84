//! In-memory [`PayrollStore`] used by the test suite.
//!
//! Mirrors the MySQL implementation's semantics, in particular the
//! compare-and-set claim and the keep-columns-on-upsert behavior, so the
//! pipeline's concurrency and idempotency properties can be exercised
//! without a database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::error::{PayrollError, PayrollResult};
use crate::model::{
    EmployeeSnapshot, NewNotification, NewRun, Notification, Payslip, PayslipDraft, PayslipStatus,
    PayrollRun, RunStatus, RunTotals,
};
use crate::store::PayrollStore;

#[derive(Default)]
struct Inner {
    runs: HashMap<u64, PayrollRun>,
    payslips: HashMap<u64, Payslip>,
    // (run_id, employee_id) -> payslip id, the uniqueness invariant.
    slip_index: HashMap<(u64, u64), u64>,
    employees: HashMap<u64, EmployeeSnapshot>,
    notifications: Vec<Notification>,
    next_run_id: u64,
    next_payslip_id: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an employee snapshot (test fixture).
    pub async fn seed_employee(&self, snapshot: EmployeeSnapshot) {
        let mut inner = self.inner.lock().await;
        inner.employees.insert(snapshot.id, snapshot);
    }

    /// All recorded in-app notifications, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().await.notifications.clone()
    }
}

impl PayrollStore for MemoryStore {
    async fn create_run(&self, new: NewRun) -> PayrollResult<PayrollRun> {
        let mut inner = self.inner.lock().await;
        inner.next_run_id += 1;
        let run = PayrollRun {
            id: inner.next_run_id,
            period_id: new.period_id,
            start_date: new.start_date,
            end_date: new.end_date,
            status: RunStatus::Draft,
            total_gross: Decimal::ZERO,
            total_net: Decimal::ZERO,
            employee_count: 0,
            processed_at: None,
            last_error: None,
        };
        inner.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn run(&self, id: u64) -> PayrollResult<Option<PayrollRun>> {
        Ok(self.inner.lock().await.runs.get(&id).cloned())
    }

    async fn list_runs(&self, page: u32, per_page: u32) -> PayrollResult<(Vec<PayrollRun>, i64)> {
        let inner = self.inner.lock().await;
        let mut runs: Vec<PayrollRun> = inner.runs.values().cloned().collect();
        runs.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        let total = runs.len() as i64;
        let offset = ((page.max(1) - 1) * per_page) as usize;
        let runs = runs.into_iter().skip(offset).take(per_page as usize).collect();
        Ok((runs, total))
    }

    async fn claim_run(&self, id: u64) -> PayrollResult<PayrollRun> {
        let mut inner = self.inner.lock().await;
        let run = inner.runs.get_mut(&id).ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id,
        })?;
        match run.status {
            RunStatus::Draft | RunStatus::Failed => {
                run.status = RunStatus::Processing;
                run.last_error = None;
                Ok(run.clone())
            }
            status => Err(PayrollError::Conflict {
                run_id: id,
                status: status.to_string(),
                message: "cannot start calculation".to_string(),
            }),
        }
    }

    async fn complete_run(
        &self,
        id: u64,
        totals: RunTotals,
        processed_at: NaiveDateTime,
    ) -> PayrollResult<()> {
        let mut inner = self.inner.lock().await;
        let run = inner.runs.get_mut(&id).ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id,
        })?;
        run.status = RunStatus::Completed;
        run.total_gross = totals.total_gross;
        run.total_net = totals.total_net;
        run.employee_count = totals.employee_count;
        run.processed_at = Some(processed_at);
        run.last_error = None;
        Ok(())
    }

    async fn fail_run(&self, id: u64, reason: &str) -> PayrollResult<()> {
        let mut inner = self.inner.lock().await;
        let run = inner.runs.get_mut(&id).ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id,
        })?;
        run.status = RunStatus::Failed;
        run.last_error = Some(reason.to_string());
        Ok(())
    }

    async fn upsert_payslip(&self, draft: &PayslipDraft) -> PayrollResult<u64> {
        let mut inner = self.inner.lock().await;
        let key = (draft.run_id, draft.employee_id);
        if let Some(&id) = inner.slip_index.get(&key) {
            let slip = inner
                .payslips
                .get_mut(&id)
                .ok_or(PayrollError::NotFound {
                    entity: "payslip",
                    id,
                })?;
            apply_draft(slip, draft);
            return Ok(id);
        }

        inner.next_payslip_id += 1;
        let id = inner.next_payslip_id;
        let mut slip = Payslip {
            id,
            run_id: draft.run_id,
            employee_id: draft.employee_id,
            start_date: draft.start_date,
            end_date: draft.end_date,
            basic_salary: Decimal::ZERO,
            house_allowance: Decimal::ZERO,
            transport_allowance: Decimal::ZERO,
            other_allowances: Decimal::ZERO,
            overtime_hours: Decimal::ZERO,
            overtime_rate: Decimal::ZERO,
            overtime_pay: Decimal::ZERO,
            gross_salary: Decimal::ZERO,
            pension: Decimal::ZERO,
            tax: Decimal::ZERO,
            medical_levy: Decimal::ZERO,
            other_deductions: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            net_pay: Decimal::ZERO,
            needs_review: false,
            breakdown: serde_json::Value::Null,
            document_path: None,
            is_sent: false,
            status: PayslipStatus::Draft,
        };
        apply_draft(&mut slip, draft);
        inner.payslips.insert(id, slip);
        inner.slip_index.insert(key, id);
        Ok(id)
    }

    async fn payslip(&self, id: u64) -> PayrollResult<Option<Payslip>> {
        Ok(self.inner.lock().await.payslips.get(&id).cloned())
    }

    async fn payslips_for_run(&self, run_id: u64) -> PayrollResult<Vec<Payslip>> {
        let inner = self.inner.lock().await;
        let mut slips: Vec<Payslip> = inner
            .payslips
            .values()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .collect();
        slips.sort_by_key(|s| s.employee_id);
        Ok(slips)
    }

    async fn run_totals(&self, run_id: u64) -> PayrollResult<RunTotals> {
        let inner = self.inner.lock().await;
        let mut totals = RunTotals {
            total_gross: Decimal::ZERO,
            total_net: Decimal::ZERO,
            employee_count: 0,
        };
        for slip in inner.payslips.values().filter(|s| s.run_id == run_id) {
            totals.total_gross += slip.gross_salary;
            totals.total_net += slip.net_pay;
            totals.employee_count += 1;
        }
        Ok(totals)
    }

    async fn set_document_path(&self, payslip_id: u64, path: &str) -> PayrollResult<()> {
        let mut inner = self.inner.lock().await;
        let slip = inner
            .payslips
            .get_mut(&payslip_id)
            .ok_or(PayrollError::NotFound {
                entity: "payslip",
                id: payslip_id,
            })?;
        slip.document_path = Some(path.to_string());
        if slip.status != PayslipStatus::Sent {
            slip.status = PayslipStatus::Generated;
        }
        Ok(())
    }

    async fn mark_sent(&self, payslip_id: u64) -> PayrollResult<()> {
        let mut inner = self.inner.lock().await;
        let slip = inner
            .payslips
            .get_mut(&payslip_id)
            .ok_or(PayrollError::NotFound {
                entity: "payslip",
                id: payslip_id,
            })?;
        slip.is_sent = true;
        slip.status = PayslipStatus::Sent;
        Ok(())
    }

    async fn employee_snapshots(
        &self,
        ids: Option<&[u64]>,
    ) -> PayrollResult<Vec<EmployeeSnapshot>> {
        let inner = self.inner.lock().await;
        let mut snapshots: Vec<EmployeeSnapshot> = match ids {
            None => inner
                .employees
                .values()
                .filter(|e| e.is_active)
                .cloned()
                .collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.employees.get(id))
                .filter(|e| e.is_active)
                .cloned()
                .collect(),
        };
        snapshots.sort_by_key(|e| e.id);
        Ok(snapshots)
    }

    async fn employee_snapshot(&self, id: u64) -> PayrollResult<Option<EmployeeSnapshot>> {
        Ok(self.inner.lock().await.employees.get(&id).cloned())
    }

    async fn record_notification(&self, notification: &NewNotification) -> PayrollResult<u64> {
        let mut inner = self.inner.lock().await;
        let id = inner.notifications.len() as u64 + 1;
        inner.notifications.push(Notification {
            id,
            employee_id: notification.employee_id,
            payslip_id: notification.payslip_id,
            subject: notification.subject.clone(),
            body: notification.body.clone(),
            created_at: chrono::Utc::now().naive_utc(),
        });
        Ok(id)
    }
}

/// Overwrites the computed columns only; `document_path`, `is_sent`, and
/// status survive a re-run, matching the SQL upsert.
fn apply_draft(slip: &mut Payslip, draft: &PayslipDraft) {
    slip.start_date = draft.start_date;
    slip.end_date = draft.end_date;
    slip.basic_salary = draft.basic_salary;
    slip.house_allowance = draft.house_allowance;
    slip.transport_allowance = draft.transport_allowance;
    slip.other_allowances = draft.other_allowances;
    slip.overtime_hours = draft.overtime_hours;
    slip.overtime_rate = draft.overtime_rate;
    slip.overtime_pay = draft.overtime_pay;
    slip.gross_salary = draft.gross_salary;
    slip.pension = draft.pension;
    slip.tax = draft.tax;
    slip.medical_levy = draft.medical_levy;
    slip.other_deductions = draft.other_deductions;
    slip.total_deductions = draft.total_deductions;
    slip.net_pay = draft.net_pay;
    slip.needs_review = draft.needs_review;
    slip.breakdown = draft.breakdown.clone();
}
