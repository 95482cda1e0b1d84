//! Persistence for payroll runs, payslips, and employee snapshots.
//!
//! [`PayrollStore`] is the explicit data-access seam of the pipeline: every
//! read returns a fully-populated record up front, so the calculator never
//! triggers incidental I/O mid-computation. [`mysql::MySqlStore`] is the
//! production implementation; [`memory::MemoryStore`] backs the test suite.

pub mod memory;
pub mod mysql;

use chrono::NaiveDateTime;

use crate::error::PayrollResult;
use crate::model::{
    EmployeeSnapshot, NewNotification, NewRun, Payslip, PayslipDraft, PayrollRun, RunTotals,
};

#[allow(async_fn_in_trait)]
pub trait PayrollStore: Send + Sync {
    /// Creates a run in `draft`.
    async fn create_run(&self, new: NewRun) -> PayrollResult<PayrollRun>;

    async fn run(&self, id: u64) -> PayrollResult<Option<PayrollRun>>;

    /// Most recent runs first, with the total row count for pagination.
    async fn list_runs(&self, page: u32, per_page: u32) -> PayrollResult<(Vec<PayrollRun>, i64)>;

    /// Atomically transitions `draft`/`failed` to `processing`, clearing any
    /// recorded failure. The compare-and-set is the mutual-exclusion lock
    /// for concurrent calculations of the same run: the loser observes a
    /// `Conflict`.
    async fn claim_run(&self, id: u64) -> PayrollResult<PayrollRun>;

    /// Writes recomputed aggregates and marks the run `completed`.
    async fn complete_run(
        &self,
        id: u64,
        totals: RunTotals,
        processed_at: NaiveDateTime,
    ) -> PayrollResult<()>;

    /// Marks the run `failed`, recording the reason for operators.
    async fn fail_run(&self, id: u64, reason: &str) -> PayrollResult<()>;

    /// Upserts the computed columns of a payslip by (run, employee) and
    /// returns the payslip id. An existing row keeps its `document_path`,
    /// `is_sent`, and status.
    async fn upsert_payslip(&self, draft: &PayslipDraft) -> PayrollResult<u64>;

    async fn payslip(&self, id: u64) -> PayrollResult<Option<Payslip>>;

    async fn payslips_for_run(&self, run_id: u64) -> PayrollResult<Vec<Payslip>>;

    /// Aggregates over the run's committed payslip rows. Always recomputed
    /// here, single-writer, never incremented concurrently.
    async fn run_totals(&self, run_id: u64) -> PayrollResult<RunTotals>;

    /// Records the rendered document's key and moves the payslip to
    /// `generated` (unless it is already `sent`).
    async fn set_document_path(&self, payslip_id: u64, path: &str) -> PayrollResult<()>;

    /// Monotonic: sets `is_sent` and `sent`; never reverts.
    async fn mark_sent(&self, payslip_id: u64) -> PayrollResult<()>;

    /// Active-employee snapshots, optionally restricted to explicit ids,
    /// ordered by employee id. Requested ids with no active snapshot are
    /// simply absent from the result.
    async fn employee_snapshots(&self, ids: Option<&[u64]>)
    -> PayrollResult<Vec<EmployeeSnapshot>>;

    /// A single snapshot regardless of active flag, for rendering and
    /// notification of already-computed payslips.
    async fn employee_snapshot(&self, id: u64) -> PayrollResult<Option<EmployeeSnapshot>>;

    /// Persists an in-app notification record.
    async fn record_notification(&self, notification: &NewNotification) -> PayrollResult<u64>;
}
