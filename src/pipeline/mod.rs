//! The three-stage payroll pipeline: calculate, render, notify.
//!
//! Each stage is an independently schedulable unit keyed by a run or
//! payslip id. Ordering between stages is enforced by preconditions on
//! persisted state (a payslip must exist before render, a document must
//! exist before notify), never by wall-clock delay.

pub mod calculator;
pub mod notifier;
pub mod orchestrator;
pub mod renderer;

pub use calculator::{compute_payslip, process_payroll};
pub use notifier::{LogSender, NotificationSender, PayslipNotice, notify};
pub use orchestrator::{GenerateOutcome, Orchestrator, RetryPolicy};
pub use renderer::render_document;
