//! Payroll calculation and payslip generation service.
//!
//! Takes a payroll run covering a period and a set of employees, computes
//! each employee's pay components and statutory deductions, persists payslip
//! records, renders them into stored documents, and dispatches notifications
//! through a three-stage asynchronous pipeline with idempotent,
//! independently retryable stages.

pub mod api;
pub mod config;
pub mod db;
pub mod docs;
pub mod docstore;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod routes;
pub mod rules;
pub mod store;
