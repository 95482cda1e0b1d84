use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle of a payslip: `draft -> generated -> sent`.
///
/// The calculator creates payslips in `draft`, the renderer moves them to
/// `generated` once a document exists, and the dispatcher moves them to
/// `sent`. `sent` is monotonic: it never reverts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    sqlx::Type,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PayslipStatus {
    Draft,
    Generated,
    Sent,
}

/// One employee's computed pay record for a given payroll run.
///
/// At most one payslip exists per (run, employee) pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payslip {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub run_id: u64,

    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "2024-05-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2024-05-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    #[schema(value_type = String, example = "5000.00")]
    pub basic_salary: Decimal,

    #[schema(value_type = String, example = "200.00")]
    pub house_allowance: Decimal,

    #[schema(value_type = String, example = "300.00")]
    pub transport_allowance: Decimal,

    #[schema(value_type = String, example = "0.00")]
    pub other_allowances: Decimal,

    #[schema(value_type = String, example = "10.00")]
    pub overtime_hours: Decimal,

    #[schema(value_type = String, example = "15.00")]
    pub overtime_rate: Decimal,

    #[schema(value_type = String, example = "150.00")]
    pub overtime_pay: Decimal,

    #[schema(value_type = String, example = "5650.00")]
    pub gross_salary: Decimal,

    #[schema(value_type = String, example = "282.50")]
    pub pension: Decimal,

    #[schema(value_type = String, example = "673.50")]
    pub tax: Decimal,

    #[schema(value_type = String, example = "113.00")]
    pub medical_levy: Decimal,

    #[schema(value_type = String, example = "0.00")]
    pub other_deductions: Decimal,

    #[schema(value_type = String, example = "1069.00")]
    pub total_deductions: Decimal,

    #[schema(value_type = String, example = "4581.00")]
    pub net_pay: Decimal,

    /// Set when the computed net pay would have gone negative and was
    /// floored at zero; the payslip is held for manual review.
    pub needs_review: bool,

    /// Itemized computation trace.
    #[schema(value_type = Object)]
    pub breakdown: serde_json::Value,

    /// Content-store key of the rendered document; null until rendered.
    #[schema(nullable = true, example = "payslips/2024-05/payslip-1.txt")]
    pub document_path: Option<String>,

    pub is_sent: bool,

    pub status: PayslipStatus,
}

/// The computed portion of a payslip, as produced by the calculator.
///
/// Upserted by (run, employee): a re-run overwrites these columns and leaves
/// `document_path`/`is_sent` untouched.
#[derive(Debug, Clone)]
pub struct PayslipDraft {
    pub run_id: u64,
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub basic_salary: Decimal,
    pub house_allowance: Decimal,
    pub transport_allowance: Decimal,
    pub other_allowances: Decimal,
    pub overtime_hours: Decimal,
    pub overtime_rate: Decimal,
    pub overtime_pay: Decimal,
    pub gross_salary: Decimal,
    pub pension: Decimal,
    pub tax: Decimal,
    pub medical_levy: Decimal,
    pub other_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_pay: Decimal,
    pub needs_review: bool,
    pub breakdown: serde_json::Value,
}
