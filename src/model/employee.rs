use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time view of an employee for one calculation.
///
/// Owned by the external employee directory; loaded up front by an explicit
/// store call and never mutated by the pipeline. Overtime hours and rate are
/// fed from the attendance system for the period being processed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeSnapshot {
    pub id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub basic_salary: Decimal,
    pub house_allowance: Decimal,
    pub transport_allowance: Decimal,
    pub other_allowances: Decimal,
    pub overtime_hours: Decimal,
    pub overtime_rate: Decimal,
    pub employment_type: String,
    pub manager_id: Option<u64>,
    pub is_active: bool,
}

impl EmployeeSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
