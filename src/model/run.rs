use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle of a payroll run.
///
/// `draft -> processing -> completed | failed`; a failed run may be claimed
/// again (`failed -> processing`) as the documented recovery path. A run is
/// never deleted once completed.
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
pub enum RunStatus {
    Draft,
    Processing,
    Completed,
    Failed,
}

/// One payroll-processing cycle covering a period and employee set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PayrollRun {
    #[schema(example = 7)]
    pub id: u64,

    /// Pay period formatted `YYYY-MM`.
    #[schema(example = "2024-05")]
    pub period_id: String,

    #[schema(example = "2024-05-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2024-05-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    pub status: RunStatus,

    /// Sum of gross salaries over the run's payslips, recomputed after the
    /// per-employee phase, never edited independently.
    #[schema(value_type = String, example = "5650.00")]
    pub total_gross: Decimal,

    #[schema(value_type = String, example = "4581.00")]
    pub total_net: Decimal,

    #[schema(example = 1)]
    pub employee_count: u32,

    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub processed_at: Option<NaiveDateTime>,

    /// Last failure reason, for operator visibility; cleared when the run is
    /// claimed again.
    #[schema(nullable = true)]
    pub last_error: Option<String>,
}

/// Input for creating a run in `draft`.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub period_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Aggregates recomputed from a run's committed payslip rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub total_gross: Decimal,
    pub total_net: Decimal,
    pub employee_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(RunStatus::Processing.to_string(), "processing");
        assert_eq!(RunStatus::from_str("failed").unwrap(), RunStatus::Failed);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
