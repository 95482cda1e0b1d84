use crate::api::payroll::{
    GeneratePayslips, PaginatedRunResponse, ProcessRun, RunQuery, TriggerPayroll,
};
use crate::model::{Adjustment, PayrollRun, Payslip, PayslipStatus, RunStatus};
use crate::pipeline::GenerateOutcome;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll Pipeline API",
        version = "1.0.0",
        description = r#"
## Payroll Calculation & Payslip Generation

This API drives the payroll pipeline: trigger a payroll run for a period,
recover failed runs, generate and download payslip documents, and dispatch
employee notifications.

### Pipeline
- **Trigger processing** — compute payslips and statutory deductions for a
  period and employee set
- **Generate payslips** — render stored documents for a completed run and
  optionally notify employees
- **Download** — fetch the rendered document for a payslip

### Response Format
- JSON-based RESTful responses
- Errors carry a stable `code` plus a human-readable `message`
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::payroll::trigger_run,
        crate::api::payroll::process_run,
        crate::api::payroll::generate_payslips,
        crate::api::payroll::get_run,
        crate::api::payroll::list_runs,
        crate::api::payroll::list_payslips,
        crate::api::payroll::download_document
    ),
    components(
        schemas(
            TriggerPayroll,
            ProcessRun,
            GeneratePayslips,
            RunQuery,
            PaginatedRunResponse,
            PayrollRun,
            Payslip,
            RunStatus,
            PayslipStatus,
            Adjustment,
            GenerateOutcome
        )
    ),
    tags(
        (name = "Payroll", description = "Payroll run and payslip pipeline APIs"),
    )
)]
pub struct ApiDoc;
