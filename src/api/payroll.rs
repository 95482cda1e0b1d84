use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::AppState;
use crate::docstore::DocumentStore;
use crate::error::{PayrollError, PayrollResult};
use crate::model::{Adjustment, NewRun, PayrollRun, Payslip, RunStatus};
use crate::store::PayrollStore;

#[derive(Deserialize, ToSchema)]
pub struct TriggerPayroll {
    /// Pay period, strictly `YYYY-MM`.
    #[schema(example = "2024-05")]
    pub payroll_period: String,

    #[schema(example = "2024-05-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2024-05-31", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    /// Explicit employee subset; defaults to all active employees.
    #[schema(example = json!([1001, 1002]))]
    pub employee_ids: Option<Vec<u64>>,

    /// Per-employee adjustment overrides keyed by employee id.
    #[schema(value_type = Object, nullable = true)]
    pub adjustments: Option<HashMap<u64, Adjustment>>,
}

#[derive(Deserialize, ToSchema)]
pub struct ProcessRun {
    pub employee_ids: Option<Vec<u64>>,

    #[schema(value_type = Object, nullable = true)]
    pub adjustments: Option<HashMap<u64, Adjustment>>,
}

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayslips {
    /// Also dispatch employee notifications after rendering. Defaults to
    /// true.
    #[schema(example = true)]
    pub send_email: Option<bool>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RunQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedRunResponse {
    pub data: Vec<PayrollRun>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Strict `YYYY-MM` check; returns the first day of the period.
pub fn parse_period(period: &str) -> PayrollResult<NaiveDate> {
    let shape_ok = period.len() == 7
        && period.as_bytes()[4] == b'-'
        && period[..4].bytes().all(|b| b.is_ascii_digit())
        && period[5..].bytes().all(|b| b.is_ascii_digit());
    if !shape_ok {
        return Err(PayrollError::validation(
            "payroll_period",
            format!("'{period}' does not match YYYY-MM"),
        ));
    }
    NaiveDate::parse_from_str(&format!("{period}-01"), "%Y-%m-%d").map_err(|_| {
        PayrollError::validation("payroll_period", format!("'{period}' is not a real month"))
    })
}

fn validate_adjustments(adjustments: &HashMap<u64, Adjustment>) -> PayrollResult<()> {
    for (employee_id, adjustment) in adjustments {
        if let Some(field) = adjustment.first_negative_field() {
            return Err(PayrollError::validation(
                format!("adjustments.{employee_id}.{field}"),
                "must be non-negative",
            ));
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/payroll/runs",
    request_body = TriggerPayroll,
    responses(
        (status = 201, description = "Run created and calculated", body = PayrollRun),
        (status = 400, description = "Invalid period or dates"),
        (status = 422, description = "Calculation rejected an input")
    ),
    tag = "Payroll"
)]
pub async fn trigger_run(
    state: web::Data<AppState>,
    payload: web::Json<TriggerPayroll>,
) -> Result<impl Responder, PayrollError> {
    parse_period(&payload.payroll_period)?;
    if payload.end_date < payload.start_date {
        return Err(PayrollError::validation(
            "end_date",
            "must not be before start_date",
        ));
    }
    let adjustments = payload.adjustments.clone().unwrap_or_default();
    validate_adjustments(&adjustments)?;

    let run = state
        .orchestrator
        .store()
        .create_run(NewRun {
            period_id: payload.payroll_period.clone(),
            start_date: payload.start_date,
            end_date: payload.end_date,
        })
        .await?;

    let run = state
        .orchestrator
        .run_calculation(run.id, payload.employee_ids.as_deref(), &adjustments)
        .await?;

    Ok(HttpResponse::Created().json(run))
}

#[utoipa::path(
    post,
    path = "/api/payroll/runs/{run_id}/process",
    request_body = ProcessRun,
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, description = "Run recalculated", body = PayrollRun),
        (status = 404, description = "Run not found"),
        (status = 409, description = "Run already processing or completed")
    ),
    tag = "Payroll"
)]
pub async fn process_run(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: Option<web::Json<ProcessRun>>,
) -> Result<impl Responder, PayrollError> {
    let run_id = path.into_inner();
    let (employee_ids, adjustments) = match payload {
        Some(body) => {
            let body = body.into_inner();
            (body.employee_ids, body.adjustments.unwrap_or_default())
        }
        None => (None, HashMap::new()),
    };
    validate_adjustments(&adjustments)?;

    let run = state
        .orchestrator
        .run_calculation(run_id, employee_ids.as_deref(), &adjustments)
        .await?;
    Ok(HttpResponse::Ok().json(run))
}

#[utoipa::path(
    post,
    path = "/api/payroll/runs/{run_id}/payslips",
    request_body = GeneratePayslips,
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 202, description = "Generation dispatched"),
        (status = 404, description = "Run not found"),
        (status = 409, description = "Run not completed")
    ),
    tag = "Payroll"
)]
pub async fn generate_payslips(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: Option<web::Json<GeneratePayslips>>,
) -> Result<impl Responder, PayrollError> {
    let run_id = path.into_inner();
    let send_email = payload.and_then(|p| p.send_email).unwrap_or(true);

    // Reject ineligible runs before dispatching; the background task
    // re-checks against current state.
    let run = state
        .orchestrator
        .store()
        .run(run_id)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id: run_id,
        })?;
    if run.status != RunStatus::Completed {
        return Err(PayrollError::Conflict {
            run_id,
            status: run.status.to_string(),
            message: "payslips can only be generated for a completed run".to_string(),
        });
    }

    let orchestrator = state.orchestrator.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = orchestrator.generate_documents(run_id, send_email).await {
            tracing::error!(run_id, error = %e, "payslip generation dispatch failed");
        }
    });

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "message": "Payslip generation dispatched",
        "run_id": run_id,
        "send_email": send_email,
    })))
}

#[utoipa::path(
    get,
    path = "/api/payroll/runs/{run_id}",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, body = PayrollRun),
        (status = 404)
    ),
    tag = "Payroll"
)]
pub async fn get_run(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<impl Responder, PayrollError> {
    let run_id = path.into_inner();
    let run = state
        .orchestrator
        .store()
        .run(run_id)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "payroll run",
            id: run_id,
        })?;
    Ok(HttpResponse::Ok().json(run))
}

#[utoipa::path(
    get,
    path = "/api/payroll/runs",
    params(RunQuery),
    responses(
        (status = 200, body = PaginatedRunResponse)
    ),
    tag = "Payroll"
)]
pub async fn list_runs(
    state: web::Data<AppState>,
    query: web::Query<RunQuery>,
) -> Result<impl Responder, PayrollError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    let (data, total) = state.orchestrator.store().list_runs(page, per_page).await?;
    Ok(HttpResponse::Ok().json(PaginatedRunResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/runs/{run_id}/payslips",
    params(("run_id", description = "Payroll run ID")),
    responses(
        (status = 200, body = [Payslip]),
        (status = 404)
    ),
    tag = "Payroll"
)]
pub async fn list_payslips(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<impl Responder, PayrollError> {
    let run_id = path.into_inner();
    if state.orchestrator.store().run(run_id).await?.is_none() {
        return Err(PayrollError::NotFound {
            entity: "payroll run",
            id: run_id,
        });
    }
    let slips = state.orchestrator.store().payslips_for_run(run_id).await?;
    Ok(HttpResponse::Ok().json(slips))
}

#[utoipa::path(
    get,
    path = "/api/payroll/payslips/{payslip_id}/document",
    params(("payslip_id", description = "Payslip ID")),
    responses(
        (status = 200, description = "Rendered payslip document", content_type = "text/plain"),
        (status = 404, description = "Payslip missing or not yet rendered")
    ),
    tag = "Payroll"
)]
pub async fn download_document(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<impl Responder, PayrollError> {
    let payslip_id = path.into_inner();
    let slip = state
        .orchestrator
        .store()
        .payslip(payslip_id)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "payslip",
            id: payslip_id,
        })?;

    let key = slip.document_path.ok_or(PayrollError::NotFound {
        entity: "payslip document",
        id: payslip_id,
    })?;
    let bytes = state
        .docs
        .get(&key)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "payslip document",
            id: payslip_id,
        })?;

    let filename = key.rsplit('/').next().unwrap_or("payslip.txt").to_string();
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn period_must_be_yyyy_mm() {
        assert!(parse_period("2024-05").is_ok());
        assert!(parse_period("2024-5").is_err());
        assert!(parse_period("2024/05").is_err());
        assert!(parse_period("24-05").is_err());
        assert!(parse_period("2024-13").is_err());
        assert!(parse_period("2024-00").is_err());
    }

    #[test]
    fn parse_period_returns_first_of_month() {
        assert_eq!(
            parse_period("2024-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn negative_adjustments_are_rejected() {
        let mut adjustments = HashMap::new();
        adjustments.insert(
            1001,
            Adjustment {
                advance_deductions: dec!(-5),
                ..Adjustment::default()
            },
        );
        let err = validate_adjustments(&adjustments).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("advance_deductions"));
    }
}
