//! Payroll calculator: the first pipeline stage.
//!
//! Claims the run, computes and upserts one payslip per active employee,
//! then recomputes the run aggregates from the committed rows. Re-running a
//! failed run is the documented recovery path: payslips are upserted by
//! (run, employee), so repeated invocations converge on the same rows.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{PayrollError, PayrollResult};
use crate::model::{Adjustment, EmployeeSnapshot, PayrollRun, PayslipDraft};
use crate::rules::{self, StatutoryConfig, StatutoryRules};
use crate::store::PayrollStore;

/// Runs the calculation stage for one payroll run.
///
/// The claim transitions `draft`/`failed` to `processing` and doubles as the
/// mutual-exclusion lock: a concurrent caller for the same run observes
/// `processing` and gets a [`PayrollError::Conflict`] with no mutation.
/// Any error mid-loop marks the run `failed` (payslips already written
/// remain) and is re-raised to the caller.
pub async fn process_payroll<S: PayrollStore>(
    store: &S,
    config: &StatutoryConfig,
    run_id: u64,
    employee_ids: Option<&[u64]>,
    adjustments: &HashMap<u64, Adjustment>,
) -> PayrollResult<PayrollRun> {
    let run = store.claim_run(run_id).await?;
    info!(run_id, period = %run.period_id, "payroll calculation started");

    match calculate_all(store, config, &run, employee_ids, adjustments).await {
        Ok(processed) => {
            // Single-writer aggregate recompute from committed rows.
            let totals = store.run_totals(run_id).await?;
            let processed_at = chrono::Utc::now().naive_utc();
            store.complete_run(run_id, totals, processed_at).await?;
            info!(
                run_id,
                employees = processed,
                total_gross = %totals.total_gross,
                total_net = %totals.total_net,
                "payroll calculation completed"
            );
            store.run(run_id).await?.ok_or(PayrollError::NotFound {
                entity: "payroll run",
                id: run_id,
            })
        }
        Err(e) => {
            store.fail_run(run_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn calculate_all<S: PayrollStore>(
    store: &S,
    config: &StatutoryConfig,
    run: &PayrollRun,
    employee_ids: Option<&[u64]>,
    adjustments: &HashMap<u64, Adjustment>,
) -> PayrollResult<u32> {
    let statutory = config.rules_for(run.start_date)?;
    let snapshots = store.employee_snapshots(employee_ids).await?;

    // Explicitly requested employees with no active snapshot are skipped,
    // not fatal.
    if let Some(requested) = employee_ids {
        for id in requested {
            if !snapshots.iter().any(|s| s.id == *id) {
                warn!(
                    run_id = run.id,
                    employee_id = id,
                    "no active snapshot for requested employee, skipping"
                );
            }
        }
    }

    if snapshots.is_empty() {
        return Err(PayrollError::computation(format!(
            "no active employees for payroll run {}",
            run.id
        )));
    }

    let mut processed = 0u32;
    for snapshot in &snapshots {
        let adjustment = adjustments.get(&snapshot.id).cloned().unwrap_or_default();
        let draft = compute_payslip(run, snapshot, &adjustment, statutory)?;
        if draft.needs_review {
            warn!(
                run_id = run.id,
                employee_id = snapshot.id,
                "net pay floored at zero, payslip flagged for review"
            );
        }
        store.upsert_payslip(&draft).await?;
        processed += 1;
    }
    Ok(processed)
}

/// Computes one payslip draft from a snapshot, adjustments, and the rules in
/// effect. Pure apart from its inputs; each monetary component is rounded
/// once when it is produced and summed exactly thereafter.
pub fn compute_payslip(
    run: &PayrollRun,
    snapshot: &EmployeeSnapshot,
    adjustment: &Adjustment,
    statutory: &StatutoryRules,
) -> PayrollResult<PayslipDraft> {
    let overtime_pay = rules::compute_overtime_pay(snapshot.overtime_hours, snapshot.overtime_rate)?;

    let other_allowances = rules::round_money(
        snapshot.other_allowances + adjustment.overtime_bonus + adjustment.other_bonuses,
    );
    let gross_salary = snapshot.basic_salary
        + snapshot.house_allowance
        + snapshot.transport_allowance
        + other_allowances
        + overtime_pay;

    let deductions = rules::compute_statutory(gross_salary, statutory)?;
    let other_deductions =
        rules::round_money(adjustment.loan_deductions + adjustment.advance_deductions);
    let total_deductions = deductions.total() + other_deductions;

    let raw_net = gross_salary - total_deductions;
    let needs_review = raw_net < Decimal::ZERO;
    let net_pay = raw_net.max(Decimal::ZERO);

    let breakdown = serde_json::json!({
        "rules_version": statutory.version,
        "earnings": {
            "basic_salary": snapshot.basic_salary,
            "house_allowance": snapshot.house_allowance,
            "transport_allowance": snapshot.transport_allowance,
            "other_allowances": other_allowances,
            "overtime": {
                "hours": snapshot.overtime_hours,
                "rate": snapshot.overtime_rate,
                "pay": overtime_pay,
            },
            "gross_salary": gross_salary,
        },
        "deductions": {
            "pension": deductions.pension,
            "tax": deductions.tax,
            "medical_levy": deductions.medical_levy,
            "other_deductions": other_deductions,
            "total": total_deductions,
        },
        "net_pay": net_pay,
        "floored_at_zero": needs_review,
    });

    Ok(PayslipDraft {
        run_id: run.id,
        employee_id: snapshot.id,
        start_date: run.start_date,
        end_date: run.end_date,
        basic_salary: snapshot.basic_salary,
        house_allowance: snapshot.house_allowance,
        transport_allowance: snapshot.transport_allowance,
        other_allowances,
        overtime_hours: snapshot.overtime_hours,
        overtime_rate: snapshot.overtime_rate,
        overtime_pay,
        gross_salary,
        pension: deductions.pension,
        tax: deductions.tax,
        medical_levy: deductions.medical_levy,
        other_deductions,
        total_deductions,
        net_pay,
        needs_review,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewRun, RunStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn test_run() -> PayrollRun {
        PayrollRun {
            id: 1,
            period_id: "2024-05".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            status: RunStatus::Processing,
            total_gross: Decimal::ZERO,
            total_net: Decimal::ZERO,
            employee_count: 0,
            processed_at: None,
            last_error: None,
        }
    }

    fn test_snapshot() -> EmployeeSnapshot {
        EmployeeSnapshot {
            id: 1001,
            employee_code: "EMP-1001".to_string(),
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            email: "amina.diallo@example.com".to_string(),
            basic_salary: dec!(5000),
            house_allowance: dec!(200),
            transport_allowance: dec!(300),
            other_allowances: Decimal::ZERO,
            overtime_hours: dec!(10),
            overtime_rate: dec!(15),
            employment_type: "full_time".to_string(),
            manager_id: None,
            is_active: true,
        }
    }

    fn statutory() -> StatutoryRules {
        StatutoryConfig::builtin()
            .rules_for(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .unwrap()
            .clone()
    }

    #[test]
    fn worked_scenario_matches_expected_components() {
        let draft =
            compute_payslip(&test_run(), &test_snapshot(), &Adjustment::default(), &statutory())
                .unwrap();

        assert_eq!(draft.overtime_pay, dec!(150));
        assert_eq!(draft.gross_salary, dec!(5650));
        assert_eq!(draft.pension, dec!(282.50));
        assert_eq!(draft.tax, dec!(673.50));
        assert_eq!(draft.medical_levy, dec!(113.00));
        assert_eq!(draft.total_deductions, dec!(1069.00));
        assert_eq!(draft.net_pay, dec!(4581.00));
        assert!(!draft.needs_review);
        assert_eq!(
            draft.net_pay,
            draft.gross_salary - draft.total_deductions
        );
    }

    #[test]
    fn bonuses_land_in_other_allowances_and_loans_in_other_deductions() {
        let adjustment = Adjustment {
            overtime_bonus: dec!(50),
            other_bonuses: dec!(100),
            loan_deductions: dec!(200),
            advance_deductions: dec!(25),
        };
        let draft =
            compute_payslip(&test_run(), &test_snapshot(), &adjustment, &statutory()).unwrap();

        assert_eq!(draft.other_allowances, dec!(150));
        assert_eq!(draft.other_deductions, dec!(225));
        assert_eq!(draft.gross_salary, dec!(5800));
    }

    #[test]
    fn net_pay_is_floored_and_flagged() {
        let adjustment = Adjustment {
            loan_deductions: dec!(100000),
            ..Adjustment::default()
        };
        let draft =
            compute_payslip(&test_run(), &test_snapshot(), &adjustment, &statutory()).unwrap();

        assert_eq!(draft.net_pay, Decimal::ZERO);
        assert!(draft.needs_review);
        assert_eq!(draft.breakdown["floored_at_zero"], serde_json::json!(true));
    }

    #[test]
    fn negative_overtime_hours_propagate_as_computation_error() {
        let mut snapshot = test_snapshot();
        snapshot.overtime_hours = dec!(-1);
        let err = compute_payslip(&test_run(), &snapshot, &Adjustment::default(), &statutory())
            .unwrap_err();
        assert_eq!(err.code(), "COMPUTATION_ERROR");
    }

    #[test]
    fn breakdown_records_the_rules_version() {
        let draft =
            compute_payslip(&test_run(), &test_snapshot(), &Adjustment::default(), &statutory())
                .unwrap();
        assert_eq!(
            draft.breakdown["rules_version"],
            serde_json::json!("builtin-2020")
        );
    }

    #[tokio::test]
    async fn rejects_run_in_processing() {
        use crate::store::memory::MemoryStore;

        let store = MemoryStore::new();
        store.seed_employee(test_snapshot()).await;
        let run = store
            .create_run(NewRun {
                period_id: "2024-05".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            })
            .await
            .unwrap();
        store.claim_run(run.id).await.unwrap();

        let err = process_payroll(
            &store,
            &StatutoryConfig::builtin(),
            run.id,
            None,
            &HashMap::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }
}
