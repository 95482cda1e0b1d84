//! Payslip document renderer: the second pipeline stage.
//!
//! Turns a computed payslip into a stored document under its deterministic
//! key and records the key on the payslip. Idempotent: a re-render
//! overwrites the same object. A storage failure leaves `document_path`
//! untouched, so the stage is safely retryable.

use tracing::info;

use crate::docstore::{self, DocumentStore};
use crate::error::{PayrollError, PayrollResult};
use crate::model::{EmployeeSnapshot, Payslip, PayrollRun};
use crate::store::PayrollStore;

/// Renders and stores the document for one payslip, returning its key.
pub async fn render_document<S: PayrollStore, D: DocumentStore>(
    store: &S,
    docs: &D,
    payslip_id: u64,
) -> PayrollResult<String> {
    let slip = store
        .payslip(payslip_id)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "payslip",
            id: payslip_id,
        })?;
    let run = store.run(slip.run_id).await?.ok_or(PayrollError::NotFound {
        entity: "payroll run",
        id: slip.run_id,
    })?;
    let employee = store.employee_snapshot(slip.employee_id).await?;

    let body = render_payslip_text(&run, &slip, employee.as_ref());
    let key = docstore::payslip_key(&run.period_id, slip.id);
    docs.put(&key, body.as_bytes()).await?;
    store.set_document_path(slip.id, &key).await?;

    info!(payslip_id, run_id = run.id, key = %key, "payslip document rendered");
    Ok(key)
}

fn render_payslip_text(
    run: &PayrollRun,
    slip: &Payslip,
    employee: Option<&EmployeeSnapshot>,
) -> String {
    let mut out = String::new();
    let name = employee
        .map(|e| format!("{} ({})", e.full_name(), e.employee_code))
        .unwrap_or_else(|| format!("employee #{}", slip.employee_id));

    out.push_str(&format!("PAYSLIP {}\n", run.period_id));
    out.push_str(&format!("{name}\n"));
    out.push_str(&format!(
        "Period: {} to {}\n\n",
        slip.start_date, slip.end_date
    ));

    out.push_str("EARNINGS\n");
    out.push_str(&format!("  Basic salary        {:>12}\n", slip.basic_salary));
    out.push_str(&format!("  House allowance     {:>12}\n", slip.house_allowance));
    out.push_str(&format!(
        "  Transport allowance {:>12}\n",
        slip.transport_allowance
    ));
    out.push_str(&format!("  Other allowances    {:>12}\n", slip.other_allowances));
    out.push_str(&format!(
        "  Overtime ({} h @ {}) {:>12}\n",
        slip.overtime_hours, slip.overtime_rate, slip.overtime_pay
    ));
    out.push_str(&format!("  Gross salary        {:>12}\n\n", slip.gross_salary));

    out.push_str("DEDUCTIONS\n");
    out.push_str(&format!("  Pension             {:>12}\n", slip.pension));
    out.push_str(&format!("  Tax                 {:>12}\n", slip.tax));
    out.push_str(&format!("  Medical levy        {:>12}\n", slip.medical_levy));
    out.push_str(&format!("  Other deductions    {:>12}\n", slip.other_deductions));
    out.push_str(&format!("  Total deductions    {:>12}\n\n", slip.total_deductions));

    out.push_str(&format!("NET PAY               {:>12}\n", slip.net_pay));
    if slip.needs_review {
        out.push_str("\n* Net pay floored at zero; held for manual review.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PayslipStatus, RunStatus};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn fixture() -> (PayrollRun, Payslip) {
        let run = PayrollRun {
            id: 1,
            period_id: "2024-05".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            status: RunStatus::Completed,
            total_gross: dec!(5650),
            total_net: dec!(4581),
            employee_count: 1,
            processed_at: None,
            last_error: None,
        };
        let slip = Payslip {
            id: 1,
            run_id: 1,
            employee_id: 1001,
            start_date: run.start_date,
            end_date: run.end_date,
            basic_salary: dec!(5000),
            house_allowance: dec!(200),
            transport_allowance: dec!(300),
            other_allowances: Decimal::ZERO,
            overtime_hours: dec!(10),
            overtime_rate: dec!(15),
            overtime_pay: dec!(150),
            gross_salary: dec!(5650),
            pension: dec!(282.50),
            tax: dec!(673.50),
            medical_levy: dec!(113.00),
            other_deductions: Decimal::ZERO,
            total_deductions: dec!(1069.00),
            net_pay: dec!(4581.00),
            needs_review: false,
            breakdown: serde_json::Value::Null,
            document_path: None,
            is_sent: false,
            status: PayslipStatus::Draft,
        };
        (run, slip)
    }

    #[test]
    fn document_text_carries_period_and_net_pay() {
        let (run, slip) = fixture();
        let text = render_payslip_text(&run, &slip, None);
        assert!(text.contains("PAYSLIP 2024-05"));
        assert!(text.contains("4581.00"));
        assert!(text.contains("employee #1001"));
        assert!(!text.contains("manual review"));
    }

    #[test]
    fn flagged_payslips_carry_the_review_note() {
        let (run, mut slip) = fixture();
        slip.needs_review = true;
        slip.net_pay = Decimal::ZERO;
        let text = render_payslip_text(&run, &slip, None);
        assert!(text.contains("manual review"));
    }
}
