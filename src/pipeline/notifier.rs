//! Notification dispatcher: the third pipeline stage.
//!
//! Requires a rendered document; sends mail through the
//! [`NotificationSender`] boundary and persists an in-app record, then flips
//! the payslip's monotonic `sent` state. Duplicate sends on retry are
//! acceptable; the `sent` flag never reverts.

use tracing::{info, warn};

use crate::error::{PayrollError, PayrollResult};
use crate::model::NewNotification;
use crate::store::PayrollStore;

/// One employee-facing payslip message.
#[derive(Debug, Clone)]
pub struct PayslipNotice {
    pub employee_id: u64,
    pub payslip_id: u64,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub document_path: String,
}

/// Outbound mail boundary. Template content and transport are external
/// collaborators; implementations only need to accept the notice.
#[allow(async_fn_in_trait)]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notice: &PayslipNotice) -> PayrollResult<()>;
}

/// Production stand-in for the mail transport: logs the outbound message.
#[derive(Clone, Default)]
pub struct LogSender;

impl NotificationSender for LogSender {
    async fn send(&self, notice: &PayslipNotice) -> PayrollResult<()> {
        info!(
            employee_id = notice.employee_id,
            payslip_id = notice.payslip_id,
            email = %notice.email,
            subject = %notice.subject,
            "payslip mail dispatched"
        );
        Ok(())
    }
}

/// Sends the payslip to its employee and marks it sent.
pub async fn notify<S: PayrollStore, N: NotificationSender>(
    store: &S,
    sender: &N,
    payslip_id: u64,
) -> PayrollResult<()> {
    let slip = store
        .payslip(payslip_id)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "payslip",
            id: payslip_id,
        })?;

    let Some(document_path) = slip.document_path.clone() else {
        warn!(payslip_id, "notify attempted before render");
        return Err(PayrollError::PreconditionFailed {
            payslip_id,
            message: "document not rendered yet".to_string(),
        });
    };

    let run = store.run(slip.run_id).await?.ok_or(PayrollError::NotFound {
        entity: "payroll run",
        id: slip.run_id,
    })?;
    let employee = store
        .employee_snapshot(slip.employee_id)
        .await?
        .ok_or(PayrollError::NotFound {
            entity: "employee",
            id: slip.employee_id,
        })?;

    let subject = format!("Your payslip for {}", run.period_id);
    let body = format!(
        "Hello {}, your payslip for {} is ready. Net pay: {}. Document: {}",
        employee.full_name(),
        run.period_id,
        slip.net_pay,
        document_path
    );

    let notice = PayslipNotice {
        employee_id: employee.id,
        payslip_id: slip.id,
        email: employee.email.clone(),
        subject: subject.clone(),
        body: body.clone(),
        document_path,
    };
    sender.send(&notice).await?;

    store
        .record_notification(&NewNotification {
            employee_id: employee.id,
            payslip_id: slip.id,
            subject,
            body,
        })
        .await?;
    store.mark_sent(slip.id).await?;

    info!(payslip_id, employee_id = employee.id, "payslip notification recorded");
    Ok(())
}
