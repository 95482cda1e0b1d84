use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// In-app notification record written by the dispatcher alongside the
/// outbound mail.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: u64,
    pub employee_id: u64,
    pub payslip_id: u64,
    pub subject: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

/// Input for recording a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub employee_id: u64,
    pub payslip_id: u64,
    pub subject: String,
    pub body: String,
}
