pub mod adjustment;
pub mod employee;
pub mod notification;
pub mod payslip;
pub mod run;

pub use adjustment::Adjustment;
pub use employee::EmployeeSnapshot;
pub use notification::{NewNotification, Notification};
pub use payslip::{Payslip, PayslipDraft, PayslipStatus};
pub use run::{NewRun, PayrollRun, RunStatus, RunTotals};
