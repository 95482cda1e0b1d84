//! Error types for the payroll pipeline.
//!
//! Every fallible operation in the crate returns [`PayrollError`], which maps
//! onto an HTTP status and a `{code, message}` JSON body at the API boundary.

use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

/// The error taxonomy of the payroll pipeline.
#[derive(Debug, Error)]
pub enum PayrollError {
    /// Bad input shape or range, rejected before any mutation.
    #[error("invalid value for '{field}': {message}")]
    Validation {
        /// The offending input field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The run is not in a status eligible for the requested transition.
    #[error("payroll run {run_id} is '{status}': {message}")]
    Conflict {
        /// The run whose status blocked the transition.
        run_id: u64,
        /// The status the run was observed in.
        status: String,
        /// What was attempted.
        message: String,
    },

    /// A referenced run, payslip, or employee does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The kind of record that was missing.
        entity: &'static str,
        /// Its identifier.
        id: u64,
    },

    /// The deduction engine was given out-of-range input.
    #[error("computation error: {message}")]
    Computation {
        /// A description of the rejected input.
        message: String,
    },

    /// A database or document-store write failed.
    #[error("storage failure: {message}")]
    Persistence {
        /// The underlying failure.
        message: String,
    },

    /// A stage was invoked before its predecessor's state was visible.
    #[error("precondition failed for payslip {payslip_id}: {message}")]
    PreconditionFailed {
        /// The payslip the stage was invoked for.
        payslip_id: u64,
        /// The unmet precondition.
        message: String,
    },

    /// The statutory rules file could not be loaded or was inconsistent.
    #[error("invalid statutory rules ({path}): {message}")]
    Config {
        /// Where the rules came from.
        path: String,
        /// Why they were rejected.
        message: String,
    },
}

impl PayrollError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }

    /// Stable code for programmatic handling in API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Computation { .. } => "COMPUTATION_ERROR",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// Whether a retry of the same stage can plausibly succeed.
    ///
    /// Only storage failures are treated as transient; everything else needs
    /// an input or state change first.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

impl From<sqlx::Error> for PayrollError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence {
            message: e.to_string(),
        }
    }
}

impl actix_web::ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Computation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            Self::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        }))
    }
}

/// A type alias for Results that return [`PayrollError`].
pub type PayrollResult<T> = Result<T, PayrollError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn conflict_displays_run_and_status() {
        let error = PayrollError::Conflict {
            run_id: 7,
            status: "processing".to_string(),
            message: "cannot start calculation".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "payroll run 7 is 'processing': cannot start calculation"
        );
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_displays_entity_and_id() {
        let error = PayrollError::NotFound {
            entity: "payslip",
            id: 42,
        };
        assert_eq!(error.to_string(), "payslip 42 not found");
        assert_eq!(error.code(), "NOT_FOUND");
    }

    #[test]
    fn precondition_failed_maps_to_412() {
        let error = PayrollError::PreconditionFailed {
            payslip_id: 3,
            message: "document not rendered".to_string(),
        };
        assert_eq!(error.status_code(), StatusCode::PRECONDITION_FAILED);
    }

    #[test]
    fn only_persistence_is_transient() {
        assert!(
            PayrollError::Persistence {
                message: "lost connection".to_string()
            }
            .is_transient()
        );
        assert!(!PayrollError::validation("period", "bad format").is_transient());
        assert!(!PayrollError::computation("negative hours").is_transient());
    }

    #[test]
    fn sqlx_errors_become_persistence() {
        let error: PayrollError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(error.code(), "PERSISTENCE_ERROR");
    }
}
