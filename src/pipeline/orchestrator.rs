//! Run orchestrator: sequences the asynchronous pipeline stages.
//!
//! Calculation runs exactly once per invocation (re-running a failed run is
//! the recovery path, never an automatic retry). Render and notify are
//! retried with exponential backoff; after retries are exhausted the payslip
//! stays in its last-good status and the failure is logged under a
//! correlation id, so every unit ends in terminal success or a recorded
//! failure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::docstore::DocumentStore;
use crate::error::{PayrollError, PayrollResult};
use crate::model::{Adjustment, Payslip, PayrollRun, RunStatus};
use crate::pipeline::{calculator, notifier, renderer};
use crate::pipeline::notifier::NotificationSender;
use crate::rules::StatutoryConfig;
use crate::store::PayrollStore;

/// How many payslips are rendered/notified concurrently per run.
const STAGE_CONCURRENCY: usize = 4;

/// Bounded retry with exponential backoff for the render/notify stages.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Outcome of a document-generation dispatch, for operator visibility.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct GenerateOutcome {
    pub total: u32,
    pub rendered: u32,
    pub notified: u32,
    pub failed: u32,
}

pub struct Orchestrator<S, D, N> {
    store: Arc<S>,
    docs: Arc<D>,
    sender: Arc<N>,
    rules: Arc<StatutoryConfig>,
    retry: RetryPolicy,
}

impl<S, D, N> Clone for Orchestrator<S, D, N> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            docs: self.docs.clone(),
            sender: self.sender.clone(),
            rules: self.rules.clone(),
            retry: self.retry,
        }
    }
}

impl<S, D, N> Orchestrator<S, D, N>
where
    S: PayrollStore,
    D: DocumentStore,
    N: NotificationSender,
{
    pub fn new(
        store: Arc<S>,
        docs: Arc<D>,
        sender: Arc<N>,
        rules: Arc<StatutoryConfig>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            docs,
            sender,
            rules,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Executes the calculation stage once for the run.
    pub async fn run_calculation(
        &self,
        run_id: u64,
        employee_ids: Option<&[u64]>,
        adjustments: &HashMap<u64, Adjustment>,
    ) -> PayrollResult<PayrollRun> {
        calculator::process_payroll(
            self.store.as_ref(),
            &self.rules,
            run_id,
            employee_ids,
            adjustments,
        )
        .await
    }

    /// Renders documents (and optionally notifies) for every payslip of a
    /// completed run, fanned out with bounded concurrency.
    pub async fn generate_documents(
        &self,
        run_id: u64,
        send_email: bool,
    ) -> PayrollResult<GenerateOutcome> {
        let run = self
            .store
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

        let slips = self.store.payslips_for_run(run_id).await?;
        let correlation_id = Uuid::new_v4();
        info!(
            run_id,
            correlation_id = %correlation_id,
            payslips = slips.len(),
            send_email,
            "payslip generation dispatched"
        );

        let results: Vec<(bool, bool)> = futures::stream::iter(slips.iter())
            .map(|slip| self.process_payslip(slip, send_email, correlation_id))
            .buffer_unordered(STAGE_CONCURRENCY)
            .collect()
            .await;

        let mut outcome = GenerateOutcome {
            total: slips.len() as u32,
            ..GenerateOutcome::default()
        };
        for (rendered, notified) in results {
            if rendered {
                outcome.rendered += 1;
            } else {
                outcome.failed += 1;
            }
            if notified {
                outcome.notified += 1;
            }
        }
        info!(
            run_id,
            correlation_id = %correlation_id,
            rendered = outcome.rendered,
            notified = outcome.notified,
            failed = outcome.failed,
            "payslip generation finished"
        );
        Ok(outcome)
    }

    /// Render, then optionally notify, one payslip. Returns
    /// (rendered, notified).
    async fn process_payslip(
        &self,
        slip: &Payslip,
        send_email: bool,
        correlation_id: Uuid,
    ) -> (bool, bool) {
        let rendered = self
            .with_retry("render", slip.id, correlation_id, || {
                renderer::render_document(self.store.as_ref(), self.docs.as_ref(), slip.id)
            })
            .await
            .is_ok();

        if !rendered || !send_email {
            return (rendered, false);
        }

        let notified = self
            .with_retry("notify", slip.id, correlation_id, || {
                notifier::notify(self.store.as_ref(), self.sender.as_ref(), slip.id)
            })
            .await
            .is_ok();
        (rendered, notified)
    }

    /// Runs one stage with the retry policy. Only transient (storage)
    /// failures are retried; anything else is terminal immediately. On
    /// exhaustion the error is logged and returned, and the owning payslip
    /// keeps its last-good status.
    async fn with_retry<T, F, Fut>(
        &self,
        stage: &'static str,
        payslip_id: u64,
        correlation_id: Uuid,
        op: F,
    ) -> PayrollResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = PayrollResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        stage,
                        payslip_id,
                        correlation_id = %correlation_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "stage failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        stage,
                        payslip_id,
                        correlation_id = %correlation_id,
                        attempt,
                        error = %e,
                        "stage failed terminally"
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(2), Duration::from_millis(200));
        assert_eq!(retry.delay(3), Duration::from_millis(400));
    }
}
