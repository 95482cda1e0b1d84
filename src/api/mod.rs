pub mod payroll;

use std::sync::Arc;

use crate::docstore::FsDocumentStore;
use crate::pipeline::{LogSender, Orchestrator};
use crate::store::mysql::MySqlStore;

/// The orchestrator as wired in production.
pub type AppOrchestrator = Orchestrator<MySqlStore, FsDocumentStore, LogSender>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: AppOrchestrator,
    pub docs: Arc<FsDocumentStore>,
}
