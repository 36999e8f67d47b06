//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::countdown::CountdownRegistry;
use std::sync::Arc;
use study_group_core::memory::InMemoryStore;
use study_group_core::ports::{AccountStore, ProgressStore, TaskStore};
use study_group_core::service::StudyService;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StudyService>,
    pub accounts: Arc<dyn AccountStore>,
    pub config: Arc<Config>,
    pub countdowns: CountdownRegistry,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        tasks: Arc<dyn TaskStore>,
        progress: Arc<dyn ProgressStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            service: Arc::new(StudyService::new(tasks, progress, accounts.clone())),
            accounts,
            config,
            countdowns: CountdownRegistry::new(),
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(config: Arc<Config>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(config, store.clone(), store.clone(), store)
    }
}
