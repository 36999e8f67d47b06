//! crates/study_group_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, so the
//! progress logic never knows whether it talks to PostgreSQL or to memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    NewTask, ProgressRecord, Task, TaskOrder, TaskStatus, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting item: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> PortResult<Task>;

    /// `Ok(None)` when no task has this id.
    async fn find_task(&self, task_id: Uuid) -> PortResult<Option<Task>>;

    async fn update_task_status(&self, task_id: Uuid, status: TaskStatus) -> PortResult<()>;

    async fn delete_task(&self, task_id: Uuid) -> PortResult<()>;

    async fn list_tasks(&self, owner: Uuid, order: TaskOrder) -> PortResult<Vec<Task>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// `Ok(None)` when the user has never completed a task.
    async fn find_progress(&self, user_id: Uuid) -> PortResult<Option<ProgressRecord>>;

    /// Marks `task_id` completed and upserts `record` as one atomic unit:
    /// either both writes are visible afterwards or neither is.
    async fn commit_completion(&self, task_id: Uuid, record: &ProgressRecord) -> PortResult<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// `Ok(None)` both for unknown users and for users without a name.
    async fn find_display_name(&self, user_id: Uuid) -> PortResult<Option<String>>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
