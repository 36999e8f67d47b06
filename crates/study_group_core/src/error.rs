//! crates/study_group_core/src/error.rs
//!
//! The error type returned by the progress tracker and the study service.

use uuid::Uuid;

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// Input the caller should have rejected before calling in.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The task does not exist or belongs to another user.
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Task {0} is already completed")]
    AlreadyCompleted(Uuid),

    /// A store read or write failed. Propagated unmodified, never retried.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),
}

pub type StudyResult<T> = Result<T, StudyError>;
