//! crates/study_group_core/src/service.rs
//!
//! `StudyService` is the one object the outer layers talk to. It is built
//! once at startup from the store ports and handed to whoever needs it.
//! Unlike the tracker, it enforces the caller contract: a user may only touch
//! their own tasks, and a task is completed at most once.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{FullProfile, NewTask, ProgressRecord, Task, TaskOrder, TaskStatus};
use crate::error::{StudyError, StudyResult};
use crate::locks::KeyedLocks;
use crate::ports::{AccountStore, ProgressStore, TaskStore};
use crate::progress::{Completion, ProgressTracker};

pub struct StudyService {
    tasks: Arc<dyn TaskStore>,
    accounts: Arc<dyn AccountStore>,
    tracker: ProgressTracker,
    /// Held from the status check until the status write, per task.
    task_locks: KeyedLocks,
}

impl StudyService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        progress: Arc<dyn ProgressStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            tasks,
            accounts,
            tracker: ProgressTracker::new(progress),
            task_locks: KeyedLocks::new(),
        }
    }

    // --- Tasks ---

    pub async fn add_task(
        &self,
        owner: Uuid,
        title: &str,
        duration_minutes: u32,
    ) -> StudyResult<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StudyError::Validation("Task title must not be empty".to_string()));
        }
        if duration_minutes == 0 {
            return Err(StudyError::Validation(
                "Task duration must be a positive number of minutes".to_string(),
            ));
        }

        let task = self
            .tasks
            .insert_task(NewTask {
                owner,
                title: title.to_string(),
                duration_minutes,
                created_at: Utc::now(),
            })
            .await?;
        info!(user_id = %owner, task_id = %task.id, duration_minutes, "Task added");
        Ok(task)
    }

    pub async fn list_tasks(&self, owner: Uuid, order: TaskOrder) -> StudyResult<Vec<Task>> {
        Ok(self.tasks.list_tasks(owner, order).await?)
    }

    /// Moves a task to `in_progress`. Returns the updated task.
    pub async fn start_task(&self, owner: Uuid, task_id: Uuid) -> StudyResult<Task> {
        let _guard = self.task_locks.lock(task_id).await;
        let mut task = self.owned_open_task(owner, task_id).await?;
        self.tasks
            .update_task_status(task_id, TaskStatus::InProgress)
            .await?;
        task.status = TaskStatus::InProgress;
        info!(user_id = %owner, %task_id, "Task started");
        Ok(task)
    }

    /// Completes one of the owner's tasks and awards XP for its duration.
    pub async fn complete_task_with_progress(
        &self,
        owner: Uuid,
        task_id: Uuid,
    ) -> StudyResult<Completion> {
        let _guard = self.task_locks.lock(task_id).await;
        let task = self.owned_open_task(owner, task_id).await?;
        self.tracker
            .record_completion(task.id, owner, task.duration_minutes)
            .await
    }

    /// Deletes a task in any state.
    pub async fn delete_task(&self, owner: Uuid, task_id: Uuid) -> StudyResult<()> {
        self.owned_task(owner, task_id).await?;
        self.tasks.delete_task(task_id).await?;
        info!(user_id = %owner, %task_id, "Task deleted");
        Ok(())
    }

    /// Looks up one of the owner's tasks.
    pub async fn get_task(&self, owner: Uuid, task_id: Uuid) -> StudyResult<Task> {
        self.owned_task(owner, task_id).await
    }

    // --- Progress ---

    pub async fn get_progress(&self, user_id: Uuid) -> StudyResult<ProgressRecord> {
        self.tracker.get_progress(user_id).await
    }

    pub async fn get_full_profile(&self, user_id: Uuid) -> StudyResult<FullProfile> {
        let name = self.accounts.find_display_name(user_id).await?;
        let progress = self.tracker.get_progress(user_id).await?;
        Ok(FullProfile::new(name, progress))
    }

    // --- Helpers ---

    /// Tasks owned by someone else are reported as missing.
    async fn owned_task(&self, owner: Uuid, task_id: Uuid) -> StudyResult<Task> {
        match self.tasks.find_task(task_id).await? {
            Some(task) if task.owner == owner => Ok(task),
            Some(_) => {
                warn!(user_id = %owner, %task_id, "Access to another user's task refused");
                Err(StudyError::TaskNotFound(task_id))
            }
            None => Err(StudyError::TaskNotFound(task_id)),
        }
    }

    async fn owned_open_task(&self, owner: Uuid, task_id: Uuid) -> StudyResult<Task> {
        let task = self.owned_task(owner, task_id).await?;
        if task.status == TaskStatus::Completed {
            return Err(StudyError::AlreadyCompleted(task_id));
        }
        Ok(task)
    }
}
