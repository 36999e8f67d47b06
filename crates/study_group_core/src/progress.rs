//! crates/study_group_core/src/progress.rs
//!
//! The progress tracker: turns task completions into XP, levels and study
//! minutes, and persists them through the `ProgressStore` port.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ProgressRecord;
use crate::error::{StudyError, StudyResult};
use crate::locks::KeyedLocks;
use crate::ports::ProgressStore;

/// XP awarded for finishing a task of `duration_minutes`.
///
/// 80% of the minutes, rounded down, and never less than 1.
pub fn xp_for_duration(duration_minutes: u32) -> u64 {
    (u64::from(duration_minutes) * 4 / 5).max(1)
}

/// Result of completing a task: the reward and the record it was committed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub xp_earned: u64,
    pub progress: ProgressRecord,
}

/// Owns the read-modify-write of each user's progress record.
///
/// Completions for the same user are serialized in-process; the task-status
/// write and the progress upsert go to the store as one atomic commit.
/// Ownership and duplicate completions are the caller's business.
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    user_locks: KeyedLocks,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            user_locks: KeyedLocks::new(),
        }
    }

    /// Awards XP for a finished task and returns the amount awarded.
    pub async fn complete_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        duration_minutes: u32,
    ) -> StudyResult<u64> {
        let completion = self
            .record_completion(task_id, user_id, duration_minutes)
            .await?;
        Ok(completion.xp_earned)
    }

    /// Like `complete_task`, but also hands back the record exactly as committed.
    pub async fn record_completion(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        duration_minutes: u32,
    ) -> StudyResult<Completion> {
        if duration_minutes == 0 {
            return Err(StudyError::Validation(
                "Task duration must be a positive number of minutes".to_string(),
            ));
        }
        let xp_earned = xp_for_duration(duration_minutes);

        let record = {
            let _guard = self.user_locks.lock(user_id).await;
            self.apply_completion(task_id, user_id, duration_minutes, xp_earned)
                .await?
        };

        info!(
            %user_id,
            %task_id,
            xp_earned,
            xp = record.xp,
            level = record.level,
            "Task completed"
        );
        Ok(Completion {
            xp_earned,
            progress: record,
        })
    }

    /// The stored record, or the default one when the user has none yet.
    pub async fn get_progress(&self, user_id: Uuid) -> StudyResult<ProgressRecord> {
        let record = self.store.find_progress(user_id).await?;
        Ok(record.unwrap_or_else(|| ProgressRecord::default_for(user_id)))
    }

    async fn apply_completion(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        duration_minutes: u32,
        xp_earned: u64,
    ) -> StudyResult<ProgressRecord> {
        let now = Utc::now();
        let record = match self.store.find_progress(user_id).await? {
            Some(existing) => existing.with_completion(xp_earned, duration_minutes, now),
            None => {
                debug!(%user_id, "Creating first progress record");
                ProgressRecord::first_completion(user_id, xp_earned, duration_minutes, now)
            }
        };
        self.store.commit_completion(task_id, &record).await?;
        Ok(record)
    }
}
