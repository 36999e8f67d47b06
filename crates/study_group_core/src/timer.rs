//! crates/study_group_core/src/timer.rs
//!
//! The countdown a user runs while working on a task. One countdown per user:
//! starting another task replaces the running one.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::Task;

/// How long before the end of a task the "almost done" reminder fires.
pub const REMINDER_LEAD_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Idle,
    Running { task_id: Uuid, remaining_secs: u64 },
}

/// What a single one-second tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Idle,
    Tick { task_id: Uuid, remaining_secs: u64 },
    /// The countdown hit zero; the task should now be completed.
    Elapsed { task_id: Uuid },
}

#[derive(Debug, Default)]
pub struct TaskTimer {
    state: TimerState,
}

impl TaskTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn active_task(&self) -> Option<Uuid> {
        match self.state {
            TimerState::Running { task_id, .. } => Some(task_id),
            TimerState::Idle => None,
        }
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        match self.state {
            TimerState::Running { remaining_secs, .. } => Some(remaining_secs),
            TimerState::Idle => None,
        }
    }

    /// Starts counting down `task`, returning the task that was replaced.
    pub fn start(&mut self, task: &Task) -> Option<Uuid> {
        let replaced = self.active_task();
        self.state = TimerState::Running {
            task_id: task.id,
            remaining_secs: u64::from(task.duration_minutes) * 60,
        };
        replaced
    }

    pub fn tick(&mut self) -> TimerEvent {
        match self.state {
            TimerState::Idle => TimerEvent::Idle,
            TimerState::Running {
                task_id,
                remaining_secs,
            } => {
                let remaining_secs = remaining_secs.saturating_sub(1);
                if remaining_secs == 0 {
                    self.state = TimerState::Idle;
                    TimerEvent::Elapsed { task_id }
                } else {
                    self.state = TimerState::Running {
                        task_id,
                        remaining_secs,
                    };
                    TimerEvent::Tick {
                        task_id,
                        remaining_secs,
                    }
                }
            }
        }
    }

    /// Cancels the countdown, returning the task it was running for.
    pub fn stop(&mut self) -> Option<Uuid> {
        let stopped = self.active_task();
        self.state = TimerState::Idle;
        stopped
    }
}

/// Renders seconds as `m:ss`.
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// When the "minutes remaining" reminder for a task started at `started_at` is due.
///
/// `None` for tasks too short to have a lead time.
pub fn reminder_at(started_at: DateTime<Utc>, duration_minutes: u32) -> Option<DateTime<Utc>> {
    (duration_minutes > REMINDER_LEAD_MINUTES).then(|| {
        started_at + Duration::minutes(i64::from(duration_minutes - REMINDER_LEAD_MINUTES))
    })
}
