//! crates/study_group_core/src/domain.rs
//!
//! Defines the pure, core data structures for the study group application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 100;

//=========================================================================================
// Tasks
//=========================================================================================

/// Where a to-do task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown task status: {0}")]
pub struct UnknownTaskStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownTaskStatus(other.to_string())),
        }
    }
}

/// A timed to-do task owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub duration_minutes: u32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// The payload for inserting a new task. Tasks always start out `Pending`.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner: Uuid,
    pub title: String,
    pub duration_minutes: u32,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn into_task(self, id: Uuid) -> Task {
        Task {
            id,
            owner: self.owner,
            title: self.title,
            duration_minutes: self.duration_minutes,
            status: TaskStatus::Pending,
            created_at: self.created_at,
        }
    }
}

/// Field a task listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortKey {
    #[default]
    CreatedAt,
    Title,
    Duration,
}

/// Caller-chosen ordering for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrder {
    pub key: TaskSortKey,
    pub ascending: bool,
}

impl Default for TaskOrder {
    /// Newest tasks first, as the to-do list shows them.
    fn default() -> Self {
        Self {
            key: TaskSortKey::CreatedAt,
            ascending: false,
        }
    }
}

impl TaskOrder {
    /// Sorts `tasks` in place. Ties keep their relative order.
    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| {
            let ordering = match self.key {
                TaskSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                TaskSortKey::Title => a.title.cmp(&b.title),
                TaskSortKey::Duration => a.duration_minutes.cmp(&b.duration_minutes),
            };
            if self.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }
}

//=========================================================================================
// Progress & Gamification
//=========================================================================================

/// Level derived from an XP total: one level per 100 XP, starting at 1.
pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// A user's gamification state. One record per user, upserted on every completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub xp: u64,
    pub level: u64,
    pub total_study_minutes: u64,
    pub streak: u32,
    pub badges: BTreeSet<String>,
    /// `None` only for the default record of a user who never completed a task.
    pub last_active: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// The record reported for a user with nothing stored yet.
    pub fn default_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            xp: 0,
            level: 1,
            total_study_minutes: 0,
            streak: 0,
            badges: BTreeSet::new(),
            last_active: None,
        }
    }

    /// The record created by a user's first-ever completion.
    pub fn first_completion(
        user_id: Uuid,
        xp_earned: u64,
        minutes: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            xp: xp_earned,
            level: level_for_xp(xp_earned),
            total_study_minutes: u64::from(minutes),
            streak: 1,
            badges: BTreeSet::new(),
            last_active: Some(at),
        }
    }

    /// Folds one more completion into an existing record.
    ///
    /// Streak and badges are carried over untouched.
    pub fn with_completion(mut self, xp_earned: u64, minutes: u32, at: DateTime<Utc>) -> Self {
        self.xp = self.xp.saturating_add(xp_earned);
        self.level = level_for_xp(self.xp);
        self.total_study_minutes = self.total_study_minutes.saturating_add(u64::from(minutes));
        self.last_active = Some(at);
        self
    }

    /// XP collected towards the next level, for progress bars.
    pub fn xp_into_level(&self) -> u64 {
        self.xp % XP_PER_LEVEL
    }
}

/// Named achievements a user can hold. Declared for display, never granted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    FirstTask,
    FiveTasks,
    HourGlass,
    WeekStreak,
}

impl Badge {
    pub const ALL: [Badge; 4] = [
        Badge::FirstTask,
        Badge::FiveTasks,
        Badge::HourGlass,
        Badge::WeekStreak,
    ];

    /// The identifier stored in `ProgressRecord::badges`.
    pub fn id(self) -> &'static str {
        match self {
            Self::FirstTask => "FIRST_TASK",
            Self::FiveTasks => "FIVE_TASKS",
            Self::HourGlass => "HOUR_GLASS",
            Self::WeekStreak => "WEEK_STREAK",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FirstTask => "Starter",
            Self::FiveTasks => "Tasker",
            Self::HourGlass => "Hour Master",
            Self::WeekStreak => "Consistent",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::FirstTask => "🎯",
            Self::FiveTasks => "📚",
            Self::HourGlass => "⏳",
            Self::WeekStreak => "🔥",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|badge| badge.id() == id)
    }
}

/// Display name plus progress summary, as shown on the profile screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullProfile {
    pub name: String,
    pub xp: u64,
    pub level: u64,
    pub badges: BTreeSet<String>,
    pub streak: u32,
    pub study_minutes: u64,
}

impl FullProfile {
    pub const ANONYMOUS: &'static str = "Anonymous";

    pub fn new(name: Option<String>, progress: ProgressRecord) -> Self {
        Self {
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| Self::ANONYMOUS.to_string()),
            xp: progress.xp,
            level: progress.level,
            badges: progress.badges,
            streak: progress.streak,
            study_minutes: progress.total_study_minutes,
        }
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
