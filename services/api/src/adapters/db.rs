//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the store ports from the `core` crate. It handles all interactions with
//! the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use study_group_core::domain::{
    NewTask, ProgressRecord, Task, TaskOrder, TaskSortKey, TaskStatus, User, UserCredentials,
};
use study_group_core::ports::{
    AccountStore, PortError, PortResult, ProgressStore, TaskStore,
};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the task, progress and account ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps `sqlx` failures onto the port error taxonomy.
fn port_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn to_db_int(value: u64, column: &str) -> PortResult<i64> {
    i64::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("{} value {} is out of range", column, value)))
}

fn from_db_int<T: TryFrom<i64>>(value: i64, column: &str) -> PortResult<T> {
    T::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("Stored {} value {} is invalid", column, value)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    duration_minutes: i32,
    status: String,
    created_at: DateTime<Utc>,
}
impl TaskRecord {
    fn to_domain(self) -> PortResult<Task> {
        let status = self
            .status
            .parse::<TaskStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Task {
            id: self.id,
            owner: self.user_id,
            title: self.title,
            duration_minutes: from_db_int(i64::from(self.duration_minutes), "duration_minutes")?,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProgressRow {
    user_id: Uuid,
    xp: i64,
    level: i64,
    total_study_minutes: i64,
    streak: i32,
    badges: Vec<String>,
    last_active: Option<DateTime<Utc>>,
}
impl ProgressRow {
    fn to_domain(self) -> PortResult<ProgressRecord> {
        Ok(ProgressRecord {
            user_id: self.user_id,
            xp: from_db_int(self.xp, "xp")?,
            level: from_db_int(self.level, "level")?,
            total_study_minutes: from_db_int(self.total_study_minutes, "total_study_minutes")?,
            streak: from_db_int(i64::from(self.streak), "streak")?,
            badges: self.badges.into_iter().collect(),
            last_active: self.last_active,
        })
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    name: Option<String>,
    hashed_password: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, duration_minutes, status, created_at";

fn order_by_clause(order: TaskOrder) -> &'static str {
    match (order.key, order.ascending) {
        (TaskSortKey::CreatedAt, true) => "created_at ASC",
        (TaskSortKey::CreatedAt, false) => "created_at DESC",
        (TaskSortKey::Title, true) => "title ASC",
        (TaskSortKey::Title, false) => "title DESC",
        (TaskSortKey::Duration, true) => "duration_minutes ASC",
        (TaskSortKey::Duration, false) => "duration_minutes DESC",
    }
}

//=========================================================================================
// `TaskStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TaskStore for DbAdapter {
    async fn insert_task(&self, task: NewTask) -> PortResult<Task> {
        let duration = i32::try_from(task.duration_minutes).map_err(|_| {
            PortError::Unexpected(format!("Duration {} is out of range", task.duration_minutes))
        })?;
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            "INSERT INTO tasks (id, user_id, title, duration_minutes, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(task.owner)
        .bind(&task.title)
        .bind(duration)
        .bind(TaskStatus::Pending.as_str())
        .bind(task.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        record.to_domain()
    }

    async fn find_task(&self, task_id: Uuid) -> PortResult<Option<Task>> {
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE id = $1",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        record.map(TaskRecord::to_domain).transpose()
    }

    async fn update_task_status(&self, task_id: Uuid, status: TaskStatus) -> PortResult<()> {
        let result = sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", task_id)));
        }
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", task_id)));
        }
        Ok(())
    }

    async fn list_tasks(&self, owner: Uuid, order: TaskOrder) -> PortResult<Vec<Task>> {
        let records = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY {}",
            TASK_COLUMNS,
            order_by_clause(order)
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;

        records.into_iter().map(TaskRecord::to_domain).collect()
    }
}

//=========================================================================================
// `ProgressStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProgressStore for DbAdapter {
    async fn find_progress(&self, user_id: Uuid) -> PortResult<Option<ProgressRecord>> {
        let row = sqlx::query_as::<_, ProgressRow>(
            "SELECT user_id, xp, level, total_study_minutes, streak, badges, last_active \
             FROM user_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        row.map(ProgressRow::to_domain).transpose()
    }

    async fn commit_completion(&self, task_id: Uuid, record: &ProgressRecord) -> PortResult<()> {
        let xp = to_db_int(record.xp, "xp")?;
        let level = to_db_int(record.level, "level")?;
        let minutes = to_db_int(record.total_study_minutes, "total_study_minutes")?;
        let streak = i32::try_from(record.streak)
            .map_err(|_| PortError::Unexpected(format!("streak {} is out of range", record.streak)))?;
        let badges: Vec<String> = record.badges.iter().cloned().collect();

        // Dropping `tx` on any early return rolls both writes back.
        let mut tx = self.pool.begin().await.map_err(port_error)?;

        let updated = sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2")
            .bind(TaskStatus::Completed.as_str())
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(port_error)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", task_id)));
        }

        sqlx::query(
            "INSERT INTO user_progress \
                 (user_id, xp, level, total_study_minutes, streak, badges, last_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 xp = EXCLUDED.xp, \
                 level = EXCLUDED.level, \
                 total_study_minutes = EXCLUDED.total_study_minutes, \
                 streak = EXCLUDED.streak, \
                 badges = EXCLUDED.badges, \
                 last_active = EXCLUDED.last_active",
        )
        .bind(record.user_id)
        .bind(xp)
        .bind(level)
        .bind(minutes)
        .bind(streak)
        .bind(badges)
        .bind(record.last_active)
        .execute(&mut *tx)
        .await
        .map_err(port_error)?;

        tx.commit().await.map_err(port_error)
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, name, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, name, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, name, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => port_error(e),
        })?;
        Ok(record.to_credentials())
    }

    async fn find_display_name(&self, user_id: Uuid) -> PortResult<Option<String>> {
        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT name FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(port_error)?;
        Ok(name.flatten())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(())
    }
}
