//! crates/study_group_core/src/memory.rs
//!
//! An in-process implementation of every store port. Used when no database
//! is configured and as the backing store for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    AuthSession, NewTask, ProgressRecord, Task, TaskOrder, TaskStatus, User, UserCredentials,
};
use crate::ports::{AccountStore, PortError, PortResult, ProgressStore, TaskStore};

#[derive(Default)]
struct Tables {
    tasks: HashMap<Uuid, Task>,
    progress: HashMap<Uuid, ProgressRecord>,
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<String, AuthSession>,
}

struct StoredUser {
    credentials: UserCredentials,
    name: Option<String>,
}

/// All tables behind one lock, so multi-table writes are atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn insert_task(&self, task: NewTask) -> PortResult<Task> {
        let task = task.into_task(Uuid::new_v4());
        self.tables.lock().await.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, task_id: Uuid) -> PortResult<Option<Task>> {
        Ok(self.tables.lock().await.tasks.get(&task_id).cloned())
    }

    async fn update_task_status(&self, task_id: Uuid, status: TaskStatus) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let task = tables
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))?;
        task.status = status;
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<()> {
        self.tables
            .lock()
            .await
            .tasks
            .remove(&task_id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))
    }

    async fn list_tasks(&self, owner: Uuid, order: TaskOrder) -> PortResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tables
            .lock()
            .await
            .tasks
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        order.sort(&mut tasks);
        Ok(tasks)
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn find_progress(&self, user_id: Uuid) -> PortResult<Option<ProgressRecord>> {
        Ok(self.tables.lock().await.progress.get(&user_id).cloned())
    }

    async fn commit_completion(&self, task_id: Uuid, record: &ProgressRecord) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let task = tables
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))?;
        task.status = TaskStatus::Completed;
        tables.progress.insert(record.user_id, record.clone());
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.credentials.email == email) {
            return Err(PortError::Conflict(format!("Email {} already registered", email)));
        }
        let user_id = Uuid::new_v4();
        tables.users.insert(
            user_id,
            StoredUser {
                credentials: UserCredentials {
                    user_id,
                    email: email.to_string(),
                    hashed_password: hashed_password.to_string(),
                },
                name: name.map(str::to_string),
            },
        );
        Ok(User {
            user_id,
            email: email.to_string(),
            name: name.map(str::to_string),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.credentials.email == email)
            .map(|u| u.credentials.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn find_display_name(&self, user_id: Uuid) -> PortResult<Option<String>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .get(&user_id)
            .and_then(|u| u.name.clone()))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables.lock().await.sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let mut tables = self.tables.lock().await;
        match tables.sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            Some(_) => {
                tables.sessions.remove(session_id);
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().await.sessions.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_task(owner: Uuid, title: &str) -> NewTask {
        NewTask {
            owner,
            title: title.to_string(),
            duration_minutes: 25,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn list_tasks_only_returns_the_owners_tasks() {
        let store = InMemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.insert_task(new_task(alice, "read ch. 3")).await.unwrap();
        store.insert_task(new_task(bob, "flashcards")).await.unwrap();

        let tasks = store.list_tasks(alice, TaskOrder::default()).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "read ch. 3");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn commit_completion_writes_task_and_progress_together() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let task = store.insert_task(new_task(owner, "essay")).await.unwrap();
        let record = ProgressRecord::first_completion(owner, 20, 25, Utc::now());

        store.commit_completion(task.id, &record).await.unwrap();

        let stored = store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(store.find_progress(owner).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn commit_completion_for_missing_task_writes_nothing() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let record = ProgressRecord::first_completion(owner, 20, 25, Utc::now());

        let result = store.commit_completion(Uuid::new_v4(), &record).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
        assert_eq!(store.find_progress(owner).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = InMemoryStore::new();
        store.create_user("a@b.c", Some("A"), "hash").await.unwrap();
        let again = store.create_user("a@b.c", None, "hash").await;
        assert!(matches!(again, Err(PortError::Conflict(_))));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        store
            .create_auth_session("live", user, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        store
            .create_auth_session("stale", user, Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.validate_auth_session("live").await.unwrap(), user);
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));

        store.delete_auth_session("live").await.unwrap();
        assert!(store.validate_auth_session("live").await.is_err());
    }
}
