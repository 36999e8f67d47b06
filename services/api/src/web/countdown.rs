//! services/api/src/web/countdown.rs
//!
//! Server-side task countdowns. Each user has at most one running countdown;
//! a background worker ticks it once per second and completes the task
//! through the service when it reaches zero.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use study_group_core::domain::Task;
use study_group_core::error::StudyError;
use study_group_core::service::StudyService;
use study_group_core::timer::{TaskTimer, TimerEvent};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const TICK: Duration = Duration::from_secs(1);

/// A snapshot of a user's running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub task_id: Uuid,
    pub remaining_secs: u64,
}

struct ActiveCountdown {
    timer: TaskTimer,
    /// Cancels the worker driving `timer`.
    token: CancellationToken,
}

#[derive(Clone, Default)]
pub struct CountdownRegistry {
    active: Arc<Mutex<HashMap<Uuid, ActiveCountdown>>>,
}

impl CountdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting down `task` for `owner`, replacing any running countdown.
    pub fn start(&self, service: Arc<StudyService>, owner: Uuid, task: &Task) {
        let token = CancellationToken::new();
        {
            let mut active = self.lock();
            let mut timer = match active.remove(&owner) {
                Some(previous) => {
                    previous.token.cancel();
                    previous.timer
                }
                None => TaskTimer::new(),
            };
            if let Some(replaced) = timer.start(task) {
                info!(user_id = %owner, task_id = %replaced, "Countdown replaced by a new task");
            }
            active.insert(
                owner,
                ActiveCountdown {
                    timer,
                    token: token.clone(),
                },
            );
        }

        tokio::spawn(countdown_process(self.clone(), service, owner, token));
    }

    /// Cancels the owner's countdown if it is running for `task_id`.
    pub fn stop(&self, owner: Uuid, task_id: Uuid) -> bool {
        let mut active = self.lock();
        let running = active
            .get(&owner)
            .is_some_and(|entry| entry.timer.active_task() == Some(task_id));
        if running {
            if let Some(entry) = active.remove(&owner) {
                entry.token.cancel();
            }
            debug!(user_id = %owner, %task_id, "Countdown stopped");
        }
        running
    }

    pub fn current(&self, owner: Uuid) -> Option<Countdown> {
        let active = self.lock();
        let timer = &active.get(&owner)?.timer;
        Some(Countdown {
            task_id: timer.active_task()?,
            remaining_secs: timer.remaining_secs()?,
        })
    }

    /// Advances the owner's countdown by one second.
    ///
    /// `None` once `token` has been cancelled, so a replaced worker never
    /// ticks its successor's timer.
    fn tick(&self, owner: Uuid, token: &CancellationToken) -> Option<TimerEvent> {
        let mut active = self.lock();
        if token.is_cancelled() {
            return None;
        }
        let event = active.get_mut(&owner)?.timer.tick();
        if !matches!(event, TimerEvent::Tick { .. }) {
            active.remove(&owner);
        }
        Some(event)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, ActiveCountdown>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The background worker behind one countdown.
async fn countdown_process(
    registry: CountdownRegistry,
    service: Arc<StudyService>,
    owner: Uuid,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match registry.tick(owner, &token) {
            Some(TimerEvent::Tick { .. }) => continue,
            Some(TimerEvent::Elapsed { task_id }) => {
                info!(user_id = %owner, %task_id, "Countdown elapsed");
                match service.complete_task_with_progress(owner, task_id).await {
                    Ok(completion) => info!(
                        user_id = %owner,
                        %task_id,
                        xp_earned = completion.xp_earned,
                        "Task completed by its countdown"
                    ),
                    Err(e @ (StudyError::AlreadyCompleted(_) | StudyError::TaskNotFound(_))) => {
                        warn!(user_id = %owner, %task_id, "Countdown finished for a closed task: {}", e)
                    }
                    Err(e) => error!(
                        user_id = %owner,
                        %task_id,
                        "Failed to complete task after countdown: {:?}",
                        e
                    ),
                }
                return;
            }
            Some(TimerEvent::Idle) | None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_group_core::domain::TaskStatus;
    use study_group_core::memory::InMemoryStore;

    fn service() -> Arc<StudyService> {
        let store = Arc::new(InMemoryStore::new());
        Arc::new(StudyService::new(store.clone(), store.clone(), store))
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_countdown_completes_the_task() {
        let service = service();
        let registry = CountdownRegistry::new();
        let owner = Uuid::new_v4();
        let task = service.add_task(owner, "flashcards", 1).await.unwrap();
        let task = service.start_task(owner, task.id).await.unwrap();

        registry.start(service.clone(), owner, &task);
        tokio::time::sleep(Duration::from_secs(30)).await;
        let halfway = registry.current(owner).unwrap();
        assert_eq!(halfway.task_id, task.id);
        assert!((29..=31).contains(&halfway.remaining_secs));

        tokio::time::sleep(Duration::from_secs(31)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(registry.current(owner), None);
        let stored = service.get_task(owner, task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(service.get_progress(owner).await.unwrap().xp, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_countdown_awards_nothing() {
        let service = service();
        let registry = CountdownRegistry::new();
        let owner = Uuid::new_v4();
        let task = service.add_task(owner, "reading", 1).await.unwrap();

        registry.start(service.clone(), owner, &task);
        assert!(!registry.stop(owner, Uuid::new_v4()));
        assert!(registry.stop(owner, task.id));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(service.get_progress(owner).await.unwrap().xp, 0);
        let stored = service.get_task(owner, task.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_a_second_task_replaces_the_first_countdown() {
        let service = service();
        let registry = CountdownRegistry::new();
        let owner = Uuid::new_v4();
        let first = service.add_task(owner, "first", 1).await.unwrap();
        let second = service.add_task(owner, "second", 3).await.unwrap();

        registry.start(service.clone(), owner, &first);
        tokio::time::sleep(Duration::from_secs(10)).await;
        registry.start(service.clone(), owner, &second);

        tokio::time::sleep(Duration::from_secs(90)).await;
        let current = registry.current(owner).unwrap();
        assert_eq!(current.task_id, second.id);
        assert_eq!(service.get_progress(owner).await.unwrap().xp, 0);
        let first = service.get_task(owner, first.id).await.unwrap();
        assert_eq!(first.status, TaskStatus::Pending);
    }
}
