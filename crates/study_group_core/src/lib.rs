pub mod domain;
pub mod error;
pub mod locks;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod service;
pub mod timer;

pub use domain::{
    AuthSession, Badge, FullProfile, NewTask, ProgressRecord, Task, TaskOrder, TaskSortKey,
    TaskStatus, User, UserCredentials,
};
pub use error::{StudyError, StudyResult};
pub use memory::InMemoryStore;
pub use ports::{AccountStore, PortError, PortResult, ProgressStore, TaskStore};
pub use progress::{xp_for_duration, Completion, ProgressTracker};
pub use service::StudyService;
pub use timer::{TaskTimer, TimerEvent, TimerState};
