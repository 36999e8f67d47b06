//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification and the mapping from
//! service errors to HTTP responses shared by all REST handlers.

use axum::http::StatusCode;
use study_group_core::error::StudyError;
use study_group_core::ports::PortError;
use tracing::{error, warn};
use utoipa::OpenApi;

use crate::web::{auth, progress, tasks};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        tasks::list_tasks_handler,
        tasks::create_task_handler,
        tasks::start_task_handler,
        tasks::complete_task_handler,
        tasks::delete_task_handler,
        tasks::countdown_handler,
        progress::get_progress_handler,
        progress::get_profile_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            tasks::CreateTaskRequest,
            tasks::TaskResponse,
            tasks::StartTaskResponse,
            tasks::CompletionResponse,
            tasks::CountdownResponse,
            tasks::SortField,
            progress::ProgressResponse,
            progress::BadgeResponse,
            progress::ProfileResponse,
        )
    ),
    tags(
        (name = "Study Group API", description = "Timed to-do tasks and the XP, levels and badges earned by finishing them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

pub type Failure = (StatusCode, String);

/// Turns a service error into a response. `action` names what was attempted,
/// e.g. "complete task", and only shows up for internal failures.
pub fn failure(action: &str, e: StudyError) -> Failure {
    match &e {
        StudyError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        StudyError::TaskNotFound(_) | StudyError::Persistence(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        StudyError::AlreadyCompleted(_) | StudyError::Persistence(PortError::Conflict(_)) => {
            warn!("Could not {}: {}", action, e);
            (StatusCode::CONFLICT, e.to_string())
        }
        StudyError::Persistence(_) => {
            error!("Failed to {}: {:?}", action, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}
