//! services/api/src/web/progress.rs
//!
//! REST handlers for reading a user's gamification state.

use axum::{
    extract::State,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use study_group_core::domain::{Badge, FullProfile, ProgressRecord, XP_PER_LEVEL};
use utoipa::ToSchema;

use crate::web::middleware::CurrentUser;
use crate::web::rest::{failure, Failure};
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct BadgeResponse {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

impl BadgeResponse {
    /// Unknown ids are passed through with the id as their name.
    fn from_id(id: String) -> Self {
        match Badge::from_id(&id) {
            Some(badge) => Self {
                name: badge.name().to_string(),
                icon: Some(badge.icon().to_string()),
                id,
            },
            None => Self {
                name: id.clone(),
                icon: None,
                id,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    pub xp: u64,
    pub level: u64,
    /// XP collected towards the next level.
    pub xp_into_level: u64,
    pub xp_per_level: u64,
    pub total_study_minutes: u64,
    pub streak: u32,
    pub badges: Vec<BadgeResponse>,
    pub last_active: Option<DateTime<Utc>>,
}

impl From<ProgressRecord> for ProgressResponse {
    fn from(record: ProgressRecord) -> Self {
        Self {
            xp_into_level: record.xp_into_level(),
            xp_per_level: XP_PER_LEVEL,
            xp: record.xp,
            level: record.level,
            total_study_minutes: record.total_study_minutes,
            streak: record.streak,
            badges: record.badges.into_iter().map(BadgeResponse::from_id).collect(),
            last_active: record.last_active,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub name: String,
    pub xp: u64,
    pub level: u64,
    pub badges: Vec<String>,
    pub streak: u32,
    pub study_minutes: u64,
}

impl From<FullProfile> for ProfileResponse {
    fn from(profile: FullProfile) -> Self {
        Self {
            name: profile.name,
            xp: profile.xp,
            level: profile.level,
            badges: profile.badges.into_iter().collect(),
            streak: profile.streak,
            study_minutes: profile.study_minutes,
        }
    }
}

/// The current user's progress; defaults when nothing was earned yet.
#[utoipa::path(
    get,
    path = "/progress",
    responses(
        (status = 200, description = "Progress record", body = ProgressResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn get_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<ProgressResponse>, Failure> {
    let record = state
        .service
        .get_progress(user_id)
        .await
        .map_err(|e| failure("load progress", e))?;
    Ok(Json(record.into()))
}

/// The current user's display name and progress summary.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile summary", body = ProfileResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, Failure> {
    let profile = state
        .service
        .get_full_profile(user_id)
        .await
        .map_err(|e| failure("load profile", e))?;
    Ok(Json(profile.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn badges_are_described_from_the_catalog() {
        let mut record = ProgressRecord::first_completion(Uuid::new_v4(), 130, 160, Utc::now());
        record.badges.insert("HOUR_GLASS".to_string());
        record.badges.insert("LEGACY".to_string());

        let response = ProgressResponse::from(record);
        assert_eq!(response.level, 2);
        assert_eq!(response.xp_into_level, 30);
        assert_eq!(response.badges.len(), 2);

        let hour_glass = response.badges.iter().find(|b| b.id == "HOUR_GLASS").unwrap();
        assert_eq!(hour_glass.name, "Hour Master");
        assert!(hour_glass.icon.is_some());

        let legacy = response.badges.iter().find(|b| b.id == "LEGACY").unwrap();
        assert_eq!(legacy.name, "LEGACY");
        assert_eq!(legacy.icon, None);
    }
}
