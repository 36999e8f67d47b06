//! End-to-end tests driving the axum router over the in-memory store.

use api_lib::{
    config::Config,
    web::{self, state::AppState},
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    let config = Arc::new(Config::from_lookup(|_| None).unwrap());
    web::router(Arc::new(AppState::in_memory(config))).unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let session_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, session_cookie, body)
}

async fn signup(app: &Router, email: &str, name: Option<&str>) -> String {
    let (status, cookie, _) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "email": email, "password": "correct horse", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    cookie.unwrap()
}

async fn create_task(app: &Router, cookie: &str, title: &str, minutes: u32) -> String {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/tasks",
        Some(cookie),
        Some(json!({ "title": title, "duration_minutes": minutes })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn task_completion_flow_awards_xp_once() {
    let app = app();
    let cookie = signup(&app, "riley@example.com", Some("Riley")).await;
    let task_id = create_task(&app, &cookie, "Read chapter 5", 50).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        &format!("/tasks/{}/start", task_id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["status"], "in_progress");
    assert_eq!(body["remaining_secs"], 3000);
    assert!(body["reminder_at"].is_string());

    let (status, _, body) = send(&app, Method::GET, "/timer", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_id"], task_id.as_str());

    let complete_uri = format!("/tasks/{}/complete", task_id);
    let (status, _, body) = send(&app, Method::POST, &complete_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xp_earned"], 40);
    assert_eq!(body["progress"]["xp"], 40);
    assert_eq!(body["progress"]["level"], 1);
    assert_eq!(body["progress"]["total_study_minutes"], 50);
    assert_eq!(body["progress"]["streak"], 1);

    let (status, _, _) = send(&app, Method::POST, &complete_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(&app, Method::GET, "/timer", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, body) = send(&app, Method::GET, "/profile", Some(&cookie), None).await;
    assert_eq!(body["name"], "Riley");
    assert_eq!(body["xp"], 40);
    assert_eq!(body["study_minutes"], 50);

    let (_, _, body) = send(&app, Method::GET, "/tasks", Some(&cookie), None).await;
    assert_eq!(body[0]["status"], "completed");
}

#[tokio::test]
async fn level_rises_as_xp_crosses_hundreds() {
    let app = app();
    let cookie = signup(&app, "lee@example.com", None).await;

    for _ in 0..3 {
        let task_id = create_task(&app, &cookie, "Pomodoro block", 50).await;
        let (status, _, _) = send(
            &app,
            Method::POST,
            &format!("/tasks/{}/complete", task_id),
            Some(&cookie),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, _, body) = send(&app, Method::GET, "/progress", Some(&cookie), None).await;
    assert_eq!(body["xp"], 120);
    assert_eq!(body["level"], 2);
    assert_eq!(body["xp_into_level"], 20);
    assert_eq!(body["total_study_minutes"], 150);

    let (_, _, body) = send(&app, Method::GET, "/profile", Some(&cookie), None).await;
    assert_eq!(body["name"], "Anonymous");
}

#[tokio::test]
async fn new_users_see_default_progress() {
    let app = app();
    let cookie = signup(&app, "new@example.com", Some("New")).await;

    let (status, _, body) = send(&app, Method::GET, "/progress", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["xp"], 0);
    assert_eq!(body["level"], 1);
    assert_eq!(body["streak"], 0);
    assert_eq!(body["total_study_minutes"], 0);
    assert_eq!(body["badges"], json!([]));
    assert!(body["last_active"].is_null());
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app();
    for uri in ["/tasks", "/progress", "/profile", "/timer"] {
        let (status, _, _) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
    let (status, _, _) = send(&app, Method::GET, "/tasks", Some("session=forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_tasks_are_rejected() {
    let app = app();
    let cookie = signup(&app, "val@example.com", None).await;

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(&cookie),
        Some(json!({ "title": "Nap", "duration_minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(&cookie),
        Some(json!({ "title": "  ", "duration_minutes": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, Method::GET, "/tasks?sort=colour", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tasks_are_private_to_their_owner() {
    let app = app();
    let owner = signup(&app, "owner@example.com", None).await;
    let other = signup(&app, "other@example.com", None).await;
    let task_id = create_task(&app, &owner, "Secret essay", 30).await;

    for (method, uri) in [
        (Method::POST, format!("/tasks/{}/start", task_id)),
        (Method::POST, format!("/tasks/{}/complete", task_id)),
        (Method::DELETE, format!("/tasks/{}", task_id)),
    ] {
        let (status, _, _) = send(&app, method, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let (_, _, body) = send(&app, Method::GET, "/tasks", Some(&other), None).await;
    assert_eq!(body, json!([]));

    let (status, _, _) = send(
        &app,
        Method::DELETE,
        &format!("/tasks/{}", task_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn tasks_can_be_listed_in_a_chosen_order() {
    let app = app();
    let cookie = signup(&app, "sorter@example.com", None).await;
    for (title, minutes) in [("Biology", 40), ("Algebra", 15), ("Chemistry", 25)] {
        create_task(&app, &cookie, title, minutes).await;
    }

    let (_, _, body) = send(
        &app,
        Method::GET,
        "/tasks?sort=title&ascending=true",
        Some(&cookie),
        None,
    )
    .await;
    let titles: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Algebra", "Biology", "Chemistry"]);

    let (_, _, body) = send(&app, Method::GET, "/tasks?sort=duration", Some(&cookie), None).await;
    assert_eq!(body[0]["duration_minutes"], 40);
}

#[tokio::test]
async fn login_and_logout_manage_the_session() {
    let app = app();
    signup(&app, "sam@example.com", Some("Sam")).await;

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "email": "sam@example.com", "password": "another one" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "sam@example.com", "password": "wrong guess" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "SAM@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "sam@example.com");
    let cookie = cookie.unwrap();

    let (status, _, _) = send(&app, Method::GET, "/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, Method::GET, "/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(start_paused = true)]
async fn countdown_completes_the_task_when_it_runs_out() {
    let app = app();
    let cookie = signup(&app, "timer@example.com", None).await;
    let task_id = create_task(&app, &cookie, "Quick review", 1).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        &format!("/tasks/{}/start", task_id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reminder_at"].is_null());

    tokio::time::sleep(Duration::from_secs(61)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let (_, _, body) = send(&app, Method::GET, "/progress", Some(&cookie), None).await;
    assert_eq!(body["xp"], 1);
    assert_eq!(body["total_study_minutes"], 1);

    let (_, _, body) = send(&app, Method::GET, "/tasks", Some(&cookie), None).await;
    assert_eq!(body[0]["status"], "completed");
}
