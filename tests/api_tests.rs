use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use campus::config::Config;
use campus::db::{NewUser, Store};
use campus::entities::enrollments;
use campus::state::SharedState;
use http_body_util::BodyExt;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// API key of the admin account seeded by the migrations.
const DEFAULT_API_KEY: &str = "campus_default_api_key_please_regenerate";

const BOUNDARY: &str = "campus-test-boundary";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.storage.media_root = std::env::temp_dir()
        .join(format!("campus-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

/// Router plus a handle on its database for arranging fixtures.
async fn spawn_app_with_store() -> (Router, Store) {
    let shared = SharedState::new(test_config())
        .await
        .expect("Failed to create shared state");
    let store = shared.store.clone();
    let state = campus::api::create_app_state(Arc::new(shared), None);
    (campus::api::router(state).await, store)
}

async fn spawn_app() -> Router {
    let state = campus::api::create_app_state_from_config(test_config(), None)
        .await
        .expect("Failed to create app state");
    campus::api::router(state).await
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Signs up a student and returns `(user_id, api_key)`.
async fn signup(app: &Router, username: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse",
            "password_confirmation": "correct horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {body}");
    (
        body["data"]["user_id"].as_i64().unwrap(),
        body["data"]["api_key"].as_str().unwrap().to_string(),
    )
}

/// Signs up a user and promotes it to instructor.
async fn instructor(app: &Router, username: &str) -> (i64, String) {
    let (id, key) = signup(app, username).await;
    let (status, body) = send(
        app,
        "PUT",
        &format!("/api/users/{id}/role"),
        Some(DEFAULT_API_KEY),
        Some(json!({ "role": "instructor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "role change failed: {body}");
    assert_eq!(body["data"]["role"], "instructor");
    (id, key)
}

async fn create_course(app: &Router, key: &str, title: &str, published: bool) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/courses",
        Some(key),
        Some(json!({
            "title": title,
            "description": "An introduction",
            "level": "beginner",
            "duration_hours": 10,
            "price": 49.99,
            "is_published": published,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create course failed: {body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_protected_routes_require_authentication() {
    let app = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("wrong-key"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(DEFAULT_API_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {DEFAULT_API_KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "alive");

    let (status, _) = send(&app, "GET", "/api/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signup_creates_student_and_rejects_bad_input() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "correct horse",
            "password_confirmation": "correct horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "student");
    assert_eq!(body["data"]["redirect"], "/student/dashboard");

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "correct horse",
            "password_confirmation": "battery staple",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "short",
            "password_confirmation": "short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_starts_a_session() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "username": "admin", "password": "password" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["redirect"], "/admin/dashboard");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_students_cannot_create_courses() {
    let app = spawn_app().await;
    let (_, key) = signup(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&key),
        Some(json!({ "title": "Sneaky" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/student/dashboard");
}

#[tokio::test]
async fn test_only_the_owner_edits_a_course() {
    let app = spawn_app().await;
    let (_, owner) = instructor(&app, "tutor").await;
    let (_, other) = instructor(&app, "rival").await;
    let course = create_course(&app, &owner, "Intro to X", true).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/courses/{course}"),
        Some(&other),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/instructor/dashboard");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/courses/{course}"),
        Some(&owner),
        Some(json!({ "title": "Intro to X, revised", "price": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Intro to X, revised");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/courses/{course}"),
        Some(DEFAULT_API_KEY),
        Some(json!({ "title": "Admin edit" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_course_validation() {
    let app = spawn_app().await;
    let (_, key) = instructor(&app, "tutor").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&key),
        Some(json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&key),
        Some(json!({ "title": "Negative", "price": -1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&key),
        Some(json!({ "title": "Levels", "level": "expert" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_drafts_are_hidden_from_students() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (_, student) = signup(&app, "alice").await;

    create_course(&app, &tutor, "Published", true).await;
    let draft = create_course(&app, &tutor, "Draft", false).await;

    let (status, body) = send(&app, "GET", "/api/courses", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Published"]);

    let (status, _) = send(&app, "GET", &format!("/api/courses/{draft}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/courses", Some(&tutor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 2);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/courses/{draft}"),
        Some(&tutor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["can_edit"], true);
}

#[tokio::test]
async fn test_enrolling_twice_reports_existing_enrollment() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (_, alice) = signup(&app, "alice").await;
    let course = create_course(&app, &tutor, "Intro to X", true).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{course}/enroll"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["already_enrolled"], false);
    assert_eq!(body["data"]["message"], "Successfully enrolled in Intro to X!");
    let first_id = body["data"]["enrollment"]["id"].clone();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{course}/enroll"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["already_enrolled"], true);
    assert_eq!(
        body["data"]["message"],
        "You are already enrolled in Intro to X."
    );
    assert_eq!(body["data"]["enrollment"]["id"], first_id);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/courses/{course}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_enrolled"], true);
    assert_eq!(body["data"]["enrollment_count"], 1);
}

#[tokio::test]
async fn test_enrollment_rules() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (_, alice) = signup(&app, "alice").await;
    let draft = create_course(&app, &tutor, "Draft", false).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/courses/{draft}/enroll"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/courses/999/enroll", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{draft}/enroll"),
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/admin/dashboard");
}

#[tokio::test]
async fn test_enrollment_management() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (_, alice) = signup(&app, "alice").await;
    let course = create_course(&app, &tutor, "Intro to X", true).await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{course}/enroll"),
        Some(&alice),
        None,
    )
    .await;
    let enrollment = body["data"]["enrollment"]["id"].as_i64().unwrap();

    let (status, _) = send(&app, "GET", "/api/enrollments", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        "/api/enrollments?status=in_progress",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        "/api/enrollments?status=enrolled&student=ali",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["items"][0]["student_username"], "alice");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/enrollments/{enrollment}/progress"),
        Some(&alice),
        Some(json!({ "progress": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"], 40);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/enrollments/{enrollment}/progress"),
        Some(&alice),
        Some(json!({ "progress": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/enrollments/{enrollment}/status"),
        Some(DEFAULT_API_KEY),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["completed_at"].is_string());

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/enrollments/{enrollment}/status"),
        Some(DEFAULT_API_KEY),
        Some(json!({ "status": "paused" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let app = spawn_app().await;
    let (alice_id, alice) = signup(&app, "alice").await;

    let (status, _) = send(&app, "GET", "/api/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "GET",
        "/api/users?role=student",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["items"][0]["id"], alice_id);

    let (status, _) = send(
        &app,
        "GET",
        "/api/users?role=wizard",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/9999/role",
        Some(DEFAULT_API_KEY),
        Some(json!({ "role": "instructor" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analytics_and_dashboards() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (alice_id, alice) = signup(&app, "alice").await;
    let course = create_course(&app, &tutor, "Intro to X", true).await;

    send(
        &app,
        "POST",
        &format!("/api/courses/{course}/enroll"),
        Some(&alice),
        None,
    )
    .await;

    let (status, _) = send(&app, "GET", "/api/analytics", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/analytics", Some(DEFAULT_API_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["window_days"], 30);
    assert_eq!(body["data"]["total_students"], 1);
    assert_eq!(body["data"]["enrollments"]["total"], 1);
    assert_eq!(body["data"]["enrollments"]["in_progress"], 1);

    let (status, body) = send(
        &app,
        "GET",
        "/api/analytics?range=all",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["window_days"].is_null());

    let (status, _) = send(
        &app,
        "GET",
        "/api/analytics?range=fortnight",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/analytics/students/{alice_id}"),
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totals"]["total"], 1);

    let (status, body) = send(&app, "GET", "/api/dashboard/student", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totals"]["total"], 1);
    assert!(body["data"]["available_courses"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "GET",
        "/api/dashboard/instructor",
        Some(&tutor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_students"], 1);
    assert_eq!(body["data"]["total_enrollments"], 1);

    let (status, _) = send(&app, "GET", "/api/dashboard/admin", Some(&tutor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "GET",
        "/api/dashboard/admin",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_courses"], 1);
    assert_eq!(body["data"]["total_enrollments"], 1);
    assert_eq!(body["data"]["system_status"], "Operational");
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            ),
            Part::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send_multipart(
    app: &Router,
    uri: &str,
    api_key: &str,
    parts: &[Part<'_>],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Api-Key", api_key)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn fetch_raw(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn enroll(app: &Router, key: &str, course: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/courses/{course}/enroll"),
        Some(key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "enroll failed: {body}");
    body["data"]["enrollment"]["id"].as_i64().unwrap()
}

async fn report(app: &Router, query: &str) -> Value {
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/analytics{query}"),
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "report failed: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_out_of_range_numbers_are_rejected() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app,
        "GET",
        "/api/courses?page=18446744073709551615",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        "/api/users?page=4294967296",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        "/api/courses?page=4294967295",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        "GET",
        "/api/analytics?range=4000000000",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        "/api/analytics?range=36501",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        "/api/analytics?range=36500",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_course_uploads() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (_, rival) = instructor(&app, "rival").await;
    let course = create_course(&app, &tutor, "Intro to X", true).await;

    let (status, body) = send_multipart(
        &app,
        &format!("/api/courses/{course}/thumbnail"),
        &tutor,
        &[Part::File("thumbnail", "cover.png", b"png-bytes")],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "thumbnail failed: {body}");
    let thumbnail = body["data"]["thumbnail_url"].as_str().unwrap().to_string();
    assert!(thumbnail.starts_with(&format!("/media/course_thumbnails/{course}/")));
    assert!(thumbnail.ends_with("_cover.png"));

    let (status, bytes) = fetch_raw(&app, &thumbnail).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"png-bytes");

    let (status, _) = send_multipart(
        &app,
        &format!("/api/courses/{course}/thumbnail"),
        &tutor,
        &[Part::File("thumbnail", "notes.txt", b"text")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_multipart(
        &app,
        &format!("/api/courses/{course}/thumbnail"),
        &rival,
        &[Part::File("thumbnail", "cover.png", b"png-bytes")],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/instructor/dashboard");

    let (status, body) = send_multipart(
        &app,
        &format!("/api/courses/{course}/materials"),
        &tutor,
        &[
            Part::Text("title", "Slides"),
            Part::Text("material_type", "ppt"),
            Part::Text("order", "2"),
            Part::File("file", "week1.ppt", b"slides"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "material failed: {body}");
    assert_eq!(body["data"]["material_type"], "ppt");
    assert!(
        body["data"]["file_url"]
            .as_str()
            .unwrap()
            .starts_with(&format!("/media/course_materials/{course}/"))
    );

    let (status, _) = send_multipart(
        &app,
        &format!("/api/courses/{course}/materials"),
        &tutor,
        &[
            Part::Text("title", "Reading"),
            Part::Text("order", "1"),
            Part::File("file", "reading.pdf", b"pdf"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_multipart(
        &app,
        &format!("/api/courses/{course}/materials"),
        &tutor,
        &[Part::Text("title", "No file")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_multipart(
        &app,
        &format!("/api/courses/{course}/videos"),
        &tutor,
        &[
            Part::Text("title", "Lecture 1"),
            Part::Text("duration", "45"),
            Part::File("video_file", "lecture1.mp4", b"video"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "video file failed: {body}");
    assert!(body["data"]["file_url"].is_string());
    assert!(body["data"]["video_url"].is_null());
    assert_eq!(body["data"]["duration_minutes"], 45);

    let (status, body) = send_multipart(
        &app,
        &format!("/api/courses/{course}/videos"),
        &tutor,
        &[
            Part::Text("title", "Lecture 2"),
            Part::Text("video_url", "https://videos.example.com/lecture2"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "video url failed: {body}");
    assert!(body["data"]["file_url"].is_null());
    assert_eq!(body["data"]["video_url"], "https://videos.example.com/lecture2");

    let (status, _) = send_multipart(
        &app,
        &format!("/api/courses/{course}/videos"),
        &tutor,
        &[Part::Text("title", "Lecture 3")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_multipart(
        &app,
        &format!("/api/courses/{course}/videos"),
        &tutor,
        &[
            Part::Text("title", "Lecture 4"),
            Part::Text("video_url", "ftp://videos.example.com/lecture4"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &format!("/api/courses/{course}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let materials: Vec<&str> = body["data"]["materials"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(materials, vec!["Reading", "Slides"]);
    assert_eq!(body["data"]["videos"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_avatar_upload() {
    let app = spawn_app().await;
    let (id, alice) = signup(&app, "alice").await;

    let (status, body) = send_multipart(
        &app,
        "/api/auth/me/avatar",
        &alice,
        &[Part::File("profile_picture", "me.jpg", b"jpeg-bytes")],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "avatar failed: {body}");
    let url = body["data"]["profile_picture_url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&format!("/media/profile_pics/{id}/")));

    let (status, bytes) = fetch_raw(&app, &url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"jpeg-bytes");

    let (status, _) = send_multipart(
        &app,
        "/api/auth/me/avatar",
        &alice,
        &[Part::File("profile_picture", "me.exe", b"binary")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_multipart(&app, "/api/auth/me/avatar", &alice, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_repairs_missing_profile() {
    let (app, store) = spawn_app_with_store().await;
    let security = campus::config::SecurityConfig::default();

    let drifter = store
        .user_repo()
        .create(
            NewUser {
                username: "drifter".to_string(),
                email: "drifter@example.com".to_string(),
                password: "correct horse".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                is_superuser: false,
            },
            &security,
        )
        .await
        .unwrap();
    let root = store
        .user_repo()
        .create(
            NewUser {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                password: "correct horse".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                is_superuser: true,
            },
            &security,
        )
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "GET",
        "/api/dashboard/student",
        Some(&drifter.api_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User profile not found. Please contact support.");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "drifter", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "student");
    assert_eq!(body["data"]["redirect"], "/student/dashboard");
    assert_eq!(
        store.get_user_role(drifter.id).await.unwrap().as_deref(),
        Some("student")
    );

    let (status, _) = send(
        &app,
        "GET",
        "/api/dashboard/student",
        Some(&drifter.api_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "root", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(
        store.get_user_role(root.id).await.unwrap().as_deref(),
        Some("admin")
    );
}

#[tokio::test]
async fn test_analytics_filters_and_window() {
    let (app, store) = spawn_app_with_store().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let (_, alice) = signup(&app, "alice").await;
    let (_, bob) = signup(&app, "bob").await;
    let first = create_course(&app, &tutor, "First", true).await;
    let second = create_course(&app, &tutor, "Second", true).await;

    enroll(&app, &alice, first).await;
    enroll(&app, &bob, first).await;
    let old = enroll(&app, &bob, second).await;

    enrollments::Entity::update_many()
        .col_expr(
            enrollments::Column::EnrolledAt,
            Expr::value("2020-01-15T10:00:00Z"),
        )
        .filter(enrollments::Column::Id.eq(i32::try_from(old).unwrap()))
        .exec(&store.conn)
        .await
        .unwrap();

    let data = report(&app, "").await;
    assert_eq!(data["enrollments"]["total"], 2);
    assert_eq!(data["active_students"], 2);

    let data = report(&app, "?range=all").await;
    assert_eq!(data["enrollments"]["total"], 3);
    let months: Vec<&str> = data["monthly_trend"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["month"].as_str().unwrap())
        .collect();
    assert!(months.contains(&"2020-01"));

    let data = report(&app, "?range=all&student=ALI").await;
    assert_eq!(data["enrollments"]["total"], 1);
    assert_eq!(data["recent_activity"][0]["student_username"], "alice");

    let data = report(&app, "?range=all&student=bob@example").await;
    assert_eq!(data["enrollments"]["total"], 2);

    let data = report(&app, "?range=all&student=%25").await;
    assert_eq!(data["enrollments"]["total"], 0);

    let data = report(&app, &format!("?range=all&course={second}")).await;
    assert_eq!(data["enrollments"]["total"], 1);
    assert_eq!(data["recent_activity"][0]["student_username"], "bob");

    let data = report(&app, &format!("?course={second}")).await;
    assert_eq!(data["enrollments"]["total"], 0);
}

#[tokio::test]
async fn test_report_buckets_and_average() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let course = create_course(&app, &tutor, "Intro to X", true).await;

    for (name, progress) in [("amy", 10), ("ben", 60), ("cat", 90)] {
        let (_, key) = signup(&app, name).await;
        let enrollment = enroll(&app, &key, course).await;
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/enrollments/{enrollment}/progress"),
            Some(&key),
            Some(json!({ "progress": progress })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let data = report(&app, "").await;
    assert_eq!(data["average_progress"], 53);
    assert_eq!(
        data["performance"],
        json!({ "excellent": 1, "good": 1, "average": 0, "struggling": 1 })
    );
    assert_eq!(data["top_students"][0]["username"], "cat");
    assert_eq!(data["struggling_students"][0]["username"], "amy");
}

#[tokio::test]
async fn test_enrollment_listing_filters_by_username_only() {
    let app = spawn_app().await;
    let (_, tutor) = instructor(&app, "tutor").await;
    let course = create_course(&app, &tutor, "Intro to X", true).await;
    let (_, alice) = signup(&app, "alice").await;
    enroll(&app, &alice, course).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/enrollments?student=ALI",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);

    let (status, body) = send(
        &app,
        "GET",
        "/api/enrollments?student=example.com",
        Some(DEFAULT_API_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 0);
}

#[tokio::test]
async fn test_duplicate_signup_is_a_validation_error() {
    let app = spawn_app().await;
    signup(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "correct horse",
            "password_confirmation": "correct horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A user with that username or email already exists");
}
