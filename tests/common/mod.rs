#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use courseboard::router::init_router;
use courseboard::state::AppState;
use courseboard_auth::{UserRole, create_access_token};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub fn setup_test_app(pool: PgPool) -> Router {
    dotenvy::dotenv().ok();
    init_router(AppState::new(pool))
}

/// Mints a bearer token for a throwaway caller with `role`.
pub fn token_for(role: UserRole) -> String {
    token_for_user(Uuid::new_v4(), role)
}

pub fn token_for_user(user_id: Uuid, role: UserRole) -> String {
    dotenvy::dotenv().ok();
    let config = courseboard_config::JwtConfig::from_env();
    create_access_token(user_id, &format!("{}-{}", role, user_id), role, &config).unwrap()
}

pub fn admin_token() -> String {
    token_for(UserRole::Admin)
}

/// Sends one request through the router and decodes the JSON body
/// (`Value::Null` for empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(token), None).await
}

pub async fn post(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(token), Some(body)).await
}

pub async fn put(app: &Router, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, Some(token), None).await
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap().to_string()
}

pub fn student_body(n: u32) -> Value {
    json!({
        "name": format!("Student {}", n),
        "student_id": format!("S{:05}", n),
        "gender": "female",
        "age": 20,
        "class_name": "CS-1",
        "college": "Engineering",
        "major": "Computer Science",
        "email": format!("student{}@example.com", n)
    })
}

pub fn teacher_body(n: u32) -> Value {
    json!({
        "name": format!("Teacher {}", n),
        "age": 45,
        "gender": "male",
        "title": "Professor",
        "department": "Mathematics",
        "email": format!("teacher{}@example.com", n),
        "phone": "555-0300",
        "hire_date": "2018-02-01"
    })
}

pub fn offline_course_body(code: &str, classroom_id: &str) -> Value {
    json!({
        "name": format!("Course {}", code),
        "code": code,
        "credits": 2.5,
        "total_hours": 32,
        "teaching_method": "offline",
        "classroom_id": classroom_id,
        "semester": "2025-spring"
    })
}

pub async fn create_student(app: &Router, token: &str, n: u32) -> String {
    let (status, body) = post(app, "/api/students", token, student_body(n)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

pub async fn create_teacher(app: &Router, token: &str, n: u32) -> String {
    let (status, body) = post(app, "/api/teachers", token, teacher_body(n)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

pub async fn create_classroom(app: &Router, token: &str, name: &str, capacity: i32) -> String {
    let body = json!({ "name": name, "capacity": capacity, "location": "Science Hall" });
    let (status, body) = post(app, "/api/classrooms", token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

pub async fn create_offline_course(
    app: &Router,
    token: &str,
    code: &str,
    classroom_id: &str,
) -> String {
    let body = offline_course_body(code, classroom_id);
    let (status, body) = post(app, "/api/courses", token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

pub async fn create_assignment(
    app: &Router,
    token: &str,
    teacher_id: &str,
    course_id: &str,
) -> String {
    let body = json!({ "teacher_id": teacher_id, "course_id": course_id, "teaching_hours": 32 });
    let (status, body) = post(app, "/api/teaching_assignments", token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}
