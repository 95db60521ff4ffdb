mod common;

use axum::http::StatusCode;
use common::{
    admin_token, create_student, delete, get, post, put, setup_test_app, student_body, token_for,
};
use courseboard_auth::UserRole;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_student_as_admin(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, body) = post(&app, "/api/students", &admin_token(), student_body(1)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["student_id"], "S00001");
    assert_eq!(body["email"], "student1@example.com");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_student_as_student_forbidden(pool: PgPool) {
    let app = setup_test_app(pool);

    let token = token_for(UserRole::Student);
    let (status, _) = post(&app, "/api/students", &token, student_body(1)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_student_number_rejected(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    create_student(&app, &token, 1).await;

    let mut body = student_body(2);
    body["student_id"] = json!("S00001");
    let (status, body) = post(&app, "/api/students", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A student with this student number already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_age_out_of_range_is_field_error(pool: PgPool) {
    let app = setup_test_app(pool);
    let mut body = student_body(1);
    body["age"] = json!(101);

    let (status, body) = post(&app, "/api/students", &admin_token(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["age"][0], "age must be between 0 and 100");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_students_filters_by_name(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    for n in 1..=3 {
        create_student(&app, &token, n).await;
    }

    let (status, body) = get(&app, "/api/students?name=student%202", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Student 2");

    let (_, body) = get(&app, "/api/students?limit=2", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["has_more"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_partial_update_keeps_other_fields(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let id = create_student(&app, &token, 1).await;
    let uri = format!("/api/students/{}", id);

    let (status, body) = put(&app, &uri, &token, json!({ "major": "Physics" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["major"], "Physics");
    assert_eq!(body["name"], "Student 1");

    let (status, _) = delete(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");
}
