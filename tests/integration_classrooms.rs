mod common;

use axum::http::StatusCode;
use common::{
    admin_token, create_assignment, create_classroom, create_offline_course, create_teacher,
    delete, get, post, put, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_capacity_must_be_positive(pool: PgPool) {
    let app = setup_test_app(pool);
    let body = json!({ "name": "R0", "capacity": 0, "location": "Annex" });

    let (status, body) = post(&app, "/api/classrooms", &admin_token(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["capacity"][0], "capacity must be a positive number");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_available_classrooms_for_slot(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let busy = create_classroom(&app, &token, "R101", 40).await;
    let free = create_classroom(&app, &token, "R102", 40).await;
    let teacher = create_teacher(&app, &token, 1).await;
    let course = create_offline_course(&app, &token, "MATH101", &busy).await;
    let assignment = create_assignment(&app, &token, &teacher, &course).await;

    let schedule = json!({
        "course_id": course,
        "classroom_id": busy,
        "teaching_assignment_id": assignment,
        "day_of_week": 2,
        "start_section": 1,
        "end_section": 3
    });
    let (status, body) = post(&app, "/api/schedules", &token, schedule).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let uri = "/api/classrooms/available?day_of_week=2&start_section=2&end_section=4";
    let (status, body) = get(&app, uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![free.as_str()]);

    // Adjacent slot does not collide.
    let uri = "/api/classrooms/available?day_of_week=2&start_section=3&end_section=5";
    let (_, body) = get(&app, uri, &token).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_partial_slot_is_rejected(pool: PgPool) {
    let app = setup_test_app(pool);

    let uri = "/api/classrooms/available?day_of_week=2";
    let (status, body) = get(&app, uri, &admin_token()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"][0].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_classroom_in_use_cannot_be_deleted(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "R201", 25).await;
    create_offline_course(&app, &token, "CHEM101", &room).await;

    let (status, body) = delete(&app, &format!("/api/classrooms/{}", room), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Classroom is in use by courses or schedules");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_equipment_null_clears_absent_keeps(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "Lab", 20).await;
    let uri = format!("/api/classrooms/{}", room);

    let (status, body) = put(&app, &uri, &token, json!({ "equipment": "Fume hood" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = put(&app, &uri, &token, json!({ "capacity": 25 })).await;
    assert_eq!(body["equipment"], "Fume hood");

    let (status, body) = put(&app, &uri, &token, json!({ "equipment": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["equipment"].is_null());
    assert_eq!(body["capacity"], 25);
}
