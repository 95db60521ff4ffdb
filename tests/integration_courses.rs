mod common;

use axum::http::StatusCode;
use common::{
    admin_token, create_assignment, create_classroom, create_offline_course, create_student,
    create_teacher, delete, get, offline_course_body, post, put, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_offline_course_takes_classroom_capacity(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "L1", 45).await;

    let body = offline_course_body("ALG1", &room);
    let (status, body) = post(&app, "/api/courses", &token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["max_students"], 45);
    assert_eq!(body["classroom_id"], room.as_str());
    assert_eq!(body["course_type"], "required");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_online_course_drops_classroom(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "L1", 45).await;

    let mut body = offline_course_body("WEB1", &room);
    body["teaching_method"] = json!("online");
    let (status, body) = post(&app, "/api/courses", &token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["max_students"], 1000);
    assert!(body["classroom_id"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_offline_course_requires_classroom(pool: PgPool) {
    let app = setup_test_app(pool);
    let body = json!({
        "name": "Drawing",
        "code": "ART1",
        "credits": 1.0,
        "total_hours": 16,
        "teaching_method": "offline",
        "semester": "2025-spring"
    });

    let (status, body) = post(&app, "/api/courses", &admin_token(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["classroom_id"][0], "offline courses require a classroom");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_code_rejected(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "L1", 45).await;
    create_offline_course(&app, &token, "PHY1", &room).await;

    let body = offline_course_body("PHY1", &room);
    let (status, body) = post(&app, "/api/courses", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A course with this code already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_search_by_credit_range(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "L1", 45).await;

    let mut heavy = offline_course_body("BIG1", &room);
    heavy["credits"] = json!(5.0);
    post(&app, "/api/courses", &token, heavy).await;
    create_offline_course(&app, &token, "SML1", &room).await;

    let (status, body) = get(&app, "/api/courses/search?min_credits=4", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["code"], "BIG1");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_detail_and_status(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "L1", 3).await;
    let course = create_offline_course(&app, &token, "BIO1", &room).await;
    let teacher = create_teacher(&app, &token, 1).await;
    create_assignment(&app, &token, &teacher, &course).await;
    let student = create_student(&app, &token, 1).await;
    let enroll = json!({ "student_id": student, "course_id": course });
    post(&app, "/api/enrollments", &token, enroll).await;

    let (status, body) = get(&app, &format!("/api/courses/{}", course), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "BIO1");
    assert_eq!(body["classroom"]["id"], room.as_str());
    assert_eq!(body["teachers"][0]["id"], teacher.as_str());
    assert_eq!(body["enrollments"].as_array().unwrap().len(), 1);
    assert_eq!(body["teaching_assignments"].as_array().unwrap().len(), 1);

    let uri = format!("/api/courses/{}/current_status", course);
    let (status, body) = get(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_students"], 1);
    assert_eq!(body["max_students"], 3);
    assert_eq!(body["available_slots"], 2);
    assert_eq!(body["is_full"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_moving_to_smaller_classroom_below_enrollment_rejected(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let large = create_classroom(&app, &token, "Hall", 10).await;
    let small = create_classroom(&app, &token, "Closet", 1).await;
    let course = create_offline_course(&app, &token, "HIS1", &large).await;
    for n in 1..=2 {
        let student = create_student(&app, &token, n).await;
        let enroll = json!({ "student_id": student, "course_id": course });
        post(&app, "/api/enrollments", &token, enroll).await;
    }

    let uri = format!("/api/courses/{}", course);
    let (status, body) = put(&app, &uri, &token, json!({ "classroom_id": small })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["classroom_id"][0].is_string());

    let (status, body) = put(&app, &uri, &token, json!({ "teaching_method": "online" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_students"], 1000);
    assert!(body["classroom_id"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_course_removes_dependents(pool: PgPool) {
    let app = setup_test_app(pool);
    let token = admin_token();
    let room = create_classroom(&app, &token, "L1", 20).await;
    let course = create_offline_course(&app, &token, "GEO1", &room).await;
    let student = create_student(&app, &token, 1).await;
    let enroll = json!({ "student_id": student, "course_id": course });
    post(&app, "/api/enrollments", &token, enroll).await;

    let (status, _) = delete(&app, &format!("/api/courses/{}", course), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "/api/enrollments", &token).await;
    assert_eq!(body["meta"]["total"], 0);

    let (status, _) = delete(&app, &format!("/api/classrooms/{}", room), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
