mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    admin_token, create_assignment, create_classroom, create_offline_course, create_teacher,
    delete, get, post, put, setup_test_app,
};
use serde_json::{Value, json};
use sqlx::PgPool;

struct Timetable {
    token: String,
    room_a: String,
    room_b: String,
    course_1: String,
    course_2: String,
    assignment_1: String,
    assignment_2: String,
    shared_teacher_assignment: String,
}

/// Two rooms, two courses; teacher 1 teaches both courses, teacher 2 only
/// the second.
async fn timetable(app: &Router) -> Timetable {
    let token = admin_token();
    let room_a = create_classroom(app, &token, "A", 30).await;
    let room_b = create_classroom(app, &token, "B", 30).await;
    let course_1 = create_offline_course(app, &token, "C1", &room_a).await;
    let course_2 = create_offline_course(app, &token, "C2", &room_b).await;
    let teacher_1 = create_teacher(app, &token, 1).await;
    let teacher_2 = create_teacher(app, &token, 2).await;
    let assignment_1 = create_assignment(app, &token, &teacher_1, &course_1).await;
    let assignment_2 = create_assignment(app, &token, &teacher_2, &course_2).await;
    let shared_teacher_assignment = create_assignment(app, &token, &teacher_1, &course_2).await;

    Timetable {
        token,
        room_a,
        room_b,
        course_1,
        course_2,
        assignment_1,
        assignment_2,
        shared_teacher_assignment,
    }
}

fn slot(course: &str, room: &str, assignment: &str, start: i32, end: i32, pattern: &str) -> Value {
    json!({
        "course_id": course,
        "classroom_id": room,
        "teaching_assignment_id": assignment,
        "day_of_week": 3,
        "start_section": start,
        "end_section": end,
        "week_pattern": pattern
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_classroom_double_booking_rejected(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    let first = slot(&t.course_1, &t.room_a, &t.assignment_1, 1, 3, "all");
    let (status, body) = post(&app, "/api/schedules", &t.token, first).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let clash = slot(&t.course_2, &t.room_a, &t.assignment_2, 2, 4, "all");
    let (status, body) = post(&app, "/api/schedules", &t.token, clash).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "classroom is already booked for this time slot");

    let back_to_back = slot(&t.course_2, &t.room_a, &t.assignment_2, 3, 5, "all");
    let (status, _) = post(&app, "/api/schedules", &t.token, back_to_back).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_double_booking_rejected(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    let first = slot(&t.course_1, &t.room_a, &t.assignment_1, 1, 3, "all");
    post(&app, "/api/schedules", &t.token, first).await;

    let (status, body) = post(
        &app,
        "/api/schedules",
        &t.token,
        slot(&t.course_1, &t.room_b, &t.assignment_1, 2, 3, "all"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "teacher is already scheduled for this time slot");

    // Same teacher through a different assignment row is not a clash.
    let other_row = slot(&t.course_2, &t.room_b, &t.shared_teacher_assignment, 1, 3, "all");
    let (status, _) = post(&app, "/api/schedules", &t.token, other_row).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_odd_and_even_weeks_share_a_room(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    let odd = slot(&t.course_1, &t.room_a, &t.assignment_1, 1, 3, "odd");
    let (status, _) = post(&app, "/api/schedules", &t.token, odd).await;
    assert_eq!(status, StatusCode::CREATED);

    let even = slot(&t.course_2, &t.room_a, &t.assignment_2, 1, 3, "even");
    let (status, _) = post(&app, "/api/schedules", &t.token, even).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = get(&app, "/api/schedules?week_pattern=odd", &t.token).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["classroom_name"], "A");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invalid_section_range_and_foreign_assignment(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    let reversed = slot(&t.course_1, &t.room_a, &t.assignment_1, 4, 2, "all");
    let (status, body) = post(&app, "/api/schedules", &t.token, reversed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"][0].is_string());

    let foreign = slot(&t.course_1, &t.room_a, &t.assignment_2, 1, 2, "all");
    let (status, body) = post(&app, "/api/schedules", &t.token, foreign).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["teaching_assignment_id"][0],
        "teaching assignment does not belong to this course"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_moving_a_schedule_checks_conflicts(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    let first = slot(&t.course_1, &t.room_a, &t.assignment_1, 1, 3, "all");
    post(&app, "/api/schedules", &t.token, first).await;
    let second = slot(&t.course_2, &t.room_b, &t.assignment_2, 1, 3, "all");
    let (_, created) = post(&app, "/api/schedules", &t.token, second).await;
    let uri = format!("/api/schedules/{}", created["id"].as_str().unwrap());

    let (status, body) = put(&app, &uri, &t.token, json!({ "end_section": 4 })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["end_section"], 4);

    let (status, _) = put(&app, &uri, &t.token, json!({ "classroom_id": t.room_a })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_bookings_for_one_room_admit_one(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let app = app.clone();
            let token = t.token.clone();
            let body = slot(&t.course_1, &t.room_a, &t.assignment_1, 1, 3, "all");
            tokio::spawn(async move { post(&app, "/api/schedules", &token, body).await })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            (StatusCode::CREATED, _) => created += 1,
            (status, body) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body["error"], "classroom is already booked for this time slot");
                rejected += 1;
            }
        }
    }
    assert_eq!(created, 1);
    assert_eq!(rejected, 9);

    let (_, body) = get(&app, &format!("/api/schedules?classroom_id={}", t.room_a), &t.token).await;
    assert_eq!(body["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_racing_assignment_delete_never_deadlocks(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    for round in 0..5 {
        let teacher = create_teacher(&app, &t.token, 10 + round).await;
        let assignment = create_assignment(&app, &t.token, &teacher, &t.course_1).await;
        let body = slot(&t.course_1, &t.room_a, &assignment, 1, 3, "all");
        let (status, created) = post(&app, "/api/schedules", &t.token, body).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");

        let schedule_uri = format!("/api/schedules/{}", created["id"].as_str().unwrap());
        let assignment_uri = format!("/api/teaching_assignments/{}", assignment);

        let update = {
            let app = app.clone();
            let token = t.token.clone();
            tokio::spawn(async move {
                put(&app, &schedule_uri, &token, json!({ "end_section": 4 })).await
            })
        };
        let remove = {
            let app = app.clone();
            let token = t.token.clone();
            tokio::spawn(async move { delete(&app, &assignment_uri, &token).await })
        };

        let (update_status, update_body) = update.await.unwrap();
        assert!(
            [StatusCode::OK, StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND]
                .contains(&update_status),
            "{update_status}: {update_body}"
        );
        let (remove_status, _) = remove.await.unwrap();
        assert_eq!(remove_status, StatusCode::NO_CONTENT);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_booking_racing_course_delete_never_deadlocks(pool: PgPool) {
    let app = setup_test_app(pool);
    let t = timetable(&app).await;

    for round in 0..5 {
        let course =
            create_offline_course(&app, &t.token, &format!("RACE{}", round), &t.room_b).await;
        let teacher = create_teacher(&app, &t.token, 20 + round).await;
        let assignment = create_assignment(&app, &t.token, &teacher, &course).await;
        let body = slot(&course, &t.room_b, &assignment, 6, 8, "all");
        let course_uri = format!("/api/courses/{}", course);

        let book = {
            let app = app.clone();
            let token = t.token.clone();
            tokio::spawn(async move { post(&app, "/api/schedules", &token, body).await })
        };
        let remove = {
            let app = app.clone();
            let token = t.token.clone();
            tokio::spawn(async move { delete(&app, &course_uri, &token).await })
        };

        let (book_status, book_body) = book.await.unwrap();
        assert!(
            [StatusCode::CREATED, StatusCode::BAD_REQUEST].contains(&book_status),
            "{book_status}: {book_body}"
        );
        let (remove_status, _) = remove.await.unwrap();
        assert_eq!(remove_status, StatusCode::NO_CONTENT);
    }

    let (_, body) = get(&app, &format!("/api/schedules?classroom_id={}", t.room_b), &t.token).await;
    assert_eq!(body["meta"]["total"], 0);
}
