use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_course, delete_course, get_course, get_course_status, get_courses, search_courses,
    update_course,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_courses).post(create_course))
        .route("/search", get(search_courses))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/{id}/current_status", get(get_course_status))
}
