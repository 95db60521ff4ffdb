use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_teaching_assignment, delete_teaching_assignment, get_teaching_assignment,
    get_teaching_assignments, update_teaching_assignment,
};

pub fn init_teaching_assignments_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_teaching_assignments).post(create_teaching_assignment),
        )
        .route(
            "/{id}",
            get(get_teaching_assignment)
                .put(update_teaching_assignment)
                .delete(delete_teaching_assignment),
        )
}
