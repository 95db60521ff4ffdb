use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    batch_assign_roles, create_role, create_teacher_role, delete_role, delete_teacher_role,
    get_role, get_roles, get_teacher_role, get_teacher_roles, update_role,
};

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
}

pub fn init_teacher_roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_teacher_roles).post(create_teacher_role))
        .route("/batch_assign", post(batch_assign_roles))
        .route("/{id}", get(get_teacher_role).delete(delete_teacher_role))
}
