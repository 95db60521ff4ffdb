use crate::docs::ApiDoc;
use crate::middleware::role::require_admin;
use crate::modules::classrooms::init_classrooms_router;
use crate::modules::courses::init_courses_router;
use crate::modules::enrollments::init_enrollments_router;
use crate::modules::schedules::init_schedules_router;
use crate::modules::students::init_students_router;
use crate::modules::teacher_roles::{init_roles_router, init_teacher_roles_router};
use crate::modules::teachers::init_teachers_router;
use crate::modules::teaching_assignments::init_teaching_assignments_router;
use crate::modules::users::{init_profile_router, init_users_router};
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use courseboard_observability::{logging_middleware, metrics_middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest(
                    "/users",
                    init_users_router()
                        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
                        .merge(init_profile_router()),
                )
                .nest("/students", init_students_router())
                .nest("/teachers", init_teachers_router())
                .nest("/classrooms", init_classrooms_router())
                .nest("/courses", init_courses_router())
                .nest("/enrollments", init_enrollments_router())
                .nest("/teaching_assignments", init_teaching_assignments_router())
                .nest("/schedules", init_schedules_router())
                .nest("/roles", init_roles_router())
                .nest("/teacher_roles", init_teacher_roles_router()),
        )
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
