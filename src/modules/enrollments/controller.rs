use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use courseboard_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentDetail, EnrollmentFilterParams,
    PaginatedEnrollmentsResponse, UpdateEnrollmentDto,
};
use crate::modules::enrollments::service::EnrollmentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "Unknown student/course, duplicate enrollment or course full"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin or student only")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment =
        EnrollmentService::create_enrollment(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/enrollments",
    params(EnrollmentFilterParams),
    responses(
        (status = 200, description = "Paginated list of enrollments", body = PaginatedEnrollmentsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_enrollments(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<EnrollmentFilterParams>,
) -> Result<Json<PaginatedEnrollmentsResponse>, AppError> {
    let enrollments = EnrollmentService::get_enrollments(&state.db, filters).await?;
    Ok(Json(enrollments))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    responses(
        (status = 200, description = "Enrollment details", body = EnrollmentDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_enrollment(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentDetail>, AppError> {
    let enrollment = EnrollmentService::get_enrollment_by_id(&state.db, id).await?;
    Ok(Json(enrollment))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    request_body = UpdateEnrollmentDto,
    responses(
        (status = 200, description = "Score recorded", body = Enrollment),
        (status = 400, description = "Score out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin or teacher only"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateEnrollmentDto>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment =
        EnrollmentService::update_enrollment(&state.db, &auth_user.caller(), id, dto).await?;
    Ok(Json(enrollment))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    responses(
        (status = 204, description = "Enrollment removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin or student only"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    EnrollmentService::delete_enrollment(&state.db, &auth_user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
