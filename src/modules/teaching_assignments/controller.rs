use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use courseboard_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::modules::teaching_assignments::model::{
    CreateTeachingAssignmentDto, PaginatedTeachingAssignmentsResponse, TeachingAssignment,
    TeachingAssignmentDetail, TeachingAssignmentFilterParams, UpdateTeachingAssignmentDto,
};
use crate::modules::teaching_assignments::service::TeachingAssignmentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/teaching_assignments",
    request_body = CreateTeachingAssignmentDto,
    responses(
        (status = 201, description = "Teacher assigned to the course", body = TeachingAssignment),
        (status = 400, description = "Unknown teacher/course or duplicate assignment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "Teaching Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_teaching_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateTeachingAssignmentDto>,
) -> Result<(StatusCode, Json<TeachingAssignment>), AppError> {
    let assignment =
        TeachingAssignmentService::create_assignment(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/teaching_assignments",
    params(TeachingAssignmentFilterParams),
    responses(
        (status = 200, description = "Paginated list of teaching assignments", body = PaginatedTeachingAssignmentsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Teaching Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_teaching_assignments(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<TeachingAssignmentFilterParams>,
) -> Result<Json<PaginatedTeachingAssignmentsResponse>, AppError> {
    let assignments = TeachingAssignmentService::get_assignments(&state.db, filters).await?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/api/teaching_assignments/{id}",
    params(
        ("id" = Uuid, Path, description = "Teaching assignment ID")
    ),
    responses(
        (status = 200, description = "Teaching assignment details", body = TeachingAssignmentDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Teaching assignment not found")
    ),
    tag = "Teaching Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_teaching_assignment(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TeachingAssignmentDetail>, AppError> {
    let assignment = TeachingAssignmentService::get_assignment_by_id(&state.db, id).await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    put,
    path = "/api/teaching_assignments/{id}",
    params(
        ("id" = Uuid, Path, description = "Teaching assignment ID")
    ),
    request_body = UpdateTeachingAssignmentDto,
    responses(
        (status = 200, description = "Teaching assignment updated", body = TeachingAssignment),
        (status = 400, description = "Invalid input, duplicate pair or scheduled assignment moved"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Teaching assignment not found")
    ),
    tag = "Teaching Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_teaching_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTeachingAssignmentDto>,
) -> Result<Json<TeachingAssignment>, AppError> {
    let assignment =
        TeachingAssignmentService::update_assignment(&state.db, &auth_user.caller(), id, dto)
            .await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/api/teaching_assignments/{id}",
    params(
        ("id" = Uuid, Path, description = "Teaching assignment ID")
    ),
    responses(
        (status = 204, description = "Teaching assignment and its schedules removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Teaching assignment not found")
    ),
    tag = "Teaching Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_teaching_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TeachingAssignmentService::delete_assignment(&state.db, &auth_user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
