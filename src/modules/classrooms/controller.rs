use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use courseboard_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::modules::classrooms::model::{
    AvailableClassroomParams, Classroom, ClassroomFilterParams, CreateClassroomDto,
    PaginatedClassroomsResponse, UpdateClassroomDto,
};
use crate::modules::classrooms::service::ClassroomService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/classrooms",
    request_body = CreateClassroomDto,
    responses(
        (status = 201, description = "Classroom created successfully", body = Classroom),
        (status = 400, description = "Invalid input or duplicate name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "Classrooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_classroom(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateClassroomDto>,
) -> Result<(StatusCode, Json<Classroom>), AppError> {
    let classroom = ClassroomService::create_classroom(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(classroom)))
}

#[utoipa::path(
    get,
    path = "/api/classrooms",
    params(ClassroomFilterParams),
    responses(
        (status = 200, description = "Paginated list of classrooms", body = PaginatedClassroomsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Classrooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_classrooms(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<ClassroomFilterParams>,
) -> Result<Json<PaginatedClassroomsResponse>, AppError> {
    let classrooms = ClassroomService::get_classrooms(&state.db, filters).await?;
    Ok(Json(classrooms))
}

#[utoipa::path(
    get,
    path = "/api/classrooms/available",
    params(AvailableClassroomParams),
    responses(
        (status = 200, description = "Classrooms free for the requested slot", body = Vec<Classroom>),
        (status = 400, description = "Incomplete or unordered slot"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Classrooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_available_classrooms(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(params): Query<AvailableClassroomParams>,
) -> Result<Json<Vec<Classroom>>, AppError> {
    let classrooms = ClassroomService::get_available_classrooms(&state.db, params).await?;
    Ok(Json(classrooms))
}

#[utoipa::path(
    get,
    path = "/api/classrooms/{id}",
    params(
        ("id" = Uuid, Path, description = "Classroom ID")
    ),
    responses(
        (status = 200, description = "Classroom details", body = Classroom),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Classroom not found")
    ),
    tag = "Classrooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_classroom(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Classroom>, AppError> {
    let classroom = ClassroomService::get_classroom_by_id(&state.db, id).await?;
    Ok(Json(classroom))
}

#[utoipa::path(
    put,
    path = "/api/classrooms/{id}",
    params(
        ("id" = Uuid, Path, description = "Classroom ID")
    ),
    request_body = UpdateClassroomDto,
    responses(
        (status = 200, description = "Classroom updated successfully", body = Classroom),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Classroom not found")
    ),
    tag = "Classrooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_classroom(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateClassroomDto>,
) -> Result<Json<Classroom>, AppError> {
    let classroom =
        ClassroomService::update_classroom(&state.db, &auth_user.caller(), id, dto).await?;
    Ok(Json(classroom))
}

#[utoipa::path(
    delete,
    path = "/api/classrooms/{id}",
    params(
        ("id" = Uuid, Path, description = "Classroom ID")
    ),
    responses(
        (status = 204, description = "Classroom deleted successfully"),
        (status = 400, description = "Classroom is in use by courses or schedules"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Classroom not found")
    ),
    tag = "Classrooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_classroom(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ClassroomService::delete_classroom(&state.db, &auth_user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
