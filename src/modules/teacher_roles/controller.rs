use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use courseboard_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::modules::teacher_roles::model::{
    BatchAssignResponse, BatchAssignRolesDto, CreateRoleDto, CreateTeacherRoleDto,
    PaginatedRolesResponse, PaginatedTeacherRolesResponse, Role, RoleFilterParams, TeacherRole,
    TeacherRoleDetail, TeacherRoleFilterParams, UpdateRoleDto,
};
use crate::modules::teacher_roles::service::{RoleService, TeacherRoleService};
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid input or duplicate name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = RoleService::create_role(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/roles",
    params(RoleFilterParams),
    responses(
        (status = 200, description = "Roles visible to the caller", body = PaginatedRolesResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_roles(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<RoleFilterParams>,
) -> Result<Json<PaginatedRolesResponse>, AppError> {
    let roles = RoleService::get_roles(&state.db, &auth_user.caller(), filters).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    params(
        ("id" = Uuid, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Role details", body = Role),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Role not found or not visible")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Role>, AppError> {
    let role = RoleService::get_role_by_id(&state.db, &auth_user.caller(), id).await?;
    Ok(Json(role))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    params(
        ("id" = Uuid, Path, description = "Role ID")
    ),
    request_body = UpdateRoleDto,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "Invalid input or duplicate name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<Role>, AppError> {
    let role = RoleService::update_role(&state.db, &auth_user.caller(), id, dto).await?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    params(
        ("id" = Uuid, Path, description = "Role ID")
    ),
    responses(
        (status = 204, description = "Role and its grants removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RoleService::delete_role(&state.db, &auth_user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/teacher_roles",
    request_body = CreateTeacherRoleDto,
    responses(
        (status = 201, description = "Role granted to the teacher", body = TeacherRole),
        (status = 400, description = "Unknown teacher/role or duplicate grant"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "Teacher Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_teacher_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateTeacherRoleDto>,
) -> Result<(StatusCode, Json<TeacherRole>), AppError> {
    let grant =
        TeacherRoleService::create_teacher_role(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

#[utoipa::path(
    post,
    path = "/api/teacher_roles/batch_assign",
    request_body = BatchAssignRolesDto,
    responses(
        (status = 201, description = "Missing grants created", body = BatchAssignResponse),
        (status = 400, description = "Empty lists or unknown teacher/role ids"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "Teacher Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn batch_assign_roles(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<BatchAssignRolesDto>,
) -> Result<(StatusCode, Json<BatchAssignResponse>), AppError> {
    let response = TeacherRoleService::batch_assign(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/teacher_roles",
    params(TeacherRoleFilterParams),
    responses(
        (status = 200, description = "Grants visible to the caller", body = PaginatedTeacherRolesResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Teacher Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_teacher_roles(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<TeacherRoleFilterParams>,
) -> Result<Json<PaginatedTeacherRolesResponse>, AppError> {
    let grants =
        TeacherRoleService::get_teacher_roles(&state.db, &auth_user.caller(), filters).await?;
    Ok(Json(grants))
}

#[utoipa::path(
    get,
    path = "/api/teacher_roles/{id}",
    params(
        ("id" = Uuid, Path, description = "Teacher role ID")
    ),
    responses(
        (status = 200, description = "Grant details", body = TeacherRoleDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Grant not found or not visible")
    ),
    tag = "Teacher Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_teacher_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TeacherRoleDetail>, AppError> {
    let grant =
        TeacherRoleService::get_teacher_role_by_id(&state.db, &auth_user.caller(), id).await?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/api/teacher_roles/{id}",
    params(
        ("id" = Uuid, Path, description = "Teacher role ID")
    ),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Grant not found")
    ),
    tag = "Teacher Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_teacher_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    TeacherRoleService::delete_teacher_role(&state.db, &auth_user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
