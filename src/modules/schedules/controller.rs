use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use courseboard_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::modules::schedules::model::{
    CreateScheduleDto, PaginatedSchedulesResponse, Schedule, ScheduleDetail,
    ScheduleFilterParams, UpdateScheduleDto,
};
use crate::modules::schedules::service::ScheduleService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body = CreateScheduleDto,
    responses(
        (status = 201, description = "Schedule created", body = Schedule),
        (status = 400, description = "Invalid slot, unknown references or double booking"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateScheduleDto>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let schedule = ScheduleService::create_schedule(&state.db, &auth_user.caller(), dto).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    get,
    path = "/api/schedules",
    params(ScheduleFilterParams),
    responses(
        (status = 200, description = "Paginated timetable rows", body = PaginatedSchedulesResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_schedules(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<ScheduleFilterParams>,
) -> Result<Json<PaginatedSchedulesResponse>, AppError> {
    let schedules = ScheduleService::get_schedules(&state.db, filters).await?;
    Ok(Json(schedules))
}

#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    params(
        ("id" = Uuid, Path, description = "Schedule ID")
    ),
    responses(
        (status = 200, description = "Schedule details", body = ScheduleDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_schedule(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleDetail>, AppError> {
    let schedule = ScheduleService::get_schedule_by_id(&state.db, id).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    put,
    path = "/api/schedules/{id}",
    params(
        ("id" = Uuid, Path, description = "Schedule ID")
    ),
    request_body = UpdateScheduleDto,
    responses(
        (status = 200, description = "Schedule updated", body = Schedule),
        (status = 400, description = "Invalid slot, unknown references or double booking"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateScheduleDto>,
) -> Result<Json<Schedule>, AppError> {
    let schedule =
        ScheduleService::update_schedule(&state.db, &auth_user.caller(), id, dto).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/api/schedules/{id}",
    params(
        ("id" = Uuid, Path, description = "Schedule ID")
    ),
    responses(
        (status = 204, description = "Schedule deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Schedule not found")
    ),
    tag = "Schedules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ScheduleService::delete_schedule(&state.db, &auth_user.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
