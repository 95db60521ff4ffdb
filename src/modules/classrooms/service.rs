use anyhow::Context;
use courseboard_auth::Caller;
use courseboard_core::errors::{is_foreign_key_violation, unique_violation};
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::modules::classrooms::model::{
    AvailableClassroomParams, Classroom, ClassroomFilterParams, CreateClassroomDto,
    PaginatedClassroomsResponse, UpdateClassroomDto,
};

fn map_classroom_error(e: sqlx::Error) -> AppError {
    let constraint = unique_violation(&e).map(str::to_owned);
    match constraint.as_deref() {
        Some("classrooms_name_key") => {
            AppError::conflict("A classroom with this name already exists")
        }
        _ => AppError::database(e),
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &ClassroomFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(name) = &filters.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(min_capacity) = filters.min_capacity {
        query.push(" AND capacity >= ").push_bind(min_capacity);
    }
}

pub struct ClassroomService;

impl ClassroomService {
    #[instrument(skip(db, dto), fields(name = %dto.name))]
    pub async fn create_classroom(
        db: &PgPool,
        caller: &Caller,
        dto: CreateClassroomDto,
    ) -> Result<Classroom, AppError> {
        caller.require_admin()?;

        let classroom = sqlx::query_as::<_, Classroom>(
            r#"
            INSERT INTO classrooms (name, capacity, location, equipment)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(dto.capacity)
        .bind(&dto.location)
        .bind(&dto.equipment)
        .fetch_one(db)
        .await
        .map_err(map_classroom_error)?;

        courseboard_observability::track_entity_created("classroom");

        Ok(classroom)
    }

    #[instrument(skip(db))]
    pub async fn get_classrooms(
        db: &PgPool,
        filters: ClassroomFilterParams,
    ) -> Result<PaginatedClassroomsResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM classrooms");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count classrooms")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new("SELECT * FROM classrooms");
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let classrooms = data_query
            .build_query_as::<Classroom>()
            .fetch_all(db)
            .await
            .context("Failed to fetch classrooms")
            .map_err(AppError::database)?;

        Ok(PaginatedClassroomsResponse {
            data: classrooms,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    /// Classrooms free for a slot, or entirely unscheduled when no slot is
    /// given. Rows are only compared within the same week pattern.
    #[instrument(skip(db))]
    pub async fn get_available_classrooms(
        db: &PgPool,
        params: AvailableClassroomParams,
    ) -> Result<Vec<Classroom>, AppError> {
        params.validate().map_err(AppError::validation)?;

        if params.is_partial_slot() {
            return Err(AppError::non_field(
                "day_of_week, start_section and end_section must be given together",
            ));
        }

        let mut query = QueryBuilder::<Postgres>::new("SELECT c.* FROM classrooms c WHERE ");

        match params.slot() {
            Some(slot) => {
                if !slot.is_ordered() {
                    return Err(AppError::non_field(
                        "start_section must be less than end_section",
                    ));
                }

                query
                    .push(
                        "NOT EXISTS (SELECT 1 FROM schedules s \
                         WHERE s.classroom_id = c.id AND s.day_of_week = ",
                    )
                    .push_bind(slot.day_of_week)
                    .push(" AND s.week_pattern = ")
                    .push_bind(slot.week_pattern)
                    .push(" AND s.start_section < ")
                    .push_bind(slot.end_section)
                    .push(" AND ")
                    .push_bind(slot.start_section)
                    .push(" < s.end_section)");
            }
            None => {
                query.push("NOT EXISTS (SELECT 1 FROM schedules s WHERE s.classroom_id = c.id)");
            }
        }

        if let Some(min_capacity) = params.min_capacity {
            query.push(" AND c.capacity >= ").push_bind(min_capacity);
        }

        query.push(" ORDER BY c.name");

        let classrooms = query
            .build_query_as::<Classroom>()
            .fetch_all(db)
            .await
            .context("Failed to fetch available classrooms")
            .map_err(AppError::database)?;

        Ok(classrooms)
    }

    #[instrument(skip(db))]
    pub async fn get_classroom_by_id(db: &PgPool, id: Uuid) -> Result<Classroom, AppError> {
        sqlx::query_as::<_, Classroom>("SELECT * FROM classrooms WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch classroom by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Classroom not found")))
    }

    /// Courses already bound to the classroom keep the capacity they were
    /// given at assignment.
    #[instrument(skip(db, dto))]
    pub async fn update_classroom(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateClassroomDto,
    ) -> Result<Classroom, AppError> {
        caller.require_admin()?;

        sqlx::query_as::<_, Classroom>(
            r#"
            UPDATE classrooms
            SET name = COALESCE($2, name),
                capacity = COALESCE($3, capacity),
                location = COALESCE($4, location),
                equipment = CASE WHEN $5 THEN $6 ELSE equipment END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(dto.capacity)
        .bind(&dto.location)
        .bind(dto.equipment.is_some())
        .bind(dto.equipment.flatten())
        .fetch_optional(db)
        .await
        .map_err(map_classroom_error)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Classroom not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_classroom(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM classrooms WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::conflict("Classroom is in use by courses or schedules");
                }
                AppError::database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Classroom not found")));
        }

        Ok(())
    }
}
