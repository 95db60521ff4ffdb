use anyhow::Context;
use courseboard_auth::Caller;
use courseboard_core::errors::{foreign_key_violation, unique_violation};
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::teaching_assignments::model::{
    CreateTeachingAssignmentDto, PaginatedTeachingAssignmentsResponse, TeachingAssignment,
    TeachingAssignmentDetail, TeachingAssignmentFilterParams, UpdateTeachingAssignmentDto,
};

const DETAIL_SELECT: &str = r#"
    SELECT ta.id, ta.teacher_id, t.name AS teacher_name, ta.course_id,
           c.name AS course_name, c.code AS course_code, ta.teaching_hours, ta.assigned_at
    FROM teaching_assignments ta
    JOIN teachers t ON t.id = ta.teacher_id
    JOIN courses c ON c.id = ta.course_id
"#;

/// A teacher or course deleted between `ensure_exists` and the write
/// surfaces as a foreign-key violation.
fn map_assignment_error(e: sqlx::Error) -> AppError {
    if unique_violation(&e) == Some("teaching_assignments_teacher_course_key") {
        return AppError::conflict("teacher is already assigned to this course");
    }
    match foreign_key_violation(&e) {
        Some("teaching_assignments_teacher_id_fkey") => {
            AppError::field("teacher_id", "teacher does not exist")
        }
        Some("teaching_assignments_course_id_fkey") => {
            AppError::field("course_id", "course does not exist")
        }
        _ => AppError::database(e),
    }
}

async fn ensure_exists(
    conn: &mut PgConnection,
    table: &str,
    field: &str,
    id: Uuid,
) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"
    ))
    .bind(id)
    .fetch_one(conn)
    .await
    .with_context(|| format!("Failed to check {table}"))
    .map_err(AppError::database)?;

    if !exists {
        let entity = field.trim_end_matches("_id");
        return Err(AppError::field(field, format!("{entity} does not exist")));
    }

    Ok(())
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &TeachingAssignmentFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(teacher_id) = filters.teacher_id {
        query.push(" AND ta.teacher_id = ").push_bind(teacher_id);
    }
    if let Some(course_id) = filters.course_id {
        query.push(" AND ta.course_id = ").push_bind(course_id);
    }
}

pub struct TeachingAssignmentService;

impl TeachingAssignmentService {
    #[instrument(skip(db, dto), fields(teacher_id = %dto.teacher_id, course_id = %dto.course_id))]
    pub async fn create_assignment(
        db: &PgPool,
        caller: &Caller,
        dto: CreateTeachingAssignmentDto,
    ) -> Result<TeachingAssignment, AppError> {
        caller.require_admin()?;

        let mut conn = db
            .acquire()
            .await
            .context("Failed to acquire connection")
            .map_err(AppError::database)?;

        ensure_exists(&mut *conn, "teachers", "teacher_id", dto.teacher_id).await?;
        ensure_exists(&mut *conn, "courses", "course_id", dto.course_id).await?;

        let assignment = sqlx::query_as::<_, TeachingAssignment>(
            r#"
            INSERT INTO teaching_assignments (teacher_id, course_id, teaching_hours)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(dto.teacher_id)
        .bind(dto.course_id)
        .bind(dto.teaching_hours)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_assignment_error)?;

        courseboard_observability::track_entity_created("teaching_assignment");

        Ok(assignment)
    }

    #[instrument(skip(db))]
    pub async fn get_assignments(
        db: &PgPool,
        filters: TeachingAssignmentFilterParams,
    ) -> Result<PaginatedTeachingAssignmentsResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM teaching_assignments ta");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count teaching assignments")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new(DETAIL_SELECT);
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY c.code, t.name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let assignments = data_query
            .build_query_as::<TeachingAssignmentDetail>()
            .fetch_all(db)
            .await
            .context("Failed to fetch teaching assignments")
            .map_err(AppError::database)?;

        Ok(PaginatedTeachingAssignmentsResponse {
            data: assignments,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_assignment_by_id(
        db: &PgPool,
        id: Uuid,
    ) -> Result<TeachingAssignmentDetail, AppError> {
        sqlx::query_as::<_, TeachingAssignmentDetail>(&format!("{DETAIL_SELECT} WHERE ta.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch teaching assignment by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teaching assignment not found")))
    }

    pub async fn get_course_assignments(
        db: &PgPool,
        course_id: Uuid,
    ) -> Result<Vec<TeachingAssignmentDetail>, AppError> {
        sqlx::query_as::<_, TeachingAssignmentDetail>(&format!(
            "{DETAIL_SELECT} WHERE ta.course_id = $1 ORDER BY t.name"
        ))
        .bind(course_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch course teaching assignments")
        .map_err(AppError::database)
    }

    /// Moving an assignment to another course is refused while schedules
    /// still reference it.
    #[instrument(skip(db, dto))]
    pub async fn update_assignment(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateTeachingAssignmentDto,
    ) -> Result<TeachingAssignment, AppError> {
        caller.require_admin()?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let existing = sqlx::query_as::<_, TeachingAssignment>(
            "SELECT * FROM teaching_assignments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock teaching assignment")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teaching assignment not found")))?;

        let teacher_id = dto.teacher_id.unwrap_or(existing.teacher_id);
        let course_id = dto.course_id.unwrap_or(existing.course_id);

        if teacher_id != existing.teacher_id {
            ensure_exists(&mut *tx, "teachers", "teacher_id", teacher_id).await?;
        }

        if course_id != existing.course_id {
            ensure_exists(&mut *tx, "courses", "course_id", course_id).await?;

            let scheduled = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM schedules WHERE teaching_assignment_id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to check schedules")
            .map_err(AppError::database)?;

            if scheduled {
                return Err(AppError::field(
                    "course_id",
                    "teaching assignment is scheduled for its current course",
                ));
            }
        }

        let assignment = sqlx::query_as::<_, TeachingAssignment>(
            r#"
            UPDATE teaching_assignments
            SET teacher_id = $2, course_id = $3, teaching_hours = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(teacher_id)
        .bind(course_id)
        .bind(dto.teaching_hours.unwrap_or(existing.teaching_hours))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_assignment_error)?;

        tx.commit()
            .await
            .context("Failed to commit teaching assignment")
            .map_err(AppError::database)?;

        Ok(assignment)
    }

    /// Also removes the schedules built on the assignment.
    #[instrument(skip(db))]
    pub async fn delete_assignment(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM teaching_assignments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete teaching assignment")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Teaching assignment not found"
            )));
        }

        Ok(())
    }
}
