use anyhow::Context;
use courseboard_auth::Caller;
use courseboard_core::errors::unique_violation;
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::classrooms::model::Classroom;
use crate::modules::courses::capacity::{Placement, derive_capacity};
use crate::modules::courses::model::{
    Course, CourseDetail, CourseFilterParams, CourseSearchParams, CourseStatus, CreateCourseDto,
    PaginatedCoursesResponse, TeachingMethod, UpdateCourseDto,
};
use crate::modules::enrollments::service::EnrollmentService;
use crate::modules::teachers::model::Teacher;
use crate::modules::teaching_assignments::service::TeachingAssignmentService;

fn map_course_error(e: sqlx::Error) -> AppError {
    let constraint = unique_violation(&e).map(str::to_owned);
    match constraint.as_deref() {
        Some("courses_code_key") => AppError::conflict("A course with this code already exists"),
        _ => AppError::database(e),
    }
}

/// Loads the classroom named by a request body.
async fn load_classroom(conn: &mut PgConnection, id: Uuid) -> Result<Classroom, AppError> {
    sqlx::query_as::<_, Classroom>("SELECT * FROM classrooms WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch classroom")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::field("classroom_id", "classroom does not exist"))
}

/// The classroom to bind for this write. Online courses never load one.
async fn requested_classroom(
    conn: &mut PgConnection,
    teaching_method: TeachingMethod,
    classroom_id: Option<Uuid>,
) -> Result<Option<Classroom>, AppError> {
    match (teaching_method, classroom_id) {
        (TeachingMethod::Offline, Some(id)) => Ok(Some(load_classroom(conn, id).await?)),
        _ => Ok(None),
    }
}

async fn count_enrollments(conn: &mut PgConnection, course_id: Uuid) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(conn)
        .await
        .context("Failed to count enrollments")
        .map_err(AppError::database)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &CourseFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(course_type) = filters.course_type {
        query.push(" AND course_type = ").push_bind(course_type);
    }
    if let Some(semester) = &filters.semester {
        query.push(" AND semester = ").push_bind(semester.clone());
    }
    if let Some(teaching_method) = filters.teaching_method {
        query.push(" AND teaching_method = ").push_bind(teaching_method);
    }
}

fn push_search(query: &mut QueryBuilder<'_, Postgres>, params: &CourseSearchParams) {
    query.push(" WHERE 1 = 1");

    if let Some(name) = &params.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(code) = &params.code {
        query.push(" AND code ILIKE ").push_bind(format!("%{}%", code));
    }
    if let Some(course_type) = params.course_type {
        query.push(" AND course_type = ").push_bind(course_type);
    }
    if let Some(semester) = &params.semester {
        query.push(" AND semester = ").push_bind(semester.clone());
    }
    if let Some(teaching_method) = params.teaching_method {
        query.push(" AND teaching_method = ").push_bind(teaching_method);
    }
    if let Some(min_credits) = params.min_credits {
        query.push(" AND credits >= ").push_bind(min_credits);
    }
    if let Some(max_credits) = params.max_credits {
        query.push(" AND credits <= ").push_bind(max_credits);
    }
}

pub struct CourseService;

impl CourseService {
    #[instrument(skip(db, dto), fields(code = %dto.code))]
    pub async fn create_course(
        db: &PgPool,
        caller: &Caller,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        caller.require_admin()?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let classroom =
            requested_classroom(&mut *tx, dto.teaching_method, dto.classroom_id).await?;
        let placement = derive_capacity(dto.teaching_method, classroom.as_ref(), None)?;

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (name, code, course_type, credits, total_hours, teaching_method,
                                 max_students, classroom_id, semester, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.code)
        .bind(dto.course_type)
        .bind(dto.credits)
        .bind(dto.total_hours)
        .bind(dto.teaching_method)
        .bind(placement.max_students)
        .bind(placement.classroom_id)
        .bind(&dto.semester)
        .bind(&dto.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_course_error)?;

        tx.commit()
            .await
            .context("Failed to commit course")
            .map_err(AppError::database)?;

        courseboard_observability::track_course_capacity_derived(course.teaching_method.as_str());
        courseboard_observability::track_entity_created("course");

        Ok(course)
    }

    #[instrument(skip(db))]
    pub async fn get_courses(
        db: &PgPool,
        filters: CourseFilterParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM courses");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count courses")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new("SELECT * FROM courses");
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY code LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let courses = data_query
            .build_query_as::<Course>()
            .fetch_all(db)
            .await
            .context("Failed to fetch courses")
            .map_err(AppError::database)?;

        Ok(PaginatedCoursesResponse {
            data: courses,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn search_courses(
        db: &PgPool,
        params: CourseSearchParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM courses");
        push_search(&mut count_query, &params);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count courses")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new("SELECT * FROM courses");
        push_search(&mut data_query, &params);
        data_query
            .push(" ORDER BY code LIMIT ")
            .push_bind(params.pagination.limit())
            .push(" OFFSET ")
            .push_bind(params.pagination.offset());
        let courses = data_query
            .build_query_as::<Course>()
            .fetch_all(db)
            .await
            .context("Failed to search courses")
            .map_err(AppError::database)?;

        Ok(PaginatedCoursesResponse {
            data: courses,
            meta: PaginationMeta::from_params(total, &params.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_course_by_id(db: &PgPool, id: Uuid) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch course by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    /// The course with its classroom, teachers, enrollments and assignments.
    #[instrument(skip(db))]
    pub async fn get_course_detail(db: &PgPool, id: Uuid) -> Result<CourseDetail, AppError> {
        let course = Self::get_course_by_id(db, id).await?;

        let classroom = match course.classroom_id {
            Some(classroom_id) => {
                sqlx::query_as::<_, Classroom>("SELECT * FROM classrooms WHERE id = $1")
                    .bind(classroom_id)
                    .fetch_optional(db)
                    .await
                    .context("Failed to fetch course classroom")
                    .map_err(AppError::database)?
            }
            None => None,
        };

        let teachers = sqlx::query_as::<_, Teacher>(
            r#"
            SELECT t.*
            FROM teachers t
            JOIN teaching_assignments ta ON ta.teacher_id = t.id
            WHERE ta.course_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(id)
        .fetch_all(db)
        .await
        .context("Failed to fetch course teachers")
        .map_err(AppError::database)?;

        let enrollments = EnrollmentService::get_course_enrollments(db, id).await?;
        let teaching_assignments = TeachingAssignmentService::get_course_assignments(db, id).await?;

        Ok(CourseDetail {
            course,
            classroom,
            teachers,
            enrollments,
            teaching_assignments,
        })
    }

    #[instrument(skip(db))]
    pub async fn get_course_status(db: &PgPool, id: Uuid) -> Result<CourseStatus, AppError> {
        let course = Self::get_course_by_id(db, id).await?;

        let mut conn = db
            .acquire()
            .await
            .context("Failed to acquire connection")
            .map_err(AppError::database)?;
        let current_students = count_enrollments(&mut *conn, id).await?;

        Ok(CourseStatus::new(id, current_students, course.max_students))
    }

    /// Re-derives the placement from the merged teaching method and
    /// classroom while the course row is locked.
    #[instrument(skip(db, dto))]
    pub async fn update_course(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        caller.require_admin()?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let existing =
            sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock course")
                .map_err(AppError::database)?
                .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))?;

        let teaching_method = dto.teaching_method.unwrap_or(existing.teaching_method);
        let classroom = requested_classroom(&mut *tx, teaching_method, dto.classroom_id).await?;
        let current = Placement {
            classroom_id: existing.classroom_id,
            max_students: existing.max_students,
        };
        let placement = derive_capacity(teaching_method, classroom.as_ref(), Some(current))?;

        if placement.max_students < existing.max_students {
            let enrolled = count_enrollments(&mut *tx, id).await?;
            if enrolled > i64::from(placement.max_students) {
                return Err(AppError::field(
                    "classroom_id",
                    format!(
                        "classroom capacity {} is below the current enrollment of {}",
                        placement.max_students, enrolled
                    ),
                ));
            }
        }

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET name = $2, code = $3, course_type = $4, credits = $5, total_hours = $6,
                teaching_method = $7, max_students = $8, classroom_id = $9, semester = $10,
                description = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dto.name.unwrap_or(existing.name))
        .bind(dto.code.unwrap_or(existing.code))
        .bind(dto.course_type.unwrap_or(existing.course_type))
        .bind(dto.credits.unwrap_or(existing.credits))
        .bind(dto.total_hours.unwrap_or(existing.total_hours))
        .bind(teaching_method)
        .bind(placement.max_students)
        .bind(placement.classroom_id)
        .bind(dto.semester.unwrap_or(existing.semester))
        .bind(dto.description.unwrap_or(existing.description))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_course_error)?;

        tx.commit()
            .await
            .context("Failed to commit course")
            .map_err(AppError::database)?;

        courseboard_observability::track_course_capacity_derived(teaching_method.as_str());

        Ok(course)
    }

    /// Removes the course's schedules, enrollments and teaching assignments,
    /// then the course, in one transaction.
    #[instrument(skip(db))]
    pub async fn delete_course(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let locked =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock course")
                .map_err(AppError::database)?;

        if locked.is_none() {
            return Err(AppError::not_found(anyhow::anyhow!("Course not found")));
        }

        for statement in [
            "DELETE FROM schedules WHERE course_id = $1",
            "DELETE FROM enrollments WHERE course_id = $1",
            "DELETE FROM teaching_assignments WHERE course_id = $1",
            "DELETE FROM courses WHERE id = $1",
        ] {
            sqlx::query(statement)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete course")
                .map_err(AppError::database)?;
        }

        tx.commit()
            .await
            .context("Failed to commit course deletion")
            .map_err(AppError::database)?;

        Ok(())
    }
}
