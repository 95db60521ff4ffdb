//! The enrollment ledger and its capacity gate.
//!
//! Enrolling locks the course row for the rest of the transaction, so
//! concurrent requests for one course are serialized and each sees the
//! committed count of the ones before it.

use anyhow::Context;
use courseboard_auth::{Caller, UserRole};
use courseboard_core::errors::unique_violation;
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentDetail, EnrollmentFilterParams,
    PaginatedEnrollmentsResponse, UpdateEnrollmentDto,
};

const DUPLICATE_ENROLLMENT: &str = "student is already enrolled in this course";
const ENROLLMENT_LIMIT_REACHED: &str = "course enrollment limit reached";

const DETAIL_SELECT: &str = r#"
    SELECT e.id, e.student_id, s.name AS student_name, s.student_id AS student_number,
           e.course_id, c.name AS course_name, c.code AS course_code, e.enrolled_at, e.score
    FROM enrollments e
    JOIN students s ON s.id = e.student_id
    JOIN courses c ON c.id = e.course_id
"#;

fn reject_duplicate() -> AppError {
    courseboard_observability::track_enrollment_rejected("duplicate");
    AppError::conflict(DUPLICATE_ENROLLMENT)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &EnrollmentFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(student_id) = filters.student_id {
        query.push(" AND e.student_id = ").push_bind(student_id);
    }
    if let Some(course_id) = filters.course_id {
        query.push(" AND e.course_id = ").push_bind(course_id);
    }
}

pub struct EnrollmentService;

impl EnrollmentService {
    #[instrument(skip(db, dto), fields(student_id = %dto.student_id, course_id = %dto.course_id))]
    pub async fn create_enrollment(
        db: &PgPool,
        caller: &Caller,
        dto: CreateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        caller.require_any(&[UserRole::Admin, UserRole::Student])?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let max_students = sqlx::query_scalar::<_, i32>(
            "SELECT max_students FROM courses WHERE id = $1 FOR UPDATE",
        )
        .bind(dto.course_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock course")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::field("course_id", "course does not exist"))?;

        let student_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)",
        )
        .bind(dto.student_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check student")
        .map_err(AppError::database)?;

        if !student_exists {
            return Err(AppError::field("student_id", "student does not exist"));
        }

        let already_enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE student_id = $1 AND course_id = $2)",
        )
        .bind(dto.student_id)
        .bind(dto.course_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check existing enrollment")
        .map_err(AppError::database)?;

        if already_enrolled {
            return Err(reject_duplicate());
        }

        let enrolled = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1",
        )
        .bind(dto.course_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count enrollments")
        .map_err(AppError::database)?;

        if enrolled >= i64::from(max_students) {
            courseboard_observability::track_enrollment_rejected("capacity");
            return Err(AppError::conflict(ENROLLMENT_LIMIT_REACHED));
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (student_id, course_id, score)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(dto.student_id)
        .bind(dto.course_id)
        .bind(dto.score)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e) == Some("enrollments_student_course_key") {
                return reject_duplicate();
            }
            AppError::database(e)
        })?;

        tx.commit()
            .await
            .context("Failed to commit enrollment")
            .map_err(AppError::database)?;

        courseboard_observability::track_enrollment_accepted();

        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn get_enrollments(
        db: &PgPool,
        filters: EnrollmentFilterParams,
    ) -> Result<PaginatedEnrollmentsResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM enrollments e");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count enrollments")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new(DETAIL_SELECT);
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY e.enrolled_at DESC, e.id LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let enrollments = data_query
            .build_query_as::<EnrollmentDetail>()
            .fetch_all(db)
            .await
            .context("Failed to fetch enrollments")
            .map_err(AppError::database)?;

        Ok(PaginatedEnrollmentsResponse {
            data: enrollments,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_enrollment_by_id(db: &PgPool, id: Uuid) -> Result<EnrollmentDetail, AppError> {
        sqlx::query_as::<_, EnrollmentDetail>(&format!("{DETAIL_SELECT} WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch enrollment by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))
    }

    pub async fn get_course_enrollments(
        db: &PgPool,
        course_id: Uuid,
    ) -> Result<Vec<EnrollmentDetail>, AppError> {
        sqlx::query_as::<_, EnrollmentDetail>(&format!(
            "{DETAIL_SELECT} WHERE e.course_id = $1 ORDER BY s.student_id"
        ))
        .bind(course_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch course enrollments")
        .map_err(AppError::database)
    }

    /// Replaces the score. A `null` score clears it.
    #[instrument(skip(db, dto))]
    pub async fn update_enrollment(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        caller.require_any(&[UserRole::Admin, UserRole::Teacher])?;

        sqlx::query_as::<_, Enrollment>(
            "UPDATE enrollments SET score = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(dto.score)
        .fetch_optional(db)
        .await
        .context("Failed to update enrollment")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_enrollment(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
    ) -> Result<(), AppError> {
        caller.require_any(&[UserRole::Admin, UserRole::Student])?;

        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete enrollment")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Enrollment not found")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        admin, caller_with, create_classroom, create_offline_course, create_student,
    };
    use axum::http::StatusCode;
    use courseboard_core::PaginationParams;

    fn dto(student_id: Uuid, course_id: Uuid) -> CreateEnrollmentDto {
        CreateEnrollmentDto {
            student_id,
            course_id,
            score: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_enroll_student(pool: PgPool) {
        let classroom = create_classroom(&pool, "A101", 5).await;
        let course = create_offline_course(&pool, "CS101", classroom.id).await;
        let student = create_student(&pool, 1).await;

        let enrollment = EnrollmentService::create_enrollment(
            &pool,
            &caller_with(UserRole::Student),
            dto(student.id, course.id),
        )
        .await
        .unwrap();

        let detail = EnrollmentService::get_enrollment_by_id(&pool, enrollment.id)
            .await
            .unwrap();
        assert_eq!(detail.student_number, student.student_id);
        assert_eq!(detail.course_code, "CS101");
        assert_eq!(detail.score, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_enrollment_is_conflict(pool: PgPool) {
        let classroom = create_classroom(&pool, "A101", 5).await;
        let course = create_offline_course(&pool, "CS101", classroom.id).await;
        let student = create_student(&pool, 1).await;

        EnrollmentService::create_enrollment(&pool, &admin(), dto(student.id, course.id))
            .await
            .unwrap();
        let err = EnrollmentService::create_enrollment(&pool, &admin(), dto(student.id, course.id))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error.to_string(), DUPLICATE_ENROLLMENT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_capacity_gate(pool: PgPool) {
        let classroom = create_classroom(&pool, "A101", 2).await;
        let course = create_offline_course(&pool, "CS101", classroom.id).await;

        for n in 1..=2 {
            let student = create_student(&pool, n).await;
            EnrollmentService::create_enrollment(&pool, &admin(), dto(student.id, course.id))
                .await
                .unwrap();
        }

        let third = create_student(&pool, 3).await;
        let err = EnrollmentService::create_enrollment(&pool, &admin(), dto(third.id, course.id))
            .await
            .unwrap_err();
        assert_eq!(err.error.to_string(), ENROLLMENT_LIMIT_REACHED);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_missing_references_are_field_errors(pool: PgPool) {
        let classroom = create_classroom(&pool, "A101", 2).await;
        let course = create_offline_course(&pool, "CS101", classroom.id).await;
        let student = create_student(&pool, 1).await;

        let unknown_course = dto(student.id, Uuid::new_v4());
        let err = EnrollmentService::create_enrollment(&pool, &admin(), unknown_course)
            .await
            .unwrap_err();
        assert!(err.fields.unwrap().contains_key("course_id"));

        let unknown_student = dto(Uuid::new_v4(), course.id);
        let err = EnrollmentService::create_enrollment(&pool, &admin(), unknown_student)
            .await
            .unwrap_err();
        assert!(err.fields.unwrap().contains_key("student_id"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_roles(pool: PgPool) {
        let classroom = create_classroom(&pool, "A101", 2).await;
        let course = create_offline_course(&pool, "CS101", classroom.id).await;
        let student = create_student(&pool, 1).await;

        let err = EnrollmentService::create_enrollment(
            &pool,
            &caller_with(UserRole::Teacher),
            dto(student.id, course.id),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let enrollment =
            EnrollmentService::create_enrollment(&pool, &admin(), dto(student.id, course.id))
                .await
                .unwrap();

        let scored = EnrollmentService::update_enrollment(
            &pool,
            &caller_with(UserRole::Teacher),
            enrollment.id,
            UpdateEnrollmentDto { score: Some(88.5) },
        )
        .await
        .unwrap();
        assert_eq!(scored.score, Some(88.5));

        let err = EnrollmentService::update_enrollment(
            &pool,
            &caller_with(UserRole::Student),
            enrollment.id,
            UpdateEnrollmentDto { score: Some(100.0) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_filter_by_course(pool: PgPool) {
        let classroom = create_classroom(&pool, "A101", 10).await;
        let first = create_offline_course(&pool, "CS101", classroom.id).await;
        let second = create_offline_course(&pool, "CS102", classroom.id).await;
        let student = create_student(&pool, 1).await;

        for course_id in [first.id, second.id] {
            EnrollmentService::create_enrollment(&pool, &admin(), dto(student.id, course_id))
                .await
                .unwrap();
        }

        let filters = EnrollmentFilterParams {
            student_id: Some(student.id),
            course_id: Some(second.id),
            pagination: PaginationParams::default(),
        };
        let page = EnrollmentService::get_enrollments(&pool, filters).await.unwrap();

        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].course_id, second.id);
    }
}
