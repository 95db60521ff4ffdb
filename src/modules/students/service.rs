use anyhow::Context;
use courseboard_auth::Caller;
use courseboard_core::errors::unique_violation;
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};

fn map_student_error(e: sqlx::Error) -> AppError {
    let constraint = unique_violation(&e).map(str::to_owned);
    match constraint.as_deref() {
        Some("students_student_id_key") => {
            AppError::conflict("A student with this student number already exists")
        }
        Some("students_email_key") => AppError::conflict("A student with this email already exists"),
        _ => AppError::database(e),
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &StudentFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(name) = &filters.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(student_id) = &filters.student_id {
        query.push(" AND student_id = ").push_bind(student_id.clone());
    }
    if let Some(class_name) = &filters.class_name {
        query.push(" AND class_name = ").push_bind(class_name.clone());
    }
    if let Some(college) = &filters.college {
        query.push(" AND college = ").push_bind(college.clone());
    }
    if let Some(major) = &filters.major {
        query.push(" AND major = ").push_bind(major.clone());
    }
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, dto), fields(student_id = %dto.student_id))]
    pub async fn create_student(
        db: &PgPool,
        caller: &Caller,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        caller.require_admin()?;

        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (name, student_id, gender, age, class_name, college, major, email, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.student_id)
        .bind(&dto.gender)
        .bind(dto.age)
        .bind(&dto.class_name)
        .bind(&dto.college)
        .bind(&dto.major)
        .bind(&dto.email)
        .bind(&dto.phone)
        .fetch_one(db)
        .await
        .map_err(map_student_error)?;

        courseboard_observability::track_entity_created("student");

        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn get_students(
        db: &PgPool,
        filters: StudentFilterParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM students");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count students")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new("SELECT * FROM students");
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY student_id LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let students = data_query
            .build_query_as::<Student>()
            .fetch_all(db)
            .await
            .context("Failed to fetch students")
            .map_err(AppError::database)?;

        Ok(PaginatedStudentsResponse {
            data: students,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_student_by_id(db: &PgPool, id: Uuid) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch student by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_student(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        caller.require_admin()?;

        let existing = Self::get_student_by_id(db, id).await?;

        let student = sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = $2, student_id = $3, gender = $4, age = $5, class_name = $6,
                college = $7, major = $8, email = $9, phone = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dto.name.unwrap_or(existing.name))
        .bind(dto.student_id.unwrap_or(existing.student_id))
        .bind(dto.gender.unwrap_or(existing.gender))
        .bind(dto.age.unwrap_or(existing.age))
        .bind(dto.class_name.unwrap_or(existing.class_name))
        .bind(dto.college.unwrap_or(existing.college))
        .bind(dto.major.unwrap_or(existing.major))
        .bind(dto.email.unwrap_or(existing.email))
        .bind(dto.phone.or(existing.phone))
        .fetch_one(db)
        .await
        .map_err(map_student_error)?;

        Ok(student)
    }

    /// Also removes the student's enrollments.
    #[instrument(skip(db))]
    pub async fn delete_student(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete student")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{admin, caller_with, student_dto};
    use axum::http::StatusCode;
    use courseboard_auth::UserRole;
    use courseboard_core::PaginationParams;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_and_get_student(pool: PgPool) {
        let student = StudentService::create_student(&pool, &admin(), student_dto(1))
            .await
            .unwrap();

        let fetched = StudentService::get_student_by_id(&pool, student.id)
            .await
            .unwrap();
        assert_eq!(fetched, student);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_student_number_must_be_unique(pool: PgPool) {
        StudentService::create_student(&pool, &admin(), student_dto(1))
            .await
            .unwrap();

        let mut dto = student_dto(1);
        dto.email = "someone-else@example.com".to_string();
        let err = StudentService::create_student(&pool, &admin(), dto)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("student number"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_non_admin_cannot_create(pool: PgPool) {
        let err = StudentService::create_student(
            &pool,
            &caller_with(UserRole::Student),
            student_dto(1),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_get_students_filters(pool: PgPool) {
        for n in 1..=3 {
            let mut dto = student_dto(n);
            if n == 3 {
                dto.major = "Physics".to_string();
            }
            StudentService::create_student(&pool, &admin(), dto)
                .await
                .unwrap();
        }

        let filters = StudentFilterParams {
            name: None,
            student_id: None,
            class_name: None,
            college: None,
            major: Some("Physics".to_string()),
            pagination: PaginationParams::default(),
        };
        let page = StudentService::get_students(&pool, filters).await.unwrap();

        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].major, "Physics");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_keeps_unspecified_fields(pool: PgPool) {
        let student = StudentService::create_student(&pool, &admin(), student_dto(1))
            .await
            .unwrap();

        let dto = UpdateStudentDto {
            name: None,
            student_id: None,
            gender: None,
            age: Some(21),
            class_name: None,
            college: None,
            major: None,
            email: None,
            phone: None,
        };
        let updated = StudentService::update_student(&pool, &admin(), student.id, dto)
            .await
            .unwrap();

        assert_eq!(updated.age, 21);
        assert_eq!(updated.name, student.name);
        assert_eq!(updated.phone, student.phone);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_missing_student(pool: PgPool) {
        let err = StudentService::delete_student(&pool, &admin(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
