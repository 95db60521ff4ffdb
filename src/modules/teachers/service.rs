use anyhow::Context;
use courseboard_auth::Caller;
use courseboard_core::AppError;
use courseboard_core::PaginationMeta;
use courseboard_core::errors::{is_foreign_key_violation, unique_violation};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::teachers::model::{
    CreateTeacherDto, PaginatedTeachersResponse, Teacher, TeacherFilterParams, UpdateTeacherDto,
};

fn map_teacher_error(e: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&e) {
        return AppError::field("user_id", "user does not exist");
    }

    let constraint = unique_violation(&e).map(str::to_owned);
    match constraint.as_deref() {
        Some("teachers_email_key") => AppError::conflict("A teacher with this email already exists"),
        Some("teachers_user_id_key") => {
            AppError::conflict("This user account is already linked to a teacher")
        }
        _ => AppError::database(e),
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &TeacherFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(name) = &filters.name {
        query.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(department) = &filters.department {
        query.push(" AND department = ").push_bind(department.clone());
    }
    if let Some(title) = &filters.title {
        query.push(" AND title = ").push_bind(title.clone());
    }
}

pub struct TeacherService;

impl TeacherService {
    #[instrument(skip(db, dto))]
    pub async fn create_teacher(
        db: &PgPool,
        caller: &Caller,
        dto: CreateTeacherDto,
    ) -> Result<Teacher, AppError> {
        caller.require_admin()?;

        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            INSERT INTO teachers (name, age, gender, title, department, email, phone, avatar, hire_date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(dto.age)
        .bind(&dto.gender)
        .bind(&dto.title)
        .bind(&dto.department)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.avatar)
        .bind(dto.hire_date)
        .bind(dto.user_id)
        .fetch_one(db)
        .await
        .map_err(map_teacher_error)?;

        courseboard_observability::track_entity_created("teacher");

        Ok(teacher)
    }

    #[instrument(skip(db))]
    pub async fn get_teachers(
        db: &PgPool,
        filters: TeacherFilterParams,
    ) -> Result<PaginatedTeachersResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM teachers");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count teachers")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new("SELECT * FROM teachers");
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let teachers = data_query
            .build_query_as::<Teacher>()
            .fetch_all(db)
            .await
            .context("Failed to fetch teachers")
            .map_err(AppError::database)?;

        Ok(PaginatedTeachersResponse {
            data: teachers,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_teacher_by_id(db: &PgPool, id: Uuid) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch teacher by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_teacher(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateTeacherDto,
    ) -> Result<Teacher, AppError> {
        caller.require_admin()?;

        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            UPDATE teachers
            SET name = COALESCE($2, name),
                age = COALESCE($3, age),
                gender = COALESCE($4, gender),
                title = COALESCE($5, title),
                department = COALESCE($6, department),
                email = COALESCE($7, email),
                phone = COALESCE($8, phone),
                avatar = COALESCE($9, avatar),
                hire_date = COALESCE($10, hire_date),
                user_id = COALESCE($11, user_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(dto.age)
        .bind(&dto.gender)
        .bind(&dto.title)
        .bind(&dto.department)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&dto.avatar)
        .bind(dto.hire_date)
        .bind(dto.user_id)
        .fetch_optional(db)
        .await
        .map_err(map_teacher_error)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))?;

        Ok(teacher)
    }

    /// Also removes the teacher's assignments and the schedules built on them.
    #[instrument(skip(db))]
    pub async fn delete_teacher(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete teacher")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Teacher not found")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{admin, caller_with, teacher_dto};
    use axum::http::StatusCode;
    use courseboard_auth::UserRole;
    use courseboard_core::NON_FIELD_ERRORS;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_teacher(pool: PgPool) {
        let teacher = TeacherService::create_teacher(&pool, &admin(), teacher_dto(1))
            .await
            .unwrap();

        assert_eq!(teacher.email, "teacher1@example.com");
        assert!(teacher.user_id.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_user_id_is_field_error(pool: PgPool) {
        let mut dto = teacher_dto(1);
        dto.user_id = Some(Uuid::new_v4());

        let err = TeacherService::create_teacher(&pool, &admin(), dto)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let fields = err.fields.unwrap();
        assert!(fields.contains_key("user_id"));
        assert!(!fields.contains_key(NON_FIELD_ERRORS));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_email_is_conflict(pool: PgPool) {
        TeacherService::create_teacher(&pool, &admin(), teacher_dto(1))
            .await
            .unwrap();

        let err = TeacherService::create_teacher(&pool, &admin(), teacher_dto(1))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.to_string().contains("email"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_teacher_title(pool: PgPool) {
        let teacher = TeacherService::create_teacher(&pool, &admin(), teacher_dto(1))
            .await
            .unwrap();

        let dto = UpdateTeacherDto {
            name: None,
            age: None,
            gender: None,
            title: Some("Professor".to_string()),
            department: None,
            email: None,
            phone: None,
            avatar: None,
            hire_date: None,
            user_id: None,
        };
        let updated = TeacherService::update_teacher(&pool, &admin(), teacher.id, dto)
            .await
            .unwrap();

        assert_eq!(updated.title, "Professor");
        assert_eq!(updated.department, teacher.department);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_teacher_role_cannot_delete(pool: PgPool) {
        let teacher = TeacherService::create_teacher(&pool, &admin(), teacher_dto(1))
            .await
            .unwrap();

        let err =
            TeacherService::delete_teacher(&pool, &caller_with(UserRole::Teacher), teacher.id)
                .await
                .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
