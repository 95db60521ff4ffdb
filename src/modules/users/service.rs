use courseboard_auth::Caller;
use courseboard_core::errors::unique_violation;
use courseboard_core::{AppError, PaginationMeta, hash_password};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::users::model::{
    CreateUserDto, PaginatedUsersResponse, UpdateProfileDto, UpdateUserDto, User,
    UserFilterParams,
};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, \
     phone_number, bio, avatar, created_at, updated_at";

fn map_user_error(e: sqlx::Error) -> AppError {
    let constraint = unique_violation(&e).map(str::to_owned);
    match constraint.as_deref() {
        Some("users_username_key") => AppError::conflict("A user with this username already exists"),
        Some("users_email_key") => AppError::conflict("A user with this email already exists"),
        _ => AppError::database(e),
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &UserFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(search) = &filters.search {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(role) = filters.role {
        query.push(" AND role = ").push_bind(role);
    }
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db, dto), fields(username = %dto.username))]
    pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<User, AppError> {
        let hashed_password = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, first_name, last_name, password, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&dto.username)
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&hashed_password)
        .bind(dto.role)
        .fetch_one(db)
        .await
        .map_err(map_user_error)?;

        courseboard_observability::track_entity_created("user");

        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn get_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

        let mut data_query = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY username LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let users = data_query.build_query_as::<User>().fetch_all(db).await?;

        Ok(PaginatedUsersResponse {
            data: users,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_user_by_id(db: &PgPool, id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    /// The account behind the caller's token.
    #[instrument(skip(db))]
    pub async fn get_profile(db: &PgPool, caller: &Caller) -> Result<User, AppError> {
        Self::get_user_by_id(db, caller.user_id).await
    }

    /// Edits the caller's own account. Outer `None` keeps a field, `Some(None)` clears it.
    #[instrument(skip(db, dto))]
    pub async fn update_profile(
        db: &PgPool,
        caller: &Caller,
        dto: UpdateProfileDto,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 phone_number = CASE WHEN $4 THEN $5 ELSE phone_number END,
                 bio = CASE WHEN $6 THEN $7 ELSE bio END,
                 avatar = CASE WHEN $8 THEN $9 ELSE avatar END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(caller.user_id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.phone_number.is_some())
        .bind(dto.phone_number.flatten())
        .bind(dto.bio.is_some())
        .bind(dto.bio.flatten())
        .bind(dto.avatar.is_some())
        .bind(dto.avatar.flatten())
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_user(db: &PgPool, id: Uuid, dto: UpdateUserDto) -> Result<User, AppError> {
        let hashed_password = dto.password.as_deref().map(hash_password).transpose()?;

        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email = COALESCE($2, email),
                 first_name = COALESCE($3, first_name),
                 last_name = COALESCE($4, last_name),
                 password = COALESCE($5, password),
                 role = COALESCE($6, role),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&hashed_password)
        .bind(dto.role)
        .fetch_optional(db)
        .await
        .map_err(map_user_error)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    /// Admins cannot delete their own account.
    #[instrument(skip(db))]
    pub async fn delete_user(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        if caller.user_id == id {
            return Err(AppError::conflict("You cannot delete your own account"));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("User not found")));
        }

        Ok(())
    }
}
