//! Staff roles and their grants to teachers.
//!
//! Admins read everything. A teacher reads only the roles granted to the
//! teacher record linked to their account. Students read nothing.

use anyhow::Context;
use courseboard_auth::{Caller, UserRole};
use courseboard_core::errors::{foreign_key_violation, unique_violation};
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::teacher_roles::model::{
    BatchAssignResponse, BatchAssignRolesDto, CreateRoleDto, CreateTeacherRoleDto,
    PaginatedRolesResponse, PaginatedTeacherRolesResponse, Role, RoleFilterParams, TeacherRole,
    TeacherRoleDetail, TeacherRoleFilterParams, UpdateRoleDto,
};

const GRANT_SELECT: &str = r#"
    SELECT tr.id, tr.teacher_id, t.name AS teacher_name, tr.role_id,
           r.name AS role_name, tr.assigned_at
    FROM teacher_roles tr
    JOIN teachers t ON t.id = tr.teacher_id
    JOIN roles r ON r.id = tr.role_id
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadScope {
    All,
    /// The teacher record whose `user_id` is this account.
    LinkedTeacher(Uuid),
    Nothing,
}

impl ReadScope {
    fn of(caller: &Caller) -> Self {
        match caller.role {
            UserRole::Admin => ReadScope::All,
            UserRole::Teacher => ReadScope::LinkedTeacher(caller.user_id),
            UserRole::Student => ReadScope::Nothing,
        }
    }
}

fn map_role_error(e: sqlx::Error) -> AppError {
    if unique_violation(&e) == Some("roles_name_key") {
        return AppError::conflict("A role with this name already exists");
    }
    AppError::database(e)
}

fn map_grant_error(e: sqlx::Error) -> AppError {
    if unique_violation(&e) == Some("teacher_roles_teacher_role_key") {
        return AppError::conflict("teacher already has this role");
    }
    match foreign_key_violation(&e) {
        Some("teacher_roles_teacher_id_fkey") => {
            AppError::field("teacher_id", "teacher does not exist")
        }
        Some("teacher_roles_role_id_fkey") => AppError::field("role_id", "role does not exist"),
        _ => AppError::database(e),
    }
}

fn push_role_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    scope: ReadScope,
    filters: &RoleFilterParams,
) {
    query.push(" WHERE 1 = 1");

    if let Some(name) = &filters.name {
        query.push(" AND r.name ILIKE ").push_bind(format!("%{}%", name));
    }

    push_role_scope(query, scope);
}

fn push_role_scope(query: &mut QueryBuilder<'_, Postgres>, scope: ReadScope) {
    match scope {
        ReadScope::All => {}
        ReadScope::LinkedTeacher(user_id) => {
            query
                .push(
                    " AND r.id IN (SELECT tr.role_id FROM teacher_roles tr \
                     JOIN teachers t ON t.id = tr.teacher_id WHERE t.user_id = ",
                )
                .push_bind(user_id)
                .push(")");
        }
        ReadScope::Nothing => {
            query.push(" AND FALSE");
        }
    }
}

fn push_grant_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    scope: ReadScope,
    filters: &TeacherRoleFilterParams,
) {
    query.push(" WHERE 1 = 1");

    if let Some(teacher_id) = filters.teacher_id {
        query.push(" AND tr.teacher_id = ").push_bind(teacher_id);
    }
    if let Some(role_id) = filters.role_id {
        query.push(" AND tr.role_id = ").push_bind(role_id);
    }

    push_grant_scope(query, scope);
}

fn push_grant_scope(query: &mut QueryBuilder<'_, Postgres>, scope: ReadScope) {
    match scope {
        ReadScope::All => {}
        ReadScope::LinkedTeacher(user_id) => {
            query.push(" AND t.user_id = ").push_bind(user_id);
        }
        ReadScope::Nothing => {
            query.push(" AND FALSE");
        }
    }
}

/// Ids from `wanted` with no row in `table`. The found rows stay
/// key-share locked until the transaction ends.
async fn missing_ids(
    conn: &mut sqlx::PgConnection,
    table: &str,
    wanted: &[Uuid],
) -> Result<Vec<Uuid>, AppError> {
    let found = sqlx::query_scalar::<_, Uuid>(&format!(
        "SELECT id FROM {table} WHERE id = ANY($1) ORDER BY id FOR KEY SHARE"
    ))
    .bind(wanted)
    .fetch_all(conn)
    .await
    .with_context(|| format!("Failed to lock {table}"))
    .map_err(AppError::database)?;

    let mut missing: Vec<Uuid> = wanted
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();
    missing.sort();
    missing.dedup();

    Ok(missing)
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct RoleService;

impl RoleService {
    #[instrument(skip(db, dto), fields(name = %dto.name))]
    pub async fn create_role(
        db: &PgPool,
        caller: &Caller,
        dto: CreateRoleDto,
    ) -> Result<Role, AppError> {
        caller.require_admin()?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description, permissions)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.permissions)
        .fetch_one(db)
        .await
        .map_err(map_role_error)?;

        courseboard_observability::track_entity_created("role");

        Ok(role)
    }

    #[instrument(skip(db))]
    pub async fn get_roles(
        db: &PgPool,
        caller: &Caller,
        filters: RoleFilterParams,
    ) -> Result<PaginatedRolesResponse, AppError> {
        let scope = ReadScope::of(caller);

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM roles r");
        push_role_filters(&mut count_query, scope, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count roles")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new("SELECT r.* FROM roles r");
        push_role_filters(&mut data_query, scope, &filters);
        data_query
            .push(" ORDER BY r.name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let roles = data_query
            .build_query_as::<Role>()
            .fetch_all(db)
            .await
            .context("Failed to fetch roles")
            .map_err(AppError::database)?;

        Ok(PaginatedRolesResponse {
            data: roles,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    /// Roles outside the caller's scope are reported as missing.
    #[instrument(skip(db))]
    pub async fn get_role_by_id(db: &PgPool, caller: &Caller, id: Uuid) -> Result<Role, AppError> {
        let mut query = QueryBuilder::new("SELECT r.* FROM roles r WHERE r.id = ");
        query.push_bind(id);
        push_role_scope(&mut query, ReadScope::of(caller));

        query
            .build_query_as::<Role>()
            .fetch_optional(db)
            .await
            .context("Failed to fetch role by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Role not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_role(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateRoleDto,
    ) -> Result<Role, AppError> {
        caller.require_admin()?;

        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                permissions = COALESCE($4, permissions),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.permissions)
        .fetch_optional(db)
        .await
        .map_err(map_role_error)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Role not found")))
    }

    /// Also revokes the role from every teacher holding it.
    #[instrument(skip(db))]
    pub async fn delete_role(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete role")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Role not found")));
        }

        Ok(())
    }
}

pub struct TeacherRoleService;

impl TeacherRoleService {
    #[instrument(skip(db, dto), fields(teacher_id = %dto.teacher_id, role_id = %dto.role_id))]
    pub async fn create_teacher_role(
        db: &PgPool,
        caller: &Caller,
        dto: CreateTeacherRoleDto,
    ) -> Result<TeacherRole, AppError> {
        caller.require_admin()?;

        let grant = sqlx::query_as::<_, TeacherRole>(
            r#"
            INSERT INTO teacher_roles (teacher_id, role_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(dto.teacher_id)
        .bind(dto.role_id)
        .fetch_one(db)
        .await
        .map_err(map_grant_error)?;

        courseboard_observability::track_entity_created("teacher_role");

        Ok(grant)
    }

    /// Grants every role to every teacher in one transaction. Pairs that
    /// already exist are skipped; unknown ids reject the whole batch.
    #[instrument(skip(db, dto), fields(teachers = dto.teacher_ids.len(), roles = dto.role_ids.len()))]
    pub async fn batch_assign(
        db: &PgPool,
        caller: &Caller,
        dto: BatchAssignRolesDto,
    ) -> Result<BatchAssignResponse, AppError> {
        if !caller.is_admin() {
            return Err(AppError::forbidden(
                "Only administrators can batch assign roles".to_string(),
            ));
        }

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        let missing_teachers = missing_ids(&mut *tx, "teachers", &dto.teacher_ids).await?;
        if !missing_teachers.is_empty() {
            return Err(AppError::field(
                "teacher_ids",
                format!("teachers do not exist: {}", join_ids(&missing_teachers)),
            ));
        }

        let missing_roles = missing_ids(&mut *tx, "roles", &dto.role_ids).await?;
        if !missing_roles.is_empty() {
            return Err(AppError::field(
                "role_ids",
                format!("roles do not exist: {}", join_ids(&missing_roles)),
            ));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO teacher_roles (teacher_id, role_id)
            SELECT DISTINCT t.teacher_id, r.role_id
            FROM UNNEST($1::uuid[]) AS t(teacher_id)
            CROSS JOIN UNNEST($2::uuid[]) AS r(role_id)
            ON CONFLICT (teacher_id, role_id) DO NOTHING
            "#,
        )
        .bind(&dto.teacher_ids)
        .bind(&dto.role_ids)
        .execute(&mut *tx)
        .await
        .context("Failed to assign roles")
        .map_err(AppError::database)?;

        tx.commit()
            .await
            .context("Failed to commit role assignment")
            .map_err(AppError::database)?;

        let created_count = result.rows_affected() as i64;

        Ok(BatchAssignResponse {
            message: format!("Assigned {created_count} teacher roles"),
            created_count,
        })
    }

    #[instrument(skip(db))]
    pub async fn get_teacher_roles(
        db: &PgPool,
        caller: &Caller,
        filters: TeacherRoleFilterParams,
    ) -> Result<PaginatedTeacherRolesResponse, AppError> {
        let scope = ReadScope::of(caller);

        let mut count_query = QueryBuilder::new(
            "SELECT COUNT(*) FROM teacher_roles tr JOIN teachers t ON t.id = tr.teacher_id",
        );
        push_grant_filters(&mut count_query, scope, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count teacher roles")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new(GRANT_SELECT);
        push_grant_filters(&mut data_query, scope, &filters);
        data_query
            .push(" ORDER BY t.name, r.name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let grants = data_query
            .build_query_as::<TeacherRoleDetail>()
            .fetch_all(db)
            .await
            .context("Failed to fetch teacher roles")
            .map_err(AppError::database)?;

        Ok(PaginatedTeacherRolesResponse {
            data: grants,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_teacher_role_by_id(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
    ) -> Result<TeacherRoleDetail, AppError> {
        let mut query = QueryBuilder::new(GRANT_SELECT);
        query.push(" WHERE tr.id = ").push_bind(id);
        push_grant_scope(&mut query, ReadScope::of(caller));

        query
            .build_query_as::<TeacherRoleDetail>()
            .fetch_optional(db)
            .await
            .context("Failed to fetch teacher role by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher role not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_teacher_role(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
    ) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM teacher_roles WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete teacher role")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Teacher role not found")));
        }

        Ok(())
    }
}
