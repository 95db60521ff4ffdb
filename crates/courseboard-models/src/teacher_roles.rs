//! Named staff roles and the teacher/role ledger.

use chrono::{DateTime, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::{deserialize_optional_string, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Permission codenames granted by the role
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct TeacherRole {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub role_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct TeacherRoleDetail {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateRoleDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateRoleDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole permission list when present
    pub permissions: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateTeacherRoleDto {
    pub teacher_id: Uuid,
    pub role_id: Uuid,
}

/// Grants every listed role to every listed teacher.
#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct BatchAssignRolesDto {
    #[validate(length(min = 1, message = "teacher_ids must not be empty"))]
    pub teacher_ids: Vec<Uuid>,
    #[validate(length(min = 1, message = "role_ids must not be empty"))]
    pub role_ids: Vec<Uuid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct BatchAssignResponse {
    pub message: String,
    /// Pairs that did not exist before the call
    pub created_count: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct RoleFilterParams {
    /// Case-insensitive substring of the role name
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct TeacherRoleFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub role_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedRolesResponse {
    pub data: Vec<Role>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedTeacherRolesResponse {
    pub data: Vec<TeacherRoleDetail>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_role_defaults() {
        let dto: CreateRoleDto = serde_json::from_str(r#"{"name":"Dean"}"#).unwrap();
        assert!(dto.validate().is_ok());
        assert!(dto.description.is_empty());
        assert!(dto.permissions.is_empty());

        let dto: CreateRoleDto = serde_json::from_str(r#"{"name":""}"#).unwrap();
        assert!(dto.validate().unwrap_err().field_errors().contains_key("name"));
    }

    #[test]
    fn test_batch_assign_requires_both_lists() {
        let dto = BatchAssignRolesDto {
            teacher_ids: vec![Uuid::new_v4()],
            role_ids: vec![],
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("role_ids"));
        assert!(!errors.field_errors().contains_key("teacher_ids"));
    }
}
