//! The teacher/course ledger.

use chrono::{DateTime, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct TeachingAssignment {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    pub teaching_hours: i32,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct TeachingAssignmentDetail {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub course_id: Uuid,
    pub course_name: String,
    pub course_code: String,
    pub teaching_hours: i32,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateTeachingAssignmentDto {
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    #[validate(range(min = 1, message = "teaching_hours must be greater than 0"))]
    pub teaching_hours: i32,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct UpdateTeachingAssignmentDto {
    pub teacher_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    #[validate(range(min = 1, message = "teaching_hours must be greater than 0"))]
    pub teaching_hours: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct TeachingAssignmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedTeachingAssignmentsResponse {
    pub data: Vec<TeachingAssignmentDetail>,
    pub meta: PaginationMeta,
}
