//! The student/course ledger.

use chrono::{DateTime, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub score: Option<f64>,
}

/// An enrollment joined with the student and course it links.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, ToSchema)]
pub struct EnrollmentDetail {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    /// School-issued student number
    pub student_number: String,
    pub course_id: Uuid,
    pub course_name: String,
    pub course_code: String,
    pub enrolled_at: DateTime<Utc>,
    pub score: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateEnrollmentDto {
    pub student_id: Uuid,
    pub course_id: Uuid,
    #[validate(range(min = 0.0, max = 100.0, message = "score must be between 0 and 100"))]
    pub score: Option<f64>,
}

/// Replaces the score; `null` clears it.
#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct UpdateEnrollmentDto {
    #[validate(range(min = 0.0, max = 100.0, message = "score must be between 0 and 100"))]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct EnrollmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedEnrollmentsResponse {
    pub data: Vec<EnrollmentDetail>,
    pub meta: PaginationMeta,
}
