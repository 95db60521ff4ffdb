//! Student directory records.

use chrono::{DateTime, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::deserialize_optional_string;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    /// School-issued student number
    pub student_id: String,
    pub gender: String,
    pub age: i32,
    pub class_name: String,
    pub college: String,
    pub major: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "student_id must be 1-50 characters"))]
    pub student_id: String,
    #[validate(length(min = 1, max = 10))]
    pub gender: String,
    #[validate(range(min = 0, max = 100, message = "age must be between 0 and 100"))]
    pub age: i32,
    #[validate(length(min = 1, max = 100))]
    pub class_name: String,
    #[validate(length(min = 1, max = 100))]
    pub college: String,
    #[validate(length(min = 1, max = 100))]
    pub major: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

/// All fields optional; only provided fields are changed.
#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "student_id must be 1-50 characters"))]
    pub student_id: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub gender: Option<String>,
    #[validate(range(min = 0, max = 100, message = "age must be between 0 and 100"))]
    pub age: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub class_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub college: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub major: Option<String>,
    #[validate(email(message = "enter a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct StudentFilterParams {
    /// Case-insensitive substring of the name
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub college: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub major: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}
