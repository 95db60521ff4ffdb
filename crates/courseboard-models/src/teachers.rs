//! Teacher directory records.

use chrono::{DateTime, NaiveDate, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::deserialize_optional_string;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, ToSchema)]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub title: String,
    pub department: String,
    pub email: String,
    pub phone: String,
    pub avatar: Option<String>,
    pub hire_date: NaiveDate,
    /// Linked login account, if any
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(range(min = 18, max = 65, message = "age must be between 18 and 65"))]
    pub age: i32,
    #[validate(length(min = 1, max = 10))]
    pub gender: String,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(url(message = "avatar must be a URL"))]
    pub avatar: Option<String>,
    #[schema(value_type = String, format = Date, example = "2020-09-01")]
    pub hire_date: NaiveDate,
    pub user_id: Option<Uuid>,
}

/// All fields optional; only provided fields are changed.
#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 18, max = 65, message = "age must be between 18 and 65"))]
    pub age: Option<i32>,
    #[validate(length(min = 1, max = 10))]
    pub gender: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(email(message = "enter a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    #[validate(url(message = "avatar must be a URL"))]
    pub avatar: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub hire_date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct TeacherFilterParams {
    /// Case-insensitive substring of the name
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedTeachersResponse {
    pub data: Vec<Teacher>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_dto() -> CreateTeacherDto {
        CreateTeacherDto {
            name: "Wang Fang".to_string(),
            age: 40,
            gender: "female".to_string(),
            title: "Professor".to_string(),
            department: "Mathematics".to_string(),
            email: "wang@example.com".to_string(),
            phone: "13800000000".to_string(),
            avatar: None,
            hire_date: NaiveDate::from_ymd_opt(2015, 9, 1).unwrap(),
            user_id: None,
        }
    }

    #[test]
    fn test_create_teacher_dto_validation() {
        assert!(valid_dto().validate().is_ok());
    }

    #[test]
    fn test_teacher_age_bounds() {
        for (age, ok) in [(18, true), (65, true), (17, false), (66, false)] {
            let dto = CreateTeacherDto {
                age,
                ..valid_dto()
            };
            assert_eq!(dto.validate().is_ok(), ok, "age {}", age);
        }
    }

    #[test]
    fn test_avatar_must_be_url() {
        let dto = CreateTeacherDto {
            avatar: Some("not a url".to_string()),
            ..valid_dto()
        };
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("avatar"));
    }
}
