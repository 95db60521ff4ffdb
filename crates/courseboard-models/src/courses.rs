//! The course catalog.

use chrono::{DateTime, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::{
    deserialize_nullable, deserialize_optional_parsed, deserialize_optional_string,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::classrooms::Classroom;
use crate::enrollments::EnrollmentDetail;
use crate::teachers::Teacher;
use crate::teaching_assignments::TeachingAssignmentDetail;
pub use crate::value_types::{CourseType, TeachingMethod};

/// Seats offered by every online course.
pub const ONLINE_MAX_STUDENTS: i32 = 1000;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, ToSchema)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub course_type: CourseType,
    pub credits: f64,
    pub total_hours: i32,
    pub teaching_method: TeachingMethod,
    /// Derived: 1000 online, the classroom's capacity offline
    pub max_students: i32,
    pub classroom_id: Option<Uuid>,
    pub semester: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `max_students` is not accepted; it is derived from the teaching method
/// and classroom.
#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub code: String,
    #[serde(default)]
    pub course_type: CourseType,
    #[validate(range(exclusive_min = 0.0, message = "credits must be greater than 0"))]
    pub credits: f64,
    #[validate(range(min = 1, message = "total_hours must be greater than 0"))]
    pub total_hours: i32,
    #[serde(default)]
    pub teaching_method: TeachingMethod,
    /// Required for offline courses, ignored for online ones
    pub classroom_id: Option<Uuid>,
    #[validate(length(min = 1, max = 50, message = "semester must be 1-50 characters"))]
    pub semester: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "code must be 1-50 characters"))]
    pub code: Option<String>,
    pub course_type: Option<CourseType>,
    #[validate(range(exclusive_min = 0.0, message = "credits must be greater than 0"))]
    pub credits: Option<f64>,
    #[validate(range(min = 1, message = "total_hours must be greater than 0"))]
    pub total_hours: Option<i32>,
    pub teaching_method: Option<TeachingMethod>,
    pub classroom_id: Option<Uuid>,
    #[validate(length(min = 1, max = 50, message = "semester must be 1-50 characters"))]
    pub semester: Option<String>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CourseFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub course_type: Option<CourseType>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub semester: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub teaching_method: Option<TeachingMethod>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Query for `/courses/search`. Name and code match case-insensitive
/// substrings; the credit bounds are inclusive.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CourseSearchParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub course_type: Option<CourseType>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub semester: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub teaching_method: Option<TeachingMethod>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub min_credits: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub max_credits: Option<f64>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedCoursesResponse {
    pub data: Vec<Course>,
    pub meta: PaginationMeta,
}

/// Live enrollment figures for one course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CourseStatus {
    pub course_id: Uuid,
    pub current_students: i64,
    pub max_students: i32,
    pub available_slots: i64,
    pub is_full: bool,
}

impl CourseStatus {
    pub fn new(course_id: Uuid, current_students: i64, max_students: i32) -> Self {
        let available_slots = (i64::from(max_students) - current_students).max(0);

        Self {
            course_id,
            current_students,
            max_students,
            available_slots,
            is_full: available_slots == 0,
        }
    }
}

/// A course with the records that hang off it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub classroom: Option<Classroom>,
    pub teachers: Vec<Teacher>,
    pub enrollments: Vec<EnrollmentDetail>,
    pub teaching_assignments: Vec<TeachingAssignmentDetail>,
}
