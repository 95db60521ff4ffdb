//! Weekly timetable rows.

use chrono::{DateTime, Utc};
use courseboard_core::pagination::{PaginationMeta, PaginationParams};
use courseboard_core::serde::{deserialize_optional_parsed, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::value_types::WeekPattern;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Schedule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub classroom_id: Uuid,
    pub teaching_assignment_id: Uuid,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: i32,
    pub start_section: i32,
    pub end_section: i32,
    pub week_pattern: WeekPattern,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot {
            day_of_week: self.day_of_week,
            start_section: self.start_section,
            end_section: self.end_section,
            week_pattern: self.week_pattern,
        }
    }
}

/// A timetable row joined with the names shown in listings.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct ScheduleDetail {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub classroom_id: Uuid,
    pub classroom_name: String,
    pub teaching_assignment_id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub day_of_week: i32,
    pub start_section: i32,
    pub end_section: i32,
    pub week_pattern: WeekPattern,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A weekly slot: one weekday, a half-open section range and a week pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub day_of_week: i32,
    pub start_section: i32,
    pub end_section: i32,
    pub week_pattern: WeekPattern,
}

impl TimeSlot {
    pub fn is_ordered(&self) -> bool {
        self.start_section < self.end_section
    }

    /// Two slots collide when they share the weekday and the exact week
    /// pattern and their `[start, end)` ranges intersect.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.day_of_week == other.day_of_week
            && self.week_pattern == other.week_pattern
            && self.start_section < other.end_section
            && other.start_section < self.end_section
    }
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateScheduleDto {
    pub course_id: Uuid,
    pub classroom_id: Uuid,
    pub teaching_assignment_id: Uuid,
    #[validate(range(min = 1, max = 7, message = "day_of_week must be between 1 and 7"))]
    pub day_of_week: i32,
    #[validate(range(min = 1, message = "start_section must be at least 1"))]
    pub start_section: i32,
    #[validate(range(min = 1, message = "end_section must be at least 1"))]
    pub end_section: i32,
    #[serde(default)]
    pub week_pattern: WeekPattern,
}

/// Omitted fields keep their stored values; the merged row is re-checked.
#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateScheduleDto {
    pub course_id: Option<Uuid>,
    pub classroom_id: Option<Uuid>,
    pub teaching_assignment_id: Option<Uuid>,
    #[validate(range(min = 1, max = 7, message = "day_of_week must be between 1 and 7"))]
    pub day_of_week: Option<i32>,
    #[validate(range(min = 1, message = "start_section must be at least 1"))]
    pub start_section: Option<i32>,
    #[validate(range(min = 1, message = "end_section must be at least 1"))]
    pub end_section: Option<i32>,
    pub week_pattern: Option<WeekPattern>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ScheduleFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub classroom_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teaching_assignment_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub day_of_week: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub week_pattern: Option<WeekPattern>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedSchedulesResponse {
    pub data: Vec<ScheduleDetail>,
    pub meta: PaginationMeta,
}
