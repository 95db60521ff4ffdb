//! Classrooms and the free-room lookup.

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

use crate::schedules::TimeSlot;
use crate::value_types::WeekPattern;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Classroom {
    pub id: Uuid,
    pub name: String,
    /// Seats; becomes `max_students` of offline courses held here
    pub capacity: i32,
    pub location: String,
    pub equipment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, ToSchema, Validate)]
pub struct CreateClassroomDto {
    #[validate(length(min = 1, max = 50, message = "name must be 1-50 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "capacity must be a positive number"))]
    pub capacity: i32,
    #[validate(length(min = 1, max = 100))]
    pub location: String,
    pub equipment: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema, Validate)]
pub struct UpdateClassroomDto {
    #[validate(length(min = 1, max = 50, message = "name must be 1-50 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "capacity must be a positive number"))]
    pub capacity: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub location: Option<String>,
    /// `null` clears the equipment note
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub equipment: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ClassroomFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub min_capacity: Option<i32>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Query for `/classrooms/available`.
///
/// With a complete slot (`day_of_week`, `start_section`, `end_section`) the
/// result is every classroom with no timetable row overlapping that slot for
/// the same week pattern. Without a slot it is every classroom that has no
/// timetable rows at all.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams, Validate)]
pub struct AvailableClassroomParams {
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    #[validate(range(min = 1, max = 7, message = "day_of_week must be between 1 and 7"))]
    pub day_of_week: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    #[validate(range(min = 1, message = "start_section must be at least 1"))]
    pub start_section: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    #[validate(range(min = 1, message = "end_section must be at least 1"))]
    pub end_section: Option<i32>,
    /// Defaults to `all`
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub week_pattern: Option<WeekPattern>,
    #[serde(default, deserialize_with = "deserialize_optional_parsed")]
    pub min_capacity: Option<i32>,
}

impl AvailableClassroomParams {
    /// The requested slot, if all three coordinates were given.
    pub fn slot(&self) -> Option<TimeSlot> {
        match (self.day_of_week, self.start_section, self.end_section) {
            (Some(day_of_week), Some(start_section), Some(end_section)) => Some(TimeSlot {
                day_of_week,
                start_section,
                end_section,
                week_pattern: self.week_pattern.unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// True when only part of a slot was supplied.
    pub fn is_partial_slot(&self) -> bool {
        let given = [self.day_of_week, self.start_section, self.end_section]
            .iter()
            .filter(|v| v.is_some())
            .count();
        given > 0 && given < 3
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedClassroomsResponse {
    pub data: Vec<Classroom>,
    pub meta: PaginationMeta,
}
