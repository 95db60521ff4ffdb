//! Postgres enums used by the course catalog and timetable.
//!
//! Each type maps to a Postgres enum of the same snake_case name and to a
//! lowercase JSON string. `FromStr` accepts the same spelling so the types can
//! be used in query-string filters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Implements `as_str`, `Display` and `FromStr` from one variant table.
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "'{}' is not a valid {}",
                        other,
                        stringify!($ty)
                    )),
                }
            }
        }
    };
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "course_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourseType {
    #[default]
    Required,
    Elective,
}

string_enum!(CourseType {
    Required => "required",
    Elective => "elective",
});

/// Delivery mode. Drives the classroom and capacity rules of a course.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "teaching_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeachingMethod {
    Online,
    #[default]
    Offline,
}

string_enum!(TeachingMethod {
    Online => "online",
    Offline => "offline",
});

/// Which weeks of the term a timetable slot recurs in.
///
/// Conflict checks compare patterns by equality only: an `all` slot is not
/// checked against `odd` or `even` slots.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "week_pattern", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WeekPattern {
    #[default]
    All,
    Odd,
    Even,
}

string_enum!(WeekPattern {
    All => "all",
    Odd => "odd",
    Even => "even",
});
