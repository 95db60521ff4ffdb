//! # Courseboard Models
//!
//! Database entities, request DTOs and filter parameters for the Courseboard
//! API.
//!
//! - [`users`]: accounts and their roles
//! - [`students`], [`teachers`], [`classrooms`]: directory records
//! - [`courses`]: the course catalog and its status/detail views
//! - [`enrollments`]: the student/course ledger
//! - [`teaching_assignments`]: the teacher/course ledger
//! - [`schedules`]: the weekly timetable grid
//! - [`teacher_roles`]: named staff roles and who holds them
//! - [`value_types`]: Postgres enums shared by the above
//!
//! ```ignore
//! use courseboard_models::courses::{CreateCourseDto, TeachingMethod};
//! use validator::Validate;
//!
//! dto.validate()?;
//! if dto.teaching_method == TeachingMethod::Online { /* ... */ }
//! ```

pub mod classrooms;
pub mod courses;
pub mod enrollments;
pub mod schedules;
pub mod students;
pub mod teacher_roles;
pub mod teachers;
pub mod teaching_assignments;
pub mod users;
pub mod value_types;

pub use courseboard_auth::UserRole;
pub use value_types::{CourseType, TeachingMethod, WeekPattern};
