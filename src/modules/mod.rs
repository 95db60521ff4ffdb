pub mod classrooms;
pub mod courses;
pub mod enrollments;
pub mod schedules;
pub mod students;
pub mod teacher_roles;
pub mod teachers;
pub mod teaching_assignments;
pub mod users;
