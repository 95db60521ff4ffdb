use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use courseboard_core::{PaginationMeta, PaginationParams};
use courseboard_models::{CourseType, TeachingMethod, UserRole, WeekPattern};

use crate::modules::classrooms::model::{
    Classroom, CreateClassroomDto, PaginatedClassroomsResponse, UpdateClassroomDto,
};
use crate::modules::courses::model::{
    Course, CourseDetail, CourseStatus, CreateCourseDto, PaginatedCoursesResponse,
    UpdateCourseDto,
};
use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentDetail, PaginatedEnrollmentsResponse,
    UpdateEnrollmentDto,
};
use crate::modules::schedules::model::{
    CreateScheduleDto, PaginatedSchedulesResponse, Schedule, ScheduleDetail, UpdateScheduleDto,
};
use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, UpdateStudentDto,
};
use crate::modules::teacher_roles::model::{
    BatchAssignResponse, BatchAssignRolesDto, CreateRoleDto, CreateTeacherRoleDto,
    PaginatedRolesResponse, PaginatedTeacherRolesResponse, Role, TeacherRole, TeacherRoleDetail,
    UpdateRoleDto,
};
use crate::modules::teachers::model::{
    CreateTeacherDto, PaginatedTeachersResponse, Teacher, UpdateTeacherDto,
};
use crate::modules::teaching_assignments::model::{
    CreateTeachingAssignmentDto, PaginatedTeachingAssignmentsResponse, TeachingAssignment,
    TeachingAssignmentDetail, UpdateTeachingAssignmentDto,
};
use crate::modules::users::model::{
    CreateUserDto, PaginatedUsersResponse, UpdateProfileDto, UpdateUserDto, User,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_profile,
        crate::modules::users::controller::update_profile,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::get_teachers,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::classrooms::controller::create_classroom,
        crate::modules::classrooms::controller::get_classrooms,
        crate::modules::classrooms::controller::get_available_classrooms,
        crate::modules::classrooms::controller::get_classroom,
        crate::modules::classrooms::controller::update_classroom,
        crate::modules::classrooms::controller::delete_classroom,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::get_courses,
        crate::modules::courses::controller::search_courses,
        crate::modules::courses::controller::get_course,
        crate::modules::courses::controller::get_course_status,
        crate::modules::courses::controller::update_course,
        crate::modules::courses::controller::delete_course,
        crate::modules::enrollments::controller::create_enrollment,
        crate::modules::enrollments::controller::get_enrollments,
        crate::modules::enrollments::controller::get_enrollment,
        crate::modules::enrollments::controller::update_enrollment,
        crate::modules::enrollments::controller::delete_enrollment,
        crate::modules::teaching_assignments::controller::create_teaching_assignment,
        crate::modules::teaching_assignments::controller::get_teaching_assignments,
        crate::modules::teaching_assignments::controller::get_teaching_assignment,
        crate::modules::teaching_assignments::controller::update_teaching_assignment,
        crate::modules::teaching_assignments::controller::delete_teaching_assignment,
        crate::modules::schedules::controller::create_schedule,
        crate::modules::schedules::controller::get_schedules,
        crate::modules::schedules::controller::get_schedule,
        crate::modules::schedules::controller::update_schedule,
        crate::modules::schedules::controller::delete_schedule,
        crate::modules::teacher_roles::controller::create_role,
        crate::modules::teacher_roles::controller::get_roles,
        crate::modules::teacher_roles::controller::get_role,
        crate::modules::teacher_roles::controller::update_role,
        crate::modules::teacher_roles::controller::delete_role,
        crate::modules::teacher_roles::controller::create_teacher_role,
        crate::modules::teacher_roles::controller::batch_assign_roles,
        crate::modules::teacher_roles::controller::get_teacher_roles,
        crate::modules::teacher_roles::controller::get_teacher_role,
        crate::modules::teacher_roles::controller::delete_teacher_role,
    ),
    components(
        schemas(
            User,
            UserRole,
            CreateUserDto,
            UpdateUserDto,
            UpdateProfileDto,
            PaginatedUsersResponse,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            Teacher,
            CreateTeacherDto,
            UpdateTeacherDto,
            PaginatedTeachersResponse,
            Classroom,
            CreateClassroomDto,
            UpdateClassroomDto,
            PaginatedClassroomsResponse,
            Course,
            CourseType,
            TeachingMethod,
            CreateCourseDto,
            UpdateCourseDto,
            CourseStatus,
            CourseDetail,
            PaginatedCoursesResponse,
            Enrollment,
            EnrollmentDetail,
            CreateEnrollmentDto,
            UpdateEnrollmentDto,
            PaginatedEnrollmentsResponse,
            TeachingAssignment,
            TeachingAssignmentDetail,
            CreateTeachingAssignmentDto,
            UpdateTeachingAssignmentDto,
            PaginatedTeachingAssignmentsResponse,
            Schedule,
            ScheduleDetail,
            WeekPattern,
            CreateScheduleDto,
            UpdateScheduleDto,
            PaginatedSchedulesResponse,
            Role,
            CreateRoleDto,
            UpdateRoleDto,
            PaginatedRolesResponse,
            TeacherRole,
            TeacherRoleDetail,
            CreateTeacherRoleDto,
            BatchAssignRolesDto,
            BatchAssignResponse,
            PaginatedTeacherRolesResponse,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Account management"),
        (name = "Students", description = "Student directory"),
        (name = "Teachers", description = "Teacher directory"),
        (name = "Classrooms", description = "Classrooms and slot availability"),
        (name = "Courses", description = "Course catalog and capacity"),
        (name = "Enrollments", description = "Student enrollments and scores"),
        (name = "Teaching Assignments", description = "Teachers assigned to courses"),
        (name = "Schedules", description = "Weekly timetable"),
        (name = "Roles", description = "Staff roles"),
        (name = "Teacher Roles", description = "Roles granted to teachers")
    ),
    info(
        title = "Courseboard API",
        version = "0.1.0",
        description = "Course administration API: enrollments with capacity limits and a weekly timetable without double bookings.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_resource() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/users/me",
            "/api/classrooms/available",
            "/api/courses/search",
            "/api/courses/{id}/current_status",
            "/api/enrollments/{id}",
            "/api/teaching_assignments",
            "/api/schedules/{id}",
            "/api/roles/{id}",
            "/api/teacher_roles/batch_assign",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
