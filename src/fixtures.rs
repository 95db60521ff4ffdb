//! Builders shared by the service tests.

use chrono::NaiveDate;
use courseboard_auth::{Caller, UserRole};
use courseboard_models::{TeachingMethod, WeekPattern};
use sqlx::PgPool;
use uuid::Uuid;

use crate::modules::classrooms::model::{Classroom, CreateClassroomDto};
use crate::modules::classrooms::service::ClassroomService;
use crate::modules::courses::model::{Course, CreateCourseDto};
use crate::modules::courses::service::CourseService;
use crate::modules::schedules::model::CreateScheduleDto;
use crate::modules::students::model::{CreateStudentDto, Student};
use crate::modules::students::service::StudentService;
use crate::modules::teachers::model::{CreateTeacherDto, Teacher};
use crate::modules::teachers::service::TeacherService;
use crate::modules::teaching_assignments::model::{
    CreateTeachingAssignmentDto, TeachingAssignment,
};
use crate::modules::teaching_assignments::service::TeachingAssignmentService;

pub fn caller_with(role: UserRole) -> Caller {
    Caller::new(Uuid::new_v4(), role)
}

pub fn admin() -> Caller {
    caller_with(UserRole::Admin)
}

pub fn student_dto(n: u32) -> CreateStudentDto {
    CreateStudentDto {
        name: format!("Student {}", n),
        student_id: format!("S{:05}", n),
        gender: "female".to_string(),
        age: 19,
        class_name: "CS-1".to_string(),
        college: "Engineering".to_string(),
        major: "Computer Science".to_string(),
        email: format!("student{}@example.com", n),
        phone: Some("555-0100".to_string()),
    }
}

pub fn teacher_dto(n: u32) -> CreateTeacherDto {
    CreateTeacherDto {
        name: format!("Teacher {}", n),
        age: 40,
        gender: "male".to_string(),
        title: "Lecturer".to_string(),
        department: "Computer Science".to_string(),
        email: format!("teacher{}@example.com", n),
        phone: "555-0200".to_string(),
        avatar: None,
        hire_date: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(),
        user_id: None,
    }
}

pub fn classroom_dto(name: &str, capacity: i32) -> CreateClassroomDto {
    CreateClassroomDto {
        name: name.to_string(),
        capacity,
        location: "Main Building".to_string(),
        equipment: None,
    }
}

pub fn course_dto(code: &str, classroom_id: Option<Uuid>) -> CreateCourseDto {
    CreateCourseDto {
        name: format!("Course {}", code),
        code: code.to_string(),
        course_type: Default::default(),
        credits: 3.0,
        total_hours: 48,
        teaching_method: TeachingMethod::Offline,
        classroom_id,
        semester: "2025-fall".to_string(),
        description: None,
    }
}

pub fn schedule_dto(
    course_id: Uuid,
    classroom_id: Uuid,
    teaching_assignment_id: Uuid,
    start_section: i32,
    end_section: i32,
    week_pattern: WeekPattern,
) -> CreateScheduleDto {
    CreateScheduleDto {
        course_id,
        classroom_id,
        teaching_assignment_id,
        day_of_week: 1,
        start_section,
        end_section,
        week_pattern,
    }
}

pub async fn create_student(pool: &PgPool, n: u32) -> Student {
    StudentService::create_student(pool, &admin(), student_dto(n))
        .await
        .unwrap()
}

pub async fn create_teacher(pool: &PgPool, n: u32) -> Teacher {
    TeacherService::create_teacher(pool, &admin(), teacher_dto(n))
        .await
        .unwrap()
}

pub async fn create_classroom(pool: &PgPool, name: &str, capacity: i32) -> Classroom {
    ClassroomService::create_classroom(pool, &admin(), classroom_dto(name, capacity))
        .await
        .unwrap()
}

pub async fn create_offline_course(pool: &PgPool, code: &str, classroom_id: Uuid) -> Course {
    CourseService::create_course(pool, &admin(), course_dto(code, Some(classroom_id)))
        .await
        .unwrap()
}

pub async fn create_assignment(
    pool: &PgPool,
    teacher_id: Uuid,
    course_id: Uuid,
) -> TeachingAssignment {
    let dto = CreateTeachingAssignmentDto {
        teacher_id,
        course_id,
        teaching_hours: 32,
    };
    TeachingAssignmentService::create_assignment(pool, &admin(), dto)
        .await
        .unwrap()
}
