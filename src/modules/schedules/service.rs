//! Timetable rows and the double-booking check.
//!
//! Lock order for every schedule write: course (`FOR KEY SHARE`), then
//! classroom, then teaching assignment, then the schedule row itself.
//! Course and assignment deletes take their own row first and cascade into
//! schedules afterwards, so taking the schedule row last keeps the order
//! acyclic. Two writers touching the same classroom or assignment are
//! serialized before they look for overlapping rows.

use anyhow::Context;
use courseboard_auth::Caller;
use courseboard_core::{AppError, PaginationMeta};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::schedules::conflict::{Booking, find_conflict};
use crate::modules::schedules::model::{
    CreateScheduleDto, PaginatedSchedulesResponse, Schedule, ScheduleDetail,
    ScheduleFilterParams, TimeSlot, UpdateScheduleDto,
};
use crate::modules::teaching_assignments::model::TeachingAssignment;

const DETAIL_SELECT: &str = r#"
    SELECT s.id, s.course_id, c.name AS course_name, s.classroom_id, r.name AS classroom_name,
           s.teaching_assignment_id, ta.teacher_id, t.name AS teacher_name,
           s.day_of_week, s.start_section, s.end_section, s.week_pattern,
           s.created_at, s.updated_at
    FROM schedules s
    JOIN courses c ON c.id = s.course_id
    JOIN classrooms r ON r.id = s.classroom_id
    JOIN teaching_assignments ta ON ta.id = s.teaching_assignment_id
    JOIN teachers t ON t.id = ta.teacher_id
"#;

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &ScheduleFilterParams) {
    query.push(" WHERE 1 = 1");

    if let Some(course_id) = filters.course_id {
        query.push(" AND s.course_id = ").push_bind(course_id);
    }
    if let Some(classroom_id) = filters.classroom_id {
        query.push(" AND s.classroom_id = ").push_bind(classroom_id);
    }
    if let Some(teaching_assignment_id) = filters.teaching_assignment_id {
        query
            .push(" AND s.teaching_assignment_id = ")
            .push_bind(teaching_assignment_id);
    }
    if let Some(day_of_week) = filters.day_of_week {
        query.push(" AND s.day_of_week = ").push_bind(day_of_week);
    }
    if let Some(week_pattern) = filters.week_pattern {
        query.push(" AND s.week_pattern = ").push_bind(week_pattern);
    }
}

/// Validates `booking` for `course_id` inside the caller's transaction.
///
/// Takes the course, classroom and assignment locks in that order, checks
/// that the referenced rows exist and belong together, then compares
/// against every row sharing the weekday and week pattern with either
/// resource.
async fn check_booking(
    conn: &mut PgConnection,
    course_id: Uuid,
    booking: &Booking,
) -> Result<(), AppError> {
    if !booking.slot.is_ordered() {
        return Err(AppError::non_field(
            "start_section must be less than end_section",
        ));
    }

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM courses WHERE id = $1 FOR KEY SHARE")
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to lock course")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::field("course_id", "course does not exist"))?;

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM classrooms WHERE id = $1 FOR UPDATE")
        .bind(booking.classroom_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to lock classroom")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::field("classroom_id", "classroom does not exist"))?;

    let assignment = sqlx::query_as::<_, TeachingAssignment>(
        "SELECT * FROM teaching_assignments WHERE id = $1 FOR UPDATE",
    )
    .bind(booking.teaching_assignment_id)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to lock teaching assignment")
    .map_err(AppError::database)?
    .ok_or_else(|| {
        AppError::field("teaching_assignment_id", "teaching assignment does not exist")
    })?;

    if assignment.course_id != course_id {
        return Err(AppError::field(
            "teaching_assignment_id",
            "teaching assignment does not belong to this course",
        ));
    }

    let neighbours = sqlx::query_as::<_, Schedule>(
        r#"
        SELECT * FROM schedules
        WHERE day_of_week = $1
          AND week_pattern = $2
          AND (classroom_id = $3 OR teaching_assignment_id = $4)
        "#,
    )
    .bind(booking.slot.day_of_week)
    .bind(booking.slot.week_pattern)
    .bind(booking.classroom_id)
    .bind(booking.teaching_assignment_id)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to fetch schedules for conflict check")
    .map_err(AppError::database)?;

    let existing: Vec<Booking> = neighbours.iter().map(Booking::from).collect();

    if let Some(conflict) = find_conflict(booking, &existing) {
        courseboard_observability::track_schedule_conflict(conflict.resource());
        return Err(AppError::conflict(conflict.message()));
    }

    Ok(())
}

pub struct ScheduleService;

impl ScheduleService {
    #[instrument(skip(db, dto))]
    pub async fn create_schedule(
        db: &PgPool,
        caller: &Caller,
        dto: CreateScheduleDto,
    ) -> Result<Schedule, AppError> {
        caller.require_admin()?;

        let booking = Booking {
            id: None,
            classroom_id: dto.classroom_id,
            teaching_assignment_id: dto.teaching_assignment_id,
            slot: TimeSlot {
                day_of_week: dto.day_of_week,
                start_section: dto.start_section,
                end_section: dto.end_section,
                week_pattern: dto.week_pattern,
            },
        };

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        check_booking(&mut *tx, dto.course_id, &booking).await?;

        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            INSERT INTO schedules (course_id, classroom_id, teaching_assignment_id,
                                   day_of_week, start_section, end_section, week_pattern)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(dto.course_id)
        .bind(dto.classroom_id)
        .bind(dto.teaching_assignment_id)
        .bind(dto.day_of_week)
        .bind(dto.start_section)
        .bind(dto.end_section)
        .bind(dto.week_pattern)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert schedule")
        .map_err(AppError::database)?;

        tx.commit()
            .await
            .context("Failed to commit schedule")
            .map_err(AppError::database)?;

        courseboard_observability::track_entity_created("schedule");

        Ok(schedule)
    }

    #[instrument(skip(db))]
    pub async fn get_schedules(
        db: &PgPool,
        filters: ScheduleFilterParams,
    ) -> Result<PaginatedSchedulesResponse, AppError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM schedules s");
        push_filters(&mut count_query, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(db)
            .await
            .context("Failed to count schedules")
            .map_err(AppError::database)?;

        let mut data_query = QueryBuilder::new(DETAIL_SELECT);
        push_filters(&mut data_query, &filters);
        data_query
            .push(" ORDER BY s.day_of_week, s.start_section, r.name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let schedules = data_query
            .build_query_as::<ScheduleDetail>()
            .fetch_all(db)
            .await
            .context("Failed to fetch schedules")
            .map_err(AppError::database)?;

        Ok(PaginatedSchedulesResponse {
            data: schedules,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_schedule_by_id(db: &PgPool, id: Uuid) -> Result<ScheduleDetail, AppError> {
        sqlx::query_as::<_, ScheduleDetail>(&format!("{DETAIL_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch schedule by ID")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Schedule not found")))
    }

    /// Merges `dto` into the stored row and re-runs the booking check,
    /// ignoring the row itself.
    #[instrument(skip(db, dto))]
    pub async fn update_schedule(
        db: &PgPool,
        caller: &Caller,
        id: Uuid,
        dto: UpdateScheduleDto,
    ) -> Result<Schedule, AppError> {
        caller.require_admin()?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to start transaction")
            .map_err(AppError::database)?;

        // Unlocked read: the schedule row is locked last, after check_booking.
        let existing = sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch schedule")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Schedule not found")))?;

        let course_id = dto.course_id.unwrap_or(existing.course_id);
        let booking = Booking {
            id: Some(existing.id),
            classroom_id: dto.classroom_id.unwrap_or(existing.classroom_id),
            teaching_assignment_id: dto
                .teaching_assignment_id
                .unwrap_or(existing.teaching_assignment_id),
            slot: TimeSlot {
                day_of_week: dto.day_of_week.unwrap_or(existing.day_of_week),
                start_section: dto.start_section.unwrap_or(existing.start_section),
                end_section: dto.end_section.unwrap_or(existing.end_section),
                week_pattern: dto.week_pattern.unwrap_or(existing.week_pattern),
            },
        };

        check_booking(&mut *tx, course_id, &booking).await?;

        let locked =
            sqlx::query_as::<_, Schedule>("SELECT * FROM schedules WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock schedule")
                .map_err(AppError::database)?
                .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Schedule not found")))?;

        // The merge above was computed from `existing`; a concurrent edit invalidates it.
        if locked != existing {
            return Err(AppError::conflict(
                "schedule was changed by another request, try again",
            ));
        }

        let schedule = sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules
            SET course_id = $2, classroom_id = $3, teaching_assignment_id = $4,
                day_of_week = $5, start_section = $6, end_section = $7, week_pattern = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(course_id)
        .bind(booking.classroom_id)
        .bind(booking.teaching_assignment_id)
        .bind(booking.slot.day_of_week)
        .bind(booking.slot.start_section)
        .bind(booking.slot.end_section)
        .bind(booking.slot.week_pattern)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update schedule")
        .map_err(AppError::database)?;

        tx.commit()
            .await
            .context("Failed to commit schedule")
            .map_err(AppError::database)?;

        Ok(schedule)
    }

    #[instrument(skip(db))]
    pub async fn delete_schedule(db: &PgPool, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        caller.require_admin()?;

        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to delete schedule")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Schedule not found")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        admin, create_assignment, create_classroom, create_offline_course, create_teacher,
        schedule_dto,
    };
    use axum::http::StatusCode;
    use courseboard_core::NON_FIELD_ERRORS;
    use courseboard_models::WeekPattern;

    struct Setup {
        course_id: Uuid,
        classroom_id: Uuid,
        assignment_id: Uuid,
    }

    async fn setup(pool: &PgPool) -> Setup {
        let classroom = create_classroom(pool, "A101", 30).await;
        let course = create_offline_course(pool, "CS101", classroom.id).await;
        let teacher = create_teacher(pool, 1).await;
        let assignment = create_assignment(pool, teacher.id, course.id).await;

        Setup {
            course_id: course.id,
            classroom_id: classroom.id,
            assignment_id: assignment.id,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_overlapping_classroom_is_rejected(pool: PgPool) {
        let s = setup(&pool).await;
        ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 1, 3, WeekPattern::All),
        )
        .await
        .unwrap();

        let err = ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 2, 4, WeekPattern::All),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.error.to_string(),
            "classroom is already booked for this time slot"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_teacher_double_booking_in_another_room(pool: PgPool) {
        let s = setup(&pool).await;
        let other_room = create_classroom(&pool, "B202", 30).await;
        ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 1, 3, WeekPattern::All),
        )
        .await
        .unwrap();

        let err = ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, other_room.id, s.assignment_id, 2, 3, WeekPattern::All),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.error.to_string(),
            "teacher is already scheduled for this time slot"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_odd_and_even_weeks_share_a_slot(pool: PgPool) {
        let s = setup(&pool).await;

        for pattern in [WeekPattern::Odd, WeekPattern::Even] {
            ScheduleService::create_schedule(
                &pool,
                &admin(),
                schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 1, 3, pattern),
            )
            .await
            .unwrap();
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unordered_sections_are_rejected(pool: PgPool) {
        let s = setup(&pool).await;

        let err = ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 3, 3, WeekPattern::All),
        )
        .await
        .unwrap_err();

        assert!(err.fields.unwrap().contains_key(NON_FIELD_ERRORS));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_assignment_must_belong_to_course(pool: PgPool) {
        let s = setup(&pool).await;
        let other_course = create_offline_course(&pool, "CS102", s.classroom_id).await;

        let err = ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(other_course.id, s.classroom_id, s.assignment_id, 1, 3, WeekPattern::All),
        )
        .await
        .unwrap_err();

        assert!(err.fields.unwrap().contains_key("teaching_assignment_id"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_excludes_own_row(pool: PgPool) {
        let s = setup(&pool).await;
        let schedule = ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 1, 3, WeekPattern::All),
        )
        .await
        .unwrap();

        let dto = UpdateScheduleDto {
            end_section: Some(4),
            ..Default::default()
        };
        let updated = ScheduleService::update_schedule(&pool, &admin(), schedule.id, dto)
            .await
            .unwrap();
        assert_eq!(updated.end_section, 4);

        let detail = ScheduleService::get_schedule_by_id(&pool, schedule.id)
            .await
            .unwrap();
        assert_eq!(detail.classroom_name, "A101");
        assert_eq!(detail.course_name, "Course CS101");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_into_occupied_slot_is_rejected(pool: PgPool) {
        let s = setup(&pool).await;
        ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 1, 3, WeekPattern::All),
        )
        .await
        .unwrap();
        let later = ScheduleService::create_schedule(
            &pool,
            &admin(),
            schedule_dto(s.course_id, s.classroom_id, s.assignment_id, 5, 7, WeekPattern::All),
        )
        .await
        .unwrap();

        let dto = UpdateScheduleDto {
            start_section: Some(2),
            ..Default::default()
        };
        let err = ScheduleService::update_schedule(&pool, &admin(), later.id, dto)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
