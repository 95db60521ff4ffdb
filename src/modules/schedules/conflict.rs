//! Double-booking rules for the timetable.

use uuid::Uuid;

use crate::modules::schedules::model::{Schedule, TimeSlot};

/// The resources a timetable row occupies during its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking {
    /// `None` for a row that has not been saved yet.
    pub id: Option<Uuid>,
    pub classroom_id: Uuid,
    pub teaching_assignment_id: Uuid,
    pub slot: TimeSlot,
}

impl From<&Schedule> for Booking {
    fn from(schedule: &Schedule) -> Self {
        Self {
            id: Some(schedule.id),
            classroom_id: schedule.classroom_id,
            teaching_assignment_id: schedule.teaching_assignment_id,
            slot: schedule.slot(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleConflict {
    Classroom,
    Teacher,
}

impl ScheduleConflict {
    pub fn message(&self) -> &'static str {
        match self {
            ScheduleConflict::Classroom => "classroom is already booked for this time slot",
            ScheduleConflict::Teacher => "teacher is already scheduled for this time slot",
        }
    }

    /// Label used by the conflict counter.
    pub fn resource(&self) -> &'static str {
        match self {
            ScheduleConflict::Classroom => "classroom",
            ScheduleConflict::Teacher => "teacher",
        }
    }
}

/// First conflict between `candidate` and `existing`, classroom clashes
/// before teacher clashes. The candidate's own row is skipped.
pub fn find_conflict(candidate: &Booking, existing: &[Booking]) -> Option<ScheduleConflict> {
    let overlapping: Vec<&Booking> = existing
        .iter()
        .filter(|other| {
            (candidate.id.is_none() || other.id != candidate.id)
                && other.slot.overlaps(&candidate.slot)
        })
        .collect();

    if overlapping
        .iter()
        .any(|other| other.classroom_id == candidate.classroom_id)
    {
        return Some(ScheduleConflict::Classroom);
    }

    if overlapping
        .iter()
        .any(|other| other.teaching_assignment_id == candidate.teaching_assignment_id)
    {
        return Some(ScheduleConflict::Teacher);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseboard_models::WeekPattern;

    fn booking(
        classroom_id: Uuid,
        teaching_assignment_id: Uuid,
        start_section: i32,
        end_section: i32,
        week_pattern: WeekPattern,
    ) -> Booking {
        Booking {
            id: Some(Uuid::new_v4()),
            classroom_id,
            teaching_assignment_id,
            slot: TimeSlot {
                day_of_week: 1,
                start_section,
                end_section,
                week_pattern,
            },
        }
    }

    #[test]
    fn test_overlapping_classroom() {
        let room = Uuid::new_v4();
        let existing = [booking(room, Uuid::new_v4(), 1, 3, WeekPattern::All)];
        let mut candidate = booking(room, Uuid::new_v4(), 2, 4, WeekPattern::All);
        candidate.id = None;

        assert_eq!(
            find_conflict(&candidate, &existing),
            Some(ScheduleConflict::Classroom)
        );
    }

    #[test]
    fn test_overlapping_teacher_in_another_room() {
        let assignment = Uuid::new_v4();
        let existing = [booking(Uuid::new_v4(), assignment, 1, 3, WeekPattern::Odd)];
        let candidate = booking(Uuid::new_v4(), assignment, 2, 3, WeekPattern::Odd);

        assert_eq!(
            find_conflict(&candidate, &existing),
            Some(ScheduleConflict::Teacher)
        );
    }

    #[test]
    fn test_adjacent_ranges_do_not_conflict() {
        let room = Uuid::new_v4();
        let existing = [booking(room, Uuid::new_v4(), 1, 3, WeekPattern::All)];
        let candidate = booking(room, Uuid::new_v4(), 3, 5, WeekPattern::All);

        assert_eq!(find_conflict(&candidate, &existing), None);
    }

    #[test]
    fn test_week_patterns_are_compared_exactly() {
        let room = Uuid::new_v4();
        let existing = [
            booking(room, Uuid::new_v4(), 1, 3, WeekPattern::Odd),
            booking(room, Uuid::new_v4(), 1, 3, WeekPattern::All),
        ];
        let candidate = booking(room, Uuid::new_v4(), 1, 3, WeekPattern::Even);

        assert_eq!(find_conflict(&candidate, &existing), None);
    }

    #[test]
    fn test_row_does_not_conflict_with_itself() {
        let room = Uuid::new_v4();
        let saved = booking(room, Uuid::new_v4(), 1, 3, WeekPattern::All);
        let mut moved = saved;
        moved.slot.end_section = 4;

        assert_eq!(find_conflict(&moved, &[saved]), None);
    }
}
