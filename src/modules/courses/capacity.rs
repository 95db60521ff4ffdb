//! Course capacity rule.
//!
//! Online courses never hold a classroom and always offer
//! [`ONLINE_MAX_STUDENTS`] seats. Offline courses take their seat count from
//! the classroom they are bound to, captured at the time of assignment.

use courseboard_core::AppError;
use uuid::Uuid;

use crate::modules::classrooms::model::Classroom;
use crate::modules::courses::model::{ONLINE_MAX_STUDENTS, TeachingMethod};

/// Where a course is held and how many students it admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub classroom_id: Option<Uuid>,
    pub max_students: i32,
}

impl Placement {
    pub fn online() -> Self {
        Self {
            classroom_id: None,
            max_students: ONLINE_MAX_STUDENTS,
        }
    }

    pub fn in_classroom(classroom: &Classroom) -> Self {
        Self {
            classroom_id: Some(classroom.id),
            max_students: classroom.capacity,
        }
    }
}

/// Computes the placement a course must be saved with.
///
/// `classroom` is the classroom supplied with this write, already loaded.
/// `current` is the stored placement when updating, `None` when creating.
/// An offline update without a classroom keeps `current` untouched.
pub fn derive_capacity(
    teaching_method: TeachingMethod,
    classroom: Option<&Classroom>,
    current: Option<Placement>,
) -> Result<Placement, AppError> {
    match (teaching_method, classroom, current) {
        (TeachingMethod::Online, _, _) => Ok(Placement::online()),
        (TeachingMethod::Offline, Some(classroom), _) => Ok(Placement::in_classroom(classroom)),
        (TeachingMethod::Offline, None, Some(current)) => Ok(current),
        (TeachingMethod::Offline, None, None) => Err(AppError::field(
            "classroom_id",
            "offline courses require a classroom",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn classroom(capacity: i32) -> Classroom {
        Classroom {
            id: Uuid::new_v4(),
            name: "A101".to_string(),
            capacity,
            location: "Main Building".to_string(),
            equipment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_online_ignores_classroom() {
        let room = classroom(40);
        let placement = derive_capacity(TeachingMethod::Online, Some(&room), None).unwrap();

        assert_eq!(placement, Placement::online());
        assert_eq!(placement.max_students, 1000);
    }

    #[test]
    fn test_offline_takes_classroom_capacity() {
        let room = classroom(35);
        let placement = derive_capacity(TeachingMethod::Offline, Some(&room), None).unwrap();

        assert_eq!(placement.classroom_id, Some(room.id));
        assert_eq!(placement.max_students, 35);
    }

    #[test]
    fn test_offline_create_without_classroom_is_rejected() {
        let err = derive_capacity(TeachingMethod::Offline, None, None).unwrap_err();

        let fields = err.fields.unwrap();
        assert_eq!(
            fields["classroom_id"],
            vec!["offline courses require a classroom".to_string()]
        );
    }

    #[test]
    fn test_offline_to_online_drops_classroom() {
        let room = classroom(35);
        let current = Placement::in_classroom(&room);

        let placement = derive_capacity(TeachingMethod::Online, None, Some(current)).unwrap();
        assert_eq!(placement, Placement::online());
    }

    #[test]
    fn test_online_to_offline_keeps_capacity_until_assigned() {
        let placement =
            derive_capacity(TeachingMethod::Offline, None, Some(Placement::online())).unwrap();
        assert_eq!(placement.classroom_id, None);
        assert_eq!(placement.max_students, 1000);

        let room = classroom(20);
        let placement =
            derive_capacity(TeachingMethod::Offline, Some(&room), Some(placement)).unwrap();
        assert_eq!(placement.max_students, 20);
    }
}
