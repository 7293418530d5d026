//! Conflict detection between classes and professor eligibility.
//!
//! Time intervals are half-open `[start, end)`: a class ending at 10:00 does
//! not conflict with one starting at 10:00 on the same day.

use crate::data::{Class, Professor, ProfessorLink};
use crate::error::ValidationError;

/// Rejects classes whose interval is empty or inverted.
pub fn check_interval(class: &Class) -> Result<(), ValidationError> {
    if class.start < class.end {
        Ok(())
    } else {
        Err(ValidationError::InvalidInterval {
            class_id: class.id.clone(),
            start: class.start.to_string(),
            end: class.end.to_string(),
        })
    }
}

/// True iff both classes fall on the same day and their intervals overlap.
pub fn conflicts(a: &Class, b: &Class) -> bool {
    a.day == b.day && a.start < b.end && b.start < a.end
}

/// Returns the first class in `booked` that `class` conflicts with.
pub fn first_conflict<'a, I>(class: &Class, booked: I) -> Option<&'a Class>
where
    I: IntoIterator<Item = &'a Class>,
{
    booked
        .into_iter()
        .find(|other| other.id != class.id && conflicts(class, other))
}

/// A professor may teach a class when they know its subject and are linked
/// to its section.
pub fn is_eligible(professor: &Professor, class: &Class, links: &[ProfessorLink]) -> bool {
    professor.teaches(&class.subject_id)
        && links
            .iter()
            .any(|l| l.professor_id == professor.id && l.section_id == class.section_id)
}
