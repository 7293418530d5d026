//! Per-professor class counters for the duration of one solve.

use log::trace;
use std::collections::HashMap;

use crate::data::{ProfessorId, ProfessorLink};
use crate::error::SolveError;

#[derive(Debug, Clone, Default)]
pub struct CapacityTracker {
    limits: HashMap<ProfessorId, u32>,
    reserved: HashMap<ProfessorId, u32>,
}

impl CapacityTracker {
    /// Builds limits from the section's links. Negative limits are rejected
    /// during validation; here they clamp to zero.
    pub fn from_links(links: &[ProfessorLink]) -> Self {
        let limits = links
            .iter()
            .map(|l| {
                (
                    l.professor_id.clone(),
                    u32::try_from(l.total_classes).unwrap_or(0),
                )
            })
            .collect();
        Self {
            limits,
            reserved: HashMap::new(),
        }
    }

    /// Takes one slot of the professor's load. Leaves state untouched and
    /// returns false when the load is already full or the professor has no
    /// link in this section.
    pub fn try_reserve(&mut self, professor_id: &str) -> bool {
        let limit = self.limit(professor_id);
        let count = self.reserved(professor_id);
        if count + 1 > limit {
            trace!("capacity of {professor_id} exhausted ({count}/{limit})");
            return false;
        }
        *self.reserved.entry(professor_id.to_string()).or_insert(0) += 1;
        true
    }

    /// Gives back a slot taken by `try_reserve`.
    pub fn release(&mut self, professor_id: &str) -> Result<(), SolveError> {
        match self.reserved.get_mut(professor_id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(SolveError::internal(format!(
                "released capacity of professor {professor_id} without a reservation"
            ))),
        }
    }

    pub fn reserved(&self, professor_id: &str) -> u32 {
        self.reserved.get(professor_id).copied().unwrap_or(0)
    }

    pub fn limit(&self, professor_id: &str) -> u32 {
        self.limits.get(professor_id).copied().unwrap_or(0)
    }

    pub fn remaining(&self, professor_id: &str) -> u32 {
        self.limit(professor_id)
            .saturating_sub(self.reserved(professor_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(professor: &str, total: i32) -> ProfessorLink {
        ProfessorLink {
            id: format!("l-{professor}"),
            professor_id: professor.into(),
            section_id: "s1".into(),
            total_classes: total,
        }
    }

    #[test]
    fn reserve_up_to_limit() {
        let mut tracker = CapacityTracker::from_links(&[link("p1", 2)]);
        assert!(tracker.try_reserve("p1"));
        assert!(tracker.try_reserve("p1"));
        assert!(!tracker.try_reserve("p1"));
        assert_eq!(tracker.reserved("p1"), 2);
        assert_eq!(tracker.remaining("p1"), 0);
    }

    #[test]
    fn zero_capacity_never_reserves() {
        let mut tracker = CapacityTracker::from_links(&[link("p1", 0)]);
        assert!(!tracker.try_reserve("p1"));
        assert_eq!(tracker.reserved("p1"), 0);
    }

    #[test]
    fn unknown_professor_has_no_capacity() {
        let mut tracker = CapacityTracker::from_links(&[]);
        assert!(!tracker.try_reserve("ghost"));
    }

    #[test]
    fn release_frees_a_slot() {
        let mut tracker = CapacityTracker::from_links(&[link("p1", 1)]);
        assert!(tracker.try_reserve("p1"));
        tracker.release("p1").unwrap();
        assert_eq!(tracker.reserved("p1"), 0);
        assert!(tracker.try_reserve("p1"));
    }

    #[test]
    fn release_without_reservation_is_internal_error() {
        let mut tracker = CapacityTracker::from_links(&[link("p1", 1)]);
        assert!(matches!(
            tracker.release("p1"),
            Err(SolveError::InternalConsistency(_))
        ));
        assert_eq!(tracker.reserved("p1"), 0);
    }
}
