//! Packages a finished plan for the caller.

use std::collections::{HashMap, HashSet};

use crate::data::{
    Class, ClassAssignment, SectionSnapshot, SolveResult, UnmetPreference, Violation,
};
use crate::error::SolveError;
use crate::scoring::PreferenceScorer;

/// Builds the immutable result, checking that the assignment list covers
/// every class of the section exactly once and that violations only name
/// unassigned classes.
pub fn build_result(
    section: &SectionSnapshot,
    ordered: &[&Class],
    assignments: Vec<ClassAssignment>,
    violations: Vec<Violation>,
    scorer: &PreferenceScorer,
    refinement_moves: usize,
) -> Result<SolveResult, SolveError> {
    let by_id: HashMap<&str, &Class> = ordered.iter().map(|c| (c.id.as_str(), *c)).collect();

    let mut seen = HashSet::new();
    let mut total_score = 0;
    let mut unmet_preferences = Vec::new();

    for assignment in &assignments {
        let Some(class) = by_id.get(assignment.class_id.as_str()) else {
            return Err(SolveError::internal(format!(
                "assignment references unknown class {}",
                assignment.class_id
            )));
        };
        if !seen.insert(assignment.class_id.as_str()) {
            return Err(SolveError::internal(format!(
                "class {} assigned more than once",
                assignment.class_id
            )));
        }
        let Some(professor_id) = &assignment.professor_id else {
            continue;
        };

        let score = scorer.score(professor_id, class);
        total_score += score;
        if score < 0 {
            unmet_preferences.push(UnmetPreference {
                class_id: class.id.clone(),
                professor_id: professor_id.clone(),
                score,
                description: format!(
                    "Professor {} teaches class {} ({} {}-{}) against recorded preferences (score {}).",
                    professor_id, class.id, class.day, class.start, class.end, score
                ),
            });
        }
    }

    if seen.len() != section.classes.len() {
        return Err(SolveError::internal(format!(
            "result covers {} of {} classes",
            seen.len(),
            section.classes.len()
        )));
    }

    for violation in &violations {
        let assigned = assignments
            .iter()
            .any(|a| a.class_id == violation.class_id && a.professor_id.is_some());
        if assigned || !seen.contains(violation.class_id.as_str()) {
            return Err(SolveError::internal(format!(
                "violation for class {} does not match the assignment list",
                violation.class_id
            )));
        }
    }

    Ok(SolveResult {
        section_id: section.id.clone(),
        assignments,
        total_score,
        violations,
        unmet_preferences,
        refinement_moves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Preference, PreferenceTarget, ReasonCode};
    use chrono::{NaiveTime, Weekday};

    fn section() -> SectionSnapshot {
        let class = |id: &str, h: u32| Class {
            id: id.into(),
            section_id: "s1".into(),
            subject_id: "math".into(),
            day: Weekday::Wed,
            start: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(h + 1, 0, 0).unwrap(),
            professor_id: None,
        };
        SectionSnapshot {
            id: "s1".into(),
            owner_id: "u1".into(),
            name: String::new(),
            classes: vec![class("c1", 9), class("c2", 11)],
            professors: vec![],
            professor_links: vec![],
            preferences: vec![Preference {
                id: "pr".into(),
                section_id: "s1".into(),
                professor_id: "p1".into(),
                target: PreferenceTarget::Class("c2".into()),
                value: -2,
                importance: 3,
            }],
        }
    }

    fn assigned(class: &str, professor: Option<&str>) -> ClassAssignment {
        ClassAssignment {
            class_id: class.into(),
            professor_id: professor.map(str::to_string),
        }
    }

    #[test]
    fn totals_scores_and_lists_unmet_preferences() {
        let s = section();
        let ordered: Vec<&Class> = s.classes.iter().collect();
        let scorer = PreferenceScorer::new(&s.preferences);
        let result = build_result(
            &s,
            &ordered,
            vec![assigned("c1", Some("p1")), assigned("c2", Some("p1"))],
            vec![],
            &scorer,
            0,
        )
        .unwrap();
        assert_eq!(result.total_score, -6);
        assert_eq!(result.unmet_preferences.len(), 1);
        assert_eq!(result.unmet_preferences[0].class_id, "c2");
        assert!(result.is_complete());
    }

    #[test]
    fn unknown_class_is_internal_error() {
        let s = section();
        let ordered: Vec<&Class> = s.classes.iter().collect();
        let scorer = PreferenceScorer::new(&[]);
        let err = build_result(
            &s,
            &ordered,
            vec![assigned("c1", None), assigned("c2", None), assigned("c9", None)],
            vec![],
            &scorer,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::InternalConsistency(_)));
    }

    #[test]
    fn missing_class_is_internal_error() {
        let s = section();
        let ordered: Vec<&Class> = s.classes.iter().collect();
        let scorer = PreferenceScorer::new(&[]);
        let err = build_result(&s, &ordered, vec![assigned("c1", None)], vec![], &scorer, 0)
            .unwrap_err();
        assert!(matches!(err, SolveError::InternalConsistency(_)));
    }

    #[test]
    fn violation_on_assigned_class_is_internal_error() {
        let s = section();
        let ordered: Vec<&Class> = s.classes.iter().collect();
        let scorer = PreferenceScorer::new(&[]);
        let err = build_result(
            &s,
            &ordered,
            vec![assigned("c1", Some("p1")), assigned("c2", None)],
            vec![Violation {
                class_id: "c1".into(),
                reason_code: ReasonCode::TimeConflict,
                detail: String::new(),
            }],
            &scorer,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::InternalConsistency(_)));
    }
}
