//! Preference lookup table.
//!
//! A record contributes `value * importance`. For one professor and class,
//! class-targeted records win over subject-targeted ones, which win over
//! section-wide ones; records within the winning tier are summed. Pairs with
//! no record score 0.

use std::collections::HashMap;

use crate::data::{Class, ClassId, Preference, PreferenceTarget, ProfessorId, Score, SubjectId};

#[derive(Debug, Clone, Default)]
pub struct PreferenceScorer {
    by_class: HashMap<(ProfessorId, ClassId), Score>,
    by_subject: HashMap<(ProfessorId, SubjectId), Score>,
    by_section: HashMap<ProfessorId, Score>,
}

impl PreferenceScorer {
    pub fn new(preferences: &[Preference]) -> Self {
        let mut scorer = Self::default();
        for pref in preferences {
            let professor = pref.professor_id.clone();
            let slot = match &pref.target {
                PreferenceTarget::Class(class_id) => scorer
                    .by_class
                    .entry((professor, class_id.clone()))
                    .or_insert(0),
                PreferenceTarget::Subject(subject_id) => scorer
                    .by_subject
                    .entry((professor, subject_id.clone()))
                    .or_insert(0),
                PreferenceTarget::Section => scorer.by_section.entry(professor).or_insert(0),
            };
            *slot += pref.weighted();
        }
        scorer
    }

    pub fn score(&self, professor_id: &str, class: &Class) -> Score {
        let professor = professor_id.to_string();
        if let Some(score) = self.by_class.get(&(professor.clone(), class.id.clone())) {
            return *score;
        }
        if let Some(score) = self
            .by_subject
            .get(&(professor.clone(), class.subject_id.clone()))
        {
            return *score;
        }
        self.by_section.get(&professor).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn class(id: &str, subject: &str) -> Class {
        Class {
            id: id.into(),
            section_id: "s1".into(),
            subject_id: subject.into(),
            day: Weekday::Mon,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            professor_id: None,
        }
    }

    fn pref(professor: &str, target: PreferenceTarget, value: i32, importance: i32) -> Preference {
        Preference {
            id: format!("{professor}-{value}-{importance}"),
            section_id: "s1".into(),
            professor_id: professor.into(),
            target,
            value,
            importance,
        }
    }

    #[test]
    fn missing_pairs_are_neutral() {
        let scorer = PreferenceScorer::new(&[]);
        assert_eq!(scorer.score("p1", &class("c1", "math")), 0);
    }

    #[test]
    fn value_is_scaled_by_importance_and_summed() {
        let scorer = PreferenceScorer::new(&[
            pref("p1", PreferenceTarget::Subject("math".into()), 5, 2),
            pref("p1", PreferenceTarget::Subject("math".into()), -1, 3),
        ]);
        assert_eq!(scorer.score("p1", &class("c1", "math")), 7);
        assert_eq!(scorer.score("p1", &class("c2", "art")), 0);
    }

    #[test]
    fn zero_importance_contributes_nothing() {
        let scorer = PreferenceScorer::new(&[pref("p1", PreferenceTarget::Section, 9, 0)]);
        assert_eq!(scorer.score("p1", &class("c1", "math")), 0);
    }

    #[test]
    fn class_target_overrides_subject_and_section() {
        let scorer = PreferenceScorer::new(&[
            pref("p1", PreferenceTarget::Section, 1, 1),
            pref("p1", PreferenceTarget::Subject("math".into()), 4, 1),
            pref("p1", PreferenceTarget::Class("c1".into()), -2, 1),
        ]);
        assert_eq!(scorer.score("p1", &class("c1", "math")), -2);
        assert_eq!(scorer.score("p1", &class("c2", "math")), 4);
        assert_eq!(scorer.score("p1", &class("c3", "art")), 1);
    }
}
