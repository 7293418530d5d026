//! Structural checks on a section snapshot, run before any assignment work.
//!
//! All problems are collected so the caller can fix them in one pass.

use std::collections::HashSet;

use crate::conflict::check_interval;
use crate::data::{PreferenceTarget, SectionSnapshot};
use crate::error::ValidationError;

pub fn validate_section(section: &SectionSnapshot) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut class_ids = HashSet::new();
    for class in &section.classes {
        if !class_ids.insert(class.id.as_str()) {
            errors.push(ValidationError::DuplicateId {
                entity: "class",
                id: class.id.clone(),
            });
        }
        if class.section_id != section.id {
            errors.push(ValidationError::SectionMismatch {
                entity: "class",
                id: class.id.clone(),
                found: class.section_id.clone(),
                expected: section.id.clone(),
            });
        }
        if let Err(e) = check_interval(class) {
            errors.push(e);
        }
    }

    let mut professor_ids = HashSet::new();
    for professor in &section.professors {
        if !professor_ids.insert(professor.id.as_str()) {
            errors.push(ValidationError::DuplicateId {
                entity: "professor",
                id: professor.id.clone(),
            });
        }
        if professor.owner_id != section.owner_id {
            errors.push(ValidationError::OwnerMismatch {
                professor_id: professor.id.clone(),
                found: professor.owner_id.clone(),
                expected: section.owner_id.clone(),
            });
        }
    }

    let mut link_ids = HashSet::new();
    let mut linked_professors = HashSet::new();
    for link in &section.professor_links {
        if !link_ids.insert(link.id.as_str()) {
            errors.push(ValidationError::DuplicateId {
                entity: "professor link",
                id: link.id.clone(),
            });
        }
        if !linked_professors.insert(link.professor_id.as_str()) {
            errors.push(ValidationError::DuplicateId {
                entity: "professor link for professor",
                id: link.professor_id.clone(),
            });
        }
        if link.section_id != section.id {
            errors.push(ValidationError::SectionMismatch {
                entity: "professor link",
                id: link.id.clone(),
                found: link.section_id.clone(),
                expected: section.id.clone(),
            });
        }
        if !professor_ids.contains(link.professor_id.as_str()) {
            errors.push(ValidationError::DanglingReference {
                entity: "professor link",
                id: link.id.clone(),
                target: "professor",
                target_id: link.professor_id.clone(),
            });
        }
        if link.total_classes < 0 {
            errors.push(ValidationError::NegativeCapacity {
                professor_id: link.professor_id.clone(),
                total_classes: link.total_classes,
            });
        }
    }

    let mut preference_ids = HashSet::new();
    for pref in &section.preferences {
        if !preference_ids.insert(pref.id.as_str()) {
            errors.push(ValidationError::DuplicateId {
                entity: "preference",
                id: pref.id.clone(),
            });
        }
        if pref.section_id != section.id {
            errors.push(ValidationError::SectionMismatch {
                entity: "preference",
                id: pref.id.clone(),
                found: pref.section_id.clone(),
                expected: section.id.clone(),
            });
        }
        if !professor_ids.contains(pref.professor_id.as_str()) {
            errors.push(ValidationError::DanglingReference {
                entity: "preference",
                id: pref.id.clone(),
                target: "professor",
                target_id: pref.professor_id.clone(),
            });
        }
        if let PreferenceTarget::Class(class_id) = &pref.target {
            if !class_ids.contains(class_id.as_str()) {
                errors.push(ValidationError::DanglingReference {
                    entity: "preference",
                    id: pref.id.clone(),
                    target: "class",
                    target_id: class_id.clone(),
                });
            }
        }
        if pref.importance < 0 {
            errors.push(ValidationError::NegativeImportance {
                preference_id: pref.id.clone(),
                importance: pref.importance,
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
