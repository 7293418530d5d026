//! Storage collaborator. The engine never talks to it; the service loads a
//! snapshot, solves it, and optionally writes the assignment back.

use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::data::{SectionId, SectionSnapshot, SolveResult, UserId};
use crate::error::RepositoryError;

pub trait SectionRepository: Send + Sync {
    /// Loads a section only if it belongs to `owner_id`.
    fn load_section(
        &self,
        owner_id: &str,
        section_id: &str,
    ) -> Result<Option<SectionSnapshot>, RepositoryError>;

    fn store_section(&self, section: SectionSnapshot) -> Result<(), RepositoryError>;

    /// Persists the professor chosen for each class of a solve result.
    fn apply_assignments(
        &self,
        owner_id: &str,
        result: &SolveResult,
    ) -> Result<SectionSnapshot, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemorySectionRepository {
    sections: RwLock<HashMap<(UserId, SectionId), SectionSnapshot>>,
}

impl InMemorySectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SectionRepository for InMemorySectionRepository {
    fn load_section(
        &self,
        owner_id: &str,
        section_id: &str,
    ) -> Result<Option<SectionSnapshot>, RepositoryError> {
        let sections = self
            .sections
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(sections
            .get(&(owner_id.to_string(), section_id.to_string()))
            .cloned())
    }

    fn store_section(&self, section: SectionSnapshot) -> Result<(), RepositoryError> {
        let mut sections = self
            .sections
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        debug!("storing section {} for owner {}", section.id, section.owner_id);
        sections.insert((section.owner_id.clone(), section.id.clone()), section);
        Ok(())
    }

    fn apply_assignments(
        &self,
        owner_id: &str,
        result: &SolveResult,
    ) -> Result<SectionSnapshot, RepositoryError> {
        let mut sections = self
            .sections
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let section = sections
            .get_mut(&(owner_id.to_string(), result.section_id.clone()))
            .ok_or_else(|| RepositoryError::NotFound {
                section_id: result.section_id.clone(),
            })?;

        // Check everything first so a bad result leaves the section untouched.
        for assignment in &result.assignments {
            if !section.classes.iter().any(|c| c.id == assignment.class_id) {
                return Err(RepositoryError::UnknownClass {
                    section_id: section.id.clone(),
                    class_id: assignment.class_id.clone(),
                });
            }
        }
        for assignment in &result.assignments {
            if let Some(class) = section
                .classes
                .iter_mut()
                .find(|c| c.id == assignment.class_id)
            {
                class.professor_id = assignment.professor_id.clone();
            }
        }
        Ok(section.clone())
    }
}
