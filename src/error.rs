use itertools::Itertools;
use std::fmt;
use thiserror::Error;

use crate::data::{ClassId, ProfessorId, SectionId};

/// A single problem found in a section snapshot before solving.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("class {class_id} has start {start} not before end {end}")]
    InvalidInterval {
        class_id: ClassId,
        start: String,
        end: String,
    },

    #[error("{entity} {id} belongs to section {found}, expected {expected}")]
    SectionMismatch {
        entity: &'static str,
        id: String,
        found: SectionId,
        expected: SectionId,
    },

    #[error("duplicate {entity} id {id}")]
    DuplicateId { entity: &'static str, id: String },

    #[error("{entity} {id} references unknown {target} {target_id}")]
    DanglingReference {
        entity: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },

    #[error("professor {professor_id} is owned by {found}, section owner is {expected}")]
    OwnerMismatch {
        professor_id: ProfessorId,
        found: String,
        expected: String,
    },

    #[error("professor {professor_id} has negative capacity {total_classes}")]
    NegativeCapacity {
        professor_id: ProfessorId,
        total_classes: i32,
    },

    #[error("preference {preference_id} has negative importance {importance}")]
    NegativeImportance {
        preference_id: String,
        importance: i32,
    },
}

/// Every validation problem of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("; "))
    }
}

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

/// Fatal solve failures. Unassignable classes are not errors, they are
/// reported as violations in the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("invalid section input: {0}")]
    Validation(ValidationErrors),

    #[error("internal consistency failure: {0}")]
    InternalConsistency(String),
}

impl SolveError {
    pub fn internal(message: impl Into<String>) -> Self {
        SolveError::InternalConsistency(message.into())
    }
}

impl From<Vec<ValidationError>> for SolveError {
    fn from(errors: Vec<ValidationError>) -> Self {
        SolveError::Validation(ValidationErrors(errors))
    }
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("section {section_id} not found")]
    NotFound { section_id: SectionId },

    #[error("class {class_id} not found in section {section_id}")]
    UnknownClass {
        section_id: SectionId,
        class_id: ClassId,
    },

    #[error("repository lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
