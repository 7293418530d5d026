use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type ClassId = String;
pub type ProfessorId = String;
pub type SubjectId = String;
pub type SectionId = String;
pub type UserId = String;
pub type Score = i64;

/// A scheduled time slot for one subject within a section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub section_id: SectionId,
    pub subject_id: SubjectId,
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Professor currently persisted for this class. Ignored as solver input.
    #[serde(default)]
    pub professor_id: Option<ProfessorId>,
}

impl Class {
    /// Key that fixes the order classes are processed in: day, start, id.
    pub fn solve_order_key(&self) -> (u32, NaiveTime, &str) {
        (self.day.num_days_from_monday(), self.start, self.id.as_str())
    }
}

/// A professor and the subjects they can teach.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Professor {
    pub id: ProfessorId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<SubjectId>,
}

impl Professor {
    pub fn teaches(&self, subject_id: &str) -> bool {
        self.subjects.iter().any(|s| s == subject_id)
    }
}

/// Links a professor to a section with a maximum class load.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessorLink {
    pub id: String,
    pub professor_id: ProfessorId,
    pub section_id: SectionId,
    pub total_classes: i32,
}

/// What a preference applies to. Narrower targets override broader ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum PreferenceTarget {
    /// Every class of the section.
    #[default]
    Section,
    Subject(SubjectId),
    Class(ClassId),
}

/// A weighted signal about placing a professor on a class or subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub id: String,
    pub section_id: SectionId,
    pub professor_id: ProfessorId,
    #[serde(default)]
    pub target: PreferenceTarget,
    /// Signed desirability: positive wants the pairing, negative avoids it.
    pub value: i32,
    pub importance: i32,
}

impl Preference {
    pub fn weighted(&self) -> Score {
        Score::from(self.value) * Score::from(self.importance)
    }
}

/// Read-only snapshot of everything one solve needs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSnapshot {
    pub id: SectionId,
    pub owner_id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub professors: Vec<Professor>,
    #[serde(default)]
    pub professor_links: Vec<ProfessorLink>,
    #[serde(default)]
    pub preferences: Vec<Preference>,
}

/// Why a class could not be given a professor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    NoEligibleProfessor,
    CapacityExhausted,
    TimeConflict,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ReasonCode::NoEligibleProfessor => "NO_ELIGIBLE_PROFESSOR",
            ReasonCode::CapacityExhausted => "CAPACITY_EXHAUSTED",
            ReasonCode::TimeConflict => "TIME_CONFLICT",
        };
        f.write_str(code)
    }
}

/// A class left unassigned by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub class_id: ClassId,
    pub reason_code: ReasonCode,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] class {}: {}", self.reason_code, self.class_id, self.detail)
    }
}

/// An assigned pairing that goes against the recorded preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetPreference {
    pub class_id: ClassId,
    pub professor_id: ProfessorId,
    pub score: Score,
    pub description: String,
}

/// Represents a single class and the professor it got, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignment {
    pub class_id: ClassId,
    pub professor_id: Option<ProfessorId>,
}

/// The final output of the solver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub section_id: SectionId,
    pub assignments: Vec<ClassAssignment>,
    pub total_score: Score,
    pub violations: Vec<Violation>,
    pub unmet_preferences: Vec<UnmetPreference>,
    pub refinement_moves: usize,
}

impl SolveResult {
    pub fn professor_for(&self, class_id: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.class_id == class_id)
            .and_then(|a| a.professor_id.as_deref())
    }

    /// True when every class received a professor.
    pub fn is_complete(&self) -> bool {
        self.violations.is_empty()
    }
}
