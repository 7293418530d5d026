//! Professor-to-class assignment for university timetable sections.
//!
//! Given a section's classes (fixed time slots), the professors linked to it
//! with their load limits, and weighted preferences, [`solve_section`] picks a
//! professor for each class without double-booking anyone, overloading anyone,
//! or placing a professor on a subject they do not teach. Classes that cannot
//! be covered are reported as violations instead of failing the solve.

pub mod capacity;
pub mod config;
pub mod conflict;
pub mod data;
pub mod error;
// Only reachable through `Strategy::Exact`.
#[cfg(feature = "ilp")]
mod ilp;
pub mod report;
pub mod repository;
pub mod scoring;
pub mod server;
pub mod solver;
pub mod validation;

pub use config::{SolveOptions, Strategy};
pub use error::{SolveError, ValidationError};
pub use solver::{SolvePhase, Solver, solve_section};
