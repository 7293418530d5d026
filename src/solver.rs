//! Professor-to-class assignment for one section.
//!
//! Classes are processed in a fixed order (day, start time, class id). Each
//! class goes to the highest scoring eligible professor who is free at that
//! time and still has load left; ties on score fall to the lower professor id.
//! A class nobody can take is recorded as a violation and the pass moves on.
//!
//! An optional refinement pass then applies one move per round until none is
//! left or the round budget runs out. Coverage comes first:
//! - repair: place an unassigned class by moving up to two assigned classes
//!   to other professors (an ejection chain)
//!
//! Once nothing more can be covered, the single best strictly improving move:
//! - swap the professors of two assigned classes
//! - relocate one assigned class to another professor with spare load
//!
//! Every candidate move is checked against eligibility, time conflicts and
//! capacity, and is built on a copy of the current plan, so rejecting a move
//! needs no rollback.

use itertools::Itertools;
use log::{debug, info, trace};
use std::collections::HashSet;
use std::time::Instant;

use crate::capacity::CapacityTracker;
use crate::config::{SolveOptions, Strategy};
use crate::conflict::{conflicts, first_conflict, is_eligible};
use crate::data::{
    Class, ClassAssignment, Professor, ReasonCode, Score, SectionSnapshot, SolveResult, Violation,
};
use crate::error::SolveError;
use crate::report;
use crate::scoring::PreferenceScorer;
use crate::validation::validate_section;

/// Lifecycle of one solve. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePhase {
    Initialized,
    Assigning,
    Refining,
    Finalized,
}

impl SolvePhase {
    fn can_advance_to(self, next: SolvePhase) -> bool {
        use SolvePhase::*;
        matches!(
            (self, next),
            (Initialized, Assigning)
                | (Assigning, Refining)
                | (Assigning, Finalized)
                | (Refining, Finalized)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub(crate) professor: usize,
    pub(crate) score: Score,
}

/// Immutable lookup tables shared by every step of a solve.
pub(crate) struct SolveContext<'a> {
    pub(crate) section: &'a SectionSnapshot,
    /// Classes in solve order.
    pub(crate) classes: Vec<&'a Class>,
    /// Professors sorted by id.
    pub(crate) professors: Vec<&'a Professor>,
    /// Eligible professors per class, best score first.
    pub(crate) candidates: Vec<Vec<Candidate>>,
    pub(crate) scorer: PreferenceScorer,
}

impl<'a> SolveContext<'a> {
    pub(crate) fn new(section: &'a SectionSnapshot) -> Self {
        let classes: Vec<&Class> = section
            .classes
            .iter()
            .sorted_by(|a, b| a.solve_order_key().cmp(&b.solve_order_key()))
            .collect();
        let professors: Vec<&Professor> = section
            .professors
            .iter()
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .collect();
        let scorer = PreferenceScorer::new(&section.preferences);

        let candidates = classes
            .iter()
            .map(|class| {
                professors
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| is_eligible(p, class, &section.professor_links))
                    .map(|(i, p)| Candidate {
                        professor: i,
                        score: scorer.score(&p.id, class),
                    })
                    .sorted_by(|a, b| {
                        b.score
                            .cmp(&a.score)
                            .then_with(|| a.professor.cmp(&b.professor))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            section,
            classes,
            professors,
            candidates,
            scorer,
        }
    }

    /// Score of giving class `ci` to professor `pi`, `None` if ineligible.
    pub(crate) fn score(&self, ci: usize, pi: usize) -> Option<Score> {
        self.candidates[ci]
            .iter()
            .find(|c| c.professor == pi)
            .map(|c| c.score)
    }

    /// First class booked for `pi` in `plan` that clashes with class `ci`,
    /// not counting the classes in `ignoring`.
    fn conflict_for(&self, plan: &Plan, pi: usize, ci: usize, ignoring: &[usize]) -> Option<&'a Class> {
        let booked = plan
            .assigned
            .iter()
            .enumerate()
            .filter(|(other, p)| **p == Some(pi) && *other != ci && !ignoring.contains(other))
            .map(|(other, _)| self.classes[other]);
        first_conflict(self.classes[ci], booked)
    }

    /// Tries every candidate of class `ci` best first and books the first
    /// one that fits. On failure the reason reflects the last candidate.
    pub(crate) fn place(&self, plan: &mut Plan, ci: usize) -> Placement {
        let class = self.classes[ci];
        let mut rejection = None;

        for cand in &self.candidates[ci] {
            let professor = self.professors[cand.professor];
            if let Some(other) = self.conflict_for(plan, cand.professor, ci, &[]) {
                trace!(
                    "class {}: professor {} busy with class {}",
                    class.id, professor.id, other.id
                );
                rejection = Some((
                    ReasonCode::TimeConflict,
                    format!(
                        "professor {} already teaches class {} on {} {}-{}",
                        professor.id, other.id, other.day, other.start, other.end
                    ),
                ));
                continue;
            }
            if !plan.capacity.try_reserve(&professor.id) {
                rejection = Some((
                    ReasonCode::CapacityExhausted,
                    format!(
                        "professor {} already teaches {} of {} allowed classes",
                        professor.id,
                        plan.capacity.reserved(&professor.id),
                        plan.capacity.limit(&professor.id)
                    ),
                ));
                continue;
            }
            plan.assigned[ci] = Some(cand.professor);
            return Placement::Placed(cand.professor);
        }

        let (reason, detail) = rejection.unwrap_or_else(|| {
            (
                ReasonCode::NoEligibleProfessor,
                format!(
                    "no professor linked to section {} teaches subject {}",
                    class.section_id, class.subject_id
                ),
            )
        });
        Placement::Rejected { reason, detail }
    }

    pub(crate) fn plan_score(&self, plan: &Plan) -> Score {
        plan.assigned
            .iter()
            .enumerate()
            .filter_map(|(ci, p)| p.and_then(|pi| self.score(ci, pi)))
            .sum()
    }
}

pub(crate) enum Placement {
    Placed(usize),
    Rejected { reason: ReasonCode, detail: String },
}

/// Working assignment: professor index per class (solve order) plus the
/// capacity counters that go with it.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub(crate) assigned: Vec<Option<usize>>,
    pub(crate) capacity: CapacityTracker,
}

impl Plan {
    pub(crate) fn empty(ctx: &SolveContext<'_>) -> Self {
        Self {
            assigned: vec![None; ctx.classes.len()],
            capacity: CapacityTracker::from_links(&ctx.section.professor_links),
        }
    }

    /// Gives unassigned class `ci` to professor `pi`. The caller has ruled
    /// out time conflicts.
    fn book(&mut self, ctx: &SolveContext<'_>, ci: usize, pi: usize) -> Result<(), SolveError> {
        let professor_id = &ctx.professors[pi].id;
        if self.assigned[ci].is_some() || !self.capacity.try_reserve(professor_id) {
            return Err(SolveError::internal(format!(
                "cannot book class {} on professor {}",
                ctx.classes[ci].id, professor_id
            )));
        }
        self.assigned[ci] = Some(pi);
        Ok(())
    }

    fn unbook(&mut self, ctx: &SolveContext<'_>, ci: usize) -> Result<(), SolveError> {
        let pi = self.assigned[ci].take().ok_or_else(|| {
            SolveError::internal(format!("class {} is not assigned", ctx.classes[ci].id))
        })?;
        self.capacity.release(&ctx.professors[pi].id)
    }

    fn assigned_count(&self) -> usize {
        self.assigned.iter().filter(|p| p.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Swap { a: usize, b: usize },
    Relocate { class: usize, to: usize },
}

/// Longest chain of assigned classes a repair may move.
const EJECTION_DEPTH: usize = 2;

/// Places class `ci`, unassigned in `plan`, on one of its candidates. When
/// a candidate is blocked by a single clashing class, or is at full load,
/// one of its classes is moved out and placed again with `depth - 1`.
/// Classes in `pinned` stay where they are. Returns the best scoring plan.
fn insert_with_ejection(
    ctx: &SolveContext<'_>,
    plan: &Plan,
    ci: usize,
    depth: usize,
    pinned: &mut Vec<usize>,
) -> Result<Option<Plan>, SolveError> {
    pinned.push(ci);
    let mut best: Option<(Plan, Score)> = None;

    for cand in &ctx.candidates[ci] {
        let pi = cand.professor;
        let booked: Vec<usize> = (0..plan.assigned.len())
            .filter(|&cj| plan.assigned[cj] == Some(pi))
            .collect();
        let clashing: Vec<usize> = booked
            .iter()
            .copied()
            .filter(|&cj| conflicts(ctx.classes[ci], ctx.classes[cj]))
            .collect();

        let mut found = Vec::new();
        if clashing.is_empty() && plan.capacity.remaining(&ctx.professors[pi].id) > 0 {
            let mut next = plan.clone();
            next.book(ctx, ci, pi)?;
            found.push(next);
        } else if depth > 0 && clashing.len() <= 1 {
            let ejectable = if clashing.is_empty() { booked } else { clashing };
            for cj in ejectable {
                if pinned.contains(&cj) {
                    continue;
                }
                let mut next = plan.clone();
                next.unbook(ctx, cj)?;
                next.book(ctx, ci, pi)?;
                if let Some(done) = insert_with_ejection(ctx, &next, cj, depth - 1, pinned)? {
                    found.push(done);
                }
            }
        }

        for next in found {
            let score = ctx.plan_score(&next);
            if best.as_ref().is_none_or(|(_, s)| score > *s) {
                best = Some((next, score));
            }
        }
    }

    pinned.pop();
    Ok(best.map(|(plan, _)| plan))
}

/// Covers the first unassigned class (solve order) that an ejection chain
/// can place. Every successful repair assigns exactly one more class.
fn repair(ctx: &SolveContext<'_>, plan: &Plan) -> Result<Option<(Plan, usize)>, SolveError> {
    for ci in 0..plan.assigned.len() {
        if plan.assigned[ci].is_some() {
            continue;
        }
        if let Some(next) = insert_with_ejection(ctx, plan, ci, EJECTION_DEPTH, &mut Vec::new())? {
            return Ok(Some((next, ci)));
        }
    }
    Ok(None)
}

/// Finds the best strictly improving move and returns the plan it leads to.
/// `plan` is left untouched.
fn improve(ctx: &SolveContext<'_>, plan: &Plan) -> Result<Option<(Plan, Move, Score)>, SolveError> {
    let mut best: Option<(Move, Score)> = None;
    let mut consider = |mv: Move, gain: Score| {
        if gain > 0 && best.is_none_or(|(_, g)| gain > g) {
            best = Some((mv, gain));
        }
    };

    for (ci, current) in plan.assigned.iter().enumerate() {
        let Some(pa) = *current else { continue };
        let Some(score_a) = ctx.score(ci, pa) else {
            return Err(SolveError::internal(format!(
                "class {} assigned to ineligible professor {}",
                ctx.classes[ci].id, ctx.professors[pa].id
            )));
        };

        for cand in &ctx.candidates[ci] {
            if cand.professor == pa
                || plan.capacity.remaining(&ctx.professors[cand.professor].id) == 0
                || ctx.conflict_for(plan, cand.professor, ci, &[]).is_some()
            {
                continue;
            }
            consider(
                Move::Relocate {
                    class: ci,
                    to: cand.professor,
                },
                cand.score - score_a,
            );
        }

        for (cj, other) in plan.assigned.iter().enumerate().skip(ci + 1) {
            let Some(pb) = *other else { continue };
            if pa == pb {
                continue;
            }
            let (Some(b_on_a), Some(a_on_b), Some(score_b)) =
                (ctx.score(ci, pb), ctx.score(cj, pa), ctx.score(cj, pb))
            else {
                continue;
            };
            if ctx.conflict_for(plan, pb, ci, &[cj]).is_some()
                || ctx.conflict_for(plan, pa, cj, &[ci]).is_some()
            {
                continue;
            }
            consider(
                Move::Swap { a: ci, b: cj },
                b_on_a + a_on_b - score_a - score_b,
            );
        }
    }

    let Some((mv, gain)) = best else {
        return Ok(None);
    };

    let mut next = plan.clone();
    match mv {
        Move::Swap { a, b } => next.assigned.swap(a, b),
        Move::Relocate { class, to } => {
            next.unbook(ctx, class)?;
            next.book(ctx, class, to)?;
        }
    }
    Ok(Some((next, mv, gain)))
}

/// Single-use solver for one section.
pub struct Solver<'a> {
    ctx: SolveContext<'a>,
    options: SolveOptions,
    phase: SolvePhase,
}

impl<'a> Solver<'a> {
    /// Validates the snapshot. Nothing is assigned yet.
    pub fn new(section: &'a SectionSnapshot, options: SolveOptions) -> Result<Self, SolveError> {
        validate_section(section)?;
        Ok(Self {
            ctx: SolveContext::new(section),
            options,
            phase: SolvePhase::Initialized,
        })
    }

    pub fn phase(&self) -> SolvePhase {
        self.phase
    }

    fn advance(&mut self, next: SolvePhase) -> Result<(), SolveError> {
        if !self.phase.can_advance_to(next) {
            return Err(SolveError::internal(format!(
                "invalid solve phase transition {:?} -> {:?}",
                self.phase, next
            )));
        }
        trace!("solve phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    pub fn run(mut self) -> Result<SolveResult, SolveError> {
        let start_time = Instant::now();
        let ctx = &self.ctx;
        info!(
            "Solving section {} with {} classes, {} professors and {} preferences ({:?})...",
            ctx.section.id,
            ctx.classes.len(),
            ctx.professors.len(),
            ctx.section.preferences.len(),
            self.options.strategy
        );

        self.advance(SolvePhase::Assigning)?;
        let (plan, violations) = match self.options.strategy {
            Strategy::Greedy => self.assign_greedily(),
            #[cfg(feature = "ilp")]
            Strategy::Exact => self.assign_exactly()?,
        };

        let (plan, moves) = if self.options.refine {
            self.advance(SolvePhase::Refining)?;
            self.refine(plan)?
        } else {
            (plan, 0)
        };

        self.advance(SolvePhase::Finalized)?;
        let ctx = &self.ctx;

        // Refinement only adds coverage; repaired classes drop their
        // violation and the rest keep the reason from the assignment pass.
        let unassigned: HashSet<&str> = ctx
            .classes
            .iter()
            .zip(&plan.assigned)
            .filter(|(_, p)| p.is_none())
            .map(|(class, _)| class.id.as_str())
            .collect();
        let violations: Vec<Violation> = violations
            .into_iter()
            .filter(|v| unassigned.contains(v.class_id.as_str()))
            .collect();

        let placements = ctx
            .classes
            .iter()
            .zip(&plan.assigned)
            .map(|(class, p)| ClassAssignment {
                class_id: class.id.clone(),
                professor_id: p.map(|pi| ctx.professors[pi].id.clone()),
            })
            .collect();
        let result = report::build_result(
            ctx.section,
            &ctx.classes,
            placements,
            violations,
            &ctx.scorer,
            moves,
        )?;

        info!(
            "Section {} solved in {:.2?}: score {}, {} assigned, {} violations",
            result.section_id,
            start_time.elapsed(),
            result.total_score,
            result.assignments.len() - result.violations.len(),
            result.violations.len()
        );
        Ok(result)
    }

    fn assign_greedily(&self) -> (Plan, Vec<Violation>) {
        let ctx = &self.ctx;
        let mut plan = Plan::empty(ctx);
        let mut violations = Vec::new();

        for (ci, class) in ctx.classes.iter().enumerate() {
            match ctx.place(&mut plan, ci) {
                Placement::Placed(pi) => {
                    debug!("class {} -> professor {}", class.id, ctx.professors[pi].id);
                }
                Placement::Rejected { reason, detail } => {
                    debug!("class {} left unassigned: [{}] {}", class.id, reason, detail);
                    violations.push(Violation {
                        class_id: class.id.clone(),
                        reason_code: reason,
                        detail,
                    });
                }
            }
        }
        (plan, violations)
    }

    #[cfg(feature = "ilp")]
    fn assign_exactly(&self) -> Result<(Plan, Vec<Violation>), SolveError> {
        let ctx = &self.ctx;
        let plan = crate::ilp::assign_exactly(ctx)?;

        // Explain leftovers the same way the greedy pass would against the
        // final plan.
        let mut violations = Vec::new();
        for (ci, class) in ctx.classes.iter().enumerate() {
            if plan.assigned[ci].is_some() {
                continue;
            }
            match ctx.place(&mut plan.clone(), ci) {
                Placement::Rejected { reason, detail } => violations.push(Violation {
                    class_id: class.id.clone(),
                    reason_code: reason,
                    detail,
                }),
                Placement::Placed(_) => {
                    return Err(SolveError::internal(format!(
                        "exact solution left placeable class {} unassigned",
                        class.id
                    )));
                }
            }
        }
        Ok((plan, violations))
    }

    fn refine(&self, mut plan: Plan) -> Result<(Plan, usize), SolveError> {
        let ctx = &self.ctx;
        let mut applied = 0;
        while applied < self.options.max_refinement_rounds {
            plan = if let Some((next, ci)) = repair(ctx, &plan)? {
                debug!(
                    "refinement covered class {} ({} assigned)",
                    ctx.classes[ci].id,
                    next.assigned_count()
                );
                next
            } else if let Some((next, mv, gain)) = improve(ctx, &plan)? {
                debug!("refinement applied {:?} (+{})", mv, gain);
                next
            } else {
                break;
            };
            applied += 1;
        }
        debug!(
            "refinement finished after {} moves, {} assigned, score {}",
            applied,
            plan.assigned_count(),
            ctx.plan_score(&plan)
        );
        Ok((plan, applied))
    }
}

/// Solves one section snapshot.
pub fn solve_section(
    section: &SectionSnapshot,
    options: &SolveOptions,
) -> Result<SolveResult, SolveError> {
    Solver::new(section, options.clone())?.run()
}
