//! Exact assignment with the HiGHS ILP solver.
//!
//! x_cp = 1 if class c is taught by professor p
//!        0 otherwise
//!
//! Only eligible pairs get a variable. The objective rewards every assigned
//! class with a weight larger than any achievable preference total, so the
//! model first maximizes the number of assigned classes and then the score.

use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
    variable,
};
use log::{info, trace};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::conflict::conflicts;
use crate::error::SolveError;
use crate::solver::{Plan, SolveContext};

pub(crate) fn assign_exactly(ctx: &SolveContext<'_>) -> Result<Plan, SolveError> {
    let start_time = Instant::now();
    let mut plan = Plan::empty(ctx);

    let mut problem = ProblemVariables::new();
    let mut vars: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
    for (ci, candidates) in ctx.candidates.iter().enumerate() {
        for cand in candidates {
            vars.insert((ci, cand.professor), problem.add(variable().binary()));
        }
    }
    trace!(
        "Generated {} assignment variables out of a theoretical maximum of {}.",
        vars.len(),
        ctx.classes.len() * ctx.professors.len()
    );
    if vars.is_empty() {
        return Ok(plan);
    }

    let coverage_weight = 1.0
        + ctx
            .candidates
            .iter()
            .flatten()
            .map(|c| c.score.unsigned_abs() as f64)
            .sum::<f64>();
    let objective: Expression = vars
        .iter()
        .map(|(&(ci, pi), &var)| {
            let score = ctx.score(ci, pi).unwrap_or(0) as f64;
            (coverage_weight + score) * Expression::from(var)
        })
        .sum();

    let mut model = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", 1) // single thread keeps runs reproducible
        .set_option("random_seed", 1234)
        .set_option("log_to_console", "false");

    // each class at most once
    for ci in 0..ctx.classes.len() {
        let taught: Expression = vars
            .range((ci, 0)..(ci + 1, 0))
            .map(|(_, var)| *var)
            .sum();
        model.add_constraint(constraint!(taught <= 1));
    }

    for (pi, professor) in ctx.professors.iter().enumerate() {
        let mine: Vec<(usize, Variable)> = vars
            .iter()
            .filter(|((_, p), _)| *p == pi)
            .map(|(&(ci, _), &var)| (ci, var))
            .collect();
        if mine.is_empty() {
            continue;
        }

        // load limit
        let load: Expression = mine.iter().map(|(_, var)| *var).sum();
        let limit = f64::from(plan.capacity.limit(&professor.id));
        model.add_constraint(constraint!(load <= limit));

        // no overlapping classes for one professor
        for (i, &(ca, va)) in mine.iter().enumerate() {
            for &(cb, vb) in &mine[i + 1..] {
                if conflicts(ctx.classes[ca], ctx.classes[cb]) {
                    model.add_constraint(constraint!(Expression::from(va) + vb <= 1));
                }
            }
        }
    }

    info!("Starting ILP solver...");
    let solution = model
        .solve()
        .map_err(|e| SolveError::internal(format!("exact solver failed: {e}")))?;
    info!("ILP solution found in {:.2?}", start_time.elapsed());

    for (&(ci, pi), var) in &vars {
        if solution.value(*var) > 0.9 {
            if !plan.capacity.try_reserve(&ctx.professors[pi].id) {
                return Err(SolveError::internal(format!(
                    "exact solution exceeds capacity of professor {}",
                    ctx.professors[pi].id
                )));
            }
            if plan.assigned[ci].replace(pi).is_some() {
                return Err(SolveError::internal(format!(
                    "exact solution assigns class {} twice",
                    ctx.classes[ci].id
                )));
            }
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use crate::config::{SolveOptions, Strategy};
    use crate::data::{
        Class, Preference, PreferenceTarget, Professor, ProfessorLink, ReasonCode, SectionSnapshot,
    };
    use crate::solver::solve_section;
    use chrono::{NaiveTime, Weekday};

    fn class(id: &str, h: u32) -> Class {
        Class {
            id: id.into(),
            section_id: "s1".into(),
            subject_id: "math".into(),
            day: Weekday::Mon,
            start: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(h + 1, 0, 0).unwrap(),
            professor_id: None,
        }
    }

    #[test]
    fn exact_strategy_finds_best_pairing() {
        // Both plans cover every class; only p2 on c1 avoids the negative
        // preference.
        let professors = ["p1", "p2"];
        let section = SectionSnapshot {
            id: "s1".into(),
            owner_id: "u1".into(),
            name: String::new(),
            classes: vec![class("c1", 9), class("c2", 11)],
            professors: professors
                .iter()
                .map(|p| Professor {
                    id: p.to_string(),
                    owner_id: "u1".into(),
                    name: p.to_string(),
                    subjects: vec!["math".into()],
                })
                .collect(),
            professor_links: vec![
                ProfessorLink {
                    id: "l1".into(),
                    professor_id: "p1".into(),
                    section_id: "s1".into(),
                    total_classes: 1,
                },
                ProfessorLink {
                    id: "l2".into(),
                    professor_id: "p2".into(),
                    section_id: "s1".into(),
                    total_classes: 1,
                },
            ],
            preferences: vec![Preference {
                id: "pr".into(),
                section_id: "s1".into(),
                professor_id: "p2".into(),
                target: PreferenceTarget::Class("c2".into()),
                value: -1,
                importance: 1,
            }],
        };

        let exact = solve_section(
            &section,
            &SolveOptions {
                strategy: Strategy::Exact,
                ..SolveOptions::default()
            },
        )
        .unwrap();
        assert!(exact.is_complete());
        assert_eq!(exact.professor_for("c1"), Some("p2"));
        assert_eq!(exact.professor_for("c2"), Some("p1"));
        assert_eq!(exact.total_score, 0);

        let mut capped = section.clone();
        capped.professor_links[1].total_classes = 0;
        let result = solve_section(
            &capped,
            &SolveOptions {
                strategy: Strategy::Exact,
                ..SolveOptions::default()
            },
        )
        .unwrap();
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].reason_code, ReasonCode::CapacityExhausted);
    }
}
