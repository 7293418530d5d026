use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_REFINEMENT_ROUNDS: usize = 64;

/// How assignments are searched for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Deterministic single pass in class order.
    #[default]
    Greedy,
    /// Binary integer program over all eligible pairs, solved with HiGHS.
    #[cfg(feature = "ilp")]
    Exact,
}

/// Per-solve knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolveOptions {
    pub strategy: Strategy,
    /// Run the local improvement pass after assignment.
    pub refine: bool,
    pub max_refinement_rounds: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Greedy,
            refine: true,
            max_refinement_rounds: DEFAULT_MAX_REFINEMENT_ROUNDS,
        }
    }
}

/// Settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Options used when a request does not bring its own.
    pub solve: SolveOptions,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `SCHEDULER_BIND_ADDR`, `SCHEDULER_REFINE` and
    /// `SCHEDULER_MAX_REFINEMENT_ROUNDS` through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_var(&lookup, "SCHEDULER_BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let refine = parse_var(&lookup, "SCHEDULER_REFINE", "true")?;
        let max_refinement_rounds = parse_var(
            &lookup,
            "SCHEDULER_MAX_REFINEMENT_ROUNDS",
            &DEFAULT_MAX_REFINEMENT_ROUNDS.to_string(),
        )?;

        Ok(Self {
            bind_addr,
            solve: SolveOptions {
                strategy: Strategy::default(),
                refine,
                max_refinement_rounds,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
        value,
    })
}
