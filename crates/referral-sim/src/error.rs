//! Error types for the growth simulator and bonus optimizer.
//!
//! Two families are kept apart: bounds violations on well-formed calls
//! (`InvalidProbability`, `InvalidDays`, `InvalidParameter`) and objectives
//! that are simply out of reach within the configured ceilings
//! (`Unreachable`, `Infeasible`).

use serde::Serialize;

/// Errors produced by simulation and optimization.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub enum SimError {
    #[error("probability {value} is outside [0, 1]")]
    InvalidProbability { value: f64 },

    #[error("days {days} is outside [0, {max}]")]
    InvalidDays { days: u32, max: u32 },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The cumulative total never reaches `target` within `ceiling_days`.
    #[error("target {target} is unreachable within {ceiling_days} days")]
    Unreachable { target: f64, ceiling_days: u32 },

    /// No bonus within the search ceiling meets the target.
    #[error("target {target} is infeasible in {days} days: {reason}")]
    Infeasible {
        target: f64,
        days: u32,
        reason: String,
    },

    /// The rounded bonus no longer met the target, which only happens when
    /// the adoption function is not monotone.
    #[error("rounded bonus {bonus} misses the target; adoption function is not monotone")]
    NonMonotoneAdoption { bonus: f64 },
}

impl SimError {
    /// True for bounds and parameter violations.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SimError::InvalidProbability { .. }
                | SimError::InvalidDays { .. }
                | SimError::InvalidParameter { .. }
        )
    }

    /// True when inputs were fine but the objective cannot be met.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            SimError::Unreachable { .. } | SimError::Infeasible { .. }
        )
    }
}
