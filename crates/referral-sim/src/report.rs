//! Read-only reporting built on the simulator and optimizer: bonus sweeps,
//! cost per hire and confidence labels.

use serde::Serialize;

use crate::adoption::AdoptionModel;
use crate::bonus::{BonusOptimizer, BonusRecommendation};
use crate::error::SimError;

/// Bonus multiples of the recommendation sampled by [`optimization_report`].
const SWEEP_FACTORS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// One sampled bonus level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub bonus: f64,
    pub probability: f64,
    pub projected_hires: f64,
    /// Hires above the zero-bonus baseline.
    pub incremental_hires: f64,
    /// `None` when the bonus buys no incremental hires.
    pub cost_per_incremental_hire: Option<f64>,
}

/// How comfortably a projection clears its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// High at a margin of 20% or more over target, Medium at 5% or more.
    pub fn from_projection(projected: f64, target: f64) -> Self {
        if target <= 0.0 {
            return Confidence::High;
        }
        let margin = (projected - target) / target;
        if margin >= 0.2 {
            Confidence::High
        } else if margin >= 0.05 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Bonus spend divided by the hires the bonus added over `baseline_hires`.
///
/// Every hire is paid, so the spend is `bonus * projected_hires`.
pub fn cost_per_hire(bonus: f64, projected_hires: f64, baseline_hires: f64) -> Option<f64> {
    let incremental = projected_hires - baseline_hires;
    if incremental <= 0.0 {
        return None;
    }
    Some(bonus * projected_hires / incremental)
}

/// Projected outcome at each bonus in `bonuses`.
pub fn bonus_sweep<A: AdoptionModel + ?Sized>(
    optimizer: &BonusOptimizer,
    days: u32,
    adoption: &A,
    bonuses: &[f64],
) -> Result<Vec<SweepPoint>, SimError> {
    let baseline = optimizer.projected_hires(days, 0.0, adoption)?;
    bonuses
        .iter()
        .map(|&bonus| {
            let probability = optimizer.probability_at(bonus, adoption)?;
            let projected_hires = optimizer.simulator().total_after(probability, days)?;
            Ok(SweepPoint {
                bonus,
                probability,
                projected_hires,
                incremental_hires: projected_hires - baseline,
                cost_per_incremental_hire: cost_per_hire(bonus, projected_hires, baseline),
            })
        })
        .collect()
}

/// Recommendation plus its sensitivity around the chosen bonus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub recommendation: BonusRecommendation,
    pub confidence: Confidence,
    pub cost_per_incremental_hire: Option<f64>,
    pub sweep: Vec<SweepPoint>,
}

pub fn optimization_report<A: AdoptionModel + ?Sized>(
    optimizer: &BonusOptimizer,
    days: u32,
    target_hires: f64,
    adoption: &A,
    epsilon: f64,
) -> Result<OptimizationReport, SimError> {
    let recommendation = optimizer.min_bonus_for_target(days, target_hires, adoption, epsilon)?;

    let anchor = recommendation.bonus.max(optimizer.increment());
    let bonuses: Vec<f64> = SWEEP_FACTORS.iter().map(|f| anchor * f).collect();
    let sweep = bonus_sweep(optimizer, days, adoption, &bonuses)?;

    let baseline = optimizer.projected_hires(days, 0.0, adoption)?;
    Ok(OptimizationReport {
        confidence: Confidence::from_projection(recommendation.projected_hires, target_hires),
        cost_per_incremental_hire: cost_per_hire(
            recommendation.bonus,
            recommendation.projected_hires,
            baseline,
        ),
        recommendation,
        sweep,
    })
}
