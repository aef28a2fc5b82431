//! Minimal-bonus search over the growth simulator.
//!
//! [`BonusOptimizer`] answers "what is the smallest referral bonus that
//! yields `target_hires` within `days`?" by bracketing the answer with a
//! doubling search, bisecting the bracket, then binary-searching the
//! increment multiples left inside it. The search is only
//! meaningful when the adoption model is non-decreasing in the bonus: the
//! simulated total is non-decreasing in probability, so a monotone adoption
//! curve makes "meets the target" a monotone predicate of the bonus. With a
//! non-monotone curve the result is unspecified.

use serde::Serialize;

use crate::adoption::AdoptionModel;
use crate::error::SimError;
use crate::growth::{validate_days, validate_probability, validate_target, GrowthSimulator};

/// First bonus tried while bracketing.
pub const INITIAL_TRIAL_BONUS: f64 = 10.0;
/// Bracketing gives up beyond this bonus.
pub const MAX_BONUS: f64 = 10_000_000.0;
/// Probability at which adoption is treated as saturated.
pub const SATURATION_PROBABILITY: f64 = 0.99;
/// Currency increment results are rounded up to.
pub const BONUS_INCREMENT: f64 = 10.0;
/// Hard cap on bisection steps over the continuous bracket.
pub const MAX_BISECTION_STEPS: u32 = 200;

/// Result of [`BonusOptimizer::min_bonus_for_target`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusRecommendation {
    /// Smallest multiple of the increment that meets the target.
    pub bonus: f64,
    pub probability: f64,
    pub projected_hires: f64,
    pub target_hires: f64,
    pub days: u32,
    /// Upper end of the bisection bracket (0 when no search was needed).
    pub search_upper_bound: f64,
    /// Bisection steps plus the steps narrowing to an increment multiple.
    pub iterations: u32,
}

/// Binary-search driver over a [`GrowthSimulator`].
#[derive(Debug, Clone, Copy)]
pub struct BonusOptimizer {
    simulator: GrowthSimulator,
    increment: f64,
}

impl Default for BonusOptimizer {
    fn default() -> Self {
        BonusOptimizer::new(GrowthSimulator::default())
    }
}

impl BonusOptimizer {
    pub fn new(simulator: GrowthSimulator) -> Self {
        BonusOptimizer {
            simulator,
            increment: BONUS_INCREMENT,
        }
    }

    /// Overrides the rounding increment.
    pub fn with_increment(mut self, increment: f64) -> Result<Self, SimError> {
        if !increment.is_finite() || increment <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "increment",
                reason: format!("must be a finite positive number, got {}", increment),
            });
        }
        self.increment = increment;
        Ok(self)
    }

    pub fn simulator(&self) -> &GrowthSimulator {
        &self.simulator
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Adoption probability at `bonus`, rejected when outside `[0, 1]`.
    pub fn probability_at<A: AdoptionModel + ?Sized>(
        &self,
        bonus: f64,
        adoption: &A,
    ) -> Result<f64, SimError> {
        let p = adoption.probability(bonus);
        validate_probability(p)?;
        Ok(p)
    }

    /// Simulated cumulative hires after `days` at the given bonus.
    pub fn projected_hires<A: AdoptionModel + ?Sized>(
        &self,
        days: u32,
        bonus: f64,
        adoption: &A,
    ) -> Result<f64, SimError> {
        let p = self.probability_at(bonus, adoption)?;
        self.simulator.total_after(p, days)
    }

    fn meets<A: AdoptionModel + ?Sized>(
        &self,
        days: u32,
        target: f64,
        bonus: f64,
        adoption: &A,
    ) -> Result<bool, SimError> {
        Ok(self.projected_hires(days, bonus, adoption)? >= target)
    }

    /// Doubles a trial bonus until the target is met.
    ///
    /// Fails with [`SimError::Infeasible`] once adoption saturates without
    /// meeting the target, or when the trial passes [`MAX_BONUS`].
    pub fn find_search_upper_bound<A: AdoptionModel + ?Sized>(
        &self,
        days: u32,
        target_hires: f64,
        adoption: &A,
    ) -> Result<f64, SimError> {
        validate_days(days)?;
        validate_target(target_hires)?;

        let mut trial = INITIAL_TRIAL_BONUS;
        loop {
            let p = self.probability_at(trial, adoption)?;
            let hires = self.simulator.total_after(p, days)?;
            tracing::debug!(trial, probability = p, hires, "bracketing bonus");
            if hires >= target_hires {
                return Ok(trial);
            }
            if p >= SATURATION_PROBABILITY {
                return Err(SimError::Infeasible {
                    target: target_hires,
                    days,
                    reason: format!(
                        "adoption saturates at probability {:.3} with only {:.1} hires",
                        p, hires
                    ),
                });
            }
            trial *= 2.0;
            if trial > MAX_BONUS {
                return Err(SimError::Infeasible {
                    target: target_hires,
                    days,
                    reason: format!("no bonus up to {} meets the target", MAX_BONUS),
                });
            }
        }
    }

    /// Smallest bonus, rounded up to the increment, whose simulated outcome
    /// meets `target_hires` within `days`.
    ///
    /// # Preconditions
    ///
    /// `adoption` must be non-decreasing in the bonus and return values in
    /// `[0, 1]`. Range violations are reported; monotonicity violations
    /// produce unspecified results (at best a [`SimError::NonMonotoneAdoption`]).
    pub fn min_bonus_for_target<A: AdoptionModel + ?Sized>(
        &self,
        days: u32,
        target_hires: f64,
        adoption: &A,
        epsilon: f64,
    ) -> Result<BonusRecommendation, SimError> {
        validate_days(days)?;
        validate_target(target_hires)?;
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "epsilon",
                reason: format!("must be a finite positive number, got {}", epsilon),
            });
        }

        if target_hires <= 0.0 || self.meets(days, target_hires, 0.0, adoption)? {
            return self.recommendation(days, target_hires, 0.0, adoption, 0.0, 0);
        }

        let upper = self.find_search_upper_bound(days, target_hires, adoption)?;

        // meets(lo) is false, meets(hi) is true.
        let (mut lo, mut hi) = (0.0, upper);
        let mut iterations = 0;
        while hi - lo >= epsilon && iterations < MAX_BISECTION_STEPS {
            let mid = lo + (hi - lo) / 2.0;
            if self.meets(days, target_hires, mid, adoption)? {
                hi = mid;
            } else {
                lo = mid;
            }
            iterations += 1;
        }

        // Smallest passing multiple k * increment with k in (k_lo, k_hi].
        // k_lo * increment <= lo fails; k_hi * increment >= hi must pass.
        let mut k_lo = (lo / self.increment).floor();
        let mut k_hi = (hi / self.increment).ceil();
        if !self.meets(days, target_hires, k_hi * self.increment, adoption)? {
            return Err(SimError::NonMonotoneAdoption {
                bonus: k_hi * self.increment,
            });
        }
        while k_hi - k_lo > 1.0 {
            let k_mid = (k_lo + (k_hi - k_lo) / 2.0).floor();
            if self.meets(days, target_hires, k_mid * self.increment, adoption)? {
                k_hi = k_mid;
            } else {
                k_lo = k_mid;
            }
            iterations += 1;
        }
        let bonus = k_hi * self.increment;

        tracing::debug!(bonus, iterations, upper, "minimal bonus found");
        self.recommendation(days, target_hires, bonus, adoption, upper, iterations)
    }

    fn recommendation<A: AdoptionModel + ?Sized>(
        &self,
        days: u32,
        target_hires: f64,
        bonus: f64,
        adoption: &A,
        search_upper_bound: f64,
        iterations: u32,
    ) -> Result<BonusRecommendation, SimError> {
        let probability = self.probability_at(bonus, adoption)?;
        Ok(BonusRecommendation {
            bonus,
            probability,
            projected_hires: self.simulator.total_after(probability, days)?,
            target_hires,
            days,
            search_upper_bound,
            iterations,
        })
    }
}
