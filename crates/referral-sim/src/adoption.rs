//! Adoption models: how a referral bonus translates into a daily success
//! probability.
//!
//! The optimizer accepts anything implementing [`AdoptionModel`], including
//! plain closures. Implementations must be monotonically non-decreasing in
//! the bonus and return values in `[0, 1]`; the optimizer rejects
//! out-of-range probabilities but cannot detect a non-monotone curve.

use serde::{Deserialize, Serialize};

/// Maps a bonus amount to a daily referral success probability.
pub trait AdoptionModel {
    fn probability(&self, bonus: f64) -> f64;
}

impl<F> AdoptionModel for F
where
    F: Fn(f64) -> f64,
{
    fn probability(&self, bonus: f64) -> f64 {
        self(bonus)
    }
}

/// `min(cap, base + per_dollar * bonus)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearAdoption {
    pub base: f64,
    pub per_dollar: f64,
    pub cap: f64,
}

impl AdoptionModel for LinearAdoption {
    fn probability(&self, bonus: f64) -> f64 {
        (self.base + self.per_dollar * bonus.max(0.0)).min(self.cap)
    }
}

/// `base + (max - base) * (1 - exp(-bonus / scale))`: rises quickly for
/// small bonuses and flattens toward `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturatingAdoption {
    pub base: f64,
    pub max: f64,
    pub scale: f64,
}

impl Default for SaturatingAdoption {
    fn default() -> Self {
        SaturatingAdoption {
            base: 0.02,
            max: 0.5,
            scale: 500.0,
        }
    }
}

impl AdoptionModel for SaturatingAdoption {
    fn probability(&self, bonus: f64) -> f64 {
        let lift = 1.0 - (-bonus.max(0.0) / self.scale).exp();
        self.base + (self.max - self.base) * lift
    }
}
