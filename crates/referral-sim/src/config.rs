//! Growth model configuration.
//!
//! Defaults: 100 initially active referrers, each
//! able to make 10 successful referrals before exhausting their network.
//! Both values can be overridden through the environment:
//! - `REFERRAL_INITIAL_REFERRERS`
//! - `REFERRAL_CAPACITY_PER_USER`

use serde::{Deserialize, Serialize};

use crate::error::SimError;

pub const ENV_INITIAL_REFERRERS: &str = "REFERRAL_INITIAL_REFERRERS";
pub const ENV_CAPACITY_PER_USER: &str = "REFERRAL_CAPACITY_PER_USER";

/// Fixed parameters of the fluid growth model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Active referrers on day 0.
    pub initial_active_referrers: f64,
    /// Successful referrals a single user can make over their lifetime.
    pub capacity_per_user: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        GrowthConfig {
            initial_active_referrers: 100.0,
            capacity_per_user: 10.0,
        }
    }
}

impl GrowthConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, SimError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SimError> {
        let mut config = GrowthConfig::default();
        if let Some(raw) = lookup(ENV_INITIAL_REFERRERS) {
            config.initial_active_referrers = parse_number("initial_active_referrers", &raw)?;
        }
        if let Some(raw) = lookup(ENV_CAPACITY_PER_USER) {
            config.capacity_per_user = parse_number("capacity_per_user", &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !self.initial_active_referrers.is_finite() || self.initial_active_referrers < 0.0 {
            return Err(SimError::InvalidParameter {
                name: "initial_active_referrers",
                reason: format!(
                    "must be a finite non-negative number, got {}",
                    self.initial_active_referrers
                ),
            });
        }
        if !self.capacity_per_user.is_finite() || self.capacity_per_user <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "capacity_per_user",
                reason: format!(
                    "must be a finite positive number, got {}",
                    self.capacity_per_user
                ),
            });
        }
        Ok(())
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<f64, SimError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| SimError::InvalidParameter {
            name,
            reason: format!("cannot parse {:?}: {}", raw, e),
        })
}
