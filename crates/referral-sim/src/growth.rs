//! Deterministic fluid model of referral growth.
//!
//! The simulator tracks expected values, not individual users. Each day:
//!
//! ```text
//! daily      = active * p
//! cumulative = cumulative + daily
//! active     = max(0, active - min(active, daily / capacity) + daily)
//! ```
//!
//! `daily / capacity` is the share of referrers who exhaust their personal
//! capacity that day; `daily` newly referred users join as referrers. With
//! non-negative inputs the cumulative series never decreases, and for a fixed
//! day count it is non-decreasing in `p`, which the bonus optimizer relies on.

use serde::Serialize;

use crate::config::GrowthConfig;
use crate::error::SimError;

/// Longest horizon accepted by any simulation call.
pub const MAX_DAYS: u32 = 1000;

/// Targets up to this size are located by a day-by-day scan; larger targets
/// use doubling plus bisection.
pub const LINEAR_SCAN_LIMIT: f64 = 10_000.0;

/// Expected-value state after `day` simulated days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationState {
    pub day: u32,
    pub active_referrers: f64,
    pub cumulative: f64,
}

impl SimulationState {
    fn initial(config: &GrowthConfig) -> Self {
        SimulationState {
            day: 0,
            active_referrers: config.initial_active_referrers,
            cumulative: 0.0,
        }
    }

    /// Advances one day and returns that day's expected referrals.
    fn step(&mut self, probability: f64, capacity: f64) -> f64 {
        let daily = self.active_referrers * probability;
        self.cumulative += daily;
        let exhausted = self.active_referrers.min(daily / capacity);
        self.active_referrers = (self.active_referrers - exhausted + daily).max(0.0);
        self.day += 1;
        daily
    }
}

/// Summary of a simulated series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthAnalytics {
    pub probability: f64,
    pub days: u32,
    pub final_total: f64,
    /// Expected referrals made on each day.
    pub daily_increments: Vec<f64>,
    pub peak_increment: f64,
    /// 1-indexed day of the peak increment; 0 for an empty series.
    pub peak_day: u32,
    pub average_daily: f64,
    /// Mean change in the daily increment from one day to the next.
    pub average_acceleration: f64,
}

/// Fluid growth simulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthSimulator {
    config: GrowthConfig,
}

pub(crate) fn validate_probability(probability: f64) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(SimError::InvalidProbability { value: probability })
    }
}

pub(crate) fn validate_days(days: u32) -> Result<(), SimError> {
    if days > MAX_DAYS {
        return Err(SimError::InvalidDays {
            days,
            max: MAX_DAYS,
        });
    }
    Ok(())
}

pub(crate) fn validate_target(target: f64) -> Result<(), SimError> {
    if target.is_nan() {
        return Err(SimError::InvalidParameter {
            name: "target",
            reason: "target is NaN".into(),
        });
    }
    Ok(())
}

impl GrowthSimulator {
    pub fn new(config: GrowthConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(GrowthSimulator { config })
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    /// Cumulative expected referrals at the end of each day.
    pub fn simulate(&self, probability: f64, days: u32) -> Result<Vec<f64>, SimError> {
        Ok(self
            .trajectory(probability, days)?
            .into_iter()
            .map(|state| state.cumulative)
            .collect())
    }

    /// Full state at the end of each day.
    pub fn trajectory(&self, probability: f64, days: u32) -> Result<Vec<SimulationState>, SimError> {
        validate_probability(probability)?;
        validate_days(days)?;

        let mut state = SimulationState::initial(&self.config);
        let mut states = Vec::with_capacity(days as usize);
        for _ in 0..days {
            state.step(probability, self.config.capacity_per_user);
            states.push(state);
        }
        Ok(states)
    }

    /// Cumulative total after `days`, without materializing the series.
    pub fn total_after(&self, probability: f64, days: u32) -> Result<f64, SimError> {
        validate_probability(probability)?;
        validate_days(days)?;

        let mut state = SimulationState::initial(&self.config);
        for _ in 0..days {
            state.step(probability, self.config.capacity_per_user);
        }
        Ok(state.cumulative)
    }

    /// Smallest number of days after which the cumulative total reaches
    /// `target`.
    ///
    /// Returns 0 for non-positive targets and [`SimError::Unreachable`] when
    /// the target is not met within [`MAX_DAYS`], which always happens for a
    /// zero probability.
    pub fn days_to_target(&self, probability: f64, target: f64) -> Result<u32, SimError> {
        validate_probability(probability)?;
        validate_target(target)?;

        if target <= 0.0 {
            return Ok(0);
        }
        let unreachable = SimError::Unreachable {
            target,
            ceiling_days: MAX_DAYS,
        };
        if probability <= 0.0 {
            return Err(unreachable);
        }

        if target <= LINEAR_SCAN_LIMIT {
            let mut state = SimulationState::initial(&self.config);
            for day in 1..=MAX_DAYS {
                state.step(probability, self.config.capacity_per_user);
                if state.cumulative >= target {
                    return Ok(day);
                }
            }
            return Err(unreachable);
        }

        // Grow an upper bound until the target is met.
        let mut hi = 1;
        while self.total_after(probability, hi)? < target {
            if hi == MAX_DAYS {
                return Err(unreachable);
            }
            hi = (hi * 2).min(MAX_DAYS);
        }

        // total(lo) < target <= total(hi)
        let mut lo = hi / 2;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.total_after(probability, mid)? >= target {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        tracing::debug!(probability, target, days = hi, "days to target located");
        Ok(hi)
    }

    /// Increments, peak day, average daily growth and acceleration of a run.
    pub fn analytics(&self, probability: f64, days: u32) -> Result<GrowthAnalytics, SimError> {
        let series = self.simulate(probability, days)?;

        let mut previous = 0.0;
        let increments: Vec<f64> = series
            .iter()
            .map(|&total| {
                let inc = total - previous;
                previous = total;
                inc
            })
            .collect();

        let (peak_day, peak_increment) = increments
            .iter()
            .enumerate()
            .fold((0u32, 0.0f64), |(best_day, best), (i, &inc)| {
                if best_day == 0 || inc > best {
                    (i as u32 + 1, inc)
                } else {
                    (best_day, best)
                }
            });

        let final_total = series.last().copied().unwrap_or(0.0);
        let average_daily = if days == 0 { 0.0 } else { final_total / days as f64 };
        let average_acceleration = if increments.len() < 2 {
            0.0
        } else {
            let diffs: f64 = increments.windows(2).map(|w| w[1] - w[0]).sum();
            diffs / (increments.len() - 1) as f64
        };

        Ok(GrowthAnalytics {
            probability,
            days,
            final_total,
            daily_increments: increments,
            peak_increment,
            peak_day,
            average_daily,
            average_acceleration,
        })
    }
}
