//! Referral growth simulation and bonus optimization.
//!
//! [`GrowthSimulator`] runs a deterministic fluid model of referral growth;
//! [`BonusOptimizer`] searches for the smallest bonus whose simulated
//! outcome meets a hiring target under a caller-supplied [`AdoptionModel`].

pub mod adoption;
pub mod bonus;
pub mod config;
pub mod error;
pub mod growth;
pub mod report;

pub use adoption::{AdoptionModel, LinearAdoption, SaturatingAdoption};
pub use bonus::{BonusOptimizer, BonusRecommendation};
pub use config::GrowthConfig;
pub use error::SimError;
pub use growth::{GrowthAnalytics, GrowthSimulator, SimulationState, MAX_DAYS};
pub use report::{Confidence, OptimizationReport, SweepPoint};
