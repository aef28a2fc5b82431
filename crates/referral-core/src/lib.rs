//! Referral network graph and analytics.
//!
//! - [`graph::ReferralGraph`] owns the referral DAG and rejects any edge that
//!   would break its invariants.
//! - [`reach::ReachAnalytics`] answers descendant queries over any
//!   [`store::GraphStore`].
//! - [`influence::InfluencerEngine`] builds coverage and centrality rankings
//!   on top of reach analytics.
//! - [`shared::SharedNetwork`] serializes mutations for multi-threaded use.

pub mod error;
pub mod generate;
pub mod graph;
pub mod id;
pub mod influence;
pub mod reach;
pub mod shared;
pub mod store;

// Re-export commonly used types
pub use error::{CoreError, RejectReason};
pub use graph::{ReferralGraph, RejectedEdge};
pub use id::UserId;
pub use influence::{
    CentralityScore, DistanceMatrix, InfluencerComparison, InfluencerEngine, UniqueReachReport,
    UniqueReachSelection,
};
pub use reach::{ReachAnalytics, ReachCache, ReachStatistics, ReferrerRank};
pub use shared::SharedNetwork;
pub use store::GraphStore;
