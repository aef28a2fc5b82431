//! Seeded synthetic referral networks.
//!
//! Produces reproducible referral forests for demos, benchmarks and tests:
//! given the same [`NetworkShape`], the same edges are generated in the same
//! order. Every generated edge points from an earlier user to a later one, so
//! the result is acyclic by construction and never trips a constraint.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::graph::ReferralGraph;
use crate::store::GraphStore;

/// Parameters for [`generate_network`].
#[derive(Debug, Clone)]
pub struct NetworkShape {
    /// Number of users, named `user_0000`, `user_0001`, ...
    pub users: usize,
    /// Probability that a user (other than the first) has no referrer.
    pub root_probability: f64,
    /// Bias toward recent referrers: 0 picks uniformly, values near 1 favour
    /// the newest users and produce deep chains.
    pub recency_bias: f64,
    /// Seed for the deterministic PRNG.
    pub seed: u64,
}

impl Default for NetworkShape {
    fn default() -> Self {
        NetworkShape {
            users: 50,
            root_probability: 0.1,
            recency_bias: 0.3,
            seed: 42,
        }
    }
}

pub fn user_name(index: usize) -> String {
    format!("user_{:04}", index)
}

/// Generates the edge list for `shape`.
pub fn generate_edges(shape: &NetworkShape) -> Vec<(String, String)> {
    let mut rng = ChaCha8Rng::seed_from_u64(shape.seed);
    let root_probability = unit_interval(shape.root_probability);
    let recency_bias = unit_interval(shape.recency_bias);
    let mut edges = Vec::with_capacity(shape.users.saturating_sub(1));

    for candidate in 1..shape.users {
        if rng.gen_bool(root_probability) {
            continue;
        }
        let referrer = if rng.gen_bool(recency_bias) {
            // Pick among the five most recent users.
            let window = candidate.min(5);
            candidate - 1 - rng.gen_range(0..window)
        } else {
            rng.gen_range(0..candidate)
        };
        edges.push((user_name(referrer), user_name(candidate)));
    }
    edges
}

fn unit_interval(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Generates a graph for `shape`. Users that end up isolated roots with no
/// referrals never appear, since users only exist through edges.
pub fn generate_network(shape: &NetworkShape) -> ReferralGraph {
    let (graph, rejected) = ReferralGraph::from_edges(generate_edges(shape));
    debug_assert!(rejected.is_empty());
    tracing::debug!(
        users = graph.user_count(),
        edges = graph.edge_count(),
        seed = shape.seed,
        "synthetic network generated"
    );
    graph
}
