//! ReferralGraph: the in-memory referral DAG.
//!
//! [`ReferralGraph`] is the single owner of referral edges. It keeps three
//! structures in lockstep:
//! - a petgraph `StableGraph` holding the adjacency (referrer -> candidates),
//! - an insertion-ordered index from [`UserId`] to node index,
//! - a reverse map from candidate to its single referrer.
//!
//! All mutations go through [`GraphStore::add_edge`], which runs every
//! constraint check before touching any of the three, so a rejected edge
//! never leaves a partially inserted node behind.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::{Directed, Direction};

use crate::error::{CoreError, RejectReason};
use crate::id::UserId;
use crate::store::GraphStore;

/// An edge refused while bulk-loading, with the reason it was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEdge {
    pub referrer: String,
    pub candidate: String,
    pub error: CoreError,
}

/// The referral DAG.
#[derive(Debug, Clone, Default)]
pub struct ReferralGraph {
    /// Adjacency: referrer -> candidate edges.
    graph: StableGraph<UserId, (), Directed, u32>,
    /// UserId -> node index, in order of first mention.
    index: IndexMap<UserId, NodeIndex<u32>>,
    /// Reverse map: candidate -> referrer.
    referrers: HashMap<UserId, UserId>,
    /// Bumped on every accepted edge.
    generation: u64,
}

impl ReferralGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph by replaying `add_edge` over `edges`.
    ///
    /// Edges are applied in order; refused edges are collected rather than
    /// aborting the load, so one bad line does not discard the rest.
    pub fn from_edges<I, R, C>(edges: I) -> (Self, Vec<RejectedEdge>)
    where
        I: IntoIterator<Item = (R, C)>,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        let mut graph = ReferralGraph::new();
        let mut rejected = Vec::new();
        for (referrer, candidate) in edges {
            let (referrer, candidate) = (referrer.as_ref(), candidate.as_ref());
            if let Err(error) = graph.add_edge(referrer, candidate) {
                rejected.push(RejectedEdge {
                    referrer: referrer.to_string(),
                    candidate: candidate.to_string(),
                    error,
                });
            }
        }
        (graph, rejected)
    }

    /// All edges as `(referrer, candidate)` pairs, sorted.
    pub fn edges(&self) -> Vec<(&UserId, &UserId)> {
        let mut edges: Vec<(&UserId, &UserId)> = self
            .referrers
            .iter()
            .map(|(candidate, referrer)| (referrer, candidate))
            .collect();
        edges.sort();
        edges
    }

    /// Users without a referrer, in ascending order.
    pub fn roots(&self) -> Vec<&UserId> {
        let mut roots: Vec<&UserId> = self
            .index
            .keys()
            .filter(|user| !self.referrers.contains_key(user.as_str()))
            .collect();
        roots.sort();
        roots
    }

    /// Checks every structural invariant from scratch.
    ///
    /// Returns [`CoreError::GraphInconsistency`] naming the first violation.
    pub fn verify_invariants(&self) -> Result<(), CoreError> {
        for (user, &idx) in &self.index {
            let incoming: Vec<NodeIndex<u32>> = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .collect();
            if incoming.len() > 1 {
                return Err(CoreError::GraphInconsistency {
                    reason: format!("'{}' has {} referrers", user, incoming.len()),
                });
            }
            if incoming.contains(&idx) {
                return Err(CoreError::GraphInconsistency {
                    reason: format!("'{}' refers itself", user),
                });
            }
            let recorded = self.referrers.get(user.as_str());
            let actual = incoming.first().map(|&parent| &self.graph[parent]);
            if recorded != actual {
                return Err(CoreError::GraphInconsistency {
                    reason: format!(
                        "reverse map for '{}' is {:?}, adjacency says {:?}",
                        user, recorded, actual
                    ),
                });
            }
        }
        if is_cyclic_directed(&self.graph) {
            return Err(CoreError::GraphInconsistency {
                reason: "graph contains a directed cycle".into(),
            });
        }
        Ok(())
    }

    fn node(&self, user: &str) -> Option<NodeIndex<u32>> {
        self.index.get(user).copied()
    }

    fn ensure_node(&mut self, user: &UserId) -> NodeIndex<u32> {
        if let Some(&idx) = self.index.get(user.as_str()) {
            return idx;
        }
        let idx = self.graph.add_node(user.clone());
        self.index.insert(user.clone(), idx);
        idx
    }

    /// True if a directed path `from -> ... -> to` exists. Unknown endpoints
    /// have no paths.
    fn path_exists(&self, from: &str, to: &str) -> bool {
        match (self.node(from), self.node(to)) {
            (Some(from), Some(to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    fn check_edge(&self, referrer: &UserId, candidate: &UserId) -> Result<(), RejectReason> {
        if referrer == candidate {
            return Err(RejectReason::SelfReferral {
                user: referrer.clone(),
            });
        }
        if let Some(existing) = self.referrers.get(candidate.as_str()) {
            return Err(RejectReason::DuplicateReferrer {
                candidate: candidate.clone(),
                existing: existing.clone(),
            });
        }
        if self.path_exists(candidate.as_str(), referrer.as_str()) {
            return Err(RejectReason::CycleDetected {
                referrer: referrer.clone(),
                candidate: candidate.clone(),
            });
        }
        Ok(())
    }

    /// Checks the state touched by inserting `referrer -> candidate`: both
    /// index entries, the candidate's single incoming edge and its reverse-map
    /// entry.
    #[cfg(debug_assertions)]
    fn check_insert(&self, referrer: &UserId, candidate: &UserId) -> Result<(), CoreError> {
        let inconsistent = |reason: String| Err(CoreError::GraphInconsistency { reason });

        let (Some(from), Some(to)) = (self.node(referrer.as_str()), self.node(candidate.as_str()))
        else {
            return inconsistent(format!("'{}' or '{}' missing from index", referrer, candidate));
        };
        if &self.graph[from] != referrer || &self.graph[to] != candidate {
            return inconsistent(format!("index for '{}' or '{}' is stale", referrer, candidate));
        }
        let mut incoming = self.graph.neighbors_directed(to, Direction::Incoming);
        if incoming.next() != Some(from) || incoming.next().is_some() {
            return inconsistent(format!("'{}' does not have exactly one referrer", candidate));
        }
        if self.referrers.get(candidate.as_str()) != Some(referrer) {
            return inconsistent(format!("reverse map for '{}' disagrees with adjacency", candidate));
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn assert_consistency(&self, referrer: &UserId, candidate: &UserId) {
        if let Err(err) = self.check_insert(referrer, candidate) {
            panic!("referral graph invariant broken after insert: {}", err);
        }
    }
}

impl GraphStore for ReferralGraph {
    fn add_edge(&mut self, referrer: &str, candidate: &str) -> Result<(), CoreError> {
        let referrer = UserId::new(referrer)?;
        let candidate = UserId::new(candidate)?;

        if let Err(reason) = self.check_edge(&referrer, &candidate) {
            tracing::warn!(%reason, "referral rejected");
            return Err(reason.into());
        }

        let from = self.ensure_node(&referrer);
        let to = self.ensure_node(&candidate);
        self.graph.add_edge(from, to, ());
        self.referrers.insert(candidate.clone(), referrer.clone());
        self.generation += 1;

        tracing::debug!(
            referrer = %referrer,
            candidate = %candidate,
            generation = self.generation,
            "referral accepted"
        );

        #[cfg(debug_assertions)]
        self.assert_consistency(&referrer, &candidate);

        Ok(())
    }

    fn direct_referrals(&self, user: &str) -> BTreeSet<&UserId> {
        match self.node(user) {
            Some(idx) => self.graph.neighbors(idx).map(|n| &self.graph[n]).collect(),
            None => BTreeSet::new(),
        }
    }

    fn referrer(&self, user: &str) -> Option<&UserId> {
        self.referrers.get(user)
    }

    fn contains(&self, user: &str) -> bool {
        self.index.contains_key(user)
    }

    fn users(&self) -> Vec<&UserId> {
        let mut users: Vec<&UserId> = self.index.keys().collect();
        users.sort();
        users
    }

    fn user_count(&self) -> usize {
        self.index.len()
    }

    fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ReferralGraph {
        let mut graph = ReferralGraph::new();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", "c").unwrap();
        graph.add_edge("c", "d").unwrap();
        graph
    }

    fn names(set: BTreeSet<&UserId>) -> Vec<&str> {
        set.into_iter().map(UserId::as_str).collect()
    }

    #[test]
    fn valid_referral_is_recorded() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("Alice", "Bob").unwrap();

        assert_eq!(names(graph.direct_referrals("Alice")), vec!["Bob"]);
        assert_eq!(graph.referrer("Bob").map(UserId::as_str), Some("Alice"));
        assert!(graph.direct_referrals("Bob").is_empty());
        assert_eq!(graph.user_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn unknown_user_has_no_referrals() {
        let graph = chain();
        assert!(graph.direct_referrals("zed").is_empty());
        assert!(graph.referrer("zed").is_none());
        assert!(graph.referrer("a").is_none());
    }

    #[test]
    fn self_referral_rejected_without_mutation() {
        let mut graph = ReferralGraph::new();
        let err = graph.add_edge("a", "a").unwrap_err();
        assert_eq!(
            err.reject_reason(),
            Some(&RejectReason::SelfReferral {
                user: UserId::new("a").unwrap()
            })
        );
        assert_eq!(graph.user_count(), 0);
        assert_eq!(graph.generation(), 0);
        assert!(!graph.contains("a"));
    }

    #[test]
    fn duplicate_referrer_rejected() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("x", "y").unwrap();
        let before = graph.edges().len();

        let err = graph.add_edge("x", "y").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Rejected(RejectReason::DuplicateReferrer { .. })
        ));

        let err = graph.add_edge("z", "y").unwrap_err();
        match err {
            CoreError::Rejected(RejectReason::DuplicateReferrer { candidate, existing }) => {
                assert_eq!(candidate.as_str(), "y");
                assert_eq!(existing.as_str(), "x");
            }
            other => panic!("expected DuplicateReferrer, got {:?}", other),
        }

        assert_eq!(graph.edges().len(), before);
        assert!(!graph.contains("z"), "rejected referrer must not be created");
        assert_eq!(graph.generation(), 1);
    }

    #[test]
    fn simple_cycle_rejected() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("Alice", "Bob").unwrap();
        let err = graph.add_edge("Bob", "Alice").unwrap_err();
        assert!(matches!(
            err.reject_reason(),
            Some(RejectReason::CycleDetected { .. })
        ));
        assert_eq!(graph.direct_referrals("Alice").len(), 1);
        assert!(graph.direct_referrals("Bob").is_empty());
    }

    #[test]
    fn long_cycle_rejected() {
        let mut graph = chain();
        let err = graph.add_edge("d", "a").unwrap_err();
        assert!(matches!(
            err.reject_reason(),
            Some(RejectReason::CycleDetected { .. })
        ));
        assert!(graph.direct_referrals("d").is_empty());
        graph.verify_invariants().unwrap();
    }

    #[test]
    fn self_referral_checked_before_duplicate() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("a", "b").unwrap();
        let err = graph.add_edge("b", "b").unwrap_err();
        assert!(matches!(
            err.reject_reason(),
            Some(RejectReason::SelfReferral { .. })
        ));
    }

    #[test]
    fn duplicate_checked_before_cycle() {
        // d -> b would close a cycle, but b already has a referrer and that
        // check runs first.
        let mut graph = chain();
        let err = graph.add_edge("d", "b").unwrap_err();
        assert!(matches!(
            err.reject_reason(),
            Some(RejectReason::DuplicateReferrer { .. })
        ));
    }

    #[test]
    fn invalid_identifier_rejected() {
        let mut graph = ReferralGraph::new();
        assert!(matches!(
            graph.add_edge("", "b"),
            Err(CoreError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            graph.add_edge("a", " "),
            Err(CoreError::InvalidIdentifier { .. })
        ));
        assert_eq!(graph.user_count(), 0);
    }

    #[test]
    fn disjoint_components_can_join() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("c", "d").unwrap();
        // c is a root, so b -> c merges the trees without a cycle.
        graph.add_edge("b", "c").unwrap();
        let roots: Vec<&str> = graph.roots().into_iter().map(UserId::as_str).collect();
        assert_eq!(roots, vec!["a"]);
        graph.verify_invariants().unwrap();
    }

    #[test]
    fn generation_tracks_accepted_edges_only() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("a", "b").unwrap();
        let _ = graph.add_edge("b", "a");
        let _ = graph.add_edge("a", "a");
        graph.add_edge("a", "c").unwrap();
        assert_eq!(graph.generation(), 2);
    }

    #[test]
    fn from_edges_collects_rejections() {
        let edges = vec![("a", "b"), ("b", "c"), ("c", "a"), ("a", "a"), ("x", "c")];
        let (graph, rejected) = ReferralGraph::from_edges(edges);

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(rejected.len(), 3);
        assert_eq!(rejected[0].referrer, "c");
        assert!(matches!(
            rejected[0].error.reject_reason(),
            Some(RejectReason::CycleDetected { .. })
        ));
        assert!(matches!(
            rejected[2].error.reject_reason(),
            Some(RejectReason::DuplicateReferrer { .. })
        ));
    }

    #[test]
    fn edges_and_users_are_sorted() {
        let mut graph = ReferralGraph::new();
        graph.add_edge("m", "z").unwrap();
        graph.add_edge("m", "b").unwrap();
        graph.add_edge("b", "a").unwrap();

        let edges: Vec<(&str, &str)> = graph
            .edges()
            .into_iter()
            .map(|(r, c)| (r.as_str(), c.as_str()))
            .collect();
        assert_eq!(edges, vec![("b", "a"), ("m", "b"), ("m", "z")]);

        let users: Vec<&str> = graph.users().into_iter().map(UserId::as_str).collect();
        assert_eq!(users, vec!["a", "b", "m", "z"]);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn insert_check_catches_corrupted_reverse_map() {
        let mut graph = chain();
        let (b, c) = (UserId::new("b").unwrap(), UserId::new("c").unwrap());
        assert!(graph.check_insert(&b, &c).is_ok());

        graph.referrers.insert(c.clone(), UserId::new("a").unwrap());
        assert!(matches!(
            graph.check_insert(&b, &c),
            Err(CoreError::GraphInconsistency { .. })
        ));
        assert!(graph.check_insert(&c, &b).is_err());
    }

    #[test]
    fn long_chain_loads_in_one_pass() {
        let names: Vec<String> = (0..3000).map(|i| format!("u{}", i)).collect();
        let (graph, rejected) =
            ReferralGraph::from_edges(names.windows(2).map(|w| (w[0].as_str(), w[1].as_str())));
        assert!(rejected.is_empty());
        assert_eq!(graph.edge_count(), 2999);
        graph.verify_invariants().unwrap();
    }
}
