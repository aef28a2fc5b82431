//! Descendant reach over a [`GraphStore`].
//!
//! [`ReachAnalytics`] borrows a graph immutably and answers traversal queries
//! against it: descendant sets, reach counts, top referrers, depth frontiers
//! and aggregate statistics. Descendant sets are memoized in a
//! [`ReachCache`] stamped with the graph generation it was built from; a
//! stamp mismatch clears the cache before any lookup, so sets computed before
//! an accepted edge are never served afterwards.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::id::UserId;
use crate::store::GraphStore;

/// Memoized descendant sets, valid for a single graph generation.
#[derive(Debug, Clone, Default)]
pub struct ReachCache {
    generation: u64,
    sets: HashMap<UserId, Arc<BTreeSet<UserId>>>,
}

impl ReachCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph generation the cached sets belong to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Drops every entry if `generation` differs from the stamp. Returns true
    /// when entries were invalidated.
    pub fn sync(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            return false;
        }
        let dropped = !self.sets.is_empty();
        self.sets.clear();
        self.generation = generation;
        if dropped {
            tracing::debug!(generation, "reach cache invalidated");
        }
        dropped
    }

    fn get(&self, user: &str) -> Option<Arc<BTreeSet<UserId>>> {
        self.sets.get(user).cloned()
    }

    fn insert(&mut self, user: UserId, set: Arc<BTreeSet<UserId>>) {
        self.sets.insert(user, set);
    }
}

/// One entry of a reach ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerRank {
    pub user: UserId,
    pub reach: usize,
}

/// Aggregate reach statistics over every user in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachStatistics {
    pub users: usize,
    pub total_reach: usize,
    pub mean_reach: f64,
    pub median_reach: f64,
    pub max_reach: usize,
    pub min_reach: usize,
    /// Users with at least one descendant.
    pub active_referrers: usize,
}

/// Read-only traversal analytics over a borrowed graph.
pub struct ReachAnalytics<'g, G: GraphStore + ?Sized> {
    graph: &'g G,
    cache: RefCell<ReachCache>,
}

impl<'g, G: GraphStore + ?Sized> ReachAnalytics<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self::with_cache(graph, ReachCache::new())
    }

    /// Reuses a cache from an earlier session. Entries from another
    /// generation are discarded.
    pub fn with_cache(graph: &'g G, mut cache: ReachCache) -> Self {
        cache.sync(graph.generation());
        ReachAnalytics {
            graph,
            cache: RefCell::new(cache),
        }
    }

    /// Hands the cache back for reuse.
    pub fn into_cache(self) -> ReachCache {
        self.cache.into_inner()
    }

    pub fn graph(&self) -> &'g G {
        self.graph
    }

    /// Every user reachable from `user` through directed edges, excluding
    /// `user` itself. Unknown users have an empty set.
    pub fn reach_set(&self, user: &str) -> Arc<BTreeSet<UserId>> {
        if !self.graph.contains(user) {
            return Arc::new(BTreeSet::new());
        }

        let mut cache = self.cache.borrow_mut();
        cache.sync(self.graph.generation());
        if let Some(hit) = cache.get(user) {
            return hit;
        }

        let set = Arc::new(self.descendants(user));
        if let Ok(key) = UserId::new(user) {
            cache.insert(key, Arc::clone(&set));
        }
        set
    }

    /// Number of descendants of `user`; 0 for unknown users.
    pub fn reach(&self, user: &str) -> usize {
        self.reach_set(user).len()
    }

    /// Reach of every user, in ascending identifier order.
    pub fn all_reach(&self) -> Vec<(&'g UserId, usize)> {
        self.graph
            .users()
            .into_iter()
            .map(|user| (user, self.reach(user.as_str())))
            .collect()
    }

    /// The `k` users with the largest reach. Ties go to the smaller
    /// identifier. Users with no descendants are never ranked.
    pub fn top_referrers_by_reach(&self, k: usize) -> Vec<ReferrerRank> {
        if k == 0 {
            return Vec::new();
        }
        let mut ranks: Vec<ReferrerRank> = self
            .all_reach()
            .into_iter()
            .filter(|&(_, reach)| reach > 0)
            .map(|(user, reach)| ReferrerRank {
                user: user.clone(),
                reach,
            })
            .collect();
        ranks.sort_by(|a, b| b.reach.cmp(&a.reach).then_with(|| a.user.cmp(&b.user)));
        ranks.truncate(k);
        ranks
    }

    /// Users exactly `depth` hops below `root` (depth 1 = direct referrals).
    pub fn users_at_depth(&self, root: &str, depth: usize) -> BTreeSet<&'g UserId> {
        if depth < 1 || !self.graph.contains(root) {
            return BTreeSet::new();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(root);
        let mut frontier: BTreeSet<&'g UserId> = self.graph.direct_referrals(root);
        for user in &frontier {
            seen.insert(user.as_str());
        }

        for _ in 1..depth {
            let mut next = BTreeSet::new();
            for user in &frontier {
                for child in self.graph.direct_referrals(user.as_str()) {
                    if seen.insert(child.as_str()) {
                        next.insert(child);
                    }
                }
            }
            if next.is_empty() {
                return next;
            }
            frontier = next;
        }
        frontier
    }

    /// Sum, mean, median, extremes and nonzero count of every user's reach.
    pub fn statistics(&self) -> ReachStatistics {
        let mut values: Vec<usize> = self.all_reach().into_iter().map(|(_, r)| r).collect();
        if values.is_empty() {
            return ReachStatistics {
                users: 0,
                total_reach: 0,
                mean_reach: 0.0,
                median_reach: 0.0,
                max_reach: 0,
                min_reach: 0,
                active_referrers: 0,
            };
        }
        values.sort_unstable();

        let n = values.len();
        let total: usize = values.iter().sum();
        let median = if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) as f64 / 2.0
        } else {
            values[n / 2] as f64
        };

        ReachStatistics {
            users: n,
            total_reach: total,
            mean_reach: total as f64 / n as f64,
            median_reach: median,
            max_reach: values[n - 1],
            min_reach: values[0],
            active_referrers: values.iter().filter(|&&r| r > 0).count(),
        }
    }

    /// Breadth-first walk collecting every descendant of `user`.
    fn descendants(&self, user: &str) -> BTreeSet<UserId> {
        let mut found: BTreeSet<UserId> = BTreeSet::new();
        let mut queue: VecDeque<&'g UserId> = self.graph.direct_referrals(user).into_iter().collect();

        while let Some(current) = queue.pop_front() {
            if current.as_str() == user || !found.insert(current.clone()) {
                continue;
            }
            queue.extend(self.graph.direct_referrals(current.as_str()));
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferralGraph;

    fn chain() -> ReferralGraph {
        let (graph, rejected) = ReferralGraph::from_edges([("a", "b"), ("b", "c"), ("c", "d")]);
        assert!(rejected.is_empty());
        graph
    }

    fn tree() -> ReferralGraph {
        //        root
        //       /    \
        //      l1     r1
        //     /  \      \
        //   l2a  l2b    r2
        //                 \
        //                  r3
        let (graph, rejected) = ReferralGraph::from_edges([
            ("root", "l1"),
            ("root", "r1"),
            ("l1", "l2a"),
            ("l1", "l2b"),
            ("r1", "r2"),
            ("r2", "r3"),
        ]);
        assert!(rejected.is_empty());
        graph
    }

    #[test]
    fn chain_reach() {
        let graph = chain();
        let analytics = ReachAnalytics::new(&graph);
        assert_eq!(analytics.reach("a"), 3);
        assert_eq!(analytics.reach("b"), 2);
        assert_eq!(analytics.reach("d"), 0);
        assert_eq!(analytics.reach("nobody"), 0);

        let reach = analytics.reach_set("a");
        let set: Vec<&str> = reach.iter().map(UserId::as_str).collect();
        assert_eq!(set, vec!["b", "c", "d"]);
    }

    #[test]
    fn top_referrers_on_chain() {
        let graph = chain();
        let analytics = ReachAnalytics::new(&graph);
        let top = analytics.top_referrers_by_reach(2);
        let got: Vec<(&str, usize)> = top.iter().map(|r| (r.user.as_str(), r.reach)).collect();
        assert_eq!(got, vec![("a", 3), ("b", 2)]);
    }

    #[test]
    fn top_referrers_bounds() {
        let graph = chain();
        let analytics = ReachAnalytics::new(&graph);
        assert!(analytics.top_referrers_by_reach(0).is_empty());
        // Only a, b, c have descendants.
        assert_eq!(analytics.top_referrers_by_reach(50).len(), 3);
    }

    #[test]
    fn top_referrers_tie_break_by_identifier() {
        let (graph, _) = ReferralGraph::from_edges([("zeta", "z1"), ("alpha", "a1"), ("mid", "m1")]);
        let analytics = ReachAnalytics::new(&graph);
        let names: Vec<String> = analytics
            .top_referrers_by_reach(3)
            .into_iter()
            .map(|r| r.user.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn depth_frontiers() {
        let graph = tree();
        let analytics = ReachAnalytics::new(&graph);

        let names = |set: BTreeSet<&UserId>| -> Vec<String> {
            set.into_iter().map(|u| u.to_string()).collect()
        };
        assert_eq!(names(analytics.users_at_depth("root", 1)), vec!["l1", "r1"]);
        assert_eq!(names(analytics.users_at_depth("root", 2)), vec!["l2a", "l2b", "r2"]);
        assert_eq!(names(analytics.users_at_depth("root", 3)), vec!["r3"]);
        assert!(analytics.users_at_depth("root", 4).is_empty());
        assert!(analytics.users_at_depth("root", 0).is_empty());
        assert!(analytics.users_at_depth("ghost", 1).is_empty());
    }

    #[test]
    fn statistics_on_tree() {
        let graph = tree();
        let analytics = ReachAnalytics::new(&graph);
        let stats = analytics.statistics();
        // reach: root 6, l1 2, r1 2, r2 1, l2a 0, l2b 0, r3 0
        assert_eq!(stats.users, 7);
        assert_eq!(stats.total_reach, 11);
        assert_eq!(stats.max_reach, 6);
        assert_eq!(stats.min_reach, 0);
        assert_eq!(stats.active_referrers, 4);
        assert_eq!(stats.median_reach, 1.0);
        assert!((stats.mean_reach - 11.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn statistics_even_count_median() {
        let graph = chain();
        let stats = ReachAnalytics::new(&graph).statistics();
        // reach values sorted: 0, 1, 2, 3
        assert_eq!(stats.median_reach, 1.5);
        assert_eq!(stats.mean_reach, 1.5);
    }

    #[test]
    fn statistics_empty_graph() {
        let graph = ReferralGraph::new();
        let stats = ReachAnalytics::new(&graph).statistics();
        assert_eq!(stats.users, 0);
        assert_eq!(stats.mean_reach, 0.0);
        assert_eq!(stats.median_reach, 0.0);
    }

    #[test]
    fn cache_is_reused_within_generation() {
        let graph = chain();
        let analytics = ReachAnalytics::new(&graph);
        let first = analytics.reach_set("a");
        let second = analytics.reach_set("a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(analytics.into_cache().len(), 1);
    }

    #[test]
    fn stale_cache_is_dropped_after_mutation() {
        let mut graph = chain();
        let cache = {
            let analytics = ReachAnalytics::new(&graph);
            assert_eq!(analytics.reach("a"), 3);
            analytics.into_cache()
        };
        assert_eq!(cache.generation(), 3);

        graph.add_edge("d", "e").unwrap();

        let analytics = ReachAnalytics::with_cache(&graph, cache);
        assert_eq!(analytics.reach("a"), 4);
        let cache = analytics.into_cache();
        assert_eq!(cache.generation(), 4);
    }
}
