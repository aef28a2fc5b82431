//! Influencer selection and flow centrality.
//!
//! [`InfluencerEngine`] composes a [`ReachAnalytics`] value and adds two
//! rankings on top of it:
//!
//! - **Unique reach expansion**: greedy maximum coverage. Each round picks the
//!   user whose descendant set adds the most not-yet-covered users. Greedy
//!   selection is the classic `1 - 1/e` approximation; no exact solver is
//!   attempted.
//! - **Flow centrality**: an unweighted, multiplicity-insensitive
//!   betweenness. A user scores one point for every connected pair `(s, t)`
//!   where it lies on *some* shortest `s -> t` path:
//!
//! ```text
//! C(v) = |{ (s, t) : d(s,v) + d(v,t) = d(s,t), v ∉ {s, t} }|
//! C_norm(v) = C(v) / [(n-1)(n-2)]        (n > 2)
//! ```
//!
//! Unlike Brandes betweenness, credit is not divided by the number of
//! shortest paths, so a user on several equal-length paths between the same
//! pair counts once per pair rather than fractionally. Rankings depend on
//! this rule.

use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::id::UserId;
use crate::reach::{ReachAnalytics, ReferrerRank};
use crate::store::GraphStore;

/// All-pairs hop distances, built by one BFS per user.
///
/// Only finite distances are stored; a missing entry means "unreachable".
#[derive(Debug, Clone, Default)]
pub struct DistanceMatrix {
    generation: u64,
    rows: HashMap<UserId, HashMap<UserId, usize>>,
}

impl DistanceMatrix {
    /// Runs BFS from every user. O(V·(V+E)).
    pub fn build<G: GraphStore + ?Sized>(graph: &G) -> Self {
        let mut rows = HashMap::with_capacity(graph.user_count());
        for source in graph.users() {
            rows.insert(source.clone(), bfs_distances(graph, source));
        }
        tracing::debug!(
            users = rows.len(),
            generation = graph.generation(),
            "distance matrix built"
        );
        DistanceMatrix {
            generation: graph.generation(),
            rows,
        }
    }

    /// Hop distance from `from` to `to`, `None` when no path exists.
    pub fn distance(&self, from: &str, to: &str) -> Option<usize> {
        self.rows.get(from)?.get(to).copied()
    }

    /// Distances from `from` to everything it reaches (including itself at 0).
    pub fn row(&self, from: &str) -> Option<&HashMap<UserId, usize>> {
        self.rows.get(from)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn bfs_distances<G: GraphStore + ?Sized>(graph: &G, source: &UserId) -> HashMap<UserId, usize> {
    let mut dist: HashMap<UserId, usize> = HashMap::new();
    dist.insert(source.clone(), 0);
    let mut queue: VecDeque<(&UserId, usize)> = VecDeque::new();
    queue.push_back((source, 0));

    while let Some((current, d)) = queue.pop_front() {
        for child in graph.direct_referrals(current.as_str()) {
            if !dist.contains_key(child.as_str()) {
                dist.insert(child.clone(), d + 1);
                queue.push_back((child, d + 1));
            }
        }
    }
    dist
}

/// One round of unique reach expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueReachSelection {
    pub user: UserId,
    /// Descendants not covered by earlier selections.
    pub marginal_gain: usize,
    pub total_reach: usize,
    pub newly_covered: Vec<UserId>,
}

/// Result of [`InfluencerEngine::unique_reach_expansion`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueReachReport {
    pub selections: Vec<UniqueReachSelection>,
    pub total_coverage: usize,
    /// Coverage per selection; 0 when nothing was selected.
    pub efficiency: f64,
}

/// A user's flow centrality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityScore {
    pub user: UserId,
    /// Number of connected pairs the user brokers.
    pub pairs: usize,
    /// `pairs` normalized by `(n-1)(n-2)` when n > 2.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub users: usize,
    pub max_reach: usize,
    pub total_unique_coverage: usize,
    pub top_centrality: f64,
}

/// The three rankings side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluencerComparison {
    pub by_reach: Vec<ReferrerRank>,
    pub unique_reach: UniqueReachReport,
    pub flow_centrality: Vec<CentralityScore>,
    pub summary: ComparisonSummary,
}

/// Influencer rankings over a borrowed graph.
pub struct InfluencerEngine<'g, G: GraphStore + ?Sized> {
    analytics: ReachAnalytics<'g, G>,
    distances: OnceCell<DistanceMatrix>,
}

impl<'g, G: GraphStore + ?Sized> InfluencerEngine<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self::from_analytics(ReachAnalytics::new(graph))
    }

    pub fn from_analytics(analytics: ReachAnalytics<'g, G>) -> Self {
        InfluencerEngine {
            analytics,
            distances: OnceCell::new(),
        }
    }

    pub fn analytics(&self) -> &ReachAnalytics<'g, G> {
        &self.analytics
    }

    pub fn into_analytics(self) -> ReachAnalytics<'g, G> {
        self.analytics
    }

    /// The all-pairs distance matrix, built on first use.
    pub fn distance_matrix(&self) -> &DistanceMatrix {
        let matrix = self
            .distances
            .get_or_init(|| DistanceMatrix::build(self.analytics.graph()));
        debug_assert_eq!(matrix.generation(), self.analytics.graph().generation());
        matrix
    }

    pub fn distance(&self, from: &str, to: &str) -> Option<usize> {
        self.distance_matrix().distance(from, to)
    }

    /// Greedy maximum coverage with at most `max_selections` picks.
    ///
    /// Stops early once no remaining user adds an uncovered descendant. Ties
    /// on marginal gain go to the smaller identifier.
    pub fn unique_reach_expansion(&self, max_selections: usize) -> UniqueReachReport {
        let candidates: Vec<(&UserId, Arc<BTreeSet<UserId>>)> = self
            .analytics
            .graph()
            .users()
            .into_iter()
            .map(|user| (user, self.analytics.reach_set(user.as_str())))
            .filter(|(_, set)| !set.is_empty())
            .collect();

        let mut covered: HashSet<&UserId> = HashSet::new();
        let mut taken = vec![false; candidates.len()];
        let mut selections = Vec::new();

        for _ in 0..max_selections {
            let mut best: Option<(usize, usize)> = None;
            for (i, (_, set)) in candidates.iter().enumerate() {
                if taken[i] {
                    continue;
                }
                let gain = set.iter().filter(|u| !covered.contains(u)).count();
                if gain > best.map_or(0, |(_, g)| g) {
                    best = Some((i, gain));
                }
            }

            let Some((i, gain)) = best else {
                break;
            };
            taken[i] = true;
            let (user, set) = &candidates[i];
            let newly_covered: Vec<UserId> = set
                .iter()
                .filter(|u| covered.insert(*u))
                .cloned()
                .collect();
            debug_assert_eq!(newly_covered.len(), gain);

            tracing::debug!(user = %user, gain, "unique reach selection");
            selections.push(UniqueReachSelection {
                user: (*user).clone(),
                marginal_gain: gain,
                total_reach: set.len(),
                newly_covered,
            });
        }

        let total_coverage = covered.len();
        let efficiency = if selections.is_empty() {
            0.0
        } else {
            total_coverage as f64 / selections.len() as f64
        };
        UniqueReachReport {
            selections,
            total_coverage,
            efficiency,
        }
    }

    /// Top `top_k` users by flow centrality. Users with a zero score are
    /// omitted; ties go to the smaller identifier.
    pub fn flow_centrality(&self, top_k: usize) -> Vec<CentralityScore> {
        if top_k == 0 {
            return Vec::new();
        }
        let matrix = self.distance_matrix();
        let users = self.analytics.graph().users();
        let mut pairs: HashMap<&UserId, usize> = HashMap::new();

        for source in &users {
            let Some(row) = matrix.row(source.as_str()) else {
                continue;
            };
            for (target, &d_st) in row {
                if target == *source {
                    continue;
                }
                for (via, &d_sv) in row {
                    if via == *source || via == target || d_sv >= d_st {
                        continue;
                    }
                    let on_path = matrix
                        .distance(via.as_str(), target.as_str())
                        .is_some_and(|d_vt| d_sv + d_vt == d_st);
                    if on_path {
                        *pairs.entry(via).or_insert(0) += 1;
                    }
                }
            }
        }

        let n = users.len();
        let norm = if n > 2 { ((n - 1) * (n - 2)) as f64 } else { 1.0 };

        let mut scores: Vec<CentralityScore> = pairs
            .into_iter()
            .filter(|&(_, count)| count > 0)
            .map(|(user, count)| CentralityScore {
                user: user.clone(),
                pairs: count,
                score: count as f64 / norm,
            })
            .collect();
        scores.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.user.cmp(&b.user)));
        scores.truncate(top_k);
        scores
    }

    /// Reach ranking, unique reach expansion and flow centrality, each
    /// limited to `top_k`, with headline numbers.
    pub fn comparison(&self, top_k: usize) -> InfluencerComparison {
        let by_reach = self.analytics.top_referrers_by_reach(top_k);
        let unique_reach = self.unique_reach_expansion(top_k);
        let flow_centrality = self.flow_centrality(top_k);

        let summary = ComparisonSummary {
            users: self.analytics.graph().user_count(),
            max_reach: by_reach.first().map_or(0, |r| r.reach),
            total_unique_coverage: unique_reach.total_coverage,
            top_centrality: flow_centrality.first().map_or(0.0, |c| c.score),
        };

        InfluencerComparison {
            by_reach,
            unique_reach,
            flow_centrality,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferralGraph;

    fn build(edges: &[(&str, &str)]) -> ReferralGraph {
        let (graph, rejected) = ReferralGraph::from_edges(edges.iter().copied());
        assert!(rejected.is_empty(), "unexpected rejections: {:?}", rejected);
        graph
    }

    fn chain() -> ReferralGraph {
        build(&[("a", "b"), ("b", "c"), ("c", "d")])
    }

    fn two_stars() -> ReferralGraph {
        build(&[
            ("hub1", "x1"),
            ("hub1", "x2"),
            ("hub1", "x3"),
            ("hub2", "y1"),
            ("hub2", "y2"),
        ])
    }

    #[test]
    fn distances_on_chain() {
        let graph = chain();
        let engine = InfluencerEngine::new(&graph);
        assert_eq!(engine.distance("a", "d"), Some(3));
        assert_eq!(engine.distance("b", "c"), Some(1));
        assert_eq!(engine.distance("a", "a"), Some(0));
        assert_eq!(engine.distance("d", "a"), None);
        assert_eq!(engine.distance("ghost", "a"), None);

        let matrix = engine.distance_matrix();
        assert_eq!(matrix.row("a").map(|row| row.len()), Some(4));
        assert_eq!(matrix.row("d").map(|row| row.len()), Some(1));
        assert!(matrix.row("ghost").is_none());
    }

    #[test]
    fn disjoint_stars_both_selected() {
        let graph = two_stars();
        let engine = InfluencerEngine::new(&graph);
        let report = engine.unique_reach_expansion(5);

        let picked: Vec<(&str, usize)> = report
            .selections
            .iter()
            .map(|s| (s.user.as_str(), s.marginal_gain))
            .collect();
        assert_eq!(picked, vec![("hub1", 3), ("hub2", 2)]);
        assert_eq!(report.total_coverage, 5);
        assert_eq!(report.efficiency, 2.5);
    }

    #[test]
    fn expansion_stops_when_nothing_new() {
        let graph = build(&[
            ("root", "a"),
            ("root", "b"),
            ("a", "a1"),
            ("a", "a2"),
            ("a", "a3"),
            ("c", "c1"),
        ]);
        let engine = InfluencerEngine::new(&graph);
        let report = engine.unique_reach_expansion(10);

        let picked: Vec<&str> = report.selections.iter().map(|s| s.user.as_str()).collect();
        // a is fully covered by root, so it is never picked.
        assert_eq!(picked, vec!["root", "c"]);
        assert_eq!(report.selections[0].total_reach, 5);
        assert_eq!(report.selections[1].newly_covered, vec![UserId::new("c1").unwrap()]);
        assert_eq!(report.total_coverage, 6);
        assert_eq!(report.efficiency, 3.0);
    }

    #[test]
    fn expansion_respects_budget() {
        let graph = two_stars();
        let engine = InfluencerEngine::new(&graph);
        assert!(engine.unique_reach_expansion(0).selections.is_empty());
        assert_eq!(engine.unique_reach_expansion(0).efficiency, 0.0);

        let report = engine.unique_reach_expansion(1);
        assert_eq!(report.selections.len(), 1);
        assert_eq!(report.total_coverage, 3);
    }

    #[test]
    fn expansion_tie_break_prefers_smaller_identifier() {
        let graph = build(&[("beta", "b1"), ("alpha", "a1")]);
        let engine = InfluencerEngine::new(&graph);
        let report = engine.unique_reach_expansion(1);
        assert_eq!(report.selections[0].user.as_str(), "alpha");
    }

    #[test]
    fn chain_centrality_excludes_endpoints() {
        let graph = chain();
        let engine = InfluencerEngine::new(&graph);
        let scores = engine.flow_centrality(10);

        let got: Vec<(&str, usize)> = scores.iter().map(|c| (c.user.as_str(), c.pairs)).collect();
        // b brokers (a,c) and (a,d); c brokers (a,d) and (b,d).
        assert_eq!(got, vec![("b", 2), ("c", 2)]);
        for score in &scores {
            assert!((score.score - 2.0 / 6.0).abs() < 1e-12);
        }
        assert!(scores.iter().all(|c| c.user.as_str() != "a" && c.user.as_str() != "d"));
    }

    #[test]
    fn centrality_on_tree() {
        //   r -> m -> {x, y}
        let graph = build(&[("r", "m"), ("m", "x"), ("m", "y")]);
        let engine = InfluencerEngine::new(&graph);
        let scores = engine.flow_centrality(1);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].user.as_str(), "m");
        assert_eq!(scores[0].pairs, 2);
        assert!((scores[0].score - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn centrality_empty_for_stars_and_zero_k() {
        let graph = two_stars();
        let engine = InfluencerEngine::new(&graph);
        assert!(engine.flow_centrality(5).is_empty());

        let graph = chain();
        let engine = InfluencerEngine::new(&graph);
        assert!(engine.flow_centrality(0).is_empty());
    }

    #[test]
    fn comparison_summary() {
        let graph = chain();
        let engine = InfluencerEngine::new(&graph);
        let cmp = engine.comparison(2);

        assert_eq!(cmp.by_reach.len(), 2);
        assert_eq!(cmp.summary.users, 4);
        assert_eq!(cmp.summary.max_reach, 3);
        assert_eq!(cmp.summary.total_unique_coverage, 3);
        assert!((cmp.summary.top_centrality - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(cmp.unique_reach.selections.len(), 1);

        let json = serde_json::to_value(&cmp).unwrap();
        assert_eq!(json["by_reach"][0]["user"], "a");
        assert_eq!(json["summary"]["max_reach"], 3);
    }

    #[test]
    fn empty_graph_comparison() {
        let graph = ReferralGraph::new();
        let cmp = InfluencerEngine::new(&graph).comparison(3);
        assert!(cmp.by_reach.is_empty());
        assert!(cmp.flow_centrality.is_empty());
        assert_eq!(cmp.summary.top_centrality, 0.0);
        assert_eq!(cmp.unique_reach.efficiency, 0.0);
    }
}
