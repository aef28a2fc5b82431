//! Thread-safe handle over a [`ReferralGraph`].
//!
//! [`SharedNetwork`] wraps the graph in `Arc<RwLock<_>>`. `add_edge` runs the
//! whole check-then-insert sequence under the write lock, so two concurrent
//! cycle checks can never both pass before either insert commits. Readers
//! take the read lock for the duration of their closure and therefore see a
//! consistent snapshot that no mutation can interleave with.
//!
//! A generation-stamped [`ReachCache`] is kept behind its own mutex and lent
//! to each reader. Concurrent readers that find it already lent start with an
//! empty cache; correctness never depends on a cache hit.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::CoreError;
use crate::graph::ReferralGraph;
use crate::influence::InfluencerEngine;
use crate::reach::{ReachAnalytics, ReachCache};
use crate::store::GraphStore;

/// Cloneable handle to a shared referral graph.
#[derive(Clone, Default)]
pub struct SharedNetwork {
    graph: Arc<RwLock<ReferralGraph>>,
    cache: Arc<Mutex<Option<ReachCache>>>,
}

impl SharedNetwork {
    pub fn new() -> Self {
        Self::from_graph(ReferralGraph::new())
    }

    pub fn from_graph(graph: ReferralGraph) -> Self {
        SharedNetwork {
            graph: Arc::new(RwLock::new(graph)),
            cache: Arc::new(Mutex::new(Some(ReachCache::new()))),
        }
    }

    /// Adds a referral under the exclusive write lock.
    pub fn add_edge(&self, referrer: &str, candidate: &str) -> Result<(), CoreError> {
        self.graph.write().add_edge(referrer, candidate)
    }

    pub fn generation(&self) -> u64 {
        self.graph.read().generation()
    }

    /// Runs `f` against a read-locked snapshot of the graph.
    pub fn with_graph<R>(&self, f: impl FnOnce(&ReferralGraph) -> R) -> R {
        let graph = self.graph.read();
        f(&graph)
    }

    /// Runs `f` with reach analytics over a read-locked snapshot.
    pub fn with_analytics<R>(&self, f: impl FnOnce(&ReachAnalytics<'_, ReferralGraph>) -> R) -> R {
        let graph = self.graph.read();
        let analytics = ReachAnalytics::with_cache(&*graph, self.borrow_cache());
        let out = f(&analytics);
        self.return_cache(analytics.into_cache());
        out
    }

    /// Runs `f` with an influencer engine over a read-locked snapshot.
    pub fn with_influencers<R>(
        &self,
        f: impl FnOnce(&InfluencerEngine<'_, ReferralGraph>) -> R,
    ) -> R {
        let graph = self.graph.read();
        let analytics = ReachAnalytics::with_cache(&*graph, self.borrow_cache());
        let engine = InfluencerEngine::from_analytics(analytics);
        let out = f(&engine);
        self.return_cache(engine.into_analytics().into_cache());
        out
    }

    fn borrow_cache(&self) -> ReachCache {
        self.cache.lock().take().unwrap_or_default()
    }

    fn return_cache(&self, cache: ReachCache) {
        let mut slot = self.cache.lock();
        let newer = slot
            .as_ref()
            .map_or(true, |held| held.generation() <= cache.generation());
        if newer {
            *slot = Some(cache);
        }
    }
}
