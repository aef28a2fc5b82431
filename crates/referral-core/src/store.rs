//! The [`GraphStore`] trait defining the contract for referral graphs.
//!
//! Analytics are written against this trait rather than a concrete graph so
//! the traversal layers compose over any backend that upholds the same
//! invariants: no self-referrals, at most one referrer per candidate, and no
//! directed cycles.

use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::id::UserId;

/// The storage contract for referral graphs.
///
/// The trait is synchronous; concurrent callers serialize mutations through
/// [`SharedNetwork`](crate::shared::SharedNetwork).
pub trait GraphStore {
    /// Adds a directed referral `referrer -> candidate`.
    ///
    /// Checks, in order and short-circuiting: identifier validity, self
    /// referral, an existing referrer for `candidate`, and whether `candidate`
    /// can already reach `referrer`. A rejected edge leaves the store
    /// untouched. An accepted edge bumps [`generation`](Self::generation).
    fn add_edge(&mut self, referrer: &str, candidate: &str) -> Result<(), CoreError>;

    /// Direct candidates of `user`. Empty for unknown or childless users.
    fn direct_referrals(&self, user: &str) -> BTreeSet<&UserId>;

    /// The single referrer of `user`, if any.
    fn referrer(&self, user: &str) -> Option<&UserId>;

    /// Returns true if `user` appears in any accepted edge.
    fn contains(&self, user: &str) -> bool;

    /// All known users in ascending identifier order.
    fn users(&self) -> Vec<&UserId>;

    fn user_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    /// Mutation counter. Derived caches stamped with an older value are stale.
    fn generation(&self) -> u64;
}
