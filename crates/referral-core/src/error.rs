//! Core error types for referral-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Constraint
//! violations raised by [`GraphStore::add_edge`](crate::store::GraphStore::add_edge)
//! are grouped under [`RejectReason`] so callers can tell a refused referral
//! apart from a malformed request.

use thiserror::Error;

use crate::id::UserId;

/// Why a referral edge was refused. The graph is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// A user tried to refer themselves.
    #[error("user '{user}' cannot refer themselves")]
    SelfReferral { user: UserId },

    /// The candidate already has a referrer.
    #[error("candidate '{candidate}' has already been referred by '{existing}'")]
    DuplicateReferrer { candidate: UserId, existing: UserId },

    /// The candidate can already reach the referrer, so the edge would close a cycle.
    #[error("referral '{referrer}' -> '{candidate}' would create a cycle")]
    CycleDetected { referrer: UserId, candidate: UserId },
}

/// Core errors produced by the referral-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An identifier was empty or malformed.
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    /// An edge violated a structural constraint.
    #[error("referral rejected: {0}")]
    Rejected(#[from] RejectReason),

    /// A structural invariant does not hold.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}

impl CoreError {
    /// Returns the rejection reason when this error is a constraint violation.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            CoreError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}
