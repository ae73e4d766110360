// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error kinds surfaced across the core boundary.

use thiserror::Error;

/// Errors the core can surface to a caller (API collaborator, CLI, or an
/// internal loop deciding whether to retry).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A referenced node is absent (unknown job/task id).
    #[error("not found: {0}")]
    NotFound(String),

    /// A create failed because the node already exists (duplicate id, race).
    #[error("conflict: {0}")]
    Conflict(String),

    /// One or more sub-operations of a transaction failed; the whole
    /// transaction was rolled back.
    #[error("transaction '{name}' failed at {path}: {reason}")]
    TransactionFailed {
        name: String,
        path: String,
        reason: String,
    },

    /// `/input` depth exceeds `api.input_limit`.
    #[error("input queue overloaded")]
    Overloaded,

    /// The coordination store is unreachable or the session was lost.
    #[error("coordination store unavailable: {0}")]
    Unavailable(String),

    /// Malformed input (unparseable ids, bad event shape).
    #[error("invalid input: {0}")]
    Invalid(String),

    /// A comparator raised while matching; always caught and converted to a
    /// non-match at the boundary, never propagated, but kept in this enum so
    /// loop-level logging can name the kind consistently.
    #[error("comparator error: {0}")]
    MatchError(String),
}

impl CoreError {
    /// Retriable faults (§7): transient store unavailability or a lost race
    /// on a transaction are retried internally by the storage layer with
    /// bounded backoff before ever reaching this point as a propagated
    /// error. Logical errors are not retried.
    pub fn is_retriable(&self) -> bool {
        matches!(self, CoreError::Unavailable(_))
    }
}
