// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("no node at {0}")]
    NoNode(String),
    #[error("node already exists at {0}")]
    NodeExists(String),
    #[error("node at {0} has children")]
    NotEmpty(String),
    #[error("version mismatch at {path}: expected {expected}, found {found}")]
    BadVersion { path: String, expected: u64, found: u64 },
    #[error("session {0} is closed")]
    SessionClosed(u64),
    #[error("transaction op {index} on {path} failed: {reason}")]
    TransactionFailed { index: usize, path: String, reason: String },
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoNode(path) => CoreError::NotFound(path),
            StoreError::NodeExists(path) => CoreError::Conflict(path),
            StoreError::NotEmpty(path) => CoreError::Conflict(path),
            StoreError::BadVersion { path, .. } => CoreError::Conflict(path),
            StoreError::SessionClosed(id) => CoreError::Unavailable(format!("session {id} closed")),
            StoreError::TransactionFailed { index, path, reason } => CoreError::TransactionFailed {
                name: format!("op[{index}]"),
                path,
                reason,
            },
        }
    }
}
