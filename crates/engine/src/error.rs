// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oj_core::CoreError;
use oj_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(err) => err,
            EngineError::Store(err) => err.into(),
        }
    }
}
