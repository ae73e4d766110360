// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace initialization: creates the handful of persistent container
//! nodes every other component assumes already exist.

use std::sync::Arc;

use oj_core::schema;
use oj_storage::{CreateMode, KvStore, StoreError};

pub async fn init<S: KvStore>(store: &Arc<S>) -> Result<(), StoreError> {
    for path in [
        schema::INPUT_PATH,
        schema::READY_PATH,
        schema::RUNNING_PATH,
        "/control",
        schema::CONTROL_JOBS_PATH,
        "/core",
        schema::USER_PATH,
    ] {
        match store.create(path, Vec::new(), CreateMode::Persistent).await {
            Ok(_) | Err(StoreError::NodeExists(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
