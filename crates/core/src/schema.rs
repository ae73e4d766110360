// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace schema: the single source of truth for path composition.
//!
//! Every other component composes coordination-store paths exclusively
//! through these functions, so the layout can evolve in one place.

use crate::job::JobId;
use crate::task::TaskId;

pub const INPUT_PATH: &str = "/input";
pub const READY_PATH: &str = "/ready";
pub const RUNNING_PATH: &str = "/running";
pub const CONTROL_JOBS_PATH: &str = "/control/jobs";
pub const CONTROL_LOCK_PATH: &str = "/control/lock";
pub const JOBS_COUNTER_PATH: &str = "/core/jobs_counter";
pub const USER_PATH: &str = "/user";

/// Join path segments with `/`, tolerating a leading slash on the first one.
pub fn join(segments: &[&str]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(seg.trim_start_matches('/'));
    }
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    out
}

pub fn job_path(job_id: &JobId) -> String {
    join(&[CONTROL_JOBS_PATH, job_id.as_str()])
}

pub fn job_parents_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "parents"])
}

pub fn job_version_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "version"])
}

pub fn job_added_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "added"])
}

pub fn job_splitted_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "splitted"])
}

pub fn job_cancel_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "cancel"])
}

pub fn job_lock_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "lock"])
}

pub fn tasks_path(job_id: &JobId) -> String {
    join(&[&job_path(job_id), "tasks"])
}

pub fn task_path(job_id: &JobId, task_id: &TaskId) -> String {
    join(&[&tasks_path(job_id), task_id.as_str()])
}

pub fn running_path(task_id: &TaskId) -> String {
    join(&[RUNNING_PATH, task_id.as_str()])
}

pub fn running_lock_path(task_id: &TaskId) -> String {
    join(&[&running_path(task_id), "lock"])
}

pub fn user_path(rest: &str) -> String {
    join(&[USER_PATH, rest])
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
