// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records: the control-plane state for one logical unit of work,
//! addressed by `JobId` under `/control/jobs/<job_id>`.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a job under `/control/jobs`.
    pub struct JobId;
}

/// Rule-set version every freshly submitted job is stamped with. A future
/// change to this constant is how the matcher would recognize jobs seeded
/// under an earlier generation of rules.
pub const RULE_VERSION: &str = "v1";

/// The control-plane fields stored per job. Whether the job has been split
/// and whether it is cancelled each have their own node under the job's
/// path (`schema::job_splitted_path`/`job_cancel_path`) rather than living
/// here, since they are written after this record and a fresh write of the
/// whole blob would race the splitter/intake's own updates to those nodes.
///
/// `version` is an opaque caller-supplied tag used to detect a job that was
/// re-added while an earlier generation was still running. `parents` links
/// a job back to the job(s) whose completion produced it — populated when a
/// handler's `Continue` outcome spawns it as a sub-task of another job,
/// empty for a job submitted directly through intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub version: String,
    pub parents: Vec<JobId>,
    pub added: u64,
}

impl JobRecord {
    pub fn new(version: impl Into<String>, parents: Vec<JobId>, added_ms: u64) -> Self {
        Self { version: version.into(), parents, added: added_ms }
    }
}
