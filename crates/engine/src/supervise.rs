// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps a fallible step function in a restart-on-error loop. An
//! unexpected error is logged with full context and the loop sleeps
//! `fail_sleep` before retrying; `max_fails` consecutive failures (no
//! successful step in between) stop the loop so the caller can exit the
//! process non-zero and let a supervisor relaunch it. A cooperative stop
//! flag is checked between steps so a shutdown request unblocks the loop
//! at the next iteration rather than killing it mid-step.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

/// Shared flag a caller flips to ask a supervised loop to stop. Cloned
/// into every loop that should react to the same shutdown request.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one supervised step accomplished, used to decide whether to sleep
/// before the next iteration.
pub enum StepOutcome {
    /// Did useful work; loop again immediately.
    Worked,
    /// Nothing to do right now; sleep `empty_sleep` before looping.
    Idle,
}

#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub fail_sleep: Duration,
    pub max_fails: u32,
    pub empty_sleep: Duration,
}

impl SupervisorConfig {
    pub fn from_loops_config(loops: &oj_core::config::LoopsConfig) -> Self {
        Self {
            fail_sleep: Duration::from_secs(loops.fail_sleep_s),
            max_fails: loops.max_fails,
            empty_sleep: Duration::from_secs(loops.empty_sleep_s),
        }
    }
}

/// Too many consecutive failures; the caller should exit the process
/// non-zero so an external supervisor relaunches it with a clean slate.
#[derive(Debug, thiserror::Error)]
#[error("{name}: {fails} consecutive failures, giving up (last error: {last_error})")]
pub struct GaveUp {
    pub name: String,
    pub fails: u32,
    pub last_error: String,
}

/// Run `step` until `stop` is flagged or `max_fails` consecutive errors
/// have been observed. `name` is attached to every log line so multiple
/// supervised loops (splitter, dispatcher, collector) are distinguishable
/// in daemon logs.
pub async fn run<F, Fut, E>(
    name: &str,
    stop: &StopFlag,
    config: SupervisorConfig,
    mut step: F,
) -> Result<(), GaveUp>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StepOutcome, E>>,
    E: std::fmt::Display,
{
    let mut consecutive_fails = 0u32;

    while !stop.is_stopped() {
        match step().await {
            Ok(StepOutcome::Worked) => {
                consecutive_fails = 0;
            }
            Ok(StepOutcome::Idle) => {
                consecutive_fails = 0;
                tokio::time::sleep(config.empty_sleep).await;
            }
            Err(err) => {
                consecutive_fails += 1;
                error!(loop_name = name, fails = consecutive_fails, error = %err, "supervised loop step failed");
                if consecutive_fails >= config.max_fails {
                    return Err(GaveUp { name: name.to_string(), fails: consecutive_fails, last_error: err.to_string() });
                }
                warn!(loop_name = name, sleep_s = config.fail_sleep.as_secs(), "restarting after failure");
                tokio::time::sleep(config.fail_sleep).await;
            }
        }
    }
    info!(loop_name = name, "supervised loop stopped");
    Ok(())
}

#[cfg(test)]
#[path = "supervise_tests.rs"]
mod tests;
