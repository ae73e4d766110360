// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the engine's four components together over one coordination store
//! and answers the CLI's protocol requests against them.
//!
//! Concurrency is capped with a semaphore sized from `worker.max_jobs`,
//! gating how many dispatches run at once; once it is exhausted the
//! polling loop sleeps `worker.max_jobs_sleep_ms` before trying again
//! rather than spinning.

use std::sync::Arc;
use std::time::{Duration, Instant};

use oj_core::{Clock, Config, ExecutionClient, IdGen, RuleProvider};
use oj_engine::supervise::{self, StepOutcome, StopFlag, SupervisorConfig};
use oj_engine::{Collector, Dispatcher, EngineError, Intake, Query, Splitter};
use oj_storage::{KvStore, StoreError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::error;

use crate::protocol::{self, Request, Response, StatusReport};

pub struct Daemon<S: KvStore> {
    intake: Intake<S>,
    query: Query<S>,
    splitter: Splitter<S>,
    dispatcher: Dispatcher<S>,
    collector: Collector<S>,
    clock: Arc<dyn Clock>,
    config: Config,
    started_at: Instant,
    pub stop: StopFlag,
}

impl<S: KvStore + 'static> Daemon<S> {
    pub async fn open(
        store: Arc<S>,
        rules: Arc<dyn RuleProvider>,
        execution: Arc<dyn ExecutionClient>,
        ids: Arc<dyn IdGen>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Result<Self, StoreError> {
        oj_engine::bootstrap::init(&store).await?;

        let intake = Intake::open(Arc::clone(&store), Arc::clone(&ids), config.api.input_limit).await?;
        let splitter =
            Splitter::open(Arc::clone(&store), Arc::clone(&rules), Arc::clone(&ids), Arc::clone(&clock)).await?;
        let dispatcher =
            Dispatcher::open(Arc::clone(&store), Arc::clone(&execution), Arc::clone(&ids), Arc::clone(&clock))
                .await?;
        let collector = Collector::open(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.collector.delay_s * 1_000,
            config.collector.recycled_priority,
        )
        .await?;
        let query = Query::new(Arc::clone(&store));

        Ok(Self {
            intake,
            query,
            splitter,
            dispatcher,
            collector,
            clock,
            config,
            started_at: Instant::now(),
            stop: StopFlag::new(),
        })
    }

    /// Spawn the splitter, dispatcher and collector as supervised
    /// background tasks. Returns their join handles so the caller can wait
    /// for a clean shutdown.
    pub fn spawn_loops(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let loops_cfg = SupervisorConfig::from_loops_config(&self.config.loops);
        vec![self.spawn_splitter(loops_cfg), self.spawn_dispatcher(loops_cfg), self.spawn_collector(loops_cfg)]
    }

    fn spawn_splitter(self: &Arc<Self>, loops_cfg: SupervisorConfig) -> JoinHandle<()> {
        let daemon = Arc::clone(self);
        let stop = daemon.stop.clone();
        tokio::spawn(async move {
            let result = supervise::run("splitter", &stop, loops_cfg, || async {
                match daemon.splitter.step().await {
                    Ok(Some(_)) => Ok(StepOutcome::Worked),
                    Ok(None) => Ok(StepOutcome::Idle),
                    Err(err) => Err(err),
                }
            })
            .await;
            if let Err(gave_up) = result {
                error!(%gave_up, "splitter loop gave up");
            }
        })
    }

    fn spawn_dispatcher(self: &Arc<Self>, loops_cfg: SupervisorConfig) -> JoinHandle<()> {
        let daemon = Arc::clone(self);
        let stop = daemon.stop.clone();
        let semaphore = Arc::new(Semaphore::new(daemon.config.worker.max_jobs.max(1) as usize));
        let max_jobs_sleep = Duration::from_millis(daemon.config.worker.max_jobs_sleep_ms);
        tokio::spawn(async move {
            let result = supervise::run("dispatcher", &stop, loops_cfg, || {
                let daemon = Arc::clone(&daemon);
                let semaphore = Arc::clone(&semaphore);
                async move {
                    match Arc::clone(&semaphore).try_acquire_owned() {
                        Ok(permit) => {
                            tokio::spawn(async move {
                                let _permit = permit;
                                if let Err(err) = daemon.dispatcher.step().await {
                                    error!(%err, "dispatch step failed");
                                }
                            });
                            Ok::<_, EngineError>(StepOutcome::Worked)
                        }
                        Err(_) => {
                            tokio::time::sleep(max_jobs_sleep).await;
                            Ok(StepOutcome::Idle)
                        }
                    }
                }
            })
            .await;
            if let Err(gave_up) = result {
                error!(%gave_up, "dispatcher loop gave up");
            }
        })
    }

    fn spawn_collector(self: &Arc<Self>, loops_cfg: SupervisorConfig) -> JoinHandle<()> {
        let daemon = Arc::clone(self);
        let stop = daemon.stop.clone();
        let interval = Duration::from_secs(daemon.config.collector.interval_s);
        tokio::spawn(async move {
            let result = supervise::run("collector", &stop, loops_cfg, || async {
                tokio::time::sleep(interval).await;
                daemon.collector.sweep().await.map(|_| StepOutcome::Worked)
            })
            .await;
            if let Err(gave_up) = result {
                error!(%gave_up, "collector loop gave up");
            }
        })
    }

    /// Flip the shutdown flag and wake the splitter and dispatcher loops if
    /// they are currently blocked in `get()`, so they notice the flag on
    /// their very next iteration instead of waiting for a real `/input` or
    /// `/ready` entry that may never arrive.
    pub async fn request_shutdown(&self) {
        self.stop.request_stop();
        if let Err(err) = self.splitter.interrupt().await {
            error!(%err, "failed to interrupt splitter loop on shutdown");
        }
        if let Err(err) = self.dispatcher.interrupt().await {
            error!(%err, "failed to interrupt dispatcher loop on shutdown");
        }
    }

    pub async fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,
            Request::Submit { event } => match self.intake.submit(event, self.clock.epoch_ms()).await {
                Ok(job_id) => Response::Submitted { job_id },
                Err(err) => Response::Error { message: err.to_string() },
            },
            Request::Cancel { job_id } => match self.intake.cancel(&job_id).await {
                Ok(()) => Response::Cancelled,
                Err(err) => Response::Error { message: err.to_string() },
            },
            Request::JobInfo { job_id } => self.job_info(&job_id).await,
            Request::ListJobs => match self.query.get_jobs().await {
                Ok(jobs) => Response::Jobs(jobs),
                Err(err) => Response::Error { message: err.to_string() },
            },
            Request::Status => Response::Status(StatusReport {
                pid: std::process::id(),
                uptime_s: self.started_at.elapsed().as_secs(),
                max_jobs: self.config.worker.max_jobs,
            }),
            // The listener sends this response, then flips `stop` itself so
            // the reply is guaranteed to reach the caller before anything shuts down.
            Request::Shutdown => Response::ShuttingDown,
        }
    }

    async fn job_info(&self, job_id: &oj_core::JobId) -> Response {
        match self.query.get_info(job_id).await {
            Ok(info) => {
                let finished = self.query.get_finished(job_id).await.unwrap_or(false);
                Response::JobInfo(protocol::job_info_dto(&info, finished))
            }
            Err(err) => Response::Error { message: err.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_adapters::{FakeExecutionClient, FakeRuleProvider};
    use oj_core::{test_support, ExecutionOutcome, FakeClock, SequentialIdGen};
    use oj_storage::MemoryStore;

    async fn harness() -> Arc<Daemon<MemoryStore>> {
        let store = Arc::new(MemoryStore::new());
        let rules = FakeRuleProvider::new();
        rules.set_handlers("ping", vec![test_support::handler("h1", "ping")]);
        let execution = FakeExecutionClient::new();
        execution.set_outcome("h1", ExecutionOutcome::Finished);

        Arc::new(
            Daemon::open(
                store,
                Arc::new(rules),
                Arc::new(execution),
                Arc::new(SequentialIdGen::new("job")),
                Arc::new(FakeClock::new(1_000)),
                Config::default(),
            )
            .await
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn ping_replies_with_pong() {
        let daemon = harness().await;
        assert!(matches!(daemon.handle_request(Request::Ping).await, Response::Pong));
    }

    #[tokio::test]
    async fn submit_then_list_then_info_reflects_the_new_job() {
        let daemon = harness().await;
        let event = test_support::event("ping");

        let Response::Submitted { job_id } = daemon.handle_request(Request::Submit { event }).await else {
            panic!("expected Submitted");
        };

        let Response::Jobs(jobs) = daemon.handle_request(Request::ListJobs).await else {
            panic!("expected Jobs");
        };
        assert!(jobs.contains(&job_id));

        let Response::JobInfo(info) = daemon.handle_request(Request::JobInfo { job_id: job_id.clone() }).await
        else {
            panic!("expected JobInfo");
        };
        assert_eq!(info.job_id, job_id);
        assert!(!info.cancelled);
    }

    #[tokio::test]
    async fn cancel_marks_the_job_cancelled() {
        let daemon = harness().await;
        let Response::Submitted { job_id } =
            daemon.handle_request(Request::Submit { event: test_support::event("ping") }).await
        else {
            panic!("expected Submitted");
        };

        assert!(matches!(daemon.handle_request(Request::Cancel { job_id: job_id.clone() }).await, Response::Cancelled));

        let Response::JobInfo(info) = daemon.handle_request(Request::JobInfo { job_id }).await else {
            panic!("expected JobInfo");
        };
        assert!(info.cancelled);
    }

    #[tokio::test]
    async fn status_reports_configured_max_jobs() {
        let daemon = harness().await;
        let Response::Status(status) = daemon.handle_request(Request::Status).await else {
            panic!("expected Status");
        };
        assert_eq!(status.max_jobs, Config::default().worker.max_jobs);
    }

    #[tokio::test]
    async fn dispatcher_loop_drains_a_split_task() {
        let daemon = harness().await;
        let Response::Submitted { job_id } =
            daemon.handle_request(Request::Submit { event: test_support::event("ping") }).await
        else {
            panic!("expected Submitted");
        };

        assert_eq!(daemon.splitter.step().await.unwrap(), Some(1));
        assert!(daemon.dispatcher.step().await.unwrap().is_some());
        assert!(daemon.query.get_finished(&job_id).await.unwrap());
    }
}
