//! Scenario scheduler coordinating virtual users across a run
//!
//! Scenarios run strictly one after another. Each one launches its VU
//! slots on a [`TaskTracker`] under a child [`CancellationToken`] of the
//! run, keeps them iterating for the scenario's duration, cancels them and
//! waits for every slot to finish before the next scenario may start.

use crate::client::{Connector, WebSocketConnector};
use crate::common::{Strategy, VuId};
use crate::config::{RunConfig, ScenarioConfig, ScriptConfig};
use crate::constants::SCENARIO_DRAIN_TIMEOUT;
use crate::errors::Result;
use crate::metrics::AggregateMetrics;
use crate::metrics::reporting::{RunReport, ScenarioReport};
use crate::vu::{Pacer, TokioPacer, VirtualUser, VuContext};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use url::Url;

/// Runs the configured scenarios against one target
pub struct Scheduler {
    config: RunConfig,
    url: Url,
    script: Arc<ScriptConfig>,
    metrics: Arc<AggregateMetrics>,
    connector: Arc<dyn Connector>,
    pacer: Arc<dyn Pacer>,
}

impl Scheduler {
    /// Scheduler speaking websocket to the configured target
    pub fn new(config: RunConfig) -> Result<Self> {
        let connector =
            WebSocketConnector::new(&config.custom_headers()?, config.target.connect_timeout)?;
        Self::with_transport(config, Arc::new(connector), Arc::new(TokioPacer))
    }

    pub fn with_transport(
        config: RunConfig,
        connector: Arc<dyn Connector>,
        pacer: Arc<dyn Pacer>,
    ) -> Result<Self> {
        let url = config.target_url()?;
        Ok(Self {
            script: Arc::new(config.script.clone()),
            config,
            url,
            metrics: Arc::new(AggregateMetrics::new()),
            connector,
            pacer,
        })
    }

    pub fn metrics(&self) -> Arc<AggregateMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every scenario, stopping early on Ctrl+C
    pub async fn run(&self) -> RunReport {
        let cancel = CancellationToken::new();
        self.setup_signal_handler(cancel.clone());

        let report = self.run_until(cancel.clone()).await;
        // Releases the signal listener
        cancel.cancel();
        report
    }

    /// Set up signal handler for graceful shutdown
    fn setup_signal_handler(&self, cancel: CancellationToken) {
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for ctrl+c: {}", e);
                        return;
                    }
                    warn!("Received Ctrl+C, cancelling the run...");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
    }

    /// Run every scenario until done or until `cancel` fires
    pub async fn run_until(&self, cancel: CancellationToken) -> RunReport {
        let started_at = Utc::now();
        let run_start = Instant::now();
        let scenarios = self.config.ordered_scenarios();
        let mut reports = Vec::with_capacity(scenarios.len());

        info!(
            "Starting run with {} scenarios against {}",
            scenarios.len(),
            self.url
        );

        for scenario in &scenarios {
            let scheduled = run_start + scenario.start_offset;
            let late = Instant::now() > scheduled;
            if late {
                warn!(
                    "Scenario {} starts {:?} late, previous scenario was still draining",
                    scenario.name,
                    Instant::now() - scheduled
                );
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(scheduled) => {}
            }

            reports.push(self.run_scenario(scenario, &cancel, run_start, late).await);
            if cancel.is_cancelled() {
                break;
            }
        }

        let interrupted = cancel.is_cancelled();
        if interrupted {
            warn!(
                "Run interrupted after {} of {} scenarios",
                reports.len(),
                scenarios.len()
            );
        } else {
            info!("All scenarios completed");
        }

        RunReport {
            target: self.config.target.url.clone(),
            started_at,
            elapsed: run_start.elapsed(),
            planned: scenarios.len(),
            scenarios: reports,
            totals: self.metrics.snapshot(),
            interrupted,
        }
    }

    async fn run_scenario(
        &self,
        scenario: &ScenarioConfig,
        run_cancel: &CancellationToken,
        run_start: Instant,
        late: bool,
    ) -> ScenarioReport {
        info!(
            "Starting scenario {} with {} VUs for {:?} (strategy={})",
            scenario.name, scenario.vus, scenario.duration, scenario.strategy
        );

        let before = self.metrics.snapshot();
        let launched = Instant::now();
        let cancel = run_cancel.child_token();
        let tracker = TaskTracker::new();

        let ctx = VuContext {
            url: self.url.clone(),
            script: Arc::clone(&self.script),
            metrics: Arc::clone(&self.metrics),
            connector: Arc::clone(&self.connector),
            pacer: Arc::clone(&self.pacer),
        };
        let mut tasks = Vec::with_capacity(scenario.vus as usize);
        for slot in 0..scenario.vus {
            let task = tracker.spawn(vu_loop(
                VuId::new(slot),
                scenario.strategy,
                ctx.clone(),
                cancel.clone(),
            ));
            tasks.push(task.abort_handle());
        }
        tracker.close();

        tokio::select! {
            _ = tokio::time::sleep(scenario.duration) => {}
            _ = cancel.cancelled() => {}
        }
        cancel.cancel();

        let aborted = drain(&tracker, &tasks, SCENARIO_DRAIN_TIMEOUT).await;
        if aborted > 0 {
            warn!(
                "Scenario {}: aborted {} VUs still running after {:?}",
                scenario.name, aborted, SCENARIO_DRAIN_TIMEOUT
            );
            for _ in 0..aborted {
                self.metrics.record_iteration(false);
            }
        }

        let metrics = self.metrics.snapshot().since(&before);
        info!(
            "Scenario {} finished: {} iterations completed, {} interrupted",
            scenario.name,
            metrics.counters.iterations_completed,
            metrics.counters.iterations_interrupted
        );

        ScenarioReport {
            name: scenario.name.clone(),
            strategy: scenario.strategy,
            vus: scenario.vus,
            scheduled_offset: scenario.start_offset,
            started_offset: launched - run_start,
            late,
            active: launched.elapsed(),
            metrics,
        }
    }
}

/// Wait for every tracked VU task, aborting the ones still alive after
/// `limit`. Returns how many were aborted. Nothing tracked is running once
/// this returns.
async fn drain(tracker: &TaskTracker, tasks: &[AbortHandle], limit: Duration) -> usize {
    if timeout(limit, tracker.wait()).await.is_ok() {
        return 0;
    }
    let stuck = tracker.len();
    for task in tasks {
        task.abort();
    }
    tracker.wait().await;
    stuck
}

/// One VU slot: fresh virtual user per iteration until cancelled
async fn vu_loop(id: VuId, strategy: Strategy, ctx: VuContext, cancel: CancellationToken) {
    while !cancel.is_cancelled() {
        let vu = VirtualUser::new(id, strategy);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                ctx.metrics.record_iteration(false);
                debug!("VU {} iteration on {} interrupted", id, vu.room_id);
                break;
            }
            _ = vu.run(&ctx) => ctx.metrics.record_iteration(true),
        }
        // Iterations that fail without suspending must not starve the worker
        tokio::task::yield_now().await;
    }
}
