// Copyright (c) 2026 the rocket-controller contributors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Drives experiment lifecycle: starting/stopping the interceptor,
//! expiring iterations on time or ledger progress, and coordinating
//! shutdown.
//!
//! The strategy layer never calls into this module directly: it posts a
//! [`StatusChangeEvent`] to a channel this controller drains on its own
//! task, so it owns its inbound channel rather than being called into
//! from arbitrary packet-dispatch tasks.

use crate::codec::TmStatusChange;
use crate::error::ControllerError;
use crate::interceptor::InterceptorManager;
use crate::logging::{LedgerResult, ResultLogger, SpecCheckLogger, SpecChecker};
use crate::network::NetworkManager;
use crate::validator::ValidatorNode;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationKind {
    TimeBased,
    LedgerBased,
    /// Single-iteration mode: timer expiry terminates the whole run, not
    /// just the current iteration.
    None,
}

#[derive(Clone, Debug)]
pub struct IterationConfig {
    pub max_iterations: u32,
    pub timeout: Duration,
    /// `< 0` means time-based (no ledger goal); `>= 1` is the target
    /// sequence every node must reach.
    pub max_ledger_seq: i64,
    /// Whether the timer resets on each newly observed ledger.
    pub ledger_timeout: bool,
    pub kind: IterationKind,
    pub logs_dir: PathBuf,
}

#[derive(Clone, Debug)]
struct LedgerValidationInfo {
    seq: u32,
    hash: Vec<u8>,
    observed_at: Instant,
}

#[derive(Clone, Debug)]
pub struct StatusChangeEvent {
    pub from_index: usize,
    pub message: TmStatusChange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Init,
    Running,
    Advancing,
    Terminating,
}

/// Owns a `ResultLogger` exclusively for the lifetime of one iteration,
/// off the RPC hot path: ledger events arrive on the controller's own
/// task, which hands rows to this one via an unbounded channel.
struct ResultLogTask {
    rows_tx: mpsc::UnboundedSender<LedgerResult>,
    handle: JoinHandle<()>,
}

impl ResultLogTask {
    fn spawn(mut logger: ResultLogger) -> Self {
        let (rows_tx, mut rows_rx) = mpsc::unbounded_channel::<LedgerResult>();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(row) = rows_rx.blocking_recv() {
                if let Err(error) = logger.log(&row) {
                    warn!(%error, "failed to append a ledger result row");
                }
            }
        });
        Self { rows_tx, handle }
    }

    fn submit(&self, row: LedgerResult) {
        // A full channel never blocks the caller; a send failure only
        // means the task already stopped, which `join` will have logged.
        let _ = self.rows_tx.send(row);
    }

    /// Closes the channel and waits for every already-submitted row to be
    /// flushed. This is `add_iteration`'s step 1.
    async fn join(self) {
        drop(self.rows_tx);
        if let Err(error) = self.handle.await {
            warn!(%error, "result-logging task panicked");
        }
    }
}

struct Inner {
    phase: Phase,
    cur_iteration: u32,
    ledger_map: Vec<LedgerValidationInfo>,
    /// False once the validator list has been torn down; lets the
    /// observer discard spurious late events per the concurrency model.
    nodes_installed: bool,
    timer_generation: u64,
    iteration_start: Instant,
    result_log_task: Option<ResultLogTask>,
}

impl Inner {
    fn new(node_count: usize) -> Self {
        let now = Instant::now();
        Self {
            phase: Phase::Init,
            cur_iteration: 0,
            ledger_map: vec![LedgerValidationInfo { seq: 1, hash: Vec::new(), observed_at: now }; node_count],
            nodes_installed: true,
            timer_generation: 0,
            iteration_start: now,
            result_log_task: None,
        }
    }
}

/// Shared handle to the iteration state machine. Cloning shares state, the
/// same handle-around-`Arc` shape [`NetworkManager`] and
/// [`InterceptorManager`] use.
#[derive(Clone)]
pub struct IterationController {
    config: Arc<IterationConfig>,
    interceptor: InterceptorManager,
    spec_logger: Arc<Mutex<SpecCheckLogger>>,
    inner: Arc<Mutex<Inner>>,
    events_tx: mpsc::UnboundedSender<StatusChangeEvent>,
    shutdown: Arc<Notify>,
}

impl IterationController {
    pub fn spawn(
        config: IterationConfig,
        network: &NetworkManager,
        interceptor: InterceptorManager,
        shutdown: Arc<Notify>,
    ) -> Result<Self, ControllerError> {
        let spec_logger = SpecCheckLogger::create(&config.logs_dir)
            .map_err(|error| ControllerError::InvalidArgument(format!("could not open spec-check log: {error}")))?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            config: Arc::new(config),
            interceptor,
            spec_logger: Arc::new(Mutex::new(spec_logger)),
            inner: Arc::new(Mutex::new(Inner::new(network.node_count()))),
            events_tx,
            shutdown,
        };

        tokio::spawn(controller.clone().drain_events(events_rx));
        Ok(controller)
    }

    /// A sender clone for strategies to post ledger-validation events on,
    /// per the message-passing design: never call into this controller
    /// directly from the packet-dispatch path.
    pub fn events_sender(&self) -> mpsc::UnboundedSender<StatusChangeEvent> {
        self.events_tx.clone()
    }

    /// Replaces the network topology and resizes this controller's ledger
    /// validation map to match, so the two stay consistent. Calling
    /// `network.update_network` directly after `spawn` would resize the
    /// communication and prev-action matrices but leave `ledger_map` sized
    /// for the old node count; this is the only sanctioned way to change
    /// the topology once the controller is running.
    pub async fn update_network(&self, network: &NetworkManager, nodes: &[ValidatorNode]) {
        network.update_network(nodes);
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.ledger_map = vec![LedgerValidationInfo { seq: 1, hash: Vec::new(), observed_at: now }; nodes.len()];
        inner.nodes_installed = true;
    }

    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Starts the first iteration. Must run once, after the validator list
    /// is installed and before any packet arrives.
    pub async fn start(&self) -> Result<(), ControllerError> {
        self.advance().await
    }

    /// Shuts the whole run down immediately, as on a process signal, per
    /// the `RUNNING --(shutdown signal)--> TERMINATING` transition.
    pub async fn shutdown_now(&self) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock().await;
        inner.phase = Phase::Terminating;
        let task = inner.result_log_task.take();
        drop(inner);
        if let Some(task) = task {
            task.join().await;
        }
        self.interceptor.stop().await?;
        self.interceptor.cleanup_containers().await?;
        self.shutdown.notify_waiters();
        Ok(())
    }

    async fn drain_events(self, mut events_rx: mpsc::UnboundedReceiver<StatusChangeEvent>) {
        while let Some(event) = events_rx.recv().await {
            if let Err(error) = self.handle_status_change(event).await {
                warn!(%error, "failed to process a status-change event");
            }
        }
    }

    async fn handle_status_change(&self, event: StatusChangeEvent) -> Result<(), ControllerError> {
        if self.config.kind != IterationKind::LedgerBased || !event.message.is_accepted_ledger() {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        if !inner.nodes_installed || inner.phase != Phase::Running {
            // A spurious late event: the iteration already moved on.
            return Ok(());
        }
        let Some(slot) = inner.ledger_map.get_mut(event.from_index) else {
            return Ok(());
        };
        if event.message.ledger_seq <= slot.seq {
            return Ok(());
        }
        slot.seq = event.message.ledger_seq;
        slot.hash = event.message.ledger_hash.clone();
        slot.observed_at = Instant::now();

        if self.config.ledger_timeout {
            inner.timer_generation += 1;
            self.arm_timer(inner.timer_generation);
        }

        if let Some(task) = inner.result_log_task.as_ref() {
            let elapsed = inner.iteration_start.elapsed().as_secs_f64();
            let hashes: Vec<Vec<u8>> = inner.ledger_map.iter().map(|info| info.hash.clone()).collect();
            let indexes: Vec<u32> = inner.ledger_map.iter().map(|info| info.seq).collect();
            task.submit(LedgerResult::new(
                event.message.ledger_seq,
                self.config.max_ledger_seq,
                elapsed,
                &[event.message.network_time],
                &hashes,
                &indexes,
            ));
        }

        let goal = self.config.max_ledger_seq;
        let all_done = goal >= 1 && inner.ledger_map.iter().all(|info| i64::from(info.seq) >= goal);
        drop(inner);

        if all_done {
            self.advance().await?;
        }
        Ok(())
    }

    fn effective_max_iterations(&self) -> u32 {
        match self.config.kind {
            IterationKind::None => 1,
            _ => self.config.max_iterations,
        }
    }

    fn arm_timer(&self, generation: u64) {
        let controller = self.clone();
        let timeout = self.config.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            {
                let inner = controller.inner.lock().await;
                if inner.timer_generation != generation || inner.phase != Phase::Running {
                    return;
                }
            }
            if let Err(error) = controller.advance().await {
                warn!(%error, "failed to advance iteration on timeout");
            }
        });
    }

    /// `add_iteration`: the five-step algorithm in the iteration controller
    /// contract.
    async fn advance(&self) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock().await;
        inner.phase = Phase::Advancing;

        // Step 1: flush the previous iteration's outstanding log rows.
        if let Some(task) = inner.result_log_task.take() {
            drop(inner);
            task.join().await;
            inner = self.inner.lock().await;
        }

        // Step 2.
        inner.cur_iteration += 1;
        let finished_iteration = inner.cur_iteration.saturating_sub(1);

        // Step 3.
        if finished_iteration >= 1 {
            let result_path = self.config.logs_dir.join(format!("result_log_iter{finished_iteration}.csv"));
            match SpecChecker::check_iteration(&result_path) {
                Ok(row) => {
                    let mut spec_logger = self.spec_logger.lock().await;
                    if let Err(error) = spec_logger.append(finished_iteration, row) {
                        warn!(%error, "failed to append spec-check row for iteration {finished_iteration}");
                    }
                }
                Err(error) => warn!(%error, "failed to spec-check iteration {finished_iteration}"),
            }
        }

        // Step 4 / 5.
        if inner.cur_iteration <= self.effective_max_iterations() {
            self.interceptor.stop().await?;
            let logger = ResultLogger::create(&self.config.logs_dir, inner.cur_iteration)
                .map_err(|error| ControllerError::InvalidArgument(error.to_string()))?;
            inner.result_log_task = Some(ResultLogTask::spawn(logger));
            self.interceptor.start_new().await?;

            inner.phase = Phase::Running;
            inner.nodes_installed = true;
            inner.iteration_start = Instant::now();
            let iteration_start = inner.iteration_start;
            for slot in &mut inner.ledger_map {
                slot.seq = 1;
                slot.hash.clear();
                slot.observed_at = iteration_start;
            }
            inner.timer_generation += 1;
            let generation = inner.timer_generation;
            info!(iteration = inner.cur_iteration, "iteration started");
            drop(inner);
            self.arm_timer(generation);
        } else {
            inner.phase = Phase::Terminating;
            drop(inner);
            self.interceptor.stop().await?;
            self.interceptor.cleanup_containers().await?;
            let rows = {
                let spec_logger = self.spec_logger.lock().await;
                spec_logger.aggregate().unwrap_or_default()
            };
            info!(iterations_checked = rows.len(), "run complete");
            self.shutdown.notify_waiters();
        }
        Ok(())
    }
}
