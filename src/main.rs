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

//! CLI entrypoint: parses run configuration, wires the network model,
//! iteration controller, interceptor supervisor, and packet server
//! together, and drives the process to completion or signal-triggered
//! shutdown.

use rocket_controller_core::codec::DecodedMessage;
use rocket_controller_core::error::ControllerError;
use rocket_controller_core::interceptor::InterceptorManager;
use rocket_controller_core::iteration::{IterationConfig, IterationController, IterationKind};
use rocket_controller_core::logging::ActionLogger;
use rocket_controller_core::network::{Index, NetworkManager};
use rocket_controller_core::strategy::{Strategy, StrategyCore, StrategyOptions};
use rocket_controller_core::validator::{SocketAddress, ValidatorKeyData, ValidatorNode};
use rocket_controller_core::{server, ACTION_FORWARD};

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum IterationKindArg {
    TimeBased,
    LedgerBased,
    None,
}

impl From<IterationKindArg> for IterationKind {
    fn from(value: IterationKindArg) -> Self {
        match value {
            IterationKindArg::TimeBased => IterationKind::TimeBased,
            IterationKindArg::LedgerBased => IterationKind::LedgerBased,
            IterationKindArg::None => IterationKind::None,
        }
    }
}

/// Fault-injection and fuzzing controller for a validator consensus
/// network.
#[derive(Parser, Debug)]
#[command(name = "rocket-controller", version, about)]
struct Cli {
    /// Directory the action/result/spec-check logs for this run are
    /// written under.
    #[arg(long, default_value = "./logs/run")]
    logs_dir: PathBuf,

    /// Validator peer ports making up the cluster, in node-index order.
    #[arg(long, value_delimiter = ',', required = true)]
    peer_ports: Vec<u16>,

    /// How iterations are bounded.
    #[arg(long, value_enum, default_value_t = IterationKindArg::TimeBased)]
    iteration_kind: IterationKindArg,

    /// Per-iteration timeout, in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_seconds: u64,

    /// How many iterations to run before terminating.
    #[arg(long, default_value_t = 1)]
    max_iterations: u32,

    /// Target ledger sequence for ledger-based iterations; negative means
    /// time-based (no ledger goal).
    #[arg(long, default_value_t = -1)]
    max_ledger_seq: i64,

    /// Reset the iteration timer on every newly observed ledger.
    #[arg(long)]
    ledger_timeout: bool,

    /// Drop packets the partition matrix disallows, overriding whatever
    /// the strategy decided.
    #[arg(long)]
    auto_partition: bool,

    /// Memoise identical-message decisions per (src, dst).
    #[arg(long)]
    auto_parse_identical: bool,

    /// Memoise subset-broadcast decisions.
    #[arg(long)]
    auto_parse_subsets: bool,

    /// Append one row per decision to the action log.
    #[arg(long)]
    keep_action_log: bool,

    /// Container runtime CLI used by `cleanup_containers` on shutdown.
    #[arg(long, default_value = "docker")]
    container_runtime: String,
}

/// The built-in baseline strategy: decodes, never mutates, always
/// forwards immediately. Real fault scenarios are their own `Strategy`
/// implementations layered on top of [`StrategyCore`]; this one exists
/// only so the binary has something to run standalone.
struct PassThroughStrategy(StrategyCore);

#[async_trait::async_trait]
impl Strategy for PassThroughStrategy {
    fn core(&self) -> &StrategyCore {
        &self.0
    }

    fn handle_packet(
        &self,
        _type_id: u16,
        _message: &DecodedMessage,
        _src: Index,
        _dst: Index,
        original: &[u8],
    ) -> Result<(Vec<u8>, u32), ControllerError> {
        Ok((original.to_vec(), ACTION_FORWARD))
    }
}

fn build_nodes(peer_ports: &[u16]) -> Vec<ValidatorNode> {
    peer_ports
        .iter()
        .map(|&port| {
            ValidatorNode::new(
                SocketAddress::new("127.0.0.1", port),
                SocketAddress::new("127.0.0.1", port),
                SocketAddress::new("127.0.0.1", port),
                SocketAddress::new("127.0.0.1", port),
                ValidatorKeyData::new("unknown", "", "", ""),
            )
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let nodes = build_nodes(&cli.peer_ports);

    let network = NetworkManager::new(cli.auto_parse_identical, cli.auto_parse_subsets);
    network.update_network(&nodes);

    let interceptor = InterceptorManager::new(cli.container_runtime.clone());
    let shutdown = Arc::new(tokio::sync::Notify::new());

    let iteration_config = IterationConfig {
        max_iterations: cli.max_iterations,
        timeout: Duration::from_secs(cli.timeout_seconds),
        max_ledger_seq: cli.max_ledger_seq,
        ledger_timeout: cli.ledger_timeout,
        kind: cli.iteration_kind.into(),
        logs_dir: cli.logs_dir.clone(),
    };
    let controller = IterationController::spawn(iteration_config, &network, interceptor, shutdown.clone())?;

    let options = StrategyOptions {
        auto_partition: cli.auto_partition,
        auto_parse_identical: cli.auto_parse_identical,
        auto_parse_subsets: cli.auto_parse_subsets,
        keep_action_log: cli.keep_action_log,
    };
    let mut core = StrategyCore::new(network, options, controller.events_sender());
    if cli.keep_action_log {
        core = core.with_action_log(ActionLogger::create(&cli.logs_dir, &nodes)?);
    }
    let strategy: Arc<dyn Strategy> = Arc::new(PassThroughStrategy(core));

    strategy.setup().await?;
    rocket_controller_metrics::initialize();
    controller.start().await?;

    let server_task = tokio::spawn(server::serve(strategy, shutdown.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt signal, shutting down");
            controller.shutdown_now().await?;
        }
        _ = shutdown.notified() => {}
    }

    server_task.await??;
    Ok(())
}
