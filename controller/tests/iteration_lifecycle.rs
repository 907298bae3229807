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

//! Drives the iteration state machine end to end through a stand-in
//! interceptor (`/bin/sleep`, harmless to start and stop), exercising both
//! the timeout-driven and ledger-driven advance paths.

use std::time::Duration;

use rocket_controller_core::codec::TmStatusChange;
use rocket_controller_core::interceptor::InterceptorManager;
use rocket_controller_core::iteration::{IterationConfig, IterationController, IterationKind, StatusChangeEvent};
use rocket_controller_core::network::NetworkManager;

mod common;
use common::nodes;

fn accepted_ledger(ledger_seq: u32) -> TmStatusChange {
    TmStatusChange {
        new_status: 1,
        new_event: 1,
        ledger_seq,
        ledger_hash: vec![ledger_seq as u8],
        ledger_hash_previous: vec![],
        network_time: 0,
        first_seq: 0,
        last_seq: ledger_seq,
    }
}

#[cfg(unix)]
#[tokio::test]
async fn time_based_single_iteration_terminates_after_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let network = NetworkManager::new(false, false);
    network.update_network(&nodes(&[10, 11]));
    let interceptor = InterceptorManager::with_binary_path("/bin/sleep", "docker");
    let shutdown = std::sync::Arc::new(tokio::sync::Notify::new());

    let config = IterationConfig {
        max_iterations: 1,
        timeout: Duration::from_millis(50),
        max_ledger_seq: -1,
        ledger_timeout: false,
        kind: IterationKind::TimeBased,
        logs_dir: dir.path().to_path_buf(),
    };
    let controller = IterationController::spawn(config, &network, interceptor, shutdown.clone()).unwrap();
    controller.start().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), shutdown.notified())
        .await
        .expect("the single iteration should terminate on its own after the timeout elapses");
}

#[cfg(unix)]
#[tokio::test]
async fn ledger_based_iteration_advances_once_every_node_reaches_the_goal() {
    let dir = tempfile::tempdir().unwrap();
    let network = NetworkManager::new(false, false);
    network.update_network(&nodes(&[10, 11]));
    let interceptor = InterceptorManager::with_binary_path("/bin/sleep", "docker");
    let shutdown = std::sync::Arc::new(tokio::sync::Notify::new());

    let config = IterationConfig {
        max_iterations: 2,
        // Long enough that only ledger progress, not the timer, can be
        // driving the advance this test observes.
        timeout: Duration::from_secs(30),
        max_ledger_seq: 2,
        ledger_timeout: false,
        kind: IterationKind::LedgerBased,
        logs_dir: dir.path().to_path_buf(),
    };
    let controller = IterationController::spawn(config, &network, interceptor, shutdown.clone()).unwrap();
    controller.start().await.unwrap();

    let events = controller.events_sender();
    events.send(StatusChangeEvent { from_index: 0, message: accepted_ledger(2) }).unwrap();
    events.send(StatusChangeEvent { from_index: 1, message: accepted_ledger(2) }).unwrap();

    // `add_iteration` opens a fresh result logger for the next iteration as
    // part of advancing; its appearance on disk is the observable signal
    // that the controller moved from iteration 1 to iteration 2.
    let second_iteration_log = dir.path().join("result_log_iter2.csv");
    for _ in 0..50 {
        if second_iteration_log.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(second_iteration_log.exists(), "iteration should have advanced to iteration 2");

    let first_iteration_log = dir.path().join("result_log_iter1.csv");
    let rows = std::fs::read_to_string(first_iteration_log).unwrap();
    assert!(rows.contains('2'), "the ledger result row for the goal sequence should have been flushed");
}

#[cfg(unix)]
#[tokio::test]
async fn update_network_resyncs_the_ledger_map_to_the_new_node_count() {
    let dir = tempfile::tempdir().unwrap();
    let network = NetworkManager::new(false, false);
    network.update_network(&nodes(&[10, 11]));
    let interceptor = InterceptorManager::with_binary_path("/bin/sleep", "docker");
    let shutdown = std::sync::Arc::new(tokio::sync::Notify::new());

    let config = IterationConfig {
        max_iterations: 1,
        timeout: Duration::from_secs(30),
        max_ledger_seq: 2,
        ledger_timeout: false,
        kind: IterationKind::LedgerBased,
        logs_dir: dir.path().to_path_buf(),
    };
    let controller = IterationController::spawn(config, &network, interceptor, shutdown.clone()).unwrap();

    // Grow the network to three nodes before the run starts. A desynced
    // ledger map (still sized for two nodes) would silently ignore the
    // third node's events below, and the run would never reach its goal.
    controller.update_network(&network, &nodes(&[10, 11, 12])).await;
    controller.start().await.unwrap();

    let events = controller.events_sender();
    events.send(StatusChangeEvent { from_index: 0, message: accepted_ledger(2) }).unwrap();
    events.send(StatusChangeEvent { from_index: 1, message: accepted_ledger(2) }).unwrap();
    events.send(StatusChangeEvent { from_index: 2, message: accepted_ledger(2) }).unwrap();

    tokio::time::timeout(Duration::from_secs(5), shutdown.notified())
        .await
        .expect("the run should terminate once all three resynced nodes report the goal sequence");
}
