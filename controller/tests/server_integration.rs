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

//! End-to-end exercise of the RPC endpoint the interceptor tunnels every
//! peer-to-peer packet through: bind the real server, dial it with a real
//! tonic client, and confirm a packet round-trips through a strategy.

use std::sync::Arc;
use std::time::Duration;

use rocket_controller_core::codec::DecodedMessage;
use rocket_controller_core::error::ControllerError;
use rocket_controller_core::network::{Index, NetworkManager};
use rocket_controller_core::server;
use rocket_controller_core::strategy::{Strategy, StrategyCore, StrategyOptions};
use rocket_controller_core::ACTION_FORWARD;

mod common;
use common::nodes;

struct PassThrough(StrategyCore);

#[async_trait::async_trait]
impl Strategy for PassThrough {
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

// A single test function: `LISTEN_ADDR` is a fixed `[::]:50051`, so two
// tests binding it concurrently would race for the port.
#[tokio::test]
async fn send_packet_round_trips_and_rejects_unknown_ports() {
    let network = NetworkManager::new(false, false);
    network.update_network(&nodes(&[10, 11]));

    let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();
    let core = StrategyCore::new(network, StrategyOptions::default(), events_tx);
    let strategy: Arc<dyn Strategy> = Arc::new(PassThrough(core));

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let server_task = tokio::spawn(server::serve(strategy, shutdown.clone()));

    // Give the listener a moment to bind before dialing it.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut client = server::proto::packet_service_client::PacketServiceClient::connect("http://127.0.0.1:50051")
        .await
        .expect("server should be listening by now");

    let response = client
        .send_packet(server::proto::Packet { data: b"hello".to_vec(), from_port: 10, to_port: 11 })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.data, b"hello");
    assert_eq!(response.action, ACTION_FORWARD);

    let result = client
        .send_packet(server::proto::Packet { data: b"hello".to_vec(), from_port: 999, to_port: 11 })
        .await;
    assert!(result.is_err());

    shutdown.notify_waiters();
    server_task.await.unwrap().unwrap();
}
