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

pub const GAUGE_NAMES: [&str; 6] = [
    network::CONNECTED_EDGES,
    network::RESTRICTED_EDGES,
    iteration::CURRENT_ITERATION,
    iteration::LAST_LEDGER_SEQ,
    server::INFLIGHT_PACKETS,
    interceptor::RUNNING,
];
pub const COUNTER_NAMES: [&str; 4] = [
    server::PACKETS_FORWARDED,
    server::PACKETS_DROPPED,
    server::PACKETS_DELAYED,
    server::STRATEGY_FAULTS,
];
pub const HISTOGRAM_NAMES: [&str; 0] = [];

pub mod network {
    pub const CONNECTED_EDGES: &str = "rocket_network_connected_edges_total";
    pub const RESTRICTED_EDGES: &str = "rocket_network_restricted_edges_total";
}

pub mod iteration {
    pub const CURRENT_ITERATION: &str = "rocket_iteration_current";
    pub const LAST_LEDGER_SEQ: &str = "rocket_iteration_last_ledger_seq";

    pub mod labels {
        pub const NODE_INDEX: &str = "node_index";
    }
}

pub mod server {
    pub const INFLIGHT_PACKETS: &str = "rocket_server_inflight_packets";
    pub const PACKETS_FORWARDED: &str = "rocket_server_packets_forwarded_total";
    pub const PACKETS_DROPPED: &str = "rocket_server_packets_dropped_total";
    pub const PACKETS_DELAYED: &str = "rocket_server_packets_delayed_total";
    pub const STRATEGY_FAULTS: &str = "rocket_server_strategy_faults_total";
}

pub mod interceptor {
    pub const RUNNING: &str = "rocket_interceptor_running";
}
