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

//! Immutable descriptors for the validators the controller supervises.
//!
//! These are supplied by the caller before the first iteration and
//! replaced atomically via [`crate::network::NetworkManager::update_network`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketAddress {
    pub host: String,
    pub port: u16,
}

impl SocketAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opaque key material for a validator; the controller never inspects these
/// strings, it only ever logs or forwards them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorKeyData {
    pub status: String,
    pub key: String,
    pub pub_key: String,
    pub validation_key: String,
}

impl ValidatorKeyData {
    pub fn new(
        status: impl Into<String>,
        key: impl Into<String>,
        pub_key: impl Into<String>,
        validation_key: impl Into<String>,
    ) -> Self {
        Self { status: status.into(), key: key.into(), pub_key: pub_key.into(), validation_key: validation_key.into() }
    }
}

/// A single participant in the consensus cluster.
///
/// Identity within the controller is the peer port (`peer.port`), not the
/// RPC port: the peer port is what the interceptor tunnels packets
/// between, so it is the stable key every node-index lookup uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorNode {
    pub peer: SocketAddress,
    pub ws_public: SocketAddress,
    pub ws_admin: SocketAddress,
    pub rpc: SocketAddress,
    pub key_data: ValidatorKeyData,
}

impl ValidatorNode {
    pub fn new(
        peer: SocketAddress,
        ws_public: SocketAddress,
        ws_admin: SocketAddress,
        rpc: SocketAddress,
        key_data: ValidatorKeyData,
    ) -> Self {
        Self { peer, ws_public, ws_admin, rpc, key_data }
    }

    /// The port this node is identified by within the controller.
    pub const fn identity_port(&self) -> u16 {
        self.peer.port
    }
}

impl fmt::Display for ValidatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorNode(peer={}, rpc={})", self.peer, self.rpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_port_uses_peer_not_rpc() {
        let node = ValidatorNode::new(
            SocketAddress::new("127.0.0.1", 10),
            SocketAddress::new("127.0.0.1", 20),
            SocketAddress::new("127.0.0.1", 30),
            SocketAddress::new("127.0.0.1", 40),
            ValidatorKeyData::new("status", "key", "pub", "validation"),
        );
        assert_eq!(node.identity_port(), 10);
    }
}
