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

use rocket_controller_core::validator::{SocketAddress, ValidatorKeyData, ValidatorNode};

pub fn node(port: u16) -> ValidatorNode {
    ValidatorNode::new(
        SocketAddress::new("127.0.0.1", port),
        SocketAddress::new("127.0.0.1", port + 1000),
        SocketAddress::new("127.0.0.1", port + 2000),
        SocketAddress::new("127.0.0.1", port + 3000),
        ValidatorKeyData::new("status", "key", "pub", "validation"),
    )
}

pub fn nodes(ports: &[u16]) -> Vec<ValidatorNode> {
    ports.iter().copied().map(node).collect()
}
