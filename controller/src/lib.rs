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

//! Runtime core of the rocket fault-injection controller: an RPC-exposed
//! packet dispatcher that decides, per intercepted peer-to-peer packet,
//! whether to forward it unchanged, forward a mutation, delay it, or drop
//! it, and an iteration controller that drives bounded experimental runs
//! over a validator cluster.

pub mod codec;
pub mod error;
pub mod interceptor;
pub mod iteration;
pub mod logging;
pub mod network;
pub mod server;
pub mod strategy;
pub mod validator;

/// Forward the packet unchanged, immediately.
pub const ACTION_FORWARD: u32 = 0;
/// Drop the packet.
pub const ACTION_DROP: u32 = u32::MAX;

pub use error::ControllerError;
