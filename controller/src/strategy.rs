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

//! Routes decoded protocol messages to user-defined mutation logic and to
//! the iteration controller's observers.
//!
//! `Strategy` is expressed as a capability interface (one required
//! operation, one lifecycle hook) rather than an inheritance hierarchy:
//! concrete strategies embed a [`StrategyCore`] carrying the shared
//! auto-partition/auto-parse/logging behaviour, composition over
//! inheritance.

use crate::codec::{self, DecodedMessage};
use crate::error::ControllerError;
use crate::iteration::StatusChangeEvent;
use crate::logging::ActionLogger;
use crate::network::{Index, NetworkManager};
use crate::{ACTION_DROP, ACTION_FORWARD};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// The boolean construction options every concrete strategy shares.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrategyOptions {
    /// After the concrete strategy decides, override the action to
    /// [`ACTION_DROP`] whenever the network model disallows `src -> dst`.
    pub auto_partition: bool,
    /// Consult [`NetworkManager::check_previous_message`] before invoking
    /// the concrete strategy; also gates whether decisions get memoised.
    pub auto_parse_identical: bool,
    /// Also consult [`NetworkManager::check_subsets`].
    pub auto_parse_subsets: bool,
    /// Emit one action-log row per decision.
    pub keep_action_log: bool,
}

/// Shared state and behaviour every [`Strategy`] is built on: the network
/// model, the construction options, the channel to the iteration
/// controller, and (optionally) the action log.
pub struct StrategyCore {
    pub network: NetworkManager,
    pub options: StrategyOptions,
    events_tx: mpsc::UnboundedSender<StatusChangeEvent>,
    action_log: Option<Mutex<ActionLogger>>,
}

impl StrategyCore {
    pub fn new(network: NetworkManager, options: StrategyOptions, events_tx: mpsc::UnboundedSender<StatusChangeEvent>) -> Self {
        Self { network, options, events_tx, action_log: None }
    }

    pub fn with_action_log(mut self, logger: ActionLogger) -> Self {
        self.action_log = Some(Mutex::new(logger));
        self
    }

    fn notify_and_log(
        &self,
        type_id: u16,
        message: Option<&DecodedMessage>,
        src: Index,
        dst: Index,
        original: &[u8],
        mutated: &[u8],
        action: u32,
    ) {
        if let Some(DecodedMessage::StatusChange(status)) = message {
            // An unbounded channel: the observer side never backs up the
            // packet-dispatch path, per the message-passing design.
            let _ = self.events_tx.send(StatusChangeEvent { from_index: src, message: status.clone() });
        }

        if self.options.keep_action_log {
            let Some(log) = self.action_log.as_ref() else { return };
            let mut log = log.lock();
            if let Err(error) = log.log(src, dst, type_id, original, mutated, action) {
                tracing::warn!(%error, "failed to append an action-log row");
            }
        }
    }
}

/// The message type logged for a frame `Codec::decode` could not parse.
/// Never a real protocol type id: the wire protocol's type ids are
/// themselves opaque, but this only ever appears in the action log, never
/// on the wire.
const MALFORMED_FRAME_TYPE: u16 = u16::MAX;

/// The polymorphic capability set a concrete fault-injection scenario
/// implements.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn core(&self) -> &StrategyCore;

    /// Called once after `update_network`, before any packet arrives;
    /// used to install partitions/subsets and arm iteration timers.
    async fn setup(&self) -> Result<(), ControllerError> {
        Ok(())
    }

    /// The concrete mutation logic. `original` is the raw wire payload
    /// Codec decoded `message` from.
    fn handle_packet(
        &self,
        type_id: u16,
        message: &DecodedMessage,
        src: Index,
        dst: Index,
        original: &[u8],
    ) -> Result<(Vec<u8>, u32), ControllerError>;

    /// Called when `Codec::decode` cannot parse the raw payload. The
    /// default policy is forward-as-is (`ACTION_FORWARD`); a concrete
    /// strategy may override this to choose differently (e.g. drop a
    /// frame it considers malformed). Unlike `handle_packet`, there is no
    /// decoded message to hand back -- only the raw bytes and the error.
    fn handle_codec_error(&self, raw: &[u8], _error: &ControllerError) -> (Vec<u8>, u32) {
        (raw.to_vec(), ACTION_FORWARD)
    }

    /// The full per-packet pipeline: decode, consult the auto-parse
    /// caches, fall back to `handle_packet`, apply the auto-partition
    /// override, memoise, notify the iteration controller, and log.
    ///
    /// Purely synchronous end to end, per the packet-server contract: no
    /// `.await` point here can stall a concurrent RPC worker behind this
    /// one's network-mutex or logger-mutex acquisition, both O(1).
    fn process_packet(&self, raw: &[u8], src: Index, dst: Index) -> Result<(Vec<u8>, u32), ControllerError> {
        let core = self.core();
        let (type_id, message) = match codec::decode(raw) {
            Ok(decoded) => decoded,
            Err(error) => {
                // A malformed frame is a distinct outcome from a strategy
                // fault: it never reaches `handle_packet`, so the policy
                // lives here rather than falling through to the
                // server's catch-all drop.
                let (mutated, action) = self.handle_codec_error(raw, &error);
                core.notify_and_log(MALFORMED_FRAME_TYPE, None, src, dst, raw, &mutated, action);
                return Ok((mutated, action));
            }
        };

        if core.options.auto_parse_identical {
            let (hit, decision) = core.network.check_previous_message(src, dst, raw)?;
            if hit {
                core.notify_and_log(type_id, Some(&message), src, dst, raw, &decision.0, decision.1);
                return Ok(decision);
            }
        }

        if core.options.auto_parse_subsets {
            let (hit, decision) = core.network.check_subsets(src, dst, raw)?;
            if hit {
                core.notify_and_log(type_id, Some(&message), src, dst, raw, &decision.0, decision.1);
                return Ok(decision);
            }
        }

        let (mutated, mut action) = self.handle_packet(type_id, &message, src, dst, raw)?;

        if core.options.auto_partition && !core.network.check_communication(src, dst)? {
            action = ACTION_DROP;
        }

        // Subset-broadcast memoisation reads back the same per-(src,dst)
        // records identical-message memoisation writes, so both caches
        // are fed from the one `auto_parse_identical` gate.
        if core.options.auto_parse_identical {
            core.network.set_message_action(src, dst, raw.to_vec(), mutated.clone(), action)?;
        }

        core.notify_and_log(type_id, Some(&message), src, dst, raw, &mutated, action);
        Ok((mutated, action))
    }
}
