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

//! The partition matrix, identical-message memoisation, and
//! subset-broadcast memoisation strategies manipulate to express fault
//! scenarios.
//!
//! `NetworkManager` is a pure in-memory state machine guarded by a single
//! [`parking_lot::Mutex`]: short, uncontended critical sections, never
//! held across an `.await`.

use crate::error::ControllerError;
use crate::validator::ValidatorNode;

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type Index = usize;

/// The most recent message/mutation/action recorded for a given
/// `(sender, receiver)` pair. The initial sentinel is `{b"", b"", -1}`,
/// which no real message/action can collide with (`action` is otherwise
/// always `>= 0`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrevAction {
    pub initial: Vec<u8>,
    pub r#final: Vec<u8>,
    pub action: i32,
}

impl Default for PrevAction {
    fn default() -> Self {
        Self { initial: Vec::new(), r#final: Vec::new(), action: -1 }
    }
}

struct NetworkState {
    port_to_index: IndexMap<u16, Index>,
    n: usize,
    communication_matrix: Vec<Vec<bool>>,
    prev_action_matrix: Vec<Vec<PrevAction>>,
    subsets_dict: HashMap<Index, Vec<Vec<Index>>>,
}

impl NetworkState {
    fn empty() -> Self {
        Self {
            port_to_index: IndexMap::new(),
            n: 0,
            communication_matrix: Vec::new(),
            prev_action_matrix: Vec::new(),
            subsets_dict: HashMap::new(),
        }
    }
}

/// Shared handle to the network model. Cloning shares the underlying
/// state via the inner `Arc`.
#[derive(Clone)]
pub struct NetworkManager {
    state: Arc<Mutex<NetworkState>>,
    /// Whether `set_message_action`/`check_previous_message` are permitted.
    auto_parse_identical: bool,
    /// Whether `set_subsets_dict`/`check_subsets` are permitted.
    auto_parse_subsets: bool,
}

impl NetworkManager {
    pub fn new(auto_parse_identical: bool, auto_parse_subsets: bool) -> Self {
        Self { state: Arc::new(Mutex::new(NetworkState::empty())), auto_parse_identical, auto_parse_subsets }
    }

    fn check_self_edge(i: Index, j: Index) -> Result<(), ControllerError> {
        if i == j {
            return Err(ControllerError::InvalidArgument(format!("self-edge ({i}, {i}) is invalid")));
        }
        Ok(())
    }

    fn check_index_range(n: usize, index: Index) -> Result<(), ControllerError> {
        if index >= n {
            return Err(ControllerError::InvalidArgument(format!("index {index} is out of range for {n} nodes")));
        }
        Ok(())
    }

    /// Resets all matrices and memoisation, sizing them to `nodes.len()`.
    /// Identity within the matrix is the node's peer port.
    pub fn update_network(&self, nodes: &[ValidatorNode]) {
        let n = nodes.len();
        let mut port_to_index = IndexMap::with_capacity(n);
        for (index, node) in nodes.iter().enumerate() {
            port_to_index.insert(node.identity_port(), index);
        }

        let communication_matrix =
            (0..n).map(|i| (0..n).map(|j| i != j).collect()).collect();
        let prev_action_matrix = (0..n).map(|_| (0..n).map(|_| PrevAction::default()).collect()).collect();
        let subsets_dict = (0..n).map(|i| (i, Vec::new())).collect();

        let mut state = self.state.lock();
        state.port_to_index = port_to_index;
        state.n = n;
        state.communication_matrix = communication_matrix;
        state.prev_action_matrix = prev_action_matrix;
        state.subsets_dict = subsets_dict;
    }

    /// Looks up the node index for a peer port, if the network has been
    /// initialized with a node owning it.
    pub fn index_of(&self, port: u16) -> Option<Index> {
        self.state.lock().port_to_index.get(&port).copied()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().n
    }

    /// Sets `M[i][j]=M[j][i]=true` iff `i` and `j` share a partition, all
    /// others false. Errors if `flatten(parts)` is not exactly a
    /// permutation of `0..n`.
    pub fn partition_network(&self, parts: &[Vec<Index>]) -> Result<(), ControllerError> {
        let mut state = self.state.lock();
        let n = state.n;

        let mut seen = vec![false; n];
        let mut total = 0;
        for part in parts {
            for &index in part {
                if index >= n {
                    return Err(ControllerError::InvalidArgument(format!("index {index} is out of range for {n} nodes")));
                }
                if seen[index] {
                    return Err(ControllerError::InvalidArgument(format!("index {index} appears in more than one partition")));
                }
                seen[index] = true;
                total += 1;
            }
        }
        if total != n {
            return Err(ControllerError::InvalidArgument(format!(
                "partition covers {total} of {n} nodes; every node must appear exactly once"
            )));
        }

        let mut matrix = vec![vec![false; n]; n];
        for part in parts {
            for &i in part {
                for &j in part {
                    if i != j {
                        matrix[i][j] = true;
                        matrix[j][i] = true;
                    }
                }
            }
        }
        state.communication_matrix = matrix;
        Ok(())
    }

    /// Equivalent to `partition_network([[0..n-1]])`.
    pub fn reset_communications(&self) -> Result<(), ControllerError> {
        let n = self.state.lock().n;
        self.partition_network(&[(0..n).collect()])
    }

    pub fn connect_nodes(&self, i: Index, j: Index) -> Result<(), ControllerError> {
        Self::check_self_edge(i, j)?;
        let mut state = self.state.lock();
        Self::check_index_range(state.n, i)?;
        Self::check_index_range(state.n, j)?;
        state.communication_matrix[i][j] = true;
        state.communication_matrix[j][i] = true;
        Ok(())
    }

    pub fn disconnect_nodes(&self, i: Index, j: Index) -> Result<(), ControllerError> {
        Self::check_self_edge(i, j)?;
        let mut state = self.state.lock();
        Self::check_index_range(state.n, i)?;
        Self::check_index_range(state.n, j)?;
        state.communication_matrix[i][j] = false;
        state.communication_matrix[j][i] = false;
        Ok(())
    }

    pub fn check_communication(&self, i: Index, j: Index) -> Result<bool, ControllerError> {
        Self::check_self_edge(i, j)?;
        let state = self.state.lock();
        Self::check_index_range(state.n, i)?;
        Self::check_index_range(state.n, j)?;
        Ok(state.communication_matrix[i][j])
    }

    /// Records the most recent original/mutated/action triple for
    /// `(i, j)`. Errors if identical-message memoisation is disabled.
    pub fn set_message_action(
        &self,
        i: Index,
        j: Index,
        original: Vec<u8>,
        mutated: Vec<u8>,
        action: u32,
    ) -> Result<(), ControllerError> {
        if !self.auto_parse_identical {
            return Err(ControllerError::InvalidArgument(
                "set_message_action requires auto_parse_identical to be enabled".into(),
            ));
        }
        Self::check_self_edge(i, j)?;
        let mut state = self.state.lock();
        Self::check_index_range(state.n, i)?;
        Self::check_index_range(state.n, j)?;
        state.prev_action_matrix[i][j] = PrevAction { initial: original, r#final: mutated, action: action as i32 };
        Ok(())
    }

    /// If `data` matches the last-recorded original message for `(i, j)`,
    /// returns the stored mutation and action. A miss returns the caller's
    /// own data with "forward immediately" (`action = 0`).
    pub fn check_previous_message(
        &self,
        i: Index,
        j: Index,
        data: &[u8],
    ) -> Result<(bool, (Vec<u8>, u32)), ControllerError> {
        if !self.auto_parse_identical {
            return Err(ControllerError::InvalidArgument(
                "check_previous_message requires auto_parse_identical to be enabled".into(),
            ));
        }
        Self::check_self_edge(i, j)?;
        let state = self.state.lock();
        Self::check_index_range(state.n, i)?;
        Self::check_index_range(state.n, j)?;
        let prev = &state.prev_action_matrix[i][j];
        if prev.initial == data {
            Ok((true, (prev.r#final.clone(), prev.action as u32)))
        } else {
            Ok((false, (data.to_vec(), 0)))
        }
    }

    /// Installs the subset-broadcast map wholesale. Every index is
    /// normalised to own an entry (`[]` if unlisted), flat lists become a
    /// single-element outer list, and no sender index may appear in its
    /// own subset. Errors if subset-broadcast memoisation is disabled.
    pub fn set_subsets_dict(&self, dict: HashMap<Index, Vec<Vec<Index>>>) -> Result<(), ControllerError> {
        if !self.auto_parse_subsets {
            return Err(ControllerError::InvalidArgument(
                "set_subsets_dict requires auto_parse_subsets to be enabled".into(),
            ));
        }
        let mut state = self.state.lock();
        let n = state.n;
        for (&sender, groups) in &dict {
            if sender >= n {
                return Err(ControllerError::InvalidArgument(format!("sender {sender} is out of range for {n} nodes")));
            }
            for group in groups {
                if group.contains(&sender) {
                    return Err(ControllerError::InvalidArgument(format!(
                        "sender {sender} cannot appear in its own subset"
                    )));
                }
                for &member in group {
                    Self::check_index_range(n, member)?;
                }
            }
        }

        let mut normalised: HashMap<Index, Vec<Vec<Index>>> = (0..n).map(|i| (i, Vec::new())).collect();
        normalised.extend(dict);
        state.subsets_dict = normalised;
        Ok(())
    }

    /// Installs/replaces a single sender's subset entry, accepting either a
    /// flat list (normalised to one outer group) or an already-nested
    /// list of groups.
    pub fn set_subsets_dict_entry(&self, sender: Index, groups: Vec<Vec<Index>>) -> Result<(), ControllerError> {
        if !self.auto_parse_subsets {
            return Err(ControllerError::InvalidArgument(
                "set_subsets_dict_entry requires auto_parse_subsets to be enabled".into(),
            ));
        }
        let mut state = self.state.lock();
        Self::check_index_range(state.n, sender)?;
        for group in &groups {
            if group.contains(&sender) {
                return Err(ControllerError::InvalidArgument(format!("sender {sender} cannot appear in its own subset")));
            }
            for &member in group {
                Self::check_index_range(state.n, member)?;
            }
        }
        state.subsets_dict.insert(sender, groups);
        Ok(())
    }

    /// For each subset group registered under `sender`, if `receiver` is a
    /// member and any member `k` of that same group has a matching
    /// recorded original message, returns that member's stored mutation
    /// and action. Nested groups are independent: a match in one group
    /// never leaks into another. A miss returns the caller's own data with
    /// "forward immediately".
    pub fn check_subsets(
        &self,
        sender: Index,
        receiver: Index,
        data: &[u8],
    ) -> Result<(bool, (Vec<u8>, u32)), ControllerError> {
        if !self.auto_parse_subsets {
            return Err(ControllerError::InvalidArgument(
                "check_subsets requires auto_parse_subsets to be enabled".into(),
            ));
        }
        let state = self.state.lock();
        Self::check_index_range(state.n, sender)?;
        Self::check_index_range(state.n, receiver)?;
        let Some(groups) = state.subsets_dict.get(&sender) else {
            return Ok((false, (data.to_vec(), 0)));
        };

        for group in groups {
            if !group.contains(&receiver) {
                continue;
            }
            for &k in group {
                let prev = &state.prev_action_matrix[sender][k];
                if prev.initial == data {
                    return Ok((true, (prev.r#final.clone(), prev.action as u32)));
                }
            }
        }
        Ok((false, (data.to_vec(), 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{SocketAddress, ValidatorKeyData};

    fn node(port: u16) -> ValidatorNode {
        ValidatorNode::new(
            SocketAddress::new("127.0.0.1", port),
            SocketAddress::new("127.0.0.1", port + 1000),
            SocketAddress::new("127.0.0.1", port + 2000),
            SocketAddress::new("127.0.0.1", port + 3000),
            ValidatorKeyData::new("status", "key", "pub", "validation"),
        )
    }

    fn three_nodes() -> NetworkManager {
        let manager = NetworkManager::new(true, true);
        manager.update_network(&[node(10), node(11), node(12)]);
        manager
    }

    #[test]
    fn update_network_builds_the_expected_matrix_and_ports() {
        let manager = three_nodes();
        assert_eq!(manager.index_of(10), Some(0));
        assert_eq!(manager.index_of(11), Some(1));
        assert_eq!(manager.index_of(12), Some(2));
        assert!(manager.check_communication(0, 1).unwrap());
        assert!(manager.check_communication(1, 2).unwrap());
        assert!(manager.check_communication(0, 0).is_err());
    }

    #[test]
    fn partition_network_scenario_from_spec() {
        let manager = three_nodes();
        manager.partition_network(&[vec![0], vec![1, 2]]).unwrap();
        assert!(!manager.check_communication(0, 1).unwrap());
        assert!(!manager.check_communication(0, 2).unwrap());
        assert!(manager.check_communication(1, 2).unwrap());
    }

    #[test]
    fn partition_coverage_violation_is_rejected() {
        let manager = three_nodes();
        assert!(manager.partition_network(&[vec![0], vec![1]]).is_err());
        assert!(manager.partition_network(&[vec![0, 0], vec![1, 2]]).is_err());
    }

    #[test]
    fn self_edge_is_always_rejected() {
        let manager = three_nodes();
        assert!(manager.connect_nodes(1, 1).is_err());
        assert!(manager.disconnect_nodes(1, 1).is_err());
        assert!(manager.check_communication(1, 1).is_err());
    }

    #[test]
    fn symmetry_holds_after_connect_and_disconnect() {
        let manager = three_nodes();
        manager.disconnect_nodes(0, 1).unwrap();
        assert!(!manager.check_communication(0, 1).unwrap());
        assert!(!manager.check_communication(1, 0).unwrap());
        manager.connect_nodes(0, 1).unwrap();
        assert!(manager.check_communication(0, 1).unwrap());
        assert!(manager.check_communication(1, 0).unwrap());
    }

    #[test]
    fn memoisation_idempotence() {
        let manager = three_nodes();
        manager.set_message_action(0, 1, b"test".to_vec(), b"mut".to_vec(), 42).unwrap();
        assert_eq!(manager.check_previous_message(0, 1, b"test").unwrap(), (true, (b"mut".to_vec(), 42)));
        assert_eq!(manager.check_previous_message(0, 2, b"test").unwrap(), (false, (b"test".to_vec(), 0)));
        // Still holds after an unrelated read.
        assert_eq!(manager.check_previous_message(0, 1, b"test").unwrap(), (true, (b"mut".to_vec(), 42)));
    }

    #[test]
    fn subsets_flat_group() {
        let manager = three_nodes();
        let mut dict = HashMap::new();
        dict.insert(2, vec![vec![0, 1]]);
        manager.set_subsets_dict(dict).unwrap();
        manager.set_message_action(2, 0, b"X".to_vec(), b"Y".to_vec(), 7).unwrap();
        assert_eq!(manager.check_subsets(2, 1, b"X").unwrap(), (true, (b"Y".to_vec(), 7)));
        assert_eq!(manager.check_subsets(2, 1, b"Z").unwrap(), (false, (b"Z".to_vec(), 0)));
    }

    #[test]
    fn subsets_nested_groups_are_independent() {
        let manager = NetworkManager::new(true, true);
        manager.update_network(&[node(10), node(11), node(12), node(13)]);

        let mut dict = HashMap::new();
        dict.insert(2, vec![vec![0], vec![1, 3]]);
        manager.set_subsets_dict(dict).unwrap();

        manager.set_message_action(2, 0, b"X".to_vec(), b"from-0".to_vec(), 1).unwrap();
        manager.set_message_action(2, 1, b"X".to_vec(), b"from-1".to_vec(), 2).unwrap();

        // Node 3 shares a group with node 1, not node 0: the match must
        // come from the (2, 1) entry.
        assert_eq!(manager.check_subsets(2, 3, b"X").unwrap(), (true, (b"from-1".to_vec(), 2)));
    }

    #[test]
    fn subsets_never_contain_the_sender() {
        let manager = three_nodes();
        let mut dict = HashMap::new();
        dict.insert(2, vec![vec![0, 2]]);
        assert!(manager.set_subsets_dict(dict).is_err());
    }

    #[test]
    fn out_of_range_indices_are_rejected_not_panics() {
        let manager = three_nodes();
        assert!(manager.connect_nodes(0, 9).is_err());
        assert!(manager.disconnect_nodes(9, 0).is_err());
        assert!(manager.check_communication(0, 9).is_err());
        assert!(manager.set_message_action(0, 9, b"a".to_vec(), b"b".to_vec(), 1).is_err());
        assert!(manager.check_previous_message(9, 0, b"a").is_err());

        let mut dict = HashMap::new();
        dict.insert(2, vec![vec![0, 9]]);
        assert!(manager.set_subsets_dict(dict).is_err());
        assert!(manager.set_subsets_dict_entry(2, vec![vec![0, 9]]).is_err());
        assert!(manager.check_subsets(9, 0, b"a").is_err());
    }

    #[test]
    fn disabled_features_reject_their_operations() {
        let manager = NetworkManager::new(false, false);
        manager.update_network(&[node(10), node(11), node(12)]);
        assert!(manager.set_message_action(0, 1, b"a".to_vec(), b"b".to_vec(), 1).is_err());
        assert!(manager.check_previous_message(0, 1, b"a").is_err());
        assert!(manager.set_subsets_dict(HashMap::new()).is_err());
    }
}
