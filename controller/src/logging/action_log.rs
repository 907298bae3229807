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

use super::csv_to_io;
use crate::validator::ValidatorNode;

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize)]
struct ActionRow<'a> {
    timestamp_ms: u128,
    action: u32,
    send_amount: usize,
    src: usize,
    dst: usize,
    message_type: u16,
    original_hex: &'a str,
    mutated_hex: &'a str,
}

#[derive(Serialize)]
struct NodeInfoRow<'a> {
    index: usize,
    peer: String,
    rpc: String,
    key_status: &'a str,
}

/// One row per dispatch decision: `{timestamp_ms, action, send_amount, src,
/// dst, message_type, original_hex, mutated_hex}`.
pub struct ActionLogger {
    writer: Writer<File>,
}

impl ActionLogger {
    /// Opens (truncating) `<dir>/action_log.csv` for a fresh iteration, and
    /// writes the accompanying `<dir>/node_info.csv` describing the
    /// currently-installed validator set.
    pub fn create(dir: &Path, nodes: &[ValidatorNode]) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        write_node_info(dir, nodes)?;
        let file = File::create(dir.join("action_log.csv"))?;
        Ok(Self { writer: Writer::from_writer(file) })
    }

    /// Appends a decision row. `send_amount` is the original payload's byte
    /// length, not the mutated one -- it records what the strategy was
    /// asked to act on.
    pub fn log(
        &mut self,
        src: usize,
        dst: usize,
        message_type: u16,
        original: &[u8],
        mutated: &[u8],
        action: u32,
    ) -> io::Result<()> {
        let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let original_hex = hex::encode(original);
        let mutated_hex = hex::encode(mutated);
        self.writer
            .serialize(ActionRow {
                timestamp_ms,
                action,
                send_amount: original.len(),
                src,
                dst,
                message_type,
                original_hex: &original_hex,
                mutated_hex: &mutated_hex,
            })
            .map_err(csv_to_io)?;
        self.writer.flush()
    }
}

fn write_node_info(dir: &Path, nodes: &[ValidatorNode]) -> io::Result<()> {
    let file = File::create(dir.join("node_info.csv"))?;
    let mut writer = Writer::from_writer(file);
    for (index, node) in nodes.iter().enumerate() {
        writer
            .serialize(NodeInfoRow {
                index,
                peer: node.peer.to_string(),
                rpc: node.rpc.to_string(),
                key_status: &node.key_data.status,
            })
            .map_err(csv_to_io)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{SocketAddress, ValidatorKeyData};
    use tempfile::tempdir;

    fn node(port: u16) -> ValidatorNode {
        ValidatorNode::new(
            SocketAddress::new("127.0.0.1", port),
            SocketAddress::new("127.0.0.1", port + 1000),
            SocketAddress::new("127.0.0.1", port + 2000),
            SocketAddress::new("127.0.0.1", port + 3000),
            ValidatorKeyData::new("full", "key", "pub", "validation"),
        )
    }

    #[test]
    fn create_writes_node_info_and_an_empty_action_log() {
        let dir = tempdir().unwrap();
        let nodes = [node(10), node(11)];
        let _logger = ActionLogger::create(dir.path(), &nodes).unwrap();

        let node_info = std::fs::read_to_string(dir.path().join("node_info.csv")).unwrap();
        assert_eq!(node_info.lines().count(), 3); // header + two nodes
        assert!(node_info.contains("127.0.0.1:10"));
        assert!(node_info.contains("full"));
    }

    #[test]
    fn log_appends_hex_encoded_rows() {
        let dir = tempdir().unwrap();
        let mut logger = ActionLogger::create(dir.path(), &[node(10), node(11)]).unwrap();
        logger.log(0, 1, 34, b"\x01\x02", b"\x03", 5).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("action_log.csv")).unwrap();
        let row = contents.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[1], "5"); // action
        assert_eq!(fields[2], "2"); // send_amount (original length)
        assert_eq!(fields[6], "0102"); // original_hex
        assert_eq!(fields[7], "03"); // mutated_hex
    }
}
