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

use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// One row of a per-iteration result log: the consensus state observed the
/// moment every validator (or the timeout) ended the iteration.
///
/// List-valued fields (`close_times`, `ledger_hashes`, `ledger_indexes`) are
/// stored as `;`-joined strings -- CSV cells are scalar, and this is the
/// simplest encoding that round-trips through [`SpecChecker`] without a
/// nested format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerResult {
    pub ledger_count: u32,
    pub goal_ledger_count: i64,
    pub time_to_consensus_seconds: f64,
    pub close_times: String,
    pub ledger_hashes: String,
    pub ledger_indexes: String,
}

impl LedgerResult {
    pub fn new(
        ledger_count: u32,
        goal_ledger_count: i64,
        time_to_consensus_seconds: f64,
        close_times: &[u64],
        ledger_hashes: &[Vec<u8>],
        ledger_indexes: &[u32],
    ) -> Self {
        Self {
            ledger_count,
            goal_ledger_count,
            // Round to 6 decimal places here so every consumer (this log
            // and the spec checker) sees the same value.
            time_to_consensus_seconds: (time_to_consensus_seconds * 1_000_000.0).round() / 1_000_000.0,
            close_times: join(close_times.iter().map(|t| t.to_string())),
            ledger_hashes: join(ledger_hashes.iter().map(hex::encode)),
            ledger_indexes: join(ledger_indexes.iter().map(|i| i.to_string())),
        }
    }

    pub fn hashes(&self) -> Vec<&str> {
        split(&self.ledger_hashes)
    }

    pub fn indexes(&self) -> Vec<&str> {
        split(&self.ledger_indexes)
    }
}

fn join(values: impl Iterator<Item = String>) -> String {
    values.collect::<Vec<_>>().join(";")
}

fn split(value: &str) -> Vec<&str> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(';').collect()
    }
}

/// Per-iteration per-ledger result log.
pub struct ResultLogger {
    path: PathBuf,
    writer: Writer<File>,
}

impl ResultLogger {
    /// Opens (truncating) `<dir>/result_log_iter<iteration>.csv`.
    pub fn create(dir: &Path, iteration: u32) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("result_log_iter{iteration}.csv"));
        let file = File::create(&path)?;
        Ok(Self { path, writer: Writer::from_writer(file) })
    }

    pub fn log(&mut self, row: &LedgerResult) -> io::Result<()> {
        self.writer.serialize(row).map_err(csv_to_io)?;
        self.writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads back every row a [`ResultLogger`] wrote, for [`super::SpecChecker`].
pub fn read_all(path: &Path) -> io::Result<Vec<LedgerResult>> {
    let mut reader = Reader::from_path(path)?;
    reader.deserialize().collect::<Result<Vec<LedgerResult>, _>>().map_err(csv_to_io)
}
