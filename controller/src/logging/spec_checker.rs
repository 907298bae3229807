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

use super::result_log::{self, LedgerResult};
use super::csv_to_io;

use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// One row of the run-wide spec-check log: `(iteration, reached_goal,
/// same_hashes, same_indexes)`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SpecCheckRow {
    pub iteration: u32,
    pub reached_goal: bool,
    pub same_hashes: bool,
    pub same_indexes: bool,
}

/// Pure evaluation of a completed iteration's result log against the
/// consensus invariants: did every node reach the ledger goal, and did they
/// agree on hashes/indexes for the final observed ledger.
pub struct SpecChecker;

impl SpecChecker {
    /// `goal_ledger_count < 0` means the iteration was time-based, not
    /// ledger-based; there is no goal to fall short of, so `reached_goal`
    /// is vacuously true.
    pub fn check_iteration(result_log_path: &Path) -> io::Result<SpecCheckRow> {
        let rows = result_log::read_all(result_log_path)?;
        let Some(last) = rows.last() else {
            return Ok(SpecCheckRow { iteration: 0, reached_goal: false, same_hashes: false, same_indexes: false });
        };

        let reached_goal = last.goal_ledger_count < 0 || i64::from(last.ledger_count) >= last.goal_ledger_count;
        let same_hashes = all_equal(&last.hashes());
        let same_indexes = all_equal(&last.indexes());

        Ok(SpecCheckRow { iteration: 0, reached_goal, same_hashes, same_indexes })
    }
}

fn all_equal(values: &[&str]) -> bool {
    match values.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|value| value == first),
    }
}

/// Accumulates one [`SpecCheckRow`] per completed iteration into
/// `<dir>/spec_check_log.csv`, open for the whole run rather than
/// per-iteration.
pub struct SpecCheckLogger {
    path: PathBuf,
    writer: Writer<File>,
}

impl SpecCheckLogger {
    pub fn create(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("spec_check_log.csv");
        let file = File::create(&path)?;
        Ok(Self { path, writer: Writer::from_writer(file) })
    }

    pub fn append(&mut self, iteration: u32, mut row: SpecCheckRow) -> io::Result<()> {
        row.iteration = iteration;
        self.writer.serialize(row).map_err(csv_to_io)?;
        self.writer.flush()
    }

    /// Re-reads every row appended so far; used by the termination-time
    /// summary rather than holding the rows in memory across the run.
    pub fn aggregate(&self) -> io::Result<Vec<SpecCheckRow>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader.deserialize().collect::<Result<Vec<SpecCheckRow>, _>>().map_err(csv_to_io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::result_log::{LedgerResult, ResultLogger};
    use tempfile::tempdir;

    #[test]
    fn ledger_based_iteration_reaching_goal_with_agreement() {
        let dir = tempdir().unwrap();
        let mut logger = ResultLogger::create(dir.path(), 1).unwrap();
        let hash = vec![1, 2, 3];
        logger
            .log(&LedgerResult::new(5, 5, 1.234567, &[100, 200], &[hash.clone(), hash.clone()], &[5, 5]))
            .unwrap();

        let row = SpecChecker::check_iteration(logger.path()).unwrap();
        assert!(row.reached_goal);
        assert!(row.same_hashes);
        assert!(row.same_indexes);
    }

    #[test]
    fn disagreement_on_final_ledger_is_detected() {
        let dir = tempdir().unwrap();
        let mut logger = ResultLogger::create(dir.path(), 1).unwrap();
        logger
            .log(&LedgerResult::new(5, 5, 1.0, &[100], &[vec![1], vec![2]], &[5, 4]))
            .unwrap();

        let row = SpecChecker::check_iteration(logger.path()).unwrap();
        assert!(row.reached_goal);
        assert!(!row.same_hashes);
        assert!(!row.same_indexes);
    }

    #[test]
    fn time_based_iteration_has_no_goal_to_miss() {
        let dir = tempdir().unwrap();
        let mut logger = ResultLogger::create(dir.path(), 1).unwrap();
        logger.log(&LedgerResult::new(2, -1, 9.0, &[], &[vec![9]], &[2])).unwrap();

        let row = SpecChecker::check_iteration(logger.path()).unwrap();
        assert!(row.reached_goal);
    }
}
