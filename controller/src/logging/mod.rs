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

//! Action log, per-ledger result log, and spec-check aggregator.
//!
//! Each logger owns a single [`csv::Writer`] bound to a file opened once per
//! iteration (or, for the spec-check log, once per run) and truncated on
//! open, a scoped handle tied to iteration lifetime rather than a
//! process-wide `atexit` cleanup.

pub mod action_log;
pub mod result_log;
pub mod spec_checker;

pub use action_log::ActionLogger;
pub use result_log::{LedgerResult, ResultLogger};
pub use spec_checker::{SpecCheckLogger, SpecChecker};

use std::io;

/// `csv::Error` carries its own rich context; callers only need a plain
/// `io::Error` once it crosses into the rest of the crate's error handling.
fn csv_to_io(error: csv::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}
