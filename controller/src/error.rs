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

//! Typed error taxonomy for the controller core.
//!
//! Call sites that only need to propagate one of these upward do so with
//! `anyhow`'s `?`/`.context(..)`; this module defines the taxonomy itself
//! with `thiserror`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed frame: {0}")]
    Codec(String),

    #[error("strategy raised an error while handling a packet: {0}")]
    StrategyFault(String),

    #[error("the interceptor binary could not be found: {0}")]
    InterceptorMissing(String),

    #[error("the interceptor did not stop within its grace period")]
    InterceptorTimeout,

    #[error("no progress within the iteration window")]
    IterationTimeout,
}
