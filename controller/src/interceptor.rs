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

//! Spawns, supervises, and terminates the external interceptor process,
//! and cleans up validator containers on shutdown.
//!
//! Graceful shutdown is SIGTERM, a five-second grace period, then SIGKILL,
//! aimed at the interceptor child process.

use crate::error::ControllerError;

use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const CONTAINER_NAME_FILTER: &str = "validator_";

#[cfg(unix)]
fn interceptor_binary_name() -> &'static str {
    "rocket-interceptor"
}

#[cfg(not(unix))]
fn interceptor_binary_name() -> &'static str {
    "rocket-interceptor.exe"
}

struct Running {
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

struct Inner {
    running: Option<Running>,
}

/// Shared handle over the (at most one) live interceptor child process.
#[derive(Clone)]
pub struct InterceptorManager {
    binary_path: PathBuf,
    container_runtime: String,
    inner: Arc<Mutex<Inner>>,
}

impl InterceptorManager {
    /// `container_runtime` is the CLI binary used for `cleanup_containers`
    /// (`"docker"` in practice; kept configurable so tests can stub it out).
    pub fn new(container_runtime: impl Into<String>) -> Self {
        Self::with_binary_path(PathBuf::from("./rocket_interceptor").join(interceptor_binary_name()), container_runtime)
    }

    /// As [`Self::new`], but spawning an explicit binary path instead of
    /// the subprocess contract's default. Exists for tests that stand in a
    /// harmless executable (e.g. `/bin/sleep`) for the real interceptor.
    pub fn with_binary_path(binary_path: impl Into<PathBuf>, container_runtime: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            container_runtime: container_runtime.into(),
            inner: Arc::new(Mutex::new(Inner { running: None })),
        }
    }

    /// Spawns the interceptor binary and attaches background readers that
    /// drain stdout/stderr, avoiding a pipe-full deadlock.
    ///
    /// A missing binary is fatal per the subprocess contract: this exits
    /// the whole process with code 2 rather than returning an error.
    pub async fn start_new(&self) -> Result<(), ControllerError> {
        let mut child = match Command::new(&self.binary_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                error!(path = %self.binary_path.display(), "interceptor binary not found");
                std::process::exit(2);
            }
            Err(error) => {
                return Err(ControllerError::InterceptorMissing(format!(
                    "failed to spawn {}: {error}",
                    self.binary_path.display()
                )));
            }
        };

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain_lines(stdout, "stdout")));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain_lines(stderr, "stderr")));
        }

        let mut inner = self.inner.lock();
        inner.running = Some(Running { child, readers });
        Ok(())
    }

    /// Stops the current interceptor, then starts a fresh one.
    pub async fn restart(&self) -> Result<(), ControllerError> {
        self.stop().await?;
        self.start_new().await
    }

    /// SIGTERM, a five-second grace period, then SIGKILL. A no-op if no
    /// interceptor is currently running.
    pub async fn stop(&self) -> Result<(), ControllerError> {
        let running = self.inner.lock().running.take();
        let Some(Running { mut child, readers }) = running else {
            return Ok(());
        };

        if let Some(pid) = child.id() {
            send_sigterm(pid);
        }

        let exited_gracefully = tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_ok();
        if !exited_gracefully {
            warn!("interceptor did not exit within the grace period, sending SIGKILL");
            child.kill().await.map_err(|error| ControllerError::InterceptorMissing(error.to_string()))?;
            let _ = child.wait().await;
        }

        for reader in readers {
            reader.abort();
        }
        Ok(())
    }

    /// Stops every container whose name contains `"validator_"`.
    ///
    /// Implemented by shelling out to the configured container runtime CLI
    /// rather than a Docker SDK crate: nothing in the corpus's dependency
    /// stacks pulls one in, and `docker ps`/`docker stop` is the
    /// lowest-ceremony way to express "stop these containers" without
    /// inventing a dependency.
    pub async fn cleanup_containers(&self) -> Result<(), ControllerError> {
        let list = Command::new(&self.container_runtime)
            .args(["ps", "--format", "{{.Names}}"])
            .output()
            .await
            .map_err(|error| ControllerError::InvalidArgument(format!("failed to list containers: {error}")))?;

        let names = String::from_utf8_lossy(&list.stdout);
        let targets: Vec<&str> = names.lines().filter(|name| name.contains(CONTAINER_NAME_FILTER)).collect();
        if targets.is_empty() {
            return Ok(());
        }

        info!(count = targets.len(), "stopping validator containers");
        let status = Command::new(&self.container_runtime)
            .arg("stop")
            .args(&targets)
            .status()
            .await
            .map_err(|error| ControllerError::InvalidArgument(format!("failed to stop containers: {error}")))?;

        if !status.success() {
            warn!(?status, "container runtime reported a non-zero exit stopping validator containers");
        }
        Ok(())
    }
}

async fn drain_lines(stream: impl tokio::io::AsyncRead + Unpin, label: &'static str) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => info!(target: "interceptor", %label, "{line}"),
            Ok(None) => break,
            Err(error) => {
                warn!(%label, %error, "error reading interceptor output");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    // SAFETY: `pid` is a live child process id we just obtained from
    // `Child::id`; sending it a signal has no memory-safety implications.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {
    // No POSIX signals on this platform; `stop` falls straight through to
    // the grace-period timeout and SIGKILL-equivalent `Child::kill`.
}
