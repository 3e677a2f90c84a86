// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Connection registry: one multiplexed transport session per host.
//!
//! The registry owns the host -> session map and the process-scoped
//! directory holding control sockets. Establish/close for the same host
//! are serialized through a per-host async mutex; different hosts proceed
//! independently, and the outer map lock is never held across a blocking
//! external call.

mod session;

pub use session::{Liveness, TransportSession};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ConnectError;
use crate::node::Node;
use crate::transport::SshLauncher;
use crate::ui::HostPrefix;

/// A Ready session reused within this window is returned as-is; beyond it
/// the master may have expired and is re-established. Matches the
/// transport's ControlPersist.
const DEFAULT_FRESHNESS: Duration = Duration::from_secs(60);

/// Extra slack on top of the transport's own connect timeout before the
/// registry gives up on a master that never reports back.
const ESTABLISH_GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct HostSlot {
    session: Option<Arc<TransportSession>>,
    last_used: Option<Instant>,
}

pub struct ConnectionRegistry {
    launcher: SshLauncher,
    control_dir: PathBuf,
    freshness: Duration,
    slots: StdMutex<HashMap<String, Arc<Mutex<HostSlot>>>>,
    /// Hosts in first-connect order, for stable snapshots.
    order: StdMutex<Vec<String>>,
    closed: AtomicBool,
}

impl ConnectionRegistry {
    /// Create a registry with a fresh process-scoped control directory.
    pub fn new(launcher: SshLauncher) -> anyhow::Result<Self> {
        let control_dir = std::env::temp_dir().join(format!(
            "mush-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&control_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&control_dir, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(Self {
            launcher,
            control_dir,
            freshness: DEFAULT_FRESHNESS,
            slots: StdMutex::new(HashMap::new()),
            order: StdMutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn control_dir(&self) -> &std::path::Path {
        &self.control_dir
    }

    pub fn launcher(&self) -> &SshLauncher {
        &self.launcher
    }

    fn slot(&self, host: &str) -> Arc<Mutex<HostSlot>> {
        let mut slots = self.slots.lock().expect("slot map lock poisoned");
        Arc::clone(slots.entry(host.to_string()).or_default())
    }

    fn socket_path(&self, node: &Node) -> PathBuf {
        let name = node.host.replace([':', '/', '['], "_").replace(']', "_");
        match node.port {
            Some(port) => self.control_dir.join(format!("{name}_{port}.sock")),
            None => self.control_dir.join(format!("{name}.sock")),
        }
    }

    /// Establish (or reuse) the session for `node`.
    ///
    /// Idempotent per host: a Ready session used within the freshness
    /// window is returned unchanged. Establishing runs the external master
    /// under a timeout; the per-host slot lock is held for the whole call
    /// so concurrent establish/close for the same host are mutually
    /// exclusive.
    pub async fn establish(
        &self,
        node: &Node,
        prefix: HostPrefix,
    ) -> Result<Arc<TransportSession>, ConnectError> {
        let slot = self.slot(&node.host);
        let mut guard = slot.lock().await;

        if let Some(existing) = &guard.session {
            let fresh = guard
                .last_used
                .is_some_and(|used| used.elapsed() < self.freshness);
            if existing.is_ready() && fresh {
                debug!(host = %node.host, "Reusing fresh transport session");
                let existing = Arc::clone(existing);
                guard.last_used = Some(Instant::now());
                return Ok(existing);
            }
            // Stale or dead master: tear it down before reconnecting.
            self.shutdown_session(existing).await;
            guard.session = None;
        }

        let control_path = self.socket_path(node);
        let session = self.open_master(node, prefix, control_path).await?;
        let session = Arc::new(session);

        guard.session = Some(Arc::clone(&session));
        guard.last_used = Some(Instant::now());

        let mut order = self.order.lock().expect("order lock poisoned");
        if !order.iter().any(|h| h == &node.host) {
            order.push(node.host.clone());
        }

        Ok(session)
    }

    async fn open_master(
        &self,
        node: &Node,
        prefix: HostPrefix,
        control_path: PathBuf,
    ) -> Result<TransportSession, ConnectError> {
        debug!(host = %node.host, path = %control_path.display(), "Opening control master");

        let mut cmd = self.launcher.master(node, &control_path);
        let deadline = self.launcher.connect_timeout() + ESTABLISH_GRACE;

        // On timeout the dropped future kills the child (kill_on_drop).
        let output = match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ConnectError::Spawn {
                    host: node.host.clone(),
                    source,
                });
            }
            Err(_) => {
                let _ = std::fs::remove_file(&control_path);
                return Err(ConnectError::Timeout {
                    host: node.host.clone(),
                    timeout: deadline,
                });
            }
        };

        if !output.status.success() {
            let _ = std::fs::remove_file(&control_path);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConnectError::classify(&node.host, &stderr));
        }

        Ok(TransportSession::new(node.clone(), prefix, control_path))
    }

    /// Snapshot the session for `host` if it is Ready and was used inside
    /// the freshness window. A session idle past the window is never
    /// handed out; its master may already have hit ControlPersist and
    /// exited, so the host needs a re-`establish` first.
    pub async fn get(&self, host: &str) -> Option<Arc<TransportSession>> {
        let slot = {
            let slots = self.slots.lock().expect("slot map lock poisoned");
            slots.get(host).cloned()
        }?;
        let guard = slot.lock().await;
        let fresh = guard
            .last_used
            .is_some_and(|used| used.elapsed() < self.freshness);
        guard.session.as_ref().filter(|s| fresh && s.is_ready()).cloned()
    }

    /// Currently connected hosts in first-connect order.
    pub async fn connected_hosts(&self) -> Vec<String> {
        let order = {
            let order = self.order.lock().expect("order lock poisoned");
            order.clone()
        };
        let mut connected = Vec::with_capacity(order.len());
        for host in order {
            if self.get(&host).await.is_some() {
                connected.push(host);
            }
        }
        connected
    }

    /// Ready sessions in first-connect order.
    pub async fn sessions(&self) -> Vec<Arc<TransportSession>> {
        let order = {
            let order = self.order.lock().expect("order lock poisoned");
            order.clone()
        };
        let mut sessions = Vec::with_capacity(order.len());
        for host in order {
            if let Some(session) = self.get(&host).await {
                sessions.push(session);
            }
        }
        sessions
    }

    /// Close the session for `host` if one exists. Close failures are
    /// logged, never propagated.
    pub async fn close(&self, host: &str) {
        let slot = {
            let slots = self.slots.lock().expect("slot map lock poisoned");
            slots.get(host).cloned()
        };
        let Some(slot) = slot else { return };
        let mut guard = slot.lock().await;
        if let Some(session) = guard.session.take() {
            self.shutdown_session(&session).await;
        }
        guard.last_used = None;
    }

    async fn shutdown_session(&self, session: &Arc<TransportSession>) {
        session.set_liveness(Liveness::Closed);
        let mut cmd = self
            .launcher
            .control_exit(&session.node, session.control_path());
        match tokio::time::timeout(Duration::from_secs(5), cmd.status()).await {
            Ok(Ok(status)) if status.success() => {
                debug!(host = %session.node.host, "Control master closed");
            }
            Ok(Ok(status)) => {
                warn!(host = %session.node.host, %status, "Control master exit returned an error");
            }
            Ok(Err(e)) => {
                warn!(host = %session.node.host, error = %e, "Failed to run control master exit");
            }
            Err(_) => {
                warn!(host = %session.node.host, "Timed out closing control master");
            }
        }
        if let Err(e) = std::fs::remove_file(session.control_path()) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(host = %session.node.host, error = %e, "Failed to remove control socket");
            }
        }
    }

    /// Close every session and remove the control directory. Runs the
    /// per-host closes concurrently; guaranteed best-effort on every exit
    /// path via the `Drop` fallback.
    pub async fn close_all(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let slots: Vec<Arc<Mutex<HostSlot>>> = {
            let map = self.slots.lock().expect("slot map lock poisoned");
            map.values().cloned().collect()
        };

        let mut closes: FuturesUnordered<_> = slots
            .into_iter()
            .map(|slot| async move {
                let mut guard = slot.lock().await;
                if let Some(session) = guard.session.take() {
                    self.shutdown_session(&session).await;
                }
                guard.last_used = None;
            })
            .collect();
        while closes.next().await.is_some() {}

        if let Err(e) = std::fs::remove_dir_all(&self.control_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "Failed to remove control directory");
            }
        }
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Synchronous last-resort cleanup for panic/early-return paths.
        if let Ok(map) = self.slots.lock() {
            for slot in map.values() {
                if let Ok(mut guard) = slot.try_lock() {
                    if let Some(session) = guard.session.take() {
                        let _ = self
                            .launcher
                            .control_exit_blocking(&session.node, session.control_path())
                            .status();
                    }
                }
            }
        }
        let _ = std::fs::remove_dir_all(&self.control_dir);
    }
}

/// Outcome of a fan-out connection attempt across a host set.
pub struct EstablishReport {
    pub sessions: Vec<Arc<TransportSession>>,
    pub failures: Vec<ConnectError>,
}

/// Establish sessions to all `nodes` concurrently.
///
/// `on_progress(done, total)` fires after each attempt settles, in
/// completion order. Per-host failures are collected, never fatal here;
/// callers decide what an empty reachable set means. Cancelling `cancel`
/// abandons every in-flight attempt promptly (killing the spawned
/// connect processes) so a registry-wide close never waits on them;
/// abandoned attempts count as neither success nor failure.
pub async fn establish_all(
    registry: &Arc<ConnectionRegistry>,
    nodes: &[Node],
    prefixes: &[HostPrefix],
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(usize, usize),
) -> EstablishReport {
    let total = nodes.len();
    let mut tasks: FuturesUnordered<_> = nodes
        .iter()
        .zip(prefixes.iter())
        .map(|(node, prefix)| {
            let registry = Arc::clone(registry);
            let node = node.clone();
            let prefix = prefix.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = registry.establish(&node, prefix) => Some(result),
                }
            })
        })
        .collect();

    let mut sessions = Vec::new();
    let mut failures = Vec::new();
    let mut done = 0usize;

    while let Some(joined) = tasks.next().await {
        done += 1;
        match joined {
            Ok(Some(Ok(session))) => sessions.push(session),
            Ok(Some(Err(e))) => failures.push(e),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Connection task panicked");
            }
        }
        on_progress(done, total);
    }

    // Hand sessions back in the host-set order, not completion order.
    sessions.sort_by_key(|s| {
        nodes
            .iter()
            .position(|n| n.host == s.node.host)
            .unwrap_or(usize::MAX)
    });

    EstablishReport { sessions, failures }
}
