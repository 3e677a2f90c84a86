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

//! Fan-out command dispatch across hosts.
//!
//! One independent task per host drives the external ssh process, relays
//! both of its output streams into the shared aggregator queue, and
//! resolves to exactly one terminal [`ExecutionResult`]. Tasks share
//! nothing mutable; coordination is the bounded record channel plus one
//! [`CancellationToken`] per dispatch. A failing host never cancels its
//! siblings; cancelling the scope stops every host promptly and reports
//! `Interrupted`, not failure.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::aggregator::{relay_lines, OutputRecord, StreamKind, AGGREGATOR_CAPACITY};
use super::result_types::{CommandOutcome, ExecutionResult};
use crate::node::Node;
use crate::registry::TransportSession;
use crate::transport::SshLauncher;
use crate::ui::HostPrefix;

/// A running dispatch: the merged record stream plus the fan-in handle
/// resolving to one terminal result per host.
pub struct Dispatch {
    pub records: mpsc::Receiver<OutputRecord>,
    results: JoinHandle<Vec<ExecutionResult>>,
}

impl Dispatch {
    /// Await the terminal results. All producer tasks are joined before
    /// this resolves; call after draining `records`.
    pub async fn finish(self) -> Vec<ExecutionResult> {
        match self.results.await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Dispatch collector panicked");
                Vec::new()
            }
        }
    }
}

/// One host's slice of a dispatch.
struct HostJob {
    node: Node,
    prefix: HostPrefix,
    control_path: Option<PathBuf>,
}

pub struct ParallelExecutor {
    launcher: SshLauncher,
    max_parallel: usize,
}

impl ParallelExecutor {
    pub fn new(launcher: SshLauncher, max_parallel: usize) -> Self {
        Self {
            launcher,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn launcher(&self) -> &SshLauncher {
        &self.launcher
    }

    /// One-shot mode: run `command` on every target over a fresh direct
    /// connection per host.
    pub fn run_on_all(
        &self,
        targets: Vec<(Node, HostPrefix)>,
        command: &str,
        cancel: CancellationToken,
    ) -> Dispatch {
        let jobs = targets
            .into_iter()
            .map(|(node, prefix)| HostJob {
                node,
                prefix,
                control_path: None,
            })
            .collect();
        self.spawn_dispatch(jobs, command, cancel)
    }

    /// Interactive mode: run `command` through each host's established
    /// control socket, reusing the multiplexed connection.
    pub fn run_persistent(
        &self,
        sessions: &[Arc<TransportSession>],
        command: &str,
        cancel: CancellationToken,
    ) -> Dispatch {
        let jobs = sessions
            .iter()
            .map(|session| HostJob {
                node: session.node.clone(),
                prefix: session.prefix.clone(),
                control_path: Some(session.control_path().to_path_buf()),
            })
            .collect();
        self.spawn_dispatch(jobs, command, cancel)
    }

    fn spawn_dispatch(
        &self,
        jobs: Vec<HostJob>,
        command: &str,
        cancel: CancellationToken,
    ) -> Dispatch {
        let (tx, rx) = mpsc::channel(AGGREGATOR_CAPACITY);
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let launcher = self.launcher.clone();
                let command = command.to_string();
                let tx = tx.clone();
                let cancel = cancel.clone();
                let semaphore = Arc::clone(&semaphore);
                let fallback = (job.node.clone(), job.prefix.clone());
                let task = tokio::spawn(async move {
                    execute_host(launcher, job, &command, tx, cancel, semaphore).await
                });
                (task, fallback)
            })
            .collect();
        drop(tx); // the channel closes once every host task is done

        let results = tokio::spawn(async move {
            let (tasks, fallbacks): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
            join_all(tasks)
                .await
                .into_iter()
                .zip(fallbacks)
                .map(|(joined, (node, prefix))| match joined {
                    Ok(result) => result,
                    Err(e) => {
                        error!(host = %node.host, error = %e, "Host task panicked");
                        ExecutionResult {
                            node,
                            prefix,
                            outcome: CommandOutcome::Failed(format!("task panicked: {e}")),
                        }
                    }
                })
                .collect()
        });

        Dispatch {
            records: rx,
            results,
        }
    }
}

/// Drive one host's command from spawn to terminal result.
///
/// Both stream readers are always joined before the result resolves, so
/// no relay outlives its dispatch even under cancellation.
async fn execute_host(
    launcher: SshLauncher,
    job: HostJob,
    command: &str,
    tx: mpsc::Sender<OutputRecord>,
    cancel: CancellationToken,
    semaphore: Arc<Semaphore>,
) -> ExecutionResult {
    let HostJob {
        node,
        prefix,
        control_path,
    } = job;

    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return ExecutionResult {
                node,
                prefix,
                outcome: CommandOutcome::Failed("executor shut down".to_string()),
            };
        }
    };

    if cancel.is_cancelled() {
        return ExecutionResult {
            node,
            prefix,
            outcome: CommandOutcome::Interrupted,
        };
    }

    debug!(host = %node.host, %command, "Dispatching command");
    let mut cmd = launcher.exec(&node, control_path.as_deref(), command);
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecutionResult {
                node,
                prefix,
                outcome: CommandOutcome::Failed(format!("failed to launch ssh: {e}")),
            };
        }
    };

    let stdout = child.stdout.take().expect("child stdout is piped");
    let stderr = child.stderr.take().expect("child stderr is piped");

    let out_relay = tokio::spawn(relay_lines(
        stdout,
        node.host.clone(),
        prefix.clone(),
        StreamKind::Stdout,
        tx.clone(),
        cancel.clone(),
    ));
    let err_relay = tokio::spawn(relay_lines(
        stderr,
        node.host.clone(),
        prefix.clone(),
        StreamKind::Stderr,
        tx,
        cancel.clone(),
    ));

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => {
            // Stop the remote command promptly; the readers drain to EOF.
            let _ = child.start_kill();
            None
        }
    };

    let outcome = match waited {
        Some(Ok(status)) => CommandOutcome::Completed {
            exit_code: status.code().unwrap_or(-1),
        },
        Some(Err(e)) => CommandOutcome::Failed(format!("wait failed: {e}")),
        None => {
            let _ = child.wait().await; // reap after kill
            CommandOutcome::Interrupted
        }
    };

    // Join the readers so every produced line is either delivered or
    // definitively dropped before this host's terminal result exists.
    let _ = out_relay.await;
    let _ = err_relay.await;

    ExecutionResult {
        node,
        prefix,
        outcome,
    }
}
