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

//! Interactive session event loop.
//!
//! One explicit state machine drives the whole session: show the prompt,
//! wait for an event, act, repeat. Line editing runs on a dedicated
//! blocking thread and only reads when the loop asks it to, so broadcast
//! output never races the editor for the terminal. Ctrl-C during a
//! broadcast cancels that dispatch only; the transport sessions stay up
//! and the next command reuses them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use owo_colors::OwoColorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::complete::PromptHelper;
use super::control::{help_text, parse_control, ControlCommand};
use super::progress::ConnectProgress;
use super::types::{InputEvent, LoopState, SessionState, MAX_HISTORY, PROMPT};
use crate::commands::{list::list_connected, upload::upload_file};
use crate::executor::output_sync::synchronized_println;
use crate::executor::ParallelExecutor;
use crate::node::Node;
use crate::registry::{establish_all, ConnectionRegistry, TransportSession};
use crate::ui::{HostPrefix, OutputFormatter};

pub async fn run_session(
    registry: Arc<ConnectionRegistry>,
    executor: ParallelExecutor,
    nodes: Vec<Node>,
    prefixes: Vec<HostPrefix>,
) -> Result<i32> {
    let report = {
        let progress = ConnectProgress::new(nodes.len());
        let shutdown = CancellationToken::new();
        let connect = establish_all(&registry, &nodes, &prefixes, &shutdown, |done, _| {
            progress.update(done);
        });
        tokio::pin!(connect);
        let mut interrupted = false;
        let report = tokio::select! {
            report = &mut connect => report,
            _ = tokio::signal::ctrl_c() => {
                // Abandon the in-flight attempts, then let the fan-out settle
                // so no connect task still holds a slot lock.
                shutdown.cancel();
                interrupted = true;
                connect.await
            }
        };
        progress.finish();
        if interrupted {
            registry.close_all().await;
            bail!("interrupted while connecting");
        }
        report
    };

    for failure in &report.failures {
        synchronized_println(&OutputFormatter::format_warning(&failure.to_string()))?;
    }
    if report.sessions.is_empty() {
        registry.close_all().await;
        bail!("no hosts reachable, nothing to do");
    }

    synchronized_println(&format!(
        "Connected to {} {}. Commands are broadcast to every host; type {} for control commands, {} to leave.",
        report.sessions.len().to_string().bold(),
        if report.sessions.len() == 1 { "host" } else { "hosts" },
        ":help".cyan(),
        "exit".cyan()
    ))?;

    let hosts = registry.connected_hosts().await;
    let (prompt_tx, mut event_rx) = spawn_input_thread(hosts.clone());

    // Keep only the hosts that actually connected; dead ones would fail
    // again on every re-establish.
    let (nodes, prefixes): (Vec<_>, Vec<_>) = nodes
        .into_iter()
        .zip(prefixes)
        .filter(|(node, _)| hosts.contains(&node.host))
        .unzip();

    let mut state = SessionState {
        registry: Arc::clone(&registry),
        executor,
        nodes,
        prefixes,
        verbose_echo: false,
    };

    let mut loop_state = LoopState::AwaitingEvent;
    loop {
        loop_state = match loop_state {
            LoopState::AwaitingEvent => {
                if prompt_tx.send(()).is_err() {
                    // Input thread is gone; treat it as end of input.
                    LoopState::ClosingDown
                } else {
                    // At the prompt the editor owns the terminal and maps
                    // ^C to Interrupted itself; the signal branch covers
                    // SIGINT delivered while no read is pending (e.g. a
                    // detached stdin).
                    let event = tokio::select! {
                        event = event_rx.recv() => event,
                        _ = tokio::signal::ctrl_c() => Some(InputEvent::Eof),
                    };
                    match event {
                        Some(InputEvent::Line(line)) => {
                            let action = handle_line(&mut state, &line);
                            tokio::pin!(action);
                            tokio::select! {
                                next = &mut action => next?,
                                _ = tokio::signal::ctrl_c() => {
                                    // Abandons the control command; the
                                    // transport sessions stay up.
                                    synchronized_println(&OutputFormatter::format_interrupted())?;
                                    LoopState::AwaitingEvent
                                }
                            }
                        }
                        Some(InputEvent::Interrupted) => LoopState::AwaitingEvent,
                        Some(InputEvent::Eof) | None => LoopState::ClosingDown,
                    }
                }
            }
            LoopState::ExecutingBroadcast(command) => {
                run_broadcast(&state, &command).await?;
                LoopState::AwaitingEvent
            }
            LoopState::ClosingDown => {
                synchronized_println("Closing sessions...")?;
                state.registry.close_all().await;
                break;
            }
        };
    }

    Ok(0)
}

/// Decide what one input line means. Returns the next loop state.
async fn handle_line(state: &mut SessionState, line: &str) -> Result<LoopState> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LoopState::AwaitingEvent);
    }

    let Some(control) = parse_control(trimmed) else {
        return Ok(LoopState::ExecutingBroadcast(trimmed.to_string()));
    };

    match control {
        ControlCommand::Quit => return Ok(LoopState::ClosingDown),
        ControlCommand::Help => {
            for line in help_text() {
                synchronized_println(line)?;
            }
        }
        ControlCommand::Hosts => {
            for line in list_connected(&state.registry).await {
                synchronized_println(&line)?;
            }
        }
        ControlCommand::Verbose => {
            state.verbose_echo = !state.verbose_echo;
            synchronized_println(&format!(
                "command echo {}",
                if state.verbose_echo { "enabled" } else { "disabled" }
            ))?;
        }
        ControlCommand::Upload(path) => run_upload(state, path).await?,
        ControlCommand::Unknown(input) => {
            synchronized_println(&OutputFormatter::format_warning(&format!(
                "unknown control command: {input} (try :help)"
            )))?;
        }
    }
    Ok(LoopState::AwaitingEvent)
}

/// Re-establish any session that went stale since the last dispatch and
/// return the Ready set. Hosts that fail to come back are reported and
/// skipped for this dispatch only.
async fn refresh_sessions(state: &SessionState) -> Result<Vec<Arc<TransportSession>>> {
    let report = establish_all(
        &state.registry,
        &state.nodes,
        &state.prefixes,
        &CancellationToken::new(),
        |_, _| {},
    )
    .await;
    for failure in &report.failures {
        synchronized_println(&OutputFormatter::format_warning(&failure.to_string()))?;
    }
    Ok(report.sessions)
}

async fn run_upload(state: &SessionState, path: PathBuf) -> Result<()> {
    let sessions = refresh_sessions(state).await?;
    match upload_file(state.registry.launcher(), &sessions, &path).await {
        Ok(results) => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            for result in &results {
                synchronized_println(&result.summary(&file_name))?;
            }
        }
        Err(e) => {
            synchronized_println(&OutputFormatter::format_warning(&e.to_string()))?;
        }
    }
    Ok(())
}

/// Broadcast one command to all connected hosts and stream the merged
/// output until every host resolves.
async fn run_broadcast(state: &SessionState, command: &str) -> Result<()> {
    let sessions = refresh_sessions(state).await?;
    if sessions.is_empty() {
        synchronized_println(&OutputFormatter::format_warning("no connected hosts"))?;
        return Ok(());
    }

    if state.verbose_echo {
        synchronized_println(
            &format!("+ {command} (on {} hosts)", sessions.len())
                .dimmed()
                .to_string(),
        )?;
    }
    debug!(%command, hosts = sessions.len(), "Broadcasting command");

    let cancel = CancellationToken::new();
    let mut dispatch = state.executor.run_persistent(&sessions, command, cancel.clone());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            maybe = dispatch.records.recv() => match maybe {
                Some(record) => synchronized_println(&record.display())?,
                None => break,
            },
            _ = &mut ctrl_c, if !cancel.is_cancelled() => {
                // Stops the dispatched commands; the transport sessions
                // stay connected.
                cancel.cancel();
            }
        }
    }

    let results = dispatch.finish().await;
    for notice in results.iter().filter_map(|r| r.notice()) {
        synchronized_println(&notice)?;
    }
    if results.iter().any(|r| r.is_interrupted()) {
        synchronized_println(&OutputFormatter::format_interrupted())?;
    }
    Ok(())
}

/// Run rustyline on its own thread. The loop reads exactly one line per
/// prompt request, so the editor never owns the terminal while a
/// broadcast is printing.
fn spawn_input_thread(
    hosts: Vec<String>,
) -> (
    std::sync::mpsc::Sender<()>,
    mpsc::UnboundedReceiver<InputEvent>,
) {
    let (prompt_tx, prompt_rx) = std::sync::mpsc::channel::<()>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut rl: Editor<PromptHelper, DefaultHistory> = match Editor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!(error = %e, "Failed to initialize line editor");
                let _ = event_tx.send(InputEvent::Eof);
                return;
            }
        };
        rl.set_helper(Some(PromptHelper::new(hosts)));
        if let Err(e) = rl.set_max_history_size(MAX_HISTORY) {
            warn!(error = %e, "Failed to set history size");
        }

        let history_path = history_path();
        if let Some(path) = &history_path {
            if path.exists() {
                let _ = rl.load_history(path);
            }
        }

        while prompt_rx.recv().is_ok() {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    if event_tx.send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    if event_tx.send(InputEvent::Interrupted).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Eof) => {
                    let _ = event_tx.send(InputEvent::Eof);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Line editor failed");
                    let _ = event_tx.send(InputEvent::Eof);
                    break;
                }
            }
        }

        if let Some(path) = &history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.save_history(path);
        }
    });

    (prompt_tx, event_rx)
}

fn history_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mush")
        .map(|dirs| dirs.config_dir().join("history"))
}
