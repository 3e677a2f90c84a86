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

//! Connectivity test across the host set.
//!
//! Establishes a session to every host, reports each outcome, and tears
//! everything down again. Exit code 0 only when every host is reachable.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

use crate::commands::interactive::progress::ConnectProgress;
use crate::executor::output_sync::synchronized_println;
use crate::node::Node;
use crate::registry::{establish_all, ConnectionRegistry};
use crate::ui::{HostPrefix, OutputFormatter};

pub async fn ping_nodes(
    registry: Arc<ConnectionRegistry>,
    nodes: &[Node],
    prefixes: &[HostPrefix],
) -> Result<i32> {
    let started = Instant::now();
    let progress = ConnectProgress::new(nodes.len());
    let shutdown = CancellationToken::new();
    let connect = establish_all(&registry, nodes, prefixes, &shutdown, |done, _| {
        progress.update(done);
    });
    tokio::pin!(connect);
    let mut interrupted = false;
    let report = tokio::select! {
        report = &mut connect => report,
        _ = tokio::signal::ctrl_c() => {
            shutdown.cancel();
            interrupted = true;
            connect.await
        }
    };
    progress.finish();
    if interrupted {
        registry.close_all().await;
        return Ok(130);
    }
    let elapsed = started.elapsed();

    for session in &report.sessions {
        synchronized_println(&format!(
            "{} {} is reachable",
            "✓".green().bold(),
            session.node.host.bold()
        ))?;
    }
    for failure in &report.failures {
        synchronized_println(&format!("{} {}", "✗".red().bold(), failure))?;
    }

    synchronized_println(&format!(
        "{} ({:.1}s)",
        OutputFormatter::format_summary(nodes.len(), report.sessions.len(), report.failures.len()),
        elapsed.as_secs_f64()
    ))?;

    registry.close_all().await;

    Ok(if report.failures.is_empty() { 0 } else { 1 })
}
