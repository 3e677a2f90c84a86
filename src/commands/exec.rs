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

//! One-shot broadcast execution.
//!
//! Runs a single command on every target host over direct connections,
//! streams the merged output as it arrives, and prints one summary line.
//! Ctrl-C cancels the dispatch; interrupted hosts report `interrupted`,
//! not failure.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::executor::output_sync::synchronized_println;
use crate::executor::ParallelExecutor;
use crate::node::Node;
use crate::ui::{HostPrefix, OutputFormatter};

pub async fn execute_command(
    executor: &ParallelExecutor,
    targets: Vec<(Node, HostPrefix)>,
    command: &str,
) -> Result<i32> {
    let host_count = targets.len();
    info!(%command, hosts = host_count, "Starting one-shot broadcast");
    synchronized_println(&OutputFormatter::format_command_header(command, host_count))?;

    let cancel = CancellationToken::new();
    let mut dispatch = executor.run_on_all(targets, command, cancel.clone());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            maybe = dispatch.records.recv() => match maybe {
                Some(record) => synchronized_println(&record.display())?,
                None => break,
            },
            // The branch is disabled after the first interrupt so the
            // completed signal future is never polled again.
            _ = &mut ctrl_c, if !cancel.is_cancelled() => {
                cancel.cancel();
                synchronized_println(&OutputFormatter::format_interrupted())?;
            }
        }
    }

    let results = dispatch.finish().await;
    for notice in results.iter().filter_map(|r| r.notice()) {
        synchronized_println(&notice)?;
    }

    let success = results.iter().filter(|r| r.is_success()).count();
    let interrupted = results.iter().filter(|r| r.is_interrupted()).count();
    let failed = results.len() - success - interrupted;
    synchronized_println(&OutputFormatter::format_summary(
        results.len(),
        success,
        failed,
    ))?;

    if interrupted > 0 {
        Ok(130)
    } else if failed > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}
