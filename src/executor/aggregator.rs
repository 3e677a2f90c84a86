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

//! Fan-in of per-host output streams.
//!
//! Every host contributes one reader task per stream; all of them feed a
//! single bounded channel whose receiver is the one logical consumer.
//! Records from the same host arrive in the order the host produced them;
//! there is no cross-host ordering. The bounded capacity gives
//! backpressure without letting one stalled producer block another's
//! already-queued records.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::ui::HostPrefix;
use crate::utils::sanitize::scrub_line;

/// Shared delivery queue depth across all producers of one dispatch.
pub const AGGREGATOR_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One complete, attributed line of remote output.
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub host: String,
    pub prefix: HostPrefix,
    pub line: String,
    pub kind: StreamKind,
}

impl OutputRecord {
    /// The prefixed form shown on the shared terminal.
    pub fn display(&self) -> String {
        self.prefix.line(&self.line)
    }
}

/// Relay complete lines from one remote stream into the shared queue
/// until end-of-stream or cancellation.
///
/// Lines are scrubbed of ANSI/control sequences before delivery so stray
/// styling from the remote shell can never corrupt prefixes. Runs until
/// EOF so every record the host produced before exit is delivered.
pub async fn relay_lines<R>(
    reader: R,
    host: String,
    prefix: HostPrefix,
    kind: StreamKind,
    tx: mpsc::Sender<OutputRecord>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        tokio::select! {
            // Biased so an already-raised cancellation wins over ready input.
            biased;
            _ = cancel.cancelled() => {
                trace!(host = %host, ?kind, "Relay stopped by cancellation");
                break;
            }
            next = lines.next_line() => {
                match next {
                    Ok(Some(raw)) => {
                        let record = OutputRecord {
                            host: host.clone(),
                            prefix: prefix.clone(),
                            line: scrub_line(&raw),
                            kind,
                        };
                        // A closed receiver means the dispatch consumer is
                        // gone; nothing left to relay to.
                        if tx.send(record).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        trace!(host = %host, ?kind, error = %e, "Relay read error");
                        break;
                    }
                }
            }
        }
    }
}
