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

//! Interactive session state.

use std::sync::Arc;

use crate::executor::ParallelExecutor;
use crate::node::Node;
use crate::registry::ConnectionRegistry;
use crate::ui::HostPrefix;

pub const PROMPT: &str = "mush> ";

/// Maximum readline history entries kept across sessions.
pub const MAX_HISTORY: usize = 1000;

/// Where the event loop is between two `tokio::select!` rounds. Exactly
/// one state is active at a time; every transition is explicit in
/// `session.rs`.
pub enum LoopState {
    /// Prompt shown, waiting for input or a signal.
    AwaitingEvent,
    /// A broadcast dispatch is in flight for this command line.
    ExecutingBroadcast(String),
    /// Tear down every session, then exit the loop.
    ClosingDown,
}

/// Everything the event loop owns for the lifetime of one session.
pub struct SessionState {
    pub registry: Arc<ConnectionRegistry>,
    pub executor: ParallelExecutor,
    /// The hosts that connected at startup, kept for re-establishing
    /// sessions that go stale between dispatches.
    pub nodes: Vec<Node>,
    pub prefixes: Vec<HostPrefix>,
    /// When set, dispatched command lines are echoed before execution.
    pub verbose_echo: bool,
}

/// What the input thread hands to the event loop.
#[derive(Debug)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C at an empty prompt.
    Interrupted,
    /// Ctrl-D or the terminal went away.
    Eof,
}
