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

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;

use crate::node::Node;
use crate::ui::HostPrefix;

/// Lifecycle of a transport session. A session only exists once its
/// master is up, so Ready is the initial state; Closed is terminal and
/// marks handles that outlive the registry's teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Ready,
    Closed,
}

/// A live multiplexed connection to one host.
///
/// The actual connection is an OpenSSH control master process holding the
/// socket at `control_path`; this struct is the registry-owned handle to
/// it. Consumers receive `Arc` views and may only read; liveness mutation
/// stays behind the registry.
#[derive(Debug)]
pub struct TransportSession {
    pub node: Node,
    pub prefix: HostPrefix,
    control_path: PathBuf,
    established_at: Instant,
    liveness: RwLock<Liveness>,
}

impl TransportSession {
    pub(crate) fn new(node: Node, prefix: HostPrefix, control_path: PathBuf) -> Self {
        Self {
            node,
            prefix,
            control_path,
            established_at: Instant::now(),
            liveness: RwLock::new(Liveness::Ready),
        }
    }

    /// Path of the on-disk connection artifact (the control socket).
    pub fn control_path(&self) -> &std::path::Path {
        &self.control_path
    }

    pub fn liveness(&self) -> Liveness {
        *self.liveness.read().expect("liveness lock poisoned")
    }

    pub fn is_ready(&self) -> bool {
        self.liveness() == Liveness::Ready
    }

    pub(crate) fn set_liveness(&self, state: Liveness) {
        *self.liveness.write().expect("liveness lock poisoned") = state;
    }

    /// How long this session has been up.
    pub fn age(&self) -> std::time::Duration {
        self.established_at.elapsed()
    }
}
