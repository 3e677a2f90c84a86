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

//! Connected-host listing, shared by the `:hosts` control command.

use owo_colors::OwoColorize;

use crate::registry::ConnectionRegistry;

/// Render the currently connected hosts, one line each, in first-connect
/// order.
pub async fn list_connected(registry: &ConnectionRegistry) -> Vec<String> {
    let sessions = registry.sessions().await;
    if sessions.is_empty() {
        return vec!["No connected hosts.".to_string()];
    }

    let mut lines = Vec::with_capacity(sessions.len() + 1);
    lines.push(format!(
        "Connected hosts ({}):",
        sessions.len().to_string().bold()
    ));
    for session in sessions {
        lines.push(format!(
            "  {} {} (up {}s)",
            "●".green(),
            session.node.host,
            session.age().as_secs()
        ));
    }
    lines
}
