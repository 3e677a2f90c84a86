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

use anyhow::{Context, Result};
use std::fmt;

/// A single remote target. The bare `host` string is the identity key for
/// every host-indexed map in the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
}

impl Node {
    pub fn new(host: String, port: Option<u16>, username: Option<String>) -> Self {
        Self {
            host,
            port,
            username,
        }
    }

    /// Parse `host`, `host:port`, `user@host` or `user@host:port`.
    ///
    /// A username is only attached when given explicitly or via
    /// `default_user`; otherwise user selection is left to the ssh
    /// configuration of the invoking user.
    pub fn parse(node_str: &str, default_user: Option<&str>) -> Result<Self> {
        let node_str = node_str.trim();
        if node_str.is_empty() {
            anyhow::bail!("Empty host specification");
        }

        let (user_part, host_part) = match node_str.find('@') {
            Some(at_pos) => (Some(&node_str[..at_pos]), &node_str[at_pos + 1..]),
            None => (None, node_str),
        };

        // IPv6 literals in brackets keep their colons.
        let (host, port) = if host_part.starts_with('[') {
            match host_part.rfind("]:") {
                Some(close) => {
                    let port = host_part[close + 2..]
                        .parse::<u16>()
                        .context("Invalid port number")?;
                    (&host_part[..=close], Some(port))
                }
                None => (host_part, None),
            }
        } else if let Some(colon_pos) = host_part.rfind(':') {
            let port = host_part[colon_pos + 1..]
                .parse::<u16>()
                .context("Invalid port number")?;
            (&host_part[..colon_pos], Some(port))
        } else {
            (host_part, None)
        };

        if host.is_empty() {
            anyhow::bail!("Missing hostname in '{node_str}'");
        }
        if user_part.is_some_and(str::is_empty) {
            anyhow::bail!("Missing username in '{node_str}'");
        }

        Ok(Node {
            host: host.to_string(),
            port,
            username: user_part.or(default_user).map(str::to_string),
        })
    }

    /// The `[user@]host` string handed to the ssh/scp command line.
    pub fn target(&self) -> String {
        match &self.username {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.username, self.port) {
            (Some(user), Some(port)) => write!(f, "{user}@{}:{port}", self.host),
            (Some(user), None) => write!(f, "{user}@{}", self.host),
            (None, Some(port)) => write!(f, "{}:{port}", self.host),
            (None, None) => write!(f, "{}", self.host),
        }
    }
}
