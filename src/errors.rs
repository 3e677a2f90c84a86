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

//! Typed per-host error taxonomy.
//!
//! Connection and copy failures are recovered locally (the host is excluded
//! or reported), so they carry enough structure for callers to classify them
//! without string matching. Application-level failures stay on `anyhow`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to establish a transport session to one host.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection to {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    #[error("connection refused by {host}")]
    Refused { host: String },

    #[error("authentication failed for {host}")]
    Auth { host: String },

    #[error("failed to launch ssh for {host}: {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {host} failed: {detail}")]
    Other { host: String, detail: String },
}

impl ConnectError {
    /// Classify a failed connect from the ssh exit and captured stderr.
    pub fn classify(host: &str, stderr: &str) -> Self {
        let lower = stderr.to_ascii_lowercase();
        if lower.contains("permission denied") || lower.contains("authentication") {
            ConnectError::Auth {
                host: host.to_string(),
            }
        } else if lower.contains("connection refused") {
            ConnectError::Refused {
                host: host.to_string(),
            }
        } else {
            let detail = stderr
                .lines()
                .last()
                .unwrap_or("ssh exited with an error")
                .trim()
                .to_string();
            ConnectError::Other {
                host: host.to_string(),
                detail,
            }
        }
    }

    pub fn host(&self) -> &str {
        match self {
            ConnectError::Timeout { host, .. }
            | ConnectError::Refused { host }
            | ConnectError::Auth { host }
            | ConnectError::Spawn { host, .. }
            | ConnectError::Other { host, .. } => host,
        }
    }
}

/// Failure to copy a local file to one host.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("local file not found: {0}")]
    MissingSource(PathBuf),

    #[error("failed to launch scp for {host}: {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("copy to {host} failed: {detail}")]
    Remote { host: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_failure() {
        let err = ConnectError::classify("h1", "user@h1: Permission denied (publickey).");
        assert!(matches!(err, ConnectError::Auth { .. }));
        assert_eq!(err.host(), "h1");
    }

    #[test]
    fn test_classify_refused() {
        let err = ConnectError::classify("h2", "ssh: connect to host h2 port 22: Connection refused");
        assert!(matches!(err, ConnectError::Refused { .. }));
    }

    #[test]
    fn test_classify_other_keeps_last_line() {
        let err = ConnectError::classify("h3", "Warning: something\nssh: Could not resolve hostname h3");
        match err {
            ConnectError::Other { detail, .. } => {
                assert!(detail.contains("resolve hostname"))
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
