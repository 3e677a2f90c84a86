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

//! Terminal per-host results of a dispatch.

use owo_colors::OwoColorize;

use crate::errors::CopyError;
use crate::node::Node;
use crate::ui::HostPrefix;

/// How a single host's command execution ended.
///
/// `Interrupted` is deliberately distinct from failure: a task stopped by
/// the shared cancellation scope did not fail, it was stopped.
#[derive(Debug)]
pub enum CommandOutcome {
    Completed { exit_code: i32 },
    Interrupted,
    Failed(String),
}

/// Exactly one of these exists per host per dispatch.
#[derive(Debug)]
pub struct ExecutionResult {
    pub node: Node,
    pub prefix: HostPrefix,
    pub outcome: CommandOutcome,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CommandOutcome::Completed { exit_code: 0 })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.outcome, CommandOutcome::Interrupted)
    }

    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            CommandOutcome::Completed { exit_code } => *exit_code,
            CommandOutcome::Interrupted => 130,
            CommandOutcome::Failed(_) => 1,
        }
    }

    /// The terminal notice line for this host, if the outcome warrants
    /// one. Successful completions stay silent; merged output already told
    /// the story.
    pub fn notice(&self) -> Option<String> {
        match &self.outcome {
            CommandOutcome::Completed { exit_code: 0 } => None,
            CommandOutcome::Completed { exit_code } => Some(
                self.prefix
                    .line(&format!("exit code {exit_code}").red().to_string()),
            ),
            CommandOutcome::Interrupted => {
                Some(self.prefix.line(&"interrupted".yellow().to_string()))
            }
            CommandOutcome::Failed(detail) => Some(
                self.prefix
                    .line(&format!("ERROR: {detail}").red().to_string()),
            ),
        }
    }
}

/// Result of copying one file to one host.
#[derive(Debug)]
pub struct UploadResult {
    pub host: String,
    pub prefix: HostPrefix,
    pub result: Result<(), CopyError>,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn summary(&self, file_name: &str) -> String {
        match &self.result {
            Ok(()) => self
                .prefix
                .line(&format!("uploaded {file_name}").green().to_string()),
            Err(e) => self
                .prefix
                .line(&format!("UPLOAD ERROR: {e}").red().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: CommandOutcome) -> ExecutionResult {
        ExecutionResult {
            node: Node::parse("h1", None).unwrap(),
            prefix: HostPrefix::new("h1", 0, 2, false),
            outcome,
        }
    }

    #[test]
    fn test_success_has_no_notice() {
        let r = result(CommandOutcome::Completed { exit_code: 0 });
        assert!(r.is_success());
        assert!(r.notice().is_none());
        assert_eq!(r.exit_code(), 0);
    }

    #[test]
    fn test_nonzero_exit_notice_carries_prefix() {
        let r = result(CommandOutcome::Completed { exit_code: 3 });
        assert!(!r.is_success());
        let notice = r.notice().unwrap();
        assert!(notice.starts_with("h1: "));
        assert!(notice.contains("exit code 3"));
    }

    #[test]
    fn test_interrupted_is_not_failure() {
        let r = result(CommandOutcome::Interrupted);
        assert!(r.is_interrupted());
        assert!(!r.is_success());
        let notice = r.notice().unwrap();
        assert!(notice.contains("interrupted"));
        assert!(!notice.contains("ERROR"));
    }
}
