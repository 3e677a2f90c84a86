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

//! Control command parsing for the interactive session.
//!
//! Lines starting with `:` address the session itself instead of the
//! remote hosts. Bare `exit`, `quit` and `help` are also recognized so
//! habitual shell muscle memory does not broadcast them.

use std::path::PathBuf;

/// A parsed session-level command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Copy a local file to every connected host.
    Upload(PathBuf),
    /// List connected hosts.
    Hosts,
    /// Toggle echoing of dispatched command lines.
    Verbose,
    Help,
    Quit,
    /// A `:` line that matched nothing; carried verbatim for the error
    /// message.
    Unknown(String),
}

/// Parse an input line. `None` means the line is a command to broadcast.
pub fn parse_control(line: &str) -> Option<ControlCommand> {
    let trimmed = line.trim();
    match trimmed {
        "exit" | "quit" => return Some(ControlCommand::Quit),
        "help" => return Some(ControlCommand::Help),
        _ => {}
    }

    let rest = trimmed.strip_prefix(':')?;
    let mut parts = rest.split_whitespace();
    let cmd = match parts.next() {
        Some(word) => word,
        None => return Some(ControlCommand::Unknown(trimmed.to_string())),
    };

    Some(match cmd {
        "upload" => match parts.next() {
            Some(path) => ControlCommand::Upload(PathBuf::from(path)),
            None => ControlCommand::Unknown(trimmed.to_string()),
        },
        "hosts" => ControlCommand::Hosts,
        "verbose" => ControlCommand::Verbose,
        "help" => ControlCommand::Help,
        "quit" | "exit" => ControlCommand::Quit,
        _ => ControlCommand::Unknown(trimmed.to_string()),
    })
}

pub fn help_text() -> &'static [&'static str] {
    &[
        "Control commands:",
        "  :upload <file>   copy a local file to every connected host",
        "  :hosts           list connected hosts",
        "  :verbose         toggle echo of dispatched command lines",
        "  :help            show this help",
        "  :quit            close all sessions and exit",
        "Anything else is broadcast to all connected hosts.",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command_is_not_control() {
        assert_eq!(parse_control("uptime"), None);
        assert_eq!(parse_control("echo :hosts"), None);
    }

    #[test]
    fn test_upload_takes_path() {
        assert_eq!(
            parse_control(":upload ./deploy.sh"),
            Some(ControlCommand::Upload(PathBuf::from("./deploy.sh")))
        );
    }

    #[test]
    fn test_upload_without_path_is_unknown() {
        assert_eq!(
            parse_control(":upload"),
            Some(ControlCommand::Unknown(":upload".to_string()))
        );
    }

    #[test]
    fn test_bare_quit_tokens() {
        assert_eq!(parse_control("exit"), Some(ControlCommand::Quit));
        assert_eq!(parse_control("quit"), Some(ControlCommand::Quit));
        assert_eq!(parse_control(" help "), Some(ControlCommand::Help));
        assert_eq!(parse_control(":quit"), Some(ControlCommand::Quit));
    }

    #[test]
    fn test_unknown_control_is_carried_verbatim() {
        assert_eq!(
            parse_control(":frobnicate now"),
            Some(ControlCommand::Unknown(":frobnicate now".to_string()))
        );
    }

    #[test]
    fn test_simple_controls() {
        assert_eq!(parse_control(":hosts"), Some(ControlCommand::Hosts));
        assert_eq!(parse_control(":verbose"), Some(ControlCommand::Verbose));
        assert_eq!(parse_control(":help"), Some(ControlCommand::Help));
    }
}
