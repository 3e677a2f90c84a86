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

//! External transport launcher.
//!
//! All remote communication goes through the system `ssh` and `scp`
//! executables; this module only builds their invocations. Connection
//! reuse relies on OpenSSH ControlMaster sockets: `master()` opens a
//! backgrounded master bound to a socket path, and later `exec()`/`copy()`
//! calls reference the same socket to skip reconnection and
//! reauthentication.
//!
//! The program names are injectable so the rest of the crate can be tested
//! against stand-in scripts without a live SSH server.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How long a control master stays alive after its last client.
const CONTROL_PERSIST: &str = "60s";

#[derive(Debug, Clone)]
pub struct SshLauncher {
    ssh_program: String,
    scp_program: String,
    connect_timeout: Duration,
}

impl Default for SshLauncher {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl SshLauncher {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..Self::default()
        }
    }

    /// Override the ssh/scp executables (tests, alternative clients).
    pub fn with_programs(mut self, ssh: impl Into<String>, scp: impl Into<String>) -> Self {
        self.ssh_program = ssh.into();
        self.scp_program = scp.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn common_options(&self) -> Vec<String> {
        vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".into(),
            "LogLevel=ERROR".into(),
        ]
    }

    /// Open a multiplexing master for `node`, bound to `control_path`.
    ///
    /// `-f -n -N` makes ssh authenticate, background itself and hold the
    /// socket without running a remote command, so the spawned process
    /// exits as soon as the connection is (or fails to be) established.
    pub fn master(&self, node: &crate::node::Node, control_path: &Path) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.args(self.common_options());
        if let Some(port) = node.port {
            cmd.arg("-p").arg(port.to_string());
        }
        cmd.arg("-M")
            .arg("-S")
            .arg(control_path)
            .arg("-o")
            .arg(format!("ControlPersist={CONTROL_PERSIST}"))
            .arg("-f")
            .arg("-n")
            .arg("-N")
            .arg(node.target());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `command` on `node`, optionally through an existing control
    /// socket.
    pub fn exec(
        &self,
        node: &crate::node::Node,
        control_path: Option<&Path>,
        command: &str,
    ) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.args(self.common_options());
        if let Some(port) = node.port {
            cmd.arg("-p").arg(port.to_string());
        }
        if let Some(path) = control_path {
            cmd.arg("-S").arg(path);
        }
        cmd.arg(node.target()).arg(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Ask the control master on `control_path` to exit.
    pub fn control_exit(&self, node: &crate::node::Node, control_path: &Path) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.arg("-S")
            .arg(control_path)
            .arg("-O")
            .arg("exit")
            .arg(node.target());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Synchronous variant of [`control_exit`] for drop-path cleanup where
    /// no runtime is available.
    pub fn control_exit_blocking(
        &self,
        node: &crate::node::Node,
        control_path: &Path,
    ) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.ssh_program);
        cmd.arg("-S")
            .arg(control_path)
            .arg("-O")
            .arg("exit")
            .arg(node.target());
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        cmd
    }

    /// Copy `local_path` to `node`, landing next to the remote home
    /// directory under the source file name.
    pub fn copy(
        &self,
        node: &crate::node::Node,
        local_path: &Path,
        control_path: Option<&Path>,
    ) -> Command {
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut cmd = Command::new(&self.scp_program);
        cmd.args(self.common_options());
        if let Some(port) = node.port {
            // scp spells the port flag differently from ssh
            cmd.arg("-P").arg(port.to_string());
        }
        if let Some(path) = control_path {
            cmd.arg("-o")
                .arg(format!("ControlPath={}", path.display()));
        }
        cmd.arg(local_path)
            .arg(format!("{}:{}", node.target(), file_name));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}
