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

//! Hermetic stand-ins for the ssh and scp executables.
//!
//! The launcher's program names are injectable, so every integration test
//! runs against small shell scripts instead of a live SSH server. The
//! fake ssh understands just enough of the real flag surface: `-S` control
//! sockets (master mode creates the socket file, `-O exit` removes it)
//! and command execution via the local shell. Magic host names trigger
//! failure modes: `badauth` (permission denied), `refused` (connection
//! refused), `slowconnect` (hangs until killed). The fake scp logs every
//! invocation so tests can assert on remote attempts, and fails for
//! targets containing `badcopy`.

// Each integration test binary compiles this module separately and none
// of them uses every helper.
#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use mush::SshLauncher;

const FAKE_SSH: &str = r#"#!/bin/sh
sock=""
op=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o|-p) shift 2 ;;
    -S) sock="$2"; shift 2 ;;
    -O) op="$2"; shift 2 ;;
    -M|-f|-n|-N) shift ;;
    *) break ;;
  esac
done
target="$1"
shift
if [ -n "$op" ]; then
  rm -f "$sock"
  exit 0
fi
case "$target" in
  *badauth*)
    echo "user@$target: Permission denied (publickey)." >&2
    exit 255
    ;;
  *refused*)
    echo "ssh: connect to host $target port 22: Connection refused" >&2
    exit 255
    ;;
  *slowconnect*)
    sleep 30
    exit 255
    ;;
esac
if [ $# -eq 0 ]; then
  : > "$sock"
  exit 0
fi
MUSH_TARGET="$target" exec /bin/sh -c "$1"
"#;

pub struct FakeTransport {
    dir: TempDir,
}

impl FakeTransport {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create fake transport dir");
        let transport = Self { dir };
        transport.write_script("ssh", FAKE_SSH.to_string());
        let scp = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> \"{log}\"\nfor a; do last=\"$a\"; done\ncase \"$last\" in\n  *badcopy*)\n    echo \"scp: remote write failed: No space left on device\" >&2\n    exit 1\n    ;;\nesac\nexit 0\n",
            log = transport.scp_log().display()
        );
        transport.write_script("scp", scp);
        transport
    }

    fn write_script(&self, name: &str, content: String) {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write fake script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("mark fake script executable");
        }
    }

    pub fn ssh_path(&self) -> String {
        self.dir.path().join("ssh").display().to_string()
    }

    pub fn scp_path(&self) -> String {
        self.dir.path().join("scp").display().to_string()
    }

    /// Every fake scp invocation, one line of arguments each.
    pub fn scp_log(&self) -> PathBuf {
        self.dir.path().join("scp-invocations.log")
    }

    pub fn launcher(&self) -> SshLauncher {
        self.launcher_with_timeout(Duration::from_secs(5))
    }

    pub fn launcher_with_timeout(&self, connect_timeout: Duration) -> SshLauncher {
        SshLauncher::new(connect_timeout).with_programs(self.ssh_path(), self.scp_path())
    }
}
