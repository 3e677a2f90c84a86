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

//! SIGINT handling across the whole binary: the connect phase must catch
//! the signal, tear sessions down, and leave no control directory behind.

mod common;

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use common::FakeTransport;

#[cfg(unix)]
#[test]
fn sigint_during_connect_exits_cleanly() {
    let transport = FakeTransport::new();

    // A hanging target keeps the connect phase in flight long enough to
    // deliver the signal; the generous timeout rules out racing it.
    let mut child = Command::new(env!("CARGO_BIN_EXE_mush"))
        .args([
            "--ping",
            "--connect-timeout",
            "20",
            "--ssh-command",
            &transport.ssh_path(),
            "--scp-command",
            &transport.scp_path(),
            "slowconnect",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn mush");
    let pid = child.id();

    std::thread::sleep(Duration::from_millis(1500));
    let status = Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()
        .expect("send SIGINT");
    assert!(status.success());

    // The process must exit on its own well before the connect timeout.
    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().expect("poll child") {
            break exit;
        }
        assert!(Instant::now() < deadline, "still running after SIGINT");
        std::thread::sleep(Duration::from_millis(100));
    };

    // 130 marks an interrupted run, distinct from plain failure, and only
    // the in-process handler produces it (the default disposition would
    // report a signal death with no exit code).
    assert_eq!(exit.code(), Some(130));

    // The control directory was removed on the way out.
    let marker = format!("mush-{pid}-");
    let leftovers: Vec<_> = std::fs::read_dir(std::env::temp_dir())
        .expect("read temp dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(&marker))
        .collect();
    assert!(leftovers.is_empty(), "leftover control dirs: {leftovers:?}");
}
