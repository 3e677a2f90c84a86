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

//! Upload properties: local precondition, per-host outcomes, control
//! socket reuse.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::FakeTransport;
use mush::commands::upload::upload_file;
use mush::errors::CopyError;
use mush::node::Node;
use mush::registry::ConnectionRegistry;
use mush::ui::HostPrefix;

async fn connect(
    registry: &ConnectionRegistry,
    hosts: &[&str],
) -> Vec<Arc<mush::registry::TransportSession>> {
    for (idx, host) in hosts.iter().enumerate() {
        let node = Node::parse(host, None).unwrap();
        let prefix = HostPrefix::new(host, idx, 7, false);
        registry.establish(&node, prefix).await.unwrap();
    }
    registry.sessions().await
}

#[tokio::test]
async fn missing_source_fails_locally_with_zero_remote_attempts() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let sessions = connect(&registry, &["h1", "h2"]).await;

    let err = upload_file(
        registry.launcher(),
        &sessions,
        Path::new("/definitely/not/here/missing.txt"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CopyError::MissingSource(_)));
    // The fake scp logs every invocation; no log file means no attempt.
    assert!(!transport.scp_log().exists());

    registry.close_all().await;
}

#[tokio::test]
async fn upload_reaches_every_host_through_its_socket() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let sessions = connect(&registry, &["h1", "h2"]).await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("notes.txt");
    std::fs::write(&local, "payload").unwrap();

    let results = upload_file(registry.launcher(), &sessions, &local)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_success()));

    let log = std::fs::read_to_string(transport.scp_log()).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().any(|l| l.ends_with("h1:notes.txt")));
    assert!(lines.iter().any(|l| l.ends_with("h2:notes.txt")));
    // Each copy goes through the host's established control socket.
    assert!(lines.iter().all(|l| l.contains("ControlPath=")));

    registry.close_all().await;
}

#[tokio::test]
async fn remote_failure_is_per_host() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let sessions = connect(&registry, &["h1", "badcopy"]).await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("notes.txt");
    std::fs::write(&local, "payload").unwrap();

    let results = upload_file(registry.launcher(), &sessions, &local)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let by_host =
        |host: &str| results.iter().find(|r| r.host == host).expect("host result");
    assert!(by_host("h1").is_success());

    let failed = by_host("badcopy");
    assert!(!failed.is_success());
    assert!(matches!(
        failed.result,
        Err(CopyError::Remote { .. })
    ));
    assert!(failed.summary("notes.txt").contains("UPLOAD ERROR"));

    registry.close_all().await;
}
