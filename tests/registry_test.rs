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

//! Registry lifecycle properties: establish, reuse, classified failures
//! and artifact cleanup.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::FakeTransport;
use mush::errors::ConnectError;
use mush::node::Node;
use mush::registry::{establish_all, ConnectionRegistry};
use mush::ui::HostPrefix;
use mush::ParallelExecutor;
use tokio_util::sync::CancellationToken;

fn prefix(host: &str) -> HostPrefix {
    HostPrefix::new(host, 0, host.len(), false)
}

#[tokio::test]
async fn establish_creates_control_socket() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let node = Node::parse("h1", None).unwrap();

    let session = registry.establish(&node, prefix("h1")).await.unwrap();

    assert!(session.is_ready());
    assert!(session.control_path().exists());
    assert!(session.control_path().starts_with(registry.control_dir()));

    registry.close_all().await;
}

#[tokio::test]
async fn establish_twice_reuses_the_session() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let node = Node::parse("h1", None).unwrap();

    let first = registry.establish(&node, prefix("h1")).await.unwrap();
    let second = registry.establish(&node, prefix("h1")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.connected_hosts().await, vec!["h1"]);

    registry.close_all().await;
}

#[tokio::test]
async fn close_all_leaves_no_artifacts() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let control_dir = registry.control_dir().to_path_buf();

    for host in ["h1", "h2"] {
        let node = Node::parse(host, None).unwrap();
        registry.establish(&node, prefix(host)).await.unwrap();
    }
    assert!(control_dir.exists());

    registry.close_all().await;

    assert!(!control_dir.exists());
    assert!(registry.get("h1").await.is_none());
    assert!(registry.connected_hosts().await.is_empty());
}

#[tokio::test]
async fn auth_failure_is_classified() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let node = Node::parse("badauth", None).unwrap();

    let err = registry.establish(&node, prefix("badauth")).await.unwrap_err();
    assert!(matches!(err, ConnectError::Auth { .. }));
    assert_eq!(err.host(), "badauth");

    registry.close_all().await;
}

#[tokio::test]
async fn refused_failure_is_classified() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    let node = Node::parse("refused", None).unwrap();

    let err = registry.establish(&node, prefix("refused")).await.unwrap_err();
    assert!(matches!(err, ConnectError::Refused { .. }));

    registry.close_all().await;
}

#[tokio::test]
async fn hanging_connect_times_out() {
    let transport = FakeTransport::new();
    let launcher = transport.launcher_with_timeout(Duration::from_secs(1));
    let registry = ConnectionRegistry::new(launcher).unwrap();
    let node = Node::parse("slowconnect", None).unwrap();

    let err = registry
        .establish(&node, prefix("slowconnect"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::Timeout { .. }));

    registry.close_all().await;
}

#[tokio::test]
async fn interrupted_broadcast_preserves_sessions() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher()).unwrap();
    for host in ["h1", "h2"] {
        let node = Node::parse(host, None).unwrap();
        registry.establish(&node, prefix(host)).await.unwrap();
    }
    let sessions = registry.sessions().await;
    let executor = ParallelExecutor::new(transport.launcher(), 8);

    // Cancel a broadcast mid-flight.
    let cancel = CancellationToken::new();
    let mut dispatch = executor.run_persistent(&sessions, "sleep 30", cancel.clone());
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    while dispatch.records.recv().await.is_some() {}
    let results = dispatch.finish().await;
    assert!(results.iter().all(|r| r.is_interrupted()));

    // The transport sessions survive; the next dispatch reuses them.
    assert!(sessions.iter().all(|s| s.is_ready() && s.control_path().exists()));
    let mut dispatch = executor.run_persistent(&sessions, "echo again", CancellationToken::new());
    let mut lines = Vec::new();
    while let Some(record) = dispatch.records.recv().await {
        lines.push(record.line);
    }
    let results = dispatch.finish().await;
    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(lines, vec!["again", "again"]);

    registry.close_all().await;
}

#[tokio::test]
async fn stale_session_is_torn_down_and_reestablished() {
    let transport = FakeTransport::new();
    let registry = ConnectionRegistry::new(transport.launcher())
        .unwrap()
        .with_freshness(Duration::ZERO);
    let node = Node::parse("h1", None).unwrap();

    let first = registry.establish(&node, prefix("h1")).await.unwrap();
    let first_socket = first.control_path().to_path_buf();

    // With a zero window the session is stale immediately: neither the
    // direct lookup nor the snapshot may hand it out.
    assert!(registry.get("h1").await.is_none());
    assert!(registry.sessions().await.is_empty());

    // Re-establishing replaces the master instead of reusing it.
    let second = registry.establish(&node, prefix("h1")).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!first.is_ready());
    assert!(second.is_ready());
    assert!(second.control_path().exists());
    assert_eq!(second.control_path(), first_socket.as_path());

    registry.close_all().await;
}

#[tokio::test]
async fn cancelled_connect_attempts_are_abandoned() {
    let transport = FakeTransport::new();
    // Generous timeout so only cancellation can end the attempts early.
    let launcher = transport.launcher_with_timeout(Duration::from_secs(20));
    let registry = Arc::new(ConnectionRegistry::new(launcher).unwrap());

    let hosts = ["slowconnect", "slowconnect2"];
    let nodes: Vec<Node> = hosts
        .iter()
        .map(|h| Node::parse(h, None).unwrap())
        .collect();
    let prefixes: Vec<HostPrefix> = hosts.iter().map(|h| prefix(h)).collect();

    let cancel = CancellationToken::new();
    let started = Instant::now();
    let connect = establish_all(&registry, &nodes, &prefixes, &cancel, |_, _| {});
    tokio::pin!(connect);
    let report = tokio::select! {
        report = &mut connect => report,
        _ = tokio::time::sleep(Duration::from_millis(200)) => {
            cancel.cancel();
            connect.await
        }
    };

    // Abandoned attempts settle promptly and count as neither outcome.
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(report.sessions.is_empty());
    assert!(report.failures.is_empty());

    // No connect task still holds a slot lock, so teardown does not wait.
    let closing = Instant::now();
    registry.close_all().await;
    assert!(closing.elapsed() < Duration::from_secs(10));
    assert!(!registry.control_dir().exists());
}

#[tokio::test]
async fn reachable_subset_proceeds_and_failures_are_reported() {
    let transport = FakeTransport::new();
    let registry = Arc::new(ConnectionRegistry::new(transport.launcher()).unwrap());
    let control_dir = registry.control_dir().to_path_buf();

    let hosts = ["h1", "badauth", "h2"];
    let nodes: Vec<Node> = hosts
        .iter()
        .map(|h| Node::parse(h, None).unwrap())
        .collect();
    let prefixes: Vec<HostPrefix> = hosts
        .iter()
        .enumerate()
        .map(|(idx, h)| HostPrefix::new(h, idx, 7, false))
        .collect();

    let mut progress_calls = 0usize;
    let report = establish_all(&registry, &nodes, &prefixes, &CancellationToken::new(), |done, total| {
        progress_calls += 1;
        assert!(done <= total);
        assert_eq!(total, 3);
    })
    .await;

    assert_eq!(progress_calls, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].host(), "badauth");

    // Sessions come back in host-set order, not completion order.
    let session_hosts: Vec<_> = report
        .sessions
        .iter()
        .map(|s| s.node.host.as_str())
        .collect();
    assert_eq!(session_hosts, vec!["h1", "h2"]);

    registry.close_all().await;
    // Cleanup covers the failed host too.
    assert!(!control_dir.exists());
}
