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

//! Parallel file upload over established sessions.
//!
//! The local file is checked before anything touches the network: a
//! missing source fails once, locally, with zero remote attempts. Copies
//! then run concurrently, one scp per host through that host's control
//! socket, and every host gets its own result.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::errors::CopyError;
use crate::executor::UploadResult;
use crate::registry::TransportSession;
use crate::transport::SshLauncher;

pub async fn upload_file(
    launcher: &SshLauncher,
    sessions: &[Arc<TransportSession>],
    local_path: &Path,
) -> Result<Vec<UploadResult>, CopyError> {
    if !local_path.is_file() {
        return Err(CopyError::MissingSource(local_path.to_path_buf()));
    }

    let copies = sessions.iter().map(|session| {
        let session = Arc::clone(session);
        let launcher = launcher.clone();
        let local_path = local_path.to_path_buf();
        async move {
            debug!(host = %session.node.host, path = %local_path.display(), "Uploading file");
            let result = copy_to_host(&launcher, &session, &local_path).await;
            UploadResult {
                host: session.node.host.clone(),
                prefix: session.prefix.clone(),
                result,
            }
        }
    });

    Ok(join_all(copies).await)
}

async fn copy_to_host(
    launcher: &SshLauncher,
    session: &TransportSession,
    local_path: &Path,
) -> Result<(), CopyError> {
    let mut cmd = launcher.copy(&session.node, local_path, Some(session.control_path()));
    let output = cmd.output().await.map_err(|source| CopyError::Spawn {
        host: session.node.host.clone(),
        source,
    })?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .last()
            .unwrap_or("scp exited with an error")
            .trim()
            .to_string();
        Err(CopyError::Remote {
            host: session.node.host.clone(),
            detail,
        })
    }
}
