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

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use mush::{
    cli::{Cli, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PARALLEL},
    commands::{exec::execute_command, interactive::run_session, ping::ping_nodes},
    config::Config,
    node::Node,
    registry::ConnectionRegistry,
    ui::{max_host_len, HostPrefix},
    utils::init_logging,
    ParallelExecutor, SshLauncher,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    // Command-line flags win over the config file; the built-in defaults
    // apply only when neither layer sets a value.
    let connect_timeout = cli
        .connect_timeout
        .or(config.defaults.connect_timeout)
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT);
    let parallel = cli
        .parallel
        .or(config.defaults.parallel)
        .unwrap_or(DEFAULT_PARALLEL);

    let color = !cli.no_color
        && !config.defaults.no_color.unwrap_or(false)
        && atty::is(atty::Stream::Stdout);

    let default_user = cli
        .user
        .clone()
        .or_else(|| config.defaults.user.clone())
        .or_else(|| std::env::var("USER").ok());

    let nodes: Vec<Node> = cli
        .hosts
        .iter()
        .map(|spec| {
            Node::parse(spec, default_user.as_deref())
                .with_context(|| format!("invalid host specification: {spec}"))
        })
        .collect::<Result<_>>()?;

    let max_len = max_host_len(&nodes.iter().map(|n| n.host.clone()).collect::<Vec<_>>());
    let prefixes: Vec<HostPrefix> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| HostPrefix::new(&node.host, idx, max_len, color))
        .collect();

    let launcher = SshLauncher::new(Duration::from_secs(connect_timeout))
        .with_programs(cli.ssh_command.clone(), cli.scp_command.clone());

    let code = if cli.ping {
        let registry = Arc::new(ConnectionRegistry::new(launcher)?);
        ping_nodes(registry, &nodes, &prefixes).await?
    } else if let Some(command) = &cli.command {
        let executor = ParallelExecutor::new(launcher, parallel);
        let targets = nodes.into_iter().zip(prefixes).collect();
        execute_command(&executor, targets, command).await?
    } else {
        let executor = ParallelExecutor::new(launcher.clone(), parallel);
        let registry = Arc::new(ConnectionRegistry::new(launcher)?);
        run_session(registry, executor, nodes, prefixes).await?
    };

    std::process::exit(code);
}
