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

use clap::Parser;
use std::path::PathBuf;

/// Applied when neither the command line nor the config file sets one.
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
pub const DEFAULT_PARALLEL: usize = 64;

#[derive(Parser, Debug)]
#[command(
    name = "mush",
    version,
    about = "Multi-host shell - broadcast commands and interactive sessions over ssh",
    long_about = "mush runs one command, or an interactive session, against many remote hosts\nsimultaneously. Output from every host is merged in real time with a colored,\npadded host prefix so interleaved streams stay attributable. Connections are\nreused through OpenSSH ControlMaster multiplexing; mush itself implements no\nwire protocol and delegates all transport to the system ssh and scp binaries.",
    after_help = "EXAMPLES:\n  One-shot command:      mush -c 'uptime' web1 web2 web3\n  With a login name:     mush -u deploy -c 'df -h' web{1,2}\n  Interactive session:   mush web1 web2 web3\n\nInteractive control commands start with ':'  (:upload <file>, :hosts,\n:verbose, :help, :quit); anything else is broadcast to all connected hosts."
)]
pub struct Cli {
    #[arg(
        required = true,
        value_name = "HOST",
        help = "Target hosts in [user@]hostname[:port] format"
    )]
    pub hosts: Vec<String>,

    #[arg(
        short = 'c',
        long,
        help = "Command to execute on all hosts; omit to start an interactive session"
    )]
    pub command: Option<String>,

    #[arg(short = 'u', long, help = "Default username for ssh connections")]
    pub user: Option<String>,

    #[arg(
        long,
        help = "Configuration file path [default: ~/.config/mush/config.yaml]"
    )]
    pub config: Option<PathBuf>,

    // Optional so a value from the config file is distinguishable from
    // the built-in default; main folds the layers together.
    #[arg(
        long,
        value_name = "SECS",
        help = "Connection establishment timeout in seconds [default: 5]"
    )]
    pub connect_timeout: Option<u64>,

    #[arg(
        short = 'p',
        long,
        value_name = "N",
        help = "Maximum parallel connections [default: 64]"
    )]
    pub parallel: Option<usize>,

    #[arg(long, help = "Disable colored host prefixes")]
    pub no_color: bool,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    #[arg(
        long,
        default_value = "ssh",
        hide = true,
        help = "ssh executable to launch (testing/alternative clients)"
    )]
    pub ssh_command: String,

    #[arg(
        long,
        default_value = "scp",
        hide = true,
        help = "scp executable to launch (testing/alternative clients)"
    )]
    pub scp_command: String,

    #[arg(long, help = "Test connectivity to all hosts and exit")]
    pub ping: bool,
}
