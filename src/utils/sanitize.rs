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

//! Output sanitization for merged host streams.
//!
//! Remote shells frequently emit ANSI styling and stray control characters.
//! If those leaked into the aggregated feed they would corrupt host
//! prefixes and garble the shared terminal, so every relayed line is
//! scrubbed before delivery.

use once_cell::sync::Lazy;
use regex::Regex;

/// CSI sequences (`ESC [ ... final`) plus OSC titles (`ESC ] ... BEL/ST`)
/// and two-byte escapes.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]")
        .expect("ANSI escape pattern is valid")
});

/// Strip ANSI escape sequences and non-printing control characters from a
/// line of remote output. Tabs are kept; carriage returns are dropped so
/// `\r\n` endings collapse cleanly.
pub fn scrub_line(line: &str) -> String {
    let stripped = ANSI_ESCAPE.replace_all(line, "");
    stripped
        .chars()
        .filter(|&c| c == '\t' || !c.is_control())
        .collect()
}
