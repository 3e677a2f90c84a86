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

//! Host prefix styling and run summaries.
//!
//! Every merged output line is attributed with a padded, colored host
//! prefix. The color is picked by host index so it stays stable for the
//! whole run, and padding is computed once from the longest host name so
//! columns line up across hosts.

use owo_colors::{AnsiColors, OwoColorize};

/// Color cycle for host prefixes. Bright variants extend the palette so
/// larger host sets stay distinguishable before wrapping around.
const PREFIX_COLORS: [AnsiColors; 12] = [
    AnsiColors::Red,
    AnsiColors::Green,
    AnsiColors::Yellow,
    AnsiColors::Blue,
    AnsiColors::Magenta,
    AnsiColors::Cyan,
    AnsiColors::BrightRed,
    AnsiColors::BrightGreen,
    AnsiColors::BrightYellow,
    AnsiColors::BrightBlue,
    AnsiColors::BrightMagenta,
    AnsiColors::BrightCyan,
];

/// Precomputed display prefix for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPrefix {
    text: String,
}

impl HostPrefix {
    /// Build the prefix for the host at `idx`, padded to `max_len` (the
    /// longest host name in the run).
    pub fn new(host: &str, idx: usize, max_len: usize, color: bool) -> Self {
        let padded = format!("{host:<max_len$}");
        let text = if color {
            let c = PREFIX_COLORS[idx % PREFIX_COLORS.len()];
            padded.color(c).bold().to_string()
        } else {
            padded
        };
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Render one attributed output line.
    pub fn line(&self, text: &str) -> String {
        format!("{}: {}", self.text, text)
    }
}

/// Length of the longest host name, used for prefix padding.
pub fn max_host_len(hosts: &[String]) -> usize {
    hosts.iter().map(|h| h.len()).max().unwrap_or(0)
}

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format_command_header(command: &str, host_count: usize) -> String {
        format!(
            "{} {} on {} {}: {}",
            "►".cyan().bold(),
            "Executing".cyan(),
            host_count.to_string().bold(),
            if host_count == 1 { "host" } else { "hosts" },
            command.dimmed()
        )
    }

    pub fn format_summary(total: usize, success: usize, failed: usize) -> String {
        let mut parts = vec![format!("{} hosts", total.to_string().bold())];
        if success > 0 {
            parts.push(format!(
                "{} {}",
                success.to_string().green().bold(),
                "succeeded".green()
            ));
        }
        if failed > 0 {
            parts.push(format!(
                "{} {}",
                failed.to_string().red().bold(),
                "failed".red()
            ));
        }
        format!("{} {}", "Summary:".bold(), parts.join(" • "))
    }

    pub fn format_interrupted() -> String {
        format!("{} command interrupted", "✗".yellow().bold())
    }

    pub fn format_warning(detail: &str) -> String {
        format!("{} {}", "⚠".yellow(), detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_padding_without_color() {
        let p = HostPrefix::new("h1", 0, 8, false);
        assert_eq!(p.as_str(), "h1      ");
        assert_eq!(p.line("x"), "h1      : x");
    }

    #[test]
    fn test_prefix_colored_contains_host() {
        let p = HostPrefix::new("web1", 3, 4, true);
        assert!(p.as_str().contains("web1"));
        // Styling must produce an escape sequence.
        assert!(p.as_str().contains('\u{1b}'));
    }

    #[test]
    fn test_color_cycle_wraps() {
        // Index beyond the palette must not panic and must still differ in
        // style from a neighboring index.
        let a = HostPrefix::new("h", 0, 1, true);
        let b = HostPrefix::new("h", PREFIX_COLORS.len(), 1, true);
        assert_eq!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_max_host_len() {
        let hosts = vec!["a".to_string(), "longest".to_string(), "mid".to_string()];
        assert_eq!(max_host_len(&hosts), 7);
        assert_eq!(max_host_len(&[]), 0);
    }
}
