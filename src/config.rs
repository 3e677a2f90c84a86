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

//! Optional YAML configuration.
//!
//! Everything here is a default that CLI flags override. Absence of a
//! config file is not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Defaults {
    /// Username applied to hosts given without an explicit `user@`.
    #[serde(default)]
    pub user: Option<String>,

    /// Connection establishment timeout in seconds.
    #[serde(default)]
    pub connect_timeout: Option<u64>,

    /// Maximum concurrent connections/executions.
    #[serde(default)]
    pub parallel: Option<usize>,

    /// Disable colored host prefixes.
    #[serde(default)]
    pub no_color: Option<bool>,
}

impl Config {
    /// Load configuration. An explicitly given path must exist and parse;
    /// the default location is used only when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config at {}", path.display()))
    }

    fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mush")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_default_is_empty() {
        let config = Config::load(None).unwrap();
        assert!(config.defaults.user.is_none());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "defaults:\n  user: deploy\n  connect_timeout: 3\n  no_color: true"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.defaults.user.as_deref(), Some("deploy"));
        assert_eq!(config.defaults.connect_timeout, Some(3));
        assert_eq!(config.defaults.no_color, Some(true));
        assert_eq!(config.defaults.parallel, None);
    }

    #[test]
    fn test_load_explicit_missing_is_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/mush.yaml"))).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "defaults: [not a map").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
