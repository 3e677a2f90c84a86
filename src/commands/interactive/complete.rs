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

//! Tab completion for the interactive prompt.
//!
//! Deliberately narrow: control command names at the start of a line,
//! local paths after `:upload`, and connected host names elsewhere. The
//! host list is snapshotted when the session starts; hosts do not change
//! mid-session.

use std::path::Path;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

const CONTROL_NAMES: [&str; 5] = [":upload", ":hosts", ":verbose", ":help", ":quit"];

pub struct PromptHelper {
    hosts: Vec<String>,
}

impl PromptHelper {
    pub fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let head = &line[..pos];
        let word_start = head
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &head[word_start..];

        let matches = if word_start == 0 && word.starts_with(':') {
            control_candidates(word)
        } else if head.starts_with(":upload ") {
            path_candidates(word)
        } else {
            self.host_candidates(word)
        };

        (word_start, matches)
    }

    fn host_candidates(&self, word: &str) -> Vec<Pair> {
        if word.is_empty() {
            return Vec::new();
        }
        self.hosts
            .iter()
            .filter(|h| h.starts_with(word))
            .map(|h| Pair {
                display: h.clone(),
                replacement: h.clone(),
            })
            .collect()
    }
}

fn control_candidates(word: &str) -> Vec<Pair> {
    CONTROL_NAMES
        .iter()
        .filter(|name| name.starts_with(word))
        .map(|name| Pair {
            display: (*name).to_string(),
            replacement: format!("{name} "),
        })
        .collect()
}

fn path_candidates(word: &str) -> Vec<Pair> {
    let (dir, file_prefix) = match word.rsplit_once('/') {
        Some((dir, rest)) => (format!("{dir}/"), rest.to_string()),
        None => (String::new(), word.to_string()),
    };
    let read_from = if dir.is_empty() { "." } else { dir.as_str() };

    let Ok(entries) = std::fs::read_dir(Path::new(read_from)) else {
        return Vec::new();
    };

    let mut pairs: Vec<Pair> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&file_prefix) {
                return None;
            }
            // Hidden entries only show up once the user has typed a dot.
            if name.starts_with('.') && file_prefix.is_empty() {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let replacement = if is_dir {
                format!("{dir}{name}/")
            } else {
                format!("{dir}{name}")
            };
            Some(Pair {
                display: name,
                replacement,
            })
        })
        .collect();
    pairs.sort_by(|a, b| a.display.cmp(&b.display));
    pairs
}

impl Completer for PromptHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for PromptHelper {
    type Hint = String;
}

impl Highlighter for PromptHelper {}
impl Validator for PromptHelper {}
impl Helper for PromptHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> PromptHelper {
        PromptHelper::new(vec!["web1".to_string(), "web2".to_string(), "db1".to_string()])
    }

    #[test]
    fn test_control_names_at_line_start() {
        let (start, pairs) = helper().candidates(":h", 2);
        assert_eq!(start, 0);
        let names: Vec<_> = pairs.iter().map(|p| p.display.as_str()).collect();
        assert_eq!(names, vec![":hosts", ":help"]);
    }

    #[test]
    fn test_host_completion_mid_line() {
        let (start, pairs) = helper().candidates("ping web", 8);
        assert_eq!(start, 5);
        let names: Vec<_> = pairs.iter().map(|p| p.display.as_str()).collect();
        assert_eq!(names, vec!["web1", "web2"]);
    }

    #[test]
    fn test_no_candidates_for_empty_word() {
        let (_, pairs) = helper().candidates("echo ", 5);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_upload_completes_local_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("nothing.log"), "x").unwrap();
        std::fs::write(dir.path().join("other.txt"), "x").unwrap();

        let line = format!(":upload {}/not", dir.path().display());
        let (_, pairs) = helper().candidates(&line, line.len());
        let names: Vec<_> = pairs.iter().map(|p| p.display.as_str()).collect();
        assert_eq!(names, vec!["notes.txt", "nothing.log"]);
        assert_eq!(
            pairs[0].replacement,
            format!("{}/notes.txt", dir.path().display())
        );
    }
}
