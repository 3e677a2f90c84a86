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

//! Connection progress reporting.
//!
//! Pure display: the reporter consumes completion counts and never feeds
//! back into control flow. Hidden automatically when stderr is not a
//! terminal.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct ConnectProgress {
    bar: ProgressBar,
}

impl ConnectProgress {
    pub fn new(total: usize) -> Self {
        let bar = if atty::is(atty::Stream::Stderr) {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden())
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} Connecting [{bar:30.cyan/blue}] {pos}/{len} hosts",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        Self { bar }
    }

    pub fn update(&self, done: usize) {
        self.bar.set_position(done as u64);
    }

    /// Clear the bar so regular output starts on a clean line.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
