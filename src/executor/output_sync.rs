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

//! Serialized terminal writer.
//!
//! Many per-host tasks produce output concurrently but the terminal has
//! exactly one logical writer. Each print acquires the lock for the whole
//! line, flushes, and releases; the lock is never held across remote I/O.

use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;

static STDOUT_MUTEX: Lazy<Mutex<io::Stdout>> = Lazy::new(|| Mutex::new(io::stdout()));

/// Write one complete line to the shared terminal atomically.
pub fn synchronized_println(text: &str) -> io::Result<()> {
    let mut stdout = STDOUT_MUTEX.lock().expect("stdout lock poisoned");
    writeln!(stdout, "{text}")?;
    stdout.flush()
}
