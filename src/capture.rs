// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Correlates the IMAP client's out-of-band diagnostics with the command that
//! is currently running.
//!
//! The client never returns the server's reasons from its calls; it reports
//! them through its logger. An [`ErrorCapture`] is created per invocation and
//! shared with that invocation's [`ImapLogger`]. The execution loop opens a
//! catching window around every handler call and drains it afterwards.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use serde_json::{Map, Value};

/// Arbitrary key/value diagnostic fields of one captured event.
pub type DiagnosticEntry = Map<String, Value>;

/// Builds a diagnostic entry with a `msg` field followed by `fields`.
pub fn diagnostic(msg: impl Into<String>, fields: &[(&str, Value)]) -> DiagnosticEntry {
    let mut entry = Map::new();
    entry.insert("msg".to_string(), Value::String(msg.into()));
    for (key, value) in fields {
        entry.insert((*key).to_string(), value.clone());
    }
    entry
}

#[derive(Debug, Default)]
struct CaptureState {
    catching: bool,
    entries: Vec<DiagnosticEntry>,
}

/// Buffer for diagnostics emitted while a catching window is open.
///
/// Idle -> `start_error_catching` -> Catching -> `stop_and_get_errors_list` -> Idle.
/// Only one window exists per capture; starting a new one discards whatever
/// the previous window left unread.
#[derive(Debug, Clone, Default)]
pub struct ErrorCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl ErrorCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn start_error_catching(&self) {
        let mut state = self.lock();
        if state.catching && !state.entries.is_empty() {
            debug!(
                "Discarding {} uncollected diagnostic entries from a previous window",
                state.entries.len()
            );
        }
        state.entries.clear();
        state.catching = true;
    }

    pub fn stop_and_get_errors_list(&self) -> CapturedErrors {
        let mut state = self.lock();
        state.catching = false;
        CapturedErrors(std::mem::take(&mut state.entries))
    }

    pub fn is_catching(&self) -> bool {
        self.lock().catching
    }

    /// Buffers `entry` if a window is open; otherwise drops it.
    pub fn record(&self, entry: DiagnosticEntry) {
        let mut state = self.lock();
        if state.catching {
            state.entries.push(entry);
        }
    }
}

/// Snapshot of the entries drained from one catching window, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedErrors(Vec<DiagnosticEntry>);

impl CapturedErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.0
    }

    /// Human-readable rendering used as a composed error's description.
    pub fn describe(&self) -> String {
        if self.0.is_empty() {
            return "No additional details were provided".to_string();
        }
        let dump = Value::Array(self.0.iter().cloned().map(Value::Object).collect());
        serde_json::to_string_pretty(&dump).unwrap_or_else(|_| dump.to_string())
    }
}

impl fmt::Display for CapturedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Leveled logger handed to the IMAP client.
///
/// Every event goes to the `log` facade. `warn` and `error` events are also
/// offered to the attached [`ErrorCapture`].
#[derive(Debug, Clone)]
pub struct ImapLogger {
    capture: ErrorCapture,
    cid: String,
}

impl ImapLogger {
    pub fn new(capture: ErrorCapture) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        Self { capture, cid: format!("c{}", id) }
    }

    /// A logger whose capture is never opened, for sessions used outside the
    /// execution loop.
    pub fn detached() -> Self {
        Self::new(ErrorCapture::new())
    }

    pub fn connection_id(&self) -> &str {
        &self.cid
    }

    pub fn debug(&self, entry: DiagnosticEntry) {
        debug!("[{}] {}", self.cid, Value::Object(entry));
    }

    pub fn info(&self, entry: DiagnosticEntry) {
        info!("[{}] {}", self.cid, Value::Object(entry));
    }

    pub fn warn(&self, entry: DiagnosticEntry) {
        let entry = self.annotate(entry, "warn");
        warn!("[{}] {}", self.cid, Value::Object(entry.clone()));
        self.capture.record(entry);
    }

    pub fn error(&self, entry: DiagnosticEntry) {
        let entry = self.annotate(entry, "error");
        error!("[{}] {}", self.cid, Value::Object(entry.clone()));
        self.capture.record(entry);
    }

    fn annotate(&self, mut entry: DiagnosticEntry, level: &str) -> DiagnosticEntry {
        entry
            .entry("level".to_string())
            .or_insert_with(|| Value::String(level.to_string()));
        entry
            .entry("cid".to_string())
            .or_insert_with(|| Value::String(self.cid.clone()));
        entry
            .entry("src".to_string())
            .or_insert_with(|| Value::String("imap".to_string()));
        entry
    }
}
