//! In-memory history of minification outcomes.

use std::sync::Mutex;

use serde::Serialize;

/// One finished minification attempt. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinificationRecord {
    /// Pathless source file name (`app.js`, not `/proj/app.js`).
    pub file: String,
    pub success: bool,
    /// Wall-clock milliseconds since the Unix epoch.
    pub time: i64,
}

/// Append-only result log, shared across concurrent dispatch completions.
///
/// Insertion order is chronological order; entries are never reordered or
/// deduplicated, and the log grows until [`ResultLog::clear`] is called.
/// Completions land from the multi-threaded runtime, hence the mutex.
#[derive(Debug, Default)]
pub struct ResultLog {
    entries: Mutex<Vec<MinificationRecord>>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome, stamped with the current time.
    pub fn append(&self, file: &str, success: bool) {
        let record = MinificationRecord {
            file: file.to_string(),
            success,
            time: chrono::Utc::now().timestamp_millis(),
        };
        self.entries.lock().unwrap().push(record);
    }

    /// Snapshot of all records. Value semantics: a later `clear` or append
    /// does not affect a snapshot already returned.
    pub fn read_all(&self) -> Vec<MinificationRecord> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        *self.entries.lock().unwrap() = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
