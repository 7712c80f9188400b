use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_HISTORY_CAP: usize = 20;

/// Outcome of one plugin invocation.
///
/// On failure `output` equals `input`: the step is a no-op, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub plugin_id: String,
    /// Shared by every step of one pipeline invocation
    pub run_id: Uuid,
    pub input: String,
    pub output: String,
    pub execution_time_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Bounded FIFO log of execution results from both pipeline modes.
pub struct History {
    cap: usize,
    entries: Mutex<VecDeque<ExecutionResult>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl History {
    /// A zero cap is bumped to one.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            entries: Mutex::new(VecDeque::with_capacity(cap)),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub async fn append(&self, result: ExecutionResult) {
        let mut entries = self.entries.lock().await;
        entries.push_back(result);
        while entries.len() > self.cap {
            entries.pop_front();
        }
    }

    pub async fn extend(&self, results: impl IntoIterator<Item = ExecutionResult>) {
        for r in results {
            self.append(r).await;
        }
    }

    /// Oldest first, most recent last.
    pub async fn list(&self) -> Vec<ExecutionResult> {
        self.entries.lock().await.iter().cloned().collect()
    }

    /// The `n` most recent entries, still oldest first.
    pub async fn latest(&self, n: usize) -> Vec<ExecutionResult> {
        let entries = self.entries.lock().await;
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
