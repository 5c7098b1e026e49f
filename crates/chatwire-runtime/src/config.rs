use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Wall-clock budget of one streaming turn. `None` disables the timeout.
    pub turn_timeout_ms: Option<u64>,
    /// Capacity of the queue between the collaborator and the client writer.
    pub event_buffer: usize,
    /// Items loaded by `threads.get_by_id`.
    pub default_page_size: usize,
    /// Upper bound for client-supplied list limits.
    pub max_page_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            turn_timeout_ms: None,
            event_buffer: 16,
            default_page_size: 20,
            max_page_size: 200,
        }
    }
}

impl RuntimeConfig {
    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_ms.map(Duration::from_millis)
    }

    /// Client limit clamped to `1..=max_page_size`.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}
