use std::time::Duration;

use crate::engine::DEFAULT_CHANNEL_CAPACITY;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long the registry flusher waits after a mutation before writing
    /// the backing store. Mutations inside the window coalesce into one
    /// write.
    pub flush_debounce: Duration,
    /// Capacity of the command and event channels.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_debounce: Duration::from_millis(300),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
