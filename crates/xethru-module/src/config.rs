use std::time::Duration;

use xethru_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD, DEFAULT_READ_CHUNK_SIZE};

/// Buffering policy for subscription queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueueCapacity {
    /// Never drop a record.
    #[default]
    Unbounded,
    /// Keep at most `n` records; pushing into a full queue evicts the oldest.
    Bounded(usize),
}

/// Configuration for a module connection.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// Deadline for each command round trip. Default: 2 s.
    pub command_timeout: Duration,
    /// How often the receive loop wakes to check for close. Default: 50 ms.
    pub read_poll_interval: Duration,
    /// Buffering policy for every data queue. Default: unbounded.
    pub queue_capacity: QueueCapacity,
    /// Bytes requested per read from the link. Default: 4096.
    pub read_chunk_size: usize,
    /// Largest accepted frame payload. Default: 65535.
    pub max_payload_size: usize,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(2),
            read_poll_interval: Duration::from_millis(50),
            queue_capacity: QueueCapacity::Unbounded,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ModuleConfig {
    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_chunk_size: self.read_chunk_size,
            read_timeout: Some(self.read_poll_interval),
            write_timeout: Some(self.command_timeout),
        }
    }
}
