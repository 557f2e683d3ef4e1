use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::registry::MAX_SOURCES;

/// Construction parameters of a [`Session`](crate::Session).
///
/// The first three fields are fixed for the life of the session; the rest
/// size the facade's own bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub num_channels: usize,
    pub frames_per_buffer: usize,
    pub sample_rate_hz: i32,
    /// Capacity of the source registry.
    pub max_sources: usize,
    /// Longest the render path waits for the engine lock before failing the block.
    pub render_lock_timeout: Duration,
    /// Number of recycled input blocks kept for the render thread.
    pub input_block_pool: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            num_channels: 2,
            frames_per_buffer: 512,
            sample_rate_hz: 48000,
            max_sources: 1024,
            render_lock_timeout: Duration::from_millis(2),
            input_block_pool: 64,
        }
    }
}

impl SessionConfig {
    pub fn new(num_channels: usize, frames_per_buffer: usize, sample_rate_hz: i32) -> Self {
        Self { num_channels, frames_per_buffer, sample_rate_hz, ..Self::default() }
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn with_render_lock_timeout(mut self, timeout: Duration) -> Self {
        self.render_lock_timeout = timeout;
        self
    }

    /// Checks the facade-owned fields; engine parameters are validated by the engine.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.max_sources == 0 || self.max_sources > MAX_SOURCES {
            return Err(SessionError::InvalidMaxSources { requested: self.max_sources, max: MAX_SOURCES });
        }
        if self.input_block_pool == 0 {
            return Err(SessionError::EmptyBlockPool);
        }
        Ok(())
    }
}
