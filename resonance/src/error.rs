use resonance_audio_engine::EngineError;
use thiserror::Error;

use crate::registry::SourceId;

/// Session construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("rendering engine rejected the configuration: {0}")]
    Engine(#[from] EngineError),

    #[error("max_sources must be between 1 and {max}, got {requested}")]
    InvalidMaxSources { requested: usize, max: usize },

    #[error("input_block_pool must be at least 1")]
    EmptyBlockPool,

    #[error("engine reports {actual} {what}, configuration asks for {expected}")]
    EngineMismatch { what: &'static str, expected: usize, actual: usize },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// A caller-supplied buffer does not match the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("expected {expected} frames, got {actual}")]
    FrameMismatch { expected: usize, actual: usize },

    #[error("interleaved buffer holds {actual} samples, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("planar channel {channel} holds {actual} samples, expected {expected}")]
    PlanarChannelLength { channel: usize, expected: usize, actual: usize },

    #[error("planar channel {0} is null")]
    NullChannel(usize),

    #[error("buffer shape {num_channels}x{num_frames} overflows")]
    Overflow { num_channels: usize, num_frames: usize },
}

/// Why a render-fill produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error("engine lock not acquired within the render timeout")]
    LockTimeout,

    #[error("rendering engine failed to fill the output buffer")]
    Engine,
}

/// Failures of source creation and source input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("all {max_sources} source slots are in use")]
    CapacityExhausted { max_sources: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unknown or destroyed source id {0}")]
    UnknownSource(SourceId),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
