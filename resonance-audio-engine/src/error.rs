use thiserror::Error;

/// Failures reported by a rendering engine on construction or source creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unsupported output channel count {0}")]
    UnsupportedOutputChannels(usize),

    #[error("unsupported frames per buffer {0}")]
    UnsupportedFramesPerBuffer(usize),

    #[error("unsupported sample rate {0} Hz")]
    InvalidSampleRate(i32),

    #[error("unsupported ambisonic channel count {0}")]
    UnsupportedAmbisonicChannels(usize),

    #[error("unsupported stereo source channel count {0}")]
    UnsupportedStereoChannels(usize),

    #[error("unknown engine source {0}")]
    UnknownSource(i32),
}
