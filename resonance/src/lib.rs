//! Session/source facade over a spatial audio [`RenderingEngine`].
//!
//! A [`Session`] owns one engine sized by channel count, buffer size and
//! sample rate. Sources are created and destroyed through the session and
//! addressed by generation-checked integer ids; every parameter setter is
//! lock-free and may be called from any thread while another thread renders.
//!
//! ```no_run
//! use resonance::{RenderingMode, Session};
//!
//! let session = Session::new(2, 512, 48000).expect("session");
//! let id = session.create_sound_object_source(RenderingMode::BinauralHighQuality);
//! session.set_source_position(id, 1.0, 0.0, -2.0);
//! let mut out = vec![0.0f32; 2 * 512];
//! session.fill_interleaved_f32(2, 512, &mut out);
//! ```

pub mod audio_world;
pub mod buffer;
pub mod config;
pub mod error;
mod params;
pub mod registry;
mod session;
mod source;

pub use audio_world::{AudioSource, AudioWorld, AudioZone, DEFAULT_SPREAD_DEG, Transform};
pub use buffer::{BufferLayout, Sample, SampleFormat};
pub use config::SessionConfig;
pub use error::{BufferError, RenderError, SessionError, SourceError};
pub use params::{ListenerState, RoomState};
pub use registry::{INVALID_SOURCE_ID, MAX_SOURCES, SourceId};
pub use session::Session;
pub use source::Source;

pub use resonance_audio_engine::{
    Directivity, DistanceRolloffModel, EngineError, ReflectionProperties, RenderingEngine, RenderingMode,
    Renderer, ReverbProperties, SourceKind, SourceParams,
};
