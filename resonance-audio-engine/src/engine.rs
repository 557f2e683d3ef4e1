use crate::error::EngineError;
use crate::types::{ReflectionProperties, ReverbProperties, SourceKind, SourceParams};

/// Engine-side source identifier. Only meaningful to the engine that issued it.
pub type EngineSourceId = i32;

/// One block of source input audio, stored planar (channel-major) as f32.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    num_channels: usize,
    num_frames: usize,
    samples: Vec<f32>,
}

impl AudioBlock {
    /// Zeroed block of `num_channels * num_frames` samples.
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        Self { num_channels, num_frames, samples: vec![0.0; num_channels * num_frames] }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Reshape in place, reusing the allocation when it is large enough.
    pub fn reshape(&mut self, num_channels: usize, num_frames: usize) {
        self.num_channels = num_channels;
        self.num_frames = num_frames;
        self.samples.clear();
        self.samples.resize(num_channels * num_frames, 0.0);
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        let start = index * self.num_frames;
        &self.samples[start..start + self.num_frames]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.num_frames;
        &mut self.samples[start..start + self.num_frames]
    }

    pub fn copy_from(&mut self, other: &AudioBlock) {
        self.reshape(other.num_channels, other.num_frames);
        self.samples.copy_from_slice(&other.samples);
    }
}

/// The opaque rendering capability the facade drives.
///
/// All methods are called with exclusive access: the facade serializes calls
/// behind one lock and only the render path calls the `fill_*` methods.
/// Implementations must not block inside `fill_*`.
pub trait RenderingEngine: Send + 'static {
    fn num_channels(&self) -> usize;
    fn frames_per_buffer(&self) -> usize;
    fn sample_rate_hz(&self) -> u32;

    fn set_head_position(&mut self, x: f32, y: f32, z: f32);
    fn set_head_rotation(&mut self, x: f32, y: f32, z: f32, w: f32);
    fn set_master_volume(&mut self, volume: f32);
    fn set_stereo_speaker_mode(&mut self, enabled: bool);

    fn enable_room_effects(&mut self, enable: bool);
    fn set_reflection_properties(&mut self, props: &ReflectionProperties);
    fn set_reverb_properties(&mut self, props: &ReverbProperties);

    /// Create a source; the error describes why the kind is unsupported.
    fn create_source(&mut self, kind: SourceKind) -> Result<EngineSourceId, EngineError>;
    /// Destroying an unknown id is a no-op.
    fn destroy_source(&mut self, id: EngineSourceId);
    fn set_source_params(&mut self, id: EngineSourceId, params: &SourceParams);
    /// Input for the next rendered block. The block shape has already been
    /// validated against the source's channel count and the buffer size.
    fn set_source_buffer(&mut self, id: EngineSourceId, block: &AudioBlock);

    /// Render one block into `out`, `num_channels * frames_per_buffer` samples.
    fn fill_interleaved(&mut self, out: &mut [f32]) -> bool;
    /// Render one block into `num_channels` slices of `frames_per_buffer` samples.
    fn fill_planar(&mut self, out: &mut [&mut [f32]]) -> bool;
}

impl<E: RenderingEngine + ?Sized> RenderingEngine for Box<E> {
    fn num_channels(&self) -> usize { (**self).num_channels() }
    fn frames_per_buffer(&self) -> usize { (**self).frames_per_buffer() }
    fn sample_rate_hz(&self) -> u32 { (**self).sample_rate_hz() }
    fn set_head_position(&mut self, x: f32, y: f32, z: f32) { (**self).set_head_position(x, y, z) }
    fn set_head_rotation(&mut self, x: f32, y: f32, z: f32, w: f32) { (**self).set_head_rotation(x, y, z, w) }
    fn set_master_volume(&mut self, volume: f32) { (**self).set_master_volume(volume) }
    fn set_stereo_speaker_mode(&mut self, enabled: bool) { (**self).set_stereo_speaker_mode(enabled) }
    fn enable_room_effects(&mut self, enable: bool) { (**self).enable_room_effects(enable) }
    fn set_reflection_properties(&mut self, props: &ReflectionProperties) { (**self).set_reflection_properties(props) }
    fn set_reverb_properties(&mut self, props: &ReverbProperties) { (**self).set_reverb_properties(props) }
    fn create_source(&mut self, kind: SourceKind) -> Result<EngineSourceId, EngineError> { (**self).create_source(kind) }
    fn destroy_source(&mut self, id: EngineSourceId) { (**self).destroy_source(id) }
    fn set_source_params(&mut self, id: EngineSourceId, params: &SourceParams) { (**self).set_source_params(id, params) }
    fn set_source_buffer(&mut self, id: EngineSourceId, block: &AudioBlock) { (**self).set_source_buffer(id, block) }
    fn fill_interleaved(&mut self, out: &mut [f32]) -> bool { (**self).fill_interleaved(out) }
    fn fill_planar(&mut self, out: &mut [&mut [f32]]) -> bool { (**self).fill_planar(out) }
}
