use glam::{Quat, Vec3};

use crate::engine::{AudioBlock, EngineSourceId, RenderingEngine};
use crate::error::EngineError;
use crate::room::RoomProcessor;
use crate::spatializer::{self, Listener};
use crate::types::{ReflectionProperties, ReverbProperties, SourceKind, SourceParams};

/// Highest ambisonic order the renderer accepts (third order, 16 channels).
pub const MAX_AMBISONIC_ORDER: usize = 3;

/// The renderer only produces stereo output.
pub const OUTPUT_CHANNELS: usize = 2;

/// Largest block the renderer allocates scratch buses for.
pub const MAX_FRAMES_PER_BUFFER: usize = 1 << 16;

/// Highest accepted sample rate; room delay lines scale with it.
pub const MAX_SAMPLE_RATE_HZ: i32 = 384_000;

struct RenderSource {
    kind: SourceKind,
    params: SourceParams,
    input: AudioBlock,
    has_input: bool,
}

/// Pure-Rust reference implementation of [`RenderingEngine`].
///
/// Sound objects are panned with a constant-power law. Binaural modes add a
/// head-shadow level difference unless stereo speaker mode is on. Stereo
/// sources pass through with their volume, and ambisonic sources get a
/// first-order virtual-cardioid stereo decode.
pub struct Renderer {
    frames_per_buffer: usize,
    sample_rate_hz: u32,
    listener: Listener,
    master_volume: f32,
    room: RoomProcessor,
    sources: Vec<Option<RenderSource>>,
    free_ids: Vec<EngineSourceId>,
    mix_left: Vec<f32>,
    mix_right: Vec<f32>,
    room_input: Vec<f32>,
}

impl Renderer {
    pub fn new(num_channels: usize, frames_per_buffer: usize, sample_rate_hz: i32) -> Result<Self, EngineError> {
        if num_channels != OUTPUT_CHANNELS {
            return Err(EngineError::UnsupportedOutputChannels(num_channels));
        }
        if frames_per_buffer == 0 || frames_per_buffer > MAX_FRAMES_PER_BUFFER {
            return Err(EngineError::UnsupportedFramesPerBuffer(frames_per_buffer));
        }
        if !(1..=MAX_SAMPLE_RATE_HZ).contains(&sample_rate_hz) {
            return Err(EngineError::InvalidSampleRate(sample_rate_hz));
        }
        let sample_rate_hz = sample_rate_hz as u32;
        tracing::debug!(frames_per_buffer, sample_rate_hz, "reference renderer created");
        Ok(Self {
            frames_per_buffer,
            sample_rate_hz,
            listener: Listener::default(),
            master_volume: 1.0,
            room: RoomProcessor::new(sample_rate_hz),
            sources: Vec::new(),
            free_ids: Vec::new(),
            mix_left: vec![0.0; frames_per_buffer],
            mix_right: vec![0.0; frames_per_buffer],
            room_input: vec![0.0; frames_per_buffer],
        })
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn stereo_speaker_mode(&self) -> bool {
        self.listener.stereo_speakers
    }

    pub fn room_effects_enabled(&self) -> bool {
        self.room.is_enabled()
    }

    pub fn reflection_properties(&self) -> &ReflectionProperties {
        self.room.reflection()
    }

    pub fn reverb_properties(&self) -> &ReverbProperties {
        self.room.reverb()
    }

    pub fn num_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    pub fn source_params(&self, id: EngineSourceId) -> Option<&SourceParams> {
        self.source(id).map(|s| &s.params)
    }

    fn source(&self, id: EngineSourceId) -> Option<&RenderSource> {
        usize::try_from(id).ok().and_then(|i| self.sources.get(i)).and_then(Option::as_ref)
    }

    fn source_mut(&mut self, id: EngineSourceId) -> Option<&mut RenderSource> {
        usize::try_from(id).ok().and_then(|i| self.sources.get_mut(i)).and_then(Option::as_mut)
    }

    fn validate(kind: &SourceKind) -> Result<(), EngineError> {
        match *kind {
            SourceKind::Ambisonic { num_channels } => {
                let supported = (1..=MAX_AMBISONIC_ORDER).any(|order| (order + 1) * (order + 1) == num_channels);
                if supported { Ok(()) } else { Err(EngineError::UnsupportedAmbisonicChannels(num_channels)) }
            }
            SourceKind::Stereo { num_channels } => {
                if (1..=2).contains(&num_channels) { Ok(()) } else { Err(EngineError::UnsupportedStereoChannels(num_channels)) }
            }
            SourceKind::SoundObject { .. } => Ok(()),
        }
    }

    /// Mix every source that received input this block into the scratch buses.
    fn render_block(&mut self) {
        self.mix_left.fill(0.0);
        self.mix_right.fill(0.0);
        self.room_input.fill(0.0);

        let listener = self.listener;
        let head_inverse = listener.rotation.inverse();
        for source in self.sources.iter_mut().flatten() {
            if !source.has_input {
                continue;
            }
            source.has_input = false;
            let params = &source.params;
            match source.kind {
                SourceKind::SoundObject { mode } => {
                    let gains = spatializer::sound_object_gains(params, mode, &listener);
                    let mono = source.input.channel(0);
                    for (i, x) in mono.iter().enumerate() {
                        self.mix_left[i] += x * gains.left;
                        self.mix_right[i] += x * gains.right;
                        self.room_input[i] += x * gains.room_send;
                    }
                }
                SourceKind::Stereo { num_channels } => {
                    let volume = params.volume.max(0.0);
                    let left = source.input.channel(0);
                    let right = source.input.channel(num_channels - 1);
                    for i in 0..self.frames_per_buffer {
                        self.mix_left[i] += left[i] * volume;
                        self.mix_right[i] += right[i] * volume;
                    }
                }
                SourceKind::Ambisonic { .. } => {
                    let volume = params.volume.max(0.0);
                    // ACN order W, Y, Z, X with X front, Y left, Z up.
                    let (w, y, z, x) = (source.input.channel(0), source.input.channel(1), source.input.channel(2), source.input.channel(3));
                    for i in 0..self.frames_per_buffer {
                        let world = Vec3::new(-y[i], z[i], -x[i]);
                        let local = head_inverse * world;
                        let left_dipole = -local.x;
                        self.mix_left[i] += 0.5 * (w[i] + left_dipole) * volume;
                        self.mix_right[i] += 0.5 * (w[i] - left_dipole) * volume;
                    }
                }
            }
        }

        self.room.process(&self.room_input, &mut self.mix_left, &mut self.mix_right);

        let master = self.master_volume.max(0.0);
        for s in self.mix_left.iter_mut().chain(self.mix_right.iter_mut()) {
            *s *= master;
        }
    }
}

impl RenderingEngine for Renderer {
    fn num_channels(&self) -> usize {
        OUTPUT_CHANNELS
    }

    fn frames_per_buffer(&self) -> usize {
        self.frames_per_buffer
    }

    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn set_head_position(&mut self, x: f32, y: f32, z: f32) {
        self.listener.position = Vec3::new(x, y, z);
    }

    fn set_head_rotation(&mut self, x: f32, y: f32, z: f32, w: f32) {
        let q = Quat::from_xyzw(x, y, z, w);
        self.listener.rotation = if q.length_squared() > 0.0 && q.is_finite() { q.normalize() } else { Quat::IDENTITY };
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume;
    }

    fn set_stereo_speaker_mode(&mut self, enabled: bool) {
        self.listener.stereo_speakers = enabled;
    }

    fn enable_room_effects(&mut self, enable: bool) {
        self.room.set_enabled(enable);
    }

    fn set_reflection_properties(&mut self, props: &ReflectionProperties) {
        self.room.set_reflection(props);
    }

    fn set_reverb_properties(&mut self, props: &ReverbProperties) {
        self.room.set_reverb(props);
    }

    fn create_source(&mut self, kind: SourceKind) -> Result<EngineSourceId, EngineError> {
        Self::validate(&kind)?;
        let source = RenderSource {
            kind,
            params: SourceParams::default(),
            input: AudioBlock::new(kind.num_channels(), self.frames_per_buffer),
            has_input: false,
        };
        let id = match self.free_ids.pop() {
            Some(id) => {
                self.sources[id as usize] = Some(source);
                id
            }
            None => {
                self.sources.push(Some(source));
                (self.sources.len() - 1) as EngineSourceId
            }
        };
        Ok(id)
    }

    fn destroy_source(&mut self, id: EngineSourceId) {
        if let Some(slot) = usize::try_from(id).ok().and_then(|i| self.sources.get_mut(i)) {
            if slot.take().is_some() {
                self.free_ids.push(id);
            }
        }
        // With nothing feeding the room bus the output must be exact silence.
        if self.num_sources() == 0 {
            self.room.reset();
        }
    }

    fn set_source_params(&mut self, id: EngineSourceId, params: &SourceParams) {
        if let Some(source) = self.source_mut(id) {
            source.params = *params;
        }
    }

    fn set_source_buffer(&mut self, id: EngineSourceId, block: &AudioBlock) {
        let frames = self.frames_per_buffer;
        if let Some(source) = self.source_mut(id) {
            if block.num_channels() != source.kind.num_channels() || block.num_frames() != frames {
                tracing::warn!(id, "dropping input block with mismatched shape");
                return;
            }
            source.input.copy_from(block);
            source.has_input = true;
        }
    }

    fn fill_interleaved(&mut self, out: &mut [f32]) -> bool {
        if out.len() != OUTPUT_CHANNELS * self.frames_per_buffer {
            return false;
        }
        self.render_block();
        for (frame, (l, r)) in out.chunks_exact_mut(OUTPUT_CHANNELS).zip(self.mix_left.iter().zip(self.mix_right.iter())) {
            frame[0] = *l;
            frame[1] = *r;
        }
        true
    }

    fn fill_planar(&mut self, out: &mut [&mut [f32]]) -> bool {
        if out.len() != OUTPUT_CHANNELS || out.iter().any(|ch| ch.len() != self.frames_per_buffer) {
            return false;
        }
        self.render_block();
        out[0].copy_from_slice(&self.mix_left);
        out[1].copy_from_slice(&self.mix_right);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RenderingMode;

    fn renderer() -> Renderer {
        Renderer::new(2, 32, 48000).expect("renderer")
    }

    #[test]
    fn rejects_unsupported_construction() {
        assert_eq!(Renderer::new(6, 32, 48000).err(), Some(EngineError::UnsupportedOutputChannels(6)));
        assert_eq!(Renderer::new(2, 0, 48000).err(), Some(EngineError::UnsupportedFramesPerBuffer(0)));
        assert_eq!(Renderer::new(2, 32, 0).err(), Some(EngineError::InvalidSampleRate(0)));
    }

    #[test]
    fn rejects_oversized_blocks_and_rates() {
        assert_eq!(
            Renderer::new(2, usize::MAX, 48000).err(),
            Some(EngineError::UnsupportedFramesPerBuffer(usize::MAX))
        );
        assert_eq!(
            Renderer::new(2, MAX_FRAMES_PER_BUFFER + 1, 48000).err(),
            Some(EngineError::UnsupportedFramesPerBuffer(MAX_FRAMES_PER_BUFFER + 1))
        );
        assert_eq!(Renderer::new(2, 64, i32::MAX).err(), Some(EngineError::InvalidSampleRate(i32::MAX)));
        assert_eq!(
            Renderer::new(2, 64, MAX_SAMPLE_RATE_HZ + 1).err(),
            Some(EngineError::InvalidSampleRate(MAX_SAMPLE_RATE_HZ + 1))
        );
        assert!(Renderer::new(2, MAX_FRAMES_PER_BUFFER, MAX_SAMPLE_RATE_HZ).is_ok());
    }

    #[test]
    fn ambisonic_channel_counts() {
        let mut r = renderer();
        assert!(r.create_source(SourceKind::Ambisonic { num_channels: 4 }).is_ok());
        assert!(r.create_source(SourceKind::Ambisonic { num_channels: 16 }).is_ok());
        assert_eq!(
            r.create_source(SourceKind::Ambisonic { num_channels: 5 }),
            Err(EngineError::UnsupportedAmbisonicChannels(5))
        );
        assert!(r.create_source(SourceKind::Stereo { num_channels: 3 }).is_err());
    }

    #[test]
    fn ids_are_recycled_after_destroy() {
        let mut r = renderer();
        let a = r.create_source(SourceKind::SoundObject { mode: RenderingMode::StereoPanning }).unwrap();
        let b = r.create_source(SourceKind::Stereo { num_channels: 2 }).unwrap();
        assert_ne!(a, b);
        r.destroy_source(a);
        r.destroy_source(a);
        assert_eq!(r.num_sources(), 1);
        let c = r.create_source(SourceKind::Stereo { num_channels: 2 }).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn silence_without_sources() {
        let mut r = renderer();
        r.enable_room_effects(true);
        r.set_reverb_properties(&ReverbProperties { rt60_values: [1.0; 9], gain: 1.0 });
        let mut out = vec![1.0f32; 64];
        assert!(r.fill_interleaved(&mut out));
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn stereo_source_passes_through_once() {
        let mut r = renderer();
        let id = r.create_source(SourceKind::Stereo { num_channels: 2 }).unwrap();
        let mut block = AudioBlock::new(2, 32);
        block.channel_mut(0).fill(0.5);
        block.channel_mut(1).fill(-0.25);
        r.set_source_buffer(id, &block);

        let mut out = vec![0.0f32; 64];
        assert!(r.fill_interleaved(&mut out));
        assert_eq!(&out[..4], &[0.5, -0.25, 0.5, -0.25]);

        // input is consumed by the block that rendered it
        assert!(r.fill_interleaved(&mut out));
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn wrong_output_size_fails() {
        let mut r = renderer();
        let mut out = vec![0.0f32; 63];
        assert!(!r.fill_interleaved(&mut out));
        let mut left = vec![0.0f32; 32];
        let mut planar: Vec<&mut [f32]> = vec![&mut left[..]];
        assert!(!r.fill_planar(&mut planar));
    }
}
