use glam::{Quat, Vec3};
use resonance_audio_engine::{DistanceRolloffModel, RenderingMode, SourceKind, SourceParams};

use crate::buffer::Sample;
use crate::error::SourceError;
use crate::registry::SourceId;
use crate::session::Session;

/// Owned source handle. The source is destroyed when this value drops.
pub struct Source {
    session: Session,
    id: SourceId,
    kind: SourceKind,
}

impl Session {
    fn create_owned(&self, kind: SourceKind) -> Option<Source> {
        match self.try_create_source(kind) {
            Ok(id) => Some(Source { session: self.clone(), id, kind }),
            Err(error) => {
                tracing::warn!(%error, ?kind, "source creation failed");
                None
            }
        }
    }

    pub fn ambisonic_source(&self, num_channels: usize) -> Option<Source> {
        self.create_owned(SourceKind::Ambisonic { num_channels })
    }

    pub fn stereo_source(&self, num_channels: usize) -> Option<Source> {
        self.create_owned(SourceKind::Stereo { num_channels })
    }

    pub fn sound_object(&self, mode: RenderingMode) -> Option<Source> {
        self.create_owned(SourceKind::SoundObject { mode })
    }
}

impl Source {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn num_channels(&self) -> usize {
        self.kind.num_channels()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn params(&self) -> Option<SourceParams> {
        self.session.source_params(self.id)
    }

    pub fn set_position(&self, position: Vec3) {
        self.session.set_source_position(self.id, position.x, position.y, position.z);
    }

    pub fn set_rotation(&self, rotation: Quat) {
        self.session.set_source_rotation(self.id, rotation.x, rotation.y, rotation.z, rotation.w);
    }

    pub fn set_volume(&self, volume: f32) {
        self.session.set_source_volume(self.id, volume);
    }

    pub fn set_distance_model(&self, rolloff: DistanceRolloffModel, min_distance: f32, max_distance: f32) {
        self.session.set_source_distance_model(self.id, rolloff, min_distance, max_distance);
    }

    pub fn set_distance_attenuation(&self, attenuation: f32) {
        self.session.set_source_distance_attenuation(self.id, attenuation);
    }

    pub fn set_room_effects_gain(&self, gain: f32) {
        self.session.set_source_room_effects_gain(self.id, gain);
    }

    pub fn set_directivity(&self, alpha: f32, order: f32) {
        self.session.set_sound_object_directivity(self.id, alpha, order);
    }

    pub fn set_listener_directivity(&self, alpha: f32, order: f32) {
        self.session.set_sound_object_listener_directivity(self.id, alpha, order);
    }

    pub fn set_near_field_effect_gain(&self, gain: f32) {
        self.session.set_sound_object_near_field_effect_gain(self.id, gain);
    }

    pub fn set_occlusion_intensity(&self, intensity: f32) {
        self.session.set_sound_object_occlusion_intensity(self.id, intensity);
    }

    pub fn set_spread(&self, spread_deg: f32) {
        self.session.set_sound_object_spread(self.id, spread_deg);
    }

    /// Queue one block of interleaved input; frames are inferred from the length.
    pub fn set_interleaved<S: Sample>(&self, audio: &[S]) -> Result<(), SourceError> {
        let num_channels = self.num_channels();
        self.session.try_set_interleaved_buffer(self.id, audio, num_channels, audio.len() / num_channels)
    }

    /// Queue one block of planar input, one slice per channel.
    pub fn set_planar<S: Sample>(&self, channels: &[&[S]]) -> Result<(), SourceError> {
        let num_frames = channels.first().map_or(0, |c| c.len());
        self.session.try_set_planar_buffer(self.id, channels, channels.len(), num_frames)
    }

    /// Destroy now instead of at drop.
    pub fn destroy(self) {}
}

impl Drop for Source {
    fn drop(&mut self) {
        self.session.destroy_source(self.id);
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("id", &self.id).field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BufferError;

    #[test]
    fn dropping_destroys_the_source() {
        let session = Session::new(2, 32, 48000).expect("session");
        let source = session.sound_object(RenderingMode::BinauralLowQuality).expect("source");
        let id = source.id();
        assert!(session.is_source_live(id));
        drop(source);
        assert!(!session.is_source_live(id));
        assert_eq!(session.num_live_sources(), 0);
    }

    #[test]
    fn explicit_destroy() {
        let session = Session::new(2, 32, 48000).expect("session");
        let source = session.stereo_source(2).expect("source");
        let id = source.id();
        source.destroy();
        assert!(!session.is_source_live(id));
    }

    #[test]
    fn unsupported_kinds_yield_none() {
        let session = Session::new(2, 32, 48000).expect("session");
        assert!(session.ambisonic_source(5).is_none());
        assert!(session.stereo_source(0).is_none());
        assert_eq!(session.num_live_sources(), 0);
    }

    #[test]
    fn convenience_setters_reach_the_snapshot() {
        let session = Session::new(2, 32, 48000).expect("session");
        let source = session.sound_object(RenderingMode::StereoPanning).expect("source");
        source.set_position(Vec3::new(0.0, 1.0, -4.0));
        source.set_volume(0.75);
        source.set_near_field_effect_gain(2.0);
        let params = source.params().expect("live");
        assert_eq!(params.position, Vec3::new(0.0, 1.0, -4.0));
        assert_eq!(params.volume, 0.75);
        assert_eq!(params.near_field_effect_gain, 2.0);
    }

    #[test]
    fn input_shape_follows_the_source() {
        let session = Session::new(2, 32, 48000).expect("session");
        let source = session.ambisonic_source(4).expect("source");
        assert!(source.set_interleaved(&vec![0.0f32; 4 * 32]).is_ok());
        assert_eq!(
            source.set_interleaved(&vec![0i16; 4 * 16]),
            Err(SourceError::Buffer(BufferError::FrameMismatch { expected: 32, actual: 16 }))
        );
        let ch = vec![0.0f32; 32];
        let planar: Vec<&[f32]> = vec![ch.as_slice(); 3];
        assert_eq!(
            source.set_planar(&planar),
            Err(SourceError::Buffer(BufferError::ChannelMismatch { expected: 4, actual: 3 }))
        );
    }
}
