//! Parameter surface: listener/room snapshots and the per-source setters.
//!
//! Every setter publishes a complete snapshot and returns immediately; the
//! next render pass forwards whatever changed to the engine. Setters on ids
//! that are not live are silent no-ops.

use glam::{Quat, Vec3};
use resonance_audio_engine::{
    Directivity, DistanceRolloffModel, ReflectionProperties, ReverbProperties, SourceParams,
};

use crate::registry::SourceId;
use crate::session::Session;

/// Listener pose and master output controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerState {
    pub head_position: Vec3,
    pub head_rotation: Quat,
    pub master_volume: f32,
    pub stereo_speaker_mode: bool,
}

impl Default for ListenerState {
    fn default() -> Self {
        Self { head_position: Vec3::ZERO, head_rotation: Quat::IDENTITY, master_volume: 1.0, stereo_speaker_mode: false }
    }
}

/// Room acoustics as applied atomically to the next block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoomState {
    pub enabled: bool,
    pub reflection: ReflectionProperties,
    pub reverb: ReverbProperties,
}

fn normalized_or_identity(q: Quat) -> Quat {
    if q.is_finite() && q.length_squared() > 0.0 { q.normalize() } else { Quat::IDENTITY }
}

impl Session {
    /// Current parameter snapshot of a live source.
    pub fn source_params(&self, id: SourceId) -> Option<SourceParams> {
        self.inner.registry.get(id).map(|entry| entry.params())
    }

    fn update_source(&self, id: SourceId, setter: &'static str, f: impl Fn(&mut SourceParams)) {
        match self.inner.registry.get(id) {
            Some(entry) => entry.update(f),
            None => tracing::debug!(id, setter, "ignoring setter for unknown source"),
        }
    }

    /// Explicit distance gain; only used while the rolloff model is `None`.
    pub fn set_source_distance_attenuation(&self, id: SourceId, distance_attenuation: f32) {
        self.update_source(id, "distance_attenuation", |p| p.distance_attenuation = distance_attenuation);
    }

    pub fn set_source_distance_model(&self, id: SourceId, rolloff: DistanceRolloffModel, min_distance: f32, max_distance: f32) {
        self.update_source(id, "distance_model", |p| {
            p.rolloff = rolloff;
            p.min_distance = min_distance;
            p.max_distance = max_distance;
        });
    }

    pub fn set_source_position(&self, id: SourceId, x: f32, y: f32, z: f32) {
        self.update_source(id, "position", |p| p.position = Vec3::new(x, y, z));
    }

    pub fn set_source_room_effects_gain(&self, id: SourceId, room_effects_gain: f32) {
        self.update_source(id, "room_effects_gain", |p| p.room_effects_gain = room_effects_gain);
    }

    /// Orientation as a quaternion; a degenerate quaternion resets to identity.
    pub fn set_source_rotation(&self, id: SourceId, x: f32, y: f32, z: f32, w: f32) {
        let rotation = normalized_or_identity(Quat::from_xyzw(x, y, z, w));
        self.update_source(id, "rotation", |p| p.rotation = rotation);
    }

    pub fn set_source_volume(&self, id: SourceId, volume: f32) {
        self.update_source(id, "volume", |p| p.volume = volume);
    }

    pub fn set_sound_object_directivity(&self, id: SourceId, alpha: f32, order: f32) {
        self.update_source(id, "directivity", |p| p.directivity = Directivity { alpha, order });
    }

    pub fn set_sound_object_listener_directivity(&self, id: SourceId, alpha: f32, order: f32) {
        self.update_source(id, "listener_directivity", |p| p.listener_directivity = Directivity { alpha, order });
    }

    pub fn set_sound_object_near_field_effect_gain(&self, id: SourceId, gain: f32) {
        self.update_source(id, "near_field_effect_gain", |p| p.near_field_effect_gain = gain);
    }

    pub fn set_sound_object_occlusion_intensity(&self, id: SourceId, intensity: f32) {
        self.update_source(id, "occlusion_intensity", |p| p.occlusion_intensity = intensity);
    }

    pub fn set_sound_object_spread(&self, id: SourceId, spread_deg: f32) {
        self.update_source(id, "spread", |p| p.spread_deg = spread_deg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonance_audio_engine::RenderingMode;

    #[test]
    fn setters_publish_whole_snapshots() {
        let session = Session::new(2, 64, 48000).expect("session");
        let id = session.create_sound_object_source(RenderingMode::StereoPanning);
        session.set_source_position(id, 1.0, 2.0, 3.0);
        session.set_source_volume(id, 0.5);
        session.set_source_distance_model(id, DistanceRolloffModel::Linear, 2.0, 20.0);
        session.set_sound_object_directivity(id, 0.5, 2.0);
        session.set_sound_object_spread(id, 45.0);

        let params = session.source_params(id).expect("live");
        assert_eq!(params.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(params.volume, 0.5);
        assert_eq!((params.rolloff, params.min_distance, params.max_distance), (DistanceRolloffModel::Linear, 2.0, 20.0));
        assert_eq!(params.directivity, Directivity { alpha: 0.5, order: 2.0 });
        assert_eq!(params.spread_deg, 45.0);
        assert_eq!(params.occlusion_intensity, 0.0);
    }

    #[test]
    fn rotation_is_normalized() {
        let session = Session::new(2, 64, 48000).expect("session");
        let id = session.create_stereo_source(2);
        session.set_source_rotation(id, 0.0, 0.0, 0.0, 4.0);
        assert_eq!(session.source_params(id).map(|p| p.rotation), Some(Quat::IDENTITY));
        session.set_source_rotation(id, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(session.source_params(id).map(|p| p.rotation), Some(Quat::IDENTITY));
    }

    #[test]
    fn setters_on_unknown_ids_do_nothing() {
        let session = Session::new(2, 64, 48000).expect("session");
        let id = session.create_sound_object_source(RenderingMode::StereoPanning);
        session.set_source_volume(id + 1, 0.1);
        session.set_source_volume(-1, 0.1);
        session.set_sound_object_occlusion_intensity(12345, 3.0);
        assert_eq!(session.source_params(id), Some(SourceParams::default()));
        assert!(session.source_params(id + 1).is_none());
    }

    #[test]
    fn listener_and_room_defaults() {
        let listener = ListenerState::default();
        assert_eq!(listener.master_volume, 1.0);
        assert!(!listener.stereo_speaker_mode);
        let room = RoomState::default();
        assert!(!room.enabled);
        assert_eq!(room.reverb, ReverbProperties::default());
    }
}
