use std::collections::HashMap;

use glam::{Quat, Vec3};
use resonance_audio_engine::{DistanceRolloffModel, ReflectionProperties, RenderingMode, ReverbProperties};

use crate::session::Session;
use crate::source::Source;

/// Spread given to sources attached through [`AudioWorld::add_audio_source`].
pub const DEFAULT_SPREAD_DEG: f32 = 360.0;

/// Spatial source attached to an entity, plus the options `update` pushes.
#[derive(Debug)]
pub struct AudioSource {
    pub source: Source,
    pub rendering_mode: RenderingMode,
    pub gain: f32,
    pub distance_model: DistanceRolloffModel,
    pub min_distance: f32,
    pub max_distance: f32,
    pub directivity_alpha: f32,
    pub directivity_order: f32,
    pub spread_deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Axis-aligned region with its own acoustics. `min` is inclusive, `max` exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioZone {
    pub min: Vec3,
    pub max: Vec3,
    pub reverb: ReverbProperties,
    pub reflection: ReflectionProperties,
    pub room_effect_gain: f32,
    pub occlusion: f32,
}

impl AudioZone {
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmplt(self.max).all()
    }
}

/// Entity-keyed convenience layer over a [`Session`].
pub struct AudioWorld {
    session: Session,
    listener: Transform,
    transforms: HashMap<u32, Transform>,
    audio_sources: HashMap<u32, AudioSource>,
    zones: Vec<AudioZone>,
    // Update order; kept in sync with `audio_sources`.
    active_source_keys: Vec<u32>,
}

impl AudioWorld {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            listener: Transform { position: Vec3::ZERO, rotation: Quat::IDENTITY },
            transforms: HashMap::new(),
            audio_sources: HashMap::new(),
            zones: Vec::new(),
            active_source_keys: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn add_transform(&mut self, entity: u32, position: Vec3, rotation: Quat) {
        self.transforms.insert(entity, Transform { position, rotation });
    }

    pub fn update_transform(&mut self, entity: u32, position: Vec3, rotation: Quat) {
        if let Some(transform) = self.transforms.get_mut(&entity) {
            transform.position = position;
            transform.rotation = rotation;
        }
    }

    /// Attach a sound-object source to `entity`, replacing any previous one.
    /// New sources start omnidirectional with a full 360 degree spread.
    /// Returns false when the session could not create the source.
    pub fn add_audio_source(&mut self, entity: u32, mode: RenderingMode) -> bool {
        let Some(source) = self.session.sound_object(mode) else {
            return false;
        };
        let previous = self.audio_sources.insert(
            entity,
            AudioSource {
                source,
                rendering_mode: mode,
                gain: 1.0,
                distance_model: DistanceRolloffModel::Logarithmic,
                min_distance: 1.0,
                max_distance: 100.0,
                directivity_alpha: 0.0,
                directivity_order: 1.0,
                spread_deg: DEFAULT_SPREAD_DEG,
            },
        );
        if previous.is_none() {
            self.active_source_keys.push(entity);
        }
        true
    }

    pub fn audio_source(&self, entity: u32) -> Option<&AudioSource> {
        self.audio_sources.get(&entity)
    }

    pub fn audio_source_mut(&mut self, entity: u32) -> Option<&mut AudioSource> {
        self.audio_sources.get_mut(&entity)
    }

    pub fn add_zone(&mut self, zone: AudioZone) {
        self.zones.push(zone);
    }

    pub fn listener(&self) -> Transform {
        self.listener
    }

    pub fn update_listener(&mut self, position: Vec3, rotation: Quat) {
        self.listener = Transform { position, rotation };
        self.session.set_head_position(position.x, position.y, position.z);
        self.session.set_head_rotation(rotation.x, rotation.y, rotation.z, rotation.w);
    }

    /// Forward one block of interleaved audio for `entity`.
    pub fn feed_audio(&self, entity: u32, audio: &[f32], num_channels: usize, num_frames: usize) -> bool {
        match self.audio_sources.get(&entity) {
            Some(source) => self.session.set_interleaved_buffer_f32(source.source.id(), audio, num_channels, num_frames),
            None => false,
        }
    }

    /// Push every source's transform and options, then apply the acoustics
    /// of the first zone containing it.
    pub fn update(&self) {
        let session = &self.session;
        for entity in &self.active_source_keys {
            let (Some(source), Some(transform)) = (self.audio_sources.get(entity), self.transforms.get(entity)) else {
                continue;
            };
            let id = source.source.id();
            let (pos, rot) = (transform.position, transform.rotation);
            session.set_source_position(id, pos.x, pos.y, pos.z);
            session.set_source_rotation(id, rot.x, rot.y, rot.z, rot.w);
            session.set_source_distance_model(id, source.distance_model, source.min_distance, source.max_distance);
            session.set_source_volume(id, source.gain);
            session.set_sound_object_directivity(id, source.directivity_alpha, source.directivity_order);
            session.set_sound_object_spread(id, source.spread_deg);

            if let Some(zone) = self.zones.iter().find(|zone| zone.contains(pos)) {
                session.set_source_room_effects_gain(id, zone.room_effect_gain);
                session.set_sound_object_occlusion_intensity(id, zone.occlusion);
                session.set_reverb_properties(&zone.reverb);
                session.set_reflection_properties(&zone.reflection);
            }
        }
    }

    /// Detach and destroy the source of `entity`. The transform is kept.
    pub fn remove_audio_source(&mut self, entity: u32) {
        if self.audio_sources.remove(&entity).is_some() {
            if let Some(pos) = self.active_source_keys.iter().position(|&e| e == entity) {
                self.active_source_keys.swap_remove(pos);
            }
        }
    }
}
