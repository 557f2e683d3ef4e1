//! Gain and panning math used by the reference renderer.
//!
//! Coordinates follow the usual right-handed audio convention: +x right,
//! +y up, -z forward.

use glam::{Quat, Vec3};

use crate::types::{Directivity, DistanceRolloffModel, RenderingMode, SourceParams};

/// Near-field boost is capped at this linear gain.
pub const MAX_NEAR_FIELD_EFFECT_GAIN: f32 = 9.0;

/// Far-ear attenuation of the binaural modes for a source at full lateral pan.
pub const HEAD_SHADOW: f32 = 0.5;

const MIN_DISTANCE_EPSILON: f32 = 1e-4;

/// Listener pose as seen by the spatializer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: Vec3,
    pub rotation: Quat,
    /// Playback over speakers: binaural modes render as plain stereo panning.
    pub stereo_speakers: bool,
}

impl Default for Listener {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY, stereo_speakers: false }
    }
}

/// Per-block gains for a mono sound object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectGains {
    pub left: f32,
    pub right: f32,
    pub room_send: f32,
}

/// Distance attenuation for one of the three rolloff curves.
pub fn distance_gain(model: DistanceRolloffModel, min_distance: f32, max_distance: f32, distance: f32, explicit: f32) -> f32 {
    let min_distance = min_distance.max(MIN_DISTANCE_EPSILON);
    let max_distance = max_distance.max(min_distance);
    match model {
        DistanceRolloffModel::Logarithmic => {
            if distance <= min_distance {
                1.0
            } else {
                min_distance / distance.min(max_distance)
            }
        }
        DistanceRolloffModel::Linear => {
            if distance <= min_distance {
                1.0
            } else if distance >= max_distance {
                0.0
            } else {
                1.0 - (distance - min_distance) / (max_distance - min_distance)
            }
        }
        DistanceRolloffModel::None => explicit.max(0.0),
    }
}

/// Cardioid-family pattern gain for the angle whose cosine is `cos_theta`.
pub fn directivity_gain(pattern: Directivity, cos_theta: f32) -> f32 {
    let alpha = pattern.alpha.clamp(0.0, 1.0);
    let order = pattern.order.max(1.0);
    ((1.0 - alpha) + alpha * cos_theta).abs().powf(order)
}

/// Constant-power pan; `pan` in [-1, 1], -1 hard left.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let theta = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
    (theta.cos(), theta.sin())
}

/// Gains for a sound object with `params` heard by `listener`.
pub fn sound_object_gains(params: &SourceParams, mode: RenderingMode, listener: &Listener) -> ObjectGains {
    let offset = params.position - listener.position;
    let distance = offset.length();

    let mut gain = params.volume.max(0.0)
        * distance_gain(params.rolloff, params.min_distance, params.max_distance, distance, params.distance_attenuation);

    let mut pan = 0.0;
    if distance > MIN_DISTANCE_EPSILON {
        let to_source = offset / distance;
        let local = listener.rotation.inverse() * to_source;
        pan = local.x;

        let source_forward = params.rotation * Vec3::NEG_Z;
        gain *= directivity_gain(params.directivity, source_forward.dot(-to_source));
        let listener_forward = listener.rotation * Vec3::NEG_Z;
        gain *= directivity_gain(params.listener_directivity, listener_forward.dot(to_source));
    }

    if distance < 1.0 {
        let near = params.near_field_effect_gain.clamp(0.0, MAX_NEAR_FIELD_EFFECT_GAIN);
        gain *= 1.0 + near * (1.0 - distance);
    }
    gain /= 1.0 + params.occlusion_intensity.max(0.0);

    // Wider sources collapse toward the centre.
    let spread = (params.spread_deg / 360.0).clamp(0.0, 1.0);
    let pan = pan * (1.0 - spread);
    let (mut left, mut right) = pan_gains(pan);
    if mode.is_binaural() && !listener.stereo_speakers {
        let shadow = 1.0 - HEAD_SHADOW * pan.abs().min(1.0);
        if pan < 0.0 { right *= shadow } else { left *= shadow }
    }

    let room_send = params.volume.max(0.0) * params.room_effects_gain.max(0.0);
    match mode {
        RenderingMode::RoomEffectsOnly => ObjectGains { left: 0.0, right: 0.0, room_send },
        _ => ObjectGains { left: left * gain, right: right * gain, room_send },
    }
}
