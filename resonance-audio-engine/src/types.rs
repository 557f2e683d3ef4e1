use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Spatialization strategy of a sound-object source, fixed at creation.
///
/// Discriminants are part of the C ABI (`kStereoPanning = 0` ...).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderingMode {
    StereoPanning = 0,
    BinauralLowQuality = 1,
    BinauralMediumQuality = 2,
    BinauralHighQuality = 3,
    RoomEffectsOnly = 4,
}

impl RenderingMode {
    pub fn is_binaural(self) -> bool {
        matches!(self, Self::BinauralLowQuality | Self::BinauralMediumQuality | Self::BinauralHighQuality)
    }
}

impl TryFrom<i32> for RenderingMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::StereoPanning),
            1 => Ok(Self::BinauralLowQuality),
            2 => Ok(Self::BinauralMediumQuality),
            3 => Ok(Self::BinauralHighQuality),
            4 => Ok(Self::RoomEffectsOnly),
            other => Err(other),
        }
    }
}

/// Attenuation curve applied with listener distance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistanceRolloffModel {
    #[default]
    Logarithmic = 0,
    Linear = 1,
    None = 2,
}

impl TryFrom<i32> for DistanceRolloffModel {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Logarithmic),
            1 => Ok(Self::Linear),
            2 => Ok(Self::None),
            other => Err(other),
        }
    }
}

/// Early-reflection room model.
///
/// The field order and count is the wire contract with C callers:
/// `room_position[3], room_rotation[4], room_dimensions[3], cutoff_frequency,
/// coefficients[6], gain` (18 floats, 72 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReflectionProperties {
    pub room_position: [f32; 3],
    pub room_rotation: [f32; 4],
    pub room_dimensions: [f32; 3],
    pub cutoff_frequency: f32,
    pub coefficients: [f32; 6],
    pub gain: f32,
}

/// Late reverberation model: nine RT60 bands plus an output gain (40 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReverbProperties {
    pub rt60_values: [f32; 9],
    pub gain: f32,
}

/// Variant of a source together with the data fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Ambisonic { num_channels: usize },
    Stereo { num_channels: usize },
    SoundObject { mode: RenderingMode },
}

impl SourceKind {
    /// Number of input channels a buffer for this source must carry.
    pub fn num_channels(&self) -> usize {
        match *self {
            SourceKind::Ambisonic { num_channels } | SourceKind::Stereo { num_channels } => num_channels,
            SourceKind::SoundObject { .. } => 1,
        }
    }
}

/// Directivity pattern shape: `alpha` blends omni (0) into figure-eight (1),
/// `order` sharpens the lobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directivity {
    pub alpha: f32,
    pub order: f32,
}

impl Default for Directivity {
    fn default() -> Self {
        Self { alpha: 0.0, order: 1.0 }
    }
}

/// Complete per-source parameter set. The facade publishes a new value on
/// every setter call and hands whole values to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceParams {
    pub position: Vec3,
    pub rotation: Quat,
    pub volume: f32,
    pub rolloff: DistanceRolloffModel,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Only used while `rolloff` is `DistanceRolloffModel::None`.
    pub distance_attenuation: f32,
    pub room_effects_gain: f32,
    pub directivity: Directivity,
    pub listener_directivity: Directivity,
    pub near_field_effect_gain: f32,
    pub occlusion_intensity: f32,
    pub spread_deg: f32,
}

impl Default for SourceParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            volume: 1.0,
            rolloff: DistanceRolloffModel::Logarithmic,
            min_distance: 1.0,
            max_distance: 500.0,
            distance_attenuation: 1.0,
            room_effects_gain: 1.0,
            directivity: Directivity::default(),
            listener_directivity: Directivity::default(),
            near_field_effect_gain: 0.0,
            occlusion_intensity: 0.0,
            spread_deg: 0.0,
        }
    }
}
