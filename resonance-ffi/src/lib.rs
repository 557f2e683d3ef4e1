//! C ABI for the resonance facade, matching `include/resonance_c_api.h`.
//!
//! Every function accepts a null handle and does nothing (creators return
//! `-1`, fills and getters return `false`). Enum arguments arrive as plain
//! `int`s and are rejected when out of range. Panics never unwind into C.

use std::ffi::{c_int, c_void};

use resonance::{
    BufferError, DistanceRolloffModel, INVALID_SOURCE_ID, ReflectionProperties, RenderError, RenderingMode,
    ReverbProperties, Session, SourceError, buffer,
};

mod marshal;

use marshal::{guard, session, slice, slice_mut, with_planar, with_planar_mut};

/// Opaque session handle handed to C.
pub type ResonanceAudioApiHandle = *mut c_void;

/// Create a session with the reference renderer. Null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn resonance_create_api(
    num_channels: usize,
    frames_per_buffer: usize,
    sample_rate_hz: c_int,
) -> ResonanceAudioApiHandle {
    guard("resonance_create_api", std::ptr::null_mut(), || {
        match Session::new(num_channels, frames_per_buffer, sample_rate_hz) {
            Ok(session) => Box::into_raw(Box::new(session)) as ResonanceAudioApiHandle,
            Err(error) => {
                tracing::warn!(%error, num_channels, frames_per_buffer, sample_rate_hz, "resonance_create_api failed");
                std::ptr::null_mut()
            }
        }
    })
}

/// # Safety
/// `handle` must be null or a live handle; it is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_destroy_api(handle: ResonanceAudioApiHandle) {
    if handle.is_null() {
        return;
    }
    guard("resonance_destroy_api", (), || drop(unsafe { Box::from_raw(handle as *mut Session) }));
}

// ---- rendering ----

fn check_output(session: &Session, num_channels: usize, num_frames: usize) -> Result<(), BufferError> {
    if num_channels != session.num_channels() {
        return Err(BufferError::ChannelMismatch { expected: session.num_channels(), actual: num_channels });
    }
    if num_frames != session.frames_per_buffer() {
        return Err(BufferError::FrameMismatch { expected: session.frames_per_buffer(), actual: num_frames });
    }
    Ok(())
}

fn rendered(entry: &'static str, result: Result<(), RenderError>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(entry, %error, "render fill failed");
            false
        }
    }
}

/// # Safety
/// `handle` must be null or live; `buffer_ptr` must be valid for
/// `num_channels * num_frames` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_fill_interleaved_output_buffer_f32(
    handle: ResonanceAudioApiHandle,
    num_channels: usize,
    num_frames: usize,
    buffer_ptr: *mut f32,
) -> bool {
    unsafe { fill_interleaved("resonance_fill_interleaved_output_buffer_f32", handle, num_channels, num_frames, buffer_ptr) }
}

/// # Safety
/// As [`resonance_fill_interleaved_output_buffer_f32`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_fill_interleaved_output_buffer_i16(
    handle: ResonanceAudioApiHandle,
    num_channels: usize,
    num_frames: usize,
    buffer_ptr: *mut i16,
) -> bool {
    unsafe { fill_interleaved("resonance_fill_interleaved_output_buffer_i16", handle, num_channels, num_frames, buffer_ptr) }
}

/// # Safety
/// `buffer_ptr` must point at `num_channels` pointers, each valid for `num_frames` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_fill_planar_output_buffer_f32(
    handle: ResonanceAudioApiHandle,
    num_channels: usize,
    num_frames: usize,
    buffer_ptr: *const *mut f32,
) -> bool {
    unsafe { fill_planar("resonance_fill_planar_output_buffer_f32", handle, num_channels, num_frames, buffer_ptr) }
}

/// # Safety
/// As [`resonance_fill_planar_output_buffer_f32`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_fill_planar_output_buffer_i16(
    handle: ResonanceAudioApiHandle,
    num_channels: usize,
    num_frames: usize,
    buffer_ptr: *const *mut i16,
) -> bool {
    unsafe { fill_planar("resonance_fill_planar_output_buffer_i16", handle, num_channels, num_frames, buffer_ptr) }
}

unsafe fn fill_interleaved<S: resonance::Sample>(
    entry: &'static str,
    handle: ResonanceAudioApiHandle,
    num_channels: usize,
    num_frames: usize,
    buffer_ptr: *mut S,
) -> bool {
    let Some(session) = (unsafe { session(handle) }) else {
        return false;
    };
    guard(entry, false, || {
        let result = check_output(session, num_channels, num_frames)
            .and_then(|()| buffer::interleaved_len(num_channels, num_frames))
            .and_then(|len| unsafe { slice_mut(buffer_ptr, len) }.ok_or(BufferError::NullChannel(0)))
            .map_err(RenderError::from)
            .and_then(|out| session.render_interleaved(num_channels, num_frames, out));
        rendered(entry, result)
    })
}

unsafe fn fill_planar<S: resonance::Sample>(
    entry: &'static str,
    handle: ResonanceAudioApiHandle,
    num_channels: usize,
    num_frames: usize,
    buffer_ptr: *const *mut S,
) -> bool {
    let Some(session) = (unsafe { session(handle) }) else {
        return false;
    };
    guard(entry, false, || {
        let result = check_output(session, num_channels, num_frames)
            .and_then(|()| unsafe {
                with_planar_mut(buffer_ptr, num_channels, num_frames, |out| {
                    session.render_planar(num_channels, num_frames, out)
                })
            })
            .map_err(RenderError::from)
            .and_then(|inner| inner);
        rendered(entry, result)
    })
}

// ---- listener ----

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_head_position(handle: ResonanceAudioApiHandle, x: f32, y: f32, z: f32) {
    if let Some(s) = unsafe { session(handle) } {
        guard("resonance_set_head_position", (), || s.set_head_position(x, y, z));
    }
}

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_head_rotation(handle: ResonanceAudioApiHandle, x: f32, y: f32, z: f32, w: f32) {
    if let Some(s) = unsafe { session(handle) } {
        guard("resonance_set_head_rotation", (), || s.set_head_rotation(x, y, z, w));
    }
}

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_master_volume(handle: ResonanceAudioApiHandle, volume: f32) {
    if let Some(s) = unsafe { session(handle) } {
        guard("resonance_set_master_volume", (), || s.set_master_volume(volume));
    }
}

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_stereo_speaker_mode(handle: ResonanceAudioApiHandle, enabled: bool) {
    if let Some(s) = unsafe { session(handle) } {
        guard("resonance_set_stereo_speaker_mode", (), || s.set_stereo_speaker_mode(enabled));
    }
}

// ---- source registry ----

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_create_ambisonic_source(handle: ResonanceAudioApiHandle, num_channels: usize) -> c_int {
    match unsafe { session(handle) } {
        Some(s) => guard("resonance_create_ambisonic_source", INVALID_SOURCE_ID, || s.create_ambisonic_source(num_channels)),
        None => INVALID_SOURCE_ID,
    }
}

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_create_stereo_source(handle: ResonanceAudioApiHandle, num_channels: usize) -> c_int {
    match unsafe { session(handle) } {
        Some(s) => guard("resonance_create_stereo_source", INVALID_SOURCE_ID, || s.create_stereo_source(num_channels)),
        None => INVALID_SOURCE_ID,
    }
}

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_create_sound_object_source(handle: ResonanceAudioApiHandle, rendering_mode: c_int) -> c_int {
    let Some(s) = (unsafe { session(handle) }) else {
        return INVALID_SOURCE_ID;
    };
    let Ok(mode) = RenderingMode::try_from(rendering_mode) else {
        tracing::warn!(rendering_mode, "unknown rendering mode");
        return INVALID_SOURCE_ID;
    };
    guard("resonance_create_sound_object_source", INVALID_SOURCE_ID, || s.create_sound_object_source(mode))
}

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_destroy_source(handle: ResonanceAudioApiHandle, source_id: c_int) {
    if let Some(s) = unsafe { session(handle) } {
        guard("resonance_destroy_source", (), || s.destroy_source(source_id));
    }
}

// ---- source input ----

fn check_input(session: &Session, source_id: c_int, num_channels: usize, num_frames: usize) -> Result<(), SourceError> {
    let kind = session.source_kind(source_id).ok_or(SourceError::UnknownSource(source_id))?;
    if num_channels != kind.num_channels() {
        return Err(BufferError::ChannelMismatch { expected: kind.num_channels(), actual: num_channels }.into());
    }
    if num_frames != session.frames_per_buffer() {
        return Err(BufferError::FrameMismatch { expected: session.frames_per_buffer(), actual: num_frames }.into());
    }
    Ok(())
}

fn submitted(entry: &'static str, source_id: c_int, result: Result<(), SourceError>) {
    match result {
        Ok(()) => {}
        Err(SourceError::UnknownSource(_)) => tracing::debug!(entry, source_id, "input ignored for unknown source"),
        Err(error) => tracing::warn!(entry, source_id, %error, "source input rejected"),
    }
}

unsafe fn set_interleaved<S: resonance::Sample>(
    entry: &'static str,
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    audio_buffer_ptr: *const S,
    num_channels: usize,
    num_frames: usize,
) {
    let Some(session) = (unsafe { session(handle) }) else {
        return;
    };
    guard(entry, (), || {
        let result = check_input(session, source_id, num_channels, num_frames)
            .and_then(|()| buffer::interleaved_len(num_channels, num_frames).map_err(SourceError::from))
            .and_then(|len| unsafe { slice(audio_buffer_ptr, len) }.ok_or(SourceError::from(BufferError::NullChannel(0))))
            .and_then(|audio| session.try_set_interleaved_buffer(source_id, audio, num_channels, num_frames));
        submitted(entry, source_id, result);
    });
}

unsafe fn set_planar<S: resonance::Sample>(
    entry: &'static str,
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    audio_buffer_ptr: *const *const S,
    num_channels: usize,
    num_frames: usize,
) {
    let Some(session) = (unsafe { session(handle) }) else {
        return;
    };
    guard(entry, (), || {
        let result = check_input(session, source_id, num_channels, num_frames)
            .and_then(|()| unsafe {
                with_planar(audio_buffer_ptr, num_channels, num_frames, |channels| {
                    session.try_set_planar_buffer(source_id, channels, num_channels, num_frames)
                })
                .map_err(SourceError::from)
            })
            .and_then(|inner| inner);
        submitted(entry, source_id, result);
    });
}

/// # Safety
/// `audio_buffer_ptr` must be valid for `num_channels * num_frames` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_interleaved_buffer_f32(
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    audio_buffer_ptr: *const f32,
    num_channels: usize,
    num_frames: usize,
) {
    unsafe { set_interleaved("resonance_set_interleaved_buffer_f32", handle, source_id, audio_buffer_ptr, num_channels, num_frames) }
}

/// # Safety
/// As [`resonance_set_interleaved_buffer_f32`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_interleaved_buffer_i16(
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    audio_buffer_ptr: *const i16,
    num_channels: usize,
    num_frames: usize,
) {
    unsafe { set_interleaved("resonance_set_interleaved_buffer_i16", handle, source_id, audio_buffer_ptr, num_channels, num_frames) }
}

/// # Safety
/// `audio_buffer_ptr` must point at `num_channels` pointers, each valid for `num_frames` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_planar_buffer_f32(
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    audio_buffer_ptr: *const *const f32,
    num_channels: usize,
    num_frames: usize,
) {
    unsafe { set_planar("resonance_set_planar_buffer_f32", handle, source_id, audio_buffer_ptr, num_channels, num_frames) }
}

/// # Safety
/// As [`resonance_set_planar_buffer_f32`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_planar_buffer_i16(
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    audio_buffer_ptr: *const *const i16,
    num_channels: usize,
    num_frames: usize,
) {
    unsafe { set_planar("resonance_set_planar_buffer_i16", handle, source_id, audio_buffer_ptr, num_channels, num_frames) }
}

// ---- per-source parameters ----

macro_rules! source_setter {
    ($name:ident => $method:ident($($arg:ident: $ty:ty),*)) => {
        /// # Safety
        /// `handle` must be null or live.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(handle: ResonanceAudioApiHandle, source_id: c_int, $($arg: $ty),*) {
            if let Some(s) = unsafe { session(handle) } {
                guard(stringify!($name), (), || s.$method(source_id, $($arg),*));
            }
        }
    };
}

source_setter!(resonance_set_source_distance_attenuation => set_source_distance_attenuation(distance_attenuation: f32));
source_setter!(resonance_set_source_position => set_source_position(x: f32, y: f32, z: f32));
source_setter!(resonance_set_source_room_effects_gain => set_source_room_effects_gain(room_effects_gain: f32));
source_setter!(resonance_set_source_rotation => set_source_rotation(x: f32, y: f32, z: f32, w: f32));
source_setter!(resonance_set_source_volume => set_source_volume(volume: f32));
source_setter!(resonance_set_sound_object_directivity => set_sound_object_directivity(alpha: f32, order: f32));
source_setter!(resonance_set_sound_object_listener_directivity => set_sound_object_listener_directivity(alpha: f32, order: f32));
source_setter!(resonance_set_sound_object_near_field_effect_gain => set_sound_object_near_field_effect_gain(gain: f32));
source_setter!(resonance_set_sound_object_occlusion_intensity => set_sound_object_occlusion_intensity(intensity: f32));
source_setter!(resonance_set_sound_object_spread => set_sound_object_spread(spread_deg: f32));

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_source_distance_model(
    handle: ResonanceAudioApiHandle,
    source_id: c_int,
    rolloff: c_int,
    min_distance: f32,
    max_distance: f32,
) {
    let Some(s) = (unsafe { session(handle) }) else {
        return;
    };
    let Ok(rolloff) = DistanceRolloffModel::try_from(rolloff) else {
        tracing::warn!(source_id, rolloff, "unknown distance rolloff model");
        return;
    };
    guard("resonance_set_source_distance_model", (), || {
        s.set_source_distance_model(source_id, rolloff, min_distance, max_distance)
    });
}

// ---- room ----

/// # Safety
/// `handle` must be null or live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_enable_room_effects(handle: ResonanceAudioApiHandle, enable: bool) {
    if let Some(s) = unsafe { session(handle) } {
        guard("resonance_enable_room_effects", (), || s.enable_room_effects(enable));
    }
}

/// Copies `*reflection_properties`; the pointer is not retained.
///
/// # Safety
/// `reflection_properties` must be null or point at a valid struct.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_reflection_properties(
    handle: ResonanceAudioApiHandle,
    reflection_properties: *const ReflectionProperties,
) {
    let (Some(s), Some(props)) = (unsafe { session(handle) }, unsafe { reflection_properties.as_ref() }) else {
        return;
    };
    guard("resonance_set_reflection_properties", (), || s.set_reflection_properties(props));
}

/// Copies `*reverb_properties`; the pointer is not retained.
///
/// # Safety
/// `reverb_properties` must be null or point at a valid struct.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_set_reverb_properties(
    handle: ResonanceAudioApiHandle,
    reverb_properties: *const ReverbProperties,
) {
    let (Some(s), Some(props)) = (unsafe { session(handle) }, unsafe { reverb_properties.as_ref() }) else {
        return;
    };
    guard("resonance_set_reverb_properties", (), || s.set_reverb_properties(props));
}

/// Copy the current reflection properties into `out`.
///
/// # Safety
/// `out` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_get_reflection_properties(
    handle: ResonanceAudioApiHandle,
    out: *mut ReflectionProperties,
) -> bool {
    let (Some(s), Some(out)) = (unsafe { session(handle) }, unsafe { out.as_mut() }) else {
        return false;
    };
    *out = s.reflection_properties();
    true
}

/// Copy the current reverb properties into `out`.
///
/// # Safety
/// `out` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn resonance_get_reverb_properties(handle: ResonanceAudioApiHandle, out: *mut ReverbProperties) -> bool {
    let (Some(s), Some(out)) = (unsafe { session(handle) }, unsafe { out.as_mut() }) else {
        return false;
    };
    *out = s.reverb_properties();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn null_handle_is_inert() {
        let null = ptr::null_mut();
        unsafe {
            resonance_destroy_api(null);
            resonance_set_master_volume(null, 0.5);
            resonance_set_source_volume(null, 0, 0.5);
            assert_eq!(resonance_create_stereo_source(null, 2), -1);
            assert_eq!(resonance_create_sound_object_source(null, 0), -1);
            let mut out = [0.0f32; 4];
            assert!(!resonance_fill_interleaved_output_buffer_f32(null, 2, 2, out.as_mut_ptr()));
            let mut props = ReverbProperties::default();
            assert!(!resonance_get_reverb_properties(null, &mut props));
        }
    }

    #[test]
    fn create_rejects_bad_parameters() {
        assert!(resonance_create_api(2, 0, 48000).is_null());
        assert!(resonance_create_api(2, 64, 0).is_null());
        assert!(resonance_create_api(2, usize::MAX, 48000).is_null());
        assert!(resonance_create_api(2, 64, c_int::MAX).is_null());
        let handle = resonance_create_api(2, 64, 48000);
        assert!(!handle.is_null());
        unsafe { resonance_destroy_api(handle) };
    }

    #[test]
    fn out_of_range_enums_are_rejected() {
        let handle = resonance_create_api(2, 64, 48000);
        unsafe {
            assert_eq!(resonance_create_sound_object_source(handle, 5), -1);
            assert_eq!(resonance_create_sound_object_source(handle, -1), -1);
            let id = resonance_create_sound_object_source(handle, 4);
            assert_eq!(id, 0);
            resonance_set_source_distance_model(handle, id, 3, 1.0, 2.0);
            let session = session(handle).expect("live");
            assert_eq!(session.source_params(id).map(|p| p.rolloff), Some(DistanceRolloffModel::Logarithmic));
            resonance_set_source_distance_model(handle, id, 1, 1.0, 2.0);
            assert_eq!(session.source_params(id).map(|p| p.rolloff), Some(DistanceRolloffModel::Linear));
            resonance_destroy_api(handle);
        }
    }

    #[test]
    fn null_buffers_fail_cleanly() {
        let handle = resonance_create_api(2, 8, 48000);
        unsafe {
            let id = resonance_create_stereo_source(handle, 2);
            resonance_set_interleaved_buffer_f32(handle, id, ptr::null(), 2, 8);
            resonance_set_planar_buffer_i16(handle, id, ptr::null(), 2, 8);
            assert!(!resonance_fill_interleaved_output_buffer_i16(handle, 2, 8, ptr::null_mut()));
            assert!(!resonance_fill_planar_output_buffer_f32(handle, 2, 8, ptr::null()));
            resonance_set_reverb_properties(handle, ptr::null());
            resonance_destroy_api(handle);
        }
    }
}
