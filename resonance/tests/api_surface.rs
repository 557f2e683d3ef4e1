use resonance::{
    DistanceRolloffModel, INVALID_SOURCE_ID, ReflectionProperties, RenderingMode, ReverbProperties, Session,
    SessionConfig,
};

fn make_reflection_props() -> ReflectionProperties {
    ReflectionProperties {
        room_position: [0.0, 0.0, 0.0],
        room_rotation: [0.0, 0.0, 0.0, 1.0],
        room_dimensions: [10.0, 10.0, 3.0],
        cutoff_frequency: 2000.0,
        coefficients: [0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        gain: 1.0,
    }
}

fn make_reverb_props() -> ReverbProperties {
    ReverbProperties { rt60_values: [0.2; 9], gain: 0.5 }
}

fn make_session() -> Session {
    Session::new(2, 64, 48000).expect("failed to create session")
}

#[test]
fn test_create_reports_shape() {
    let session = make_session();
    assert_eq!(session.num_channels(), 2);
    assert_eq!(session.frames_per_buffer(), 64);
    assert_eq!(session.sample_rate_hz(), 48000);
    assert_eq!(session.num_live_sources(), 0);
}

#[test]
fn test_create_rejects_unsupported_parameters() {
    assert!(Session::new(0, 64, 48000).is_err());
    assert!(Session::new(2, 64, 0).is_err());
    assert!(Session::with_config(SessionConfig::new(2, 64, 48000).with_max_sources(0)).is_err());
}

#[test]
fn test_example_scenario() {
    let session = Session::new(2, 512, 48000).expect("session");
    let stereo = session.create_stereo_source(2);
    assert_eq!(stereo, 0);
    session.set_source_volume(stereo, 0.5);
    let mut out = vec![0.0f32; 1024];
    assert!(session.fill_interleaved_f32(2, 512, &mut out));
    assert!(out.iter().all(|s| s.is_finite()));
}

#[test]
fn test_head_and_global_settings() {
    let session = make_session();
    session.set_head_position(1.0, 2.0, 3.0);
    session.set_head_rotation(0.0, 0.0, 0.0, 1.0);
    session.set_master_volume(0.8);
    session.set_stereo_speaker_mode(true);
    let listener = session.listener();
    assert_eq!(listener.head_position.to_array(), [1.0, 2.0, 3.0]);
    assert_eq!(listener.master_volume, 0.8);
    assert!(listener.stereo_speaker_mode);
    let mut out = vec![0.0f32; 128];
    assert!(session.fill_interleaved_f32(2, 64, &mut out));
}

#[test]
fn test_ambisonic_source() {
    let session = make_session();
    let amb = session.create_ambisonic_source(4);
    assert!(amb >= 0);
    session.set_source_distance_attenuation(amb, 0.5);
    session.set_source_distance_model(amb, DistanceRolloffModel::Logarithmic, 1.0, 100.0);
    session.set_source_position(amb, 0.0, 0.0, 1.0);
    session.set_source_room_effects_gain(amb, 1.0);
    session.set_source_rotation(amb, 0.0, 0.0, 0.0, 1.0);
    session.set_source_volume(amb, 0.9);
    session.set_sound_object_directivity(amb, 0.5, 1.0);
    session.set_sound_object_listener_directivity(amb, 0.4, 1.0);
    session.set_sound_object_near_field_effect_gain(amb, 0.2);
    session.set_sound_object_occlusion_intensity(amb, 0.1);
    session.set_sound_object_spread(amb, 30.0);
    let params = session.source_params(amb).expect("live");
    assert_eq!(params.distance_attenuation, 0.5);
    assert_eq!(params.listener_directivity.alpha, 0.4);
    assert_eq!(params.spread_deg, 30.0);
    session.destroy_source(amb);
    assert!(!session.is_source_live(amb));
}

#[test]
fn test_ambisonic_channel_counts() {
    let session = make_session();
    for ok in [4, 9, 16] {
        assert!(session.create_ambisonic_source(ok) >= 0, "{ok} channels");
    }
    for bad in [0, 1, 3, 5, 8, 25] {
        assert_eq!(session.create_ambisonic_source(bad), INVALID_SOURCE_ID, "{bad} channels");
    }
    assert_eq!(session.num_live_sources(), 3);
}

#[test]
fn test_stereo_source() {
    let session = make_session();
    let stereo = session.create_stereo_source(2);
    assert!(stereo >= 0);
    assert!(session.set_interleaved_buffer_f32(stereo, &vec![0.0f32; 2 * 64], 2, 64));
    assert!(session.set_interleaved_buffer_i16(stereo, &vec![0i16; 2 * 64], 2, 64));
    session.destroy_source(stereo);
}

#[test]
fn test_sound_object_source() {
    let session = make_session();
    for mode in [
        RenderingMode::StereoPanning,
        RenderingMode::BinauralLowQuality,
        RenderingMode::BinauralMediumQuality,
        RenderingMode::BinauralHighQuality,
        RenderingMode::RoomEffectsOnly,
    ] {
        let obj = session.create_sound_object_source(mode);
        assert!(obj >= 0);
        session.destroy_source(obj);
    }
}

#[test]
fn test_ids_are_distinct_and_reuse_changes_them() {
    let session = make_session();
    let a = session.create_sound_object_source(RenderingMode::StereoPanning);
    let b = session.create_stereo_source(2);
    let c = session.create_ambisonic_source(4);
    assert_eq!(a, 0);
    assert!(a != b && b != c && a != c);

    session.destroy_source(a);
    let d = session.create_stereo_source(1);
    assert!(d >= 0);
    assert_ne!(d, a);
    assert_eq!(d, 65536);

    // the stale id must not touch the new occupant of its slot
    session.set_source_volume(a, 0.0);
    session.destroy_source(a);
    assert!(session.is_source_live(d));
    assert_eq!(session.source_params(d).map(|p| p.volume), Some(1.0));
}

#[test]
fn test_double_destroy_and_unknown_ids() {
    let session = make_session();
    let id = session.create_stereo_source(2);
    session.destroy_source(id);
    session.destroy_source(id);
    session.destroy_source(INVALID_SOURCE_ID);
    session.destroy_source(999_999);
    session.set_source_position(id, 1.0, 1.0, 1.0);
    assert!(!session.set_interleaved_buffer_f32(id, &vec![0.0f32; 128], 2, 64));
    assert_eq!(session.num_live_sources(), 0);
}

#[test]
fn test_capacity_exhaustion() {
    let session = Session::with_config(SessionConfig::new(2, 64, 48000).with_max_sources(3)).expect("session");
    let ids: Vec<_> = (0..3).map(|_| session.create_sound_object_source(RenderingMode::StereoPanning)).collect();
    assert!(ids.iter().all(|id| *id >= 0));
    assert_eq!(session.create_stereo_source(2), INVALID_SOURCE_ID);
    session.destroy_source(ids[1]);
    assert!(session.create_stereo_source(2) >= 0);
}

#[test]
fn test_room_effects() {
    let session = make_session();
    session.enable_room_effects(true);
    session.set_reflection_properties(&make_reflection_props());
    session.set_reverb_properties(&make_reverb_props());
    assert!(session.room_effects_enabled());
    assert_eq!(session.reflection_properties(), make_reflection_props());
    assert_eq!(session.reverb_properties(), make_reverb_props());

    let mut out = vec![0.0f32; 128];
    assert!(session.fill_interleaved_f32(2, 64, &mut out));
    // still exact silence: no sources feed the room
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn test_session_destruction_with_live_sources() {
    for _ in 0..10 {
        let session = make_session();
        session.set_master_volume(0.5);
        let _ = session.create_stereo_source(2);
        let _ = session.create_sound_object_source(RenderingMode::BinauralHighQuality);
        drop(session);
    }
}
