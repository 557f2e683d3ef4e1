use glam::Vec3;
use resonance_audio_engine::{
    AudioBlock, DistanceRolloffModel, RenderingEngine, RenderingMode, Renderer, ReverbProperties, SourceKind,
    SourceParams,
};

const FRAMES: usize = 128;

fn mono_block(value: f32) -> AudioBlock {
    let mut block = AudioBlock::new(1, FRAMES);
    block.channel_mut(0).fill(value);
    block
}

fn peak(out: &[f32], channel: usize) -> f32 {
    out.iter().skip(channel).step_by(2).fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn sound_object_on_the_left_is_louder_left() {
    let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
    let id = r.create_source(SourceKind::SoundObject { mode: RenderingMode::StereoPanning }).expect("source");
    let params = SourceParams { position: Vec3::new(-3.0, 0.0, 0.0), ..Default::default() };
    r.set_source_params(id, &params);
    r.set_source_buffer(id, &mono_block(0.5));

    let mut out = vec![0.0f32; 2 * FRAMES];
    assert!(r.fill_interleaved(&mut out));
    assert!(peak(&out, 0) > peak(&out, 1));
    assert!(out.iter().all(|s| s.is_finite()));
}

#[test]
fn speaker_mode_removes_the_binaural_head_shadow() {
    let render = |speakers: bool| {
        let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
        r.set_stereo_speaker_mode(speakers);
        assert_eq!(r.stereo_speaker_mode(), speakers);
        let id = r.create_source(SourceKind::SoundObject { mode: RenderingMode::BinauralHighQuality }).expect("source");
        r.set_source_params(id, &SourceParams { position: Vec3::new(-3.0, 0.0, -1.0), ..Default::default() });
        r.set_source_buffer(id, &mono_block(0.5));
        let mut out = vec![0.0f32; 2 * FRAMES];
        assert!(r.fill_interleaved(&mut out));
        out
    };
    let headphones = render(false);
    let speakers = render(true);
    assert!((peak(&headphones, 0) - peak(&speakers, 0)).abs() < 1e-6);
    assert!(peak(&speakers, 1) > peak(&headphones, 1));
}

#[test]
fn master_volume_scales_output() {
    let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
    let id = r.create_source(SourceKind::Stereo { num_channels: 2 }).expect("source");
    let mut block = AudioBlock::new(2, FRAMES);
    block.channel_mut(0).fill(0.8);
    block.channel_mut(1).fill(0.8);

    r.set_master_volume(0.5);
    r.set_source_buffer(id, &block);
    let mut left = vec![0.0f32; FRAMES];
    let mut right = vec![0.0f32; FRAMES];
    {
        let mut planar: Vec<&mut [f32]> = vec![&mut left[..], &mut right[..]];
        assert!(r.fill_planar(&mut planar));
    }
    assert!(left.iter().all(|s| (*s - 0.4).abs() < 1e-6));
    assert!(right.iter().all(|s| (*s - 0.4).abs() < 1e-6));
}

#[test]
fn linear_rolloff_silences_past_max_distance() {
    let mut r = Renderer::new(2, FRAMES, 44100).expect("renderer");
    let id = r.create_source(SourceKind::SoundObject { mode: RenderingMode::BinauralHighQuality }).expect("source");
    let params = SourceParams {
        position: Vec3::new(0.0, 0.0, -50.0),
        rolloff: DistanceRolloffModel::Linear,
        min_distance: 1.0,
        max_distance: 10.0,
        ..Default::default()
    };
    r.set_source_params(id, &params);
    r.set_source_buffer(id, &mono_block(1.0));

    let mut out = vec![1.0f32; 2 * FRAMES];
    assert!(r.fill_interleaved(&mut out));
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn room_tail_follows_room_effects_only_source() {
    let mut r = Renderer::new(2, FRAMES, 8000).expect("renderer");
    r.enable_room_effects(true);
    r.set_reverb_properties(&ReverbProperties { rt60_values: [1.5; 9], gain: 1.0 });
    let id = r.create_source(SourceKind::SoundObject { mode: RenderingMode::RoomEffectsOnly }).expect("source");

    let mut impulse = AudioBlock::new(1, FRAMES);
    impulse.channel_mut(0)[0] = 1.0;
    r.set_source_buffer(id, &impulse);

    let mut heard = false;
    let mut out = vec![0.0f32; 2 * FRAMES];
    for _ in 0..8 {
        assert!(r.fill_interleaved(&mut out));
        heard |= out.iter().any(|s| *s != 0.0);
    }
    assert!(heard, "reverb tail should reach the output");
}

#[test]
fn destroying_the_last_source_cuts_the_room_tail() {
    let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
    r.enable_room_effects(true);
    r.set_reverb_properties(&ReverbProperties { rt60_values: [1.5; 9], gain: 1.0 });
    let id = r.create_source(SourceKind::SoundObject { mode: RenderingMode::StereoPanning }).expect("source");
    r.set_source_buffer(id, &mono_block(0.8));

    let mut out = vec![0.0f32; 2 * FRAMES];
    assert!(r.fill_interleaved(&mut out));
    r.destroy_source(id);
    assert_eq!(r.num_sources(), 0);

    // longer than the late delay lines, so a surviving tail would show up
    for _ in 0..32 {
        assert!(r.fill_interleaved(&mut out));
        assert!(out.iter().all(|s| *s == 0.0));
    }
}

#[test]
fn tail_keeps_ringing_while_a_source_is_live() {
    let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
    r.enable_room_effects(true);
    r.set_reverb_properties(&ReverbProperties { rt60_values: [1.5; 9], gain: 1.0 });
    let a = r.create_source(SourceKind::SoundObject { mode: RenderingMode::StereoPanning }).expect("source");
    let b = r.create_source(SourceKind::Stereo { num_channels: 2 }).expect("source");
    r.set_source_buffer(a, &mono_block(0.8));

    let mut out = vec![0.0f32; 2 * FRAMES];
    assert!(r.fill_interleaved(&mut out));
    r.destroy_source(a);
    let mut heard = false;
    for _ in 0..32 {
        assert!(r.fill_interleaved(&mut out));
        heard |= out.iter().any(|s| *s != 0.0);
    }
    assert!(heard);
    r.destroy_source(b);
}

#[test]
fn ambisonic_front_source_is_centred() {
    let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
    let id = r.create_source(SourceKind::Ambisonic { num_channels: 4 }).expect("source");
    // plane wave from the front: W and X only
    let mut block = AudioBlock::new(4, FRAMES);
    block.channel_mut(0).fill(0.5);
    block.channel_mut(3).fill(0.5);
    r.set_source_buffer(id, &block);

    let mut out = vec![0.0f32; 2 * FRAMES];
    assert!(r.fill_interleaved(&mut out));
    assert!((peak(&out, 0) - peak(&out, 1)).abs() < 1e-6);
    assert!(peak(&out, 0) > 0.0);
}

#[test]
fn ambisonic_left_source_favours_left() {
    let mut r = Renderer::new(2, FRAMES, 48000).expect("renderer");
    let id = r.create_source(SourceKind::Ambisonic { num_channels: 9 }).expect("source");
    let mut block = AudioBlock::new(9, FRAMES);
    block.channel_mut(0).fill(0.5);
    block.channel_mut(1).fill(0.5);
    r.set_source_buffer(id, &block);

    let mut out = vec![0.0f32; 2 * FRAMES];
    assert!(r.fill_interleaved(&mut out));
    assert!(peak(&out, 0) > peak(&out, 1));
}
