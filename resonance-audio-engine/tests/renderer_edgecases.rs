use resonance_audio_engine::{AudioBlock, RenderingEngine, RenderingMode, Renderer, SourceKind, SourceParams};

#[test]
fn unknown_ids_are_ignored() {
    let mut r = Renderer::new(2, 16, 48000).expect("renderer");
    r.destroy_source(-1);
    r.destroy_source(42);
    r.set_source_params(7, &SourceParams::default());
    r.set_source_buffer(7, &AudioBlock::new(1, 16));
    assert_eq!(r.num_sources(), 0);

    let mut out = vec![0.0f32; 32];
    assert!(r.fill_interleaved(&mut out));
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn mismatched_input_block_is_dropped() {
    let mut r = Renderer::new(2, 16, 48000).expect("renderer");
    let id = r.create_source(SourceKind::SoundObject { mode: RenderingMode::StereoPanning }).expect("source");
    let mut wrong = AudioBlock::new(1, 8);
    wrong.channel_mut(0).fill(1.0);
    r.set_source_buffer(id, &wrong);

    let mut out = vec![0.0f32; 32];
    assert!(r.fill_interleaved(&mut out));
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn zero_head_rotation_falls_back_to_identity() {
    let mut r = Renderer::new(2, 16, 48000).expect("renderer");
    r.set_head_rotation(0.0, 0.0, 0.0, 0.0);
    assert_eq!(r.listener().rotation, glam::Quat::IDENTITY);
    r.set_head_rotation(0.0, 0.0, 0.0, 2.0);
    assert!((r.listener().rotation.w - 1.0).abs() < 1e-6);
}

#[test]
fn destroyed_source_stops_contributing() {
    let mut r = Renderer::new(2, 16, 48000).expect("renderer");
    let id = r.create_source(SourceKind::Stereo { num_channels: 1 }).expect("source");
    let mut block = AudioBlock::new(1, 16);
    block.channel_mut(0).fill(0.3);
    r.set_source_buffer(id, &block);
    r.destroy_source(id);

    let mut out = vec![0.0f32; 32];
    assert!(r.fill_interleaved(&mut out));
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn boxed_engine_is_an_engine() {
    let mut engine: Box<dyn RenderingEngine> = Box::new(Renderer::new(2, 16, 48000).expect("renderer"));
    assert_eq!(engine.num_channels(), 2);
    assert_eq!(engine.frames_per_buffer(), 16);
    assert_eq!(engine.sample_rate_hz(), 48000);
    let mut out = vec![0.0f32; 32];
    assert!(engine.fill_interleaved(&mut out));
}
