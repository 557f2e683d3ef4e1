//! Shared helpers for the cross-crate tests.

/// One block of a sine tone, interleaved across `num_channels`.
pub fn sine_block(num_channels: usize, num_frames: usize, freq_hz: f32, sample_rate_hz: u32, amplitude: f32) -> Vec<f32> {
    let step = std::f32::consts::TAU * freq_hz / sample_rate_hz as f32;
    (0..num_frames)
        .flat_map(|n| std::iter::repeat((n as f32 * step).sin() * amplitude).take(num_channels))
        .collect()
}

/// Sum of squares of the even (left) and odd (right) samples of a stereo block.
pub fn stereo_energy(interleaved: &[f32]) -> (f32, f32) {
    interleaved.chunks_exact(2).fold((0.0, 0.0), |(l, r), frame| (l + frame[0] * frame[0], r + frame[1] * frame[1]))
}
