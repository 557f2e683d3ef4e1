//! Sample buffer marshaling: shape validation and format/layout conversion
//! between caller buffers and the engine's planar f32 blocks.

use resonance_audio_engine::AudioBlock;

use crate::error::BufferError;

/// Full-scale value used for 16-bit conversion in both directions.
const I16_SCALE: f32 = 32767.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    F32,
    I16,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::I16 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferLayout {
    /// One region, frame-major: `L R L R ...`.
    Interleaved,
    /// One region per channel.
    Planar,
}

/// A sample type the facade can marshal.
///
/// The `as_f32_*` hooks let the render path write straight into caller
/// buffers when no conversion is needed.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    const FORMAT: SampleFormat;

    fn to_f32(self) -> f32;
    fn from_f32(value: f32) -> Self;

    fn as_f32_mut(buf: &mut [Self]) -> Option<&mut [f32]>;
    fn as_f32_planar_mut<'a, 'b>(buf: &'a mut [&'b mut [Self]]) -> Option<&'a mut [&'b mut [f32]]>;
}

impl Sample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value
    }

    fn as_f32_mut(buf: &mut [Self]) -> Option<&mut [f32]> {
        Some(buf)
    }

    fn as_f32_planar_mut<'a, 'b>(buf: &'a mut [&'b mut [Self]]) -> Option<&'a mut [&'b mut [f32]]> {
        Some(buf)
    }
}

impl Sample for i16 {
    const FORMAT: SampleFormat = SampleFormat::I16;

    #[inline]
    fn to_f32(self) -> f32 {
        i16_to_f32(self)
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        f32_to_i16(value)
    }

    fn as_f32_mut(_buf: &mut [Self]) -> Option<&mut [f32]> {
        None
    }

    fn as_f32_planar_mut<'a, 'b>(_buf: &'a mut [&'b mut [Self]]) -> Option<&'a mut [&'b mut [f32]]> {
        None
    }
}

/// `round(clamp(x, -1, 1) * 32767)`. NaN maps to 0.
#[inline]
pub fn f32_to_i16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * I16_SCALE).round() as i16
}

/// `x / 32767`, clamped so `i16::MIN` still lands on -1.
#[inline]
pub fn i16_to_f32(value: i16) -> f32 {
    (value as f32 / I16_SCALE).clamp(-1.0, 1.0)
}

pub fn interleaved_len(num_channels: usize, num_frames: usize) -> Result<usize, BufferError> {
    num_channels.checked_mul(num_frames).ok_or(BufferError::Overflow { num_channels, num_frames })
}

pub fn validate_interleaved(len: usize, num_channels: usize, num_frames: usize) -> Result<(), BufferError> {
    let expected = interleaved_len(num_channels, num_frames)?;
    if len != expected {
        return Err(BufferError::LengthMismatch { expected, actual: len });
    }
    Ok(())
}

/// Validate planar regions given their lengths, one per channel.
pub fn validate_planar<I>(channel_lens: I, num_channels: usize, num_frames: usize) -> Result<(), BufferError>
where
    I: ExactSizeIterator<Item = usize>,
{
    if channel_lens.len() != num_channels {
        return Err(BufferError::ChannelMismatch { expected: num_channels, actual: channel_lens.len() });
    }
    for (channel, actual) in channel_lens.enumerate() {
        if actual != num_frames {
            return Err(BufferError::PlanarChannelLength { channel, expected: num_frames, actual });
        }
    }
    Ok(())
}

/// Copy interleaved samples into `block` as planar f32. Shape must already be validated.
pub fn deinterleave_into<S: Sample>(src: &[S], num_channels: usize, num_frames: usize, block: &mut AudioBlock) {
    block.reshape(num_channels, num_frames);
    for ch in 0..num_channels {
        let dst = block.channel_mut(ch);
        for (frame, out) in dst.iter_mut().enumerate() {
            *out = src[frame * num_channels + ch].to_f32();
        }
    }
}

/// Copy per-channel regions into `block`. Shape must already be validated.
pub fn planar_into<S: Sample>(channels: &[&[S]], num_frames: usize, block: &mut AudioBlock) {
    block.reshape(channels.len(), num_frames);
    for (ch, samples) in channels.iter().enumerate() {
        for (out, s) in block.channel_mut(ch).iter_mut().zip(samples.iter()) {
            *out = s.to_f32();
        }
    }
}

/// Element-wise conversion of interleaved f32 into `dst`.
pub fn convert_from_f32<S: Sample>(src: &[f32], dst: &mut [S]) {
    for (out, s) in dst.iter_mut().zip(src) {
        *out = S::from_f32(*s);
    }
}

/// Split interleaved f32 into per-channel regions of `S`.
pub fn deinterleave_from_f32<S: Sample>(src: &[f32], dst: &mut [&mut [S]]) {
    let num_channels = dst.len();
    for (ch, channel) in dst.iter_mut().enumerate() {
        for (frame, out) in channel.iter_mut().enumerate() {
            *out = S::from_f32(src[frame * num_channels + ch]);
        }
    }
}
