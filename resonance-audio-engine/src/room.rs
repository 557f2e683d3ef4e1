//! Minimal room model for the reference renderer: one early-reflection tap
//! and a feedback delay per output channel for the late tail.

use crate::types::{ReflectionProperties, ReverbProperties};

const SPEED_OF_SOUND: f32 = 343.0;
const MAX_DELAY_SECONDS: f32 = 0.5;
// Late-tail delay lengths, decorrelated between channels.
const LATE_DELAY_SECONDS: [f32; 2] = [0.0297, 0.0371];

struct DelayLine {
    buf: Vec<f32>,
    pos: usize,
    delay: usize,
}

impl DelayLine {
    fn new(capacity: usize) -> Self {
        Self { buf: vec![0.0; capacity.max(2)], pos: 0, delay: 1 }
    }

    fn set_delay(&mut self, samples: usize) {
        self.delay = samples.clamp(1, self.buf.len() - 1);
    }

    /// Push `input` plus `feedback` times the delayed output; returns the delayed output.
    fn tick(&mut self, input: f32, feedback: f32) -> f32 {
        let len = self.buf.len();
        let read = (self.pos + len - self.delay) % len;
        let out = self.buf[read];
        self.buf[self.pos] = input + feedback * out;
        self.pos = (self.pos + 1) % len;
        out
    }

    fn clear(&mut self) {
        self.buf.fill(0.0);
        self.pos = 0;
    }
}

pub struct RoomProcessor {
    enabled: bool,
    sample_rate: f32,
    reflection: ReflectionProperties,
    reverb: ReverbProperties,
    early: DelayLine,
    late: [DelayLine; 2],
    early_gain: f32,
    late_gain: f32,
    late_feedback: [f32; 2],
}

impl RoomProcessor {
    pub fn new(sample_rate_hz: u32) -> Self {
        let sample_rate = sample_rate_hz as f32;
        let capacity = (sample_rate * MAX_DELAY_SECONDS) as usize;
        let mut room = Self {
            enabled: false,
            sample_rate,
            reflection: ReflectionProperties::default(),
            reverb: ReverbProperties::default(),
            early: DelayLine::new(capacity),
            late: [DelayLine::new(capacity), DelayLine::new(capacity)],
            early_gain: 0.0,
            late_gain: 0.0,
            late_feedback: [0.0; 2],
        };
        room.recompute();
        room
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Drop any tail still circulating in the delay lines.
    pub fn reset(&mut self) {
        self.early.clear();
        self.late.iter_mut().for_each(DelayLine::clear);
    }

    pub fn reflection(&self) -> &ReflectionProperties {
        &self.reflection
    }

    pub fn reverb(&self) -> &ReverbProperties {
        &self.reverb
    }

    pub fn set_reflection(&mut self, props: &ReflectionProperties) {
        self.reflection = *props;
        self.recompute();
    }

    pub fn set_reverb(&mut self, props: &ReverbProperties) {
        self.reverb = *props;
        self.recompute();
    }

    fn recompute(&mut self) {
        let dims = self.reflection.room_dimensions;
        let mean_dim = (dims[0].abs() + dims[1].abs() + dims[2].abs()) / 3.0;
        self.early.set_delay((mean_dim / SPEED_OF_SOUND * self.sample_rate) as usize);
        let mean_coef = self.reflection.coefficients.iter().map(|c| c.clamp(0.0, 1.0)).sum::<f32>() / 6.0;
        self.early_gain = finite_or_zero(self.reflection.gain * mean_coef);

        let rt60 = self.reverb.rt60_values.iter().map(|v| v.max(0.0)).sum::<f32>() / 9.0;
        self.late_gain = finite_or_zero(self.reverb.gain);
        for (i, line) in self.late.iter_mut().enumerate() {
            let seconds = LATE_DELAY_SECONDS[i];
            line.set_delay((seconds * self.sample_rate) as usize);
            // g such that the loop decays 60 dB after rt60 seconds
            self.late_feedback[i] = if rt60 > 0.0 {
                finite_or_zero(10f32.powf(-3.0 * seconds / rt60)).min(0.999)
            } else {
                0.0
            };
        }
    }

    /// Add the room response to `input` into `left`/`right`.
    pub fn process(&mut self, input: &[f32], left: &mut [f32], right: &mut [f32]) {
        if !self.enabled {
            return;
        }
        for ((x, l), r) in input.iter().zip(left.iter_mut()).zip(right.iter_mut()) {
            let early = self.early.tick(*x, 0.0) * self.early_gain;
            let tail_l = self.late[0].tick(*x, self.late_feedback[0]) * self.late_gain;
            let tail_r = self.late[1].tick(*x, self.late_feedback[1]) * self.late_gain;
            *l += early + tail_l;
            *r += early + tail_r;
        }
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}
