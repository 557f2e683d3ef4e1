use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use crossbeam::queue::ArrayQueue;
use parking_lot::{Mutex, MutexGuard};
use resonance_audio_engine::{
    AudioBlock, EngineError, ReflectionProperties, RenderingEngine, RenderingMode, Renderer, ReverbProperties,
    SourceKind,
};

use crate::buffer::{self, BufferLayout, Sample};
use crate::config::SessionConfig;
use crate::error::{BufferError, RenderError, SessionError, SourceError};
use crate::params::{ListenerState, RoomState};
use crate::registry::{INVALID_SOURCE_ID, Registry, SourceEntry, SourceId};

/// State only the engine lock holder may touch.
struct EngineState {
    engine: Box<dyn RenderingEngine>,
    // Interleaved f32 block used when the caller's buffer needs conversion.
    scratch: Vec<f32>,
    applied_listener: Option<Arc<ListenerState>>,
    applied_room: Option<Arc<RoomState>>,
}

/// Replaced listener/room snapshots the render path may still hold.
/// Freed by the control path once it holds the last reference.
#[derive(Default)]
struct Retired {
    listeners: Vec<Arc<ListenerState>>,
    rooms: Vec<Arc<RoomState>>,
}

fn retire<T>(pending: &mut Vec<Arc<T>>, previous: Arc<T>) {
    pending.retain(|snapshot| Arc::strong_count(snapshot) > 1);
    if Arc::strong_count(&previous) > 1 {
        pending.push(previous);
    }
}

pub(crate) struct SessionInner {
    config: SessionConfig,
    num_channels: usize,
    frames_per_buffer: usize,
    sample_rate_hz: u32,
    engine: Mutex<EngineState>,
    pub(crate) registry: Registry,
    pub(crate) listener: ArcSwap<ListenerState>,
    pub(crate) room: ArcSwap<RoomState>,
    retired: Mutex<Retired>,
    block_pool: ArrayQueue<Arc<AudioBlock>>,
    // Consumed blocks the render path could not pool; reused before the pool.
    spilled_blocks: ArrayQueue<Arc<AudioBlock>>,
    dropped_blocks: AtomicU64,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        tracing::info!(live_sources = self.registry.len(), "resonance session destroyed");
    }
}

/// One rendering context: a Rendering Engine plus the source registry and
/// the listener/room state that drive it.
///
/// Cloning is cheap and every clone addresses the same engine. The session
/// is torn down when the last clone (and the last [`Source`](crate::Source))
/// is dropped.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    /// Session backed by the bundled reference [`Renderer`].
    pub fn new(num_channels: usize, frames_per_buffer: usize, sample_rate_hz: i32) -> Result<Self, SessionError> {
        Self::with_config(SessionConfig::new(num_channels, frames_per_buffer, sample_rate_hz))
    }

    pub fn with_config(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let engine = Renderer::new(config.num_channels, config.frames_per_buffer, config.sample_rate_hz)?;
        Self::with_engine(engine, config)
    }

    /// Session driving a caller-supplied engine. The engine's shape must match `config`.
    pub fn with_engine<E: RenderingEngine>(engine: E, config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        if config.sample_rate_hz <= 0 {
            return Err(EngineError::InvalidSampleRate(config.sample_rate_hz).into());
        }
        let checks = [
            ("output channels", config.num_channels, engine.num_channels()),
            ("frames per buffer", config.frames_per_buffer, engine.frames_per_buffer()),
            ("Hz sample rate", config.sample_rate_hz as usize, engine.sample_rate_hz() as usize),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(SessionError::EngineMismatch { what, expected, actual });
            }
        }

        let scratch_len = buffer::interleaved_len(config.num_channels, config.frames_per_buffer)?;
        tracing::info!(
            num_channels = config.num_channels,
            frames_per_buffer = config.frames_per_buffer,
            sample_rate_hz = config.sample_rate_hz,
            max_sources = config.max_sources,
            "resonance session created"
        );
        let inner = SessionInner {
            num_channels: config.num_channels,
            frames_per_buffer: config.frames_per_buffer,
            sample_rate_hz: config.sample_rate_hz as u32,
            engine: Mutex::new(EngineState {
                engine: Box::new(engine),
                scratch: vec![0.0; scratch_len],
                applied_listener: None,
                applied_room: None,
            }),
            registry: Registry::new(config.max_sources),
            listener: ArcSwap::from_pointee(ListenerState::default()),
            room: ArcSwap::from_pointee(RoomState::default()),
            retired: Mutex::new(Retired::default()),
            block_pool: ArrayQueue::new(config.input_block_pool),
            spilled_blocks: ArrayQueue::new(config.max_sources),
            dropped_blocks: AtomicU64::new(0),
            config,
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn num_channels(&self) -> usize {
        self.inner.num_channels
    }

    pub fn frames_per_buffer(&self) -> usize {
        self.inner.frames_per_buffer
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.inner.sample_rate_hz
    }

    pub fn num_live_sources(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_source_live(&self, id: SourceId) -> bool {
        self.inner.registry.get(id).is_some()
    }

    pub fn source_kind(&self, id: SourceId) -> Option<SourceKind> {
        self.inner.registry.get(id).map(|entry| entry.kind)
    }

    /// Input blocks freed because the recycling pool was full.
    pub fn dropped_input_blocks(&self) -> u64 {
        self.inner.dropped_blocks.load(Ordering::Relaxed)
    }

    // ---- listener ----

    pub fn listener(&self) -> ListenerState {
        **self.inner.listener.load()
    }

    pub fn set_head_position(&self, x: f32, y: f32, z: f32) {
        self.update_listener(|l| l.head_position = glam::Vec3::new(x, y, z));
    }

    pub fn set_head_rotation(&self, x: f32, y: f32, z: f32, w: f32) {
        self.update_listener(|l| l.head_rotation = glam::Quat::from_xyzw(x, y, z, w));
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.update_listener(|l| l.master_volume = volume);
    }

    pub fn set_stereo_speaker_mode(&self, enabled: bool) {
        self.update_listener(|l| l.stereo_speaker_mode = enabled);
    }

    fn update_listener(&self, f: impl Fn(&mut ListenerState)) {
        let previous = self.inner.listener.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
        retire(&mut self.inner.retired.lock().listeners, previous);
    }

    // ---- room ----

    pub fn room(&self) -> RoomState {
        **self.inner.room.load()
    }

    pub fn enable_room_effects(&self, enable: bool) {
        self.update_room(|r| r.enabled = enable);
    }

    pub fn room_effects_enabled(&self) -> bool {
        self.inner.room.load().enabled
    }

    pub fn set_reflection_properties(&self, props: &ReflectionProperties) {
        self.update_room(|r| r.reflection = *props);
    }

    pub fn reflection_properties(&self) -> ReflectionProperties {
        self.inner.room.load().reflection
    }

    pub fn set_reverb_properties(&self, props: &ReverbProperties) {
        self.update_room(|r| r.reverb = *props);
    }

    pub fn reverb_properties(&self) -> ReverbProperties {
        self.inner.room.load().reverb
    }

    fn update_room(&self, f: impl Fn(&mut RoomState)) {
        let previous = self.inner.room.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
        retire(&mut self.inner.retired.lock().rooms, previous);
    }

    // ---- source lifecycle ----

    /// Create a source of `kind`, reporting why creation failed.
    pub fn try_create_source(&self, kind: SourceKind) -> Result<SourceId, SourceError> {
        let mut state = self.inner.engine.lock();
        let registry = &self.inner.registry;
        let (slot, id) = registry.reserve().ok_or(SourceError::CapacityExhausted { max_sources: registry.capacity() })?;
        let engine_id = match state.engine.create_source(kind) {
            Ok(engine_id) => engine_id,
            Err(error) => {
                registry.cancel(slot);
                return Err(error.into());
            }
        };
        registry.insert(slot, Arc::new(SourceEntry::new(id, engine_id, kind)));
        drop(state);
        tracing::debug!(id, ?kind, "source created");
        Ok(id)
    }

    fn create_or_sentinel(&self, kind: SourceKind) -> SourceId {
        match self.try_create_source(kind) {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(%error, ?kind, "source creation failed");
                INVALID_SOURCE_ID
            }
        }
    }

    /// Ambisonic source with `num_channels = (order + 1)^2`; `-1` on failure.
    pub fn create_ambisonic_source(&self, num_channels: usize) -> SourceId {
        self.create_or_sentinel(SourceKind::Ambisonic { num_channels })
    }

    /// Non-spatialized stereo source; `-1` on failure.
    pub fn create_stereo_source(&self, num_channels: usize) -> SourceId {
        self.create_or_sentinel(SourceKind::Stereo { num_channels })
    }

    /// Mono point source rendered with `mode`; `-1` on failure.
    pub fn create_sound_object_source(&self, mode: RenderingMode) -> SourceId {
        self.create_or_sentinel(SourceKind::SoundObject { mode })
    }

    /// Destroy `id`. Unknown, stale and already destroyed ids are ignored.
    pub fn destroy_source(&self, id: SourceId) {
        let mut state = self.inner.engine.lock();
        let Some(entry) = self.inner.registry.remove(id) else {
            drop(state);
            tracing::debug!(id, "destroy ignored for unknown source");
            return;
        };
        state.engine.destroy_source(entry.engine_id);
        drop(state);
        if let Some(block) = entry.take_input() {
            self.recycle(block);
        }
        tracing::debug!(id, "source destroyed");
    }

    // ---- source input ----

    /// Queue interleaved input for the next rendered block of `id`.
    pub fn try_set_interleaved_buffer<S: Sample>(
        &self,
        id: SourceId,
        audio: &[S],
        num_channels: usize,
        num_frames: usize,
    ) -> Result<(), SourceError> {
        let entry = self.inner.registry.get(id).ok_or(SourceError::UnknownSource(id))?;
        self.check_input_shape(&entry, num_channels, num_frames)?;
        buffer::validate_interleaved(audio.len(), num_channels, num_frames)?;
        let mut block = self.take_block();
        buffer::deinterleave_into(audio, num_channels, num_frames, Arc::make_mut(&mut block));
        self.publish_input(&entry, block);
        Ok(())
    }

    /// Queue planar input (one region per channel) for the next rendered block of `id`.
    pub fn try_set_planar_buffer<S: Sample>(
        &self,
        id: SourceId,
        channels: &[&[S]],
        num_channels: usize,
        num_frames: usize,
    ) -> Result<(), SourceError> {
        let entry = self.inner.registry.get(id).ok_or(SourceError::UnknownSource(id))?;
        self.check_input_shape(&entry, num_channels, num_frames)?;
        buffer::validate_planar(channels.iter().map(|c| c.len()), num_channels, num_frames)?;
        let mut block = self.take_block();
        buffer::planar_into(channels, num_frames, Arc::make_mut(&mut block));
        self.publish_input(&entry, block);
        Ok(())
    }

    pub fn set_interleaved_buffer_f32(&self, id: SourceId, audio: &[f32], num_channels: usize, num_frames: usize) -> bool {
        report_input(id, self.try_set_interleaved_buffer(id, audio, num_channels, num_frames))
    }

    pub fn set_interleaved_buffer_i16(&self, id: SourceId, audio: &[i16], num_channels: usize, num_frames: usize) -> bool {
        report_input(id, self.try_set_interleaved_buffer(id, audio, num_channels, num_frames))
    }

    pub fn set_planar_buffer_f32(&self, id: SourceId, channels: &[&[f32]], num_channels: usize, num_frames: usize) -> bool {
        report_input(id, self.try_set_planar_buffer(id, channels, num_channels, num_frames))
    }

    pub fn set_planar_buffer_i16(&self, id: SourceId, channels: &[&[i16]], num_channels: usize, num_frames: usize) -> bool {
        report_input(id, self.try_set_planar_buffer(id, channels, num_channels, num_frames))
    }

    fn check_input_shape(&self, entry: &SourceEntry, num_channels: usize, num_frames: usize) -> Result<(), BufferError> {
        let expected = entry.kind.num_channels();
        if num_channels != expected {
            return Err(BufferError::ChannelMismatch { expected, actual: num_channels });
        }
        if num_frames != self.inner.frames_per_buffer {
            return Err(BufferError::FrameMismatch { expected: self.inner.frames_per_buffer, actual: num_frames });
        }
        Ok(())
    }

    fn take_block(&self) -> Arc<AudioBlock> {
        let inner = &self.inner;
        inner.spilled_blocks.pop().or_else(|| inner.block_pool.pop()).unwrap_or_else(|| Arc::new(AudioBlock::new(0, 0)))
    }

    fn publish_input(&self, entry: &SourceEntry, block: Arc<AudioBlock>) {
        // Latest input wins; an unrendered block goes back to the pool.
        if let Some(stale) = entry.submit_input(block) {
            self.recycle(stale);
        }
    }

    fn recycle(&self, block: Arc<AudioBlock>) {
        if self.inner.block_pool.push(block).is_err() {
            self.inner.dropped_blocks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Render-side recycling: a full pool spills instead of freeing.
    fn recycle_rendered(&self, block: Arc<AudioBlock>) {
        let Err(block) = self.inner.block_pool.push(block) else {
            return;
        };
        // Only fails when more writers than pooled blocks race one render.
        if self.inner.spilled_blocks.push(block).is_err() {
            self.inner.dropped_blocks.fetch_add(1, Ordering::Relaxed);
        }
    }

    // ---- rendering ----

    /// Render one block into an interleaved buffer of `num_channels * num_frames` samples.
    pub fn render_interleaved<S: Sample>(&self, num_channels: usize, num_frames: usize, out: &mut [S]) -> Result<(), RenderError> {
        self.check_output_shape(num_channels, num_frames)?;
        buffer::validate_interleaved(out.len(), num_channels, num_frames)?;
        let mut guard = self.lock_for_render()?;
        let state = &mut *guard;
        self.prepare_block(state);
        let filled = match S::as_f32_mut(out) {
            Some(direct) => state.engine.fill_interleaved(direct),
            None => {
                let filled = state.engine.fill_interleaved(&mut state.scratch);
                if filled {
                    buffer::convert_from_f32(&state.scratch, out);
                }
                filled
            }
        };
        if filled { Ok(()) } else { Err(RenderError::Engine) }
    }

    /// Render one block into `num_channels` regions of `num_frames` samples.
    pub fn render_planar<S: Sample>(&self, num_channels: usize, num_frames: usize, out: &mut [&mut [S]]) -> Result<(), RenderError> {
        self.check_output_shape(num_channels, num_frames)?;
        buffer::validate_planar(out.iter().map(|c| c.len()), num_channels, num_frames)?;
        let mut guard = self.lock_for_render()?;
        let state = &mut *guard;
        self.prepare_block(state);
        let filled = match S::as_f32_planar_mut(out) {
            Some(direct) => state.engine.fill_planar(direct),
            None => {
                let filled = state.engine.fill_interleaved(&mut state.scratch);
                if filled {
                    buffer::deinterleave_from_f32(&state.scratch, out);
                }
                filled
            }
        };
        if filled { Ok(()) } else { Err(RenderError::Engine) }
    }

    pub fn fill_interleaved_f32(&self, num_channels: usize, num_frames: usize, buffer: &mut [f32]) -> bool {
        report_render(BufferLayout::Interleaved, self.render_interleaved(num_channels, num_frames, buffer))
    }

    pub fn fill_interleaved_i16(&self, num_channels: usize, num_frames: usize, buffer: &mut [i16]) -> bool {
        report_render(BufferLayout::Interleaved, self.render_interleaved(num_channels, num_frames, buffer))
    }

    pub fn fill_planar_f32(&self, num_channels: usize, num_frames: usize, buffer: &mut [&mut [f32]]) -> bool {
        report_render(BufferLayout::Planar, self.render_planar(num_channels, num_frames, buffer))
    }

    pub fn fill_planar_i16(&self, num_channels: usize, num_frames: usize, buffer: &mut [&mut [i16]]) -> bool {
        report_render(BufferLayout::Planar, self.render_planar(num_channels, num_frames, buffer))
    }

    fn check_output_shape(&self, num_channels: usize, num_frames: usize) -> Result<(), BufferError> {
        if num_channels != self.inner.num_channels {
            return Err(BufferError::ChannelMismatch { expected: self.inner.num_channels, actual: num_channels });
        }
        if num_frames != self.inner.frames_per_buffer {
            return Err(BufferError::FrameMismatch { expected: self.inner.frames_per_buffer, actual: num_frames });
        }
        Ok(())
    }

    fn lock_for_render(&self) -> Result<MutexGuard<'_, EngineState>, RenderError> {
        self.inner.engine.try_lock_for(self.inner.config.render_lock_timeout).ok_or(RenderError::LockTimeout)
    }

    /// Forward everything published since the last block to the engine.
    fn prepare_block(&self, state: &mut EngineState) {
        let listener = self.inner.listener.load_full();
        if !state.applied_listener.as_ref().is_some_and(|applied| Arc::ptr_eq(applied, &listener)) {
            let engine = &mut state.engine;
            let p = listener.head_position;
            let q = listener.head_rotation;
            engine.set_head_position(p.x, p.y, p.z);
            engine.set_head_rotation(q.x, q.y, q.z, q.w);
            engine.set_master_volume(listener.master_volume);
            engine.set_stereo_speaker_mode(listener.stereo_speaker_mode);
            state.applied_listener = Some(listener);
        }

        let room = self.inner.room.load_full();
        if !state.applied_room.as_ref().is_some_and(|applied| Arc::ptr_eq(applied, &room)) {
            let previous = state.applied_room.take();
            let engine = &mut state.engine;
            if previous.as_ref().is_none_or(|p| p.reflection != room.reflection) {
                engine.set_reflection_properties(&room.reflection);
            }
            if previous.as_ref().is_none_or(|p| p.reverb != room.reverb) {
                engine.set_reverb_properties(&room.reverb);
            }
            if previous.as_ref().is_none_or(|p| p.enabled != room.enabled) {
                engine.enable_room_effects(room.enabled);
            }
            state.applied_room = Some(room);
        }

        for entry in self.inner.registry.live().iter() {
            if let Some(params) = entry.take_changed_params() {
                state.engine.set_source_params(entry.engine_id, &params);
            }
            if let Some(block) = entry.take_input() {
                state.engine.set_source_buffer(entry.engine_id, &block);
                self.recycle_rendered(block);
            }
        }
    }
}

fn report_input(id: SourceId, result: Result<(), SourceError>) -> bool {
    match result {
        Ok(()) => true,
        Err(SourceError::UnknownSource(_)) => {
            tracing::debug!(id, "input ignored for unknown source");
            false
        }
        Err(error) => {
            tracing::warn!(id, %error, "source input rejected");
            false
        }
    }
}

fn report_render(layout: BufferLayout, result: Result<(), RenderError>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%error, ?layout, "render fill failed");
            false
        }
    }
}
