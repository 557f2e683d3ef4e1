//! Source registry: slot allocation, generation-checked ids and the live
//! list the render path iterates.
//!
//! Lookups (`get`) are lock-free. Mutations take a short allocator lock and
//! are additionally serialized by the session's engine lock, so the render
//! path never observes a half-registered source.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::{ArcSwap, ArcSwapOption, Guard};
use parking_lot::Mutex;
use resonance_audio_engine::{AudioBlock, EngineSourceId, SourceKind, SourceParams};

/// Public source identifier: `generation << 16 | slot`, never negative.
pub type SourceId = i32;

/// Returned by the creation calls when no source could be created.
pub const INVALID_SOURCE_ID: SourceId = -1;

/// Upper bound on `SessionConfig::max_sources`.
pub const MAX_SOURCES: usize = 0xFFFF;

const SLOT_BITS: u32 = 16;
const SLOT_MASK: u32 = 0xFFFF;
const GENERATION_MASK: u32 = 0x7FFF;

pub fn pack_id(slot: usize, generation: u16) -> SourceId {
    (((generation as u32 & GENERATION_MASK) << SLOT_BITS) | (slot as u32 & SLOT_MASK)) as SourceId
}

/// Split an id into `(slot, generation)`; `None` for negative ids.
pub fn unpack_id(id: SourceId) -> Option<(usize, u16)> {
    if id < 0 {
        return None;
    }
    let raw = id as u32;
    Some(((raw & SLOT_MASK) as usize, ((raw >> SLOT_BITS) & GENERATION_MASK) as u16))
}

/// One live source as shared between the control and render paths.
pub(crate) struct SourceEntry {
    pub(crate) id: SourceId,
    pub(crate) engine_id: EngineSourceId,
    pub(crate) kind: SourceKind,
    params: ArcSwap<SourceParams>,
    version: AtomicU64,
    // Only touched by the render path, under the engine lock.
    applied_version: AtomicU64,
    input: ArcSwapOption<AudioBlock>,
}

impl SourceEntry {
    pub(crate) fn new(id: SourceId, engine_id: EngineSourceId, kind: SourceKind) -> Self {
        Self {
            id,
            engine_id,
            kind,
            params: ArcSwap::from_pointee(SourceParams::default()),
            // Ahead of `applied_version` so the first render forwards the defaults.
            version: AtomicU64::new(1),
            applied_version: AtomicU64::new(0),
            input: ArcSwapOption::empty(),
        }
    }

    pub(crate) fn params(&self) -> SourceParams {
        **self.params.load()
    }

    /// Publish a new parameter snapshot derived from the current one.
    pub(crate) fn update(&self, f: impl Fn(&mut SourceParams)) {
        self.params.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
        self.version.fetch_add(1, Ordering::Release);
    }

    /// The latest snapshot if it has not been handed to the engine yet.
    pub(crate) fn take_changed_params(&self) -> Option<SourceParams> {
        let version = self.version.load(Ordering::Acquire);
        if version == self.applied_version.load(Ordering::Relaxed) {
            return None;
        }
        self.applied_version.store(version, Ordering::Relaxed);
        Some(self.params())
    }

    /// Replace the pending input block, returning the one it displaced.
    pub(crate) fn submit_input(&self, block: Arc<AudioBlock>) -> Option<Arc<AudioBlock>> {
        self.input.swap(Some(block))
    }

    pub(crate) fn take_input(&self) -> Option<Arc<AudioBlock>> {
        self.input.swap(None)
    }
}

struct SlotAllocator {
    generations: Vec<u16>,
    free: Vec<usize>,
    next_unused: usize,
}

pub(crate) struct Registry {
    slots: Box<[ArcSwapOption<SourceEntry>]>,
    alloc: Mutex<SlotAllocator>,
    live: ArcSwap<Vec<Arc<SourceEntry>>>,
}

impl Registry {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_SOURCES);
        Self {
            slots: (0..capacity).map(|_| ArcSwapOption::empty()).collect(),
            alloc: Mutex::new(SlotAllocator { generations: vec![0; capacity], free: Vec::new(), next_unused: 0 }),
            live: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Pick a slot and the id it will carry. Recently freed slots are reused first.
    pub(crate) fn reserve(&self) -> Option<(usize, SourceId)> {
        let mut alloc = self.alloc.lock();
        let slot = match alloc.free.pop() {
            Some(slot) => slot,
            None if alloc.next_unused < self.slots.len() => {
                alloc.next_unused += 1;
                alloc.next_unused - 1
            }
            None => return None,
        };
        Some((slot, pack_id(slot, alloc.generations[slot])))
    }

    /// Give back a reserved slot that was never published.
    pub(crate) fn cancel(&self, slot: usize) {
        self.alloc.lock().free.push(slot);
    }

    pub(crate) fn insert(&self, slot: usize, entry: Arc<SourceEntry>) {
        self.slots[slot].store(Some(entry.clone()));
        self.live.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(entry.clone());
            next
        });
    }

    pub(crate) fn get(&self, id: SourceId) -> Option<Arc<SourceEntry>> {
        let (slot, _) = unpack_id(id)?;
        let entry = self.slots.get(slot)?.load_full()?;
        (entry.id == id).then_some(entry)
    }

    /// Unregister `id`; the slot's generation moves on so the id goes stale.
    pub(crate) fn remove(&self, id: SourceId) -> Option<Arc<SourceEntry>> {
        let (slot, generation) = unpack_id(id)?;
        let mut alloc = self.alloc.lock();
        let cell = self.slots.get(slot)?;
        if alloc.generations[slot] != generation || (*cell.load()).as_ref().map(|e| e.id) != Some(id) {
            return None;
        }
        let entry = cell.swap(None)?;
        alloc.generations[slot] = (generation + 1) & GENERATION_MASK as u16;
        alloc.free.push(slot);
        drop(alloc);

        self.live.rcu(|current| current.iter().filter(|e| e.id != id).cloned().collect::<Vec<_>>());
        Some(entry)
    }

    pub(crate) fn live(&self) -> Guard<Arc<Vec<Arc<SourceEntry>>>> {
        self.live.load()
    }

    pub(crate) fn len(&self) -> usize {
        self.live.load().len()
    }
}
