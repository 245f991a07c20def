//! World snapshot / checkpoint store
//!
//! Coarse, infrequent whole-world captures that bound how far back
//! fine-grained per-adapter history logically needs to reach. The store
//! is a ring bounded by both a maximum count and a byte budget; eviction
//! is oldest-first whichever bound is hit. Running out of room prunes,
//! it never errors.

use std::collections::VecDeque;

use bitflags::bitflags;

use crate::command::PlayerId;
use crate::snapshot::checksum;

bitflags! {
    /// Checkpoint state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CheckpointFlags: u8 {
        /// The capture completed and may be restored from.
        const VALID = 0b0000_0001;
        /// Covers the whole world rather than an owner's scope.
        const WORLD = 0b0000_0010;
    }
}

/// One whole-world capture.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    tick: u64,
    flags: CheckpointFlags,
    payload: Vec<u8>,
    checksum: u64,
    entity_count: u32,
    owner: Option<PlayerId>,
}

impl Checkpoint {
    /// A valid world-scoped checkpoint at `tick`.
    pub fn world(tick: u64, payload: Vec<u8>, entity_count: u32) -> Self {
        let payload_checksum = checksum(&payload);
        Self {
            tick,
            flags: CheckpointFlags::VALID | CheckpointFlags::WORLD,
            payload,
            checksum: payload_checksum,
            entity_count,
            owner: None,
        }
    }

    /// An owner-scoped checkpoint; usable only by a multi-actor resolver
    /// that matches `owner` (single-actor operation treats every valid
    /// checkpoint as usable).
    pub fn owned(tick: u64, payload: Vec<u8>, entity_count: u32, owner: PlayerId) -> Self {
        let payload_checksum = checksum(&payload);
        Self {
            tick,
            flags: CheckpointFlags::VALID,
            payload,
            checksum: payload_checksum,
            entity_count,
            owner: Some(owner),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn flags(&self) -> CheckpointFlags {
        self.flags
    }

    pub fn is_valid(&self) -> bool {
        self.flags.contains(CheckpointFlags::VALID)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    pub fn entity_count(&self) -> u32 {
        self.entity_count
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    pub fn byte_len(&self) -> usize {
        self.payload.len()
    }
}

/// Ring of checkpoints bounded by count and bytes.
#[derive(Debug)]
pub struct CheckpointStore {
    checkpoints: VecDeque<Checkpoint>,
    bytes: usize,
    interval: u64,
    max_count: usize,
    max_bytes: usize,
}

impl CheckpointStore {
    pub fn new(interval: u64, max_count: usize, max_bytes: usize) -> Self {
        Self {
            checkpoints: VecDeque::with_capacity(max_count.min(64)),
            bytes: 0,
            interval: interval.max(1),
            max_count,
            max_bytes,
        }
    }

    /// Whether a capture is due at this tick (fixed interval).
    pub fn due(&self, tick: u64) -> bool {
        tick > 0 && tick % self.interval == 0
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Insert a checkpoint, evicting oldest-first past either budget.
    pub fn insert(&mut self, checkpoint: Checkpoint) {
        while !self.checkpoints.is_empty()
            && (self.checkpoints.len() >= self.max_count.max(1)
                || self.bytes + checkpoint.byte_len() > self.max_bytes)
        {
            if let Some(evicted) = self.checkpoints.pop_front() {
                log::debug!(
                    "evicting checkpoint at tick {} ({} bytes)",
                    evicted.tick,
                    evicted.byte_len()
                );
                self.bytes -= evicted.byte_len();
            }
        }
        self.bytes += checkpoint.byte_len();
        self.checkpoints.push_back(checkpoint);
    }

    /// Greatest valid checkpoint tick at or before `target`.
    ///
    /// This anchors how far back per-adapter history needs to extend;
    /// the bound is advisory, not enforced on adapter buffers.
    pub fn try_get_checkpoint_tick(&self, target: u64) -> Option<u64> {
        self.checkpoints
            .iter()
            .rev()
            .find(|c| c.is_valid() && c.tick <= target)
            .map(|c| c.tick)
    }

    /// Checkpoint stored at exactly `tick`.
    pub fn get(&self, tick: u64) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.tick == tick)
    }

    /// Clear the VALID flag on a checkpoint. Returns whether it existed.
    pub fn invalidate(&mut self, tick: u64) -> bool {
        for checkpoint in &mut self.checkpoints {
            if checkpoint.tick == tick {
                checkpoint.flags.remove(CheckpointFlags::VALID);
                return true;
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    pub fn oldest_tick(&self) -> Option<u64> {
        self.checkpoints.front().map(|c| c.tick)
    }

    pub fn newest_tick(&self) -> Option<u64> {
        self.checkpoints.back().map(|c| c.tick)
    }
}
