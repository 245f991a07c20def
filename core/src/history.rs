//! Sliding-window history buffer
//!
//! Per-adapter ring of tick-stamped byte payloads. Records are strictly
//! append-only and tick-ordered; lookups resolve to the most recent
//! record at or before the requested tick, which supports sparse and
//! strided recording. Pruning is driven by a record count cap, a byte
//! budget, and an optional horizon in ticks, oldest-first in every case.

use std::collections::VecDeque;

use crate::snapshot::{SnapshotWriter, checksum};

/// Number of payload buffers kept warm per history buffer.
const POOL_SIZE: usize = 4;

/// Error in history buffer bookkeeping.
///
/// These indicate a misbehaving caller (an adapter driver recording out
/// of order or unbalancing begin/end), not a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// A record was begun at a tick not after the newest stored record.
    #[error("record tick {tick} is not after newest recorded tick {newest}")]
    NonMonotonicTick { tick: u64, newest: u64 },

    /// `begin_record` was called while another record was open.
    #[error("a record is already in progress at tick {tick}")]
    RecordInProgress { tick: u64 },

    /// `end_record` was called with no record open.
    #[error("no record in progress")]
    NoRecordInProgress,
}

/// One immutable tick-stamped payload owned by an adapter's buffer.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    tick: u64,
    payload: Vec<u8>,
    checksum: u64,
}

impl HistoryRecord {
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// FNV-1a checksum of the payload, for divergence diagnostics.
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ============================================================================
// Payload Buffer Pool
// ============================================================================

/// Recycles payload buffers between pruned and newly recorded entries so
/// steady-state recording does not allocate.
#[derive(Debug)]
struct BufferPool {
    buffers: Vec<Vec<u8>>,
    buffer_size: usize,
}

impl BufferPool {
    fn new(buffer_size: usize, pool_size: usize) -> Self {
        let buffers = (0..pool_size)
            .map(|_| Vec::with_capacity(buffer_size))
            .collect();
        Self {
            buffers,
            buffer_size,
        }
    }

    fn acquire(&mut self) -> Vec<u8> {
        self.buffers.pop().unwrap_or_else(|| {
            log::trace!("history buffer pool empty, allocating");
            Vec::with_capacity(self.buffer_size)
        })
    }

    fn release(&mut self, mut buffer: Vec<u8>) {
        buffer.clear();
        // Drop buffers that have grown far beyond the expected payload size.
        if buffer.capacity() <= self.buffer_size * 2 && self.buffers.len() < POOL_SIZE * 2 {
            self.buffers.push(buffer);
        }
    }
}

// ============================================================================
// History Buffer
// ============================================================================

/// Capacity limits for one history buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Maximum record count; the oldest record is pruned before a new one
    /// is inserted once this is reached.
    pub max_records: usize,
    /// Byte budget across all payloads.
    pub max_bytes: usize,
    /// Optional horizon: records older than `newest - horizon` are pruned.
    pub horizon_ticks: Option<u64>,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_records: 512,
            max_bytes: 4 * 1024 * 1024,
            horizon_ticks: None,
        }
    }
}

/// Sliding window of tick-stamped records for a single adapter.
///
/// Exclusively owned by that adapter's registry slot; nothing else
/// writes to it.
#[derive(Debug)]
pub struct HistoryBuffer {
    records: VecDeque<HistoryRecord>,
    bytes: usize,
    limits: HistoryLimits,
    pending: Option<u64>,
    pool: BufferPool,
}

impl HistoryBuffer {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            records: VecDeque::with_capacity(limits.max_records.min(1024)),
            bytes: 0,
            limits,
            pending: None,
            pool: BufferPool::new(256, POOL_SIZE),
        }
    }

    /// Start recording a payload for `tick`.
    ///
    /// Returns a pooled writer; finish with [`HistoryBuffer::end_record`].
    /// Ticks must be strictly increasing across records.
    pub fn begin_record(&mut self, tick: u64) -> Result<SnapshotWriter, HistoryError> {
        if let Some(pending) = self.pending {
            return Err(HistoryError::RecordInProgress { tick: pending });
        }
        if let Some(newest) = self.newest_tick()
            && tick <= newest
        {
            return Err(HistoryError::NonMonotonicTick { tick, newest });
        }
        self.pending = Some(tick);
        Ok(SnapshotWriter::with_buffer(self.pool.acquire()))
    }

    /// Finalize the record begun by the matching `begin_record`.
    ///
    /// Capacity management runs here: the single oldest record is pruned
    /// before insert once the count cap is reached, then the byte budget
    /// and horizon are enforced.
    pub fn end_record(&mut self, writer: SnapshotWriter) -> Result<u64, HistoryError> {
        let tick = self.pending.take().ok_or(HistoryError::NoRecordInProgress)?;
        let payload = writer.into_bytes();

        while self.records.len() >= self.limits.max_records.max(1) {
            self.drop_oldest();
        }
        while !self.records.is_empty() && self.bytes + payload.len() > self.limits.max_bytes {
            log::warn!(
                "history byte budget exceeded ({} + {} > {}), pruning oldest",
                self.bytes,
                payload.len(),
                self.limits.max_bytes
            );
            self.drop_oldest();
        }

        let record_checksum = checksum(&payload);
        self.bytes += payload.len();
        self.records.push_back(HistoryRecord {
            tick,
            payload,
            checksum: record_checksum,
        });

        if let Some(horizon) = self.limits.horizon_ticks {
            let min_tick = tick.saturating_sub(horizon);
            self.prune_older_than(min_tick);
        }
        Ok(tick)
    }

    /// Most recent record with `record.tick <= tick`.
    ///
    /// Not an exact match: strided recorders resolve to their nearest
    /// earlier sample. `None` when no record precedes the requested tick,
    /// which is a silent best-effort miss by design.
    pub fn try_get(&self, tick: u64) -> Option<&HistoryRecord> {
        let idx = self.records.partition_point(|r| r.tick <= tick);
        if idx == 0 {
            return None;
        }
        self.records.get(idx - 1)
    }

    /// Drop every record with `tick < min_tick`, compacting the buffer.
    ///
    /// O(n) in dropped records; payload buffers are recycled. Returns the
    /// number of records dropped.
    pub fn prune_older_than(&mut self, min_tick: u64) -> usize {
        let mut dropped = 0;
        while let Some(front) = self.records.front() {
            if front.tick >= min_tick {
                break;
            }
            self.drop_oldest();
            dropped += 1;
        }
        dropped
    }

    fn drop_oldest(&mut self) {
        if let Some(record) = self.records.pop_front() {
            self.bytes -= record.payload.len();
            self.pool.release(record.payload);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total payload bytes currently held.
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    pub fn oldest_tick(&self) -> Option<u64> {
        self.records.front().map(|r| r.tick)
    }

    pub fn newest_tick(&self) -> Option<u64> {
        self.records.back().map(|r| r.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(buffer: &mut HistoryBuffer, tick: u64, value: u64) {
        let mut w = buffer.begin_record(tick).unwrap();
        w.write_u64(value);
        buffer.end_record(w).unwrap();
    }

    fn value_at(record: &HistoryRecord) -> u64 {
        let mut r = crate::snapshot::SnapshotReader::new(record.payload());
        r.read_u64().unwrap()
    }

    #[test]
    fn try_get_resolves_nearest_at_or_before() {
        let mut buffer = HistoryBuffer::new(HistoryLimits::default());
        record(&mut buffer, 0, 100);
        record(&mut buffer, 5, 105);
        record(&mut buffer, 10, 110);

        assert_eq!(value_at(buffer.try_get(0).unwrap()), 100);
        assert_eq!(value_at(buffer.try_get(3).unwrap()), 100);
        assert_eq!(value_at(buffer.try_get(7).unwrap()), 105);
        assert_eq!(value_at(buffer.try_get(10).unwrap()), 110);
        assert_eq!(value_at(buffer.try_get(999).unwrap()), 110);
    }

    #[test]
    fn try_get_misses_before_first_record() {
        let mut buffer = HistoryBuffer::new(HistoryLimits::default());
        record(&mut buffer, 5, 105);
        assert!(buffer.try_get(4).is_none());
    }

    #[test]
    fn count_cap_prunes_single_oldest_before_insert() {
        let mut buffer = HistoryBuffer::new(HistoryLimits {
            max_records: 3,
            ..Default::default()
        });
        for tick in 0..5 {
            record(&mut buffer, tick, tick);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.oldest_tick(), Some(2));
        assert_eq!(buffer.newest_tick(), Some(4));
    }

    #[test]
    fn prune_older_than_keeps_everything_at_or_after_min() {
        let mut buffer = HistoryBuffer::new(HistoryLimits::default());
        for tick in 0..10 {
            record(&mut buffer, tick, tick);
        }
        let dropped = buffer.prune_older_than(6);
        assert_eq!(dropped, 6);
        assert_eq!(buffer.oldest_tick(), Some(6));
        assert_eq!(buffer.len(), 4);
        for tick in 6..10 {
            assert_eq!(buffer.try_get(tick).unwrap().tick(), tick);
        }
    }

    #[test]
    fn byte_budget_prunes_oldest_first() {
        let mut buffer = HistoryBuffer::new(HistoryLimits {
            max_records: 100,
            max_bytes: 24, // room for three u64 payloads
            horizon_ticks: None,
        });
        for tick in 0..5 {
            record(&mut buffer, tick, tick);
        }
        assert!(buffer.byte_len() <= 24);
        assert_eq!(buffer.oldest_tick(), Some(2));
    }

    #[test]
    fn horizon_prunes_on_insert() {
        let mut buffer = HistoryBuffer::new(HistoryLimits {
            horizon_ticks: Some(3),
            ..Default::default()
        });
        for tick in 0..10 {
            record(&mut buffer, tick, tick);
        }
        assert_eq!(buffer.oldest_tick(), Some(6));
    }

    #[test]
    fn non_monotonic_record_is_rejected() {
        let mut buffer = HistoryBuffer::new(HistoryLimits::default());
        record(&mut buffer, 5, 0);
        assert_eq!(
            buffer.begin_record(5).unwrap_err(),
            HistoryError::NonMonotonicTick { tick: 5, newest: 5 }
        );
        assert_eq!(
            buffer.begin_record(2).unwrap_err(),
            HistoryError::NonMonotonicTick { tick: 2, newest: 5 }
        );
    }

    #[test]
    fn unbalanced_begin_end_is_rejected() {
        let mut buffer = HistoryBuffer::new(HistoryLimits::default());
        let w = buffer.begin_record(1).unwrap();
        assert_eq!(
            buffer.begin_record(2).unwrap_err(),
            HistoryError::RecordInProgress { tick: 1 }
        );
        buffer.end_record(w).unwrap();

        let stray = SnapshotWriter::new();
        assert_eq!(
            buffer.end_record(stray).unwrap_err(),
            HistoryError::NoRecordInProgress
        );
    }

    #[test]
    fn records_carry_payload_checksums() {
        let mut buffer = HistoryBuffer::new(HistoryLimits::default());
        record(&mut buffer, 1, 42);
        record(&mut buffer, 2, 42);
        record(&mut buffer, 3, 43);

        let a = buffer.try_get(1).unwrap().checksum();
        let b = buffer.try_get(2).unwrap().checksum();
        let c = buffer.try_get(3).unwrap().checksum();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
