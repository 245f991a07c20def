//! Time-aware adapter contract and registry
//!
//! Adapters are the per-domain plugins (inventories, job state,
//! transforms, growth stages, ...) that participate in history and
//! rewind. Each one serializes only its own state through the snapshot
//! stream and owns a private history buffer; there is no shared
//! transaction log between them.

use crate::history::{HistoryBuffer, HistoryError, HistoryLimits};
use crate::snapshot::{RecordDescriptor, SnapshotError, SnapshotReader, SnapshotWriter};

/// How often and how much an adapter records.
///
/// Every adapter chooses its own stride and horizon; a transform adapter
/// might record every tick while a growth adapter records every 50.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    /// Record every `stride` ticks (1 = every tick).
    pub stride: u64,
    /// Buffer limits; `None` takes the registry-wide default.
    pub limits: Option<HistoryLimits>,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            stride: 1,
            limits: None,
        }
    }
}

/// Contract every rewindable domain implements.
///
/// `save` must write a complete, self-contained snapshot of only this
/// adapter's owned state; the `&self` receiver keeps it free of side
/// effects on the live simulation. `load` must fully overwrite every
/// owned field — a partial restore is a correctness bug, not a supported
/// mode, and leftover bytes after `load` are treated as one.
pub trait TimeAware {
    /// Versioned identity of this adapter's record schema.
    fn descriptor(&self) -> RecordDescriptor;

    /// Recording stride and buffer limits.
    fn sampling(&self) -> SamplingPolicy {
        SamplingPolicy::default()
    }

    /// Advisory hook, run once per advanced forward tick.
    fn on_tick(&mut self, _tick: u64) {}

    /// Write a complete snapshot of owned state, in a fixed field order.
    fn save(&self, writer: &mut SnapshotWriter);

    /// Overwrite all owned state from a snapshot, in the same order.
    fn load(&mut self, reader: &mut SnapshotReader<'_>) -> Result<(), SnapshotError>;

    /// Called exactly once on the transition into Playback.
    fn on_rewind_start(&mut self) {}

    /// Called exactly once on the transition out of Playback. Adapters
    /// reset local bookkeeping here so resuming Record does not skip a
    /// tick's save.
    fn on_rewind_end(&mut self) {}
}

/// Stable handle to a registered adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterId(usize);

/// Error raised while driving adapter phases.
///
/// All variants are fatal adapter bugs; best-effort history misses are
/// not errors and never surface here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhaseError {
    #[error("adapter '{adapter}' snapshot error: {source}")]
    Snapshot {
        adapter: &'static str,
        source: SnapshotError,
    },

    #[error("adapter '{adapter}' history error: {source}")]
    History {
        adapter: &'static str,
        source: HistoryError,
    },

    #[error("world payload holds {found} adapter records, registry has {expected}")]
    AdapterCountMismatch { expected: usize, found: usize },
}

struct AdapterSlot {
    adapter: Box<dyn TimeAware>,
    history: HistoryBuffer,
    policy: SamplingPolicy,
    /// Sentinel preventing a double save within one tick; cleared when a
    /// rewind ends so the first Record tick afterwards saves again.
    last_saved: Option<u64>,
}

/// Owns every registered adapter together with its private history
/// buffer, and drives the per-tick save/load phases in registration
/// (dependency) order.
#[derive(Default)]
pub struct AdapterRegistry {
    slots: Vec<AdapterSlot>,
    default_limits: HistoryLimits,
    rewinding: bool,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose adapters fall back to the given buffer limits.
    pub fn with_limits(default_limits: HistoryLimits) -> Self {
        Self {
            default_limits,
            ..Self::default()
        }
    }

    /// Register an adapter; its `sampling()` policy sizes the buffer.
    /// Registration order is the fixed execution order.
    pub fn register(&mut self, adapter: Box<dyn TimeAware>) -> AdapterId {
        let policy = adapter.sampling();
        let limits = policy.limits.unwrap_or(self.default_limits);
        let id = AdapterId(self.slots.len());
        self.slots.push(AdapterSlot {
            history: HistoryBuffer::new(limits),
            policy,
            adapter,
            last_saved: None,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn adapter(&self, id: AdapterId) -> Option<&dyn TimeAware> {
        self.slots.get(id.0).map(|s| s.adapter.as_ref())
    }

    pub fn adapter_mut(&mut self, id: AdapterId) -> Option<&mut (dyn TimeAware + 'static)> {
        self.slots.get_mut(id.0).map(|s| s.adapter.as_mut())
    }

    /// The history buffer owned by an adapter, for occupancy stats.
    pub fn history(&self, id: AdapterId) -> Option<&HistoryBuffer> {
        self.slots.get(id.0).map(|s| &s.history)
    }

    pub fn is_rewinding(&self) -> bool {
        self.rewinding
    }

    /// Run the advisory tick hook on every adapter.
    pub fn run_tick(&mut self, tick: u64) {
        for slot in &mut self.slots {
            slot.adapter.on_tick(tick);
        }
    }

    /// Record phase: save every adapter whose stride is due at `tick`.
    ///
    /// Returns the number of records written.
    pub fn run_record(&mut self, tick: u64) -> Result<u32, PhaseError> {
        let mut saved = 0;
        for slot in &mut self.slots {
            if slot.last_saved == Some(tick) {
                continue;
            }
            if tick % slot.policy.stride.max(1) != 0 {
                continue;
            }
            let name = slot.adapter.descriptor().name;
            let mut writer = slot
                .history
                .begin_record(tick)
                .map_err(|source| PhaseError::History {
                    adapter: name,
                    source,
                })?;
            slot.adapter.descriptor().write_header(&mut writer);
            slot.adapter.save(&mut writer);
            slot.history
                .end_record(writer)
                .map_err(|source| PhaseError::History {
                    adapter: name,
                    source,
                })?;
            slot.last_saved = Some(tick);
            saved += 1;
        }
        Ok(saved)
    }

    /// Playback/CatchUp phase: restore every adapter from its own
    /// nearest-at-or-before record.
    ///
    /// An adapter with no record preceding `target` is silently left as
    /// is (best-effort miss). Cross-adapter consistency at one playback
    /// tick is deliberately best-effort: each adapter resolves its own
    /// nearest-≤ sample, so sparse and dense recorders may land on
    /// slightly different source ticks. Checkpoints are the coarse
    /// alignment tool when exact alignment matters.
    ///
    /// Returns the number of adapters restored.
    pub fn run_playback(&mut self, target: u64) -> Result<u32, PhaseError> {
        let mut loaded = 0;
        for slot in &mut self.slots {
            let AdapterSlot {
                adapter, history, ..
            } = slot;
            let Some(record) = history.try_get(target) else {
                log::trace!(
                    "no history at or before tick {target} for '{}'",
                    adapter.descriptor().name
                );
                continue;
            };
            let name = adapter.descriptor().name;
            let mut reader = SnapshotReader::new(record.payload());
            let restore = adapter
                .descriptor()
                .check_header(&mut reader)
                .and_then(|()| adapter.load(&mut reader))
                .and_then(|()| reader.finish());
            restore.map_err(|source| PhaseError::Snapshot {
                adapter: name,
                source,
            })?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Fire `on_rewind_start` hooks; idempotent per transition.
    pub fn begin_rewind(&mut self) {
        if self.rewinding {
            return;
        }
        self.rewinding = true;
        for slot in &mut self.slots {
            slot.adapter.on_rewind_start();
        }
    }

    /// Fire `on_rewind_end` hooks and clear the save sentinels so the
    /// next Record tick saves even at an already-seen tick value.
    pub fn end_rewind(&mut self) {
        if !self.rewinding {
            return;
        }
        self.rewinding = false;
        for slot in &mut self.slots {
            slot.adapter.on_rewind_end();
            slot.last_saved = None;
        }
    }

    /// Serialize every adapter into one whole-world payload.
    ///
    /// Layout: record count, then per adapter a descriptor header and a
    /// length-prefixed body, in registration order.
    pub fn capture_world(&self) -> (Vec<u8>, u32) {
        let mut writer = SnapshotWriter::new();
        writer.write_u32(self.slots.len() as u32);
        let mut body = SnapshotWriter::new();
        for slot in &self.slots {
            slot.adapter.descriptor().write_header(&mut writer);
            body = SnapshotWriter::with_buffer(body.into_bytes());
            slot.adapter.save(&mut body);
            writer.write_prefixed_bytes(body.as_bytes());
        }
        (writer.into_bytes(), self.slots.len() as u32)
    }

    /// Restore every adapter from a whole-world payload.
    pub fn restore_world(&mut self, payload: &[u8]) -> Result<u32, PhaseError> {
        let mut reader = SnapshotReader::new(payload);
        let count = reader
            .read_u32()
            .map_err(|source| PhaseError::Snapshot {
                adapter: "<world>",
                source,
            })? as usize;
        if count != self.slots.len() {
            return Err(PhaseError::AdapterCountMismatch {
                expected: self.slots.len(),
                found: count,
            });
        }
        for slot in &mut self.slots {
            let name = slot.adapter.descriptor().name;
            let restore = slot
                .adapter
                .descriptor()
                .check_header(&mut reader)
                .and_then(|()| reader.read_prefixed_bytes())
                .and_then(|body| {
                    let mut body_reader = SnapshotReader::new(&body);
                    slot.adapter.load(&mut body_reader)?;
                    body_reader.finish()
                });
            restore.map_err(|source| PhaseError::Snapshot {
                adapter: name,
                source,
            })?;
        }
        reader.finish().map_err(|source| PhaseError::Snapshot {
            adapter: "<world>",
            source,
        })?;
        Ok(count as u32)
    }
}
