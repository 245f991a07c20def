//! Chronocore Core - Deterministic time-control engine
//!
//! This crate provides the tick clock, rewind history, and time-control
//! surfaces a simulation host embeds to get record/rewind/catch-up
//! semantics over its own game state.
//!
//! # Architecture
//!
//! - [`TimeEngine`] - Per-tick orchestration of clock, commands, phases
//! - [`TimeAware`] - Trait implemented by each rewindable domain
//! - [`HistoryBuffer`] - Per-adapter sliding window of snapshots
//! - [`BubbleField`] - Spatial regions with independent local time

pub mod adapter;
pub mod bubble;
pub mod checkpoint;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod history;
#[cfg(test)]
mod integration;
pub mod schedule;
pub mod snapshot;
#[cfg(test)]
pub mod test_utils;

// Re-export core traits and types
pub use adapter::{AdapterId, AdapterRegistry, PhaseError, SamplingPolicy, TimeAware};
pub use clock::{ClockAdvance, LegacyMode, SimulationMode, Tick, TickClock};
pub use engine::{TickReport, TimeEngine};

// Re-export history and snapshot types
pub use history::{HistoryBuffer, HistoryError, HistoryLimits, HistoryRecord};
pub use snapshot::{
    RecordDescriptor, SnapshotError, SnapshotReader, SnapshotWriter, checksum,
};

// Re-export control-surface types
pub use command::{
    CommandKind, CommandQueue, CommandScope, CommandSource, ControlCommand, PlayerId,
    ResolvedCommands,
};
pub use config::{ConfigError, TimeConfig};
pub use schedule::{SPEED_PRESETS, ScaleKind, TimescaleEntry, TimescaleSchedule};

// Re-export checkpoint and bubble types
pub use bubble::{
    BubbleField, BubbleId, BubbleMembership, BubblePolicy, BubbleSpec, BubbleVolume, EntityId,
    LocalStep, LocalTimeMode, TimeBubble,
};
pub use checkpoint::{Checkpoint, CheckpointFlags, CheckpointStore};
