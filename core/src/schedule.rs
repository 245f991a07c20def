//! Timescale schedule
//!
//! Prioritized, tick-bounded speed and pause entries resolved into one
//! effective global scale per tick. A pause entry always wins over every
//! scale entry regardless of priority, so a hard stop is always
//! honorable. Entries never stack multiplicatively.

use crate::command::CommandSource;

/// Speed presets exposed by the engine's step-up/step-down controls.
pub const SPEED_PRESETS: [f32; 6] = [0.1, 0.25, 0.5, 1.0, 2.0, 4.0];

/// Kind of a schedule entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleKind {
    /// Force the effective scale to zero while active.
    Pause,
    /// Run at the given multiplier while active.
    Scale(f32),
}

/// One entry, active over the half-open tick range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimescaleEntry {
    pub id: u32,
    pub start: u64,
    pub end: u64,
    pub kind: ScaleKind,
    pub source: CommandSource,
    pub priority: i32,
}

impl TimescaleEntry {
    pub fn is_active_at(&self, tick: u64) -> bool {
        tick >= self.start && tick < self.end
    }
}

/// Buffer of timescale entries with per-tick resolution.
#[derive(Debug)]
pub struct TimescaleSchedule {
    entries: Vec<TimescaleEntry>,
    next_id: u32,
    min_scale: f32,
    max_scale: f32,
}

impl TimescaleSchedule {
    /// `min_scale`/`max_scale` clamp resolved scale entries. Pause wins
    /// before clamping, so zero is reachable only through a pause entry.
    pub fn new(min_scale: f32, max_scale: f32) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            min_scale,
            max_scale,
        }
    }

    /// Insert an entry and return its id. Insertion order is the tie
    /// break: of two equal-priority active scale entries, the most
    /// recently added wins.
    pub fn insert(
        &mut self,
        start: u64,
        end: u64,
        kind: ScaleKind,
        source: CommandSource,
        priority: i32,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(TimescaleEntry {
            id,
            start,
            end,
            kind,
            source,
            priority,
        });
        id
    }

    /// Remove an entry by id. Returns whether it existed.
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    /// Resolve the effective global scale at `tick`.
    ///
    /// Any active pause entry forces 0. Otherwise the highest-priority
    /// active scale entry wins (ties: most recently added), clamped to
    /// the configured range. With no active entry the scale is 1.0.
    pub fn resolve(&self, tick: u64) -> f32 {
        let mut winner: Option<&TimescaleEntry> = None;
        for entry in &self.entries {
            if !entry.is_active_at(tick) {
                continue;
            }
            if matches!(entry.kind, ScaleKind::Pause) {
                return 0.0;
            }
            // `>=` so later insertion wins priority ties.
            if winner.is_none_or(|w| entry.priority >= w.priority) {
                winner = Some(entry);
            }
        }
        match winner {
            Some(TimescaleEntry {
                kind: ScaleKind::Scale(scale),
                ..
            }) => scale.clamp(self.min_scale, self.max_scale),
            _ => 1.0,
        }
    }

    /// Drop entries whose range ended at or before `tick`.
    pub fn sweep(&mut self, tick: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.end > tick);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_at(&self, tick: u64) -> impl Iterator<Item = &TimescaleEntry> {
        self.entries.iter().filter(move |e| e.is_active_at(tick))
    }
}
