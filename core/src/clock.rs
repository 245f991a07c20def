//! Tick clock and mode state machine
//!
//! The canonical tick is the single source of truth for history
//! addressing and it never moves backward. Rewinding is realized entirely
//! by moving `target_tick` (the history read position) while the
//! canonical tick stays put, so rewinds are idempotent and can never
//! collide with existing history keys.

/// Discrete simulation time unit.
pub type Tick = u64;

/// Canonical simulation modes.
///
/// Exactly one instance is authoritative, owned by the engine. Legacy
/// mode names translate at the boundary via [`LegacyMode`]; they are
/// never variants of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationMode {
    /// Running forward; adapters save snapshots each eligible tick.
    Record,
    /// Traversing history backward; adapters restore nearest-≤ records.
    Playback,
    /// Replaying history forward to rejoin the present after a rewind.
    CatchUp,
}

/// Legacy mode aliases accepted at the external boundary.
///
/// `Play`, `Paused` and `Step` are all Record with different pause/step
/// side state on the clock; `Rewind` is Playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyMode {
    Play,
    Paused,
    Rewind,
    Step,
}

impl SimulationMode {
    /// Translate a legacy alias into the canonical mode.
    pub fn from_legacy(legacy: LegacyMode) -> Self {
        match legacy {
            LegacyMode::Play | LegacyMode::Paused | LegacyMode::Step => Self::Record,
            LegacyMode::Rewind => Self::Playback,
        }
    }
}

/// Outcome of one clock advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAdvance {
    /// The relevant position (tick or target) moved.
    Advanced,
    /// Nothing moved this tick (paused with no pending step).
    Held,
    /// Playback reached tick 0 and paused there.
    ReachedStart,
    /// CatchUp's target reached the canonical tick.
    CaughtUp,
}

/// Canonical tick counter plus the decoupled history read position.
#[derive(Debug, Clone)]
pub struct TickClock {
    tick: Tick,
    target_tick: Tick,
    paused: bool,
    pending_steps: u32,
    rewind_step: u64,
    catch_up_step: u64,
    /// Set by `seek_target`; the next Playback advance holds the sought
    /// position so the freshly requested tick is the first one replayed.
    seek_latch: bool,
}

impl TickClock {
    pub fn new(catch_up_step: u64) -> Self {
        Self {
            tick: 0,
            target_tick: 0,
            paused: false,
            pending_steps: 0,
            rewind_step: 1,
            catch_up_step: catch_up_step.max(1),
            seek_latch: false,
        }
    }

    /// Canonical tick. Monotonically non-decreasing for the process
    /// lifetime; no operation on this type decrements it.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Current history read position.
    pub fn target_tick(&self) -> Tick {
        self.target_tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pending_steps(&self) -> u32 {
        self.pending_steps
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if !paused {
            self.pending_steps = 0;
        }
    }

    /// Queue single-step advances; only meaningful while paused.
    pub fn request_steps(&mut self, count: u32) {
        if self.paused {
            self.pending_steps = self.pending_steps.saturating_add(count);
        } else {
            log::debug!("step request ignored while running");
        }
    }

    /// Ticks the target moves backward per Playback advance.
    pub fn set_rewind_step(&mut self, step: u64) {
        self.rewind_step = step.max(1);
    }

    /// Move the history read position directly, clamped to the canonical
    /// tick. The canonical tick is never touched.
    pub fn seek_target(&mut self, tick: Tick) {
        self.target_tick = tick.min(self.tick);
        self.seek_latch = true;
    }

    /// Advance one scheduler tick under the given mode.
    pub fn advance(&mut self, mode: SimulationMode) -> ClockAdvance {
        match mode {
            SimulationMode::Record => self.advance_record(),
            SimulationMode::Playback => self.advance_playback(),
            SimulationMode::CatchUp => self.advance_catch_up(),
        }
    }

    fn advance_record(&mut self) -> ClockAdvance {
        if self.paused {
            if self.pending_steps == 0 {
                return ClockAdvance::Held;
            }
            self.pending_steps -= 1;
        }
        self.tick += 1;
        self.target_tick = self.tick;
        ClockAdvance::Advanced
    }

    fn advance_playback(&mut self) -> ClockAdvance {
        if self.seek_latch {
            // Replay the sought tick before walking further back.
            self.seek_latch = false;
            return ClockAdvance::Advanced;
        }
        if self.paused {
            return ClockAdvance::Held;
        }
        if self.target_tick == 0 {
            self.paused = true;
            return ClockAdvance::ReachedStart;
        }
        self.target_tick = self.target_tick.saturating_sub(self.rewind_step);
        if self.target_tick == 0 {
            self.paused = true;
            return ClockAdvance::ReachedStart;
        }
        ClockAdvance::Advanced
    }

    fn advance_catch_up(&mut self) -> ClockAdvance {
        self.seek_latch = false;
        self.target_tick = self
            .target_tick
            .saturating_add(self.catch_up_step)
            .min(self.tick);
        if self.target_tick == self.tick {
            return ClockAdvance::CaughtUp;
        }
        ClockAdvance::Advanced
    }
}
