//! Time engine
//!
//! Owns the authoritative clock, mode, command queue, timescale
//! schedule, adapter registry, checkpoint store and bubble field, and
//! sequences them into one `advance_tick` entry point. The host calls
//! `advance_tick` once per fixed timestep and uses the returned report's
//! effective scale to pace the next call; the engine itself never
//! touches wall-clock time.

use crate::adapter::{AdapterId, AdapterRegistry, PhaseError, TimeAware};
use crate::bubble::BubbleField;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::clock::{ClockAdvance, SimulationMode, Tick, TickClock};
use crate::command::{CommandKind, CommandQueue, CommandSource, ControlCommand};
use crate::config::{ConfigError, TimeConfig};
use crate::history::HistoryLimits;
use crate::schedule::{ScaleKind, TimescaleSchedule, SPEED_PRESETS};

/// What one engine tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    pub target_tick: Tick,
    pub mode: SimulationMode,
    /// Resolved global scale; the host paces the next tick with it.
    pub effective_scale: f32,
    pub advance: ClockAdvance,
    /// Adapter records written this tick.
    pub saved: u32,
    /// Adapters restored this tick.
    pub loaded: u32,
    pub checkpointed: bool,
}

pub struct TimeEngine {
    config: TimeConfig,
    clock: TickClock,
    mode: SimulationMode,
    queue: CommandQueue,
    schedule: TimescaleSchedule,
    registry: AdapterRegistry,
    checkpoints: CheckpointStore,
    bubbles: BubbleField,
    speed_index: usize,
    /// Schedule entry installed by the last SetSpeed command; replaced,
    /// not stacked, by the next one.
    base_speed_entry: Option<u32>,
}

impl TimeEngine {
    pub fn new(config: TimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mode = config.parse_start_mode()?;
        let mut clock = TickClock::new(config.catch_up_step);
        if config.starts_paused() {
            clock.set_paused(true);
        }
        let registry = AdapterRegistry::with_limits(HistoryLimits {
            max_records: config.history.max_records,
            max_bytes: config.history.max_bytes,
            horizon_ticks: config.history.horizon_ticks,
        });
        let schedule =
            TimescaleSchedule::new(config.timescale.min_scale, config.timescale.max_scale);
        let checkpoints = CheckpointStore::new(
            config.checkpoint.interval,
            config.checkpoint.max_count,
            config.checkpoint.max_bytes,
        );
        Ok(Self {
            config,
            clock,
            mode,
            queue: CommandQueue::new(),
            schedule,
            registry,
            checkpoints,
            bubbles: BubbleField::new(),
            // Index of 1.0 in the preset table.
            speed_index: 3,
            base_speed_entry: None,
        })
    }

    /// Run one engine tick: drain commands, resolve the timescale,
    /// advance the clock, then run the mode's adapter phase.
    pub fn advance_tick(&mut self) -> Result<TickReport, PhaseError> {
        let resolved = self.queue.resolve();
        if let Some(command) = resolved.mode {
            self.apply_mode_command(command);
        }
        if let Some(command) = resolved.speed {
            self.apply_speed_command(command);
        }

        let effective_scale = self.schedule.resolve(self.clock.tick());
        // A scheduled pause holds forward time without consuming pending
        // steps; rewind traversal is paced by rewind_step, not scale.
        let forced_hold = effective_scale == 0.0 && self.mode == SimulationMode::Record;
        let advance = if forced_hold {
            ClockAdvance::Held
        } else {
            self.clock.advance(self.mode)
        };

        let mut saved = 0;
        let mut loaded = 0;
        let mut checkpointed = false;

        match self.mode {
            SimulationMode::Record => {
                if advance == ClockAdvance::Advanced {
                    let tick = self.clock.tick();
                    self.registry.run_tick(tick);
                    saved = self.registry.run_record(tick)?;
                    if self.checkpoints.due(tick) {
                        let (payload, count) = self.registry.capture_world();
                        self.checkpoints
                            .insert(Checkpoint::world(tick, payload, count));
                        checkpointed = true;
                    }
                    self.schedule.sweep(tick);
                }
            }
            SimulationMode::Playback => {
                if matches!(advance, ClockAdvance::Advanced | ClockAdvance::ReachedStart) {
                    loaded = self.registry.run_playback(self.clock.target_tick())?;
                }
            }
            SimulationMode::CatchUp => {
                loaded = self.registry.run_playback(self.clock.target_tick())?;
                if advance == ClockAdvance::CaughtUp {
                    self.transition(SimulationMode::Record);
                }
            }
        }

        // Bubble lifetimes run on engine ticks, not simulated time: a
        // bounded bubble keeps counting down through pauses and rewinds.
        self.bubbles.age();

        Ok(TickReport {
            tick: self.clock.tick(),
            target_tick: self.clock.target_tick(),
            mode: self.mode,
            effective_scale,
            advance,
            saved,
            loaded,
            checkpointed,
        })
    }

    fn apply_mode_command(&mut self, command: ControlCommand) {
        match command.kind {
            CommandKind::Pause => self.clock.set_paused(true),
            CommandKind::Resume => {
                if self.mode == SimulationMode::Playback {
                    self.transition(SimulationMode::CatchUp);
                }
                self.clock.set_paused(false);
            }
            CommandKind::Step { count } => {
                self.clock.set_paused(true);
                self.clock.request_steps(count);
            }
            CommandKind::StartRewind { to, step } => {
                self.transition(SimulationMode::Playback);
                self.clock.set_rewind_step(step);
                self.clock.set_paused(false);
                let target = to.unwrap_or(self.clock.tick());
                self.clock.seek_target(target);
            }
            CommandKind::Scrub { to } => {
                self.transition(SimulationMode::Playback);
                self.clock.seek_target(to);
                self.clock.set_paused(true);
            }
            CommandKind::CancelRewind => {
                if self.mode == SimulationMode::Playback {
                    self.transition(SimulationMode::CatchUp);
                    self.clock.set_paused(false);
                }
            }
            // Arbitrated in the speed group, never lands here.
            CommandKind::SetSpeed { .. } => {}
        }
    }

    fn apply_speed_command(&mut self, command: ControlCommand) {
        let CommandKind::SetSpeed { scale, duration } = command.kind else {
            return;
        };
        if let Some(old) = self.base_speed_entry.take() {
            self.schedule.remove(old);
        }
        let start = self.clock.tick();
        let end = duration.map_or(u64::MAX, |d| start.saturating_add(d));
        let id = self
            .schedule
            .insert(start, end, ScaleKind::Scale(scale), command.source, command.priority);
        self.base_speed_entry = Some(id);
    }

    fn transition(&mut self, next: SimulationMode) {
        if self.mode == next {
            return;
        }
        log::info!("mode transition {:?} -> {:?}", self.mode, next);
        if next == SimulationMode::Playback {
            self.registry.begin_rewind();
        } else if self.mode == SimulationMode::Playback {
            self.registry.end_rewind();
        }
        self.mode = next;
    }

    /// Restore the world from the nearest valid checkpoint at or before
    /// `target` and move the history read position to it. Returns the
    /// restored checkpoint's tick, or `None` when no checkpoint covers
    /// the target.
    pub fn restore_checkpoint(&mut self, target: Tick) -> Result<Option<Tick>, PhaseError> {
        let Some(tick) = self.checkpoints.try_get_checkpoint_tick(target) else {
            return Ok(None);
        };
        let Some(checkpoint) = self.checkpoints.get(tick) else {
            return Ok(None);
        };
        self.registry.restore_world(checkpoint.payload())?;
        self.clock.seek_target(tick);
        Ok(Some(tick))
    }

    /// Step to the next faster preset and issue the matching command.
    pub fn speed_up(&mut self) -> f32 {
        if self.speed_index + 1 < SPEED_PRESETS.len() {
            self.speed_index += 1;
        }
        self.push_preset_command()
    }

    /// Step to the next slower preset and issue the matching command.
    pub fn speed_down(&mut self) -> f32 {
        self.speed_index = self.speed_index.saturating_sub(1);
        self.push_preset_command()
    }

    fn push_preset_command(&mut self) -> f32 {
        let scale = SPEED_PRESETS[self.speed_index];
        self.queue.push(ControlCommand::global(
            CommandKind::SetSpeed {
                scale,
                duration: None,
            },
            CommandSource::Ui,
        ));
        scale
    }

    pub fn speed_preset(&self) -> f32 {
        SPEED_PRESETS[self.speed_index]
    }

    pub fn push_command(&mut self, command: ControlCommand) {
        self.queue.push(command);
    }

    pub fn register_adapter(&mut self, adapter: Box<dyn TimeAware>) -> AdapterId {
        self.registry.register(adapter)
    }

    pub fn config(&self) -> &TimeConfig {
        &self.config
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn schedule(&self) -> &TimescaleSchedule {
        &self.schedule
    }

    /// Direct schedule access for scripted pause/scale windows.
    pub fn schedule_mut(&mut self) -> &mut TimescaleSchedule {
        &mut self.schedule
    }

    pub fn bubbles(&self) -> &BubbleField {
        &self.bubbles
    }

    pub fn bubbles_mut(&mut self) -> &mut BubbleField {
        &mut self.bubbles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CounterAdapter;

    fn engine() -> TimeEngine {
        TimeEngine::new(TimeConfig::default()).unwrap()
    }

    fn run(engine: &mut TimeEngine, ticks: u64) {
        for _ in 0..ticks {
            engine.advance_tick().unwrap();
        }
    }

    #[test]
    fn record_mode_advances_and_saves() {
        let mut engine = engine();
        engine.register_adapter(Box::new(CounterAdapter::ticking()));

        let report = engine.advance_tick().unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(report.target_tick, 1);
        assert_eq!(report.mode, SimulationMode::Record);
        assert_eq!(report.saved, 1);
        assert_eq!(report.effective_scale, 1.0);
    }

    #[test]
    fn pause_command_holds_the_clock() {
        let mut engine = engine();
        run(&mut engine, 5);
        engine.push_command(ControlCommand::global(CommandKind::Pause, CommandSource::Ui));

        let report = engine.advance_tick().unwrap();
        assert_eq!(report.advance, ClockAdvance::Held);
        assert_eq!(report.tick, 5);

        engine.push_command(ControlCommand::global(
            CommandKind::Resume,
            CommandSource::Ui,
        ));
        let report = engine.advance_tick().unwrap();
        assert_eq!(report.tick, 6);
    }

    #[test]
    fn step_advances_exactly_count_ticks_then_holds() {
        let mut engine = engine();
        run(&mut engine, 3);
        engine.push_command(ControlCommand::global(
            CommandKind::Step { count: 2 },
            CommandSource::Ui,
        ));

        assert_eq!(engine.advance_tick().unwrap().tick, 4);
        assert_eq!(engine.advance_tick().unwrap().tick, 5);
        let report = engine.advance_tick().unwrap();
        assert_eq!(report.advance, ClockAdvance::Held);
        assert_eq!(report.tick, 5);
    }

    #[test]
    fn set_speed_installs_one_schedule_entry() {
        let mut engine = engine();
        engine.push_command(ControlCommand::global(
            CommandKind::SetSpeed {
                scale: 2.0,
                duration: None,
            },
            CommandSource::Ui,
        ));
        engine.advance_tick().unwrap();
        assert_eq!(engine.schedule().len(), 1);

        // A second SetSpeed replaces the entry instead of stacking.
        engine.push_command(ControlCommand::global(
            CommandKind::SetSpeed {
                scale: 0.5,
                duration: None,
            },
            CommandSource::Ui,
        ));
        engine.advance_tick().unwrap();
        assert_eq!(engine.schedule().len(), 1);
        let report = engine.advance_tick().unwrap();
        assert_eq!(report.effective_scale, 0.5);
    }

    #[test]
    fn bounded_speed_entry_expires() {
        let mut engine = engine();
        engine.push_command(ControlCommand::global(
            CommandKind::SetSpeed {
                scale: 4.0,
                duration: Some(3),
            },
            CommandSource::Script,
        ));
        engine.advance_tick().unwrap();
        assert_eq!(engine.advance_tick().unwrap().effective_scale, 4.0);
        run(&mut engine, 3);
        assert_eq!(engine.advance_tick().unwrap().effective_scale, 1.0);
    }

    #[test]
    fn scheduled_pause_outranks_speed_entries() {
        let mut engine = engine();
        run(&mut engine, 2);
        engine
            .schedule_mut()
            .insert(0, 100, ScaleKind::Scale(2.0), CommandSource::Gameplay, 100);
        engine
            .schedule_mut()
            .insert(0, 100, ScaleKind::Pause, CommandSource::Ui, 1);

        let report = engine.advance_tick().unwrap();
        assert_eq!(report.effective_scale, 0.0);
        assert_eq!(report.advance, ClockAdvance::Held);
        assert_eq!(report.tick, 2);
    }

    #[test]
    fn speed_presets_step_through_the_table() {
        let mut engine = engine();
        assert_eq!(engine.speed_preset(), 1.0);
        assert_eq!(engine.speed_up(), 2.0);
        assert_eq!(engine.speed_up(), 4.0);
        assert_eq!(engine.speed_up(), 4.0); // clamped at the top
        for _ in 0..10 {
            engine.speed_down();
        }
        assert_eq!(engine.speed_preset(), 0.1);
    }

    #[test]
    fn checkpoints_fire_on_the_configured_interval() {
        let mut config = TimeConfig::default();
        config.checkpoint.interval = 10;
        let mut engine = TimeEngine::new(config).unwrap();
        engine.register_adapter(Box::new(CounterAdapter::ticking()));

        let mut checkpoint_ticks = Vec::new();
        for _ in 0..25 {
            let report = engine.advance_tick().unwrap();
            if report.checkpointed {
                checkpoint_ticks.push(report.tick);
            }
        }
        assert_eq!(checkpoint_ticks, vec![10, 20]);
        assert_eq!(engine.checkpoints().len(), 2);
    }

    #[test]
    fn restore_checkpoint_rolls_state_back() {
        let mut config = TimeConfig::default();
        config.checkpoint.interval = 10;
        let mut engine = TimeEngine::new(config).unwrap();
        let counter = CounterAdapter::ticking();
        let state = counter.handle();
        engine.register_adapter(Box::new(counter));

        run(&mut engine, 25);
        assert_eq!(state.borrow().value, 25);

        let restored = engine.restore_checkpoint(17).unwrap();
        assert_eq!(restored, Some(10));
        assert_eq!(state.borrow().value, 10);
        assert_eq!(engine.clock().target_tick(), 10);
        assert_eq!(engine.clock().tick(), 25);
    }

    #[test]
    fn restore_checkpoint_with_no_coverage_is_a_noop() {
        let mut engine = engine();
        run(&mut engine, 5);
        assert_eq!(engine.restore_checkpoint(5).unwrap(), None);
    }

    #[test]
    fn starts_paused_when_configured() {
        let config = TimeConfig {
            start_mode: "paused".to_string(),
            ..TimeConfig::default()
        };
        let mut engine = TimeEngine::new(config).unwrap();
        assert_eq!(engine.mode(), SimulationMode::Record);
        assert_eq!(engine.advance_tick().unwrap().advance, ClockAdvance::Held);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = TimeConfig {
            tick_rate: 0,
            ..TimeConfig::default()
        };
        assert!(TimeEngine::new(config).is_err());
    }
}
