//! Control command queue and authority resolver
//!
//! Buffered control commands are the only sanctioned mutation path into
//! mode/tick state. The queue drains once per tick; scope is validated
//! against the active authority model, then same-tick conflicts resolve
//! by priority with ties going to the most recent arrival. Losing,
//! rejected, or superseded commands are silently dropped: commands are
//! best-effort hints, not transactions, and are never retried.

/// Player identifier carried for the multi-actor extension.
pub type PlayerId = u32;

/// Authority domain of a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandScope {
    /// Applies to the whole simulation.
    Global,
    /// Applies within the issuing time bubble.
    LocalBubble,
    /// Reserved for territory-level authority (multi-actor extension).
    Territory,
    /// Reserved for per-player authority (multi-actor extension).
    Player,
}

/// Origin of a command, used for diagnostics and schedule entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandSource {
    Ui,
    Script,
    Gameplay,
    Debug,
}

/// What a command asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandKind {
    Pause,
    Resume,
    /// Set the base speed. `duration` bounds the schedule entry in ticks;
    /// `None` keeps it until superseded.
    SetSpeed { scale: f32, duration: Option<u64> },
    /// Enter Playback. `to` seeks the history read position directly;
    /// `step` is how many ticks the target walks back per tick after.
    StartRewind { to: Option<u64>, step: u64 },
    /// Enter (or stay in) Playback, jump the read position and hold it.
    Scrub { to: u64 },
    /// Pause and queue `count` single-tick advances.
    Step { count: u32 },
    /// Leave Playback and catch back up to the present.
    CancelRewind,
}

impl CommandKind {
    /// Whether this command arbitrates in the mode group (versus speed).
    fn affects_mode(&self) -> bool {
        !matches!(self, Self::SetSpeed { .. })
    }
}

/// A buffered control command. Transient: consumed by one resolution
/// pass, then gone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    pub kind: CommandKind,
    pub scope: CommandScope,
    pub source: CommandSource,
    /// Issuing player; unused by single-actor authority, carried so a
    /// multi-actor resolver can add ownership checks without a wire
    /// change.
    pub player: Option<PlayerId>,
    pub priority: i32,
}

impl ControlCommand {
    /// Global-scope command from the given source with priority 0.
    pub fn global(kind: CommandKind, source: CommandSource) -> Self {
        Self {
            kind,
            scope: CommandScope::Global,
            source,
            player: None,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Winners of one resolution pass, at most one per arbitration group.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ResolvedCommands {
    /// Winning mode-affecting command (pause/resume/rewind/scrub/step).
    pub mode: Option<ControlCommand>,
    /// Winning speed command.
    pub speed: Option<ControlCommand>,
}

/// FIFO of pending commands, drained once per tick.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<ControlCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: ControlCommand) {
        self.pending.push(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the queue and arbitrate.
    ///
    /// Scope validation runs first: single-actor operation accepts only
    /// `Global` and `LocalBubble`; `Territory`/`Player` scopes are the
    /// multi-actor extension point and are dropped here. Within each
    /// group the highest priority wins and arrival order breaks ties in
    /// favor of the most recent command.
    pub fn resolve(&mut self) -> ResolvedCommands {
        let mut resolved = ResolvedCommands::default();
        for command in self.pending.drain(..) {
            if !scope_accepted(command.scope) {
                log::debug!("dropping command with unsupported scope: {command:?}");
                continue;
            }
            let slot = if command.kind.affects_mode() {
                &mut resolved.mode
            } else {
                &mut resolved.speed
            };
            // `>=` so the most recent arrival wins priority ties.
            let wins = slot.is_none_or(|current| command.priority >= current.priority);
            if wins {
                if let Some(loser) = slot.replace(command) {
                    log::debug!("command superseded: {loser:?}");
                }
            } else {
                log::debug!("command lost arbitration: {command:?}");
            }
        }
        resolved
    }
}

/// Single-actor authority: global and bubble-local commands only.
fn scope_accepted(scope: CommandScope) -> bool {
    matches!(scope, CommandScope::Global | CommandScope::LocalBubble)
}
