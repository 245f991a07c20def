//! Time bubbles
//!
//! Spatial regions that run at an independent local rate, pause, freeze,
//! or rewind their contents. Every affected entity is tested against
//! every active bubble each resolution pass; overlaps resolve to the
//! highest-priority bubble with the lowest id as the deterministic tie
//! break. The resolved local mode/scale is cached per entity so per-tick
//! update gating reads the cache instead of re-testing containment.
//!
//! The O(entities × bubbles) scan is fine at small bubble counts; a
//! spatial index is a flagged extension if that stops being true.

mod volume;

pub use volume::BubbleVolume;

use glam::Vec3;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::command::PlayerId;

pub type BubbleId = u32;

/// Host-side entity identifier; the core never interprets it.
pub type EntityId = u64;

/// Local time mode inside a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalTimeMode {
    /// Multiply the entity's delta by the bubble scale (scale < 1 slows).
    Scale,
    /// Zero delta, but the entity is still visited each tick.
    Pause,
    /// Entity is skipped entirely; stronger than Pause.
    Stasis,
    /// The caller should restore the entity from its own history instead
    /// of advancing it.
    Rewind,
    /// Scale with a multiplier above 1.
    FastForward,
}

/// Who may issue bubble-scoped commands against this bubble.
///
/// Single-actor operation treats every bubble as open; `Owner` is the
/// hook a multi-actor resolver checks against the command's player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubblePolicy {
    Open,
    Owner(PlayerId),
}

/// Parameters for creating a bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleSpec {
    pub volume: BubbleVolume,
    pub mode: LocalTimeMode,
    pub scale: f32,
    pub priority: i32,
    /// Remaining lifetime in ticks; `None` lives until removed.
    pub duration: Option<u64>,
    pub policy: BubblePolicy,
}

impl BubbleSpec {
    pub fn new(volume: BubbleVolume, mode: LocalTimeMode) -> Self {
        Self {
            volume,
            mode,
            scale: 1.0,
            priority: 0,
            duration: None,
            policy: BubblePolicy::Open,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, ticks: u64) -> Self {
        self.duration = Some(ticks);
        self
    }

    pub fn with_policy(mut self, policy: BubblePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A live bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBubble {
    pub id: BubbleId,
    pub volume: BubbleVolume,
    pub mode: LocalTimeMode,
    pub scale: f32,
    pub priority: i32,
    pub remaining: Option<u64>,
    pub policy: BubblePolicy,
}

/// Cached per-entity resolution of the winning bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleMembership {
    pub bubble: BubbleId,
    pub mode: LocalTimeMode,
    pub scale: f32,
    /// Local history read position for Rewind bubbles; walks backward
    /// one tick per resolution pass while the entity stays inside.
    pub playback_tick: Option<u64>,
}

/// What the host should do with an entity this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalStep {
    /// Advance with the given delta multiplier.
    Advance { scale: f32 },
    /// Visit but apply zero delta.
    Hold,
    /// Skip the entity entirely.
    Skip,
    /// Restore the entity from its own history at this tick.
    Replay { tick: u64 },
}

/// All active bubbles plus the per-entity membership cache.
#[derive(Debug, Default)]
pub struct BubbleField {
    bubbles: Vec<TimeBubble>,
    next_id: BubbleId,
    memberships: HashMap<EntityId, BubbleMembership>,
}

impl BubbleField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bubble and return its id. Ids are never reused, which
    /// keeps the lowest-id tie break stable across create/remove churn.
    pub fn create(&mut self, spec: BubbleSpec) -> BubbleId {
        let id = self.next_id;
        self.next_id += 1;
        self.bubbles.push(TimeBubble {
            id,
            volume: spec.volume,
            mode: spec.mode,
            scale: spec.scale,
            priority: spec.priority,
            remaining: spec.duration,
            policy: spec.policy,
        });
        id
    }

    /// Remove a bubble by explicit request. Memberships pointing at it
    /// are invalidated immediately.
    pub fn remove(&mut self, id: BubbleId) -> bool {
        let before = self.bubbles.len();
        self.bubbles.retain(|b| b.id != id);
        let removed = before != self.bubbles.len();
        if removed {
            self.memberships.retain(|_, m| m.bubble != id);
        }
        removed
    }

    /// Count down bounded lifetimes and remove expired bubbles.
    pub fn age(&mut self) {
        let mut expired: SmallVec<[BubbleId; 4]> = SmallVec::new();
        for bubble in &mut self.bubbles {
            if let Some(remaining) = &mut bubble.remaining {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    expired.push(bubble.id);
                }
            }
        }
        for id in expired {
            log::debug!("time bubble {id} expired");
            self.remove(id);
        }
    }

    /// Recompute the membership cache for the given entity positions.
    ///
    /// Entities outside every bubble (or absent from the iterator) end
    /// up with no cache entry, which gates as a normal advance.
    /// `current_tick` seeds the local playback position for entities
    /// newly entering a Rewind bubble.
    pub fn resolve_membership(
        &mut self,
        current_tick: u64,
        entities: impl IntoIterator<Item = (EntityId, Vec3)>,
    ) {
        let mut fresh: HashMap<EntityId, BubbleMembership> = HashMap::new();
        for (entity, position) in entities {
            let Some(bubble) = self.winning_bubble(position) else {
                continue;
            };
            let playback_tick = if bubble.mode == LocalTimeMode::Rewind {
                match self.memberships.get(&entity) {
                    // Still in the same rewinding bubble: keep walking back.
                    Some(previous) if previous.bubble == bubble.id => previous
                        .playback_tick
                        .map(|t| t.saturating_sub(1))
                        .or(Some(current_tick)),
                    _ => Some(current_tick),
                }
            } else {
                None
            };
            fresh.insert(
                entity,
                BubbleMembership {
                    bubble: bubble.id,
                    mode: bubble.mode,
                    scale: bubble.scale,
                    playback_tick,
                },
            );
        }
        self.memberships = fresh;
    }

    /// Highest-priority bubble containing the point; ties break to the
    /// lowest id regardless of creation order.
    fn winning_bubble(&self, point: Vec3) -> Option<&TimeBubble> {
        let mut winner: Option<&TimeBubble> = None;
        for bubble in &self.bubbles {
            if !bubble.volume.contains(point) {
                continue;
            }
            let wins = winner.is_none_or(|w| {
                bubble.priority > w.priority
                    || (bubble.priority == w.priority && bubble.id < w.id)
            });
            if wins {
                winner = Some(bubble);
            }
        }
        winner
    }

    /// Cached membership for an entity, if any bubble contains it.
    pub fn membership(&self, entity: EntityId) -> Option<&BubbleMembership> {
        self.memberships.get(&entity)
    }

    /// Per-tick update gating, read from the cache.
    pub fn local_step(&self, entity: EntityId) -> LocalStep {
        let Some(membership) = self.memberships.get(&entity) else {
            return LocalStep::Advance { scale: 1.0 };
        };
        match membership.mode {
            LocalTimeMode::Scale | LocalTimeMode::FastForward => LocalStep::Advance {
                scale: membership.scale,
            },
            LocalTimeMode::Pause => LocalStep::Hold,
            LocalTimeMode::Stasis => LocalStep::Skip,
            LocalTimeMode::Rewind => LocalStep::Replay {
                tick: membership.playback_tick.unwrap_or(0),
            },
        }
    }

    pub fn get(&self, id: BubbleId) -> Option<&TimeBubble> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }
}
