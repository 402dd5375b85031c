//! Game Events
//!
//! Events generated during simulation for the presentation layer
//! (damage numbers, sounds, banners) and for tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::game::ability::AbilityId;
use crate::game::state::{DropKind, EnemyKind, EntityId, RunPhase};

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Run end processed first
    RunOutcome = 0,
    /// Then damage to the player
    PlayerDamage = 1,
    /// Then deaths
    EnemyDeath = 2,
    /// Then pickups and level-ups
    Progression = 3,
    /// Then spawns and phase changes
    Director = 4,
    /// Then abilities
    AbilityEffect = 5,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Damage dealt to an enemy (damage number)
    DamageDealt {
        target: EntityId,
        amount: f32,
        position: Vec2,
    },

    /// The player lost hp
    PlayerHurt { amount: f32, hp_after: f32 },

    /// An enemy died
    EnemyKilled {
        enemy: EntityId,
        kind: EnemyKind,
        position: Vec2,
    },

    /// A normal wave was placed
    WaveSpawned { count: u32 },

    /// A sub-boss entered the field
    SubBossSpawned { enemy: EntityId },

    /// The boss entered the field
    BossSpawned { enemy: EntityId },

    /// A sub-boss or boss died
    BossDefeated { enemy: EntityId, main_boss: bool },

    /// A destructible obstacle broke
    ObstacleDestroyed { obstacle: EntityId, position: Vec2 },

    /// The player picked up a drop
    DropCollected { kind: DropKind, value: f32 },

    /// The player levelled up
    LevelUp { level: u32 },

    /// An ability was activated
    AbilityUsed { ability: AbilityId },

    /// An ability was cancelled early
    AbilityCancelled { ability: AbilityId },

    /// Run phase changed
    PhaseChanged { from: RunPhase, to: RunPhase },

    /// The run ended
    RunEnded { victory: bool, survival_secs: f32 },
}

impl GameEventData {
    /// Default priority for this kind of event.
    pub fn priority(&self) -> EventPriority {
        match self {
            GameEventData::RunEnded { .. } => EventPriority::RunOutcome,
            GameEventData::PlayerHurt { .. } => EventPriority::PlayerDamage,
            GameEventData::EnemyKilled { .. }
            | GameEventData::BossDefeated { .. }
            | GameEventData::ObstacleDestroyed { .. } => EventPriority::EnemyDeath,
            GameEventData::DropCollected { .. } | GameEventData::LevelUp { .. } => {
                EventPriority::Progression
            }
            GameEventData::WaveSpawned { .. }
            | GameEventData::SubBossSpawned { .. }
            | GameEventData::BossSpawned { .. }
            | GameEventData::PhaseChanged { .. } => EventPriority::Director,
            GameEventData::AbilityUsed { .. } | GameEventData::AbilityCancelled { .. } => {
                EventPriority::AbilityEffect
            }
            GameEventData::DamageDealt { .. } => EventPriority::Other,
        }
    }
}

/// A game event with timing and priority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Frame when event occurred
    pub frame: u64,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub entity: Option<EntityId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(frame: u64, data: GameEventData) -> Self {
        let entity = match &data {
            GameEventData::DamageDealt { target, .. } => Some(*target),
            GameEventData::EnemyKilled { enemy, .. } => Some(*enemy),
            GameEventData::SubBossSpawned { enemy } => Some(*enemy),
            GameEventData::BossSpawned { enemy } => Some(*enemy),
            GameEventData::BossDefeated { enemy, .. } => Some(*enemy),
            GameEventData::ObstacleDestroyed { obstacle, .. } => Some(*obstacle),
            _ => None,
        };

        Self {
            frame,
            priority: data.priority(),
            entity,
            data,
        }
    }

    /// Create run ended event.
    pub fn run_ended(frame: u64, victory: bool, survival_secs: f32) -> Self {
        Self::new(frame, GameEventData::RunEnded { victory, survival_secs })
    }
}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for GameEvent {}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Order by frame, then priority, then entity id
        self.frame
            .cmp(&other.frame)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity.cmp(&other.entity))
    }
}

/// Sort events deterministically.
pub fn sort_events(events: &mut [GameEvent]) {
    events.sort();
}
