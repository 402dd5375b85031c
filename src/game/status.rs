//! Status Effect Engine
//!
//! Bleed, burn, slow and confusion. Every entity carries one slot per kind;
//! reapplying a kind replaces its duration and magnitude instead of stacking.

use serde::{Deserialize, Serialize};

use crate::game::collision::kill_enemy;
use crate::game::state::{EntityId, SimulationState};

/// Kind of timed effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// Damage over time (magnitude = damage per second)
    Bleed,
    /// Damage over time (magnitude = damage per second)
    Burn,
    /// Speed reduction (magnitude = fraction removed, >= 1 freezes)
    Slow,
    /// Targets the nearest other enemy instead of the player
    Confusion,
}

impl StatusKind {
    /// Number of kinds.
    pub const COUNT: usize = 4;

    /// All kinds in slot order.
    pub const ALL: [StatusKind; Self::COUNT] = [
        StatusKind::Bleed,
        StatusKind::Burn,
        StatusKind::Slow,
        StatusKind::Confusion,
    ];

    #[inline]
    fn slot(self) -> usize {
        match self {
            StatusKind::Bleed => 0,
            StatusKind::Burn => 1,
            StatusKind::Slow => 2,
            StatusKind::Confusion => 3,
        }
    }

    /// Whether this kind deals damage over time.
    #[inline]
    pub fn is_damage_over_time(self) -> bool {
        matches!(self, StatusKind::Bleed | StatusKind::Burn)
    }
}

/// A status payload carried by projectiles, companions and enemy elements.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnHitStatus {
    /// Kind applied
    pub kind: StatusKind,
    /// Duration in seconds
    pub duration: f32,
    /// Magnitude (meaning depends on kind)
    pub magnitude: f32,
}

/// One active effect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Kind
    pub kind: StatusKind,
    /// Seconds left
    pub remaining: f32,
    /// Magnitude
    pub magnitude: f32,
}

/// Per-entity effect set, one slot per kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    slots: [Option<StatusEffect>; StatusKind::COUNT],
}

impl StatusEffects {
    /// Apply an effect, refreshing any existing effect of the same kind.
    pub fn apply(&mut self, kind: StatusKind, duration: f32, magnitude: f32) {
        if !(duration > 0.0) {
            return;
        }
        self.slots[kind.slot()] = Some(StatusEffect {
            kind,
            remaining: duration,
            magnitude,
        });
    }

    /// Apply a status payload.
    pub fn apply_payload(&mut self, status: &OnHitStatus) {
        self.apply(status.kind, status.duration, status.magnitude);
    }

    /// Active effect of the given kind.
    #[inline]
    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.slots[kind.slot()].as_ref()
    }

    /// Whether an effect of the given kind is active.
    #[inline]
    pub fn has(&self, kind: StatusKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    /// Remove every effect.
    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    /// Whether the entity is confused.
    #[inline]
    pub fn is_confused(&self) -> bool {
        self.has(StatusKind::Confusion)
    }

    /// Multiplier applied to movement speed. Zero when frozen.
    pub fn speed_factor(&self) -> f32 {
        match self.get(StatusKind::Slow) {
            Some(slow) => (1.0 - slow.magnitude).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    /// Advance every timer by `dt`, returning the damage-over-time dealt.
    ///
    /// Each DoT deals `magnitude * min(dt, remaining)`, so an effect never
    /// deals more than `magnitude * duration` in total.
    pub fn tick(&mut self, dt: f32) -> f32 {
        let mut damage = 0.0;
        for slot in self.slots.iter_mut() {
            let Some(effect) = slot.as_mut() else { continue };
            if effect.kind.is_damage_over_time() {
                damage += effect.magnitude * dt.min(effect.remaining);
            }
            effect.remaining -= dt;
            if effect.remaining <= 0.0 {
                *slot = None;
            }
        }
        damage
    }
}

/// Tick every entity's effects and apply damage over time.
///
/// Enemies brought to 0 hp go through the normal death path.
pub fn tick_status_effects(state: &mut SimulationState, dt: f32) {
    let mut killed: Vec<EntityId> = Vec::new();

    for (id, enemy) in state.enemies.iter_mut() {
        if enemy.is_dying() {
            continue;
        }
        let damage = enemy.status.tick(dt);
        if damage > 0.0 {
            enemy.hp = (enemy.hp - damage).max(0.0);
            if enemy.hp <= 0.0 {
                killed.push(*id);
            }
        }
    }

    for id in killed {
        kill_enemy(state, id);
    }

    let player = &mut state.player;
    let damage = player.status.tick(dt);
    if damage > 0.0 && !player.buffs.is_invulnerable() {
        player.hp = (player.hp - damage).clamp(0.0, player.max_hp);
    }
}
