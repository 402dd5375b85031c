//! Triggered Abilities
//!
//! Equipped abilities fire on host input and then go on cooldown.
//! Timed abilities can be cancelled, which ends their effect immediately.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::geometry::circles_overlap;
use crate::game::collision::damage_enemy;
use crate::game::companion::set_companion_multiplier;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::schedule::ScheduleKey;
use crate::game::state::{EntityId, PlayerState, SimulationState};
use crate::game::status::StatusKind;

/// Damage multiplier while Frenzy is active.
pub const FRENZY_DAMAGE_MULT: f32 = 1.25;

/// Cooldown multiplier while Frenzy is active.
pub const FRENZY_COOLDOWN_MULT: f32 = 0.6;

/// Ability identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbilityId {
    /// Become intangible
    PhaseWalk,
    /// Become invulnerable
    Bulwark,
    /// Faster cooldowns, more damage
    Frenzy,
    /// Double companion damage
    Rally,
    /// Radial blast with knockback
    Nova,
    /// Freeze enemies nearby
    Glacier,
    /// Confuse enemies nearby
    Discord,
}

/// What an ability does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AbilityEffect {
    /// Intangibility for `duration` seconds
    Intangible {
        /// Seconds
        duration: f32,
    },
    /// Invulnerability for `duration` seconds
    Invulnerable {
        /// Seconds
        duration: f32,
    },
    /// Frenzy buff for `duration` seconds
    Frenzy {
        /// Seconds
        duration: f32,
    },
    /// Companion damage multiplier for `duration` seconds
    Rally {
        /// Multiplier
        multiplier: f32,
        /// Seconds
        duration: f32,
    },
    /// Instant radial damage
    Nova {
        /// Radius
        radius: f32,
        /// Damage before multipliers
        damage: f32,
        /// Knockback distance
        knockback: f32,
    },
    /// Status applied to every enemy in range
    AreaStatus {
        /// Radius
        radius: f32,
        /// Status kind
        kind: StatusKind,
        /// Seconds
        duration: f32,
        /// Magnitude
        magnitude: f32,
    },
}

/// Static description of an ability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilitySpec {
    /// Display name
    pub name: &'static str,
    /// Cooldown in seconds at multiplier 1.0
    pub cooldown: f32,
    /// Effect
    pub effect: AbilityEffect,
}

const PHASE_WALK: AbilitySpec = AbilitySpec {
    name: "Phase Walk",
    cooldown: 12.0,
    effect: AbilityEffect::Intangible { duration: 2.0 },
};

const BULWARK: AbilitySpec = AbilitySpec {
    name: "Bulwark",
    cooldown: 20.0,
    effect: AbilityEffect::Invulnerable { duration: 3.0 },
};

const FRENZY: AbilitySpec = AbilitySpec {
    name: "Frenzy",
    cooldown: 25.0,
    effect: AbilityEffect::Frenzy { duration: 6.0 },
};

const RALLY: AbilitySpec = AbilitySpec {
    name: "Rally",
    cooldown: 18.0,
    effect: AbilityEffect::Rally { multiplier: 2.0, duration: 5.0 },
};

const NOVA: AbilitySpec = AbilitySpec {
    name: "Nova",
    cooldown: 8.0,
    effect: AbilityEffect::Nova { radius: 180.0, damage: 30.0, knockback: 60.0 },
};

const GLACIER: AbilitySpec = AbilitySpec {
    name: "Glacier",
    cooldown: 15.0,
    effect: AbilityEffect::AreaStatus {
        radius: 220.0,
        kind: StatusKind::Slow,
        duration: 2.5,
        magnitude: 1.0,
    },
};

const DISCORD: AbilitySpec = AbilitySpec {
    name: "Discord",
    cooldown: 16.0,
    effect: AbilityEffect::AreaStatus {
        radius: 200.0,
        kind: StatusKind::Confusion,
        duration: 3.0,
        magnitude: 0.0,
    },
};

impl AbilityId {
    /// All abilities.
    pub const ALL: [AbilityId; 7] = [
        AbilityId::PhaseWalk,
        AbilityId::Bulwark,
        AbilityId::Frenzy,
        AbilityId::Rally,
        AbilityId::Nova,
        AbilityId::Glacier,
        AbilityId::Discord,
    ];

    /// Descriptor for this ability.
    pub fn spec(self) -> &'static AbilitySpec {
        match self {
            AbilityId::PhaseWalk => &PHASE_WALK,
            AbilityId::Bulwark => &BULWARK,
            AbilityId::Frenzy => &FRENZY,
            AbilityId::Rally => &RALLY,
            AbilityId::Nova => &NOVA,
            AbilityId::Glacier => &GLACIER,
            AbilityId::Discord => &DISCORD,
        }
    }
}

/// Activate an equipped ability if it is off cooldown.
///
/// Unequipped or cooling-down abilities are skipped.
pub fn activate_ability(state: &mut SimulationState, ability: AbilityId) -> Option<GameEvent> {
    let Some(&remaining) = state.player.ability_cooldowns.get(&ability) else {
        debug!(?ability, "ability not equipped, ignoring trigger");
        return None;
    };
    if remaining > 0.0 {
        return None;
    }

    let spec = ability.spec();
    // Cooldown uses the multiplier in force before this activation
    let cooldown = spec.cooldown * state.player.cooldown_mult();

    match spec.effect {
        AbilityEffect::Intangible { duration } => {
            state.player.buffs.intangible = duration;
        }
        AbilityEffect::Invulnerable { duration } => {
            state.player.buffs.invulnerable = duration;
        }
        AbilityEffect::Frenzy { duration } => {
            state.player.buffs.frenzy = duration;
        }
        AbilityEffect::Rally { multiplier, duration } => {
            set_companion_multiplier(state, multiplier, duration);
        }
        AbilityEffect::Nova { radius, damage, knockback } => {
            let origin = state.player.position;
            let damage = damage * state.player.damage_mult();
            for id in enemies_in_radius(state, radius) {
                damage_enemy(state, id, damage, origin, knockback, None);
            }
            state.emit_burst(origin, 24);
        }
        AbilityEffect::AreaStatus { radius, kind, duration, magnitude } => {
            for id in enemies_in_radius(state, radius) {
                if let Some(enemy) = state.enemies.get_mut(&id) {
                    enemy.status.apply(kind, duration, magnitude);
                }
            }
        }
    }

    state.player.ability_cooldowns.insert(ability, cooldown);
    state.player.ability_cooldown_totals.insert(ability, cooldown);
    Some(GameEvent::new(state.frame, GameEventData::AbilityUsed { ability }))
}

/// Cancel a timed ability, ending its effect now.
///
/// Returns `None` when nothing was active.
pub fn cancel_ability(state: &mut SimulationState, ability: AbilityId) -> Option<GameEvent> {
    let player = &mut state.player;
    let cancelled = match ability.spec().effect {
        AbilityEffect::Intangible { .. } => std::mem::take(&mut player.buffs.intangible) > 0.0,
        AbilityEffect::Invulnerable { .. } => std::mem::take(&mut player.buffs.invulnerable) > 0.0,
        AbilityEffect::Frenzy { .. } => std::mem::take(&mut player.buffs.frenzy) > 0.0,
        AbilityEffect::Rally { .. } => {
            let pending = state.scheduler.cancel(ScheduleKey::CompanionRestore);
            player.companion_damage_mult = 1.0;
            pending
        }
        AbilityEffect::Nova { .. } | AbilityEffect::AreaStatus { .. } => false,
    };

    if !cancelled {
        debug!(?ability, "nothing to cancel");
        return None;
    }
    Some(GameEvent::new(state.frame, GameEventData::AbilityCancelled { ability }))
}

/// Count ability cooldowns down, clamping at 0.
pub fn tick_ability_cooldowns(player: &mut PlayerState, dt: f32) {
    for cooldown in player.ability_cooldowns.values_mut() {
        *cooldown = (*cooldown - dt).max(0.0);
    }
}

/// Remaining cooldown as a fraction of the full cooldown (0 = ready).
pub fn cooldown_fraction(player: &PlayerState, ability: AbilityId) -> f32 {
    let remaining = player.ability_cooldowns.get(&ability).copied().unwrap_or(0.0);
    let full = player
        .ability_cooldown_totals
        .get(&ability)
        .copied()
        .unwrap_or(ability.spec().cooldown * player.stats.cooldown_mult);
    if full <= 0.0 {
        return 0.0;
    }
    (remaining / full).clamp(0.0, 1.0)
}

fn enemies_in_radius(state: &SimulationState, radius: f32) -> Vec<EntityId> {
    let origin = state.player.position;
    state
        .enemies
        .values()
        .filter(|e| e.is_active() && circles_overlap(origin, radius, e.position, e.radius))
        .map(|e| e.id)
        .collect()
}
