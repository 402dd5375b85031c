//! Enemy AI
//!
//! Targeting, movement and the attack state machine.
//!
//! Every enemy carries a single countdown `attack_timer`. A swing starts by
//! setting it to the profile's cycle length; it then counts down to 0.
//! [`AttackPhase::from_timer`] is the one place the timer is turned into a
//! phase:
//!
//! ```text
//! Melee  (2.0 s): Windup  > 1.5 >= Impact > 1.2 >= Recover > 0 = Approach
//! Ranged (3.0 s): Aim     > 2.0 >= Fire   > 1.6 >= Cooldown > 0 = Approach
//! Boss   (4.0 s): Windup  > 2.5 >= Impact > 2.0 >= Recover > 0 = Approach
//! ```
//!
//! Damage (or the volley) is delivered once, on the frame the timer crosses
//! the impact threshold.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SimConfig;
use crate::core::geometry::direction_to;
use crate::game::collision::{hit_player, infight_damage, push_out_of_obstacles};
use crate::game::state::{
    BossPattern, Element, Enemy, EntityId, Owner, Projectile, SimulationState, PLAYER_RADIUS,
};

/// Melee swing length.
pub const MELEE_CYCLE: f32 = 2.0;
/// Melee impact threshold.
pub const MELEE_IMPACT_AT: f32 = 1.5;
/// End of the melee impact window.
pub const MELEE_IMPACT_END: f32 = 1.2;

/// Ranged attack length.
pub const RANGED_CYCLE: f32 = 3.0;
/// Ranged fire threshold.
pub const RANGED_FIRE_AT: f32 = 2.0;
/// End of the ranged fire window.
pub const RANGED_FIRE_END: f32 = 1.6;

/// Boss attack length.
pub const BOSS_CYCLE: f32 = 4.0;
/// Boss impact threshold.
pub const BOSS_IMPACT_AT: f32 = 2.5;
/// End of the boss impact window.
pub const BOSS_IMPACT_END: f32 = 2.0;

/// Speed multiplier while telegraphing (windup / aim).
pub const TELEGRAPH_SPEED_FACTOR: f32 = 0.1;

/// Melee reach beyond touching distance.
pub const MELEE_REACH: f32 = 12.0;

/// Ranged enemies back away inside this distance.
pub const STANDOFF_MIN: f32 = 160.0;
/// Ranged enemies approach beyond this distance.
pub const STANDOFF_MAX: f32 = 320.0;

/// Distance at which ranged enemies start an attack.
pub const RANGED_ATTACK_RANGE: f32 = 400.0;
/// Distance at which bosses start an attack.
pub const BOSS_ATTACK_RANGE: f32 = 700.0;

const ENEMY_PROJECTILE_LIFETIME: f32 = 4.0;
const BOSS_PROJECTILE_SPEED: f32 = 200.0;
const BOSS_PROJECTILE_DAMAGE: f32 = 0.5;
const BOSS_ZONE_RADIUS: f32 = 70.0;
const BOSS_ZONE_LIFETIME: f32 = 3.0;
const BOSS_ZONE_INTERVAL: f32 = 0.5;

/// Timer shape of an enemy's attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackProfile {
    /// Close-range swing
    Melee,
    /// Projectile attack
    Ranged,
    /// Sub-boss / boss pattern
    Boss,
}

impl AttackProfile {
    /// Profile for an enemy.
    pub fn for_enemy(enemy: &Enemy) -> Self {
        if enemy.kind.is_boss_class() {
            AttackProfile::Boss
        } else if enemy.element.is_some() {
            AttackProfile::Ranged
        } else {
            AttackProfile::Melee
        }
    }

    /// Full cycle length.
    pub fn cycle(self) -> f32 {
        match self {
            AttackProfile::Melee => MELEE_CYCLE,
            AttackProfile::Ranged => RANGED_CYCLE,
            AttackProfile::Boss => BOSS_CYCLE,
        }
    }

    /// Threshold whose crossing delivers the attack.
    pub fn strike_at(self) -> f32 {
        match self {
            AttackProfile::Melee => MELEE_IMPACT_AT,
            AttackProfile::Ranged => RANGED_FIRE_AT,
            AttackProfile::Boss => BOSS_IMPACT_AT,
        }
    }

    /// End of the strike window.
    pub fn strike_end(self) -> f32 {
        match self {
            AttackProfile::Melee => MELEE_IMPACT_END,
            AttackProfile::Ranged => RANGED_FIRE_END,
            AttackProfile::Boss => BOSS_IMPACT_END,
        }
    }
}

/// Attack phase derived from the timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPhase {
    /// No attack in progress
    Approach,
    /// Melee telegraph
    Windup,
    /// Melee strike window
    Impact,
    /// Melee recovery
    Recover,
    /// Ranged telegraph
    Aim,
    /// Ranged fire window
    Fire,
    /// Ranged recovery
    Cooldown,
}

impl AttackPhase {
    /// Derive the phase from a profile and the current timer value.
    pub fn from_timer(profile: AttackProfile, timer: f32) -> Self {
        if timer <= 0.0 {
            return AttackPhase::Approach;
        }
        let before_strike = timer > profile.strike_at();
        let in_window = timer > profile.strike_end();
        match profile {
            AttackProfile::Melee | AttackProfile::Boss => {
                if before_strike {
                    AttackPhase::Windup
                } else if in_window {
                    AttackPhase::Impact
                } else {
                    AttackPhase::Recover
                }
            }
            AttackProfile::Ranged => {
                if before_strike {
                    AttackPhase::Aim
                } else if in_window {
                    AttackPhase::Fire
                } else {
                    AttackPhase::Cooldown
                }
            }
        }
    }

    /// Telegraphing phases slow the enemy down.
    #[inline]
    pub fn is_telegraph(self) -> bool {
        matches!(self, AttackPhase::Windup | AttackPhase::Aim)
    }

    /// Sprite row for the presentation layer.
    pub fn sprite_row(self) -> u8 {
        match self {
            AttackPhase::Approach => 0,
            AttackPhase::Windup | AttackPhase::Aim => 1,
            AttackPhase::Impact | AttackPhase::Fire => 2,
            AttackPhase::Recover | AttackPhase::Cooldown => 3,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Player { position: Vec2 },
    Enemy { id: EntityId, position: Vec2, radius: f32 },
}

impl Target {
    fn position(self) -> Vec2 {
        match self {
            Target::Player { position } | Target::Enemy { position, .. } => position,
        }
    }

    fn radius(self) -> f32 {
        match self {
            Target::Player { .. } => PLAYER_RADIUS,
            Target::Enemy { radius, .. } => radius,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Strike {
    attacker: EntityId,
    origin: Vec2,
    reach: f32,
    target: Target,
    damage: f32,
    profile: AttackProfile,
    element: Option<Element>,
    pattern: Option<BossPattern>,
    main_boss: bool,
}

/// Run decay, targeting, movement and attacks for every enemy.
pub fn update_enemies(state: &mut SimulationState, dt: f32, config: &SimConfig) {
    // 1. Decay dying enemies; remove once the timer has fully elapsed
    for enemy in state.enemies.values_mut() {
        if let Some(decay) = &mut enemy.dying {
            *decay -= dt;
        }
    }
    state.enemies.retain(|_, e| e.dying.map_or(true, |decay| decay > 0.0));

    // 2. Snapshot live enemies for confusion targeting
    let live: Vec<(EntityId, Vec2, f32)> = state
        .enemies
        .values()
        .filter(|e| e.is_active())
        .map(|e| (e.id, e.position, e.radius))
        .collect();

    let player_position = state.player.position;
    let world = state.world;
    let mut strikes: Vec<Strike> = Vec::new();

    // 3. Target, move, advance the attack timer
    for &(id, _, _) in &live {
        let Some(enemy) = state.enemies.get_mut(&id) else { continue };

        let target = if enemy.status.is_confused() {
            nearest_other(&live, id, enemy.position)
        } else {
            Some(Target::Player { position: player_position })
        };

        let profile = enemy.attack_profile();
        let mut speed = enemy.speed * enemy.status.speed_factor();
        if enemy.attack_phase().is_telegraph() {
            speed *= TELEGRAPH_SPEED_FACTOR;
        }

        let Some(target) = target else {
            // Confused with nobody nearby: finish the current swing, start no new one
            enemy.attack_timer = (enemy.attack_timer - dt).max(0.0);
            continue;
        };

        let target_position = target.position();
        let distance = enemy.position.distance(target_position);
        let reach = enemy.radius + target.radius() + MELEE_REACH;

        if let Some(direction) = direction_to(enemy.position, target_position) {
            let heading = match profile {
                AttackProfile::Ranged if distance < STANDOFF_MIN => -direction,
                AttackProfile::Ranged if distance <= STANDOFF_MAX => Vec2::ZERO,
                AttackProfile::Ranged => direction,
                AttackProfile::Melee | AttackProfile::Boss => {
                    if distance > reach * 0.8 {
                        direction
                    } else {
                        Vec2::ZERO
                    }
                }
            };
            enemy.position += heading * speed * dt;
        }
        enemy.facing = enemy.facing.toward(target_position.x - enemy.position.x);

        let trigger_range = match profile {
            AttackProfile::Melee => reach,
            AttackProfile::Ranged => RANGED_ATTACK_RANGE,
            AttackProfile::Boss => BOSS_ATTACK_RANGE,
        };
        let previous = enemy.attack_timer;
        if previous > 0.0 {
            enemy.attack_timer = (previous - dt).max(0.0);
        } else if distance <= trigger_range {
            enemy.attack_timer = profile.cycle();
        }

        let strike_at = profile.strike_at();
        if previous > strike_at && enemy.attack_timer <= strike_at {
            strikes.push(Strike {
                attacker: id,
                origin: enemy.position,
                reach,
                target,
                damage: enemy.damage,
                profile,
                element: enemy.element,
                pattern: enemy.kind.pattern(),
                main_boss: enemy.kind.is_main_boss(),
            });
        }

        if !enemy.kind.is_boss_class() {
            enemy.position = push_out_of_obstacles(enemy.position, enemy.radius, &state.obstacles);
        }
        enemy.position = world.clamp_circle(enemy.position, enemy.radius);
    }

    // 4. Deliver strikes
    for strike in strikes {
        resolve_strike(state, strike, config);
    }
}

fn nearest_other(live: &[(EntityId, Vec2, f32)], exclude: EntityId, position: Vec2) -> Option<Target> {
    let mut best: Option<(Target, f32)> = None;
    for &(id, other, radius) in live {
        if id == exclude {
            continue;
        }
        let d = other.distance_squared(position);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((Target::Enemy { id, position: other, radius }, d));
        }
    }
    best.map(|(target, _)| target)
}

fn resolve_strike(state: &mut SimulationState, strike: Strike, config: &SimConfig) {
    // The attacker may have died earlier in this pass
    if !state.enemies.get(&strike.attacker).is_some_and(|e| e.is_active()) {
        return;
    }

    let target_position = strike.target.position();
    let in_reach = strike.origin.distance(target_position) <= strike.reach;
    trace!(attacker = strike.attacker, profile = ?strike.profile, in_reach, "enemy strike");

    match (strike.profile, strike.target) {
        (AttackProfile::Melee, Target::Player { .. }) => {
            if in_reach {
                hit_player(state, strike.damage, None);
            }
        }
        (AttackProfile::Melee | AttackProfile::Boss, Target::Enemy { id, .. }) => {
            if in_reach {
                infight_damage(state, id, strike.damage, strike.origin);
            }
        }
        (AttackProfile::Ranged, Target::Player { .. }) => {
            let Some(element) = strike.element else { return };
            let Some(direction) = direction_to(strike.origin, target_position) else { return };
            let projectile = Projectile::new(
                Owner::Enemy,
                strike.origin,
                direction * element.projectile_speed(),
                strike.damage * element.damage_factor(),
                ENEMY_PROJECTILE_LIFETIME,
            )
            .with_status(element.on_hit_status());
            state.spawn_projectile(projectile, config.max_projectiles);
        }
        // Confused ranged enemies hold fire
        (AttackProfile::Ranged, Target::Enemy { .. }) => {}
        (AttackProfile::Boss, Target::Player { .. }) => {
            if in_reach {
                hit_player(state, strike.damage, None);
            }
            if let Some(pattern) = strike.pattern {
                fire_pattern(state, &strike, pattern, target_position, config);
            }
            if strike.main_boss {
                let zone = Projectile::new(
                    Owner::Boss,
                    target_position,
                    Vec2::ZERO,
                    strike.damage * BOSS_PROJECTILE_DAMAGE,
                    BOSS_ZONE_LIFETIME,
                )
                .with_zone(BOSS_ZONE_RADIUS, BOSS_ZONE_INTERVAL);
                state.spawn_projectile(zone, config.max_projectiles);
            }
        }
    }
}

fn fire_pattern(
    state: &mut SimulationState,
    strike: &Strike,
    pattern: BossPattern,
    target: Vec2,
    config: &SimConfig,
) {
    let damage = strike.damage * BOSS_PROJECTILE_DAMAGE;
    let directions: Vec<Vec2> = match pattern {
        BossPattern::RadialBurst { count } => (0..count)
            .map(|i| Vec2::from_angle(TAU * i as f32 / count as f32))
            .collect(),
        BossPattern::AimedVolley { shots, spread } => {
            let aim = direction_to(strike.origin, target).unwrap_or(Vec2::X);
            let step = if shots > 1 { spread / (shots - 1) as f32 } else { 0.0 };
            (0..shots)
                .map(|i| Vec2::from_angle(-spread / 2.0 + step * i as f32).rotate(aim))
                .collect()
        }
    };

    for direction in directions {
        let projectile = Projectile::new(
            Owner::Boss,
            strike.origin,
            direction * BOSS_PROJECTILE_SPEED,
            damage,
            ENEMY_PROJECTILE_LIFETIME,
        )
        .with_radius(8.0);
        if state.spawn_projectile(projectile, config.max_projectiles).is_none() {
            break;
        }
    }
}
