//! Companion/Orbital Subsystem
//!
//! Companions circle the player on a fixed angular path and damage enemies
//! they touch. Each kind also grants a small passive bonus per orbiter.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompanionLoadout;
use crate::core::geometry::circles_overlap;
use crate::game::collision::damage_enemy;
use crate::game::schedule::{ScheduleKey, ScheduledAction};
use crate::game::state::{Companion, EntityId, PlayerState, SimulationState};
use crate::game::status::{OnHitStatus, StatusKind};

/// Seconds before companions may hit the same enemy again.
pub const ORBITAL_HIT_COOLDOWN: f32 = 0.5;

/// Radial wobble frequency (radians per second).
const WOBBLE_FREQUENCY: f32 = 2.0;

/// Companion kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompanionKind {
    /// Close, quick spirit; passive luck
    Wisp,
    /// Spinning blade that bleeds; passive damage
    Blade,
    /// Wide, slow orb that chills; passive armor
    Frost,
    /// Counter-rotating flame that burns; passive cooldowns
    Ember,
}

/// Static description of a companion kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompanionSpec {
    /// Orbit radius
    pub radius: f32,
    /// Radial wobble amplitude
    pub wobble: f32,
    /// Radians per second (negative = clockwise)
    pub angular_speed: f32,
    /// Contact radius
    pub capture_radius: f32,
    /// Contact damage
    pub damage: f32,
    /// Status on contact
    pub status: Option<OnHitStatus>,
}

impl CompanionKind {
    /// Descriptor for this kind.
    pub fn spec(self) -> CompanionSpec {
        match self {
            CompanionKind::Wisp => CompanionSpec {
                radius: 70.0,
                wobble: 6.0,
                angular_speed: 2.5,
                capture_radius: 14.0,
                damage: 6.0,
                status: None,
            },
            CompanionKind::Blade => CompanionSpec {
                radius: 90.0,
                wobble: 0.0,
                angular_speed: 3.0,
                capture_radius: 16.0,
                damage: 10.0,
                status: Some(OnHitStatus { kind: StatusKind::Bleed, duration: 3.0, magnitude: 2.0 }),
            },
            CompanionKind::Frost => CompanionSpec {
                radius: 110.0,
                wobble: 10.0,
                angular_speed: 2.0,
                capture_radius: 20.0,
                damage: 4.0,
                status: Some(OnHitStatus { kind: StatusKind::Slow, duration: 1.5, magnitude: 0.3 }),
            },
            CompanionKind::Ember => CompanionSpec {
                radius: 80.0,
                wobble: 4.0,
                angular_speed: -2.8,
                capture_radius: 14.0,
                damage: 8.0,
                status: Some(OnHitStatus { kind: StatusKind::Burn, duration: 2.0, magnitude: 3.0 }),
            },
        }
    }

    /// Apply `levels` worth of this kind's passive bonus.
    fn apply_passive(self, player: &mut PlayerState, levels: u32) {
        let n = levels as f32;
        let stats = &mut player.stats;
        match self {
            CompanionKind::Wisp => stats.luck += 0.05 * n,
            CompanionKind::Blade => stats.damage_mult += 0.03 * n,
            CompanionKind::Frost => stats.armor += n,
            CompanionKind::Ember => stats.cooldown_mult *= 0.98f32.powi(levels as i32),
        }
    }
}

/// Build the orbiters for a run, evenly spaced per kind.
pub fn spawn_companions(loadouts: &[CompanionLoadout]) -> Vec<Companion> {
    let mut companions = Vec::new();
    for loadout in loadouts {
        let spec = loadout.kind.spec();
        for i in 0..loadout.level {
            companions.push(Companion {
                kind: loadout.kind,
                base_angle: TAU * i as f32 / loadout.level as f32,
                radius: spec.radius,
                wobble: spec.wobble,
                angular_speed: spec.angular_speed,
                capture_radius: spec.capture_radius,
                damage: spec.damage,
                status: spec.status,
            });
        }
    }
    companions
}

/// Record passive levels and apply their stat bonuses.
pub fn apply_companion_passives(player: &mut PlayerState, loadouts: &[CompanionLoadout]) {
    for loadout in loadouts {
        if loadout.level == 0 {
            continue;
        }
        *player.passive_levels.entry(loadout.kind).or_insert(0) += loadout.level;
        loadout.kind.apply_passive(player, loadout.level);
    }
}

/// Position of a companion at simulated time `t`.
pub fn orbit_position(companion: &Companion, center: Vec2, t: f32) -> Vec2 {
    let angle = companion.base_angle + t * companion.angular_speed;
    let radius = companion.radius + companion.wobble * (t * WOBBLE_FREQUENCY).sin();
    center + Vec2::from_angle(angle) * radius
}

/// Advance orbital cooldowns and resolve companion contacts.
pub fn update_companions(state: &mut SimulationState, dt: f32) {
    // 1. Per-enemy contact cooldowns
    for enemy in state.enemies.values_mut() {
        enemy.orbital_cooldown = (enemy.orbital_cooldown - dt).max(0.0);
    }
    if state.companions.is_empty() {
        return;
    }

    // 2. Collect contacts (status applied here, damage after)
    let t = state.elapsed;
    let center = state.player.position;
    let multiplier = state.player.companion_damage_mult;
    let mut hits: Vec<(EntityId, f32, Vec2)> = Vec::new();

    for companion in &state.companions {
        let position = orbit_position(companion, center, t);
        for enemy in state.enemies.values_mut() {
            if !enemy.is_active() || enemy.orbital_cooldown > 0.0 {
                continue;
            }
            if !circles_overlap(position, companion.capture_radius, enemy.position, enemy.radius) {
                continue;
            }
            enemy.orbital_cooldown = ORBITAL_HIT_COOLDOWN;
            if let Some(status) = companion.status {
                if !enemy.status.has(status.kind) {
                    enemy.status.apply_payload(&status);
                }
            }
            hits.push((enemy.id, companion.damage * multiplier, position));
        }
    }

    // 3. Apply damage
    for (id, damage, source) in hits {
        damage_enemy(state, id, damage, source, 0.0, None);
    }
}

/// Set the companion damage multiplier for `duration` seconds.
///
/// Retriggering replaces the pending restore, so it runs exactly once.
pub fn set_companion_multiplier(state: &mut SimulationState, multiplier: f32, duration: f32) {
    state.player.companion_damage_mult = multiplier;
    state.scheduler.schedule_keyed(
        ScheduleKey::CompanionRestore,
        state.elapsed + duration,
        ScheduledAction::RestoreCompanionMultiplier,
    );
    debug!(multiplier, until = state.elapsed + duration, "companion multiplier set");
}

/// Restore the companion damage multiplier to 1.0.
pub fn restore_companion_multiplier(state: &mut SimulationState) {
    debug!(from = state.player.companion_damage_mult, "companion multiplier restored");
    state.player.companion_damage_mult = 1.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, SimConfig};
    use crate::game::state::{Enemy, EnemyKind};

    fn state_with(companions: Vec<CompanionLoadout>) -> SimulationState {
        let run = RunConfig { companions, ..RunConfig::default() };
        let mut state = SimulationState::new(&run, &SimConfig::default());
        state.obstacles.clear();
        state
    }

    fn blade() -> CompanionLoadout {
        CompanionLoadout { kind: CompanionKind::Blade, level: 1 }
    }

    #[test]
    fn test_spawn_and_passives() {
        let state = state_with(vec![
            CompanionLoadout { kind: CompanionKind::Wisp, level: 3 },
            CompanionLoadout { kind: CompanionKind::Frost, level: 2 },
        ]);

        assert_eq!(state.companions.len(), 5);
        assert_eq!(state.player.passive_levels[&CompanionKind::Wisp], 3);
        assert_eq!(state.player.stats.armor, 2.0);
        assert!((state.player.stats.luck - 0.15).abs() < 1e-6);

        let wisps: Vec<f32> = state
            .companions
            .iter()
            .filter(|c| c.kind == CompanionKind::Wisp)
            .map(|c| c.base_angle)
            .collect();
        assert!((wisps[1] - TAU / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_orbit_position() {
        let companion = &spawn_companions(&[blade()])[0];
        let start = orbit_position(companion, Vec2::ZERO, 0.0);
        assert!((start - Vec2::new(90.0, 0.0)).length() < 1e-3);

        // Quarter turn after (pi/2)/3 seconds
        let t = std::f32::consts::FRAC_PI_2 / 3.0;
        let later = orbit_position(companion, Vec2::new(10.0, 10.0), t);
        assert!((later - Vec2::new(10.0, 100.0)).length() < 1e-3);
    }

    #[test]
    fn test_contact_gated_by_orbital_cooldown() {
        let mut state = state_with(vec![blade()]);
        let id = state.insert_enemy(Enemy::new(0, Vec2::new(90.0, 0.0), EnemyKind::Normal, 100.0, 1.0, 0.0));

        update_companions(&mut state, 0.016);
        assert_eq!(state.enemies[&id].hp, 90.0);
        assert!(state.enemies[&id].status.has(StatusKind::Bleed));

        // Same position next frame: still on cooldown
        update_companions(&mut state, 0.016);
        assert_eq!(state.enemies[&id].hp, 90.0);

        state.enemies.get_mut(&id).unwrap().orbital_cooldown = 0.0;
        update_companions(&mut state, 0.0);
        assert_eq!(state.enemies[&id].hp, 80.0);
    }

    #[test]
    fn test_status_not_reapplied_while_active() {
        let mut state = state_with(vec![blade()]);
        let id = state.insert_enemy(Enemy::new(0, Vec2::new(90.0, 0.0), EnemyKind::Normal, 100.0, 1.0, 0.0));
        state.enemies.get_mut(&id).unwrap().status.apply(StatusKind::Bleed, 0.2, 1.0);

        update_companions(&mut state, 0.0);

        let bleed = state.enemies[&id].status.get(StatusKind::Bleed).copied().unwrap();
        assert_eq!(bleed.remaining, 0.2);
        assert_eq!(bleed.magnitude, 1.0);
    }

    #[test]
    fn test_multiplier_scales_damage() {
        let mut state = state_with(vec![blade()]);
        let id = state.insert_enemy(Enemy::new(0, Vec2::new(90.0, 0.0), EnemyKind::Normal, 100.0, 1.0, 0.0));
        set_companion_multiplier(&mut state, 2.0, 5.0);

        update_companions(&mut state, 0.0);
        assert_eq!(state.enemies[&id].hp, 80.0);
    }

    #[test]
    fn test_restore_runs_once_after_retrigger() {
        let mut state = state_with(vec![blade()]);
        set_companion_multiplier(&mut state, 2.0, 5.0);

        state.elapsed = 3.0;
        set_companion_multiplier(&mut state, 2.0, 5.0);

        // The first restore (t = 5) is stale
        assert!(state.scheduler.drain_due(5.0).is_empty());
        assert_eq!(state.player.companion_damage_mult, 2.0);

        let due = state.scheduler.drain_due(8.0);
        assert_eq!(due, vec![ScheduledAction::RestoreCompanionMultiplier]);
        restore_companion_multiplier(&mut state);
        assert_eq!(state.player.companion_damage_mult, 1.0);
        assert!(state.scheduler.drain_due(100.0).is_empty());
    }
}
