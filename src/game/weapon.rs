//! Weapons
//!
//! Closed set of weapon kinds, each resolved once to a static descriptor.
//! Weapons fire automatically whenever their cooldown reaches 0.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SimConfig;
use crate::core::geometry::direction_to;
use crate::game::state::{Owner, Projectile, SimulationState, PIERCE_UNLIMITED};
use crate::game::status::{OnHitStatus, StatusKind};

/// Maximum weapons the player can hold.
pub const MAX_WEAPON_SLOTS: usize = 6;

/// Maximum level of a single weapon.
pub const MAX_WEAPON_LEVEL: u32 = 8;

/// Shortest cooldown any weapon can reach (seconds).
pub const MIN_COOLDOWN: f32 = 0.05;

/// Angle between projectiles in a multi-shot fan (radians).
const FAN_STEP: f32 = 0.15;

/// How a weapon picks its direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aim {
    /// At the nearest live enemy, falling back to facing
    NearestEnemy,
    /// Along the last movement direction
    Facing,
    /// Random direction
    Scatter,
}

/// Static description of a weapon kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponSpec {
    /// Display name
    pub name: &'static str,
    /// Seconds between volleys at cooldown multiplier 1.0
    pub cooldown: f32,
    /// Damage per hit at level 1
    pub damage: f32,
    /// Projectile speed
    pub speed: f32,
    /// Projectile lifetime
    pub lifetime: f32,
    /// Projectile radius
    pub radius: f32,
    /// Pierce budget
    pub pierce: u32,
    /// Projectiles per volley at level 1
    pub base_count: u32,
    /// Aim rule
    pub aim: Aim,
    /// Splash radius
    pub explosion_radius: Option<f32>,
    /// Lingering zone radius and tick interval
    pub zone: Option<(f32, f32)>,
    /// On-hit status
    pub status: Option<OnHitStatus>,
    /// Knockback distance
    pub knockback: f32,
}

/// Weapon kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Homing-ish bolt at the nearest enemy
    ArcaneBolt,
    /// Fast piercing knife along facing
    ThrowingKnife,
    /// Exploding fireball that burns
    Fireball,
    /// Slow axe that pierces everything
    SpinningAxe,
    /// Puddle that damages everything inside
    HolyWater,
}

const ARCANE_BOLT: WeaponSpec = WeaponSpec {
    name: "Arcane Bolt",
    cooldown: 1.0,
    damage: 10.0,
    speed: 420.0,
    lifetime: 1.5,
    radius: 6.0,
    pierce: 0,
    base_count: 1,
    aim: Aim::NearestEnemy,
    explosion_radius: None,
    zone: None,
    status: None,
    knockback: 8.0,
};

const THROWING_KNIFE: WeaponSpec = WeaponSpec {
    name: "Throwing Knife",
    cooldown: 0.6,
    damage: 7.0,
    speed: 520.0,
    lifetime: 1.0,
    radius: 5.0,
    pierce: 2,
    base_count: 1,
    aim: Aim::Facing,
    explosion_radius: None,
    zone: None,
    status: Some(OnHitStatus { kind: StatusKind::Bleed, duration: 2.0, magnitude: 2.0 }),
    knockback: 0.0,
};

const FIREBALL: WeaponSpec = WeaponSpec {
    name: "Fireball",
    cooldown: 2.2,
    damage: 18.0,
    speed: 300.0,
    lifetime: 2.0,
    radius: 9.0,
    pierce: 0,
    base_count: 1,
    aim: Aim::NearestEnemy,
    explosion_radius: Some(60.0),
    zone: None,
    status: Some(OnHitStatus { kind: StatusKind::Burn, duration: 2.0, magnitude: 5.0 }),
    knockback: 0.0,
};

const SPINNING_AXE: WeaponSpec = WeaponSpec {
    name: "Spinning Axe",
    cooldown: 3.0,
    damage: 14.0,
    speed: 260.0,
    lifetime: 3.0,
    radius: 12.0,
    pierce: PIERCE_UNLIMITED,
    base_count: 1,
    aim: Aim::Scatter,
    explosion_radius: None,
    zone: None,
    status: None,
    knockback: 12.0,
};

const HOLY_WATER: WeaponSpec = WeaponSpec {
    name: "Holy Water",
    cooldown: 4.0,
    damage: 6.0,
    speed: 0.0,
    lifetime: 3.0,
    radius: 0.0,
    pierce: PIERCE_UNLIMITED,
    base_count: 1,
    aim: Aim::Scatter,
    explosion_radius: None,
    zone: Some((70.0, 0.5)),
    status: None,
    knockback: 0.0,
};

impl WeaponKind {
    /// All kinds.
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::ArcaneBolt,
        WeaponKind::ThrowingKnife,
        WeaponKind::Fireball,
        WeaponKind::SpinningAxe,
        WeaponKind::HolyWater,
    ];

    /// Descriptor for this kind.
    pub fn spec(self) -> &'static WeaponSpec {
        match self {
            WeaponKind::ArcaneBolt => &ARCANE_BOLT,
            WeaponKind::ThrowingKnife => &THROWING_KNIFE,
            WeaponKind::Fireball => &FIREBALL,
            WeaponKind::SpinningAxe => &SPINNING_AXE,
            WeaponKind::HolyWater => &HOLY_WATER,
        }
    }
}

/// An owned weapon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponSlot {
    /// Kind
    pub kind: WeaponKind,
    /// Level (1..=MAX_WEAPON_LEVEL)
    pub level: u32,
    /// Seconds until the next volley (0 = ready)
    pub cooldown: f32,
}

impl WeaponSlot {
    /// Level 1 weapon, ready to fire.
    pub fn new(kind: WeaponKind) -> Self {
        Self { kind, level: 1, cooldown: 0.0 }
    }

    /// Damage multiplier from level.
    pub fn level_factor(&self) -> f32 {
        1.0 + 0.2 * (self.level.saturating_sub(1)) as f32
    }

    /// Projectiles per volley before player bonuses.
    pub fn volley_size(&self) -> u32 {
        self.kind.spec().base_count + self.level.saturating_sub(1) / 2
    }
}

/// Count weapon cooldowns down and fire every weapon that is ready.
pub fn update_weapons(state: &mut SimulationState, dt: f32, config: &SimConfig) {
    for index in 0..state.player.weapons.len() {
        let ready = {
            let slot = &mut state.player.weapons[index];
            // Clamp before the fire check so the timer never goes negative
            slot.cooldown = (slot.cooldown - dt).max(0.0);
            slot.cooldown <= 0.0
        };
        if !ready {
            continue;
        }

        fire_weapon(state, index, config);

        let cooldown_mult = state.player.cooldown_mult();
        let slot = &mut state.player.weapons[index];
        slot.cooldown = (slot.kind.spec().cooldown * cooldown_mult).max(MIN_COOLDOWN);
    }
}

/// Fire one volley from the weapon in `index`.
fn fire_weapon(state: &mut SimulationState, index: usize, config: &SimConfig) {
    let slot = state.player.weapons[index].clone();
    let spec = slot.kind.spec();
    let player = &state.player;

    let origin = player.position;
    let damage = spec.damage * slot.level_factor() * player.damage_mult();
    let count = slot.volley_size() + player.stats.projectile_count;
    let knockback = spec.knockback + player.stats.knockback;
    let facing = player.direction;

    let aim = match spec.aim {
        Aim::NearestEnemy => state
            .nearest_enemy(origin, None)
            .and_then(|(_, target)| direction_to(origin, target))
            .unwrap_or(facing),
        Aim::Facing => facing,
        Aim::Scatter => state.rng.random_direction(),
    };

    trace!(weapon = spec.name, count, "weapon fired");

    for i in 0..count {
        let projectile = if let Some((zone_radius, interval)) = spec.zone {
            let position = state.rng.random_in_ring(origin, 60.0, 160.0);
            Projectile::new(Owner::Player, position, Vec2::ZERO, damage, spec.lifetime)
                .with_zone(zone_radius, interval)
                .with_status(spec.status)
        } else {
            let offset = (i as f32 - (count - 1) as f32 / 2.0) * FAN_STEP;
            let direction = Vec2::from_angle(offset).rotate(aim);
            Projectile::new(Owner::Player, origin, direction * spec.speed, damage, spec.lifetime)
                .with_radius(spec.radius)
                .with_pierce(spec.pierce)
                .with_explosion(spec.explosion_radius)
                .with_status(spec.status)
                .with_knockback(knockback)
        };

        if state.spawn_projectile(projectile, config.max_projectiles).is_none() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::game::state::{Enemy, EnemyKind};
    use proptest::prelude::*;

    fn new_state() -> SimulationState {
        SimulationState::new(&RunConfig::default(), &SimConfig::default())
    }

    #[test]
    fn test_fires_immediately_then_waits() {
        let mut state = new_state();
        let config = SimConfig::default();

        update_weapons(&mut state, 0.016, &config);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.player.weapons[0].cooldown, 1.0);

        update_weapons(&mut state, 0.5, &config);
        assert_eq!(state.projectiles.len(), 1);

        update_weapons(&mut state, 0.5, &config);
        assert_eq!(state.projectiles.len(), 2);
    }

    #[test]
    fn test_bolt_aims_at_nearest_enemy() {
        let mut state = new_state();
        state.insert_enemy(Enemy::new(0, Vec2::new(0.0, 200.0), EnemyKind::Normal, 10.0, 1.0, 0.0));

        update_weapons(&mut state, 0.016, &SimConfig::default());
        let velocity = state.projectiles[0].velocity.normalize();
        assert!((velocity - Vec2::Y).length() < 1e-4);
    }

    #[test]
    fn test_level_and_bonus_projectiles() {
        let mut state = new_state();
        state.player.weapons[0].level = 5;
        state.player.stats.projectile_count = 1;

        update_weapons(&mut state, 0.016, &SimConfig::default());
        // 1 base + 2 from level + 1 bonus
        assert_eq!(state.projectiles.len(), 4);
        assert!((state.projectiles[0].damage - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_cooldown_multiplier_has_floor() {
        let mut state = new_state();
        state.player.stats.cooldown_mult = 0.0;
        update_weapons(&mut state, 0.016, &SimConfig::default());
        assert_eq!(state.player.weapons[0].cooldown, MIN_COOLDOWN);
    }

    #[test]
    fn test_projectile_cap_refuses_volley() {
        let mut state = new_state();
        let config = SimConfig { max_projectiles: 0, ..SimConfig::default() };
        update_weapons(&mut state, 0.016, &config);
        assert!(state.projectiles.is_empty());
        // The attempt still consumed the cooldown
        assert!(state.player.weapons[0].cooldown > 0.0);
    }

    #[test]
    fn test_holy_water_places_zone() {
        let mut state = new_state();
        state.player.weapons[0] = WeaponSlot::new(WeaponKind::HolyWater);
        update_weapons(&mut state, 0.016, &SimConfig::default());

        let zone = &state.projectiles[0];
        assert!(zone.is_zone());
        assert_eq!(zone.velocity, Vec2::ZERO);
        let d = zone.position.distance(state.player.position);
        assert!((59.9..=160.1).contains(&d));
    }

    proptest! {
        #[test]
        fn prop_cooldown_never_negative_and_fires_once_per_window(
            dts in prop::collection::vec(0.0f32..0.1, 1..300)
        ) {
            let mut state = new_state();
            let config = SimConfig::default();
            let mut total = 0.0f32;

            for dt in dts {
                update_weapons(&mut state, dt, &config);
                total += dt;
                prop_assert!(state.player.weapons[0].cooldown >= 0.0);
            }

            // Arcane Bolt: cooldown 1.0, one projectile per volley
            let fired = state.projectiles.len() as f32;
            prop_assert!(fired <= (total / 1.0 + 1e-3).floor() + 1.0);
        }
    }
}
