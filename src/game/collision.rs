//! Combat Resolver
//!
//! Projectile motion and every damage-dealing contact of the frame:
//! player projectiles vs enemies and destructible obstacles, zones,
//! hostile projectiles vs the player. Also owns the enemy death path.
//!
//! Hits are gathered first and applied afterwards to avoid borrow issues.

use glam::Vec2;
use tracing::{debug, info};

use crate::core::geometry::{aabb_overlap, circles_overlap, direction_to, EPSILON};
use crate::game::events::GameEventData;
use crate::game::phase::on_boss_defeated;
use crate::game::pickup::drop_loot;
use crate::game::state::{
    EntityId, Obstacle, Owner, SimulationState, DEATH_DECAY, PLAYER_RADIUS,
};
use crate::game::status::OnHitStatus;

/// Fraction of a projectile's damage dealt to other enemies by its explosion.
pub const EXPLOSION_SPLASH: f32 = 0.6;

/// Distance past the world edge at which projectiles are discarded.
const WORLD_MARGIN: f32 = 200.0;

/// Move projectiles, expire them, and resolve their contacts.
pub fn process_projectiles(state: &mut SimulationState, dt: f32) {
    // 1. Motion, lifetime, zone timers
    for projectile in &mut state.projectiles {
        projectile.position += projectile.velocity * dt;
        projectile.lifetime -= dt;
        if let Some(zone) = &mut projectile.zone {
            zone.timer -= dt;
        }
    }

    let world = state.world;
    state.projectiles.retain(|p| {
        p.lifetime > 0.0
            && p.position.x >= world.min.x - WORLD_MARGIN
            && p.position.x <= world.max.x + WORLD_MARGIN
            && p.position.y >= world.min.y - WORLD_MARGIN
            && p.position.y <= world.max.y + WORLD_MARGIN
    });

    let mut consumed = vec![false; state.projectiles.len()];

    // 2. Player projectiles vs enemies
    resolve_enemy_hits(state, &mut consumed);

    // 3. Player projectiles vs destructible obstacles
    resolve_obstacle_hits(state, &mut consumed);

    // 4. Lingering zones
    resolve_zones(state);

    // 5. Hostile projectiles vs player
    resolve_player_hits(state, &mut consumed);

    let mut index = 0;
    state.projectiles.retain(|_| {
        let keep = !consumed[index];
        index += 1;
        keep
    });
}

fn resolve_enemy_hits(state: &mut SimulationState, consumed: &mut [bool]) {
    for index in 0..state.projectiles.len() {
        let projectile = &state.projectiles[index];
        if consumed[index] || projectile.owner != Owner::Player || projectile.is_zone() {
            continue;
        }

        let targets: Vec<EntityId> = state
            .enemies
            .values()
            .filter(|e| {
                e.is_active()
                    && !projectile.has_hit(e.id)
                    && aabb_overlap(projectile.position, projectile.radius, e.position, e.radius)
            })
            .map(|e| e.id)
            .collect();

        for target in targets {
            // An earlier splash this frame may have killed it
            if !state.enemies.get(&target).is_some_and(|e| e.is_active()) {
                continue;
            }

            let projectile = &mut state.projectiles[index];
            projectile.hit_ids.push(target);
            let damage = projectile.damage;
            let impact = projectile.position;
            let knockback = projectile.knockback;
            let status = projectile.status;
            let explosion = projectile.explosion_radius;

            damage_enemy(state, target, damage, impact, knockback, status);
            if let Some(radius) = explosion {
                explode(state, impact, radius, damage * EXPLOSION_SPLASH, target);
            }

            if !state.projectiles[index].spend_pierce() {
                consumed[index] = true;
                break;
            }
        }
    }
}

fn explode(state: &mut SimulationState, center: Vec2, radius: f32, damage: f32, direct: EntityId) {
    let splashed: Vec<EntityId> = state
        .enemies
        .values()
        .filter(|e| e.is_active() && e.id != direct && circles_overlap(center, radius, e.position, e.radius))
        .map(|e| e.id)
        .collect();

    for id in splashed {
        damage_enemy(state, id, damage, center, 0.0, None);
    }
    state.emit_burst(center, 12);
}

fn resolve_obstacle_hits(state: &mut SimulationState, consumed: &mut [bool]) {
    let mut destroyed: Vec<EntityId> = Vec::new();

    for index in 0..state.projectiles.len() {
        let projectile = &state.projectiles[index];
        if consumed[index] || projectile.owner != Owner::Player || projectile.is_zone() {
            continue;
        }

        let targets: Vec<usize> = state
            .obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                o.hp.is_some()
                    && !destroyed.contains(&o.id)
                    && !projectile.has_hit(o.id)
                    && aabb_overlap(projectile.position, projectile.radius, o.position, o.radius)
            })
            .map(|(i, _)| i)
            .collect();

        for obstacle_index in targets {
            let projectile = &mut state.projectiles[index];
            let obstacle = &mut state.obstacles[obstacle_index];
            projectile.hit_ids.push(obstacle.id);

            if let Some(hp) = &mut obstacle.hp {
                *hp -= projectile.damage;
                if *hp <= 0.0 {
                    destroyed.push(obstacle.id);
                }
            }

            if !projectile.spend_pierce() {
                consumed[index] = true;
                break;
            }
        }
    }

    for id in destroyed {
        let Some(position) = state.obstacles.iter().find(|o| o.id == id).map(|o| o.position) else {
            continue;
        };
        state.obstacles.retain(|o| o.id != id);
        state.emit(GameEventData::ObstacleDestroyed { obstacle: id, position });
        state.emit_burst(position, 10);
    }
}

fn resolve_zones(state: &mut SimulationState) {
    for index in 0..state.projectiles.len() {
        let projectile = &mut state.projectiles[index];
        let Some(zone) = &mut projectile.zone else { continue };
        if zone.timer > 0.0 {
            continue;
        }
        zone.timer += zone.interval.max(EPSILON);

        let center = projectile.position;
        let radius = zone.radius;
        let damage = projectile.damage;
        let status = projectile.status;
        let owner = projectile.owner;

        match owner {
            Owner::Player => {
                let inside: Vec<EntityId> = state
                    .enemies
                    .values()
                    .filter(|e| e.is_active() && circles_overlap(center, radius, e.position, e.radius))
                    .map(|e| e.id)
                    .collect();
                for id in inside {
                    damage_enemy(state, id, damage, center, 0.0, status);
                }
            }
            Owner::Enemy | Owner::Boss => {
                if circles_overlap(center, radius, state.player.position, PLAYER_RADIUS) {
                    hit_player(state, damage, status);
                }
            }
        }
    }
}

fn resolve_player_hits(state: &mut SimulationState, consumed: &mut [bool]) {
    for index in 0..state.projectiles.len() {
        let projectile = &state.projectiles[index];
        if consumed[index] || projectile.owner == Owner::Player || projectile.is_zone() {
            continue;
        }
        if !circles_overlap(projectile.position, projectile.radius, state.player.position, PLAYER_RADIUS) {
            continue;
        }
        // Intangible players let projectiles pass through
        if state.player.buffs.is_intangible() {
            continue;
        }

        let damage = projectile.damage;
        let status = projectile.status;
        hit_player(state, damage, status);
        consumed[index] = true;
    }
}

/// Hit the player for `raw_damage`, applying armor and the hit window.
///
/// Returns whether any damage was dealt.
pub fn hit_player(state: &mut SimulationState, raw_damage: f32, status: Option<OnHitStatus>) -> bool {
    let Some(amount) = state.player.take_hit(raw_damage) else {
        return false;
    };
    if let Some(status) = status {
        state.player.status.apply_payload(&status);
    }
    let hp_after = state.player.hp;
    state.emit(GameEventData::PlayerHurt { amount, hp_after });
    true
}

/// Who dealt a hit to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageSource {
    /// Weapons, zones, abilities and companions
    Player,
    /// A confused enemy striking another
    Enemy,
}

/// Damage a live enemy on the player's behalf, applying status, knockback
/// and life steal.
///
/// Knockback moves the enemy directly away from `source`. Returns whether
/// the enemy was alive to take the hit.
pub fn damage_enemy(
    state: &mut SimulationState,
    id: EntityId,
    amount: f32,
    source: Vec2,
    knockback: f32,
    status: Option<OnHitStatus>,
) -> bool {
    deal_damage(state, id, amount, source, knockback, status, DamageSource::Player)
}

/// Damage a live enemy with a hit from another enemy. No life steal.
pub fn infight_damage(state: &mut SimulationState, id: EntityId, amount: f32, source: Vec2) -> bool {
    deal_damage(state, id, amount, source, 0.0, None, DamageSource::Enemy)
}

fn deal_damage(
    state: &mut SimulationState,
    id: EntityId,
    amount: f32,
    source: Vec2,
    knockback: f32,
    status: Option<OnHitStatus>,
    dealer: DamageSource,
) -> bool {
    let world = state.world;
    let Some(enemy) = state.enemies.get_mut(&id) else {
        return false;
    };
    if !enemy.is_active() {
        return false;
    }

    enemy.hp = (enemy.hp - amount).max(0.0);
    if let Some(status) = status {
        enemy.status.apply_payload(&status);
    }

    let distance = knockback * enemy.kind.knockback_factor();
    if distance > 0.0 {
        if let Some(direction) = direction_to(source, enemy.position) {
            enemy.position = world.clamp_circle(enemy.position + direction * distance, enemy.radius);
        }
    }

    let position = enemy.position;
    let dead = enemy.hp <= 0.0;

    state.emit(GameEventData::DamageDealt { target: id, amount, position });

    let life_steal = state.player.stats.life_steal;
    if dealer == DamageSource::Player && life_steal > 0.0 {
        state.player.heal(amount * life_steal);
    }

    if dead {
        kill_enemy(state, id);
    }
    true
}

/// Move an enemy into its dying state. Idempotent.
///
/// Drops loot, counts the kill, and for bosses drives the phase machine.
pub fn kill_enemy(state: &mut SimulationState, id: EntityId) {
    let Some(enemy) = state.enemies.get_mut(&id) else {
        return;
    };
    if enemy.is_dying() {
        return;
    }

    enemy.dying = Some(DEATH_DECAY);
    enemy.hp = 0.0;
    enemy.attack_timer = 0.0;
    enemy.status.clear();
    let kind = enemy.kind;
    let position = enemy.position;

    state.stats.kills += 1;
    state.emit(GameEventData::EnemyKilled { enemy: id, kind, position });
    drop_loot(state, kind, position);
    state.emit_burst(position, 8);

    if kind.is_boss_class() {
        state.stats.bosses_killed += 1;
        let main_boss = kind.is_main_boss();
        info!(enemy = id, main_boss, "{} defeated", kind.display_name());
        state.emit(GameEventData::BossDefeated { enemy: id, main_boss });
        if main_boss {
            on_boss_defeated(state);
        }
    } else {
        debug!(enemy = id, "enemy killed");
    }
}

/// Push a circle out of every obstacle it overlaps.
pub fn push_out_of_obstacles(position: Vec2, radius: f32, obstacles: &[Obstacle]) -> Vec2 {
    let mut resolved = position;
    for obstacle in obstacles {
        let min_distance = radius + obstacle.radius;
        let delta = resolved - obstacle.position;
        let distance = delta.length();
        if distance >= min_distance {
            continue;
        }
        let direction = if distance < EPSILON { Vec2::X } else { delta / distance };
        resolved = obstacle.position + direction * min_distance;
    }
    resolved
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, SimConfig};
    use crate::game::state::{Enemy, EnemyKind, Projectile, PIERCE_UNLIMITED};
    use crate::game::status::StatusKind;

    fn new_state() -> SimulationState {
        let mut state = SimulationState::new(&RunConfig::default(), &SimConfig::default());
        state.obstacles.clear();
        state
    }

    fn add_enemy(state: &mut SimulationState, x: f32, hp: f32) -> EntityId {
        state.insert_enemy(Enemy::new(0, Vec2::new(x, 0.0), EnemyKind::Normal, hp, 5.0, 0.0))
    }

    fn bolt(state: &mut SimulationState, x: f32, pierce: u32) {
        let projectile = Projectile::new(Owner::Player, Vec2::new(x, 0.0), Vec2::ZERO, 10.0, 5.0).with_pierce(pierce);
        state.spawn_projectile(projectile, usize::MAX);
    }

    #[test]
    fn test_non_piercing_removed_after_one_hit() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 100.0);
        let b = add_enemy(&mut state, 305.0, 100.0);
        bolt(&mut state, 302.0, 0);

        process_projectiles(&mut state, 0.016);

        assert!(state.projectiles.is_empty());
        // Exactly one of the overlapping enemies took the hit (lowest id first)
        assert_eq!(state.enemies[&a].hp, 90.0);
        assert_eq!(state.enemies[&b].hp, 100.0);
    }

    #[test]
    fn test_unlimited_pierce_persists_until_lifetime() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 100.0);
        let b = add_enemy(&mut state, 305.0, 100.0);
        bolt(&mut state, 302.0, PIERCE_UNLIMITED);

        for _ in 0..10 {
            process_projectiles(&mut state, 0.1);
        }
        assert_eq!(state.projectiles.len(), 1);
        // Each enemy hit once, not once per frame
        assert_eq!(state.enemies[&a].hp, 90.0);
        assert_eq!(state.enemies[&b].hp, 90.0);

        for _ in 0..50 {
            process_projectiles(&mut state, 0.1);
        }
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_counted_pierce() {
        let mut state = new_state();
        for i in 0..4 {
            add_enemy(&mut state, 300.0 + i as f32, 100.0);
        }
        bolt(&mut state, 301.0, 2);

        process_projectiles(&mut state, 0.016);
        assert!(state.projectiles.is_empty());
        let hit = state.enemies.values().filter(|e| e.hp < 100.0).count();
        assert_eq!(hit, 3);
    }

    #[test]
    fn test_dying_enemy_takes_no_hits() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 100.0);
        kill_enemy(&mut state, a);
        bolt(&mut state, 300.0, 0);

        process_projectiles(&mut state, 0.016);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 10.0);

        assert!(damage_enemy(&mut state, a, 50.0, Vec2::ZERO, 0.0, None));
        assert!(state.enemies[&a].is_dying());
        assert_eq!(state.stats.kills, 1);
        let drops = state.drops.len();
        assert!(drops >= 1);

        kill_enemy(&mut state, a);
        assert!(!damage_enemy(&mut state, a, 50.0, Vec2::ZERO, 0.0, None));
        assert_eq!(state.stats.kills, 1);
        assert_eq!(state.drops.len(), drops);
    }

    #[test]
    fn test_knockback_away_from_impact() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 100.0);
        damage_enemy(&mut state, a, 1.0, Vec2::new(290.0, 0.0), 20.0, None);
        assert!((state.enemies[&a].position.x - 320.0).abs() < 1e-3);

        // Bosses do not move
        let boss = state.insert_enemy(Enemy::new(
            0,
            Vec2::new(-300.0, 0.0),
            EnemyKind::Boss { pattern: crate::game::state::BossPattern::RadialBurst { count: 8 } },
            1000.0,
            10.0,
            0.0,
        ));
        damage_enemy(&mut state, boss, 1.0, Vec2::new(-290.0, 0.0), 20.0, None);
        assert_eq!(state.enemies[&boss].position.x, -300.0);
    }

    #[test]
    fn test_hostile_projectile_respects_armor_and_iframes() {
        let mut state = new_state();
        state.player.stats.armor = 5.0;
        for _ in 0..2 {
            let p = Projectile::new(Owner::Enemy, Vec2::ZERO, Vec2::ZERO, 15.0, 1.0);
            state.spawn_projectile(p, usize::MAX);
        }

        process_projectiles(&mut state, 0.016);

        assert_eq!(state.player.hp, 90.0);
        assert!(state.player.hit_invulnerable > 0.0);
        // Both consumed even though the second did no damage
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_intangible_player_lets_projectiles_pass() {
        let mut state = new_state();
        state.player.buffs.intangible = 1.0;
        let p = Projectile::new(Owner::Boss, Vec2::ZERO, Vec2::ZERO, 15.0, 1.0);
        state.spawn_projectile(p, usize::MAX);

        process_projectiles(&mut state, 0.016);
        assert_eq!(state.player.hp, 100.0);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_elemental_projectile_applies_status() {
        let mut state = new_state();
        let p = Projectile::new(Owner::Enemy, Vec2::ZERO, Vec2::ZERO, 5.0, 1.0)
            .with_status(crate::game::state::Element::Frost.on_hit_status());
        state.spawn_projectile(p, usize::MAX);

        process_projectiles(&mut state, 0.016);
        assert!(state.player.status.has(StatusKind::Slow));
    }

    #[test]
    fn test_zone_ticks_on_interval() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 100.0);
        let zone = Projectile::new(Owner::Player, Vec2::new(300.0, 0.0), Vec2::ZERO, 4.0, 2.0).with_zone(50.0, 0.5);
        state.spawn_projectile(zone, usize::MAX);

        // Timer starts ready: three ticks in 1.25 s
        for _ in 0..5 {
            process_projectiles(&mut state, 0.25);
        }
        assert_eq!(state.enemies[&a].hp, 88.0);
    }

    #[test]
    fn test_destructible_obstacle() {
        let mut state = new_state();
        state.obstacles.push(Obstacle { id: 999, position: Vec2::new(300.0, 0.0), radius: 20.0, hp: Some(15.0) });
        state.obstacles.push(Obstacle { id: 998, position: Vec2::new(-300.0, 0.0), radius: 20.0, hp: None });

        bolt(&mut state, 300.0, 0);
        process_projectiles(&mut state, 0.016);
        assert_eq!(state.obstacles[0].hp, Some(5.0));
        assert!(state.projectiles.is_empty());

        bolt(&mut state, 300.0, 0);
        process_projectiles(&mut state, 0.016);
        assert_eq!(state.obstacles.len(), 1);
        assert!(state
            .take_events()
            .iter()
            .any(|e| matches!(e.data, GameEventData::ObstacleDestroyed { obstacle: 999, .. })));

        // Indestructible obstacles do not stop projectiles
        bolt(&mut state, -300.0, 0);
        process_projectiles(&mut state, 0.016);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_explosion_splashes_neighbors() {
        let mut state = new_state();
        let a = add_enemy(&mut state, 300.0, 100.0);
        let b = add_enemy(&mut state, 340.0, 100.0);
        let p = Projectile::new(Owner::Player, Vec2::new(300.0, 0.0), Vec2::ZERO, 10.0, 1.0).with_explosion(Some(60.0));
        state.spawn_projectile(p, usize::MAX);

        process_projectiles(&mut state, 0.016);
        assert_eq!(state.enemies[&a].hp, 90.0);
        assert_eq!(state.enemies[&b].hp, 94.0);
    }

    #[test]
    fn test_life_steal_heals() {
        let mut state = new_state();
        state.player.hp = 50.0;
        state.player.stats.life_steal = 0.5;
        let a = add_enemy(&mut state, 300.0, 100.0);
        damage_enemy(&mut state, a, 10.0, Vec2::ZERO, 0.0, None);
        assert_eq!(state.player.hp, 55.0);

        // Hits between enemies are not the player's
        infight_damage(&mut state, a, 10.0, Vec2::ZERO);
        assert_eq!(state.player.hp, 55.0);
        assert_eq!(state.enemies[&a].hp, 80.0);
    }

    #[test]
    fn test_push_out_of_obstacles() {
        let obstacles = vec![Obstacle { id: 1, position: Vec2::ZERO, radius: 20.0, hp: None }];
        let p = push_out_of_obstacles(Vec2::new(10.0, 0.0), 10.0, &obstacles);
        assert!((p.x - 30.0).abs() < 1e-4);

        // Coincident centers still resolve
        let p = push_out_of_obstacles(Vec2::ZERO, 10.0, &obstacles);
        assert!((p.length() - 30.0).abs() < 1e-4);
    }
}
