//! Drops and Pickup
//!
//! Loot tables for enemy deaths, drop magnetism, and collection.

use glam::Vec2;

use crate::game::events::GameEventData;
use crate::game::progression::grant_xp;
use crate::game::state::{Drop, DropKind, EnemyKind, SimulationState, PLAYER_RADIUS};

/// Speed at which drops fly toward the player once inside pickup range.
pub const MAGNET_SPEED: f32 = 320.0;

/// Drops this close to the player are collected.
pub const COLLECT_RADIUS: f32 = PLAYER_RADIUS + 8.0;

/// Fraction of max hp restored by a chest.
pub const CHEST_HEAL_FRACTION: f32 = 0.3;

const COIN_CHANCE: f32 = 0.08;
const HEAL_CHANCE: f32 = 0.02;
const HEAL_VALUE: f32 = 20.0;
const ELITE_COINS: f32 = 5.0;
const SUB_BOSS_CHEST: f32 = 25.0;
const BOSS_CHEST: f32 = 100.0;

/// Drop loot for an enemy of `kind` that died at `position`.
pub fn drop_loot(state: &mut SimulationState, kind: EnemyKind, position: Vec2) {
    state.spawn_drop(position, DropKind::XpGem, kind.xp_value());

    let scatter = state.rng.random_direction() * 10.0;
    match kind {
        EnemyKind::Normal => {
            let chance = COIN_CHANCE * (1.0 + state.player.stats.luck);
            if state.rng.chance(chance) {
                state.spawn_drop(position + scatter, DropKind::Coin, 1.0);
            }
        }
        EnemyKind::Elite => {
            state.spawn_drop(position + scatter, DropKind::Coin, ELITE_COINS);
        }
        EnemyKind::SubBoss { .. } => {
            state.spawn_drop(position + scatter, DropKind::Chest, SUB_BOSS_CHEST);
        }
        EnemyKind::Boss { .. } => {
            state.spawn_drop(position + scatter, DropKind::Chest, BOSS_CHEST);
        }
    }

    if !kind.is_boss_class() && state.rng.chance(HEAL_CHANCE) {
        state.spawn_drop(position - scatter, DropKind::Heal, HEAL_VALUE);
    }
}

/// Pull drops inside pickup range toward the player and collect those
/// that reach them.
pub fn update_drops(state: &mut SimulationState, dt: f32) {
    if !state.player.is_alive() {
        return;
    }
    let target = state.player.position;
    let range = state.player.stats.pickup_range;

    // 1. Magnetism
    for drop in &mut state.drops {
        let to_player = target - drop.position;
        let distance = to_player.length();
        if distance <= COLLECT_RADIUS || distance > range {
            continue;
        }
        let step = (MAGNET_SPEED * dt).min(distance);
        drop.position += to_player / distance * step;
    }

    // 2. Collection
    let (collected, remaining): (Vec<Drop>, Vec<Drop>) = std::mem::take(&mut state.drops)
        .into_iter()
        .partition(|d| d.position.distance(target) <= COLLECT_RADIUS);
    state.drops = remaining;

    for drop in collected {
        collect_drop(state, &drop);
    }
}

/// Apply a collected drop to the player.
pub fn collect_drop(state: &mut SimulationState, drop: &Drop) {
    match drop.kind {
        DropKind::XpGem => grant_xp(state, drop.value),
        DropKind::Coin => state.stats.currency += drop.value as u32,
        DropKind::Chest => {
            state.stats.currency += drop.value as u32;
            let heal = state.player.max_hp * CHEST_HEAL_FRACTION;
            state.player.heal(heal);
        }
        DropKind::Heal => state.player.heal(drop.value),
    }
    state.emit(GameEventData::DropCollected { kind: drop.kind, value: drop.value });
}
