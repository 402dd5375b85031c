//! Spawn Director
//!
//! Time-driven waves, sub-bosses and the boss.
//!
//! Milestones are decided once per whole elapsed second and each bounded
//! milestone is guarded by its own latch, so calling the check repeatedly in
//! the same second (or after the second has moved on) never double-spawns.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{Difficulty, SimConfig};
use crate::game::events::GameEventData;
use crate::game::phase::{enter_boss_arena, set_phase};
use crate::game::state::{BossPattern, Element, Enemy, EnemyKind, EntityId, RunPhase, SimulationState};

/// Sub-boss 1 at this fraction of a bounded run.
pub const SUB_BOSS_1_AT: f32 = 0.25;
/// Sub-boss 2 at this fraction of a bounded run.
pub const SUB_BOSS_2_AT: f32 = 0.6;
/// The boss arrives this long before a bounded run ends.
pub const BOSS_LEAD: f32 = 60.0;

/// Infinite mode: seconds between sub-bosses.
pub const INFINITE_SUB_BOSS_INTERVAL: f32 = 180.0;
/// Infinite mode: seconds between bosses.
pub const INFINITE_BOSS_INTERVAL: f32 = 600.0;

/// Distance from the player at which bosses appear.
const BOSS_SPAWN_DISTANCE: f32 = 300.0;

/// Scheduled spawn kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    /// A champion
    SubBoss,
    /// The terminal boss
    Boss,
}

impl Milestone {
    /// Banner text shown ahead of the milestone.
    pub fn warning_text(self) -> &'static str {
        match self {
            Milestone::SubBoss => "A champion approaches",
            Milestone::Boss => "The Warlord is coming",
        }
    }
}

/// Spawn schedule and one-shot latches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpawnDirector {
    /// Time until the next wave
    pub wave_timer: f32,
    /// Last whole second whose milestones were evaluated
    pub evaluated_second: Option<u32>,
    /// Bounded: first sub-boss spawned
    pub sub_boss_1_spawned: bool,
    /// Bounded: second sub-boss spawned
    pub sub_boss_2_spawned: bool,
    /// Bounded: boss spawned
    pub boss_spawned: bool,
    /// Infinite: next sub-boss time
    pub next_sub_boss_at: f32,
    /// Infinite: next boss time
    pub next_boss_at: f32,
    /// Sub-bosses spawned so far (picks the pattern)
    pub sub_bosses_spawned: u32,
}

impl SpawnDirector {
    /// Create the director for a run.
    pub fn new(difficulty: &Difficulty, config: &SimConfig) -> Self {
        if let Some(duration) = difficulty.duration {
            debug!(duration, boss_at = boss_time(duration), "bounded spawn schedule");
        }
        Self {
            wave_timer: config.wave_interval,
            evaluated_second: None,
            sub_boss_1_spawned: false,
            sub_boss_2_spawned: false,
            boss_spawned: false,
            next_sub_boss_at: INFINITE_SUB_BOSS_INTERVAL,
            next_boss_at: INFINITE_BOSS_INTERVAL,
            sub_bosses_spawned: 0,
        }
    }

    /// Earliest milestone not yet spawned.
    pub fn next_milestone(&self, difficulty: &Difficulty) -> Option<(f32, Milestone)> {
        match difficulty.duration {
            Some(duration) => {
                let pending = [
                    (!self.sub_boss_1_spawned, duration * SUB_BOSS_1_AT, Milestone::SubBoss),
                    (!self.sub_boss_2_spawned, duration * SUB_BOSS_2_AT, Milestone::SubBoss),
                    (!self.boss_spawned, boss_time(duration), Milestone::Boss),
                ];
                pending
                    .into_iter()
                    .filter(|(open, _, _)| *open)
                    .map(|(_, at, milestone)| (at, milestone))
                    .min_by(|a, b| a.0.total_cmp(&b.0))
            }
            None => {
                if self.next_boss_at <= self.next_sub_boss_at {
                    Some((self.next_boss_at, Milestone::Boss))
                } else {
                    Some((self.next_sub_boss_at, Milestone::SubBoss))
                }
            }
        }
    }
}

/// Boss time of a bounded run.
#[inline]
pub fn boss_time(duration: f32) -> f32 {
    (duration - BOSS_LEAD).max(0.0)
}

/// Run the director for one frame: milestones, then waves.
pub fn direct_spawns(state: &mut SimulationState, dt: f32, config: &SimConfig) {
    // 1. Milestones
    check_milestones(state, config);

    // 2. Waves, suppressed during the arena lock and extraction
    if state.boss_alive() || matches!(state.phase, RunPhase::BossArena | RunPhase::Extraction) {
        return;
    }
    state.spawner.wave_timer -= dt;
    if state.spawner.wave_timer > 0.0 {
        return;
    }
    state.spawner.wave_timer = config.wave_interval;
    spawn_wave(state, config);
}

/// Evaluate sub-boss and boss milestones for the current second.
pub fn check_milestones(state: &mut SimulationState, config: &SimConfig) {
    let second = state.elapsed.max(0.0).floor() as u32;
    if state.spawner.evaluated_second == Some(second) {
        return;
    }
    state.spawner.evaluated_second = Some(second);
    let elapsed = state.elapsed;

    match state.difficulty.duration {
        Some(duration) => {
            if !state.spawner.sub_boss_1_spawned && elapsed >= duration * SUB_BOSS_1_AT {
                state.spawner.sub_boss_1_spawned = true;
                spawn_sub_boss(state);
            }
            if !state.spawner.sub_boss_2_spawned && elapsed >= duration * SUB_BOSS_2_AT {
                state.spawner.sub_boss_2_spawned = true;
                spawn_sub_boss(state);
            }
            if !state.spawner.boss_spawned && elapsed >= boss_time(duration) {
                state.spawner.boss_spawned = true;
                spawn_boss(state, config);
            }
        }
        None => {
            if elapsed >= state.spawner.next_sub_boss_at {
                state.spawner.next_sub_boss_at += INFINITE_SUB_BOSS_INTERVAL;
                spawn_sub_boss(state);
            }
            if elapsed >= state.spawner.next_boss_at {
                state.spawner.next_boss_at += INFINITE_BOSS_INTERVAL;
                if state.boss_alive() {
                    debug!(elapsed, "boss still alive, skipping repeat boss");
                } else {
                    spawn_boss(state, config);
                }
            }
        }
    }
}

/// Number of enemies in a wave for `stage`.
pub fn wave_size(stage: u32, config: &SimConfig) -> u32 {
    let extra = config.wave_per_stage.saturating_mul(stage.max(1) - 1);
    config.wave_base_count.saturating_add(extra).min(config.wave_cap)
}

/// Scaled `(hp, damage, speed)` for a kind at a stage and difficulty.
pub fn enemy_stats(kind: EnemyKind, stage: u32, difficulty: &Difficulty) -> (f32, f32, f32) {
    let (hp, damage, speed) = match kind {
        EnemyKind::Normal => (20.0, 8.0, 70.0),
        EnemyKind::Elite => (120.0, 14.0, 80.0),
        EnemyKind::SubBoss { .. } => (900.0, 20.0, 60.0),
        EnemyKind::Boss { .. } => (4000.0, 30.0, 55.0),
    };
    let steps = (stage.max(1) - 1) as f32;
    (
        hp * (1.0 + 0.35 * steps) * difficulty.hp_mult,
        damage * (1.0 + 0.2 * steps) * difficulty.damage_mult,
        speed,
    )
}

/// Spawn a wave around the player. Returns how many enemies were placed.
pub fn spawn_wave(state: &mut SimulationState, config: &SimConfig) -> u32 {
    let count = wave_size(state.stage, config);
    let center = state.player.position;
    let candidates: Vec<Vec2> = (0..count)
        .map(|_| {
            state
                .rng
                .random_in_ring(center, config.spawn_radius_min, config.spawn_radius_max)
        })
        .collect();

    let placed = place_wave(state, config, &candidates);
    if placed > 0 {
        trace!(placed, requested = count, "wave spawned");
        state.emit(GameEventData::WaveSpawned { count: placed });
    }
    placed
}

/// Instantiate wave enemies at `candidates`, discarding positions outside
/// the world and stopping at the enemy cap.
pub fn place_wave(state: &mut SimulationState, config: &SimConfig, candidates: &[Vec2]) -> u32 {
    let mut live = state.live_enemy_count();
    let mut placed = 0;

    for &position in candidates {
        if live >= config.max_enemies {
            debug!(cap = config.max_enemies, "enemy cap reached, skipping placements");
            break;
        }
        if !state.world.contains(position) {
            continue;
        }

        let kind = if state.rng.chance(config.elite_fraction) {
            EnemyKind::Elite
        } else {
            EnemyKind::Normal
        };
        let (hp, damage, speed) = enemy_stats(kind, state.stage, &state.difficulty);
        let mut enemy = Enemy::new(0, position, kind, hp, damage, speed);
        if state.rng.chance(config.ranged_fraction) {
            if let Some(&element) = state.rng.choose(&Element::ALL) {
                enemy = enemy.with_element(element);
            }
        }

        state.insert_enemy(enemy);
        live += 1;
        placed += 1;
    }
    placed
}

/// Spawn a champion near the player. Not subject to the enemy cap.
pub fn spawn_sub_boss(state: &mut SimulationState) -> EntityId {
    let pattern = if state.spawner.sub_bosses_spawned % 2 == 0 {
        BossPattern::RadialBurst { count: 12 }
    } else {
        BossPattern::AimedVolley { shots: 3, spread: 0.5 }
    };
    state.spawner.sub_bosses_spawned += 1;

    let kind = EnemyKind::SubBoss { pattern };
    let id = spawn_boss_class(state, kind);
    info!(id, elapsed = state.elapsed, "sub-boss spawned");
    state.emit(GameEventData::SubBossSpawned { enemy: id });

    if state.phase == RunPhase::EliteWarning {
        set_phase(state, RunPhase::Survival);
    }
    id
}

/// Spawn the boss and lock the arena. Not subject to the enemy cap.
pub fn spawn_boss(state: &mut SimulationState, config: &SimConfig) -> EntityId {
    let kind = EnemyKind::Boss {
        pattern: BossPattern::AimedVolley { shots: 5, spread: 0.8 },
    };
    let id = spawn_boss_class(state, kind);
    info!(id, elapsed = state.elapsed, "boss spawned");
    state.emit(GameEventData::BossSpawned { enemy: id });

    enter_boss_arena(state, config);
    id
}

fn spawn_boss_class(state: &mut SimulationState, kind: EnemyKind) -> EntityId {
    let direction = state.rng.random_direction();
    let position = state
        .world
        .clamp_circle(state.player.position + direction * BOSS_SPAWN_DISTANCE, kind.radius());
    let (hp, damage, speed) = enemy_stats(kind, state.stage, &state.difficulty);
    state.insert_enemy(Enemy::new(0, position, kind, hp, damage, speed))
}

// =============================================================================
// TESTS
// =============================================================================
