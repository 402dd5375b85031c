//! HUD Snapshot and Run Result
//!
//! Read-only views of the simulation for the presentation layer.

use serde::{Deserialize, Serialize};

use crate::game::ability::{cooldown_fraction, AbilityId};
use crate::game::state::{RunPhase, SimulationState};

/// Boss bar contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BossStatus {
    /// Display name
    pub name: String,
    /// Current hp
    pub hp: f32,
    /// Maximum hp
    pub max_hp: f32,
}

/// One ability's cooldown indicator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityCooldown {
    /// Ability
    pub ability: AbilityId,
    /// Remaining fraction (0 = ready)
    pub fraction: f32,
}

/// Periodic snapshot published to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    /// Frame the snapshot was taken on
    pub frame: u64,
    /// Simulated seconds
    pub elapsed: f32,
    /// Run phase
    pub phase: RunPhase,
    /// Player hp
    pub hp: f32,
    /// Player max hp
    pub max_hp: f32,
    /// Player level
    pub level: u32,
    /// Current xp
    pub xp: f32,
    /// Xp for the next level
    pub next_level_xp: f32,
    /// Currency collected
    pub currency: u32,
    /// Enemies killed
    pub kills: u32,
    /// Live enemies
    pub enemies: usize,
    /// Boss bar, when a boss-class enemy is alive
    pub boss: Option<BossStatus>,
    /// Banner text
    pub warning: Option<String>,
    /// Ability cooldowns, ordered by ability
    pub abilities: Vec<AbilityCooldown>,
}

/// Terminal outcome of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Boss defeated before the end
    pub victory: bool,
    /// Currency collected
    pub currency: u32,
    /// Enemies killed
    pub kills: u32,
    /// Sub-bosses and bosses killed
    pub bosses_killed: u32,
    /// Simulated seconds survived
    pub survival_secs: f32,
    /// Stage played
    pub stage: u32,
    /// Whether the stage counts as cleared
    pub stage_cleared: bool,
}

/// Build a HUD snapshot from the current state.
pub fn snapshot(state: &SimulationState) -> HudSnapshot {
    let player = &state.player;

    // Main boss first, then any champion
    let boss = state
        .enemies
        .values()
        .filter(|e| e.is_active() && e.kind.is_boss_class())
        .max_by_key(|e| (e.kind.is_main_boss(), std::cmp::Reverse(e.id)))
        .map(|e| BossStatus {
            name: e.kind.display_name().to_string(),
            hp: e.hp,
            max_hp: e.max_hp,
        });

    HudSnapshot {
        frame: state.frame,
        elapsed: state.elapsed,
        phase: state.phase,
        hp: player.hp,
        max_hp: player.max_hp,
        level: player.level,
        xp: player.xp,
        next_level_xp: player.next_level_xp,
        currency: state.stats.currency,
        kills: state.stats.kills,
        enemies: state.live_enemy_count(),
        boss,
        warning: state.warning.as_ref().map(|w| w.text.clone()),
        abilities: player
            .ability_cooldowns
            .keys()
            .map(|&ability| AbilityCooldown {
                ability,
                fraction: cooldown_fraction(player, ability),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, SimConfig};
    use crate::game::state::{BossPattern, Enemy, EnemyKind};
    use glam::Vec2;

    fn new_state() -> SimulationState {
        let run = RunConfig {
            abilities: vec![AbilityId::Nova, AbilityId::Bulwark],
            ..RunConfig::default()
        };
        SimulationState::new(&run, &SimConfig::default())
    }

    #[test]
    fn test_snapshot_reflects_player() {
        let mut state = new_state();
        state.player.hp = 42.0;
        state.stats.kills = 3;
        state.player.ability_cooldowns.insert(AbilityId::Nova, 4.0);

        let hud = snapshot(&state);

        assert_eq!(hud.hp, 42.0);
        assert_eq!(hud.kills, 3);
        assert!(hud.boss.is_none());
        assert_eq!(hud.abilities.len(), 2);
        let nova = hud.abilities.iter().find(|a| a.ability == AbilityId::Nova).unwrap();
        assert!((nova.fraction - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_boss_bar_prefers_main_boss() {
        let mut state = new_state();
        let pattern = BossPattern::RadialBurst { count: 8 };
        state.insert_enemy(Enemy::new(0, Vec2::new(100.0, 0.0), EnemyKind::SubBoss { pattern }, 900.0, 1.0, 0.0));
        state.insert_enemy(Enemy::new(0, Vec2::new(200.0, 0.0), EnemyKind::Boss { pattern }, 4000.0, 1.0, 0.0));

        let hud = snapshot(&state);
        let boss = hud.boss.unwrap();
        assert_eq!(boss.name, "Warlord");
        assert_eq!(boss.max_hp, 4000.0);
    }
}
