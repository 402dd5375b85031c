//! Run Configuration
//!
//! Two layers, both deserializable with defaults:
//! - [`RunConfig`]: what the host selected for this run (character,
//!   difficulty, stage, persistent upgrades, loadout, seed).
//! - [`SimConfig`]: engine tuning (frame clamp, caps, world size, waves).
//!
//! Only run-start parsing and validation can fail; nothing in the frame loop
//! returns an error.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::ability::AbilityId;
use crate::game::companion::CompanionKind;
use crate::game::weapon::WeaponKind;

/// Errors raised while loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid run config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Stage numbers start at 1.
    #[error("stage must be at least 1")]
    InvalidStage,

    /// A multiplier or base stat that must be strictly positive was not.
    #[error("{field} must be positive (got {value})")]
    NonPositive {
        /// Offending field
        field: &'static str,
        /// Value found
        value: f32,
    },

    /// A bounded difficulty needs a positive duration.
    #[error("run duration must be positive when bounded (got {0})")]
    InvalidDuration(f32),

    /// The same ability was equipped twice.
    #[error("ability equipped twice: {0:?}")]
    DuplicateAbility(AbilityId),
}

// =============================================================================
// CHARACTER
// =============================================================================

/// Base stats of the selected character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Display name
    pub name: String,
    /// Starting and maximum hp
    pub max_hp: f32,
    /// Movement speed (units per second)
    pub speed: f32,
    /// Flat damage reduction
    pub armor: f32,
    /// Weapon equipped at run start
    pub starting_weapon: WeaponKind,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: "Wanderer".to_string(),
            max_hp: 100.0,
            speed: 200.0,
            armor: 0.0,
            starting_weapon: WeaponKind::ArcaneBolt,
        }
    }
}

// =============================================================================
// DIFFICULTY
// =============================================================================

/// Difficulty multipliers and run length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Difficulty {
    /// Display name
    pub name: String,
    /// Enemy hp multiplier
    pub hp_mult: f32,
    /// Enemy damage multiplier
    pub damage_mult: f32,
    /// Run duration in seconds; `None` means infinite mode
    pub duration: Option<f32>,
}

impl Difficulty {
    /// Standard 15 minute run.
    pub fn normal() -> Self {
        Self {
            name: "Normal".to_string(),
            hp_mult: 1.0,
            damage_mult: 1.0,
            duration: Some(900.0),
        }
    }

    /// Tougher enemies, same length.
    pub fn hard() -> Self {
        Self {
            name: "Hard".to_string(),
            hp_mult: 1.6,
            damage_mult: 1.4,
            duration: Some(900.0),
        }
    }

    /// Unbounded run with repeating bosses.
    pub fn infinite() -> Self {
        Self {
            name: "Infinite".to_string(),
            hp_mult: 1.2,
            damage_mult: 1.2,
            duration: None,
        }
    }

    /// Whether this difficulty has no time budget.
    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.duration.is_none()
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::normal()
    }
}

// =============================================================================
// PERSISTENT STATE (read at run start)
// =============================================================================

/// Permanent upgrade levels bought between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentUpgrades {
    /// +5% damage per level
    pub might: u32,
    /// +1 armor per level
    pub armor: u32,
    /// +10 max hp per level
    pub vitality: u32,
    /// -3% cooldowns per level
    pub haste: u32,
    /// +10% pickup range per level
    pub magnet: u32,
    /// +5% luck per level
    pub fortune: u32,
}

/// A companion kind and how many orbiters of it are unlocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionLoadout {
    /// Companion kind
    pub kind: CompanionKind,
    /// Orbiter count (passive level)
    pub level: u32,
}

// =============================================================================
// RUN CONFIG
// =============================================================================

/// Everything the host decides before a run starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Gameplay RNG seed
    pub seed: u64,
    /// Stage number (1-based)
    pub stage: u32,
    /// Selected character
    pub character: CharacterConfig,
    /// Selected difficulty
    pub difficulty: Difficulty,
    /// Permanent upgrade levels
    pub upgrades: PersistentUpgrades,
    /// Equipped abilities
    pub abilities: Vec<AbilityId>,
    /// Unlocked companions
    pub companions: Vec<CompanionLoadout>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            stage: 1,
            character: CharacterConfig::default(),
            difficulty: Difficulty::default(),
            upgrades: PersistentUpgrades::default(),
            abilities: vec![AbilityId::Nova],
            companions: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Parse and validate a run configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage == 0 {
            return Err(ConfigError::InvalidStage);
        }

        for (field, value) in [
            ("character.max_hp", self.character.max_hp),
            ("character.speed", self.character.speed),
            ("difficulty.hp_mult", self.difficulty.hp_mult),
            ("difficulty.damage_mult", self.difficulty.damage_mult),
        ] {
            // Also rejects NaN
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if let Some(duration) = self.difficulty.duration {
            if !(duration > 0.0) {
                return Err(ConfigError::InvalidDuration(duration));
            }
        }

        let mut seen = BTreeSet::new();
        for ability in &self.abilities {
            if !seen.insert(*ability) {
                return Err(ConfigError::DuplicateAbility(*ability));
            }
        }

        Ok(())
    }
}

// =============================================================================
// ENGINE TUNING
// =============================================================================

/// Engine tuning shared by every run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Largest step a single frame may simulate (seconds)
    pub max_frame_dt: f32,
    /// Simulated time between HUD snapshots (seconds)
    pub hud_interval: f32,
    /// Hard cap on live enemies
    pub max_enemies: usize,
    /// Hard cap on live projectiles
    pub max_projectiles: usize,
    /// Half extents of the world rectangle centered on the origin
    pub world_half_extents: Vec2,
    /// Half extents of the boss arena
    pub arena_half_extents: Vec2,
    /// Seconds between normal waves
    pub wave_interval: f32,
    /// Enemies per wave at stage 1
    pub wave_base_count: u32,
    /// Extra enemies per wave per stage
    pub wave_per_stage: u32,
    /// Maximum enemies per wave
    pub wave_cap: u32,
    /// Inner radius of the spawn band around the player
    pub spawn_radius_min: f32,
    /// Outer radius of the spawn band around the player
    pub spawn_radius_max: f32,
    /// Fraction of wave enemies that are ranged
    pub ranged_fraction: f32,
    /// Fraction of wave enemies that are elites
    pub elite_fraction: f32,
    /// Obstacles generated at stage load
    pub obstacle_count: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_frame_dt: 0.1,
            hud_interval: 0.1,
            max_enemies: 300,
            max_projectiles: 1000,
            world_half_extents: Vec2::new(1600.0, 1600.0),
            arena_half_extents: Vec2::new(480.0, 360.0),
            wave_interval: 3.0,
            wave_base_count: 6,
            wave_per_stage: 2,
            wave_cap: 24,
            spawn_radius_min: 500.0,
            spawn_radius_max: 600.0,
            ranged_fraction: 0.15,
            elite_fraction: 0.05,
            obstacle_count: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_document() {
        let json = r#"{
            "seed": 42,
            "stage": 3,
            "difficulty": { "name": "Endless", "hp_mult": 1.5, "damage_mult": 1.1, "duration": null },
            "abilities": ["Rally", "Discord"],
            "companions": [{ "kind": "Wisp", "level": 2 }]
        }"#;

        let config = RunConfig::from_json(json).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.stage, 3);
        assert!(config.difficulty.is_infinite());
        assert_eq!(config.abilities, vec![AbilityId::Rally, AbilityId::Discord]);
        assert_eq!(config.companions[0].level, 2);
        // Missing sections fall back to defaults
        assert_eq!(config.character, CharacterConfig::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            RunConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RunConfig::default();
        config.stage = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidStage)));

        let mut config = RunConfig::default();
        config.difficulty.hp_mult = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { field: "difficulty.hp_mult", .. })
        ));

        let mut config = RunConfig::default();
        config.character.speed = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.difficulty.duration = Some(-5.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDuration(_))));

        let mut config = RunConfig::default();
        config.abilities = vec![AbilityId::Nova, AbilityId::Nova];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAbility(AbilityId::Nova))
        ));
    }

    #[test]
    fn test_sim_config_from_json() {
        let config: SimConfig = serde_json::from_str(r#"{ "max_enemies": 50 }"#).unwrap();
        assert_eq!(config.max_enemies, 50);
        assert_eq!(config.max_frame_dt, 0.1);
    }
}
