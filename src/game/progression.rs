//! Progression System
//!
//! XP, level thresholds, level-up choices and stat upgrades.
//!
//! ```text
//! xp >= next_level_xp
//!   → level += 1, xp -= next_level_xp (remainder carried)
//!   → next_level_xp += 40 + 15 * level
//!   → LevelUpRequest { choices } raised, simulation suspended
//!   → host calls resolve_level_up(choice) → exactly one upgrade applied
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PersistentUpgrades;
use crate::game::events::GameEventData;
use crate::game::state::{PlayerState, SimulationState};
use crate::game::weapon::{WeaponKind, WeaponSlot, MAX_WEAPON_LEVEL, MAX_WEAPON_SLOTS};

/// XP needed to reach level 2.
pub const INITIAL_LEVEL_XP: f32 = 50.0;

/// Upgrades offered per level-up.
pub const LEVEL_UP_CHOICES: usize = 3;

/// Floor for the cooldown multiplier.
pub const MIN_COOLDOWN_MULT: f32 = 0.3;

/// Threshold after reaching `new_level`.
#[inline]
pub fn next_threshold(current: f32, new_level: u32) -> f32 {
    current + 40.0 + 15.0 * new_level as f32
}

/// A level-up choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Upgrade {
    /// +10% damage
    Might,
    /// -10% cooldowns
    Haste,
    /// +1 projectile per volley
    Multishot,
    /// +20 max hp (and heal 20)
    Vitality,
    /// +10% movement speed
    Swiftness,
    /// +20 pickup range
    Magnet,
    /// +0.1 luck
    Fortune,
    /// +2% life steal
    Vampirism,
    /// +10 knockback
    Impact,
    /// Add a weapon
    NewWeapon(WeaponKind),
    /// Level up an owned weapon
    Empower(WeaponKind),
}

impl Upgrade {
    /// Stat upgrades, always on offer.
    pub const STATS: [Upgrade; 9] = [
        Upgrade::Might,
        Upgrade::Haste,
        Upgrade::Multishot,
        Upgrade::Vitality,
        Upgrade::Swiftness,
        Upgrade::Magnet,
        Upgrade::Fortune,
        Upgrade::Vampirism,
        Upgrade::Impact,
    ];

    /// Apply to the player.
    pub fn apply(self, player: &mut PlayerState) {
        let stats = &mut player.stats;
        match self {
            Upgrade::Might => stats.damage_mult += 0.1,
            Upgrade::Haste => stats.cooldown_mult = (stats.cooldown_mult * 0.9).max(MIN_COOLDOWN_MULT),
            Upgrade::Multishot => stats.projectile_count += 1,
            Upgrade::Vitality => {
                player.max_hp += 20.0;
                player.heal(20.0);
            }
            Upgrade::Swiftness => stats.move_speed_mult += 0.1,
            Upgrade::Magnet => stats.pickup_range += 20.0,
            Upgrade::Fortune => stats.luck += 0.1,
            Upgrade::Vampirism => stats.life_steal += 0.02,
            Upgrade::Impact => stats.knockback += 10.0,
            Upgrade::NewWeapon(kind) => {
                let owned = player.weapons.iter().any(|w| w.kind == kind);
                if !owned && player.weapons.len() < MAX_WEAPON_SLOTS {
                    player.weapons.push(WeaponSlot::new(kind));
                }
            }
            Upgrade::Empower(kind) => {
                if let Some(slot) = player.weapons.iter_mut().find(|w| w.kind == kind) {
                    slot.level = (slot.level + 1).min(MAX_WEAPON_LEVEL);
                }
            }
        }
    }
}

/// A pending level-up awaiting the host's choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelUpRequest {
    /// Level just reached
    pub level: u32,
    /// Distinct upgrades on offer
    pub choices: Vec<Upgrade>,
}

/// Apply permanent upgrade levels at run start.
pub fn apply_persistent_upgrades(player: &mut PlayerState, upgrades: &PersistentUpgrades) {
    let stats = &mut player.stats;
    stats.damage_mult += 0.05 * upgrades.might as f32;
    stats.armor += upgrades.armor as f32;
    stats.cooldown_mult = (stats.cooldown_mult * (1.0 - 0.03 * upgrades.haste as f32)).max(MIN_COOLDOWN_MULT);
    stats.pickup_range *= 1.0 + 0.1 * upgrades.magnet as f32;
    stats.luck += 0.05 * upgrades.fortune as f32;

    player.max_hp += 10.0 * upgrades.vitality as f32;
    player.hp = player.max_hp;
}

/// Add XP scaled by luck.
pub fn grant_xp(state: &mut SimulationState, amount: f32) {
    if amount <= 0.0 {
        return;
    }
    state.player.xp += amount * (1.0 + state.player.stats.luck);
}

/// Raise a level-up if the threshold is met and none is pending.
pub fn check_level_up(state: &mut SimulationState) -> Option<LevelUpRequest> {
    if state.level_up.is_some() {
        return None;
    }
    let player = &mut state.player;
    if player.xp < player.next_level_xp {
        return None;
    }

    player.xp -= player.next_level_xp;
    player.level += 1;
    player.next_level_xp = next_threshold(player.next_level_xp, player.level);
    let level = player.level;

    let choices = offer_choices(state);
    info!(level, choices = choices.len(), "level up");
    state.emit(GameEventData::LevelUp { level });

    let request = LevelUpRequest { level, choices };
    state.level_up = Some(request.clone());
    Some(request)
}

/// Apply choice `index` of the pending level-up.
///
/// Returns `false` (and leaves the request pending) when there is no
/// request or the index is out of range.
pub fn resolve_level_up(state: &mut SimulationState, index: usize) -> bool {
    let Some(request) = &state.level_up else {
        debug!(index, "no level-up pending");
        return false;
    };
    let Some(&upgrade) = request.choices.get(index) else {
        debug!(index, available = request.choices.len(), "invalid level-up choice");
        return false;
    };

    upgrade.apply(&mut state.player);
    debug!(?upgrade, "upgrade applied");
    state.level_up = None;
    true
}

/// Pick up to [`LEVEL_UP_CHOICES`] distinct upgrades.
fn offer_choices(state: &mut SimulationState) -> Vec<Upgrade> {
    let player = &state.player;
    let mut pool: Vec<Upgrade> = Upgrade::STATS.to_vec();
    for kind in WeaponKind::ALL {
        match player.weapons.iter().find(|w| w.kind == kind) {
            Some(slot) if slot.level < MAX_WEAPON_LEVEL => pool.push(Upgrade::Empower(kind)),
            Some(_) => {}
            None if player.weapons.len() < MAX_WEAPON_SLOTS => pool.push(Upgrade::NewWeapon(kind)),
            None => {}
        }
    }

    state.rng.shuffle(&mut pool);
    pool.truncate(LEVEL_UP_CHOICES);
    pool
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, SimConfig};
    use proptest::prelude::*;

    fn new_state() -> SimulationState {
        SimulationState::new(&RunConfig::default(), &SimConfig::default())
    }

    #[test]
    fn test_level_up_carries_remainder() {
        let mut state = new_state();
        grant_xp(&mut state, 60.0);

        let request = check_level_up(&mut state).unwrap();
        assert_eq!(request.level, 2);
        assert_eq!(state.player.level, 2);
        assert_eq!(state.player.xp, 10.0);
        assert_eq!(state.player.next_level_xp, 50.0 + 40.0 + 30.0);
    }

    #[test]
    fn test_luck_scales_xp() {
        let mut state = new_state();
        state.player.stats.luck = 0.5;
        grant_xp(&mut state, 10.0);
        assert_eq!(state.player.xp, 15.0);
    }

    #[test]
    fn test_pending_request_blocks_next_level() {
        let mut state = new_state();
        grant_xp(&mut state, 500.0);

        assert!(check_level_up(&mut state).is_some());
        assert!(check_level_up(&mut state).is_none());
        assert_eq!(state.player.level, 2);

        assert!(resolve_level_up(&mut state, 0));
        assert!(check_level_up(&mut state).is_some());
        assert_eq!(state.player.level, 3);
    }

    #[test]
    fn test_choices_are_distinct() {
        let mut state = new_state();
        grant_xp(&mut state, 50.0);
        let request = check_level_up(&mut state).unwrap();

        assert_eq!(request.choices.len(), LEVEL_UP_CHOICES);
        for (i, a) in request.choices.iter().enumerate() {
            for b in &request.choices[i + 1..] {
                assert_ne!(a, b);
            }
        }
        // Starting weapon is owned, so it is never offered as new
        assert!(!request.choices.contains(&Upgrade::NewWeapon(WeaponKind::ArcaneBolt)));
    }

    #[test]
    fn test_resolve_applies_exactly_one_upgrade() {
        let mut state = new_state();
        state.level_up = Some(LevelUpRequest {
            level: 2,
            choices: vec![Upgrade::Multishot, Upgrade::Might],
        });

        assert!(!resolve_level_up(&mut state, 5));
        assert!(state.level_up.is_some());

        assert!(resolve_level_up(&mut state, 0));
        assert_eq!(state.player.stats.projectile_count, 1);
        assert_eq!(state.player.stats.damage_mult, 1.0);

        // Request consumed: a second resolve does nothing
        assert!(!resolve_level_up(&mut state, 0));
        assert_eq!(state.player.stats.projectile_count, 1);
    }

    #[test]
    fn test_weapon_upgrades() {
        let mut state = new_state();
        Upgrade::NewWeapon(WeaponKind::Fireball).apply(&mut state.player);
        Upgrade::NewWeapon(WeaponKind::Fireball).apply(&mut state.player);
        assert_eq!(state.player.weapons.len(), 2);

        for _ in 0..20 {
            Upgrade::Empower(WeaponKind::Fireball).apply(&mut state.player);
        }
        assert_eq!(state.player.weapons[1].level, MAX_WEAPON_LEVEL);
    }

    #[test]
    fn test_persistent_upgrades() {
        let mut state = new_state();
        let upgrades = PersistentUpgrades { might: 2, armor: 3, vitality: 5, haste: 1, magnet: 0, fortune: 4 };
        apply_persistent_upgrades(&mut state.player, &upgrades);

        let player = &state.player;
        assert!((player.stats.damage_mult - 1.1).abs() < 1e-6);
        assert_eq!(player.stats.armor, 3.0);
        assert_eq!(player.max_hp, 150.0);
        assert_eq!(player.hp, 150.0);
        assert!((player.stats.cooldown_mult - 0.97).abs() < 1e-6);
        assert!((player.stats.luck - 0.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_levels_monotonic_and_xp_conserved(grants in prop::collection::vec(0.0f32..80.0, 1..100)) {
            let mut state = new_state();
            let mut previous_level = state.player.level;
            for amount in grants {
                grant_xp(&mut state, amount);
                while check_level_up(&mut state).is_some() {
                    resolve_level_up(&mut state, 0);
                }
                prop_assert!(state.player.level >= previous_level);
                prop_assert!(state.player.xp >= 0.0);
                prop_assert!(state.player.xp < state.player.next_level_xp);
                previous_level = state.player.level;
            }
        }
    }
}
