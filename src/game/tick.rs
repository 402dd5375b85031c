//! Frame Orchestrator
//!
//! One call advances the run by one display frame. Subsystems run in a
//! fixed order, so later ones see what earlier ones did this frame.
//!
//! # Determinism
//!
//! - Enemies live in a BTreeMap and are visited in id order
//! - All gameplay randomness comes from `state.rng`
//! - Delayed effects run on simulated time, never the wall clock

use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::game::ability::{activate_ability, cancel_ability, tick_ability_cooldowns};
use crate::game::collision::process_projectiles;
use crate::game::companion::{restore_companion_multiplier, update_companions};
use crate::game::enemy::update_enemies;
use crate::game::events::{sort_events, GameEvent};
use crate::game::hud::{snapshot, HudSnapshot, RunResult};
use crate::game::input::FrameInput;
use crate::game::phase::{finish_run, update_phase};
use crate::game::pickup::update_drops;
use crate::game::player::{move_player, tick_player_timers};
use crate::game::progression::{check_level_up, resolve_level_up, LevelUpRequest};
use crate::game::schedule::ScheduledAction;
use crate::game::spawn::direct_spawns;
use crate::game::state::SimulationState;
use crate::game::status::tick_status_effects;
use crate::game::weapon::update_weapons;

/// Result of a frame.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this frame, in deterministic order
    pub events: Vec<GameEvent>,
    /// HUD snapshot, published once per `hud_interval`
    pub hud: Option<HudSnapshot>,
    /// Level-up raised this frame
    pub level_up: Option<LevelUpRequest>,
    /// Terminal result, on the frame the run ended
    pub run_result: Option<RunResult>,
}

/// Advance the simulation by one frame.
///
/// # Arguments
///
/// * `state` - The run state (will be mutated)
/// * `input` - Host input for this frame
/// * `real_dt` - Wall-clock seconds since the last frame; clamped to
///   `config.max_frame_dt`, and NaN or negative values skip the frame
/// * `config` - Engine tuning
///
/// Nothing advances while paused, while a level-up awaits
/// [`resolve_level_up`], or after the run has ended.
#[cfg_attr(
    feature = "debug-tracing",
    tracing::instrument(level = "trace", skip_all, fields(frame = state.frame))
)]
pub fn tick(state: &mut SimulationState, input: &FrameInput, real_dt: f32, config: &SimConfig) -> TickResult {
    let mut result = TickResult::default();

    if state.is_ended() {
        return result;
    }

    // Pause toggles are honoured even while paused
    if input.toggle_pause {
        state.paused = !state.paused;
        debug!(paused = state.paused, "pause toggled");
    }
    if state.paused {
        return result;
    }

    if !(real_dt >= 0.0) {
        debug!(real_dt, "invalid frame delta, skipping frame");
        return result;
    }
    let dt = real_dt.min(config.max_frame_dt);

    if state.level_up.is_some() {
        return result;
    }

    // 0. Advance simulated time
    state.frame += 1;
    state.elapsed += dt;

    // 1. Delayed actions that have come due
    run_scheduled_actions(state);

    // 2. Ability triggers and cancels
    apply_input(state, input);

    // 3. Player movement and timers
    move_player(state, input.normalized_movement(), dt);
    tick_player_timers(&mut state.player, dt);

    // 4. Cooldowns and weapon fire
    tick_ability_cooldowns(&mut state.player, dt);
    update_weapons(state, dt, config);

    // 5. Status effects
    tick_status_effects(state, dt);

    // 6. Projectile motion and collision
    process_projectiles(state, dt);

    // 7. Enemy AI, attacks and decay
    update_enemies(state, dt, config);

    // 8. Companions
    update_companions(state, dt);

    // 9. Drops
    update_drops(state, dt);

    // 10. Progression
    result.level_up = check_level_up(state);

    // 11. Spawning (not while a level-up is pending) and phase
    if state.level_up.is_none() {
        direct_spawns(state, dt, config);
    }
    update_phase(state, dt, config);

    // 12. Defeat
    if !state.player.is_alive() {
        finish_run(state, false);
    }

    // 13. Cosmetics
    state.tick_particles(dt);

    // 14. HUD
    state.hud_timer += dt;
    if state.hud_timer >= config.hud_interval || state.is_ended() {
        state.hud_timer = 0.0;
        result.hud = Some(snapshot(state));
    }

    if state.is_ended() {
        result.run_result = state.outcome.clone();
    }

    result.events = state.take_events();
    sort_events(&mut result.events);
    trace!(frame = state.frame, events = result.events.len(), "frame complete");
    result
}

/// Run every scheduled action due at the current simulated time.
fn run_scheduled_actions(state: &mut SimulationState) {
    for action in state.scheduler.drain_due(state.elapsed) {
        match action {
            ScheduledAction::RestoreCompanionMultiplier => restore_companion_multiplier(state),
            ScheduledAction::DeclareVictory => {
                finish_run(state, true);
            }
        }
    }
}

/// Apply ability cancels, then triggers.
fn apply_input(state: &mut SimulationState, input: &FrameInput) {
    if !state.player.is_alive() {
        return;
    }
    for &ability in &input.cancels {
        if let Some(event) = cancel_ability(state, ability) {
            state.push_event(event);
        }
    }
    for &ability in &input.abilities {
        if let Some(event) = activate_ability(state, ability) {
            state.push_event(event);
        }
    }
}

/// Run scripted frames at a fixed `dt`, resolving level-ups with the first
/// choice. Stops early when the run ends.
///
/// Returns every event generated.
pub fn simulate(
    state: &mut SimulationState,
    inputs: &[FrameInput],
    dt: f32,
    config: &SimConfig,
) -> Vec<GameEvent> {
    let mut all_events = Vec::new();

    for input in inputs {
        let result = tick(state, input, dt, config);
        all_events.extend(result.events);

        if result.level_up.is_some() {
            resolve_level_up(state, 0);
        }
        if result.run_result.is_some() {
            break;
        }
    }

    all_events
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::game::ability::AbilityId;
    use crate::game::collision::kill_enemy;
    use crate::game::companion::set_companion_multiplier;
    use crate::game::events::GameEventData;
    use crate::game::spawn::spawn_boss;
    use crate::game::state::RunPhase;
    use glam::Vec2;
    use proptest::prelude::*;

    /// Engine tuning with waves effectively disabled.
    fn quiet_config() -> SimConfig {
        SimConfig { wave_interval: 1.0e6, ..SimConfig::default() }
    }

    fn new_state(run: &RunConfig, config: &SimConfig) -> SimulationState {
        let mut state = SimulationState::new(run, config);
        state.obstacles.clear();
        state
    }

    fn circle_inputs(frames: usize) -> Vec<FrameInput> {
        (0..frames)
            .map(|i| {
                let angle = i as f32 * 0.02;
                FrameInput::with_movement(Vec2::from_angle(angle))
            })
            .collect()
    }

    #[test]
    fn test_tick_determinism() {
        let config = SimConfig::default();
        let run = RunConfig { seed: 12345, ..RunConfig::default() };
        let inputs = circle_inputs(900);

        let mut state1 = SimulationState::new(&run, &config);
        let mut state2 = SimulationState::new(&run, &config);
        let events1 = simulate(&mut state1, &inputs, 1.0 / 60.0, &config);
        let events2 = simulate(&mut state2, &inputs, 1.0 / 60.0, &config);

        assert_eq!(events1, events2);
        assert_eq!(
            serde_json::to_string(&state1).unwrap(),
            serde_json::to_string(&state2).unwrap()
        );
        assert!(state1.stats.kills > 0 || !state1.enemies.is_empty());
    }

    #[test]
    fn test_dt_clamped_and_invalid_skipped() {
        let config = quiet_config();
        let mut state = new_state(&RunConfig::default(), &config);

        tick(&mut state, &FrameInput::new(), 5.0, &config);
        assert!((state.elapsed - config.max_frame_dt).abs() < 1e-6);
        assert_eq!(state.frame, 1);

        tick(&mut state, &FrameInput::new(), f32::NAN, &config);
        tick(&mut state, &FrameInput::new(), -1.0, &config);
        assert_eq!(state.frame, 1);
    }

    #[test]
    fn test_pause_suspends_everything() {
        let config = quiet_config();
        let mut state = new_state(&RunConfig::default(), &config);
        tick(&mut state, &FrameInput::new(), 0.05, &config);
        let position = state.player.position;

        tick(&mut state, &FrameInput::pause_toggle(), 0.05, &config);
        assert!(state.paused);
        for _ in 0..10 {
            let result = tick(&mut state, &FrameInput::with_movement(Vec2::X), 0.05, &config);
            assert!(result.events.is_empty());
        }
        assert_eq!(state.frame, 1);
        assert_eq!(state.player.position, position);

        tick(&mut state, &FrameInput::pause_toggle(), 0.05, &config);
        assert!(!state.paused);
        assert_eq!(state.frame, 2);
    }

    #[test]
    fn test_level_up_suspends_until_resolved() {
        let config = quiet_config();
        let mut state = new_state(&RunConfig::default(), &config);
        state.player.xp = 60.0;

        let result = tick(&mut state, &FrameInput::new(), 0.05, &config);
        assert!(result.level_up.is_some());
        let elapsed = state.elapsed;

        let result = tick(&mut state, &FrameInput::new(), 0.05, &config);
        assert!(result.level_up.is_none());
        assert_eq!(state.elapsed, elapsed);

        assert!(resolve_level_up(&mut state, 0));
        tick(&mut state, &FrameInput::new(), 0.05, &config);
        assert!(state.elapsed > elapsed);
        assert_eq!(state.player.level, 2);
        assert!((state.player.xp - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_defeat_ends_run_once() {
        let config = quiet_config();
        let mut state = new_state(&RunConfig::default(), &config);
        state.player.hp = 0.0;

        let result = tick(&mut state, &FrameInput::new(), 0.05, &config);
        let outcome = result.run_result.unwrap();
        assert!(!outcome.victory);
        assert!(result.hud.is_some());
        assert_eq!(
            result
                .events
                .iter()
                .filter(|e| matches!(e.data, GameEventData::RunEnded { .. }))
                .count(),
            1
        );

        let result = tick(&mut state, &FrameInput::new(), 0.05, &config);
        assert!(result.run_result.is_none());
        assert!(result.events.is_empty());
        assert_eq!(state.frame, 1);
    }

    #[test]
    fn test_boss_kill_leads_to_victory_after_delay() {
        let config = quiet_config();
        let mut state = new_state(&RunConfig::default(), &config);
        state.player.buffs.invulnerable = 100.0;

        let boss = spawn_boss(&mut state, &config);
        assert_eq!(state.phase, RunPhase::BossArena);
        kill_enemy(&mut state, boss);
        assert_eq!(state.phase, RunPhase::Extraction);

        let mut outcome = None;
        for _ in 0..30 {
            let result = tick(&mut state, &FrameInput::new(), 0.1, &config);
            if result.run_result.is_some() {
                outcome = result.run_result;
                break;
            }
        }

        let outcome = outcome.unwrap();
        assert!(outcome.victory);
        assert!(outcome.stage_cleared);
        assert_eq!(outcome.bosses_killed, 1);
        assert!(state.elapsed >= 2.0);
        assert_eq!(state.phase, RunPhase::Ended);
    }

    #[test]
    fn test_hud_cadence() {
        let config = quiet_config();
        let mut state = new_state(&RunConfig::default(), &config);

        // First frame always publishes, then every 0.1 s of simulated time
        assert!(tick(&mut state, &FrameInput::new(), 0.03, &config).hud.is_some());
        let published: Vec<bool> = (0..10)
            .map(|_| tick(&mut state, &FrameInput::new(), 0.03, &config).hud.is_some())
            .collect();
        assert_eq!(published.iter().filter(|&&p| p).count(), 2);
        assert!(published[3] && published[7]);
    }

    #[test]
    fn test_rally_restore_runs_once_on_simulated_time() {
        let config = quiet_config();
        let run = RunConfig { abilities: vec![AbilityId::Rally], ..RunConfig::default() };
        let mut state = new_state(&run, &config);

        tick(&mut state, &FrameInput::new().trigger(AbilityId::Rally), 0.1, &config);
        assert_eq!(state.player.companion_damage_mult, 2.0);

        // Retrigger at t = 3 moves the restore to t = 8
        while state.elapsed < 3.0 {
            tick(&mut state, &FrameInput::new(), 0.1, &config);
        }
        set_companion_multiplier(&mut state, 2.0, 5.0);

        // Pausing does not advance the restore
        tick(&mut state, &FrameInput::pause_toggle(), 0.1, &config);
        for _ in 0..100 {
            tick(&mut state, &FrameInput::new(), 0.1, &config);
        }
        tick(&mut state, &FrameInput::pause_toggle(), 0.1, &config);

        while state.elapsed < 7.5 {
            tick(&mut state, &FrameInput::new(), 0.1, &config);
        }
        assert_eq!(state.player.companion_damage_mult, 2.0);

        while state.elapsed < 8.2 {
            tick(&mut state, &FrameInput::new(), 0.1, &config);
        }
        assert_eq!(state.player.companion_damage_mult, 1.0);
        assert!(state.scheduler.is_empty());
    }

    #[test]
    fn test_cancel_restores_immediately() {
        let config = quiet_config();
        let run = RunConfig { abilities: vec![AbilityId::Rally], ..RunConfig::default() };
        let mut state = new_state(&run, &config);

        tick(&mut state, &FrameInput::new().trigger(AbilityId::Rally), 0.1, &config);
        let result = tick(&mut state, &FrameInput::new().cancel(AbilityId::Rally), 0.1, &config);

        assert_eq!(state.player.companion_damage_mult, 1.0);
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::AbilityCancelled { ability: AbilityId::Rally })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_hp_in_bounds_every_frame(
            seed in any::<u64>(),
            moves in prop::collection::vec((-1.0f32..1.0, -1.0f32..1.0), 60..240)
        ) {
            let config = SimConfig { wave_interval: 0.5, ..SimConfig::default() };
            let run = RunConfig { seed, ..RunConfig::default() };
            let mut state = SimulationState::new(&run, &config);

            for (x, y) in moves {
                let result = tick(&mut state, &FrameInput::with_movement(Vec2::new(x, y)), 0.05, &config);
                if result.level_up.is_some() {
                    resolve_level_up(&mut state, 0);
                }
                prop_assert!(state.player.hp >= 0.0);
                prop_assert!(state.player.hp <= state.player.max_hp);
                prop_assert!(state.world.contains(state.player.position));
                prop_assert!(state.live_enemy_count() <= config.max_enemies);
            }
        }
    }
}
