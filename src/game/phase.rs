//! Boss Phase State Machine
//!
//! ```text
//! Survival ──(milestone within 5 s)──► EliteWarning ──(sub-boss)──► Survival
//!     │                                     │
//!     └──────────────(boss spawn)───────────┴──► BossArena ──(boss dies)──► Extraction ──► Ended (victory)
//!
//! any phase ──(hp exhausted / time budget spent)──► Ended (defeat)
//! ```
//!
//! Every terminal transition goes through [`finish_run`], which checks and
//! sets the single `ended` latch.

use tracing::{debug, info};

use crate::config::SimConfig;
use crate::core::geometry::Rect;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::hud::RunResult;
use crate::game::schedule::ScheduledAction;
use crate::game::state::{RunPhase, SimulationState, Warning, PLAYER_RADIUS};

/// Warning lead before a scheduled sub-boss or boss.
pub const BOSS_WARNING_LEAD: f32 = 5.0;

/// Delay between the boss's death and the victory result.
pub const VICTORY_DELAY: f32 = 2.0;

/// Change phase, emitting an event when it actually changes.
pub fn set_phase(state: &mut SimulationState, to: RunPhase) {
    let from = state.phase;
    if from == to {
        return;
    }
    state.phase = to;
    debug!(?from, ?to, elapsed = state.elapsed, "phase changed");
    state.emit(GameEventData::PhaseChanged { from, to });
}

/// Per-frame phase bookkeeping: banner timer, milestone warnings and the
/// bounded time budget.
pub fn update_phase(state: &mut SimulationState, dt: f32, _config: &SimConfig) {
    if state.ended {
        return;
    }

    // 1. Banner countdown
    if let Some(warning) = &mut state.warning {
        warning.remaining -= dt;
        if warning.remaining <= 0.0 {
            state.warning = None;
        }
    }

    // 2. Warn ahead of the next milestone
    if state.phase == RunPhase::Survival {
        if let Some((at, milestone)) = state.spawner.next_milestone(&state.difficulty) {
            let lead = at - state.elapsed;
            if lead > 0.0 && lead <= BOSS_WARNING_LEAD {
                state.warning = Some(Warning {
                    text: milestone.warning_text().to_string(),
                    remaining: BOSS_WARNING_LEAD,
                });
                set_phase(state, RunPhase::EliteWarning);
            }
        }
    }

    // 3. Bounded time budget
    if let Some(duration) = state.difficulty.duration {
        if state.elapsed >= duration && state.phase != RunPhase::Extraction {
            info!(elapsed = state.elapsed, duration, "time budget spent");
            finish_run(state, false);
        }
    }
}

/// Lock the player inside an arena around their current position.
pub fn enter_boss_arena(state: &mut SimulationState, config: &SimConfig) {
    let arena = Rect::centered(state.player.position, config.arena_half_extents).fit_within(&state.world);
    state.arena = Some(arena);
    state.player.position = arena.clamp_circle(state.player.position, PLAYER_RADIUS);
    set_phase(state, RunPhase::BossArena);
}

/// The main boss died: release the arena and queue the victory.
///
/// Infinite runs have no victory; they return to survival.
pub fn on_boss_defeated(state: &mut SimulationState) {
    state.arena = None;
    if state.ended {
        return;
    }
    if state.difficulty.is_infinite() {
        set_phase(state, RunPhase::Survival);
        return;
    }
    set_phase(state, RunPhase::Extraction);
    state
        .scheduler
        .schedule(state.elapsed + VICTORY_DELAY, ScheduledAction::DeclareVictory);
}

/// End the run. Returns `false` if it had already ended.
pub fn finish_run(state: &mut SimulationState, victory: bool) -> bool {
    if state.ended {
        return false;
    }
    state.ended = true;

    let result = RunResult {
        victory,
        currency: state.stats.currency,
        kills: state.stats.kills,
        bosses_killed: state.stats.bosses_killed,
        survival_secs: state.elapsed,
        stage: state.stage,
        stage_cleared: victory,
    };
    info!(
        victory,
        kills = result.kills,
        currency = result.currency,
        survival_secs = result.survival_secs,
        "run ended"
    );

    set_phase(state, RunPhase::Ended);
    state.arena = None;
    let event = GameEvent::run_ended(state.frame, victory, state.elapsed);
    state.push_event(event);
    state.outcome = Some(result);
    true
}

// =============================================================================
// TESTS
// =============================================================================
