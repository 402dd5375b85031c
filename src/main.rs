//! Arena Survival Demo Runner
//!
//! Drives the simulation core headless with scripted input and logs the run.
//!
//! Usage: `arena-survival [run-config.json]`

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_survival::{
    game::{
        events::GameEventData,
        tick::{simulate, tick},
    },
    resolve_level_up, FrameInput, RunConfig, SimConfig, SimulationState, NOMINAL_FRAME_RATE, VERSION,
};

/// Demo length in simulated seconds.
const DEMO_SECONDS: u32 = 120;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Arena Survival Core v{}", VERSION);

    let run = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading run config {path}"))?;
            RunConfig::from_json(&json).with_context(|| format!("loading run config {path}"))?
        }
        None => RunConfig::default(),
    };

    demo_run(&run)
}

/// Scripted input: walk a slow circle, fire abilities when they come up.
fn scripted_inputs(run: &RunConfig, frames: u32) -> Vec<FrameInput> {
    (0..frames)
        .map(|frame| {
            let t = frame as f32 / NOMINAL_FRAME_RATE as f32;
            let mut input = FrameInput::with_movement(Vec2::from_angle(t * 0.4));
            if frame % NOMINAL_FRAME_RATE == 0 {
                for &ability in &run.abilities {
                    input = input.trigger(ability);
                }
            }
            input
        })
        .collect()
}

fn demo_run(run: &RunConfig) -> Result<()> {
    info!("=== Starting Demo Run ===");
    info!(
        seed = run.seed,
        stage = run.stage,
        difficulty = %run.difficulty.name,
        "run config"
    );

    let config = SimConfig::default();
    let dt = 1.0 / NOMINAL_FRAME_RATE as f32;
    let inputs = scripted_inputs(run, DEMO_SECONDS * NOMINAL_FRAME_RATE);

    let mut state = SimulationState::new(run, &config);
    let mut total_events = 0;
    let mut next_report = 0.0;

    for input in &inputs {
        let result = tick(&mut state, input, dt, &config);
        total_events += result.events.len();

        // Report every 10 seconds
        if let Some(hud) = &result.hud {
            if hud.elapsed >= next_report {
                info!(
                    "t={:.0}s hp {:.0}/{:.0}, level {}, {} enemies, {} kills",
                    hud.elapsed, hud.hp, hud.max_hp, hud.level, hud.enemies, hud.kills
                );
                next_report += 10.0;
            }
        }

        for event in &result.events {
            match &event.data {
                GameEventData::LevelUp { level } => info!("Reached level {}", level),
                GameEventData::BossDefeated { main_boss, .. } => {
                    info!("Boss defeated (main: {})", main_boss)
                }
                GameEventData::PhaseChanged { from, to } => info!("Phase {:?} -> {:?}", from, to),
                _ => {}
            }
        }

        if let Some(request) = &result.level_up {
            info!("Level-up choices: {:?}", request.choices);
            resolve_level_up(&mut state, 0);
        }

        if let Some(outcome) = &result.run_result {
            info!("Run ended at frame {}: {:?}", state.frame, outcome);
            break;
        }
    }

    info!("=== Run Summary ===");
    info!(
        kills = state.stats.kills,
        currency = state.stats.currency,
        level = state.player.level,
        survived = state.elapsed,
        "summary"
    );
    info!("Total events: {}", total_events);

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let mut replay = SimulationState::new(run, &config);
    simulate(&mut replay, &inputs[..state.frame as usize], dt, &config);

    let original = serde_json::to_string(&state).context("serializing run state")?;
    let replayed = serde_json::to_string(&replay).context("serializing replay state")?;
    if original == replayed {
        info!("DETERMINISM VERIFIED: states match");
    } else {
        anyhow::bail!("determinism failure: replay diverged");
    }

    Ok(())
}
