//! # Arena Survival Simulation Core
//!
//! Per-frame simulation engine for a single-player arena survival game:
//! escalating enemy waves, experience and level-ups, orbiting companions,
//! and scripted bosses inside a time budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ARENA SURVIVAL CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Primitives                               │
//! │  ├── rng.rs       - Seeded Xorshift128+ PRNG                 │
//! │  └── geometry.rs  - Overlap tests, rectangles, directions    │
//! │                                                              │
//! │  config.rs        - Run configuration and engine tuning      │
//! │                                                              │
//! │  game/            - Simulation                               │
//! │  ├── state.rs     - Entity registry (SimulationState)        │
//! │  ├── input.rs     - Per-frame input                          │
//! │  ├── tick.rs      - Frame orchestrator                       │
//! │  ├── player.rs    - Movement, obstacles, animation           │
//! │  ├── weapon.rs    - Weapon table and firing                  │
//! │  ├── ability.rs   - Triggered abilities                      │
//! │  ├── status.rs    - Bleed / burn / slow / confusion          │
//! │  ├── collision.rs - Combat resolver                          │
//! │  ├── enemy.rs     - Enemy AI and attack state machine        │
//! │  ├── companion.rs - Orbiting companions                      │
//! │  ├── pickup.rs    - Drops, magnetism, collection             │
//! │  ├── progression.rs - XP, level-ups, upgrades                │
//! │  ├── spawn.rs     - Spawn director                           │
//! │  ├── phase.rs     - Survival / boss phase machine            │
//! │  ├── schedule.rs  - Simulation-time delayed actions          │
//! │  ├── events.rs    - Game events for the presentation layer   │
//! │  └── hud.rs       - HUD snapshot and run result              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frame Model
//!
//! The host owns one [`SimulationState`] and calls [`game::tick::tick`] once
//! per display refresh with the real elapsed time. The delta is clamped,
//! subsystems run in a fixed order, and nothing in the core blocks or
//! performs I/O. All gameplay randomness comes from the seeded
//! [`DeterministicRng`], so the same seed and inputs give the same run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use config::{ConfigError, Difficulty, RunConfig, SimConfig};
pub use core::rng::DeterministicRng;
pub use game::hud::{HudSnapshot, RunResult};
pub use game::input::FrameInput;
pub use game::progression::{resolve_level_up, LevelUpRequest};
pub use game::state::{RunPhase, SimulationState};
pub use game::tick::{tick, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal display refresh the demo and benchmarks drive the core at (Hz)
pub const NOMINAL_FRAME_RATE: u32 = 60;
