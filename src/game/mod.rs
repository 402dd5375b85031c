//! Game simulation.
//!
//! Every subsystem is a set of free functions taking `&mut SimulationState`.
//! The frame orchestrator in [`tick`] calls them in a fixed order.

pub mod ability;
pub mod collision;
pub mod companion;
pub mod enemy;
pub mod events;
pub mod hud;
pub mod input;
pub mod phase;
pub mod pickup;
pub mod player;
pub mod progression;
pub mod schedule;
pub mod spawn;
pub mod state;
pub mod status;
pub mod tick;
pub mod weapon;

// Re-export commonly used types
pub use events::{GameEvent, GameEventData};
pub use input::FrameInput;
pub use state::{Enemy, EnemyKind, EntityId, PlayerState, Projectile, RunPhase, SimulationState};
pub use tick::{tick, TickResult};
