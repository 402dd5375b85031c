//! Player Controller
//!
//! Movement, obstacle and bounds resolution, animation state and timers.
//! Weapons and abilities live in their own modules.

use glam::Vec2;

use crate::core::geometry::EPSILON;
use crate::game::collision::push_out_of_obstacles;
use crate::game::state::{PlayerState, SimulationState, PLAYER_RADIUS};

/// Seconds per walk-cycle frame.
pub const WALK_FRAME_TIME: f32 = 0.12;

/// Frames in the walk cycle.
pub const WALK_FRAMES: u8 = 4;

/// Move the player by a sanitized input vector (length <= 1).
///
/// Order: integrate, push out of obstacles (unless intangible), clamp to
/// the world, clamp to the boss arena when locked.
pub fn move_player(state: &mut SimulationState, movement: Vec2, dt: f32) {
    let player = &mut state.player;
    if !player.is_alive() {
        player.moving = false;
        return;
    }

    player.moving = movement.length_squared() > EPSILON * EPSILON;
    if !player.moving {
        player.anim_frame = 0;
        player.anim_timer = 0.0;
        return;
    }

    player.direction = movement.normalize_or_zero();
    player.facing = player.facing.toward(movement.x);

    let mut position = player.position + movement * player.speed() * dt;
    if !player.buffs.is_intangible() {
        position = push_out_of_obstacles(position, PLAYER_RADIUS, &state.obstacles);
    }
    position = state.world.clamp_circle(position, PLAYER_RADIUS);
    if let Some(arena) = state.arena {
        position = arena.clamp_circle(position, PLAYER_RADIUS);
    }
    player.position = position;

    // Walk cycle
    player.anim_timer += dt;
    while player.anim_timer >= WALK_FRAME_TIME {
        player.anim_timer -= WALK_FRAME_TIME;
        player.anim_frame = (player.anim_frame + 1) % WALK_FRAMES;
    }
}

/// Count buffs and the post-hit window down.
pub fn tick_player_timers(player: &mut PlayerState, dt: f32) {
    player.buffs.tick(dt);
    player.hit_invulnerable = (player.hit_invulnerable - dt).max(0.0);
}
