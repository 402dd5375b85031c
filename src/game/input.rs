//! Frame Input
//!
//! What the host hands the simulation each frame. Movement is sanitized
//! here so nothing downstream sees NaN or a vector longer than 1.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::game::ability::AbilityId;

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Input for a single frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// Desired movement; any length, clamped to 1 before use
    pub movement: Vec2,

    /// Abilities triggered this frame
    pub abilities: Vec<AbilityId>,

    /// Abilities cancelled this frame
    pub cancels: Vec<AbilityId>,

    /// Toggle pause
    pub toggle_pause: bool,
}

impl FrameInput {
    /// Idle input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Input with a movement vector.
    pub fn with_movement(movement: Vec2) -> Self {
        Self { movement, ..Self::default() }
    }

    /// Add an ability trigger.
    pub fn trigger(mut self, ability: AbilityId) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Add an ability cancel.
    pub fn cancel(mut self, ability: AbilityId) -> Self {
        self.cancels.push(ability);
        self
    }

    /// Input that only toggles pause.
    pub fn pause_toggle() -> Self {
        Self { toggle_pause: true, ..Self::default() }
    }

    /// Movement with NaN/infinite components zeroed and length clamped to 1.
    pub fn normalized_movement(&self) -> Vec2 {
        if !self.movement.is_finite() {
            return Vec2::ZERO;
        }
        self.movement.clamp_length_max(1.0)
    }

    /// Check if input has any movement.
    #[inline]
    pub fn has_movement(&self) -> bool {
        self.normalized_movement() != Vec2::ZERO
    }

    /// Check if this is an idle frame (no input).
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.has_movement() && self.abilities.is_empty() && self.cancels.is_empty() && !self.toggle_pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_clamped_to_unit_length() {
        let input = FrameInput::with_movement(Vec2::new(3.0, 4.0));
        let movement = input.normalized_movement();
        assert!((movement.length() - 1.0).abs() < 1e-6);
        assert!((movement - Vec2::new(0.6, 0.8)).length() < 1e-6);

        // Partial stick deflection is kept
        let input = FrameInput::with_movement(Vec2::new(0.5, 0.0));
        assert_eq!(input.normalized_movement(), Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_non_finite_movement_is_zeroed() {
        let input = FrameInput::with_movement(Vec2::new(f32::NAN, 1.0));
        assert_eq!(input.normalized_movement(), Vec2::ZERO);
        assert!(!input.has_movement());

        let input = FrameInput::with_movement(Vec2::new(f32::INFINITY, 0.0));
        assert_eq!(input.normalized_movement(), Vec2::ZERO);
    }

    #[test]
    fn test_builders() {
        assert!(FrameInput::new().is_idle());

        let input = FrameInput::new().trigger(AbilityId::Nova).cancel(AbilityId::Rally);
        assert_eq!(input.abilities, vec![AbilityId::Nova]);
        assert_eq!(input.cancels, vec![AbilityId::Rally]);
        assert!(!input.is_idle());

        assert!(FrameInput::pause_toggle().toggle_pause);
    }

    #[test]
    fn test_from_json() {
        let input: FrameInput =
            serde_json::from_str(r#"{ "movement": [1.0, 0.0], "abilities": ["Nova"] }"#).unwrap();
        assert_eq!(input.movement, Vec2::X);
        assert_eq!(input.abilities, vec![AbilityId::Nova]);
        assert!(!input.toggle_pause);
    }
}
