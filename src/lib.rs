//! Hunter/Prey - A deterministic pursuit-evasion simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, collisions, captures, rewards)
//! - `scenario`: Data-driven scenario configuration and presets
//! - `error`: Configuration and action errors

pub mod error;
pub mod scenario;
pub mod sim;

pub use error::SimError;
pub use scenario::{ScenarioConfig, ScenarioPreset};

/// Simulation constants shared by the scenario presets
pub mod consts {
    /// Fixed simulation timestep (60 ticks per simulated second)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// Pixel arena dimensions
    pub const ARENA_WIDTH: f64 = 800.0;
    pub const ARENA_HEIGHT: f64 = 600.0;

    /// Side length of a freshly spawned square in the pixel arena
    pub const AGENT_SIZE: f64 = 20.0;
    /// Integer velocity range for arena agents (inclusive, per axis)
    pub const ARENA_MAX_START_SPEED: i32 = 3;

    /// Hunter growth on capture
    pub const HUNTER_GROWTH: f64 = 2.0;
    pub const HUNTER_SPEEDUP: f64 = 1.0;

    /// Prey speed escalation: every 5 simulated seconds, +0.2 per axis
    pub const PREY_SPEEDUP_INTERVAL_SECS: f64 = 5.0;
    pub const PREY_SPEEDUP_STEP: f64 = 0.2;

    /// Normalized-space capture distance
    pub const CAPTURE_THRESHOLD: f64 = 0.05;
    /// Normalized-space distance under which an obstacle blocks a move
    pub const OBSTACLE_THRESHOLD: f64 = 0.05;

    /// Ticks a patrolling agent holds its direction
    pub const PATROL_TICKS: u32 = 50;

    /// Survival framing shaping terms
    pub const SAFE_ZONE_BONUS: f64 = 0.1;
    pub const CAPTURE_PENALTY: f64 = 1.0;

    /// Guards the escape-vector division when a hunter sits on the prey
    pub const ESCAPE_EPSILON: f64 = 1e-6;
}

/// Move `value` `amount` further from zero, keeping its sign.
///
/// Zero (and negative zero) counts as non-positive and moves negative,
/// matching the arena's "if positive grow up, otherwise grow down" rule.
#[inline]
pub fn push_from_zero(value: f64, amount: f64) -> f64 {
    if value > 0.0 {
        value + amount
    } else {
        value - amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_from_zero() {
        assert_eq!(push_from_zero(2.0, 1.0), 3.0);
        assert_eq!(push_from_zero(-2.0, 1.0), -3.0);
        assert_eq!(push_from_zero(0.0, 0.2), -0.2);
    }
}
