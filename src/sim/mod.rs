//! Deterministic simulation module
//!
//! All pursuit/evasion logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (prey before hunters, then by agent ID)
//! - No rendering or I/O

pub mod behavior;
pub mod collision;
pub mod observation;
pub mod reward;
pub mod state;
pub mod tick;

pub use behavior::{
    Action, Behavior, BehaviorMode, Decide, Direction, GreedyPursuer, PatrolState, Scripted,
    Snapshot,
};
pub use collision::{BoundaryRule, CollisionPredicate, boxes_overlap, near_obstacle};
pub use observation::{Observation, ObservationEncoding};
pub use reward::{Reward, RewardFraming, RewardSignal};
pub use state::{Agent, AgentKind, Obstacle, SimulationState, World};
pub use tick::{CaptureEvent, StepInfo, StepResult, step};
