//! Collision predicates, obstacle blocking, and bounds enforcement
//!
//! Two capture semantics coexist: square overlap for the pixel arena and a
//! center-distance epsilon for the normalized environments. Each scenario
//! picks exactly one.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::state::{Agent, Obstacle};

/// Symmetric hunter/prey overlap test selected per scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionPredicate {
    /// Axis-aligned squares of side `size` intersect
    BoundingBox,
    /// Center distance strictly below `threshold`
    Distance { threshold: f64 },
}

impl CollisionPredicate {
    pub fn collides(&self, a: &Agent, b: &Agent) -> bool {
        match *self {
            CollisionPredicate::BoundingBox => boxes_overlap(a.pos, a.size, b.pos, b.size),
            CollisionPredicate::Distance { threshold } => a.pos.distance(b.pos) < threshold,
        }
    }
}

/// Strict overlap of two centered squares; touching edges do not count
#[inline]
pub fn boxes_overlap(a_pos: DVec2, a_size: f64, b_pos: DVec2, b_size: f64) -> bool {
    let reach = (a_size + b_size) / 2.0;
    let delta = (a_pos - b_pos).abs();
    delta.x < reach && delta.y < reach
}

/// True if `pos` is closer than `threshold` to any obstacle center
pub fn near_obstacle(pos: DVec2, obstacles: &[Obstacle], threshold: f64) -> bool {
    obstacles.iter().any(|o| pos.distance(o.pos) < threshold)
}

/// How agents are kept inside the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    /// Flip the velocity axis once the square crosses an edge; the position
    /// itself is left alone, so the agent may sit outside for one tick
    Reflect,
    /// Clamp the center into `[0, bounds]`
    Clamp,
}

impl BoundaryRule {
    /// Apply the rule after the agent has moved. Returns true if it acted.
    pub fn enforce(&self, agent: &mut Agent, bounds: DVec2) -> bool {
        match self {
            BoundaryRule::Reflect => {
                let half = agent.size / 2.0;
                let low = agent.pos - half;
                let high = agent.pos + half;
                let mut flipped = false;
                // Only flip while heading outward so an overshooting agent
                // is not trapped flipping outside the edge.
                if (high.x > bounds.x && agent.vel.x > 0.0) || (low.x < 0.0 && agent.vel.x < 0.0) {
                    agent.vel.x = -agent.vel.x;
                    flipped = true;
                }
                if (high.y > bounds.y && agent.vel.y > 0.0) || (low.y < 0.0 && agent.vel.y < 0.0) {
                    agent.vel.y = -agent.vel.y;
                    flipped = true;
                }
                flipped
            }
            BoundaryRule::Clamp => {
                let clamped = agent.pos.clamp(DVec2::ZERO, bounds);
                let moved = clamped != agent.pos;
                agent.pos = clamped;
                moved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::AgentKind;

    fn square(kind: AgentKind, x: f64, y: f64, size: f64) -> Agent {
        Agent::new(0, 0, kind, DVec2::new(x, y), DVec2::ZERO, size, 0.0)
    }

    #[test]
    fn test_boxes_overlap() {
        let hunter = square(AgentKind::Hunter, 0.0, 0.0, 20.0);
        let prey = square(AgentKind::Prey, 5.0, 5.0, 20.0);
        assert!(CollisionPredicate::BoundingBox.collides(&hunter, &prey));
        assert!(CollisionPredicate::BoundingBox.collides(&prey, &hunter));

        // Edges touching exactly
        let prey = square(AgentKind::Prey, 20.0, 0.0, 20.0);
        assert!(!CollisionPredicate::BoundingBox.collides(&hunter, &prey));
    }

    #[test]
    fn test_distance_threshold() {
        let predicate = CollisionPredicate::Distance { threshold: 0.05 };
        let hunter = square(AgentKind::Hunter, 0.50, 0.50, 0.0);
        let near = square(AgentKind::Prey, 0.52, 0.50, 0.0);
        let far = square(AgentKind::Prey, 0.60, 0.50, 0.0);
        assert!(predicate.collides(&hunter, &near));
        assert!(predicate.collides(&near, &hunter));
        assert!(!predicate.collides(&hunter, &far));
    }

    #[test]
    fn test_reflect_keeps_overshoot() {
        let bounds = DVec2::new(800.0, 600.0);
        let mut agent = square(AgentKind::Prey, 801.0, 300.0, 20.0);
        agent.vel = DVec2::new(2.0, 0.0);
        assert!(BoundaryRule::Reflect.enforce(&mut agent, bounds));
        assert_eq!(agent.vel.x, -2.0);
        assert_eq!(agent.pos.x, 801.0);

        // Already heading back inside: no second flip
        assert!(!BoundaryRule::Reflect.enforce(&mut agent, bounds));
        assert_eq!(agent.vel.x, -2.0);
    }

    #[test]
    fn test_clamp_into_bounds() {
        let mut agent = square(AgentKind::Hunter, 1.2, -0.1, 0.0);
        assert!(BoundaryRule::Clamp.enforce(&mut agent, DVec2::ONE));
        assert_eq!(agent.pos, DVec2::new(1.0, 0.0));
    }

    #[test]
    fn test_near_obstacle() {
        let obstacles = [Obstacle {
            pos: DVec2::new(0.5, 0.5),
            size: 0.05,
        }];
        assert!(near_obstacle(DVec2::new(0.53, 0.5), &obstacles, 0.05));
        assert!(!near_obstacle(DVec2::new(0.6, 0.5), &obstacles, 0.05));
    }
}
