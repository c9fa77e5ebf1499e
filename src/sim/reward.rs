//! Distance-based reward signals
//!
//! Rewards are read from the post-movement snapshot, before the capture
//! batch is removed, so a capturing tick still sees the captured prey.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::behavior::nearest;
use super::collision::near_obstacle;
use super::state::World;
use crate::consts::{CAPTURE_PENALTY, SAFE_ZONE_BONUS};

/// Which objective the scalar reward encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardFraming {
    /// Prey earn the summed prey/hunter distances, hunters the negative
    ZeroSum,
    /// Negative distance from the hunter to its nearest prey
    NearestPrey,
    /// Mean distance from the prey to the hunters, shaped by obstacles and capture
    Survival,
}

/// Scalar reward plus its per-side breakdown
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub total: f64,
    pub prey: f64,
    pub hunter: f64,
}

/// Result of evaluating a framing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RewardSignal {
    pub reward: Reward,
    /// No prey were left to score; the episode is over
    pub prey_exhausted: bool,
}

impl RewardFraming {
    /// Score `world`. `captured` marks a tick in which a capture happened;
    /// `safe_zone` is the obstacle distance that earns the survival bonus.
    pub fn compute(&self, world: &World, captured: bool, safe_zone: f64) -> RewardSignal {
        let prey: Vec<DVec2> = world.prey().map(|a| a.pos).collect();
        if prey.is_empty() {
            return RewardSignal {
                reward: Reward::default(),
                prey_exhausted: true,
            };
        }
        let hunters: Vec<DVec2> = world.hunters().map(|a| a.pos).collect();

        let reward = match self {
            RewardFraming::ZeroSum => {
                let prey_total: f64 = prey
                    .iter()
                    .flat_map(|p| hunters.iter().map(move |h| p.distance(*h)))
                    .sum();
                let hunter_total = -prey_total;
                Reward {
                    total: prey_total + hunter_total,
                    prey: prey_total,
                    hunter: hunter_total,
                }
            }
            RewardFraming::NearestPrey => {
                let dist = hunters
                    .first()
                    .and_then(|&h| nearest(h, &prey))
                    .map_or(0.0, |(_, d)| d);
                Reward {
                    total: -dist,
                    prey: 0.0,
                    hunter: -dist,
                }
            }
            RewardFraming::Survival => {
                let me = prey[0];
                let mut total = if hunters.is_empty() {
                    0.0
                } else {
                    hunters.iter().map(|h| me.distance(*h)).sum::<f64>() / hunters.len() as f64
                };
                if near_obstacle(me, world.obstacles(), safe_zone) {
                    total += SAFE_ZONE_BONUS;
                }
                if captured {
                    total -= CAPTURE_PENALTY;
                }
                Reward {
                    total,
                    prey: total,
                    hunter: 0.0,
                }
            }
        };

        RewardSignal {
            reward,
            prey_exhausted: false,
        }
    }
}
