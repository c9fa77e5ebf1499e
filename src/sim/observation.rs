//! Observation encodings handed to callers after `reset` and `step`

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::behavior::nearest;
use super::state::World;

/// Flat `f32` feature vector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation(pub Vec<f32>);

impl Observation {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the world is flattened into an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservationEncoding {
    /// Every prey position, then every hunter position, scaled by the bounds
    /// into `[0, 1]` (or `[-1, 1]` when `signed`). Captured prey leave a
    /// zeroed slot so the length stays fixed for the episode.
    Positions { signed: bool },
    /// Nearest prey minus the first hunter, scaled by the bounds; zeros when
    /// no prey remain
    NearestPreyOffset,
}

impl ObservationEncoding {
    pub fn encode(&self, world: &World) -> Observation {
        let bounds = world.bounds();
        match *self {
            ObservationEncoding::Positions { signed } => {
                let scale = |pos: DVec2| {
                    let unit = (pos / bounds).clamp(DVec2::ZERO, DVec2::ONE);
                    if signed { unit * 2.0 - 1.0 } else { unit }
                };
                let mut values = Vec::with_capacity(2 * (world.prey_slots + world.hunter_slots));
                let mut prey = vec![DVec2::ZERO; world.prey_slots];
                for agent in world.prey() {
                    if let Some(slot) = prey.get_mut(agent.slot as usize) {
                        *slot = scale(agent.pos);
                    }
                }
                let hunters = world.hunters().map(|a| scale(a.pos));
                for pos in prey.into_iter().chain(hunters) {
                    values.push(pos.x as f32);
                    values.push(pos.y as f32);
                }
                Observation(values)
            }
            ObservationEncoding::NearestPreyOffset => {
                let offset = world
                    .hunters()
                    .next()
                    .and_then(|hunter| {
                        let prey: Vec<DVec2> = world.prey().map(|p| p.pos).collect();
                        nearest(hunter.pos, &prey).map(|(target, _)| target - hunter.pos)
                    })
                    .unwrap_or(DVec2::ZERO)
                    / bounds;
                Observation(vec![offset.x as f32, offset.y as f32])
            }
        }
    }
}
