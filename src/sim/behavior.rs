//! Behavior strategies and the decide contract
//!
//! Every agent's movement for a tick comes from one `Behavior` variant.
//! Decisions read a snapshot of positions taken at tick start, so the order
//! in which agents are processed never changes the outcome.

use glam::DVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::{Agent, AgentKind, SimulationState};
use crate::consts::{ESCAPE_EPSILON, PATROL_TICKS};
use crate::error::SimError;

/// Discrete move, encoded `0..4` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn from_code(code: u8) -> Result<Self, SimError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| SimError::InvalidAction(format!("direction code {code} not in 0..4")))
    }

    pub fn code(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Unit step; "up" is +y
    pub fn unit(self) -> DVec2 {
        match self {
            Direction::Up => DVec2::Y,
            Direction::Down => DVec2::NEG_Y,
            Direction::Left => DVec2::NEG_X,
            Direction::Right => DVec2::X,
        }
    }

    pub fn random(rng: &mut Pcg32) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Caller input for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// No external input; steered agents hold still, evaders patrol
    #[default]
    None,
    /// One direction for a scenario with a single controllable agent
    Single(Direction),
    /// One direction per controllable agent, prey slots first, then hunters
    Multi(Vec<Direction>),
}

impl Action {
    /// Build an action from raw direction codes
    pub fn from_codes(codes: &[u8]) -> Result<Self, SimError> {
        let directions = codes
            .iter()
            .map(|&code| Direction::from_code(code))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match directions.as_slice() {
            [] => Action::None,
            [single] => Action::Single(*single),
            _ => Action::Multi(directions),
        })
    }

    pub fn directions(&self) -> &[Direction] {
        match self {
            Action::None => &[],
            Action::Single(direction) => std::slice::from_ref(direction),
            Action::Multi(directions) => directions,
        }
    }
}

/// Movement strategy of a population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    /// Keep moving with the current velocity
    Drift,
    /// Uniform jitter of up to half the speed per axis
    Wander,
    /// Hold a random direction for `ticks`, then draw a new one
    Patrol { ticks: u32 },
    /// Head for the nearest prey inside `radius`, patrol otherwise
    Pursue { radius: f64, patrol_ticks: u32 },
    /// Flee every hunter inside `radius`; otherwise obey the caller or patrol
    Evade { radius: f64, patrol_ticks: u32 },
    /// Move only as the caller says
    External,
}

impl Behavior {
    /// Whether this behavior consumes a slot of the caller's action
    pub fn accepts_action(&self) -> bool {
        matches!(self, Behavior::External | Behavior::Evade { .. })
    }

    pub fn patrol_ticks(&self) -> u32 {
        match *self {
            Behavior::Patrol { ticks } => ticks,
            Behavior::Pursue { patrol_ticks, .. } | Behavior::Evade { patrol_ticks, .. } => {
                patrol_ticks
            }
            _ => PATROL_TICKS,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SimError> {
        match *self {
            Behavior::Patrol { ticks: 0 } => {
                Err(SimError::InvalidConfig("patrol length must be at least one tick"))
            }
            Behavior::Pursue {
                radius,
                patrol_ticks,
            }
            | Behavior::Evade {
                radius,
                patrol_ticks,
            } => {
                if !(radius > 0.0 && radius.is_finite()) {
                    Err(SimError::InvalidConfig("detection radius must be positive"))
                } else if patrol_ticks == 0 {
                    Err(SimError::InvalidConfig("patrol length must be at least one tick"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

/// Current state of an agent's behavior machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BehaviorMode {
    #[default]
    Idle,
    Drifting,
    Wandering,
    Patrolling,
    Pursuing,
    Evading,
    /// Following a caller-supplied direction
    Directed,
}

/// Held patrol direction and the ticks left before it changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolState {
    pub direction: Direction,
    pub remaining: u32,
}

impl Default for PatrolState {
    fn default() -> Self {
        Self {
            direction: Direction::Up,
            remaining: PATROL_TICKS,
        }
    }
}

impl PatrolState {
    pub fn random(rng: &mut Pcg32, ticks: u32) -> Self {
        Self {
            direction: Direction::random(rng),
            remaining: ticks,
        }
    }

    /// Count down one tick, re-rolling the direction on expiry
    pub fn advance(&mut self, full_ticks: u32, rng: &mut Pcg32) -> Direction {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.direction = Direction::random(rng);
            self.remaining = full_ticks;
        }
        self.direction
    }
}

/// Positions of every alive agent at tick start
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub hunters: Vec<DVec2>,
    pub prey: Vec<DVec2>,
}

impl Snapshot {
    pub fn capture(agents: &[Agent]) -> Self {
        let mut snapshot = Self::default();
        for agent in agents.iter().filter(|a| a.alive) {
            match agent.kind {
                AgentKind::Hunter => snapshot.hunters.push(agent.pos),
                AgentKind::Prey => snapshot.prey.push(agent.pos),
            }
        }
        snapshot
    }
}

/// Nearest point to `from`, with its distance
pub fn nearest(from: DVec2, points: &[DVec2]) -> Option<(DVec2, f64)> {
    points
        .iter()
        .map(|&p| (p, from.distance(p)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Sum of unit vectors pointing away from every threat inside `radius`
pub fn escape_vector(from: DVec2, threats: &[DVec2], radius: f64) -> DVec2 {
    threats
        .iter()
        .map(|&threat| from - threat)
        .filter(|away| away.length() < radius)
        .map(|away| away / (away.length() + ESCAPE_EPSILON))
        .sum()
}

/// Decide this tick's displacement for `agent` and record its mode.
///
/// Drift agents keep their velocity; every other behavior overwrites the
/// velocity with the chosen displacement so callers can read the last move.
pub fn steer(
    agent: &mut Agent,
    behavior: &Behavior,
    action: Option<Direction>,
    snapshot: &Snapshot,
    rng: &mut Pcg32,
) -> DVec2 {
    let (mode, displacement) = match *behavior {
        Behavior::Drift => (BehaviorMode::Drifting, agent.vel),
        Behavior::Wander => {
            let jitter = DVec2::new(rng.random::<f64>(), rng.random::<f64>()) - 0.5;
            (BehaviorMode::Wandering, jitter * agent.speed)
        }
        Behavior::Patrol { ticks } => patrol(agent, ticks, rng),
        Behavior::Pursue {
            radius,
            patrol_ticks,
        } => match nearest(agent.pos, &snapshot.prey) {
            Some((target, dist)) if dist < radius => (
                BehaviorMode::Pursuing,
                (target - agent.pos).normalize_or_zero() * agent.speed,
            ),
            _ => patrol(agent, patrol_ticks, rng),
        },
        Behavior::Evade {
            radius,
            patrol_ticks,
        } => {
            let escape = escape_vector(agent.pos, &snapshot.hunters, radius);
            if escape.length() > 0.0 {
                (BehaviorMode::Evading, escape.normalize() * agent.speed)
            } else if let Some(direction) = action {
                (BehaviorMode::Directed, direction.unit() * agent.speed)
            } else {
                patrol(agent, patrol_ticks, rng)
            }
        }
        Behavior::External => match action {
            Some(direction) => (BehaviorMode::Directed, direction.unit() * agent.speed),
            None => (BehaviorMode::Idle, DVec2::ZERO),
        },
    };

    agent.mode = mode;
    if *behavior != Behavior::Drift {
        agent.vel = displacement;
    }
    displacement
}

fn patrol(agent: &mut Agent, ticks: u32, rng: &mut Pcg32) -> (BehaviorMode, DVec2) {
    let direction = agent.patrol.advance(ticks, rng);
    (BehaviorMode::Patrolling, direction.unit() * agent.speed)
}

/// Anything that turns the current state into the next action.
///
/// Scripted controllers, the greedy heuristic below and learned policies
/// owned by the caller are interchangeable behind this trait.
pub trait Decide {
    fn decide(&mut self, state: &SimulationState) -> Action;
}

impl<F> Decide for F
where
    F: FnMut(&SimulationState) -> Action,
{
    fn decide(&mut self, state: &SimulationState) -> Action {
        self(state)
    }
}

/// Replays a fixed list of actions, then idles
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    actions: Vec<Action>,
    cursor: usize,
}

impl Scripted {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, cursor: 0 }
    }
}

impl Decide for Scripted {
    fn decide(&mut self, _state: &SimulationState) -> Action {
        let action = self.actions.get(self.cursor).cloned().unwrap_or_default();
        self.cursor += 1;
        action
    }
}

/// One-step lookahead for every controllable agent: hunters pick the
/// direction that lands closest to their nearest prey, prey the one that
/// lands farthest from their nearest hunter.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPursuer;

impl GreedyPursuer {
    fn best_direction(agent: &Agent, targets: &[DVec2], toward: bool) -> Direction {
        let score = |direction: &Direction| {
            let landing = agent.pos + direction.unit() * agent.speed;
            let dist = nearest(landing, targets).map_or(0.0, |(_, d)| d);
            if toward { -dist } else { dist }
        };
        Direction::ALL
            .into_iter()
            .max_by(|a, b| score(a).total_cmp(&score(b)))
            .unwrap_or(Direction::Up)
    }
}

impl Decide for GreedyPursuer {
    fn decide(&mut self, state: &SimulationState) -> Action {
        let snapshot = Snapshot::capture(state.world().agents());
        let mut slots = vec![Direction::Up; state.action_arity()];

        for agent in state.world().agents() {
            let Some(slot) = state.action_slot(agent).and_then(|i| slots.get_mut(i)) else {
                continue;
            };
            *slot = match agent.kind {
                AgentKind::Hunter => Self::best_direction(agent, &snapshot.prey, true),
                AgentKind::Prey => Self::best_direction(agent, &snapshot.hunters, false),
            };
        }

        match slots.len() {
            0 => Action::None,
            1 => Action::Single(slots[0]),
            _ => Action::Multi(slots),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn agent_at(kind: AgentKind, pos: DVec2, speed: f64) -> Agent {
        Agent::new(1, 0, kind, pos, DVec2::ZERO, 0.025, speed)
    }

    #[test]
    fn test_direction_codes() {
        for direction in Direction::ALL {
            assert_eq!(Direction::from_code(direction.code()).unwrap(), direction);
        }
        assert!(Direction::from_code(4).is_err());
        assert_eq!(Direction::Up.unit(), DVec2::new(0.0, 1.0));
        assert_eq!(Direction::Left.unit(), DVec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_action_from_codes() {
        assert_eq!(Action::from_codes(&[]).unwrap(), Action::None);
        assert_eq!(
            Action::from_codes(&[3]).unwrap(),
            Action::Single(Direction::Right)
        );
        assert_eq!(Action::from_codes(&[0, 1]).unwrap().directions().len(), 2);
        assert!(Action::from_codes(&[0, 9]).is_err());
    }

    #[test]
    fn test_patrol_holds_then_rerolls() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut patrol = PatrolState {
            direction: Direction::Left,
            remaining: 3,
        };
        assert_eq!(patrol.advance(50, &mut rng), Direction::Left);
        assert_eq!(patrol.advance(50, &mut rng), Direction::Left);
        assert_eq!(patrol.remaining, 1);
        patrol.advance(50, &mut rng);
        assert_eq!(patrol.remaining, 50);
    }

    #[test]
    fn test_pursue_heads_for_nearby_prey() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut hunter = agent_at(AgentKind::Hunter, DVec2::new(0.5, 0.5), 0.01);
        let snapshot = Snapshot {
            hunters: vec![hunter.pos],
            prey: vec![DVec2::new(0.7, 0.5), DVec2::new(0.5, 0.1)],
        };
        let behavior = Behavior::Pursue {
            radius: 0.4,
            patrol_ticks: 50,
        };
        let step = steer(&mut hunter, &behavior, None, &snapshot, &mut rng);
        assert!((step - DVec2::new(0.01, 0.0)).length() < 1e-12);
        assert_eq!(hunter.mode, BehaviorMode::Pursuing);
    }

    #[test]
    fn test_pursue_falls_back_to_patrol() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut hunter = agent_at(AgentKind::Hunter, DVec2::new(0.0, 0.0), 0.01);
        let snapshot = Snapshot {
            hunters: vec![hunter.pos],
            prey: vec![DVec2::new(0.9, 0.9)],
        };
        let behavior = Behavior::Pursue {
            radius: 0.4,
            patrol_ticks: 50,
        };
        let step = steer(&mut hunter, &behavior, None, &snapshot, &mut rng);
        assert_eq!(hunter.mode, BehaviorMode::Patrolling);
        assert!((step.length() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_evade_moves_away_from_hunters() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut prey = agent_at(AgentKind::Prey, DVec2::new(0.5, 0.5), 0.03);
        let snapshot = Snapshot {
            hunters: vec![DVec2::new(0.4, 0.5), DVec2::new(0.9, 0.9)],
            prey: vec![prey.pos],
        };
        let behavior = Behavior::Evade {
            radius: 0.2,
            patrol_ticks: 50,
        };
        let step = steer(
            &mut prey,
            &behavior,
            Some(Direction::Left),
            &snapshot,
            &mut rng,
        );
        assert_eq!(prey.mode, BehaviorMode::Evading);
        assert!(step.x > 0.0);
        assert!((step.length() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_evade_obeys_action_when_safe() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut prey = agent_at(AgentKind::Prey, DVec2::new(0.5, 0.5), 0.03);
        let snapshot = Snapshot {
            hunters: vec![DVec2::new(0.0, 0.0)],
            prey: vec![prey.pos],
        };
        let behavior = Behavior::Evade {
            radius: 0.2,
            patrol_ticks: 50,
        };
        let step = steer(&mut prey, &behavior, Some(Direction::Up), &snapshot, &mut rng);
        assert_eq!(prey.mode, BehaviorMode::Directed);
        assert!((step - DVec2::new(0.0, 0.03)).length() < 1e-12);
    }

    #[test]
    fn test_external_without_action_holds_still() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut hunter = agent_at(AgentKind::Hunter, DVec2::new(0.5, 0.5), 0.01);
        let step = steer(
            &mut hunter,
            &Behavior::External,
            None,
            &Snapshot::default(),
            &mut rng,
        );
        assert_eq!(step, DVec2::ZERO);
        assert_eq!(hunter.mode, BehaviorMode::Idle);
    }

    #[test]
    fn test_escape_vector_ignores_far_hunters() {
        let escape = escape_vector(DVec2::new(0.5, 0.5), &[DVec2::new(0.9, 0.9)], 0.2);
        assert_eq!(escape, DVec2::ZERO);
    }
}
