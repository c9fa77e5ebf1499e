//! World model and simulation context
//!
//! Everything that changes during an episode lives in `SimulationState`:
//! the world, the counters, the speed-up timer and the seeded RNG.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::behavior::{BehaviorMode, PatrolState};
use super::observation::Observation;
use crate::error::SimError;
use crate::push_from_zero;
use crate::scenario::{GrowthRule, ScenarioConfig, ScenarioPreset, Spawn};

/// Which side an agent is on. Prey sort before hunters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Prey,
    Hunter,
}

/// A hunter or prey square
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    /// Index within its own population at spawn; maps caller action slots
    pub slot: u32,
    pub kind: AgentKind,
    /// Center of the square
    pub pos: DVec2,
    pub vel: DVec2,
    /// Side of the square
    pub size: f64,
    /// Distance per tick for directed moves
    pub speed: f64,
    pub alive: bool,
    pub patrol: PatrolState,
    pub mode: BehaviorMode,
}

impl Agent {
    pub fn new(
        id: u32,
        slot: u32,
        kind: AgentKind,
        pos: DVec2,
        vel: DVec2,
        size: f64,
        speed: f64,
    ) -> Self {
        Self {
            id,
            slot,
            kind,
            pos,
            vel,
            size,
            speed,
            alive: true,
            patrol: PatrolState::default(),
            mode: BehaviorMode::Idle,
        }
    }

    /// Grow after a capture. The square stays centered where it was.
    pub fn grow(&mut self, rule: &GrowthRule) {
        self.size += rule.size_step;
        self.vel.x = push_from_zero(self.vel.x, rule.velocity_step);
        self.vel.y = push_from_zero(self.vel.y, rule.velocity_step);
        self.speed = self.speed.max((self.speed + rule.speed_step).min(rule.speed_cap));
    }

    /// Periodic acceleration: each axis moves `step` further from zero
    pub fn speed_up(&mut self, step: f64) {
        self.vel.x = push_from_zero(self.vel.x, step);
        self.vel.y = push_from_zero(self.vel.y, step);
    }
}

/// A static blocker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: DVec2,
    pub size: f64,
}

/// Bounds, obstacles and agents of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub(crate) bounds: DVec2,
    pub(crate) obstacles: Vec<Obstacle>,
    /// Prey first, then hunters, each by id
    pub(crate) agents: Vec<Agent>,
    /// Prey spawned this episode, captured ones included
    pub(crate) prey_slots: usize,
    pub(crate) hunter_slots: usize,
    next_id: u32,
}

impl World {
    pub fn new(bounds: DVec2) -> Self {
        Self {
            bounds,
            obstacles: Vec::new(),
            agents: Vec::new(),
            prey_slots: 0,
            hunter_slots: 0,
            next_id: 1,
        }
    }

    /// Add an agent and return its id
    pub fn spawn(&mut self, kind: AgentKind, pos: DVec2, vel: DVec2, size: f64, speed: f64) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let slots = match kind {
            AgentKind::Prey => &mut self.prey_slots,
            AgentKind::Hunter => &mut self.hunter_slots,
        };
        let slot = *slots as u32;
        *slots += 1;
        self.agents
            .push(Agent::new(id, slot, kind, pos, vel, size, speed));
        self.normalize_order();
        id
    }

    pub fn add_obstacle(&mut self, pos: DVec2, size: f64) {
        self.obstacles.push(Obstacle { pos, size });
    }

    pub fn bounds(&self) -> DVec2 {
        self.bounds
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn hunters(&self) -> impl Iterator<Item = &Agent> {
        self.agents
            .iter()
            .filter(|a| a.alive && a.kind == AgentKind::Hunter)
    }

    pub fn prey(&self) -> impl Iterator<Item = &Agent> {
        self.agents
            .iter()
            .filter(|a| a.alive && a.kind == AgentKind::Prey)
    }

    pub fn prey_count(&self) -> usize {
        self.prey().count()
    }

    pub fn hunter_count(&self) -> usize {
        self.hunters().count()
    }

    /// Drop agents marked dead, returning how many were removed
    pub(crate) fn remove_dead(&mut self) -> usize {
        let before = self.agents.len();
        self.agents.retain(|a| a.alive);
        before - self.agents.len()
    }

    /// Keep prey before hunters and ids ascending for stable iteration
    fn normalize_order(&mut self) {
        self.agents.sort_by_key(|a| (a.kind, a.id));
    }
}

/// Mutable run context of one simulation
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub(crate) config: ScenarioConfig,
    pub(crate) world: World,
    /// Seed of the current episode
    pub(crate) seed: u64,
    pub(crate) rng: Pcg32,
    pub(crate) tick_count: u64,
    pub(crate) capture_count: u64,
    /// Seconds since the last periodic speed-up
    pub(crate) elapsed_time: f64,
}

impl SimulationState {
    /// Validate the scenario and populate a world from `config.seed`
    pub fn new(config: ScenarioConfig) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.seed;
        let mut rng = Pcg32::seed_from_u64(seed);
        let obstacles = generate_obstacles(&config, &mut rng);
        let world = populate(&config, obstacles, &mut rng);
        log::info!(
            "Scenario ready: {} hunters, {} prey, {} obstacles (seed {})",
            config.hunters.count,
            config.prey.count,
            world.obstacles.len(),
            seed
        );

        Ok(Self {
            config,
            world,
            seed,
            rng,
            tick_count: 0,
            capture_count: 0,
            elapsed_time: 0.0,
        })
    }

    pub fn from_preset(preset: ScenarioPreset) -> Result<Self, SimError> {
        Self::new(preset.config())
    }

    /// Run a scenario on a hand-built world instead of a generated one
    pub fn with_world(config: ScenarioConfig, world: World) -> Result<Self, SimError> {
        config.validate()?;
        if world.bounds != config.bounds {
            return Err(SimError::InvalidConfig("world bounds differ from the scenario"));
        }
        if world.hunter_count() == 0 {
            return Err(SimError::InvalidConfig("world has no hunters"));
        }
        if world.prey_count() == 0 {
            return Err(SimError::InvalidConfig("world has no prey"));
        }
        config.check_populations(world.hunter_count(), world.prey_count())?;
        let seed = config.seed;
        Ok(Self {
            config,
            world,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tick_count: 0,
            capture_count: 0,
            elapsed_time: 0.0,
        })
    }

    /// Start a new episode.
    ///
    /// `Some(seed)` reseeds the RNG; `None` keeps drawing from the current
    /// stream. Obstacles are redrawn only when the scenario asks for it.
    pub fn reset(&mut self, seed: Option<u64>) -> Observation {
        if let Some(seed) = seed {
            self.seed = seed;
            self.rng = Pcg32::seed_from_u64(seed);
        }
        let obstacles = if self.config.obstacles.regenerate_on_reset {
            generate_obstacles(&self.config, &mut self.rng)
        } else {
            std::mem::take(&mut self.world.obstacles)
        };
        self.world = populate(&self.config, obstacles, &mut self.rng);
        self.tick_count = 0;
        self.capture_count = 0;
        self.elapsed_time = 0.0;
        log::info!("Episode reset (seed {})", self.seed);
        self.observe()
    }

    /// Encode the current world for the caller
    pub fn observe(&self) -> Observation {
        self.config.observation.encode(&self.world)
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// Number of directions `step` expects in a full action
    pub fn action_arity(&self) -> usize {
        let mut arity = 0;
        if self.config.prey.behavior.accepts_action() {
            arity += self.world.prey_slots;
        }
        if self.config.hunters.behavior.accepts_action() {
            arity += self.world.hunter_slots;
        }
        arity
    }

    /// Index into the caller's action for this agent, if it takes one
    pub fn action_slot(&self, agent: &Agent) -> Option<usize> {
        let prey_controlled = self.config.prey.behavior.accepts_action();
        match agent.kind {
            AgentKind::Prey if prey_controlled => Some(agent.slot as usize),
            AgentKind::Hunter if self.config.hunters.behavior.accepts_action() => {
                let offset = if prey_controlled { self.world.prey_slots } else { 0 };
                Some(offset + agent.slot as usize)
            }
            _ => None,
        }
    }
}

fn generate_obstacles(config: &ScenarioConfig, rng: &mut Pcg32) -> Vec<Obstacle> {
    let spec = &config.obstacles;
    let span = config.bounds - 2.0 * spec.margin;
    (0..spec.count)
        .map(|_| Obstacle {
            pos: DVec2::splat(spec.margin) + DVec2::new(rng.random(), rng.random()) * span,
            size: spec.size,
        })
        .collect()
}

/// Fresh world with both populations drawn from `rng`
fn populate(config: &ScenarioConfig, obstacles: Vec<Obstacle>, rng: &mut Pcg32) -> World {
    let mut world = World::new(config.bounds);
    world.obstacles = obstacles;

    for kind in [AgentKind::Prey, AgentKind::Hunter] {
        let spec = config.spec(kind);
        for _ in 0..spec.count {
            let pos = match spec.spawn {
                Spawn::Uniform => {
                    let inset = DVec2::splat(spec.size / 2.0).min(config.bounds / 2.0);
                    let span = config.bounds - 2.0 * inset;
                    inset + DVec2::new(rng.random(), rng.random()) * span
                }
                Spawn::At { position } => position,
            };
            let vel = if spec.max_start_velocity > 0 {
                let max = spec.max_start_velocity;
                DVec2::new(
                    rng.random_range(-max..=max) as f64,
                    rng.random_range(-max..=max) as f64,
                )
            } else {
                DVec2::ZERO
            };
            let id = world.spawn(kind, pos, vel, spec.size, spec.speed);
            let patrol = PatrolState::random(rng, spec.behavior.patrol_ticks());
            if let Some(agent) = world.agents.iter_mut().find(|a| a.id == id) {
                agent.patrol = patrol;
            }
        }
    }

    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Action;

    #[test]
    fn test_new_populates_world() {
        let state = SimulationState::new(ScenarioConfig::arena()).unwrap();
        assert_eq!(state.world().hunter_count(), 3);
        assert_eq!(state.world().prey_count(), 15);
        assert_eq!(state.capture_count(), 0);

        // Prey first, then hunters
        let kinds: Vec<_> = state.world().agents().iter().map(|a| a.kind).collect();
        assert!(kinds.windows(2).all(|w| w[0] <= w[1]));

        for agent in state.world().agents() {
            let half = agent.size / 2.0;
            assert!(agent.pos.x - half >= 0.0 && agent.pos.x + half <= 800.0);
            assert!(agent.pos.y - half >= 0.0 && agent.pos.y + half <= 600.0);
            assert!(agent.vel.x.abs() <= 3.0 && agent.vel.y.abs() <= 3.0);
        }
    }

    #[test]
    fn test_new_rejects_empty_population() {
        let mut config = ScenarioConfig::survival();
        config.hunters.count = 0;
        assert!(SimulationState::new(config).is_err());
    }

    #[test]
    fn test_pursuit_hunter_starts_at_origin() {
        let state = SimulationState::from_preset(ScenarioPreset::Pursuit).unwrap();
        let hunter = state.world().hunters().next().unwrap();
        assert_eq!(hunter.pos, DVec2::ZERO);
        assert_eq!(state.world().obstacles().len(), 5);
        for obstacle in state.world().obstacles() {
            assert!(obstacle.pos.cmpge(DVec2::splat(0.05)).all());
            assert!(obstacle.pos.cmple(DVec2::splat(0.95)).all());
        }
    }

    #[test]
    fn test_reset_is_reproducible() {
        let mut a = SimulationState::new(ScenarioConfig::survival()).unwrap();
        let mut b = SimulationState::new(ScenarioConfig::survival().with_seed(99)).unwrap();
        assert_eq!(a.reset(Some(42)), b.reset(Some(42)));
        assert_eq!(a.world(), b.world());
    }

    #[test]
    fn test_reset_keeps_fixed_obstacles() {
        let mut state = SimulationState::from_preset(ScenarioPreset::Pursuit).unwrap();
        let before = state.world().obstacles().to_vec();
        state.reset(Some(7));
        assert_eq!(state.world().obstacles(), before.as_slice());
    }

    #[test]
    fn test_reset_regenerates_obstacles() {
        let mut state = SimulationState::from_preset(ScenarioPreset::Survival).unwrap();
        let before = state.world().obstacles().to_vec();
        state.reset(Some(12345));
        assert_ne!(state.world().obstacles(), before.as_slice());
    }

    #[test]
    fn test_grow_is_sign_preserving() {
        let mut hunter = Agent::new(
            1,
            0,
            AgentKind::Hunter,
            DVec2::new(100.0, 100.0),
            DVec2::new(2.0, -3.0),
            20.0,
            0.05,
        );
        hunter.grow(&GrowthRule {
            size_step: 2.0,
            velocity_step: 1.0,
            speed_step: 0.001,
            speed_cap: 0.1,
        });
        assert_eq!(hunter.size, 22.0);
        assert_eq!(hunter.vel, DVec2::new(3.0, -4.0));
        assert_eq!(hunter.pos, DVec2::new(100.0, 100.0));
        assert!((hunter.speed - 0.051).abs() < 1e-12);
    }

    #[test]
    fn test_with_world_rejects_mismatched_bounds() {
        let mut world = World::new(DVec2::new(10.0, 10.0));
        world.spawn(AgentKind::Prey, DVec2::new(5.0, 5.0), DVec2::ZERO, 0.025, 0.005);
        world.spawn(AgentKind::Hunter, DVec2::new(9.0, 9.0), DVec2::ZERO, 0.025, 0.01);
        assert!(matches!(
            SimulationState::with_world(ScenarioConfig::multi(), world),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_with_world_checks_framing_populations() {
        // Survival scores a single prey
        let mut world = World::new(DVec2::ONE);
        world.spawn(AgentKind::Prey, DVec2::new(0.2, 0.2), DVec2::ZERO, 0.025, 0.03);
        world.spawn(AgentKind::Prey, DVec2::new(0.8, 0.8), DVec2::ZERO, 0.025, 0.03);
        world.spawn(AgentKind::Hunter, DVec2::new(0.5, 0.5), DVec2::ZERO, 0.025, 0.01);
        assert!(matches!(
            SimulationState::with_world(ScenarioConfig::survival(), world),
            Err(SimError::InvalidConfig(_))
        ));

        // Nearest-prey framing follows a single hunter
        let mut world = World::new(DVec2::ONE);
        world.spawn(AgentKind::Prey, DVec2::new(0.2, 0.2), DVec2::ZERO, 0.025, 0.1);
        world.spawn(AgentKind::Hunter, DVec2::new(0.0, 0.0), DVec2::ZERO, 0.025, 0.1);
        world.spawn(AgentKind::Hunter, DVec2::new(1.0, 1.0), DVec2::ZERO, 0.025, 0.1);
        assert!(matches!(
            SimulationState::with_world(ScenarioConfig::pursuit(), world),
            Err(SimError::InvalidConfig(_))
        ));

        let mut world = World::new(DVec2::ONE);
        world.spawn(AgentKind::Prey, DVec2::new(0.2, 0.2), DVec2::ZERO, 0.025, 0.1);
        world.spawn(AgentKind::Hunter, DVec2::new(0.0, 0.0), DVec2::ZERO, 0.025, 0.1);
        assert!(SimulationState::with_world(ScenarioConfig::pursuit(), world).is_ok());
    }

    #[test]
    fn test_reset_clears_episode_counters() {
        let mut state = SimulationState::new(ScenarioConfig::arena()).unwrap();
        for _ in 0..400 {
            state.step(&Action::None).unwrap();
        }
        assert_eq!(state.tick_count(), 400);
        assert!(state.capture_count() > 0);
        assert!(state.elapsed_time() > 0.0);
        assert!(state.world().prey_count() < 15);

        state.reset(Some(1));
        assert_eq!(state.seed(), 1);
        assert_eq!(state.tick_count(), 0);
        assert_eq!(state.capture_count(), 0);
        assert_eq!(state.elapsed_time(), 0.0);
        assert_eq!(state.world().prey_count(), 15);
        assert_eq!(state.world().hunter_count(), 3);
    }

    #[test]
    fn test_action_arity_per_preset() {
        let arity = |preset| SimulationState::from_preset(preset).unwrap().action_arity();
        assert_eq!(arity(ScenarioPreset::Arena), 0);
        assert_eq!(arity(ScenarioPreset::Pursuit), 1);
        assert_eq!(arity(ScenarioPreset::Survival), 1);
        assert_eq!(arity(ScenarioPreset::Multi), 6);
    }

    #[test]
    fn test_action_slots() {
        let state = SimulationState::from_preset(ScenarioPreset::Multi).unwrap();
        assert_eq!(state.action_arity(), 6);
        let slots: Vec<_> = state
            .world()
            .agents()
            .iter()
            .filter_map(|a| state.action_slot(a))
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
    }
}
