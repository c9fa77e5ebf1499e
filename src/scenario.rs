//! Scenario configuration and presets
//!
//! A scenario fixes every constant of an episode: population sizes, speeds,
//! the collision predicate, the bounds rule, and the reward framing.
//! Configs are plain serde data so they can be loaded from JSON; unknown
//! variant tags are rejected while parsing, before any simulation runs.

use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::sim::{
    AgentKind, Behavior, BoundaryRule, CollisionPredicate, ObservationEncoding, RewardFraming,
};

/// Named scenario presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScenarioPreset {
    /// Pixel arena: drifting squares, bounding-box captures, edge bounce
    #[default]
    Arena,
    /// One externally steered hunter chasing wandering prey among obstacles
    Pursuit,
    /// One evading prey against patrolling/pursuing hunters
    Survival,
    /// Three prey and three hunters, all externally steered
    Multi,
}

impl ScenarioPreset {
    pub const ALL: [ScenarioPreset; 4] = [
        ScenarioPreset::Arena,
        ScenarioPreset::Pursuit,
        ScenarioPreset::Survival,
        ScenarioPreset::Multi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioPreset::Arena => "arena",
            ScenarioPreset::Pursuit => "pursuit",
            ScenarioPreset::Survival => "survival",
            ScenarioPreset::Multi => "multi",
        }
    }

    /// Build the full configuration for this preset
    pub fn config(&self) -> ScenarioConfig {
        match self {
            ScenarioPreset::Arena => ScenarioConfig::arena(),
            ScenarioPreset::Pursuit => ScenarioConfig::pursuit(),
            ScenarioPreset::Survival => ScenarioConfig::survival(),
            ScenarioPreset::Multi => ScenarioConfig::multi(),
        }
    }
}

impl FromStr for ScenarioPreset {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arena" | "game" => Ok(ScenarioPreset::Arena),
            "pursuit" | "hunter" => Ok(ScenarioPreset::Pursuit),
            "survival" | "prey" => Ok(ScenarioPreset::Survival),
            "multi" | "multi-agent" => Ok(ScenarioPreset::Multi),
            _ => Err(SimError::UnknownPreset(s.to_string())),
        }
    }
}

/// Where agents of a population appear on reset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Spawn {
    /// Uniform over the bounds, inset by half the agent size
    Uniform,
    /// Every agent of the population starts at this point
    At { position: DVec2 },
}

/// Per-population parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub count: usize,
    /// Side of the agent's square extent (world units)
    pub size: f64,
    /// Distance covered per tick by directed moves
    pub speed: f64,
    /// Initial per-axis velocity drawn from the integers in `[-n, n]`; 0 = at rest
    #[serde(default)]
    pub max_start_velocity: i32,
    pub spawn: Spawn,
    pub behavior: Behavior,
}

/// Obstacle generation and blocking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub count: usize,
    pub size: f64,
    /// Obstacles are placed at least this far from every edge
    pub margin: f64,
    /// A candidate position closer than this to an obstacle center is rejected
    pub block_threshold: f64,
    pub blocks_hunters: bool,
    pub blocks_prey: bool,
    /// Draw a new obstacle layout on every reset (otherwise fixed at construction)
    pub regenerate_on_reset: bool,
}

impl ObstacleSpec {
    pub fn none() -> Self {
        Self {
            count: 0,
            size: 0.0,
            margin: 0.0,
            block_threshold: OBSTACLE_THRESHOLD,
            blocks_hunters: false,
            blocks_prey: false,
            regenerate_on_reset: true,
        }
    }

    pub fn blocks(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Hunter => self.blocks_hunters,
            AgentKind::Prey => self.blocks_prey,
        }
    }
}

/// Hunter transition applied once per tick in which it captured prey
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthRule {
    pub size_step: f64,
    /// Added to each velocity axis away from zero
    pub velocity_step: f64,
    pub speed_step: f64,
    /// Upper bound for the directed-move speed (never lowers a faster agent)
    pub speed_cap: f64,
}

/// Time-triggered prey acceleration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicSpeedup {
    pub interval_secs: f64,
    pub step: f64,
}

/// Complete, immutable description of an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// World width and height
    pub bounds: DVec2,
    pub hunters: AgentSpec,
    pub prey: AgentSpec,
    pub obstacles: ObstacleSpec,
    pub collision: CollisionPredicate,
    pub boundary: BoundaryRule,
    #[serde(default)]
    pub growth: Option<GrowthRule>,
    #[serde(default)]
    pub prey_speedup: Option<PeriodicSpeedup>,
    pub reward: RewardFraming,
    pub observation: ObservationEncoding,
    /// End the episode in the tick of the first capture
    pub terminate_on_capture: bool,
    /// Truncate after this many ticks
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Simulated seconds per tick
    pub tick_seconds: f64,
    /// Seed used at construction
    #[serde(default)]
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::arena()
    }
}

impl ScenarioConfig {
    /// 800x600 pixel arena: 3 hunters, 15 prey, bounce off the edges
    pub fn arena() -> Self {
        let squares = |count| AgentSpec {
            count,
            size: AGENT_SIZE,
            speed: 0.0,
            max_start_velocity: ARENA_MAX_START_SPEED,
            spawn: Spawn::Uniform,
            behavior: Behavior::Drift,
        };

        Self {
            bounds: DVec2::new(ARENA_WIDTH, ARENA_HEIGHT),
            hunters: squares(3),
            prey: squares(15),
            obstacles: ObstacleSpec::none(),
            collision: CollisionPredicate::BoundingBox,
            boundary: BoundaryRule::Reflect,
            growth: Some(GrowthRule {
                size_step: HUNTER_GROWTH,
                velocity_step: HUNTER_SPEEDUP,
                speed_step: 0.0,
                speed_cap: 0.0,
            }),
            prey_speedup: Some(PeriodicSpeedup {
                interval_secs: PREY_SPEEDUP_INTERVAL_SECS,
                step: PREY_SPEEDUP_STEP,
            }),
            reward: RewardFraming::ZeroSum,
            observation: ObservationEncoding::Positions { signed: false },
            terminate_on_capture: false,
            max_ticks: None,
            tick_seconds: SIM_DT,
            seed: 0,
        }
    }

    /// Unit square: one steered hunter from the origin, 5 wandering prey, 5 obstacles
    pub fn pursuit() -> Self {
        Self {
            bounds: DVec2::ONE,
            hunters: AgentSpec {
                count: 1,
                size: AGENT_SIZE / ARENA_WIDTH,
                speed: 0.1,
                max_start_velocity: 0,
                spawn: Spawn::At {
                    position: DVec2::ZERO,
                },
                behavior: Behavior::External,
            },
            prey: AgentSpec {
                count: 5,
                size: AGENT_SIZE / ARENA_WIDTH,
                speed: 0.1,
                max_start_velocity: 0,
                spawn: Spawn::Uniform,
                behavior: Behavior::Wander,
            },
            obstacles: ObstacleSpec {
                count: 5,
                size: 40.0 / ARENA_WIDTH,
                margin: 40.0 / ARENA_WIDTH,
                block_threshold: OBSTACLE_THRESHOLD,
                blocks_hunters: true,
                blocks_prey: true,
                regenerate_on_reset: false,
            },
            collision: CollisionPredicate::Distance { threshold: 0.1 },
            boundary: BoundaryRule::Clamp,
            growth: Some(GrowthRule {
                size_step: 0.0,
                velocity_step: 0.0,
                speed_step: 0.001,
                speed_cap: 0.1,
            }),
            prey_speedup: None,
            reward: RewardFraming::NearestPrey,
            observation: ObservationEncoding::NearestPreyOffset,
            terminate_on_capture: true,
            max_ticks: None,
            tick_seconds: SIM_DT,
            seed: 0,
        }
    }

    /// Unit square: one evading prey, 5 hunters patrolling until they sense it
    pub fn survival() -> Self {
        Self {
            bounds: DVec2::ONE,
            hunters: AgentSpec {
                count: 5,
                size: AGENT_SIZE / ARENA_WIDTH,
                speed: 0.01,
                max_start_velocity: 0,
                spawn: Spawn::Uniform,
                behavior: Behavior::Pursue {
                    radius: 0.4,
                    patrol_ticks: PATROL_TICKS,
                },
            },
            prey: AgentSpec {
                count: 1,
                size: AGENT_SIZE / ARENA_WIDTH,
                speed: 0.03,
                max_start_velocity: 0,
                spawn: Spawn::Uniform,
                behavior: Behavior::Evade {
                    radius: 0.2,
                    patrol_ticks: PATROL_TICKS,
                },
            },
            obstacles: ObstacleSpec {
                count: 2,
                size: AGENT_SIZE / ARENA_WIDTH,
                margin: 0.0,
                block_threshold: OBSTACLE_THRESHOLD,
                blocks_hunters: true,
                blocks_prey: false,
                regenerate_on_reset: true,
            },
            collision: CollisionPredicate::Distance {
                threshold: CAPTURE_THRESHOLD,
            },
            boundary: BoundaryRule::Clamp,
            growth: None,
            prey_speedup: None,
            reward: RewardFraming::Survival,
            observation: ObservationEncoding::Positions { signed: false },
            terminate_on_capture: true,
            max_ticks: None,
            tick_seconds: SIM_DT,
            seed: 0,
        }
    }

    /// Unit square: 3 prey and 3 hunters, every agent steered by the caller
    pub fn multi() -> Self {
        let steered = |count, speed| AgentSpec {
            count,
            size: AGENT_SIZE / ARENA_WIDTH,
            speed,
            max_start_velocity: 0,
            spawn: Spawn::Uniform,
            behavior: Behavior::External,
        };

        Self {
            bounds: DVec2::ONE,
            hunters: steered(3, 0.01),
            prey: steered(3, 0.005),
            obstacles: ObstacleSpec::none(),
            collision: CollisionPredicate::Distance {
                threshold: CAPTURE_THRESHOLD,
            },
            boundary: BoundaryRule::Clamp,
            growth: None,
            prey_speedup: None,
            reward: RewardFraming::ZeroSum,
            observation: ObservationEncoding::Positions { signed: false },
            terminate_on_capture: true,
            max_ticks: None,
            tick_seconds: SIM_DT,
            seed: 0,
        }
    }

    /// Same scenario with a different construction seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn spec(&self, kind: AgentKind) -> &AgentSpec {
        match kind {
            AgentKind::Hunter => &self.hunters,
            AgentKind::Prey => &self.prey,
        }
    }

    /// Parse and validate a JSON scenario
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: ScenarioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.bounds.x > 0.0 && self.bounds.y > 0.0 && self.bounds.is_finite()) {
            return Err(SimError::InvalidConfig("bounds must be positive and finite"));
        }
        if self.hunters.count == 0 {
            return Err(SimError::InvalidConfig("at least one hunter is required"));
        }
        if self.prey.count == 0 {
            return Err(SimError::InvalidConfig("at least one prey is required"));
        }
        for spec in [&self.hunters, &self.prey] {
            if !(spec.size >= 0.0 && spec.size.is_finite()) {
                return Err(SimError::InvalidConfig("agent size must be non-negative"));
            }
            if !(spec.speed >= 0.0 && spec.speed.is_finite()) {
                return Err(SimError::InvalidConfig("agent speed must be non-negative"));
            }
            if spec.max_start_velocity < 0 {
                return Err(SimError::InvalidConfig(
                    "max_start_velocity must be non-negative",
                ));
            }
            if let Spawn::At { position } = spec.spawn {
                if position.cmplt(DVec2::ZERO).any() || position.cmpgt(self.bounds).any() {
                    return Err(SimError::InvalidConfig("fixed spawn point lies outside bounds"));
                }
            }
            spec.behavior.validate()?;
            if self.boundary == BoundaryRule::Reflect && spec.behavior != Behavior::Drift {
                return Err(SimError::InvalidConfig(
                    "reflecting bounds require drifting agents",
                ));
            }
        }
        if let CollisionPredicate::Distance { threshold } = self.collision {
            if !(threshold > 0.0 && threshold.is_finite()) {
                return Err(SimError::InvalidConfig("capture threshold must be positive"));
            }
        }
        let obstacles = &self.obstacles;
        if obstacles.size < 0.0 || obstacles.margin < 0.0 || obstacles.block_threshold < 0.0 {
            return Err(SimError::InvalidConfig(
                "obstacle size, margin and threshold must be non-negative",
            ));
        }
        if obstacles.count > 0 && obstacles.margin * 2.0 >= self.bounds.min_element() {
            return Err(SimError::InvalidConfig("obstacle margin leaves no room"));
        }
        if let Some(growth) = &self.growth {
            if growth.size_step < 0.0 || growth.velocity_step < 0.0 || growth.speed_step < 0.0 {
                return Err(SimError::InvalidConfig("growth steps must be non-negative"));
            }
        }
        if let Some(speedup) = &self.prey_speedup {
            if !(speedup.interval_secs > 0.0) || speedup.step < 0.0 {
                return Err(SimError::InvalidConfig(
                    "speed-up needs a positive interval and non-negative step",
                ));
            }
        }
        if !(self.tick_seconds > 0.0 && self.tick_seconds.is_finite()) {
            return Err(SimError::InvalidConfig("tick_seconds must be positive"));
        }
        if self.max_ticks == Some(0) {
            return Err(SimError::InvalidConfig("max_ticks must be at least 1"));
        }
        self.check_populations(self.hunters.count, self.prey.count)
    }

    /// Population sizes the reward and observation framings can score
    pub(crate) fn check_populations(&self, hunters: usize, prey: usize) -> Result<(), SimError> {
        if (self.reward == RewardFraming::NearestPrey
            || self.observation == ObservationEncoding::NearestPreyOffset)
            && hunters != 1
        {
            return Err(SimError::InvalidConfig(
                "nearest-prey framing needs exactly one hunter",
            ));
        }
        if self.reward == RewardFraming::Survival && prey != 1 {
            return Err(SimError::InvalidConfig(
                "survival framing needs exactly one prey",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for preset in ScenarioPreset::ALL {
            let config = preset.config();
            assert!(config.validate().is_ok(), "{} should validate", preset.as_str());
        }
    }

    #[test]
    fn test_preset_names_round_trip() {
        for preset in ScenarioPreset::ALL {
            assert_eq!(preset.as_str().parse::<ScenarioPreset>().unwrap(), preset);
        }
        assert!(matches!(
            "tetris".parse::<ScenarioPreset>(),
            Err(SimError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_zero_population_rejected() {
        let mut config = ScenarioConfig::arena();
        config.hunters.count = 0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = ScenarioConfig::multi();
        config.prey.count = 0;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_reflect_requires_drift() {
        let mut config = ScenarioConfig::multi();
        config.boundary = BoundaryRule::Reflect;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_framing_arity_checked() {
        let mut config = ScenarioConfig::pursuit();
        config.hunters.count = 2;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::survival();
        config.prey.count = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = ScenarioConfig::survival().with_seed(7);
        let json = config.to_json().unwrap();
        let parsed = ScenarioConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_predicate_tag_rejected() {
        let json = ScenarioConfig::multi()
            .to_json()
            .unwrap()
            .replace("\"distance\"", "\"hexagonal\"");
        assert!(matches!(
            ScenarioConfig::from_json(&json),
            Err(SimError::ConfigParse(_))
        ));
    }
}
