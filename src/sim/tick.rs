//! Fixed timestep simulation tick
//!
//! One call advances the world by exactly one tick:
//! speed-up timer, decisions, movement, blocking, bounds, captures, growth.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::behavior::{Action, Direction, Snapshot, steer};
use super::collision::near_obstacle;
use super::observation::Observation;
use super::reward::Reward;
use super::state::{AgentKind, SimulationState, World};
use crate::error::SimError;

/// Slack for the accumulated tick time reaching the speed-up interval
const TIMER_EPSILON: f64 = 1e-9;

/// One hunter/prey contact that removed the prey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub hunter_id: u32,
    pub prey_id: u32,
}

/// Side information returned with every step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub tick: u64,
    pub capture_count: u64,
    /// Contacts resolved this tick; a prey may appear under several hunters
    pub captures: Vec<CaptureEvent>,
    /// Prey removed this tick
    pub removed: usize,
    pub speedup_fired: bool,
}

/// Everything a caller observes after one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: Reward,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

impl SimulationState {
    /// Advance one tick. See [`step`].
    pub fn step(&mut self, action: &Action) -> Result<StepResult, SimError> {
        step(self, action)
    }
}

/// Advance the simulation by one tick
pub fn step(state: &mut SimulationState, action: &Action) -> Result<StepResult, SimError> {
    // Nothing left to hunt: report the end without touching the state
    if state.world.prey_count() == 0 {
        return Ok(StepResult {
            observation: state.observe(),
            reward: Reward::default(),
            terminated: true,
            truncated: false,
            info: StepInfo {
                tick: state.tick_count,
                capture_count: state.capture_count,
                ..Default::default()
            },
        });
    }

    let directions = resolve_action(state, action)?;

    state.tick_count += 1;
    let speedup_fired = advance_speedup_timer(state);

    let snapshot = Snapshot::capture(&state.world.agents);
    move_agents(state, &snapshot, &directions);

    let captures = detect_captures(state);
    let signal = state.config.reward.compute(
        &state.world,
        !captures.is_empty(),
        state.config.obstacles.block_threshold,
    );
    let removed = apply_captures(state, &captures);

    let terminated = signal.prey_exhausted
        || state.world.prey_count() == 0
        || (state.config.terminate_on_capture && removed > 0);
    let truncated = !terminated
        && state
            .config
            .max_ticks
            .is_some_and(|max| state.tick_count >= max);

    Ok(StepResult {
        observation: state.observe(),
        reward: signal.reward,
        terminated,
        truncated,
        info: StepInfo {
            tick: state.tick_count,
            capture_count: state.capture_count,
            captures,
            removed,
            speedup_fired,
        },
    })
}

/// Map the caller's action onto agents, in world order
fn resolve_action(
    state: &SimulationState,
    action: &Action,
) -> Result<Vec<Option<Direction>>, SimError> {
    let arity = state.action_arity();
    let given = action.directions();
    match action {
        Action::None => {}
        Action::Single(_) if arity != 1 => {
            return Err(SimError::InvalidAction(format!(
                "single direction given but scenario expects {arity}"
            )));
        }
        Action::Multi(_) if given.len() != arity => {
            return Err(SimError::InvalidAction(format!(
                "{} directions given but scenario expects {arity}",
                given.len()
            )));
        }
        _ => {}
    }

    Ok(state
        .world
        .agents
        .iter()
        .map(|agent| {
            state
                .action_slot(agent)
                .and_then(|slot| given.get(slot).copied())
        })
        .collect())
}

/// Accumulate simulated time and accelerate prey once the interval elapses
fn advance_speedup_timer(state: &mut SimulationState) -> bool {
    state.elapsed_time += state.config.tick_seconds;
    let Some(speedup) = state.config.prey_speedup else {
        return false;
    };
    if state.elapsed_time + TIMER_EPSILON < speedup.interval_secs {
        return false;
    }

    for prey in state
        .world
        .agents
        .iter_mut()
        .filter(|a| a.alive && a.kind == AgentKind::Prey)
    {
        prey.speed_up(speedup.step);
    }
    state.elapsed_time = 0.0;
    log::info!("Prey speed-up at tick {}", state.tick_count);
    true
}

fn move_agents(state: &mut SimulationState, snapshot: &Snapshot, directions: &[Option<Direction>]) {
    let config = &state.config;
    let World {
        bounds,
        obstacles,
        agents,
        ..
    } = &mut state.world;
    let rng = &mut state.rng;

    for (agent, action) in agents.iter_mut().zip(directions.iter().copied()) {
        let behavior = config.spec(agent.kind).behavior;
        let displacement = steer(agent, &behavior, action, snapshot, rng);
        let candidate = agent.pos + displacement;

        if config.obstacles.blocks(agent.kind)
            && near_obstacle(candidate, obstacles, config.obstacles.block_threshold)
        {
            log::trace!("Agent {} blocked by obstacle", agent.id);
        } else {
            agent.pos = candidate;
        }

        if config.boundary.enforce(agent, *bounds) {
            log::trace!("Agent {} held inside bounds by {:?}", agent.id, config.boundary);
        }
    }
}

/// Every hunter/prey contact, judged against one post-movement snapshot
fn detect_captures(state: &SimulationState) -> Vec<CaptureEvent> {
    let predicate = state.config.collision;
    let mut events = Vec::new();
    for hunter in state.world.hunters() {
        for prey in state.world.prey() {
            if predicate.collides(hunter, prey) {
                events.push(CaptureEvent {
                    hunter_id: hunter.id,
                    prey_id: prey.id,
                });
            }
        }
    }
    events
}

/// Remove captured prey as one batch and grow each capturing hunter once
fn apply_captures(state: &mut SimulationState, events: &[CaptureEvent]) -> usize {
    if events.is_empty() {
        return 0;
    }
    let captured: BTreeSet<u32> = events.iter().map(|e| e.prey_id).collect();
    let growers: BTreeSet<u32> = events.iter().map(|e| e.hunter_id).collect();
    let growth = state.config.growth;

    for agent in state.world.agents.iter_mut() {
        match agent.kind {
            AgentKind::Prey if captured.contains(&agent.id) => agent.alive = false,
            AgentKind::Hunter if growers.contains(&agent.id) => {
                if let Some(rule) = &growth {
                    agent.grow(rule);
                }
            }
            _ => {}
        }
    }

    let removed = state.world.remove_dead();
    state.capture_count += removed as u64;
    log::debug!(
        "Tick {}: {} hunter(s) caught {} prey (total {})",
        state.tick_count,
        growers.len(),
        removed,
        state.capture_count
    );
    removed
}
