//! Hunter/Prey headless runner
//!
//! Usage: `hunter-prey [preset | scenario.json] [seed] [max-ticks]`
//!
//! Runs one episode with the greedy controller driving every agent that
//! takes caller input and prints a summary line.

use std::error::Error;

use hunter_prey::sim::{Decide, GreedyPursuer, SimulationState};
use hunter_prey::{ScenarioConfig, ScenarioPreset};

const DEFAULT_MAX_TICKS: u64 = 3_600;

fn load_config(arg: Option<&str>) -> Result<ScenarioConfig, Box<dyn Error>> {
    match arg {
        Some(path) if path.ends_with(".json") => {
            let text = std::fs::read_to_string(path)?;
            Ok(ScenarioConfig::from_json(&text)?)
        }
        Some(name) => Ok(name.parse::<ScenarioPreset>()?.config()),
        None => Ok(ScenarioPreset::default().config()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = load_config(args.first().map(String::as_str))?;
    if let Some(seed) = args.get(1) {
        config = config.with_seed(seed.parse()?);
    }
    let max_ticks = match args.get(2) {
        Some(ticks) => ticks.parse()?,
        None => DEFAULT_MAX_TICKS,
    };

    let mut state = SimulationState::new(config)?;
    log::info!(
        "Running up to {} ticks, action arity {}",
        max_ticks,
        state.action_arity()
    );

    let mut controller = GreedyPursuer;
    let mut total_reward = 0.0;
    let mut ended = "tick limit";
    while state.tick_count() < max_ticks {
        let action = controller.decide(&state);
        let result = state.step(&action)?;
        total_reward += result.reward.total;
        if result.info.removed > 0 {
            log::info!(
                "Tick {}: {} prey caught, {} left",
                result.info.tick,
                result.info.removed,
                state.world().prey_count()
            );
        }
        if result.terminated {
            ended = "terminated";
            break;
        }
        if result.truncated {
            ended = "truncated";
            break;
        }
    }

    println!(
        "{} after {} ticks: {} captures, {} prey left, total reward {:.3} (seed {})",
        ended,
        state.tick_count(),
        state.capture_count(),
        state.world().prey_count(),
        total_reward,
        state.seed()
    );
    Ok(())
}
