use anyhow::Result;
use clap::Parser;
use infection_common::{
    ConfigurationError, InitialConditions, PopulationConfig, SimulationConfig, SpreadConfig,
    TimingConfig, DEFAULT_COLUMNS,
};
use infection_engine::{JsonLinesObserver, SimulationSession};
use log::{debug, info, warn};
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Runs an infection-spread simulation and prints every state change as a JSON line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of cells in the population
    #[arg(short, long)]
    population: Option<usize>,

    /// Maximum neighbor candidates each sick cell considers per tick
    #[arg(short, long)]
    spread_factor: Option<usize>,

    /// Seconds between ticks
    #[arg(short, long)]
    tick_interval: Option<f64>,

    /// Grid columns
    #[arg(long)]
    columns: Option<usize>,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks instead of at saturation
    #[arg(long)]
    ticks: Option<u64>,

    /// Cells to infect before the clock starts
    #[arg(long, num_args = 1..)]
    infect: Vec<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = build_config(&args)?;
    let params = config.sim_params()?;
    debug!("Simulation parameters: {:#?}", params);
    info!("Using {} Rayon threads.", rayon::current_num_threads());

    let max_ticks = config.timing.max_ticks;
    if let Some(reason) = endless_run_reason(&config) {
        warn!("{} and no tick limit is set; the run will not end on its own.", reason);
    }

    let mut session = SimulationSession::new(params, JsonLinesObserver::new(io::stdout()))?;
    if let Some(limit) = max_ticks {
        session = session.with_tick_limit(limit);
    }
    let engine = session.engine();
    let layout = engine.layout();
    info!("Population laid out on {} rows of {} columns.", layout.rows(), layout.columns());
    let initial = engine.toggle_cells(&config.initial_conditions.initial_sick);
    info!("Seeded {} sick cells.", initial.len());

    let started = Instant::now();
    session.start()?;
    let poll = session.clock().interval().min(Duration::from_millis(50));
    loop {
        thread::sleep(poll);
        if engine.is_saturated() {
            info!("Every cell is sick after {} ticks.", engine.tick_count());
            break;
        }
        if session.has_finished() {
            info!("Reached the {} tick limit.", engine.tick_count());
            break;
        }
    }

    let counts = session.end();
    info!(
        "Simulation finished in {:.3} seconds | healthy {} | sick {}",
        started.elapsed().as_secs_f64(),
        counts.healthy,
        counts.sick
    );
    Ok(())
}

/// Why a run without a tick limit can never saturate, if it can't.
fn endless_run_reason(config: &SimulationConfig) -> Option<&'static str> {
    if config.timing.max_ticks.is_some() {
        None
    } else if config.spread.infection_spread_factor == 0 {
        Some("Spread factor is 0")
    } else if config.initial_conditions.initial_sick.is_empty() {
        Some("No cell starts sick")
    } else {
        None
    }
}

/// Merges the optional config file with command-line overrides and validates the result.
fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig {
            population: PopulationConfig {
                size: args
                    .population
                    .ok_or(ConfigurationError::Missing("population"))?,
                columns: DEFAULT_COLUMNS,
            },
            spread: SpreadConfig {
                infection_spread_factor: args
                    .spread_factor
                    .ok_or(ConfigurationError::Missing("spread-factor"))?,
                seed: None,
            },
            timing: TimingConfig {
                tick_interval_secs: args
                    .tick_interval
                    .ok_or(ConfigurationError::Missing("tick-interval"))?,
                max_ticks: None,
            },
            initial_conditions: InitialConditions::default(),
        },
    };

    if let Some(size) = args.population {
        config.population.size = size;
    }
    if let Some(columns) = args.columns {
        config.population.columns = columns;
    }
    if let Some(factor) = args.spread_factor {
        config.spread.infection_spread_factor = factor;
    }
    if let Some(seed) = args.seed {
        config.spread.seed = Some(seed);
    }
    if let Some(secs) = args.tick_interval {
        config.timing.tick_interval_secs = secs;
    }
    if let Some(ticks) = args.ticks {
        config.timing.max_ticks = Some(ticks);
    }
    if !args.infect.is_empty() {
        config.initial_conditions.initial_sick = args.infect.clone();
    }

    config.validate()?;
    Ok(config)
}
