//! Gravity Puzzle entry point
//!
//! Headless runner: loads levels and progress, then drives the game loop
//! with either a scripted input file or a seeded autopilot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use gravity_puzzle::sim::{GravityDirection, InputEvent, Outcome, SessionEvent, SessionPhase};
use gravity_puzzle::{DampingModel, Game, LevelSet, ProgressStore, Tuning, init_logging};

/// Bend gravity and air density to steer a ball into the goal
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Level catalog (JSON array of level records)
    #[arg(long)]
    levels: PathBuf,

    /// Progress file; progress is kept in memory when omitted
    #[arg(long)]
    save: Option<PathBuf>,

    /// Tuning overrides (JSON object, any subset of fields)
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Damping polarity: "air_density" or "retention"
    #[arg(long)]
    damping_model: Option<String>,

    /// Level to play; defaults to the highest unlocked level
    #[arg(long)]
    level: Option<u32>,

    /// Autopilot seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Replay a JSON list of `[tick, event]` pairs instead of the autopilot
    #[arg(long)]
    script: Option<PathBuf>,

    /// Give up after this many simulated ticks
    #[arg(long, default_value_t = 3600)]
    max_ticks: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Source of inputs for one frame
enum Driver {
    Script(std::iter::Peekable<std::vec::IntoIter<(u64, InputEvent)>>),
    Autopilot {
        rng: Pcg32,
        /// Ticks between decisions (one simulated second)
        period: u64,
    },
}

impl Driver {
    fn autopilot(seed: u64, sim_dt: f32) -> Self {
        let period = (1.0 / sim_dt as f64).round().max(1.0) as u64;
        Driver::Autopilot {
            rng: Pcg32::seed_from_u64(seed),
            period,
        }
    }

    fn inputs_for(&mut self, tick: u64) -> Vec<InputEvent> {
        match self {
            Driver::Script(pending) => {
                let mut inputs = Vec::new();
                while let Some((_, input)) = pending.next_if(|(at, _)| *at <= tick) {
                    inputs.push(input);
                }
                inputs
            }
            Driver::Autopilot { rng, period } => {
                if tick % *period != 0 {
                    return Vec::new();
                }
                let direction = GravityDirection::ALL[rng.random_range(0..GravityDirection::ALL.len())];
                let damping = if rng.random_bool(0.5) {
                    InputEvent::DampingUp
                } else {
                    InputEvent::DampingDown
                };
                vec![InputEvent::Gravity(direction), damping]
            }
        }
    }
}

fn load_tuning(args: &Args) -> Result<Tuning> {
    let mut tuning = match &args.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("Failed to load tuning from {}", path.display()))?,
        None => Tuning::default(),
    };

    if let Some(name) = &args.damping_model {
        tuning.damping_model = DampingModel::from_str(name)
            .ok_or_else(|| anyhow!("Unknown damping model '{name}'"))?;
    }
    tuning.validate()?;
    Ok(tuning)
}

fn load_script(path: &Path) -> Result<Vec<(u64, InputEvent)>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let mut script: Vec<(u64, InputEvent)> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse script {}", path.display()))?;
    script.sort_by_key(|(tick, _)| *tick);
    Ok(script)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let tuning = load_tuning(&args)?;
    let levels = LevelSet::load(&args.levels, &tuning)
        .with_context(|| format!("Failed to load levels from {}", args.levels.display()))?;
    let progress = match &args.save {
        Some(path) => ProgressStore::open(path),
        None => ProgressStore::in_memory(),
    };

    let level_id = match args.level {
        Some(id) => id,
        None => {
            let unlocked = progress.record().unlocked_levels;
            levels
                .iter()
                .map(|l| l.level_id)
                .filter(|id| *id <= unlocked)
                .max()
                .ok_or_else(|| anyhow!("No playable level"))?
        }
    };

    let mut driver = match &args.script {
        Some(path) => Driver::Script(load_script(path)?.into_iter().peekable()),
        None => Driver::autopilot(args.seed, tuning.sim_dt),
    };

    let mut game = Game::new(levels, progress, tuning);
    game.enter_level(level_id)?;
    log::info!("Playing level {level_id}");

    // One fixed step per frame keeps script ticks aligned with simulation ticks
    let frame_dt = game.tuning().sim_dt;
    let mut tick = 0;
    while tick < args.max_ticks {
        for input in driver.inputs_for(tick) {
            game.push_input(input);
        }
        for event in game.update(frame_dt) {
            log_event(&event);
        }
        tick += 1;

        let Some(snapshot) = game.snapshot() else {
            bail!("Session vanished mid-run");
        };
        if snapshot.phase.is_ended() {
            break;
        }
    }

    let snapshot = game.snapshot().ok_or_else(|| anyhow!("No session"))?;
    println!(
        "Level {} ({}): {} after {} ticks ({:.2}s), {} lives left",
        snapshot.level_id,
        snapshot.level_name,
        describe(snapshot.phase),
        snapshot.elapsed_ticks,
        snapshot.elapsed_secs,
        snapshot.lives,
    );
    println!(
        "Final position ({:.1}, {:.1}), gravity {:?}, damping {:.1}",
        snapshot.position.x,
        snapshot.position.y,
        snapshot.controls.direction,
        snapshot.controls.damping,
    );

    let record = game.progress().record();
    println!(
        "Progress: {} unlocked, {} completed, {} deaths, {:.1}s played",
        record.unlocked_levels,
        record.levels_completed(),
        record.total_deaths,
        record.total_time,
    );
    for (level, best) in &record.level_scores {
        println!("  level {level}: best {best}");
    }

    Ok(())
}

fn describe(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Ended(Outcome::Won) => "won",
        SessionPhase::Ended(Outcome::LostAllLives) => "lost all lives",
        _ => "out of time",
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::HazardHit { lives_left } => log::info!("Hazard hit, {lives_left} lives left"),
        SessionEvent::Respawned => log::debug!("Respawned"),
        SessionEvent::Completed { score, elapsed_secs, .. } => {
            log::info!("Goal reached in {elapsed_secs:.2}s, score {score}")
        }
        SessionEvent::GameOver { elapsed_secs, .. } => {
            log::info!("Game over after {elapsed_secs:.2}s")
        }
        SessionEvent::Restarted { level_id } => log::info!("Level {level_id} restarted"),
    }
}
