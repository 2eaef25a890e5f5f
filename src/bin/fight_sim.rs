//! Headless Fight Simulator
//!
//! Runs seeded autoplay batches of a fresh character against generated
//! monsters and prints a JSON summary. Batches run in parallel, one seed
//! per batch, so a given `--seed` always reproduces the same report.

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tidebound::ai::autoplay::{run_batch, AutoplaySummary};
use tidebound::combat::machine::{CombatContext, FightOutcome};
use tidebound::combat::variant::FightVariant;
use tidebound::content::{ContentGenerator, StandardContent};
use tidebound::core::error::Result;
use tidebound::core::EngineConfig;
use tidebound::world::character::{scaled_xp, xp_to_next_level};

/// Headless Fight Simulator - autoplay balance runs
#[derive(Parser, Debug)]
#[command(name = "fight_sim")]
#[command(about = "Run seeded autoplay batches and output a JSON summary")]
struct Args {
    /// Starting character level
    #[arg(long, default_value_t = 1)]
    level: i32,

    /// Highest monster level generated
    #[arg(long, default_value_t = 3)]
    monster_level: i32,

    /// Highest monster rank generated
    #[arg(long, default_value_t = 1)]
    monster_rank: i32,

    /// Fights per batch
    #[arg(long, default_value_t = 50)]
    fights: u32,

    /// Number of independent batches
    #[arg(long, default_value_t = 8)]
    batches: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct BatchResult {
    seed: u64,
    final_level: i32,
    summary: AutoplaySummary,
}

#[derive(Serialize)]
struct SimReport {
    seed: u64,
    level: i32,
    monster_level: i32,
    fights: u32,
    wins: u32,
    deaths: u32,
    fled: u32,
    timeouts: u32,
    win_rate: f64,
    batches: Vec<BatchResult>,
}

fn run_one(content: &StandardContent, config: &EngineConfig, args: &Args, seed: u64) -> BatchResult {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut player = content.character(&mut rng, "Simulant");
    while player.level() < args.level {
        let needed = xp_to_next_level(player.level()) - player.experience;
        player.gain_experience(&mut rng, needed.max(1));
    }
    player.refresh();

    let summary = run_batch(
        &mut rng,
        &mut player,
        args.fights,
        config,
        |rng, _| {
            let monster = content.monster(rng, args.monster_level, args.monster_rank);
            Some(CombatContext::new(monster, FightVariant::Hunt { remaining: 0 }))
        },
        |rng, player, ctx, outcome| {
            let xp = match outcome {
                FightOutcome::Won => {
                    let xp = scaled_xp(player.level(), ctx.opponent.level());
                    player.gain_experience(rng, xp);
                    xp
                }
                FightOutcome::Lost | FightOutcome::TimedOut => {
                    player.resurrect();
                    0
                }
                FightOutcome::Fled | FightOutcome::Ongoing => 0,
            };
            player.refresh();
            xp
        },
    );

    BatchResult {
        seed,
        final_level: player.level(),
        summary,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let content = StandardContent::builtin()?;
    let config = EngineConfig::default();

    let batches: Vec<BatchResult> = (0..args.batches)
        .into_par_iter()
        .map(|i| run_one(&content, &config, &args, seed ^ i))
        .collect();

    let mut total = AutoplaySummary::default();
    for batch in &batches {
        total.fights += batch.summary.fights;
        total.wins += batch.summary.wins;
        total.deaths += batch.summary.deaths;
        total.fled += batch.summary.fled;
        total.timeouts += batch.summary.timeouts;
        total.xp_gained += batch.summary.xp_gained;
    }

    let report = SimReport {
        seed,
        level: args.level,
        monster_level: args.monster_level,
        fights: total.fights,
        wins: total.wins,
        deaths: total.deaths,
        fled: total.fled,
        timeouts: total.timeouts,
        win_rate: total.win_rate(),
        batches,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}
