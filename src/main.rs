//! Wager Simulator
//!
//! Runs the win/loss engine or the crash curve from the command line to
//! inspect long-run behaviour.

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use wager_engine::{
    config::EngineConfig,
    games::{CrashEvent, CrashRoundDriver},
    logging::init_tracing,
    ConfigLoader, PlayMetrics, PlayRejection, PlayRequest, WinLossEngine,
};

#[derive(Parser, Debug)]
#[command(name = "wager-sim")]
#[command(about = "Win/loss engine simulator", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play repeatedly against one engine and report the totals
    Simulate {
        #[arg(long, default_value = "dice")]
        game: String,

        #[arg(long, default_value = "10000")]
        plays: u64,

        #[arg(long, default_value = "10")]
        stake: f64,

        #[arg(long, default_value = "1000")]
        balance: f64,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Print every play result as a JSON line
        #[arg(long)]
        json: bool,

        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },

    /// Check a stake against a game's bounds
    Bounds {
        #[arg(long)]
        game: String,

        #[arg(long)]
        stake: f64,
    },

    /// Run crash rounds and print the curve events
    Crash {
        #[arg(long, default_value = "3")]
        rounds: u64,

        #[arg(long)]
        seed: Option<u64>,

        /// Use millisecond timings instead of the configured ones
        #[arg(long)]
        fast: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;
    init_tracing(&config.logging);

    match args.command {
        Command::Simulate { game, plays, stake, balance, seed, json, metrics } => {
            simulate(&config, &game, plays, stake, balance, seed, json, metrics)?
        }
        Command::Bounds { game, stake } => check_bounds(&config, &game, stake)?,
        Command::Crash { rounds, seed, fast } => run_crash(&config, rounds, seed, fast).await?,
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    config: &EngineConfig,
    game: &str,
    plays: u64,
    stake: f64,
    starting_balance: f64,
    seed: Option<u64>,
    json: bool,
    show_metrics: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = PlayMetrics::new()?;
    let engine = match seed {
        Some(seed) => WinLossEngine::seeded(config, seed)?,
        None => WinLossEngine::new(config)?,
    };
    let mut engine = engine.with_metrics(metrics.clone());

    println!("🎲 Simulating {} plays of {} at stake {}", plays, game, stake);
    println!("============================================");

    let mut balance = starting_balance;
    for played in 0..plays {
        let result = engine.play(&PlayRequest::new(stake, balance, game));
        if json {
            println!("{}", serde_json::to_string(&result)?);
        }

        match &result.rejection {
            Some(PlayRejection::InsufficientBalance { .. }) => {
                println!("💸 Out of funds after {} plays", played);
                break;
            }
            Some(rejection) => return Err(rejection.to_string().into()),
            None => balance = result.resulting_balance,
        }
    }

    let snapshot = metrics.snapshot();
    println!("📊 Results");
    println!("   Plays settled:     {}", snapshot.wins + snapshot.losses);
    println!("   Wins / losses:     {} / {}", snapshot.wins, snapshot.losses);
    println!("   Win rate:          {:.2}%", snapshot.win_rate * 100.0);
    println!("   Total staked:      {:.2}", snapshot.total_staked);
    println!("   Total paid:        {:.2}", snapshot.total_paid);
    println!("   Return to player:  {:.2}%", snapshot.return_to_player * 100.0);
    println!("   Final balance:     {:.2} (started {:.2})", balance, starting_balance);

    let stats = engine.get_win_loss_stats();
    println!(
        "   Pattern remaining: {} wins, {} losses",
        stats.wins_remaining, stats.losses_remaining
    );

    if show_metrics {
        println!();
        print!("{}", metrics.render()?);
    }
    Ok(())
}

fn check_bounds(config: &EngineConfig, game: &str, stake: f64) -> Result<(), Box<dyn std::error::Error>> {
    let engine = WinLossEngine::new(config)?;
    let bounds = engine.bounds_table().bounds(game);
    let known = if engine.multiplier_table().is_known(game) { "" } else { " (default table)" };

    println!("🎯 {}{}: stake must be within {} - {}", game, known, bounds.min, bounds.max);
    match engine.validate_stake_bounds(stake, game) {
        Ok(()) => println!("✅ Stake {} accepted", stake),
        Err(rejection) => println!("❌ {}", rejection),
    }
    Ok(())
}

async fn run_crash(
    config: &EngineConfig,
    rounds: u64,
    seed: Option<u64>,
    fast: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let crash_config = if fast {
        EngineConfig::testing().crash
    } else {
        config.crash.clone()
    };

    let mut driver = CrashRoundDriver::new(&crash_config);
    if let Some(seed) = seed {
        driver = driver.with_seed(seed);
    }
    let mut events = driver.subscribe();

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CrashEvent::RoundStarted { round, round_id }) => {
                    println!("🚀 Round {} started ({})", round, round_id)
                }
                Ok(CrashEvent::Tick { multiplier, elapsed_ms, .. }) => {
                    tracing::trace!(multiplier, elapsed_ms, "tick")
                }
                Ok(CrashEvent::Crashed { crash_point, elapsed_ms, .. }) => {
                    println!("💥 Crashed at {:.2}x after {}ms", crash_point, elapsed_ms)
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event printer lagged; skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let completed = driver.run_rounds(Some(rounds)).await?;
    drop(driver);
    printer.await?;

    println!("✅ {} crash rounds completed", completed);
    Ok(())
}
