//! `shardctl`: drive the shard controller from the command line.
//!
//! # Usage
//!
//! ```text
//! shardctl replay steps.toml                   # apply a command script
//! shardctl replay steps.toml --n-shards 16     # override the shard count
//! shardctl -c shardctl.toml replay steps.toml  # with a config file
//! shardctl simulate --steps 1000 --seed 42     # random two-replica run
//! ```

mod config;
mod script;
mod simulate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shardctl_ctrler::ShardCtrler;
use shardctl_types::{Command, Config, Reply};
use tracing::info;

use config::CliConfig;
use script::Script;
use simulate::SimParams;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "shardctl",
    version,
    about = "Replay and simulate shard controller command streams"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a TOML command script and print every configuration it produces.
    Replay {
        /// Script file with `[[step]]` entries.
        script: PathBuf,

        /// Override the shard count from the config file and the script.
        #[arg(short, long, env = "SHARDCTL_N_SHARDS")]
        n_shards: Option<usize>,
    },

    /// Apply a seeded random command sequence to two replicas and compare.
    Simulate {
        /// Number of commands to apply.
        #[arg(short, long, default_value = "1000")]
        steps: usize,

        /// RNG seed.
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Largest group id the simulation draws.
        #[arg(short = 'g', long, default_value = "8")]
        max_groups: u64,

        /// Override the shard count from the config file.
        #[arg(short, long, env = "SHARDCTL_N_SHARDS")]
        n_shards: Option<usize>,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Replay { script, n_shards } => cmd_replay(&mut config, &script, n_shards),
        Commands::Simulate {
            steps,
            seed,
            max_groups,
            n_shards,
        } => {
            // CLI args override config file values.
            if let Some(n) = n_shards {
                config.controller.n_shards = Some(n);
            }
            cmd_simulate(&config, steps, seed, max_groups)
        }
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// -----------------------------------------------------------------------
// shardctl replay
// -----------------------------------------------------------------------

fn cmd_replay(config: &mut CliConfig, path: &Path, n_shards: Option<usize>) -> Result<()> {
    let script = Script::load(path)?;

    // Flag beats script beats config file.
    if let Some(n) = n_shards.or(script.n_shards) {
        config.controller.n_shards = Some(n);
    }
    let mut ctrler = ShardCtrler::new(config.n_shards()).context("invalid shard count")?;
    info!(
        script = %path.display(),
        n_shards = ctrler.n_shards(),
        steps = script.steps.len(),
        "replaying script"
    );

    print_config(&ctrler, ctrler.log().latest());

    for (index, step) in script.steps.into_iter().enumerate() {
        let command = step.into_command();
        let label = describe(&command);
        let reply = ctrler
            .apply(command)
            .with_context(|| format!("step {} ({label}) failed", index + 1))?;

        println!();
        println!("step {}: {label}", index + 1);
        match reply {
            Reply::Ok => print_config(&ctrler, ctrler.log().latest()),
            Reply::Config(queried) => print_config(&ctrler, &queried),
        }
    }

    Ok(())
}

fn describe(command: &Command) -> String {
    match command {
        Command::Query { num } => format!("query {num}"),
        Command::Join { groups } => {
            let gids: Vec<String> = groups.keys().map(ToString::to_string).collect();
            format!("join [{}]", gids.join(", "))
        }
        Command::Leave { gids } => {
            let gids: Vec<String> = gids.iter().map(ToString::to_string).collect();
            format!("leave [{}]", gids.join(", "))
        }
        Command::Move { shard, gid } => format!("move shard {shard} -> {gid}"),
    }
}

fn print_config(ctrler: &ShardCtrler, config: &Config) {
    println!("version {}  digest {}", config.num, config.digest_hex());

    let owners: Vec<String> = config.shards.iter().map(ToString::to_string).collect();
    println!("  shards:   [{}]", owners.join(", "));

    if config.groups.is_empty() {
        println!("  groups:   (none)");
    }
    for (gid, count) in config.shard_counts() {
        let servers = config.groups.get(&gid).map(|s| s.join(" ")).unwrap_or_default();
        println!("  group {gid:>4}: {count:>3} shards  {servers}");
    }
    let unassigned = config.unassigned_count();
    if unassigned > 0 {
        println!("  unassigned: {unassigned} shards");
    }

    if config.num > 0
        && let Some(migrations) = ctrler.migrations(config.num - 1, config.num)
        && !migrations.is_empty()
    {
        println!("  migrations from version {}:", config.num - 1);
        for m in migrations {
            println!("    shard {:>3}: {} -> {}", m.shard, m.from, m.to);
        }
    }
}

// -----------------------------------------------------------------------
// shardctl simulate
// -----------------------------------------------------------------------

fn cmd_simulate(config: &CliConfig, steps: usize, seed: u64, max_groups: u64) -> Result<()> {
    let params = SimParams {
        steps,
        seed,
        max_groups,
        n_shards: config.n_shards(),
    };

    println!("shardctl simulation");
    println!("  steps:      {steps}");
    println!("  seed:       {seed}");
    println!("  max_groups: {max_groups}");
    println!("  n_shards:   {}", params.n_shards);
    println!();

    let report = simulate::run(params).context("simulation failed")?;

    println!("Summary:");
    println!("  applied:       {}", report.applied);
    println!("  rejected:      {}", report.rejected);
    println!("  shard moves:   {}", report.moves);
    println!("  final version: {}", report.final_num);
    println!("  final groups:  {}", report.final_groups);
    println!("  digest:        {}", report.digest);
    println!("Replicas converged.");

    Ok(())
}
