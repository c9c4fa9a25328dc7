#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter generating worlds and applying diffs to them.

mod config;
mod presets;

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worldforge_core::{Diff, GenerationParams};
use worldforge_system_bootstrap::Bootstrap;
use worldforge_system_merge::MergeEngine;
use worldforge_system_terrain::terrain_for;
use worldforge_world::{query, WorldState};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "worldforge", about = "Procedural world placement engine")]
struct Cli {
    /// Configuration file; defaults to `worldforge.toml` when present.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a new world from a generation parameter document.
    Generate {
        /// JSON generation parameters.
        #[arg(long, value_name = "PATH")]
        params: PathBuf,
        /// World seed; overrides any seed in the parameters.
        #[arg(long)]
        seed: Option<u64>,
        /// Where to write the world; stdout when omitted.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Apply a diff document to a persisted world.
    Apply {
        /// Persisted world JSON.
        #[arg(long, value_name = "PATH")]
        world: PathBuf,
        /// JSON diff to merge.
        #[arg(long, value_name = "PATH")]
        diff: PathBuf,
        /// Seed for generated additions; random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Where to write the merged world; updates `--world` in place when omitted.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Where to write the merge response; stdout when omitted.
        #[arg(long, value_name = "PATH")]
        response: Option<PathBuf>,
    },
}

/// Entry point for the worldforge command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate { params, seed, out } => generate(&config, &params, seed, out.as_deref()),
        Command::Apply {
            world,
            diff,
            seed,
            out,
            response,
        } => apply(
            &config,
            &world,
            &diff,
            seed,
            out.as_deref().unwrap_or(world.as_path()),
            response.as_deref(),
        ),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn generate(config: &Config, params: &Path, seed: Option<u64>, out: Option<&Path>) -> Result<()> {
    let raw = read_json(params)?;
    let params = GenerationParams::from_value(&raw);
    let seed = seed
        .or(params.seed)
        .unwrap_or_else(|| rand::thread_rng().gen());

    let presets = config.presets();
    let generated = Bootstrap::new(&presets, config.terrain.settings())
        .generate(&params, seed)
        .context("failed to generate terrain")?;

    let world = &generated.world;
    let structures = query::structures(world);
    info!(
        biome = %params.biome,
        seed,
        trees = structures.trees.len(),
        rocks = structures.rocks.len(),
        peaks = structures.peaks.len(),
        buildings = structures.buildings.len(),
        street_lamps = structures.street_lamps.len(),
        enemies = query::enemies(world).len(),
        "generated world"
    );
    write_json(out, world)
}

fn apply(
    config: &Config,
    world_path: &Path,
    diff_path: &Path,
    seed: Option<u64>,
    out: &Path,
    response_path: Option<&Path>,
) -> Result<()> {
    let text = fs::read_to_string(world_path)
        .with_context(|| format!("failed to read world at {}", world_path.display()))?;
    let mut world = WorldState::from_json(&text)
        .with_context(|| format!("failed to parse world at {}", world_path.display()))?;
    let diff = Diff::from_value(&read_json(diff_path)?);
    if diff.is_empty() {
        info!(diff = %diff_path.display(), "diff requests no changes");
    }

    let mut terrain = terrain_for(query::biome(&world), query::terrain_settings(&world))
        .context("failed to regenerate terrain for the persisted world")?;
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let presets = config.presets();
    let response = MergeEngine::new(&presets).apply(&mut world, &mut terrain, diff, &mut rng);
    info!(
        seed,
        auto_removed = response.auto_removed.values().sum::<usize>(),
        shortfalls = response.shortfalls.len(),
        "applied diff"
    );

    write_json(Some(out), &world)?;
    write_json(response_path, &response)
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse JSON in {}", path.display()))
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("failed to encode JSON")?;
    text.push('\n');
    match path {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("failed to write to stdout"),
    }
}
