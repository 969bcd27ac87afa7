//! deepweave CLI - inspect JSON documents as value graphs
//!
//! Hashes, copies and merges JSON documents through the graph walkers, and
//! exposes the random engine for reproducible draws and shuffles.

use clap::{Parser, Subcommand};
use deepweave::random::{self, Random};
use deepweave::{
    deep_copy_with, deep_hash, deep_merge, fingerprint, Config, ConfigStore, Error, Heap,
    ReclaimedPolicy,
};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deepweave")]
#[command(about = "Deep copy, merge and hash JSON value graphs; seedable random draws")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Path to the config file (defaults to ~/.config/deepweave/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "deepweave=debug" (overrides RUST_LOG and the config file)
    #[arg(long)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    // === Graph Commands ===
    /// Print the structural hash and fingerprint of a JSON document
    Hash {
        /// JSON file, or "-" for stdin
        file: PathBuf,
    },

    /// Deep-copy a JSON document and check the copy hashes the same
    Copy {
        /// JSON file, or "-" for stdin
        file: PathBuf,
        /// What to do with dangling back references: fail or pass-through
        #[arg(short, long)]
        policy: Option<ReclaimedPolicy>,
    },

    /// Deep-merge two JSON documents
    Merge {
        /// Left document
        a: PathBuf,
        /// Right document
        b: PathBuf,
    },

    // === Random Commands ===
    /// Draw numbers from a seeded engine
    Random {
        /// Seed string (defaults to the configured seed, then the clock)
        #[arg(short, long)]
        seed: Option<String>,
        /// Number of draws
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
        /// Also branch the engine and draw from the child
        #[arg(short, long)]
        branch: bool,
    },

    /// Shuffle the given items
    Shuffle {
        #[arg(short, long)]
        seed: Option<String>,
        items: Vec<String>,
    },

    /// Pick up to N distinct items
    Sample {
        #[arg(short, long)]
        seed: Option<String>,
        /// Maximum number of items to pick
        #[arg(short, long)]
        max: usize,
        items: Vec<String>,
    },

    // === Config Commands ===
    /// Show or initialize the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::new()?,
    };
    let config = store.load()?;
    init_logging(&cli, &config);

    match cli.command {
        Commands::Hash { ref file } => {
            let mut heap = Heap::new();
            let value = heap.import_json(&read_json(file)?);
            output(
                &cli.format,
                &serde_json::json!({
                    "hash": deep_hash(&heap, &value),
                    "fingerprint": fingerprint(&heap, &value).to_hex(),
                    "nodes": heap.len()
                }),
            )?;
        }

        Commands::Copy { ref file, policy } => {
            let mut heap = Heap::new();
            let value = heap.import_json(&read_json(file)?);
            let policy = policy.unwrap_or(config.reclaimed_policy);
            let outcome = deep_copy_with(&mut heap, &value, policy)?;
            let dangling: Vec<String> = outcome.dangling.iter().map(|p| p.to_string()).collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "value": heap.export_json(&outcome.value)?,
                    "hash_preserved": deep_hash(&heap, &outcome.value) == deep_hash(&heap, &value),
                    "dangling": dangling
                }),
            )?;
        }

        Commands::Merge { ref a, ref b } => {
            let mut heap = Heap::new();
            let left = heap.import_json(&read_json(a)?);
            let right = heap.import_json(&read_json(b)?);
            match deep_merge(&mut heap, &left, &right) {
                Ok(merged) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "value": heap.export_json(&merged)?
                        }),
                    )?;
                }
                Err(Error::MergeConflict { path, reason }) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "error",
                            "path": path.to_string(),
                            "message": reason
                        }),
                    )?;
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Random {
            ref seed,
            count,
            branch,
        } => {
            let mut rng = engine(seed, &config);
            let origin = rng.origin();
            let draws: Vec<f64> = (0..count).map(|_| rng.draw()).collect();
            let mut result = serde_json::json!({
                "seed": origin,
                "draws": draws
            });
            if branch {
                let mut child = rng.branch();
                let child_draws: Vec<f64> = (0..count).map(|_| child.draw()).collect();
                result["branch"] = serde_json::json!({
                    "seed": child.origin(),
                    "draws": child_draws
                });
            }
            output(&cli.format, &result)?;
        }

        Commands::Shuffle {
            ref seed,
            ref items,
        } => {
            let mut rng = engine(seed, &config);
            let mut items = items.clone();
            random::shuffle(&mut items, &mut rng);
            output(&cli.format, &serde_json::json!({ "items": items }))?;
        }

        Commands::Sample {
            ref seed,
            max,
            ref items,
        } => {
            let mut rng = engine(seed, &config);
            let picked = random::take(items, max, &mut rng);
            output(&cli.format, &serde_json::json!({ "items": picked }))?;
        }

        Commands::Config { ref action } => match action {
            ConfigAction::Show => {
                output(
                    &cli.format,
                    &serde_json::json!({
                        "path": store.path().display().to_string(),
                        "config": config
                    }),
                )?;
            }
            ConfigAction::Init => {
                let created = !store.path().exists();
                if created {
                    store.save(&Config::default())?;
                }
                output(
                    &cli.format,
                    &serde_json::json!({
                        "status": "ok",
                        "path": store.path().display().to_string(),
                        "created": created
                    }),
                )?;
            }
        },
    }

    Ok(())
}

fn init_logging(cli: &Cli, config: &Config) {
    let directive = cli
        .log
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| config.log_filter().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .init();
}

fn engine(seed: &Option<String>, config: &Config) -> Random {
    match seed.as_ref().or(config.default_seed.as_ref()) {
        Some(seed) => Random::new(seed.as_str()),
        None => Random::from_entropy(),
    }
}

fn read_json(path: &PathBuf) -> anyhow::Result<serde_json::Value> {
    let content = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
