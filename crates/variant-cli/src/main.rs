//! `variant` command line front end
//!
//! Operates on a JSON store file: derive a variant of a base container,
//! then apply, record, reset or inspect it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use tracing_subscriber::EnvFilter;
use variant_core::{derive_variant, VariantConfig, VariantEngine};
use variant_model::{MemoryStore, NodeHandle};
use variant_sync::Level;

fn cli() -> Command {
    let variant_arg = || {
        Arg::new("variant")
            .long("variant")
            .required(true)
            .help("Asset path of the variant container")
    };

    Command::new("variant")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Keep derived object graphs in step with their base")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON store file to operate on"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with engine settings"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .value_parser(value_parser!(Level))
                .help("Minimum diagnostic level (debug, info, warn, error)"),
        )
        .subcommand(
            Command::new("derive")
                .about("Create a variant of a base container")
                .arg(
                    Arg::new("base")
                        .long("base")
                        .required(true)
                        .help("Asset path of the base container"),
                ),
        )
        .subcommand(
            Command::new("apply")
                .about("Re-sync a variant with its base and replay overrides")
                .arg(variant_arg()),
        )
        .subcommand(
            Command::new("record")
                .about("Capture a variant's deviations from its base")
                .arg(variant_arg()),
        )
        .subcommand(
            Command::new("reset")
                .about("Forget a variant's recorded customizations")
                .arg(variant_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Print a variant's bookkeeping state as JSON")
                .arg(variant_arg()),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let (name, args) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no command given"))?;

    // global options are propagated into the subcommand's matches
    let level = args.get_one::<Level>("log-level").copied();
    let mut config = load_config(args.get_one::<PathBuf>("config"))?;
    if let Some(level) = level {
        config = config.with_diagnostic_level(level);
    }
    init_logging(level);

    let store_path = args
        .get_one::<PathBuf>("store")
        .ok_or_else(|| anyhow!("--store is required"))?;
    let mut store = load_store(store_path)?;

    match name {
        "derive" => {
            let base = required(args, "base")?;
            let root = primary_at(&store, base)?;
            let derived = derive_variant(&mut store, root, &config)
                .with_context(|| format!("deriving a variant of {base}"))?;
            save_store(&store, store_path)?;
            println!("Derived: {}", derived.asset_path);
            println!("  Cloned: {}", derived.report.cloned);
        }
        "apply" => {
            let (path, root) = variant_root(&store, args)?;
            let report = VariantEngine::new(&mut store, config)
                .apply(root)
                .with_context(|| format!("applying {path}"))?;
            save_store(&store, store_path)?;
            println!("Applied: {path}");
            println!("  Cloned: {}", report.cloned);
            println!("  Tombstoned: {}", report.tombstoned);
            println!("  Orphans removed: {}", report.orphans_removed);
            println!("  Pairs copied: {}", report.pairs_copied);
            println!("  Overrides applied: {}", report.overrides_applied);
            println!("  Overrides skipped: {}", report.overrides_skipped);
        }
        "record" => {
            let (path, root) = variant_root(&store, args)?;
            let report = VariantEngine::new(&mut store, config)
                .record(root)
                .with_context(|| format!("recording {path}"))?;
            save_store(&store, store_path)?;
            println!("Recorded: {path}");
            println!("  Added: {}", report.added);
            println!("  Removed: {}", report.removed);
            println!("  Overrides: {}", report.overrides);
        }
        "reset" => {
            let (path, root) = variant_root(&store, args)?;
            VariantEngine::new(&mut store, config)
                .reset(root)
                .with_context(|| format!("resetting {path}"))?;
            save_store(&store, store_path)?;
            println!("Reset: {path}");
        }
        "show" => {
            let (path, root) = variant_root(&store, args)?;
            let state = VariantEngine::new(&mut store, config)
                .state(root)
                .with_context(|| format!("reading state of {path}"))?;
            let json = serde_json::to_string_pretty(&state.to_value()?)?;
            println!("{json}");
        }
        other => return Err(anyhow!("unknown command '{other}'")),
    }
    Ok(())
}

fn init_logging(level: Option<Level>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<VariantConfig> {
    let Some(path) = path else {
        return Ok(VariantConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading store {}", path.display()))?;
    MemoryStore::from_json(&text).with_context(|| format!("parsing store {}", path.display()))
}

fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let json = store.to_json()?;
    fs::write(path, json).with_context(|| format!("writing store {}", path.display()))?;
    tracing::debug!(path = %path.display(), "store saved");
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("--{id} is required"))
}

fn primary_at(store: &MemoryStore, asset_path: &str) -> Result<NodeHandle> {
    let container = store
        .container_at(asset_path)
        .ok_or_else(|| anyhow!("no container at {asset_path}"))?;
    store
        .primary_node(&container)
        .ok_or_else(|| anyhow!("{asset_path} has no primary node"))
}

fn variant_root<'a>(store: &MemoryStore, args: &'a ArgMatches) -> Result<(&'a str, NodeHandle)> {
    let path = required(args, "variant")?;
    Ok((path, primary_at(store, path)?))
}
