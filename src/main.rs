//! Profile materializer CLI
//!
//! Resolves profile inheritance and writes merged configuration
//! directories, or reifies container definitions into projects.

use anyhow::{Context, Result};
use clap::Parser;
use profile_materializer::cli::{Cli, Command, GenerateArgs, ListArgs, MaterializeArgs, ShowArgs};
use profile_materializer::config::{Config, ConfigLoader, ConfigPaths};
use profile_materializer::containers::Containers;
use profile_materializer::error::{ErrorReport, ProfileError};
use profile_materializer::format::{self, OutputFormat};
use profile_materializer::logging::{self, LogTarget};
use profile_materializer::materialize::Materializer;
use profile_materializer::profile::ProfileSource;
use serde_json::json;
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    // Load configuration with tier merging; an explicit --config replaces the tiers
    let paths = match &cli.config {
        Some(file) => ConfigPaths::discover().with_file(file),
        None => ConfigPaths::discover(),
    };
    let mut loader = ConfigLoader::load_with_paths(paths)?;
    debug!(sources = ?loader.sources(), "Loaded configuration");

    // Override paths from CLI arguments
    let config = loader.config_mut();
    if let Some(root) = &cli.profiles_dir {
        config.profiles.root = root.clone();
    }
    let config = loader.into_config();

    let format = cli.format;
    match run(&config, cli.command, format) {
        Ok(()) => Ok(()),
        Err(err) => match (format, err.downcast_ref::<ProfileError>()) {
            (OutputFormat::Json, Some(profile_err)) => {
                let report = ErrorReport::from(profile_err);
                println!("{}", serde_json::to_string_pretty(&json!({ "error": report }))?);
                std::process::exit(1);
            }
            _ => Err(err),
        },
    }
}

fn run(config: &Config, command: Command, format: OutputFormat) -> Result<()> {
    match command {
        Command::Materialize(args) => run_materialize(config, args, format),
        Command::Order(args) => {
            let materializer = open_materializer(config)?;
            let (_, sequence) = materializer.resolve(args.profiles.as_slice())?;
            match format {
                OutputFormat::Markdown => print!("{}", format::format_sequence_markdown(&sequence)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sequence)?),
            }
            Ok(())
        }
        Command::List(args) => run_list(config, args, format),
        Command::Show(args) => run_show(config, args, format),
        Command::Generate(args) => run_generate(config, args, format),
    }
}

fn open_materializer(config: &Config) -> Result<Materializer> {
    let materializer =
        Materializer::open(&config.profiles.root, config.profiles.layout.clone())?;
    Ok(materializer)
}

fn run_materialize(config: &Config, args: MaterializeArgs, format: OutputFormat) -> Result<()> {
    let materializer = open_materializer(config)?;
    let materialized = materializer.materialize(&args.target, args.profiles.profiles.as_slice())?;

    match format {
        OutputFormat::Markdown => print!("{}", format::format_materialized_markdown(&materialized)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&format::materialized_json(&materialized))?
        ),
    }
    Ok(())
}

fn run_list(config: &Config, args: ListArgs, format: OutputFormat) -> Result<()> {
    let materializer = open_materializer(config)?;
    let names = materializer.source().list(args.prefix.as_deref())?;

    match format {
        OutputFormat::Markdown => print!("{}", format::format_profiles_markdown(&names)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
    }
    Ok(())
}

fn run_show(config: &Config, args: ShowArgs, format: OutputFormat) -> Result<()> {
    let materializer = open_materializer(config)?;
    let merged = materializer.compute(args.profiles.profiles.as_slice())?;

    if let Some(path) = &args.file
        && !merged.files.contains_key(path)
    {
        anyhow::bail!(
            "no file {} in profiles {}",
            path,
            merged.sequence.as_slice().join(", ")
        );
    }

    let only = args.file.as_deref();
    match format {
        OutputFormat::Markdown => print!("{}", format::format_merged_markdown(&merged, only)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&format::merged_json(&merged, only))?
        ),
    }
    Ok(())
}

fn run_generate(config: &Config, args: GenerateArgs, format: OutputFormat) -> Result<()> {
    let configs_dir = args
        .configs
        .unwrap_or_else(|| config.containers.configs_dir.clone());
    let registry = config.containers.registry()?;
    let containers = Containers::new(&configs_dir, registry, open_materializer(config)?)
        .with_default_type(config.containers.default_types());

    let names = if args.containers.is_empty() {
        containers.list()?
    } else {
        args.containers
    };
    if names.is_empty() {
        info!(configs_dir = %configs_dir.display(), "No containers defined");
    }

    let mut reified = Vec::with_capacity(names.len());
    for name in names {
        let target = args.target.join(&name);
        let materialized = containers
            .reify(&target, &name)
            .with_context(|| format!("failed to reify container {name}"))?;
        reified.push((name, materialized));
    }

    match format {
        OutputFormat::Markdown => print!("{}", format::format_containers_markdown(&reified)),
        OutputFormat::Json => {
            let value: Vec<_> = reified
                .iter()
                .map(|(name, materialized)| {
                    json!({ "container": name, "materialized": format::materialized_json(materialized) })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
