//! CLI command definitions for the `profiles` tool.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::format::OutputFormat;

/// Resolve profile inheritance and materialize merged configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces tier discovery)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Profile root directory (overrides config)
    #[arg(short, long, global = true)]
    pub profiles_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge profiles into an empty target directory
    Materialize(MaterializeArgs),

    /// Print the merge order of profiles, least specific first
    Order(ProfilesArgs),

    /// List profiles under the profile root
    List(ListArgs),

    /// Show merged files without writing anything
    Show(ShowArgs),

    /// Reify container definitions into project directories
    Generate(GenerateArgs),
}

/// Profiles to resolve. Later profiles win conflicts with earlier ones.
#[derive(Args, Debug, Clone)]
pub struct ProfilesArgs {
    /// Profile names; `/` is accepted as a separator
    #[arg(required = true)]
    pub profiles: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MaterializeArgs {
    /// Output directory; must be empty or absent
    #[arg(short, long)]
    pub target: PathBuf,

    #[command(flatten)]
    pub profiles: ProfilesArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only list profiles whose name starts with this prefix
    pub prefix: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Only show this file (path relative to the profile directory)
    #[arg(long)]
    pub file: Option<String>,

    #[command(flatten)]
    pub profiles: ProfilesArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Directory receiving one subdirectory per container
    #[arg(short, long)]
    pub target: PathBuf,

    /// Configs directory holding `containers/` (overrides config)
    #[arg(long)]
    pub configs: Option<PathBuf>,

    /// Containers to reify; all defined containers when omitted
    pub containers: Vec<String>,
}
