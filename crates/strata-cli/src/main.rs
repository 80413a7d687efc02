//! Strata CLI - Inspect a content database from the command line
//!
//! # Usage
//!
//! ```bash
//! # List the children of a content path
//! strata ls /blog
//!
//! # Show a record's fields
//! strata show /blog/first-post
//!
//! # Resolve a URL to a record or asset
//! strata resolve /de/blog/first-post/
//!
//! # Show the files a record depends on
//! strata deps /blog/first-post
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Strata - content database inspection
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Project directory to operate on
    #[arg(long, short = 'p', global = true, env = "STRATA_PROJECT", default_value = ".")]
    project: PathBuf,

    /// Alternative to load records in (defaults to the primary)
    #[arg(long, short = 'a', global = true)]
    alt: Option<String>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the children and attachments of a content path
    Ls(commands::ls::LsArgs),

    /// Show a record's fields and derived properties
    Show(commands::show::ShowArgs),

    /// Resolve a URL path to a record or asset
    Resolve(commands::resolve::ResolveArgs),

    /// Show the files a record depends on
    Deps(commands::deps::DepsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Ls(args) => commands::ls::execute(args, cli.global),
        Commands::Show(args) => commands::show::execute(args, cli.global),
        Commands::Resolve(args) => commands::resolve::execute(args, cli.global),
        Commands::Deps(args) => commands::deps::execute(args, cli.global),
    }
}
