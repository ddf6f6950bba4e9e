mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    check, hydrate, init, keys, normalize, outline, persist, probe, CheckArgs, InitArgs, KeysArgs,
    LinkArgs, NormalizeArgs, OutlineArgs, ProbeArgs,
};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `outliner_schema=debug`
const LOG_ENV: &str = "OUTLINER_LOG";

/// Outliner CLI - validate, repair and edit outline documents
#[derive(Parser, Debug)]
#[command(name = "outliner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file and a starter document
    Init(InitArgs),

    /// Validate documents and report schema issues
    Check(CheckArgs),

    /// Repair a document
    Normalize(NormalizeArgs),

    /// Strip same-document link ids for storage
    Persist(LinkArgs),

    /// Give links their runtime document ids
    Hydrate(LinkArgs),

    /// Print a document as an outline, optionally replaying keys
    Outline(OutlineArgs),

    /// List the effective key bindings
    Keys(KeysArgs),

    /// Check local persistence support
    Probe(ProbeArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Check(args) => check(args, &cwd).map(|clean| {
            if !clean {
                std::process::exit(1);
            }
        }),
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Persist(args) => persist(args, &cwd),
        Command::Hydrate(args) => hydrate(args, &cwd),
        Command::Outline(args) => outline(args, &cwd),
        Command::Keys(args) => keys(args, &cwd),
        Command::Probe(args) => probe(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
