mod coefficients;
mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mocorr", about = "Movie motion correction for electron micrographs")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show MRC stack or movie manifest metadata
    Info(commands::info::InfoArgs),
    /// Align a movie and undo its local deformation
    Correct(commands::correct::CorrectArgs),
    /// Generate a synthetic deformed movie from a still image
    Synth(commands::synth::SynthArgs),
    /// Print or save the default correction config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Correct(args) => commands::correct::run(args),
        Commands::Synth(args) => commands::synth::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
