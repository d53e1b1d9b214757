use anyhow::Result;
use clap::{Parser, Subcommand};
use rigsim::run::{self, RunOptions};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Simulation of a wave-driven offshore platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the simulation
    Run {
        /// Path to RON configuration file to use
        #[arg(short, long)]
        config_path: Option<PathBuf>,
        /// Number of frames to run, overriding the configured termination
        #[arg(short, long)]
        frames: Option<u64>,
        /// Seed for the random number generator
        #[arg(short, long)]
        seed: Option<u64>,
        /// Path to write the RON run report to
        #[arg(short, long)]
        report_path: Option<PathBuf>,
    },
    /// Write the default configuration as a RON file
    DefaultConfig {
        /// Path to write the configuration to
        #[arg(short, long)]
        output_path: PathBuf,
    },
}

fn main() -> Result<()> {
    run::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config_path,
            frames,
            seed,
            report_path,
        } => {
            run::run(RunOptions {
                config_path,
                frames,
                seed,
                report_path,
            })?;
        }
        Command::DefaultConfig { output_path } => run::write_default_config(&output_path)?,
    }
    Ok(())
}
