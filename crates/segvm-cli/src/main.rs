//! segvm command-line tool
//!
//! Loads a JSON heap snapshot and runs the collector over it, or inspects
//! the heap the way a debugger would.

mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use output::{resolve_color_choice, StyledOutput};
use segvm_core::Address;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "segvm")]
#[command(about = "Segmented VM heap collector and inspector", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// When to use colors: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a collection over a snapshot
    Gc {
        /// Snapshot file
        snapshot: PathBuf,
        /// Report what would be freed without freeing it
        #[arg(long)]
        dry_run: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Log the heap layout before and after (needs -vvv)
        #[arg(long)]
        dump_heap: bool,
        /// Write the collected heap to a new snapshot
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show segments and execution state
    Inspect {
        /// Snapshot file
        snapshot: PathBuf,
    },

    /// Print the canonical form of an address
    Normalize {
        /// Snapshot file
        snapshot: PathBuf,
        /// Address as SSSS:OOOO (hex)
        address: Address,
    },

    /// List the references an object holds
    Outgoing {
        /// Snapshot file
        snapshot: PathBuf,
        /// Address as SSSS:OOOO (hex)
        address: Address,
    },

    /// List the addresses a segment could free
    Freeable {
        /// Snapshot file
        snapshot: PathBuf,
        /// Segment id (hex)
        #[arg(value_parser = parse_segment_id)]
        segment: u16,
    },
}

fn parse_segment_id(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid segment id '{}': {}", s, e))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("SEGVM_LOG", default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    match cli.command {
        Commands::Gc {
            snapshot,
            dry_run,
            json,
            dump_heap,
            output,
        } => commands::gc::execute(
            out,
            &snapshot,
            commands::gc::GcArgs {
                dry_run,
                json,
                dump_heap,
                output,
            },
        ),
        Commands::Inspect { snapshot } => commands::inspect::execute(out, &snapshot),
        Commands::Normalize { snapshot, address } => {
            commands::normalize::execute(out, &snapshot, address)
        }
        Commands::Outgoing { snapshot, address } => {
            commands::outgoing::execute(out, &snapshot, address)
        }
        Commands::Freeable { snapshot, segment } => {
            commands::freeable::execute(out, &snapshot, segment)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));
    let result = run(cli, &mut out);
    out.flush();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            out.stderr_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
