//! Command line interface definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::{Amount, Capacities};

/// Concurrent warehouse deliveries and orders
#[derive(Parser, Debug)]
#[command(name = "warehousing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run deliveries and orders concurrently against three bounded warehouses")]
#[command(subcommand_negates_reqs = true, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        match &self.command {
            Some(Commands::Bench(args)) => args.verbose,
            None => self.run.verbose,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a generated, balanced workload and report timing as CSV
    Bench(BenchArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Orange warehouse capacity
    #[arg(required = true)]
    pub orange: Option<Amount>,

    /// Blue warehouse capacity
    #[arg(required = true)]
    pub blue: Option<Amount>,

    /// Aqua warehouse capacity
    #[arg(required = true)]
    pub aqua: Option<Amount>,

    /// Read requests from this file instead of stdin
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Run tasks on a fixed pool of this many threads instead of one thread each
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Print each warehouse's final totals after the manifests
    #[arg(long)]
    pub summary: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl RunArgs {
    /// All three capacities, or `None` if any is missing.
    pub fn capacities(&self) -> Option<Capacities> {
        Some(Capacities::new(self.orange?, self.blue?, self.aqua?))
    }
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Number of delivery/order pairs to generate
    #[arg(long, default_value_t = 300)]
    pub tasks: usize,

    /// Capacity of every warehouse
    #[arg(long, default_value_t = 10)]
    pub capacity: Amount,

    /// Largest single delivery or order amount (at most the capacity)
    #[arg(long, default_value_t = 5)]
    pub max_amount: Amount,

    /// Worker pool size; omit for one thread per task
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Check warehouse invariants and totals after the run
    #[arg(long)]
    pub validate: bool,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
