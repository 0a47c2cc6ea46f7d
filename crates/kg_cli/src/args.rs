// crates/kg_cli/src/args.rs
//
// Deterministic, offline CLI argument parsing & validation. Flags are parsed
// by clap; everything the engine cares about is validated here, once, into a
// `Job` so main.rs never sees raw strings.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kg_gen::{GenParams, GraphKind, ParamError, INITIATOR_CELLS};

#[derive(Debug, Parser)]
#[command(name = "kg", about = "Deterministic Kronecker graph and permutation generator")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a Kronecker edge list.
    Generate {
        /// Base-2 logarithm of the vertex count.
        #[arg(long)]
        log_n: u32,
        /// Total number of edges to generate.
        #[arg(long)]
        edges: u64,
        /// Five PRNG seed words, each in [0, 2^31 - 1), not all zero.
        #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5")]
        seed: Vec<u32>,
        /// Initiator probabilities in row-major order, summing to one.
        #[arg(long, value_delimiter = ',', default_value = "0.57,0.19,0.19,0.05")]
        initiator: Vec<f64>,
        /// Clip edges to the upper triangle (src <= tgt).
        #[arg(long)]
        undirected: bool,
        /// Emit the flat pair layout with tombstoned duplicates instead of
        /// multiplicity records.
        #[arg(long)]
        tombstones: bool,
        /// Number of in-process workers; the output is identical for any value.
        #[arg(long, default_value_t = 1)]
        workers: u32,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        #[arg(long)]
        quiet: bool,
    },
    /// Generate a random permutation of [0, count).
    Permute {
        /// Number of elements to permute.
        #[arg(long)]
        count: u64,
        /// Five PRNG seed words, each in [0, 2^31 - 1), not all zero.
        #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5")]
        seed: Vec<u32>,
        /// Number of in-process workers; the output is identical for any value.
        #[arg(long, default_value_t = 1)]
        workers: u32,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        #[arg(long)]
        quiet: bool,
    },
}

#[derive(Debug)]
pub enum CliError {
    BadSeed(String),
    BadInitiator(String),
    BadWorkers(u32),
    BadParams(ParamError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            BadSeed(s) => write!(f, "invalid seed: {}", s),
            BadInitiator(s) => write!(f, "invalid initiator: {}", s),
            BadWorkers(w) => write!(f, "invalid worker count: {}", w),
            BadParams(e) => write!(f, "invalid parameters: {}", e),
        }
    }
}
impl std::error::Error for CliError {}

impl From<ParamError> for CliError {
    fn from(e: ParamError) -> Self {
        CliError::BadParams(e)
    }
}

/// A fully validated unit of work.
#[derive(Debug)]
pub enum Job {
    Generate {
        params: GenParams,
        tombstones: bool,
        workers: u32,
        out: PathBuf,
        quiet: bool,
    },
    Permute {
        count: u64,
        seed: [u32; 5],
        workers: u32,
        out: PathBuf,
        quiet: bool,
    },
}

impl Job {
    pub fn quiet(&self) -> bool {
        match self {
            Job::Generate { quiet, .. } | Job::Permute { quiet, .. } => *quiet,
        }
    }
}

fn seed_array(seed: Vec<u32>) -> Result<[u32; 5], CliError> {
    <[u32; 5]>::try_from(seed).map_err(|v| CliError::BadSeed(format!("expected 5 words, got {}", v.len())))
}

fn check_workers(workers: u32) -> Result<u32, CliError> {
    if workers == 0 {
        Err(CliError::BadWorkers(workers))
    } else {
        Ok(workers)
    }
}

/// Entry point used by main.rs.
pub fn parse_and_validate() -> Result<Job, CliError> {
    validate(Args::parse())
}

pub fn validate(args: Args) -> Result<Job, CliError> {
    match args.command {
        Command::Generate {
            log_n,
            edges,
            seed,
            initiator,
            undirected,
            tombstones,
            workers,
            out,
            quiet,
        } => {
            let seed = seed_array(seed)?;
            let initiator: [f64; INITIATOR_CELLS] =
                initiator.try_into().map_err(|v: Vec<f64>| {
                    CliError::BadInitiator(format!(
                        "expected {} cells, got {}",
                        INITIATOR_CELLS,
                        v.len()
                    ))
                })?;
            let kind = if undirected {
                GraphKind::Undirected
            } else {
                GraphKind::Directed
            };
            let params = GenParams::new(seed, log_n, edges, initiator, kind)?;
            Ok(Job::Generate {
                params,
                tombstones,
                workers: check_workers(workers)?,
                out,
                quiet,
            })
        }
        Command::Permute {
            count,
            seed,
            workers,
            out,
            quiet,
        } => {
            let seed = seed_array(seed)?;
            // Reuse the engine's seed validation without building a full run.
            let mut probe = [0.0; INITIATOR_CELLS];
            probe[0] = 1.0;
            GenParams::new(seed, 1, 1, probe, GraphKind::Directed)?;
            Ok(Job::Permute {
                count,
                seed,
                workers: check_workers(workers)?,
                out,
                quiet,
            })
        }
    }
}
