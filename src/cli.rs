use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::sim::{Platform, QualityProfile};
use crate::types::RegionRequest;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate sequencing reads from an indexed FASTA reference
    Simulate(SimulateArgs),

    /// Build the random-access index sidecar for a FASTA file
    Index(IndexArgs),
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Input FASTA file to sample reads from
    pub fasta_file: PathBuf,

    /// Output FASTQ file, compressed when it ends in .gz (default: stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Restrict simulation to SEQ[:START-END] (repeatable; default: every sequence)
    #[arg(long = "region", value_parser = parse_region)]
    pub regions: Vec<RegionRequest>,

    /// Target coverage depth
    #[arg(long, default_value = "5")]
    pub depth: usize,

    /// Mean read length
    #[arg(long, default_value = "150")]
    pub read_len_mean: usize,

    /// Read length standard deviation (0 = fixed length)
    #[arg(long, default_value = "0")]
    pub read_len_stddev: usize,

    /// Minimum read length, also the mate length in paired mode
    #[arg(long, default_value = "50")]
    pub read_len_min: usize,

    /// Maximum read length
    #[arg(long, default_value = "50000")]
    pub read_len_max: usize,

    /// Base substitution error rate [0.0-1.0]
    #[arg(long, default_value = "0.0")]
    pub error_rate: f64,

    /// Insertion/deletion rate [0.0-1.0]
    #[arg(long, default_value = "0.0")]
    pub indel_rate: f64,

    /// Probability of replacing a base with 'N' [0.0-1.0]
    #[arg(long, default_value = "0.0")]
    pub ambig_rate: f64,

    /// Error rate multiplier right after a previous error
    #[arg(long, default_value = "2.0")]
    pub cluster_bias: f64,

    /// Substitution rate multiplier in GC-rich windows
    #[arg(long, default_value = "1.5")]
    pub gc_boost: f64,

    /// Maximum indel length (insertions and deletions)
    #[arg(long, default_value = "3")]
    pub max_indel_len: usize,

    /// Indel rate multiplier inside homopolymer runs
    #[arg(long, default_value = "2.0")]
    pub homopolymer_multiplier: f64,

    /// Quality score profile
    #[arg(long, value_enum, default_value = "short")]
    pub quality_profile: QualityProfile,

    /// Simulate paired-end fragments instead of single reads
    #[arg(long)]
    pub paired: bool,

    /// Mean DNA fragment length for paired-end mode
    #[arg(long, default_value = "600")]
    pub frag_len_mean: usize,

    /// Fragment length standard deviation
    #[arg(long, default_value = "150")]
    pub frag_len_stddev: usize,

    /// Write mates to separate _R1/_R2 files instead of interleaving
    #[arg(long)]
    pub split_reads: bool,

    /// Platform preset; overrides the individual model flags
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// TOML file with a custom preset (same fields as the built-ins)
    #[arg(long, conflicts_with = "platform")]
    pub preset_file: Option<PathBuf>,

    /// Write mutation events (read ID, change, coordinate) to this file
    #[arg(long)]
    pub mutation_log: Option<PathBuf>,

    /// Write a JSON run report with per-region ground-truth totals
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Seed for the random stream (default: random, logged for reuse)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads; regions are simulated in parallel
    #[arg(long, default_value = "1")]
    pub threads: usize,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Input FASTA file
    pub fasta_file: PathBuf,
}

fn parse_region(value: &str) -> Result<RegionRequest, String> {
    value.parse()
}
