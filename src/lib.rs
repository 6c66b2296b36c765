pub mod cli;
pub mod commands;
pub mod fasta;
pub mod output;
pub mod report;
pub mod sim;
pub mod types;
pub mod utils;

pub use types::{ReadRecord, RegionRequest, Strand};
