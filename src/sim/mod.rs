//! Coverage-driven read sampling. A region is drawn from until the
//! simulated base count reaches `region length x depth`, with every draw
//! crediting its original drawn length no matter how indels reshape the
//! emitted read.

pub mod config;
pub mod error_model;
pub mod length;
pub mod presets;
pub mod quality;
pub mod sequence;

use anyhow::{bail, Result};
use indicatif::ProgressBar;
use log::warn;
use rand::Rng;
use seahash::SeaHasher;
use std::hash::Hasher;
use std::io::{Read, Seek};

use crate::fasta::extract::RegionExtractor;
use crate::fasta::index::IndexRecord;
use crate::output::ReadSink;
use crate::types::{ReadRecord, Strand};

pub use config::SimulationProfile;
pub use error_model::{ErrorModel, MutationResult};
pub use length::LengthModel;
pub use presets::{load_preset_file, Platform, PresetBundle};
pub use quality::QualityProfile;

/// Consecutive discarded draws after which a region gives up. Scattered
/// failures reset the count; only a persistently unreadable archive
/// aborts the region.
const MAX_FAILED_DRAWS: u32 = 10;

/// What one region produced, for the run report.
#[derive(Debug, Clone)]
pub struct RegionOutcome {
    pub reads: u64,
    pub bases_simulated: usize,
    pub target_bases: usize,
}

/// Derives the per-region RNG seed from the run seed. Each region gets an
/// independent stream, so results do not depend on which worker picked
/// the region up or in what order.
pub fn region_seed(run_seed: u64, region_index: u64) -> u64 {
    let mut hasher = SeaHasher::new();
    hasher.write_u64(run_seed);
    hasher.write_u64(region_index);
    hasher.finish()
}

/// Samples single-end reads from `[start, end)` of `rec` until the
/// coverage target is met.
pub fn simulate_region<A, G, S>(
    extractor: &mut RegionExtractor<A>,
    rec: &IndexRecord,
    start: usize,
    end: usize,
    profile: &SimulationProfile,
    rng: &mut G,
    sink: &mut S,
    progress: &ProgressBar,
) -> Result<RegionOutcome>
where
    A: Read + Seek,
    G: Rng,
    S: ReadSink,
{
    let region_len = end - start;
    let target_bases = region_len * profile.coverage_depth;
    let mut bases_simulated = 0usize;
    let mut reads = 0u64;
    let mut failed_draws = 0u32;

    while bases_simulated < target_bases {
        let read_len = profile.read_len.sample(rng);
        if region_len < read_len {
            continue;
        }
        let base_start = start + rng.gen_range(0..=region_len - read_len);
        let base_end = base_start + read_len;

        let raw = match extractor.extract(rec, base_start as u64, base_end as u64) {
            Ok(bytes) if bytes.len() == read_len => bytes,
            Ok(bytes) => {
                failed_draws += 1;
                if failed_draws >= MAX_FAILED_DRAWS {
                    bail!(
                        "{}:{}-{}: archive returned {} bases where {} were expected, \
                         {} draws discarded in a row",
                        rec.id,
                        base_start,
                        base_end,
                        bytes.len(),
                        read_len,
                        failed_draws
                    );
                }
                warn!(
                    "{}:{}-{}: archive returned {} bases where {} were expected, discarding draw",
                    rec.id,
                    base_start,
                    base_end,
                    bytes.len(),
                    read_len
                );
                continue;
            }
            Err(err) => {
                failed_draws += 1;
                if failed_draws >= MAX_FAILED_DRAWS {
                    return Err(err.context(format!(
                        "{failed_draws} consecutive failed draws in {}:{start}-{end}",
                        rec.id
                    )));
                }
                warn!(
                    "{}:{}-{}: discarding draw: {err:#}",
                    rec.id, base_start, base_end
                );
                continue;
            }
        };
        failed_draws = 0;

        let (oriented, strand) = if rng.gen_bool(0.5) {
            (sequence::reverse_complement(raw), Strand::Reverse)
        } else {
            (raw.to_vec(), Strand::Forward)
        };
        let id = format!("{}_{}_{}_({})", rec.id, base_start, base_end, strand);
        let read = build_read(id, &oriented, strand, profile, rng, sink)?;
        sink.write_read(read)?;

        bases_simulated += read_len;
        reads += 1;
        progress.inc(read_len as u64);
    }

    Ok(RegionOutcome {
        reads,
        bases_simulated,
        target_bases,
    })
}

/// Samples read pairs from `[start, end)` of `rec`. Each draw places a
/// whole fragment; the mates are its ends, the second one reverse
/// complemented, and the fragment length is what counts toward coverage.
pub fn simulate_region_paired<A, G, S>(
    extractor: &mut RegionExtractor<A>,
    rec: &IndexRecord,
    start: usize,
    end: usize,
    profile: &SimulationProfile,
    rng: &mut G,
    sink: &mut S,
    progress: &ProgressBar,
) -> Result<RegionOutcome>
where
    A: Read + Seek,
    G: Rng,
    S: ReadSink,
{
    let region_len = end - start;
    let target_bases = region_len * profile.coverage_depth;
    let mate_len = profile.read_len.min;
    let mut bases_simulated = 0usize;
    let mut reads = 0u64;
    let mut failed_draws = 0u32;

    while bases_simulated < target_bases {
        let frag_len = profile.fragment_len.sample(rng);
        if region_len < frag_len || frag_len < mate_len {
            continue;
        }
        let frag_start = start + rng.gen_range(0..=region_len - frag_len);
        let frag_end = frag_start + frag_len;

        let frag = match extractor.extract(rec, frag_start as u64, frag_end as u64) {
            Ok(bytes) if bytes.len() == frag_len => bytes,
            Ok(bytes) => {
                failed_draws += 1;
                if failed_draws >= MAX_FAILED_DRAWS {
                    bail!(
                        "{}:{}-{}: archive returned {} bases where {} were expected, \
                         {} draws discarded in a row",
                        rec.id,
                        frag_start,
                        frag_end,
                        bytes.len(),
                        frag_len,
                        failed_draws
                    );
                }
                warn!(
                    "{}:{}-{}: archive returned {} bases where {} were expected, discarding draw",
                    rec.id,
                    frag_start,
                    frag_end,
                    bytes.len(),
                    frag_len
                );
                continue;
            }
            Err(err) => {
                failed_draws += 1;
                if failed_draws >= MAX_FAILED_DRAWS {
                    return Err(err.context(format!(
                        "{failed_draws} consecutive failed draws in {}:{start}-{end}",
                        rec.id
                    )));
                }
                warn!(
                    "{}:{}-{}: discarding draw: {err:#}",
                    rec.id, frag_start, frag_end
                );
                continue;
            }
        };
        failed_draws = 0;

        let id_base = format!("{}_{}_{}", rec.id, frag_start, frag_end);
        let read1 = build_read(
            format!("{id_base}/1"),
            &frag[..mate_len],
            Strand::Forward,
            profile,
            rng,
            sink,
        )?;
        let mate_seq = sequence::reverse_complement(&frag[frag_len - mate_len..]);
        let read2 = build_read(
            format!("{id_base}/2"),
            &mate_seq,
            Strand::Reverse,
            profile,
            rng,
            sink,
        )?;
        sink.write_pair(read1, read2)?;

        bases_simulated += frag_len;
        reads += 2;
        progress.inc(frag_len as u64);
    }

    Ok(RegionOutcome {
        reads,
        bases_simulated,
        target_bases,
    })
}

/// Mutation and quality pass shared by both modes.
fn build_read<G: Rng, S: ReadSink>(
    id: String,
    raw: &[u8],
    strand: Strand,
    profile: &SimulationProfile,
    rng: &mut G,
    sink: &mut S,
) -> Result<ReadRecord> {
    let MutationResult {
        bases,
        error_mask,
        log,
    } = profile.errors.inject(raw, rng);
    if sink.wants_mutation_log() {
        for event in &log {
            sink.write_mutation_line(&id, event)?;
        }
    }
    let quality = profile.quality.synthesize(&error_mask, rng);
    Ok(ReadRecord {
        id,
        sequence: bases,
        quality,
        strand,
    })
}
