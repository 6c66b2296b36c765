//! The simulate subcommand: resolves models and regions, fans region jobs
//! out to worker threads, and funnels finished reads into the single
//! writer thread.

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::bounded;
use indicatif::ProgressBar;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::Path;
use std::thread;

use crate::cli::SimulateArgs;
use crate::fasta::extract::RegionExtractor;
use crate::fasta::index::{self, FastaIndex, IndexRecord};
use crate::output::{self, ChannelSink, Destination, OutputMessage, OutputPlan};
use crate::report::{RegionReport, RunReport};
use crate::sim::{self, ErrorModel, LengthModel, RegionOutcome, SimulationProfile};
use crate::types::RegionRequest;
use crate::utils::progress_bar_builder::ProgressBarBuilder;

/// Reads queued toward the writer thread before workers block.
const OUTPUT_CHANNEL_DEPTH: usize = 1024;

/// One region of one sequence, ready for a worker. The seed index is the
/// region's position in the requested list, so seeding does not depend
/// on scheduling.
struct RegionJob {
    seed_index: u64,
    rec: IndexRecord,
    start: usize,
    end: usize,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    if args.threads == 0 {
        bail!("thread count must be at least 1");
    }
    let (profile, split_reads) = resolve_models(&args)?;
    profile.validate()?;
    if split_reads && !profile.paired {
        warn!("--split-reads only applies to paired-end runs, ignoring");
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("run seed: {seed}");

    let fasta_index = index::ensure_index(&args.fasta_file)?;
    let mut report = RunReport::new(seed, args.threads, profile.clone());
    let (jobs, skipped) = plan_regions(&fasta_index, &args.regions, &profile);
    if jobs.is_empty() {
        bail!("no usable regions to simulate");
    }

    let plan = build_output_plan(&args, profile.paired && split_reads)?;
    let total_target: u64 = jobs
        .iter()
        .map(|job| ((job.end - job.start) * profile.coverage_depth) as u64)
        .sum();
    let progress = ProgressBarBuilder::new("Simulating reads")
        .with_template(
            "{spinner:.green} [{elapsed_precise}] {msg} [{wide_bar}] {pos}/{len} bases ({per_sec})",
        )
        .with_length(total_target)
        .with_tick()
        .build()?;

    let (msg_tx, msg_rx) = bounded::<OutputMessage>(OUTPUT_CHANNEL_DEPTH);
    let writer = output::spawn_writer(msg_rx, plan);

    let worker_count = args.threads.min(jobs.len());
    let (job_tx, job_rx) = bounded::<RegionJob>(jobs.len());
    let mut workers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = job_rx.clone();
        let msg_tx = msg_tx.clone();
        let profile = profile.clone();
        let fasta_file = args.fasta_file.clone();
        let progress = progress.clone();
        let log_mutations = args.mutation_log.is_some();
        workers.push(thread::spawn(move || {
            let mut results = Vec::new();
            while let Ok(job) = job_rx.recv() {
                let mut sink = ChannelSink::new(msg_tx.clone(), log_mutations);
                let outcome =
                    run_region(&fasta_file, &job, &profile, seed, &mut sink, &progress);
                results.push((job, outcome));
            }
            results
        }));
    }
    drop(job_rx);

    for job in jobs {
        job_tx
            .send(job)
            .map_err(|_| anyhow!("job channel closed before dispatch finished"))?;
    }
    drop(job_tx);

    let mut results: Vec<(RegionJob, Result<RegionOutcome>)> = Vec::new();
    for worker in workers {
        let mut part = worker
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))?;
        results.append(&mut part);
    }
    drop(msg_tx);
    let written = writer
        .join()
        .map_err(|_| anyhow!("writer thread panicked"))??;
    progress.finish_and_clear();

    let mut completed = 0usize;
    let mut entries: Vec<(u64, RegionReport)> = skipped;
    for (job, outcome) in results {
        let entry = match outcome {
            Ok(outcome) => {
                completed += 1;
                RegionReport {
                    sequence: job.rec.id.clone(),
                    start: job.start,
                    end: job.end,
                    target_bases: outcome.target_bases,
                    reads: outcome.reads,
                    bases_simulated: outcome.bases_simulated,
                    skipped: None,
                }
            }
            Err(err) => {
                error!(
                    "simulation failed for {}:{}-{}: {err:#}",
                    job.rec.id, job.start, job.end
                );
                RegionReport::skipped(
                    &job.rec.id,
                    job.start,
                    job.end,
                    format!("aborted: {err:#}"),
                )
            }
        };
        entries.push((job.seed_index, entry));
    }
    entries.sort_by_key(|(index, _)| *index);
    for (_, entry) in entries {
        report.push_region(entry);
    }

    if let Some(path) = &args.report {
        report.write(path)?;
        info!("run report written to {}", path.display());
    }
    println!(
        "Completed simulation for {} region(s): {} reads, {} bases.",
        completed, written, report.total_bases
    );
    Ok(())
}

/// Merges flags with the platform or file preset. Preset values clobber
/// the individual flags; optional preset fields fall through to them.
fn resolve_models(args: &SimulateArgs) -> Result<(SimulationProfile, bool)> {
    let bundle = match (&args.preset_file, args.platform) {
        (Some(path), _) => Some(sim::load_preset_file(path)?),
        (None, Some(platform)) => Some(platform.bundle()),
        (None, None) => None,
    };

    let mut read_len = LengthModel {
        mean: args.read_len_mean,
        std_dev: args.read_len_stddev,
        min: args.read_len_min,
        max: args.read_len_max,
    };
    let mut errors = ErrorModel {
        substitution_rate: args.error_rate,
        indel_rate: args.indel_rate,
        ambiguous_rate: args.ambig_rate,
        cluster_bias: args.cluster_bias,
        gc_boost: args.gc_boost,
        homopolymer_multiplier: args.homopolymer_multiplier,
        max_indel_len: args.max_indel_len,
    };
    let mut quality = args.quality_profile;
    let mut paired = args.paired;
    let mut split_reads = args.split_reads;
    let mut frag_mean = args.frag_len_mean;
    let mut frag_stddev = args.frag_len_stddev;

    if let Some(bundle) = bundle {
        read_len = LengthModel {
            mean: bundle.read_len_mean,
            std_dev: bundle.read_len_stddev,
            min: bundle.read_len_min,
            max: bundle.read_len_max,
        };
        errors = ErrorModel {
            substitution_rate: bundle.error_rate,
            indel_rate: bundle.indel_rate,
            ambiguous_rate: bundle.ambig_rate,
            cluster_bias: bundle.cluster_bias,
            gc_boost: bundle.gc_boost,
            homopolymer_multiplier: bundle.homopolymer_multiplier,
            max_indel_len: bundle.max_indel_len,
        };
        quality = bundle.quality_profile;
        paired = bundle.paired;
        if let Some(mean) = bundle.frag_len_mean {
            frag_mean = mean;
        }
        if let Some(stddev) = bundle.frag_len_stddev {
            frag_stddev = stddev;
        }
        if let Some(split) = bundle.split_reads {
            split_reads = split;
        }
    }

    let fragment_len = LengthModel {
        mean: frag_mean,
        std_dev: frag_stddev,
        min: read_len.min * 2,
        max: read_len.max * 2,
    };
    let profile = SimulationProfile {
        read_len,
        fragment_len,
        errors,
        quality,
        coverage_depth: args.depth,
        paired,
    };
    Ok((profile, split_reads))
}

/// Resolves requests against the index, clamping bounds and dropping
/// regions the profile cannot sample from. Returns the runnable jobs
/// plus the skipped entries, each tagged with its request position.
fn plan_regions(
    fasta_index: &FastaIndex,
    requests: &[RegionRequest],
    profile: &SimulationProfile,
) -> (Vec<RegionJob>, Vec<(u64, RegionReport)>) {
    let requests: Vec<RegionRequest> = if requests.is_empty() {
        info!("no regions requested, simulating every sequence in the index");
        fasta_index
            .records()
            .iter()
            .map(|rec| RegionRequest::whole(rec.id.clone()))
            .collect()
    } else {
        requests.to_vec()
    };

    let min_len = profile.min_region_len();
    let mut jobs = Vec::new();
    let mut skipped = Vec::new();
    for (seed_index, req) in requests.iter().enumerate() {
        let seed_index = seed_index as u64;
        let Some(rec) = fasta_index.get(&req.sequence) else {
            warn!(
                "sequence {} is not in the FASTA index, skipping region",
                req.sequence
            );
            skipped.push((
                seed_index,
                RegionReport::skipped(
                    &req.sequence,
                    req.start.unwrap_or(0),
                    req.end.unwrap_or(0),
                    "unknown sequence",
                ),
            ));
            continue;
        };
        let seq_len = rec.length as usize;
        let start = req.start.unwrap_or(0).min(seq_len);
        let end = req.end.unwrap_or(seq_len).min(seq_len);
        if start >= end {
            warn!("region {req} is empty after clamping to {seq_len} bases, skipping");
            skipped.push((
                seed_index,
                RegionReport::skipped(&req.sequence, start, end, "empty after clamping"),
            ));
            continue;
        }
        if end - start < min_len {
            warn!(
                "region {}:{}-{} is shorter than the minimum sampling length {}, skipping",
                req.sequence, start, end, min_len
            );
            skipped.push((
                seed_index,
                RegionReport::skipped(
                    &req.sequence,
                    start,
                    end,
                    format!("shorter than minimum sampling length {min_len}"),
                ),
            ));
            continue;
        }
        jobs.push(RegionJob {
            seed_index,
            rec: rec.clone(),
            start,
            end,
        });
    }
    (jobs, skipped)
}

fn build_output_plan(args: &SimulateArgs, split: bool) -> Result<OutputPlan> {
    let mutation_log = match args.mutation_log.as_deref() {
        Some(path) => Some(Destination::create(Some(path))?),
        None => None,
    };
    if split {
        let Some(out) = args.output.as_deref() else {
            bail!("--split-reads needs --output to derive the R1/R2 file names");
        };
        let (r1, r2) = output::mate_paths(out);
        info!("writing mates to {} and {}", r1.display(), r2.display());
        return Ok(OutputPlan {
            primary: Destination::create(Some(&r1))?,
            mate: Some(Destination::create(Some(&r2))?),
            mutation_log,
        });
    }
    Ok(OutputPlan {
        primary: Destination::create(args.output.as_deref())?,
        mate: None,
        mutation_log,
    })
}

fn run_region(
    fasta_file: &Path,
    job: &RegionJob,
    profile: &SimulationProfile,
    run_seed: u64,
    sink: &mut ChannelSink,
    progress: &ProgressBar,
) -> Result<RegionOutcome> {
    let archive = File::open(fasta_file)
        .with_context(|| format!("failed to open FASTA file {}", fasta_file.display()))?;
    let mut extractor = RegionExtractor::new(archive);
    let mut rng = StdRng::seed_from_u64(sim::region_seed(run_seed, job.seed_index));
    if profile.paired {
        sim::simulate_region_paired(
            &mut extractor,
            &job.rec,
            job.start,
            job.end,
            profile,
            &mut rng,
            sink,
            progress,
        )
    } else {
        sim::simulate_region(
            &mut extractor,
            &job.rec,
            job.start,
            job.end,
            profile,
            &mut rng,
            sink,
            progress,
        )
    }
}
