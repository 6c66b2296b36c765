//! Read output. Workers hand finished records to a [`ReadSink`]; the
//! process-wide writer thread is the only place FASTQ bytes are formed,
//! which keeps pair mates adjacent and file writes race-free.

use anyhow::{anyhow, Context, Result};
use bio::io::fastq;
use crossbeam_channel::{Receiver, Sender};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crate::types::ReadRecord;

/// Where simulated reads go. Implementations decide whether that is a
/// channel to the writer thread, a memory buffer, or something else.
pub trait ReadSink {
    fn write_read(&mut self, read: ReadRecord) -> Result<()>;

    fn write_pair(&mut self, read1: ReadRecord, read2: ReadRecord) -> Result<()>;

    /// Sinks that do not route mutation logs anywhere report false so the
    /// simulation can skip the formatting work.
    fn wants_mutation_log(&self) -> bool {
        false
    }

    fn write_mutation_line(&mut self, read_id: &str, event: &str) -> Result<()> {
        let _ = (read_id, event);
        Ok(())
    }
}

pub enum OutputMessage {
    Read(ReadRecord),
    Pair(ReadRecord, ReadRecord),
    MutationLine(String),
}

/// Worker-side sink: forwards everything to the writer thread.
pub struct ChannelSink {
    tx: Sender<OutputMessage>,
    log_mutations: bool,
}

impl ChannelSink {
    pub fn new(tx: Sender<OutputMessage>, log_mutations: bool) -> Self {
        ChannelSink { tx, log_mutations }
    }

    fn send(&self, message: OutputMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| anyhow!("output channel closed"))
    }
}

impl ReadSink for ChannelSink {
    fn write_read(&mut self, read: ReadRecord) -> Result<()> {
        self.send(OutputMessage::Read(read))
    }

    fn write_pair(&mut self, read1: ReadRecord, read2: ReadRecord) -> Result<()> {
        self.send(OutputMessage::Pair(read1, read2))
    }

    fn wants_mutation_log(&self) -> bool {
        self.log_mutations
    }

    fn write_mutation_line(&mut self, read_id: &str, event: &str) -> Result<()> {
        self.send(OutputMessage::MutationLine(format!("{read_id} MUT {event}")))
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub reads: Vec<ReadRecord>,
    pub pairs: Vec<(ReadRecord, ReadRecord)>,
    pub mutation_lines: Vec<String>,
    pub log_mutations: bool,
}

impl ReadSink for MemorySink {
    fn write_read(&mut self, read: ReadRecord) -> Result<()> {
        self.reads.push(read);
        Ok(())
    }

    fn write_pair(&mut self, read1: ReadRecord, read2: ReadRecord) -> Result<()> {
        self.pairs.push((read1, read2));
        Ok(())
    }

    fn wants_mutation_log(&self) -> bool {
        self.log_mutations
    }

    fn write_mutation_line(&mut self, read_id: &str, event: &str) -> Result<()> {
        self.mutation_lines.push(format!("{read_id} MUT {event}"));
        Ok(())
    }
}

/// An output target, opened in the main thread so path errors surface
/// before any simulation work starts. The compression wrapper is only
/// applied on the writer thread.
#[derive(Debug)]
pub enum Destination {
    Stdout,
    Plain(File),
    Gzip(File),
}

impl Destination {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Destination::Stdout);
        };
        let file = File::create(path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            Ok(Destination::Gzip(file))
        } else {
            Ok(Destination::Plain(file))
        }
    }

    fn into_boxed_writer(self) -> Result<Box<dyn Write>> {
        match self {
            Destination::Stdout => Ok(Box::new(io::stdout())),
            Destination::Plain(file) => Ok(Box::new(BufWriter::new(file))),
            Destination::Gzip(file) => niffler::get_writer(
                Box::new(file),
                niffler::compression::Format::Gzip,
                niffler::Level::Six,
            )
            .context("failed to initialize gzip writer"),
        }
    }

    fn into_fastq_writer(self) -> Result<fastq::Writer<Box<dyn Write>>> {
        Ok(fastq::Writer::new(self.into_boxed_writer()?))
    }
}

/// The open destinations of one run.
#[derive(Debug)]
pub struct OutputPlan {
    pub primary: Destination,
    /// Second mate destination; pairs are interleaved into `primary`
    /// when absent.
    pub mate: Option<Destination>,
    pub mutation_log: Option<Destination>,
}

/// Derives the `_R1`/`_R2` file names for split paired output, keeping
/// the compression suffix in place.
pub fn mate_paths(output: &Path) -> (PathBuf, PathBuf) {
    let name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let (stem, ext) = [".fastq.gz", ".fq.gz", ".fastq", ".fq"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext).map(|stem| (stem, *ext)))
        .unwrap_or((name, ".fq"));
    (
        output.with_file_name(format!("{stem}_R1{ext}")),
        output.with_file_name(format!("{stem}_R2{ext}")),
    )
}

/// Spawns the writer thread. It drains the channel until every sender is
/// dropped, then flushes and reports how many reads it wrote.
pub fn spawn_writer(
    rx: Receiver<OutputMessage>,
    plan: OutputPlan,
) -> thread::JoinHandle<Result<u64>> {
    thread::spawn(move || {
        let mut primary = plan.primary.into_fastq_writer()?;
        let mut mate = match plan.mate {
            Some(dest) => Some(dest.into_fastq_writer()?),
            None => None,
        };
        let mut mutation_log = match plan.mutation_log {
            Some(dest) => Some(dest.into_boxed_writer()?),
            None => None,
        };

        let mut written = 0u64;
        for message in rx {
            match message {
                OutputMessage::Read(read) => {
                    write_record(&mut primary, &read)?;
                    written += 1;
                }
                OutputMessage::Pair(read1, read2) => {
                    write_record(&mut primary, &read1)?;
                    match mate.as_mut() {
                        Some(writer) => write_record(writer, &read2)?,
                        None => write_record(&mut primary, &read2)?,
                    }
                    written += 2;
                }
                OutputMessage::MutationLine(line) => {
                    if let Some(writer) = mutation_log.as_mut() {
                        writeln!(writer, "{line}").context("failed to write mutation log")?;
                    }
                }
            }
        }

        primary.flush().context("failed to flush read output")?;
        if let Some(writer) = mate.as_mut() {
            writer.flush().context("failed to flush mate output")?;
        }
        if let Some(writer) = mutation_log.as_mut() {
            writer.flush().context("failed to flush mutation log")?;
        }
        Ok(written)
    })
}

fn write_record<W: Write>(writer: &mut fastq::Writer<W>, read: &ReadRecord) -> Result<()> {
    let record = fastq::Record::with_attrs(&read.id, None, &read.sequence, &read.quality);
    writer
        .write_record(&record)
        .with_context(|| format!("failed to write read {}", read.id))
}
