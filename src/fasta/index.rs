//! Builds, persists and loads the coordinate index that makes random
//! access into a flat FASTA file possible without reading the whole file.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Layout facts for one sequence: where its bases start in the file and
/// how they are wrapped into lines. `bases_per_line <= bytes_per_line`;
/// the difference is the line terminator width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: String,
    pub length: u64,
    pub offset: u64,
    pub bases_per_line: u64,
    pub bytes_per_line: u64,
}

/// All index records of one FASTA file, kept in file order so that runs
/// without an explicit region list always walk sequences deterministically.
#[derive(Debug, Clone)]
pub struct FastaIndex {
    records: Vec<IndexRecord>,
    by_id: HashMap<String, usize>,
}

impl FastaIndex {
    pub fn new(records: Vec<IndexRecord>) -> Self {
        let by_id = records
            .iter()
            .enumerate()
            .map(|(i, rec)| (rec.id.clone(), i))
            .collect();
        FastaIndex { records, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&IndexRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Scans a FASTA file and derives an [`IndexRecord`] per sequence.
///
/// Compressed inputs are rejected: the byte offsets recorded here are only
/// meaningful against the uncompressed archive that reads will seek into.
pub fn build_index(fasta_file: &Path) -> Result<Vec<IndexRecord>> {
    let file = File::open(fasta_file)
        .with_context(|| format!("failed to open FASTA file {}", fasta_file.display()))?;
    let (reader, format) = niffler::sniff(Box::new(file))
        .with_context(|| format!("failed to probe FASTA file {}", fasta_file.display()))?;
    if format != niffler::compression::Format::No {
        bail!(
            "{} is compressed ({format:?}); decompress it before indexing, \
             reads are extracted by byte offset",
            fasta_file.display()
        );
    }

    let mut reader = BufReader::new(reader);
    let mut records: Vec<IndexRecord> = Vec::new();
    let mut current: Option<IndexRecord> = None;
    let mut prev_line_bases: Option<u64> = None;
    let mut byte_count: u64 = 0;
    let mut line = String::new();

    loop {
        line.clear();
        let raw_len = reader
            .read_line(&mut line)
            .with_context(|| format!("failed to read {}", fasta_file.display()))? as u64;
        if raw_len == 0 {
            break;
        }
        let text = line.trim_end_matches(['\n', '\r']);

        if let Some(id) = text.strip_prefix('>') {
            if let Some(finished) = current.take() {
                validate_record(&finished, fasta_file)?;
                records.push(finished);
            }
            byte_count += raw_len;
            current = Some(IndexRecord {
                id: id.to_string(),
                length: 0,
                offset: byte_count,
                bases_per_line: 0,
                bytes_per_line: 0,
            });
            prev_line_bases = None;
            continue;
        }

        let Some(rec) = current.as_mut() else {
            bail!(
                "{} is not a FASTA file: sequence data before the first header",
                fasta_file.display()
            );
        };
        let bases = text.len() as u64;

        // Random access relies on uniform wrapping, so only the final
        // line of a sequence may be shorter than the first.
        if let Some(prev) = prev_line_bases {
            if prev != rec.bases_per_line {
                bail!(
                    "sequence {} has lines of differing length, cannot index {}",
                    rec.id,
                    fasta_file.display()
                );
            }
            if bases > rec.bases_per_line {
                bail!(
                    "sequence {} has lines of differing length, cannot index {}",
                    rec.id,
                    fasta_file.display()
                );
            }
        }
        if rec.bases_per_line == 0 && bases > 0 {
            rec.bases_per_line = bases;
            rec.bytes_per_line = raw_len;
        }
        rec.length += bases;
        prev_line_bases = Some(bases);
        byte_count += raw_len;
    }

    if let Some(finished) = current.take() {
        validate_record(&finished, fasta_file)?;
        records.push(finished);
    }
    if records.is_empty() {
        bail!("no sequences found in {}", fasta_file.display());
    }
    Ok(records)
}

fn validate_record(rec: &IndexRecord, fasta_file: &Path) -> Result<()> {
    if rec.length == 0 {
        bail!(
            "sequence {} in {} has no bases",
            rec.id,
            fasta_file.display()
        );
    }
    Ok(())
}

/// The sidecar path for a FASTA file: the same name with `.fai` appended.
pub fn sidecar_path(fasta_file: &Path) -> PathBuf {
    let mut name = fasta_file.as_os_str().to_os_string();
    name.push(".fai");
    PathBuf::from(name)
}

pub fn write_index(records: &[IndexRecord], index_file: &Path) -> Result<()> {
    let file = File::create(index_file)
        .with_context(|| format!("failed to create index file {}", index_file.display()))?;
    let mut writer = BufWriter::new(file);
    for rec in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            rec.id, rec.length, rec.offset, rec.bases_per_line, rec.bytes_per_line
        )
        .with_context(|| format!("failed to write index file {}", index_file.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write index file {}", index_file.display()))?;
    Ok(())
}

pub fn load_index(index_file: &Path) -> Result<FastaIndex> {
    let file = File::open(index_file)
        .with_context(|| format!("failed to open index file {}", index_file.display()))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line
            .with_context(|| format!("failed to read index file {}", index_file.display()))?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 5 {
            bail!(
                "malformed index line {} in {}: expected 5 fields, found {}",
                line_no + 1,
                index_file.display(),
                fields.len()
            );
        }
        let parse = |idx: usize, what: &str| -> Result<u64> {
            fields[idx].parse::<u64>().with_context(|| {
                format!(
                    "malformed {} on index line {} in {}",
                    what,
                    line_no + 1,
                    index_file.display()
                )
            })
        };
        records.push(IndexRecord {
            id: fields[0].to_string(),
            length: parse(1, "sequence length")?,
            offset: parse(2, "byte offset")?,
            bases_per_line: parse(3, "bases per line")?,
            bytes_per_line: parse(4, "bytes per line")?,
        });
    }

    if records.is_empty() {
        bail!("index file {} holds no records", index_file.display());
    }
    Ok(FastaIndex::new(records))
}

/// Loads the index sidecar for `fasta_file`, building it first when it is
/// missing or older than the FASTA itself.
pub fn ensure_index(fasta_file: &Path) -> Result<FastaIndex> {
    let index_file = sidecar_path(fasta_file);
    let rebuild = if !index_file.exists() {
        info!("no index found for {}, building one", fasta_file.display());
        true
    } else if is_stale(fasta_file, &index_file)? {
        warn!(
            "{} is older than the FASTA it indexes, rebuilding",
            index_file.display()
        );
        true
    } else {
        false
    };

    if rebuild {
        let records = build_index(fasta_file)?;
        write_index(&records, &index_file)?;
        info!(
            "indexed {} sequence(s) into {}",
            records.len(),
            index_file.display()
        );
    }
    load_index(&index_file)
}

fn is_stale(fasta_file: &Path, index_file: &Path) -> Result<bool> {
    let fasta_mtime = std::fs::metadata(fasta_file)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to stat {}", fasta_file.display()))?;
    let index_mtime = std::fs::metadata(index_file)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to stat {}", index_file.display()))?;
    Ok(fasta_mtime > index_mtime)
}
