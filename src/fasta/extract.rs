//! Random access into an indexed FASTA file. Base coordinates are mapped
//! to byte offsets through the index geometry, so a draw only ever reads
//! the span it needs.

use anyhow::{Context, Result};
use std::io::{Read, Seek, SeekFrom};

use super::index::IndexRecord;

/// Maps a 0-based base position to its byte offset in the archive.
/// Every full line crossed before `base_pos` contributes its terminator
/// bytes on top of the bases themselves.
pub fn byte_offset(base_pos: u64, rec: &IndexRecord) -> u64 {
    let line_count = base_pos / rec.bases_per_line;
    rec.offset + base_pos + line_count * (rec.bytes_per_line - rec.bases_per_line)
}

/// Pulls base spans out of a seekable FASTA archive, reusing one scratch
/// buffer across draws. Generic over the reader so tests can drive it
/// with an in-memory cursor.
pub struct RegionExtractor<R> {
    archive: R,
    scratch: Vec<u8>,
}

impl<R: Read + Seek> RegionExtractor<R> {
    pub fn new(archive: R) -> Self {
        RegionExtractor {
            archive,
            scratch: Vec::new(),
        }
    }

    /// Reads the bases covering `[base_start, base_end)` of `rec` and
    /// strips the line terminators. The returned slice is valid until the
    /// next call. A short result means the archive ended early; callers
    /// decide whether that is tolerable.
    pub fn extract(&mut self, rec: &IndexRecord, base_start: u64, base_end: u64) -> Result<&[u8]> {
        let byte_start = byte_offset(base_start, rec);
        let byte_end = byte_offset(base_end, rec);
        let span = (byte_end - byte_start) as usize;

        self.scratch.resize(span, 0);
        self.archive
            .seek(SeekFrom::Start(byte_start))
            .with_context(|| format!("failed to seek to byte {byte_start}"))?;

        // The final line of the final sequence may lack its terminator, so
        // a read that stops at end-of-file is still a complete extraction.
        let mut filled = 0;
        while filled < span {
            let n = self
                .archive
                .read(&mut self.scratch[filled..span])
                .with_context(|| format!("failed to read bytes {byte_start}..{byte_end}"))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.scratch.truncate(filled);
        self.scratch.retain(|&b| b != b'\n' && b != b'\r');
        Ok(&self.scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(offset: u64, length: u64, bases: u64, bytes: u64) -> IndexRecord {
        IndexRecord {
            id: "chr1".to_string(),
            length,
            offset,
            bases_per_line: bases,
            bytes_per_line: bytes,
        }
    }

    #[test]
    fn offsets_account_for_line_terminators() {
        let rec = record(100, 600, 60, 61);
        assert_eq!(byte_offset(0, &rec), 100);
        assert_eq!(byte_offset(59, &rec), 159);
        // first base of the second line skips one newline
        assert_eq!(byte_offset(60, &rec), 161);
        assert_eq!(byte_offset(120, &rec), 222);
    }

    #[test]
    fn offsets_account_for_crlf_terminators() {
        let rec = record(7, 100, 10, 12);
        assert_eq!(byte_offset(9, &rec), 16);
        assert_eq!(byte_offset(10, &rec), 19);
        assert_eq!(byte_offset(25, &rec), 7 + 25 + 2 * 2);
    }

    #[test]
    fn extracts_across_line_boundaries() {
        let fasta = b">chr1\nACGTACGTAC\nGGGGCCCCAA\nTTTTAAAACC\n";
        let rec = record(6, 30, 10, 11);
        let mut extractor = RegionExtractor::new(Cursor::new(fasta.to_vec()));

        let bases = extractor.extract(&rec, 5, 15).unwrap();
        assert_eq!(bases, b"CGTACGGGGC");

        // scratch buffer is reused between draws
        let bases = extractor.extract(&rec, 0, 30).unwrap();
        assert_eq!(bases, b"ACGTACGTACGGGGCCCCAATTTTAAAACC");

        let bases = extractor.extract(&rec, 28, 30).unwrap();
        assert_eq!(bases, b"CC");
    }

    #[test]
    fn extracts_crlf_wrapped_bases() {
        let fasta = b">chr1\r\nACGTA\r\nCGTAC\r\nGT\r\n";
        let rec = record(7, 12, 5, 7);
        let mut extractor = RegionExtractor::new(Cursor::new(fasta.to_vec()));

        let bases = extractor.extract(&rec, 3, 11).unwrap();
        assert_eq!(bases, b"TACGTACG");
    }

    #[test]
    fn tolerates_missing_final_newline() {
        let fasta = b">chr1\nACGT";
        let rec = record(6, 4, 4, 5);
        let mut extractor = RegionExtractor::new(Cursor::new(fasta.to_vec()));

        let bases = extractor.extract(&rec, 0, 4).unwrap();
        assert_eq!(bases, b"ACGT");
    }

    #[test]
    fn truncated_archive_yields_short_result() {
        // index claims 20 bases but the archive holds 8
        let fasta = b">chr1\nACGTACGT\n";
        let rec = record(6, 20, 20, 21);
        let mut extractor = RegionExtractor::new(Cursor::new(fasta.to_vec()));

        let bases = extractor.extract(&rec, 0, 20).unwrap();
        assert_eq!(bases, b"ACGTACGT");
    }
}
