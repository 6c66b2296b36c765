use anyhow::Result;

use crate::cli::IndexArgs;
use crate::fasta::index;

/// Builds the index sidecar unconditionally, replacing any stale copy.
pub fn run(args: IndexArgs) -> Result<()> {
    let records = index::build_index(&args.fasta_file)?;
    let sidecar = index::sidecar_path(&args.fasta_file);
    index::write_index(&records, &sidecar)?;
    println!(
        "Indexed {} sequence(s) from {} into {}",
        records.len(),
        args.fasta_file.display(),
        sidecar.display()
    );
    Ok(())
}
