use rand::Rng;

pub const NUCLEOTIDES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Watson-Crick complement. Ambiguous or foreign symbols collapse to `N`
/// rather than failing a whole draw.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'T' | b't' => b'A',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

pub fn is_gc(base: u8) -> bool {
    matches!(base, b'G' | b'g' | b'C' | b'c')
}

pub fn random_base<R: Rng>(rng: &mut R) -> u8 {
    NUCLEOTIDES[rng.gen_range(0..NUCLEOTIDES.len())]
}

/// Draws a base guaranteed to differ from `exclude`, so a substitution is
/// always visible in the output.
pub fn random_base_excluding<R: Rng>(rng: &mut R, exclude: u8) -> u8 {
    loop {
        let base = random_base(rng);
        if base != exclude {
            return base;
        }
    }
}
