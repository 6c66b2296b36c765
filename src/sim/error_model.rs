//! Context-sensitive error injection. Each base of an extracted read is
//! visited once, left to right, and either copied, substituted, replaced
//! by an ambiguity, or caught up in an indel. The local sequence context
//! modulates the configured base rates before any die is rolled.

use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::sequence::{random_base, random_base_excluding};

/// Bases inspected on each side of the current position for GC content.
const GC_WINDOW: usize = 7;
/// GC fraction above which the substitution rate is boosted.
const GC_RICH_THRESHOLD: f64 = 0.6;
/// Run length at which homopolymer slippage kicks in.
const HOMOPOLYMER_MIN_RUN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorModel {
    pub substitution_rate: f64,
    pub indel_rate: f64,
    pub ambiguous_rate: f64,
    /// Multiplier applied to both rates right after a mutated position.
    pub cluster_bias: f64,
    /// Multiplier applied to the substitution rate in GC-rich windows.
    pub gc_boost: f64,
    /// Multiplier applied to the indel rate inside homopolymer runs.
    pub homopolymer_multiplier: f64,
    pub max_indel_len: usize,
}

impl ErrorModel {
    /// A model that copies its input untouched.
    pub fn faithful() -> Self {
        ErrorModel {
            substitution_rate: 0.0,
            indel_rate: 0.0,
            ambiguous_rate: 0.0,
            cluster_bias: 1.0,
            gc_boost: 1.0,
            homopolymer_multiplier: 1.0,
            max_indel_len: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("substitution", self.substitution_rate),
            ("indel", self.indel_rate),
            ("ambiguous base", self.ambiguous_rate),
        ];
        for (what, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                bail!("{what} rate {rate} must lie in [0, 1]");
            }
        }
        let multipliers = [
            ("cluster bias", self.cluster_bias),
            ("GC boost", self.gc_boost),
            ("homopolymer multiplier", self.homopolymer_multiplier),
        ];
        for (what, multiplier) in multipliers {
            if multiplier < 1.0 {
                bail!("{what} {multiplier} must be at least 1");
            }
        }
        if self.max_indel_len == 0 {
            bail!("maximum indel length must be at least 1");
        }
        Ok(())
    }

    /// Runs the error pass over `seq`. The result carries the mutated
    /// bases, a parallel error mask for quality synthesis, and a log line
    /// per mutation with read-local coordinates.
    pub fn inject<R: Rng>(&self, seq: &[u8], rng: &mut R) -> MutationResult {
        // worst case every position triggers a fully boosted insertion
        let indel_ceiling = (self.indel_rate * self.cluster_bias * self.homopolymer_multiplier)
            .min(1.0);
        let capacity = seq.len()
            + (seq.len() as f64 * indel_ceiling * self.max_indel_len as f64).ceil() as usize;
        let mut bases = Vec::with_capacity(capacity);
        let mut error_mask = Vec::with_capacity(capacity);
        let mut log = Vec::new();

        let mut last_was_error = false;
        let mut prev_base = 0u8;
        let mut run_len = 0usize;

        let mut i = 0;
        while i < seq.len() {
            let base = seq[i];
            if base == prev_base {
                run_len += 1;
            } else {
                run_len = 1;
            }
            prev_base = base;

            let mut sub_rate = self.substitution_rate;
            let mut indel_rate = self.indel_rate;
            if gc_fraction(seq, i) > GC_RICH_THRESHOLD {
                sub_rate *= self.gc_boost;
            }
            if run_len >= HOMOPOLYMER_MIN_RUN {
                indel_rate *= self.homopolymer_multiplier;
            }
            if last_was_error {
                sub_rate *= self.cluster_bias;
                indel_rate *= self.cluster_bias;
            }

            if self.ambiguous_rate > 0.0 && rng.gen::<f64>() < self.ambiguous_rate {
                bases.push(b'N');
                error_mask.push(true);
                log.push(format!("{} -> N @{}", base as char, i));
                last_was_error = true;
                i += 1;
                continue;
            }

            if sub_rate > 0.0 && rng.gen::<f64>() < sub_rate {
                let mutated = random_base_excluding(rng, base);
                bases.push(mutated);
                error_mask.push(true);
                log.push(format!("{} -> {} @{}", base as char, mutated as char, i));
                last_was_error = true;
                i += 1;
                continue;
            }

            if indel_rate > 0.0 {
                let draw = rng.gen::<f64>();
                if draw < indel_rate / 2.0 {
                    let del_len = self.max_indel_len.min(seq.len() - i);
                    log.push(format!(
                        "del @{}: {}",
                        i,
                        String::from_utf8_lossy(&seq[i..i + del_len])
                    ));
                    last_was_error = true;
                    i += del_len;
                    continue;
                } else if draw < indel_rate {
                    let ins_len = rng.gen_range(1..=self.max_indel_len);
                    let start = bases.len();
                    for _ in 0..ins_len {
                        bases.push(random_base(rng));
                        error_mask.push(true);
                    }
                    log.push(format!(
                        "ins @{}: {}",
                        i,
                        String::from_utf8_lossy(&bases[start..])
                    ));
                    bases.push(base);
                    error_mask.push(false);
                    last_was_error = true;
                    i += 1;
                    continue;
                }
            }

            bases.push(base);
            error_mask.push(false);
            last_was_error = false;
            i += 1;
        }

        MutationResult {
            bases,
            error_mask,
            log,
        }
    }
}

/// Fraction of G/C bases in a window of `GC_WINDOW` on either side of
/// `pos`, clipped at the sequence ends.
fn gc_fraction(seq: &[u8], pos: usize) -> f64 {
    let start = pos.saturating_sub(GC_WINDOW);
    let end = (pos + GC_WINDOW + 1).min(seq.len());
    let gc = seq[start..end]
        .iter()
        .filter(|&&b| super::sequence::is_gc(b))
        .count();
    gc as f64 / (end - start) as f64
}

/// Output of one error pass. `bases` and `error_mask` are the same
/// length; mask entries are true exactly where a base was fabricated.
#[derive(Debug)]
pub struct MutationResult {
    pub bases: Vec<u8>,
    pub error_mask: Vec<bool>,
    pub log: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> ErrorModel {
        ErrorModel::faithful()
    }

    #[test]
    fn zero_rates_copy_the_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let seq = b"ACGTACGTACGTACGT";
        let result = model().inject(seq, &mut rng);
        assert_eq!(result.bases, seq);
        assert!(result.error_mask.iter().all(|&e| !e));
        assert!(result.log.is_empty());
    }

    #[test]
    fn certain_ambiguity_masks_every_base() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut m = model();
        m.ambiguous_rate = 1.0;
        let result = m.inject(b"ACGTACGT", &mut rng);
        assert_eq!(result.bases, b"NNNNNNNN");
        assert!(result.error_mask.iter().all(|&e| e));
        assert_eq!(result.log.len(), 8);
    }

    #[test]
    fn substitutions_always_change_the_base() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut m = model();
        m.substitution_rate = 1.0;
        let seq = b"ACGTACGTACGTACGTACGT";
        let result = m.inject(seq, &mut rng);
        // no indels configured, so alignment is positional
        assert_eq!(result.bases.len(), seq.len());
        for (got, want) in result.bases.iter().zip(seq) {
            assert_ne!(got, want);
            assert_ne!(*got, b'N');
        }
        assert!(result.error_mask.iter().all(|&e| e));
    }

    #[test]
    fn mask_tracks_bases_through_indels() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut m = model();
        m.indel_rate = 0.4;
        m.max_indel_len = 3;
        let seq = b"ACGTACGTACGTACGTACGTACGTACGTACGT";
        let result = m.inject(seq, &mut rng);
        assert_eq!(result.bases.len(), result.error_mask.len());
        assert!(!result.log.is_empty());
    }

    #[test]
    fn deletion_log_names_the_removed_span() {
        let mut m = model();
        m.indel_rate = 1.0;
        m.max_indel_len = 3;
        let seq = b"ACGTACGTACGTACGTACGT";

        let mut saw_deletion = false;
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = m.inject(seq, &mut rng);
            for entry in &result.log {
                let Some(rest) = entry.strip_prefix("del @") else {
                    continue;
                };
                saw_deletion = true;
                let (pos, span) = rest.split_once(": ").unwrap();
                let pos: usize = pos.parse().unwrap();
                assert!(span.len() <= 3);
                assert_eq!(span.as_bytes(), &seq[pos..pos + span.len()]);
            }
        }
        assert!(saw_deletion, "no deletion drawn across seeds");
    }

    #[test]
    fn insertions_keep_the_template_base() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut m = model();
        m.indel_rate = 1.0;
        m.max_indel_len = 2;
        let seq = b"AAAATTTTCCCCGGGGAAAA";
        let result = m.inject(seq, &mut rng);

        // every inserted run is followed by the copied template base,
        // which the mask reports as genuine
        let mut insertions = 0;
        for entry in &result.log {
            if entry.starts_with("ins @") {
                insertions += 1;
            }
        }
        if insertions > 0 {
            assert!(result.error_mask.iter().any(|&e| !e));
        }
        assert_eq!(result.bases.len(), result.error_mask.len());
    }

    #[test]
    fn gc_rich_windows_boost_substitutions() {
        let mut m = model();
        m.substitution_rate = 1e-12;
        m.gc_boost = 2e12;
        let seq = b"GGGGGGGGGGGGGGGGAAAAAAAAAAAAAAAA";
        let mut rng = StdRng::seed_from_u64(21);
        let result = m.inject(seq, &mut rng);

        // the window slips to 9/15 GC at position 14, under the 0.6
        // threshold, so the boost stops two bases before the A block
        assert_eq!(result.bases.len(), seq.len());
        for (i, &is_error) in result.error_mask.iter().enumerate() {
            assert_eq!(is_error, i < 14, "position {i}");
        }
        for (i, (&got, &want)) in result.bases.iter().zip(seq).enumerate() {
            if i < 14 {
                assert_ne!(got, want, "position {i}");
            } else {
                assert_eq!(got, want, "position {i}");
            }
        }
    }

    #[test]
    fn homopolymer_runs_attract_indels() {
        let mut m = model();
        m.indel_rate = 1e-12;
        m.homopolymer_multiplier = 4e12;
        m.max_indel_len = 2;
        // slippage only arms once the run is three deep, and the boosted
        // rate makes the deletion branch certain there
        let seq = b"ACGTACGTAAAAAAAACGTCGTCG";
        let mut rng = StdRng::seed_from_u64(17);
        let result = m.inject(seq, &mut rng);

        assert_eq!(result.bases, b"ACGTACGTAACGTCGTCG");
        assert_eq!(result.log, vec!["del @10: AA", "del @12: AA", "del @14: AA"]);
        assert!(result.error_mask.iter().all(|&e| !e));
    }

    #[test]
    fn cluster_momentum_carries_errors_beyond_their_trigger() {
        let mut m = model();
        m.substitution_rate = 1e-12;
        m.gc_boost = 2e12;
        m.cluster_bias = 2e12;
        // the GC prefix seeds the first substitution, momentum then
        // sustains the boosted rate through the whole T tail
        let seq = b"GGGGGGGGTTTTTTTTTTTTTTTT";
        let mut rng = StdRng::seed_from_u64(8);
        let result = m.inject(seq, &mut rng);
        assert!(result.error_mask.iter().all(|&e| e));
        assert_eq!(result.log.len(), seq.len());

        // without momentum only the GC-boosted prefix mutates
        m.cluster_bias = 1.0;
        let mut rng = StdRng::seed_from_u64(8);
        let result = m.inject(seq, &mut rng);
        assert!(result.error_mask[..6].iter().all(|&e| e));
        assert!(result.error_mask[6..].iter().all(|&e| !e));
        assert_eq!(&result.bases[6..], &seq[6..]);
    }

    #[test]
    fn deletion_at_the_tail_is_clipped() {
        let mut m = model();
        m.indel_rate = 1.0;
        m.max_indel_len = 5;
        // single-base input: the only possible deletion removes one base
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = m.inject(b"A", &mut rng);
            assert!(result.bases.len() <= 6);
        }
    }

    #[test]
    fn validation_rejects_out_of_range_rates() {
        let mut m = model();
        m.substitution_rate = 1.5;
        assert!(m.validate().is_err());

        let mut m = model();
        m.indel_rate = -0.1;
        assert!(m.validate().is_err());

        let mut m = model();
        m.cluster_bias = 0.5;
        assert!(m.validate().is_err());

        let mut m = model();
        m.max_indel_len = 0;
        assert!(m.validate().is_err());

        assert!(model().validate().is_ok());
    }

    #[test]
    fn gc_fraction_uses_a_clipped_window() {
        let seq = b"GGGGGGGGAAAAAAAA";
        assert!(gc_fraction(seq, 0) > 0.9);
        assert!(gc_fraction(seq, 15) < 0.1);
        // position 8 sees seven G on the left, eight A to the right
        let mid = gc_fraction(seq, 8);
        assert!((0.4..0.6).contains(&mid), "mid fraction {mid}");
    }
}
