//! Per-base quality synthesis. Scores are shaped by position and by the
//! error mask from the injection pass, never by alignment.

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const PHRED_OFFSET: u8 = 33;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    /// Illumina-shaped curve: ramp up, plateau, gentle tail decay.
    #[value(name = "short")]
    Short,
    /// Noisy long-read baseline with occasional local dips.
    #[value(name = "long")]
    Long,
}

impl QualityProfile {
    /// Produces one Phred+33 score per entry of `error_mask`. Masked
    /// positions always score low so that injected errors are visibly
    /// less trustworthy than real bases.
    pub fn synthesize<R: Rng>(&self, error_mask: &[bool], rng: &mut R) -> Vec<u8> {
        match self {
            QualityProfile::Short => short_read_scores(error_mask, rng),
            QualityProfile::Long => long_read_scores(error_mask, rng),
        }
    }
}

fn short_read_scores<R: Rng>(error_mask: &[bool], rng: &mut R) -> Vec<u8> {
    let len = error_mask.len();
    let mut scores = Vec::with_capacity(len);
    for (i, &is_error) in error_mask.iter().enumerate() {
        if is_error {
            scores.push(PHRED_OFFSET + 10 + rng.gen_range(0..6));
            continue;
        }
        let pos = i as f64;
        let score = if pos < 20.0 {
            30.0 + 10.0 * pos / 20.0
        } else if pos < 50.0 {
            40.0
        } else {
            (40.0 - (pos - 50.0) / (len as f64 - 50.0) * 10.0).max(30.0)
        };
        scores.push(PHRED_OFFSET + score as u8);
    }
    scores
}

fn long_read_scores<R: Rng>(error_mask: &[bool], rng: &mut R) -> Vec<u8> {
    let mut scores = Vec::with_capacity(error_mask.len());
    for &is_error in error_mask {
        if is_error {
            scores.push(PHRED_OFFSET + 7 + rng.gen_range(0..4));
            continue;
        }
        let mut score: i32 = 10 + rng.gen_range(0..10);
        if rng.gen::<f64>() < 0.02 {
            score -= rng.gen_range(0..6);
        }
        scores.push(PHRED_OFFSET + score.max(5) as u8);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn short_profile_follows_the_position_curve() {
        let mut rng = StdRng::seed_from_u64(1);
        let mask = vec![false; 150];
        let scores = QualityProfile::Short.synthesize(&mask, &mut rng);

        assert_eq!(scores.len(), 150);
        assert_eq!(scores[0], PHRED_OFFSET + 30);
        assert_eq!(scores[10], PHRED_OFFSET + 35);
        assert_eq!(scores[19], PHRED_OFFSET + 39);
        for &q in &scores[20..50] {
            assert_eq!(q, PHRED_OFFSET + 40);
        }
        // tail decays but never below Q30
        assert_eq!(scores[50], PHRED_OFFSET + 40);
        assert_eq!(scores[149], PHRED_OFFSET + 30);
        for window in scores[50..].windows(2) {
            assert!(window[1] <= window[0]);
        }
        for &q in &scores {
            assert!(q >= PHRED_OFFSET + 30);
        }
    }

    #[test]
    fn short_profile_handles_reads_shorter_than_the_plateau() {
        let mut rng = StdRng::seed_from_u64(2);
        let scores = QualityProfile::Short.synthesize(&vec![false; 30], &mut rng);
        assert_eq!(scores.len(), 30);
        assert_eq!(scores[29], PHRED_OFFSET + 40);
    }

    #[test]
    fn short_profile_marks_error_positions_low() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut mask = vec![false; 100];
        mask[0] = true;
        mask[42] = true;
        mask[99] = true;
        let scores = QualityProfile::Short.synthesize(&mask, &mut rng);

        for (i, &is_error) in mask.iter().enumerate() {
            if is_error {
                assert!(
                    (PHRED_OFFSET + 10..=PHRED_OFFSET + 15).contains(&scores[i]),
                    "error position {i} scored {}",
                    scores[i]
                );
            } else {
                assert!(scores[i] >= PHRED_OFFSET + 30);
            }
        }
    }

    #[test]
    fn long_profile_stays_in_its_band() {
        let mut rng = StdRng::seed_from_u64(4);
        let mask = vec![false; 5000];
        let scores = QualityProfile::Long.synthesize(&mask, &mut rng);

        for &q in &scores {
            assert!((PHRED_OFFSET + 5..=PHRED_OFFSET + 19).contains(&q));
        }
        // dips push some scores below the 10..19 baseline
        assert!(scores.iter().any(|&q| q < PHRED_OFFSET + 10));
    }

    #[test]
    fn long_profile_marks_error_positions_low() {
        let mut rng = StdRng::seed_from_u64(5);
        let mask = vec![true; 400];
        let scores = QualityProfile::Long.synthesize(&mask, &mut rng);
        for &q in &scores {
            assert!((PHRED_OFFSET + 7..=PHRED_OFFSET + 10).contains(&q));
        }
    }
}
