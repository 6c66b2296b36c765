use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::error_model::ErrorModel;
use super::length::LengthModel;
use super::quality::QualityProfile;

/// The fully resolved model set for one run, after flags and presets have
/// been merged. Everything downstream of the CLI works off this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    pub read_len: LengthModel,
    /// Bounds are derived from the read length model; only consulted in
    /// paired mode.
    pub fragment_len: LengthModel,
    pub errors: ErrorModel,
    pub quality: QualityProfile,
    pub coverage_depth: usize,
    pub paired: bool,
}

impl SimulationProfile {
    pub fn validate(&self) -> Result<()> {
        if self.coverage_depth == 0 {
            bail!("coverage depth must be at least 1");
        }
        self.read_len.validate("read")?;
        if self.paired {
            self.fragment_len.validate("fragment")?;
        }
        self.errors.validate()?;
        Ok(())
    }

    /// Shortest region this profile can sample from. Paired mode needs
    /// room for the shortest drawable fragment, single-end mode for the
    /// shortest drawable read; anything smaller would redraw forever.
    pub fn min_region_len(&self) -> usize {
        if self.paired {
            self.fragment_len.effective_min()
        } else {
            self.read_len.effective_min()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SimulationProfile {
        SimulationProfile {
            read_len: LengthModel::fixed(150),
            fragment_len: LengthModel {
                mean: 600,
                std_dev: 150,
                min: 100,
                max: 100000,
            },
            errors: ErrorModel::faithful(),
            quality: QualityProfile::Short,
            coverage_depth: 5,
            paired: false,
        }
    }

    #[test]
    fn valid_profile_passes() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let mut p = profile();
        p.coverage_depth = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn nested_models_are_checked() {
        let mut p = profile();
        p.errors.substitution_rate = 2.0;
        assert!(p.validate().is_err());

        let mut p = profile();
        p.read_len.min = 500;
        p.read_len.max = 100;
        assert!(p.validate().is_err());
    }

    #[test]
    fn fragment_model_is_only_checked_when_paired() {
        let mut p = profile();
        p.fragment_len.min = 900;
        p.fragment_len.max = 100;
        assert!(p.validate().is_ok());
        p.paired = true;
        assert!(p.validate().is_err());
    }

    #[test]
    fn minimum_region_length_depends_on_mode() {
        let mut p = profile();
        assert_eq!(p.min_region_len(), 150);

        p.read_len = LengthModel {
            mean: 250,
            std_dev: 10,
            min: 200,
            max: 300,
        };
        assert_eq!(p.min_region_len(), 200);

        p.paired = true;
        p.fragment_len = LengthModel {
            mean: 600,
            std_dev: 100,
            min: 400,
            max: 600,
        };
        assert_eq!(p.min_region_len(), 400);

        // a fixed fragment length needs the whole fragment to fit
        p.fragment_len = LengthModel::fixed(500);
        assert_eq!(p.min_region_len(), 500);
    }
}
