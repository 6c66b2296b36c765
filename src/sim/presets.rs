//! Named platform presets. A preset is a plain bundle of model values
//! that overwrites the corresponding command-line flags, so `--platform`
//! always wins over individually tuned rates.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::quality::QualityProfile;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    #[value(name = "illumina_hiseq")]
    IlluminaHiseq,
    #[value(name = "illumina_novaseq")]
    IlluminaNovaseq,
    #[value(name = "illumina_miseq")]
    IlluminaMiseq,
    #[value(name = "pacbio_hifi")]
    PacbioHifi,
    #[value(name = "pacbio_ccs")]
    PacbioCcs,
    #[value(name = "ont_minion")]
    OntMinion,
    #[value(name = "ont_promethion")]
    OntPromethion,
}

/// Everything a preset pins down. Optional fields leave the matching
/// flag untouched when absent, which is how long-read presets avoid
/// dragging paired-end fragment settings along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetBundle {
    pub read_len_mean: usize,
    pub read_len_stddev: usize,
    pub read_len_min: usize,
    pub read_len_max: usize,
    pub quality_profile: QualityProfile,
    pub error_rate: f64,
    pub indel_rate: f64,
    pub ambig_rate: f64,
    pub cluster_bias: f64,
    pub gc_boost: f64,
    pub max_indel_len: usize,
    pub homopolymer_multiplier: f64,
    pub paired: bool,
    #[serde(default)]
    pub frag_len_mean: Option<usize>,
    #[serde(default)]
    pub frag_len_stddev: Option<usize>,
    #[serde(default)]
    pub split_reads: Option<bool>,
}

impl Platform {
    pub fn bundle(&self) -> PresetBundle {
        match self {
            Platform::IlluminaHiseq => PresetBundle {
                read_len_mean: 150,
                read_len_stddev: 0,
                read_len_min: 150,
                read_len_max: 150,
                quality_profile: QualityProfile::Short,
                error_rate: 0.001,
                indel_rate: 0.0001,
                ambig_rate: 0.0,
                cluster_bias: 1.5,
                gc_boost: 1.2,
                max_indel_len: 1,
                homopolymer_multiplier: 1.0,
                paired: true,
                frag_len_mean: Some(400),
                frag_len_stddev: Some(50),
                split_reads: Some(true),
            },
            Platform::IlluminaNovaseq => PresetBundle {
                read_len_mean: 250,
                read_len_stddev: 10,
                read_len_min: 200,
                read_len_max: 300,
                quality_profile: QualityProfile::Short,
                error_rate: 0.002,
                indel_rate: 0.0005,
                ambig_rate: 0.0005,
                cluster_bias: 2.0,
                gc_boost: 1.3,
                max_indel_len: 2,
                homopolymer_multiplier: 1.5,
                paired: true,
                frag_len_mean: Some(600),
                frag_len_stddev: Some(100),
                split_reads: Some(true),
            },
            Platform::IlluminaMiseq => PresetBundle {
                read_len_mean: 250,
                read_len_stddev: 3,
                read_len_min: 243,
                read_len_max: 253,
                quality_profile: QualityProfile::Short,
                error_rate: 0.002,
                indel_rate: 0.0003,
                ambig_rate: 0.0002,
                cluster_bias: 1.2,
                gc_boost: 1.1,
                max_indel_len: 1,
                homopolymer_multiplier: 1.1,
                paired: true,
                frag_len_mean: None,
                frag_len_stddev: None,
                split_reads: Some(false),
            },
            Platform::PacbioHifi => PresetBundle {
                read_len_mean: 15000,
                read_len_stddev: 2000,
                read_len_min: 5000,
                read_len_max: 25000,
                quality_profile: QualityProfile::Long,
                error_rate: 0.005,
                indel_rate: 0.002,
                ambig_rate: 0.001,
                cluster_bias: 1.2,
                gc_boost: 1.1,
                max_indel_len: 3,
                homopolymer_multiplier: 1.2,
                paired: false,
                frag_len_mean: None,
                frag_len_stddev: None,
                split_reads: None,
            },
            Platform::PacbioCcs => PresetBundle {
                read_len_mean: 15000,
                read_len_stddev: 4000,
                read_len_min: 1000,
                read_len_max: 30000,
                quality_profile: QualityProfile::Long,
                error_rate: 0.01,
                indel_rate: 0.001,
                ambig_rate: 0.001,
                cluster_bias: 1.5,
                gc_boost: 1.2,
                max_indel_len: 2,
                homopolymer_multiplier: 2.0,
                paired: false,
                frag_len_mean: None,
                frag_len_stddev: None,
                split_reads: None,
            },
            Platform::OntMinion => PresetBundle {
                read_len_mean: 8000,
                read_len_stddev: 2500,
                read_len_min: 1000,
                read_len_max: 20000,
                quality_profile: QualityProfile::Long,
                error_rate: 0.08,
                indel_rate: 0.03,
                ambig_rate: 0.005,
                cluster_bias: 2.5,
                gc_boost: 1.5,
                max_indel_len: 5,
                homopolymer_multiplier: 3.5,
                paired: false,
                frag_len_mean: None,
                frag_len_stddev: None,
                split_reads: None,
            },
            Platform::OntPromethion => PresetBundle {
                read_len_mean: 12000,
                read_len_stddev: 3000,
                read_len_min: 2000,
                read_len_max: 30000,
                quality_profile: QualityProfile::Long,
                error_rate: 0.07,
                indel_rate: 0.025,
                ambig_rate: 0.003,
                cluster_bias: 2.2,
                gc_boost: 1.4,
                max_indel_len: 6,
                homopolymer_multiplier: 3.2,
                paired: false,
                frag_len_mean: None,
                frag_len_stddev: None,
                split_reads: None,
            },
        }
    }
}

/// Reads a user-supplied preset from TOML. The file uses the same field
/// names as the built-in bundles.
pub fn load_preset_file(path: &Path) -> Result<PresetBundle> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read preset file {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("failed to parse preset file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_presets_are_paired() {
        for platform in [
            Platform::IlluminaHiseq,
            Platform::IlluminaNovaseq,
            Platform::IlluminaMiseq,
        ] {
            let bundle = platform.bundle();
            assert!(bundle.paired);
            assert_eq!(bundle.quality_profile, QualityProfile::Short);
        }
    }

    #[test]
    fn long_read_presets_leave_fragment_flags_alone() {
        for platform in [
            Platform::PacbioHifi,
            Platform::PacbioCcs,
            Platform::OntMinion,
            Platform::OntPromethion,
        ] {
            let bundle = platform.bundle();
            assert!(!bundle.paired);
            assert_eq!(bundle.quality_profile, QualityProfile::Long);
            assert_eq!(bundle.frag_len_mean, None);
            assert_eq!(bundle.split_reads, None);
        }
    }

    #[test]
    fn hiseq_is_a_fixed_length_model() {
        let bundle = Platform::IlluminaHiseq.bundle();
        assert_eq!(bundle.read_len_stddev, 0);
        assert_eq!(bundle.read_len_mean, 150);
        assert_eq!(bundle.frag_len_mean, Some(400));
    }

    #[test]
    fn preset_file_round_trips_through_toml() {
        let bundle = Platform::OntMinion.bundle();
        let text = toml::to_string(&bundle).unwrap();
        let parsed: PresetBundle = toml::from_str(&text).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn preset_file_defaults_optional_fields() {
        let parsed: PresetBundle = toml::from_str(
            r#"
            read_len_mean = 5000
            read_len_stddev = 1000
            read_len_min = 500
            read_len_max = 12000
            quality_profile = "long"
            error_rate = 0.03
            indel_rate = 0.01
            ambig_rate = 0.001
            cluster_bias = 2.0
            gc_boost = 1.3
            max_indel_len = 4
            homopolymer_multiplier = 2.5
            paired = false
            "#,
        )
        .unwrap();
        assert_eq!(parsed.read_len_mean, 5000);
        assert_eq!(parsed.quality_profile, QualityProfile::Long);
        assert_eq!(parsed.frag_len_mean, None);
        assert_eq!(parsed.split_reads, None);
    }

    #[test]
    fn load_preset_file_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.toml");
        std::fs::write(&path, "read_len_mean = \"many\"").unwrap();
        assert!(load_preset_file(&path).is_err());
    }
}
