//! JSON run report: the resolved model, the seed, and per-region
//! ground-truth totals, so a dataset can be regenerated or audited later.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::path::Path;

use crate::sim::SimulationProfile;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub tool: String,
    pub version: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub threads: usize,
    pub profile: SimulationProfile,
    pub regions: Vec<RegionReport>,
    pub total_reads: u64,
    pub total_bases: u64,
}

#[derive(Debug, Serialize)]
pub struct RegionReport {
    pub sequence: String,
    pub start: usize,
    pub end: usize,
    pub target_bases: usize,
    pub reads: u64,
    pub bases_simulated: usize,
    /// Reason this region produced nothing, when it was skipped or its
    /// simulation aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl RegionReport {
    pub fn skipped(sequence: &str, start: usize, end: usize, reason: impl Into<String>) -> Self {
        RegionReport {
            sequence: sequence.to_string(),
            start,
            end,
            target_bases: 0,
            reads: 0,
            bases_simulated: 0,
            skipped: Some(reason.into()),
        }
    }
}

impl RunReport {
    pub fn new(seed: u64, threads: usize, profile: SimulationProfile) -> Self {
        RunReport {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            seed,
            threads,
            profile,
            regions: Vec::new(),
            total_reads: 0,
            total_bases: 0,
        }
    }

    pub fn push_region(&mut self, region: RegionReport) {
        self.total_reads += region.reads;
        self.total_bases += region.bases_simulated as u64;
        self.regions.push(region);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write run report {}", path.display()))?;
        Ok(())
    }
}

fn serialize_datetime<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ErrorModel, LengthModel, QualityProfile};

    fn report() -> RunReport {
        let profile = SimulationProfile {
            read_len: LengthModel::fixed(150),
            fragment_len: LengthModel::fixed(600),
            errors: ErrorModel::faithful(),
            quality: QualityProfile::Short,
            coverage_depth: 5,
            paired: false,
        };
        RunReport::new(42, 2, profile)
    }

    #[test]
    fn totals_accumulate_over_regions() {
        let mut report = report();
        report.push_region(RegionReport {
            sequence: "chr1".to_string(),
            start: 0,
            end: 1000,
            target_bases: 5000,
            reads: 34,
            bases_simulated: 5100,
            skipped: None,
        });
        report.push_region(RegionReport::skipped("chrX", 0, 40, "shorter than minimum"));

        assert_eq!(report.total_reads, 34);
        assert_eq!(report.total_bases, 5100);
        assert_eq!(report.regions.len(), 2);
    }

    #[test]
    fn report_serializes_with_rfc3339_timestamp() {
        let mut report = report();
        report.push_region(RegionReport::skipped("chrU", 0, 0, "unknown sequence"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["profile"]["coverage_depth"], 5);
        assert_eq!(value["regions"][0]["skipped"], "unknown sequence");
        let stamp = value["created_at"].as_str().unwrap();
        assert!(
            chrono::DateTime::parse_from_rfc3339(stamp).is_ok(),
            "bad timestamp {stamp}"
        );
        // skipped regions omit nothing else, emitted ones omit the marker
        assert!(value["regions"][0].get("reads").is_some());
    }
}
