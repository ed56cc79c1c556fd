// 📋 Build Manifest - Cycle, timestamp and entity counts for a published bundle
// Counts are read back from the documents on disk, not from the build that wrote them.

use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::pipeline::Dataset;
use crate::serializer::write_document;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "aviation_manifest.json";

const CYCLE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub faa_cycle: String,
    pub build_timestamp: String,
    /// Dataset name → entities in its document (0 when missing or unreadable)
    pub counts: BTreeMap<String, u64>,
}

impl Manifest {
    pub fn new(cycle: NaiveDate, built_at: DateTime<Utc>, counts: BTreeMap<String, u64>) -> Self {
        Manifest {
            faa_cycle: cycle.format(CYCLE_FORMAT).to_string(),
            build_timestamp: built_at.format(TIMESTAMP_FORMAT).to_string(),
            counts,
        }
    }
}

/// Parse a YYYY-MM-DD cycle date
pub fn parse_cycle(cycle: &str) -> Result<NaiveDate, BuildError> {
    NaiveDate::parse_from_str(cycle.trim(), CYCLE_FORMAT).map_err(|_| BuildError::InvalidCycle {
        cycle: cycle.to_string(),
    })
}

/// Number of entities in a published document
fn document_count(path: &Path) -> u64 {
    let parsed = fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Vec<serde_json::Value>>(&bytes).ok());

    match parsed {
        Some(entities) => entities.len() as u64,
        None => {
            debug!(path = %path.display(), "document missing or unreadable; counted as 0");
            0
        }
    }
}

/// Entity counts for every dataset in the output directory
pub fn collect_counts(output_dir: &Path) -> BTreeMap<String, u64> {
    Dataset::ALL
        .iter()
        .map(|d| (d.name().to_string(), document_count(&output_dir.join(d.file_name()))))
        .collect()
}

/// Validate the cycle, count the published documents and write the manifest
pub fn write_manifest(config: &BuildConfig, cycle: &str) -> Result<Manifest> {
    let cycle = parse_cycle(cycle)?;
    let manifest = Manifest::new(cycle, Utc::now(), collect_counts(&config.output_dir));

    let path = config.document_path(MANIFEST_FILE);
    let bytes = serde_json::to_vec_pretty(&manifest)?;
    write_document(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(cycle = %manifest.faa_cycle, path = %path.display(), "manifest written");
    Ok(manifest)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cycle_must_be_a_date() {
        assert_eq!(parse_cycle("2026-01-22").unwrap(), NaiveDate::from_ymd_opt(2026, 1, 22).unwrap());
        assert!(matches!(parse_cycle("2026-13-01"), Err(BuildError::InvalidCycle { .. })));
        assert!(matches!(parse_cycle("next week"), Err(BuildError::InvalidCycle { .. })));
    }

    #[test]
    fn test_timestamp_is_utc_with_z_suffix() {
        let built_at = Utc.with_ymd_and_hms(2026, 1, 22, 9, 5, 0).unwrap();
        let manifest = Manifest::new(NaiveDate::from_ymd_opt(2026, 1, 22).unwrap(), built_at, BTreeMap::new());

        assert_eq!(manifest.faa_cycle, "2026-01-22");
        assert_eq!(manifest.build_timestamp, "2026-01-22T09:05:00Z");
    }

    #[test]
    fn test_counts_read_from_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fixes.json"), r#"[{"identifier":"ABC"},{"identifier":"DEF"}]"#).unwrap();
        fs::write(dir.path().join("navaids.json"), "not json").unwrap();

        let counts = collect_counts(dir.path());

        assert_eq!(counts.len(), Dataset::ALL.len());
        assert_eq!(counts["fixes"], 2);
        assert_eq!(counts["navaids"], 0);
        assert_eq!(counts["airports"], 0);
    }

    #[test]
    fn test_write_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::default().with_output_dir(dir.path());
        fs::write(dir.path().join("comms.json"), "[{}]").unwrap();

        let manifest = write_manifest(&config, "2026-02-19").unwrap();
        let on_disk: Manifest =
            serde_json::from_slice(&fs::read(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();

        assert_eq!(on_disk, manifest);
        assert_eq!(on_disk.counts["comms"], 1);
    }

    #[test]
    fn test_invalid_cycle_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::default().with_output_dir(dir.path());

        let err = write_manifest(&config, "2026/02/19").unwrap_err();

        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::InvalidCycle { .. })));
        assert!(!dir.path().join(MANIFEST_FILE).exists());
    }
}
