// 🛠️ Build Pipeline - Opens extracts, builds one dataset, writes its document
// Orchestration layer: anyhow with path context on top of the typed engine errors.

use crate::config::BuildConfig;
use crate::diagnostics::Diagnostics;
use crate::entities::{airport, airway, comm, fix, ils, navaid, procedure, runway, Entity, ProcedureKind};
use crate::ingest::DatasetOutput;
use crate::parser::{SourceKind, SourceReader};
use crate::serializer::{render_document, write_document};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

// ============================================================================
// DATASETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Airports,
    Navaids,
    Fixes,
    Runways,
    Airways,
    Ils,
    Departures,
    Arrivals,
    Comms,
}

impl Dataset {
    pub const ALL: [Dataset; 9] = [
        Dataset::Airports,
        Dataset::Navaids,
        Dataset::Fixes,
        Dataset::Runways,
        Dataset::Airways,
        Dataset::Ils,
        Dataset::Departures,
        Dataset::Arrivals,
        Dataset::Comms,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Airports => airport::DATASET,
            Dataset::Navaids => navaid::DATASET,
            Dataset::Fixes => fix::DATASET,
            Dataset::Runways => runway::DATASET,
            Dataset::Airways => airway::DATASET,
            Dataset::Ils => ils::DATASET,
            Dataset::Departures => ProcedureKind::Departure.dataset(),
            Dataset::Arrivals => ProcedureKind::Arrival.dataset(),
            Dataset::Comms => comm::DATASET,
        }
    }

    /// Document file name inside the output directory
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Dataset::ALL
            .iter()
            .copied()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Dataset::ALL.iter().map(|d| d.name()).collect();
                format!("unknown dataset '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

// ============================================================================
// BUILD
// ============================================================================

/// BuildReport - what one successful dataset build produced
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub dataset: Dataset,
    pub path: PathBuf,
    pub entities: usize,
    pub diagnostics: Diagnostics,
}

fn open(config: &BuildConfig, kind: SourceKind) -> Result<SourceReader<File>> {
    let path = config.source_path(kind);
    debug!(source = kind.name(), path = %path.display(), "opening extract");
    SourceReader::open(kind, &path)
}

/// Secondary sources that may be absent from a bundle
fn open_optional(config: &BuildConfig, kind: SourceKind) -> Result<Option<SourceReader<File>>> {
    let path = config.source_path(kind);
    if !path.exists() {
        // Reported once by Diagnostics::log through missing_sources
        debug!(source = kind.name(), path = %path.display(), "optional extract not found");
        return Ok(None);
    }
    open(config, kind).map(Some)
}

fn render<E: Entity>(dataset: Dataset, output: DatasetOutput<E>) -> Result<(Vec<u8>, usize, Diagnostics)> {
    let bytes = render_document(dataset.name(), &output.entities)?;
    Ok((bytes, output.entities.len(), output.diagnostics))
}

fn build_procedures(config: &BuildConfig, dataset: Dataset, kind: ProcedureKind) -> Result<(Vec<u8>, usize, Diagnostics)> {
    let [base, route, airports] = kind.sources();
    let output = procedure::build(kind, open(config, base)?, open(config, route)?, open(config, airports)?)?;
    render(dataset, output)
}

/// Build one dataset from the configured extracts and write its document.
///
/// Nothing is written when the build fails or yields no entities.
pub fn build_dataset(dataset: Dataset, config: &BuildConfig) -> Result<BuildReport> {
    info!(dataset = %dataset, input = %config.input_dir.display(), "building dataset");

    let (bytes, entities, diagnostics) = match dataset {
        Dataset::Airports => {
            let output = airport::build(
                open(config, SourceKind::AptBase)?,
                open_optional(config, SourceKind::AptRwy)?,
                open_optional(config, SourceKind::Frq)?,
            )?;
            render(dataset, output)?
        }
        Dataset::Navaids => render(dataset, navaid::build(open(config, SourceKind::NavBase)?)?)?,
        Dataset::Fixes => render(dataset, fix::build(open(config, SourceKind::FixBase)?)?)?,
        Dataset::Runways => {
            let output = runway::build(open(config, SourceKind::AptRwy)?, open(config, SourceKind::AptRwyEnd)?)?;
            render(dataset, output)?
        }
        Dataset::Airways => {
            let output = airway::build(open(config, SourceKind::AwyBase)?, open(config, SourceKind::AwySegAlt)?)?;
            render(dataset, output)?
        }
        Dataset::Ils => {
            let output = ils::build(
                open(config, SourceKind::IlsBase)?,
                open(config, SourceKind::IlsDme)?,
                open(config, SourceKind::IlsGs)?,
                open(config, SourceKind::IlsMkr)?,
            )?;
            render(dataset, output)?
        }
        Dataset::Departures => build_procedures(config, dataset, ProcedureKind::Departure)?,
        Dataset::Arrivals => build_procedures(config, dataset, ProcedureKind::Arrival)?,
        Dataset::Comms => render(dataset, comm::build(open(config, SourceKind::Com)?)?)?,
    };

    let path = config.document_path(&dataset.file_name());
    write_document(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    diagnostics.log();

    Ok(BuildReport {
        dataset,
        path,
        entities,
        diagnostics,
    })
}

/// Build datasets in order, stopping at the first fatal error
pub fn build_all(datasets: &[Dataset], config: &BuildConfig) -> Result<Vec<BuildReport>> {
    let mut reports = Vec::with_capacity(datasets.len());
    for &dataset in datasets {
        let report = build_dataset(dataset, config).with_context(|| format!("Failed to build {}", dataset))?;
        reports.push(report);
    }
    Ok(reports)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use std::fs;
    use std::path::Path;

    fn config_in(dir: &Path) -> BuildConfig {
        BuildConfig::default()
            .with_input_dir(dir.join("in"))
            .with_output_dir(dir.join("out"))
    }

    fn write_source(config: &BuildConfig, kind: SourceKind, data: &str) {
        let path = config.source_path(kind);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_dataset_names_round_trip() {
        for dataset in Dataset::ALL {
            assert_eq!(dataset.name().parse::<Dataset>().unwrap(), dataset);
        }
        assert_eq!(" ILS ".parse::<Dataset>().unwrap(), Dataset::Ils);
        assert!("frequencies".parse::<Dataset>().is_err());
        assert_eq!(Dataset::Comms.file_name(), "comms.json");
    }

    #[test]
    fn test_airports_without_optional_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_source(
            &config,
            SourceKind::AptBase,
            "ARPT_ID,ARPT_NAME,SITE_TYPE_CODE,LAT_DECIMAL,LONG_DECIMAL\nKMSP,Minneapolis,A,44.88,-93.22\n",
        );

        let report = build_dataset(Dataset::Airports, &config).unwrap();

        assert_eq!(report.entities, 1);
        assert_eq!(report.diagnostics.missing_sources, vec!["APT_RWY", "FRQ"]);
        assert!(config.document_path("airports.json").exists());
    }

    #[test]
    fn test_missing_primary_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_dataset(Dataset::Fixes, &config_in(dir.path())).unwrap_err();

        assert!(err.to_string().contains("FIX_BASE"));
    }

    #[test]
    fn test_empty_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_source(&config, SourceKind::FixBase, "FIX_ID,LAT_DECIMAL,LONG_DECIMAL\n,44.0,-93.0\n");

        let err = build_dataset(Dataset::Fixes, &config).unwrap_err();

        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::EmptyOutput { .. })));
        assert!(!config.document_path("fixes.json").exists());
    }
}
