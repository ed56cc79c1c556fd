// ⚙️ Build Configuration - Where extracts come from and where documents go
// Layers: built-in defaults → nasr.toml (or --config) → NASR_* environment.

use crate::parser::SourceKind;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "nasr.toml";

/// Environment prefix; nested keys use `__` (NASR_SOURCES__APT_BASE=...)
pub const ENV_PREFIX: &str = "NASR_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding the extracted NASR CSV bundle
    pub input_dir: PathBuf,

    /// Directory receiving `<dataset>.json` and the manifest
    pub output_dir: PathBuf,

    /// Data cycle effective date (YYYY-MM-DD), used by the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<String>,

    /// File name per source, keyed by lower-cased source name (apt_base, com, ...)
    pub sources: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            cycle: None,
            sources: SourceKind::ALL
                .iter()
                .map(|kind| (source_key(*kind), kind.default_file()))
                .collect(),
        }
    }
}

impl BuildConfig {
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cycle(mut self, cycle: impl Into<String>) -> Self {
        self.cycle = Some(cycle.into());
        self
    }

    pub fn with_source_file(mut self, kind: SourceKind, file: impl Into<String>) -> Self {
        self.sources.insert(source_key(kind), file.into());
        self
    }

    /// Full path of a source extract; unconfigured sources use the NASR file name
    pub fn source_path(&self, kind: SourceKind) -> PathBuf {
        let file = self
            .sources
            .get(&source_key(kind))
            .cloned()
            .unwrap_or_else(|| kind.default_file());
        self.input_dir.join(file)
    }

    pub fn document_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Table key for a source: figment lower-cases environment keys
fn source_key(kind: SourceKind) -> String {
    kind.name().to_lowercase()
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `NASR_`)
/// 2. `path` (which must exist), or `nasr.toml` in the working directory if it exists
/// 3. Built-in defaults
///
/// CLI flags are applied by the caller on top of the result.
pub fn load_config(path: Option<&Path>) -> Result<BuildConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(BuildConfig::default()));

    match path {
        Some(file) => {
            if !file.exists() {
                let message = format!("config file not found: {}", file.display());
                return Err(Box::new(figment::Error::from(message)));
            }
            figment = figment.merge(Toml::file(file));
        }
        None => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                figment = figment.merge(Toml::file(local));
            }
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    figment.extract().map_err(Box::new)
}

// ============================================================================
// TESTS
// ============================================================================
