// NASR Builder - Core Library
// Turns the FAA NASR CSV bundle into deterministic per-dataset JSON documents.

pub mod error;
pub mod parser;
pub mod attributes;   // Canonical field names and per-source column aliases
pub mod schema;       // Header → canonical field resolution
pub mod identity;     // Natural and synthetic identifiers
pub mod rules;        // Row filter: required fields, coordinates, exclusions
pub mod aggregator;   // First-seen-wins entity map, deduplicating child sets
pub mod join;         // Exact + reduced-key fallback attachment
pub mod diagnostics;  // Per-source row accounting
pub mod ingest;       // Primary and join passes over a source
pub mod serializer;   // Canonical order, fixed precision, atomic writes
pub mod entities;     // One module per published dataset
pub mod config;
pub mod pipeline;
pub mod manifest;

// Re-export commonly used types
pub use aggregator::{Aggregator, ChildSet, CompositeKey};
pub use attributes::{FieldDefinition, FieldSet};
pub use config::{load_config, BuildConfig};
pub use diagnostics::{Diagnostics, RejectReason, SourceCounters};
pub use entities::{
    Airport, Airway, AirwaySegment, CommOutlet, Fix, IlsSite, Navaid, Procedure, ProcedureKind, Runway, RunwayEnd,
};
pub use error::BuildError;
pub use identity::{synthetic_identifier, IdentityResolver, IdShape, SyntheticKey};
pub use ingest::DatasetOutput;
pub use join::{JoinEngine, JoinOutcome, JoinStrategy};
pub use manifest::{write_manifest, Manifest};
pub use parser::{SourceKind, SourceReader};
pub use pipeline::{build_all, build_dataset, BuildReport, Dataset};
pub use rules::{ExclusionRule, RowFilter};
pub use schema::ResolvedSchema;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
