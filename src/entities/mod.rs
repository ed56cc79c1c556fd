// Entity Models - one module per published dataset
//
// Each module owns:
// - Field tables (canonical field → NASR column aliases) per source
// - Row filter + identity for the primary source
// - Join passes for secondary sources
// - The output record shape and its child sort orders

pub mod airport;
pub mod airway;
pub mod comm;
pub mod fix;
pub mod ils;
pub mod navaid;
pub mod procedure;
pub mod runway;

pub use airport::Airport;
pub use airway::{Airway, AirwaySegment};
pub use comm::CommOutlet;
pub use fix::Fix;
pub use ils::{IlsComponents, IlsSite};
pub use navaid::{Navaid, NavaidFlags, Tacan};
pub use procedure::{Procedure, ProcedureAirport, ProcedureKind, RouteSegment};
pub use runway::{Runway, RunwayEnd};

use crate::aggregator::Aggregator;
use crate::diagnostics::Diagnostics;
use crate::ingest::DatasetOutput;
use crate::serializer::finalize;
use serde::Serialize;

/// A record that can be published as part of a dataset document
pub trait Entity: Serialize {
    /// Put every child collection in its canonical order
    fn sort_children(&mut self) {}
}

/// Close a build: canonical order, sorted children, final entity count
pub(crate) fn finish<E: Entity>(parents: Aggregator<E>, mut diagnostics: Diagnostics) -> DatasetOutput<E> {
    let entities = finalize(parents);
    diagnostics.set_entities_written(entities.len());
    DatasetOutput {
        entities,
        diagnostics,
    }
}

/// Upper-cased text or "" (scalar name-like attributes are never null)
pub(crate) fn upper_or_empty(value: Option<&str>) -> String {
    value.map(str::to_uppercase).unwrap_or_default()
}
