// 📍 Fix Entity - Named fixes, intersections and RNAV waypoints from FIX_BASE
// Single source, no children: identifier + coordinates.

use super::{finish, Entity};
use crate::aggregator::Aggregator;
use crate::attributes::{FieldDefinition, FieldSet, IDENTIFIER, LATITUDE, LONGITUDE};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, ResolvedIdentity};
use crate::ingest::{DatasetOutput, PrimaryPass};
use crate::parser::SourceReader;
use crate::rules::RowFilter;
use crate::schema::Row;
use crate::serializer::coordinate;
use serde::Serialize;
use std::io::Read;

pub const DATASET: &str = "fixes";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fix {
    pub identifier: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Entity for Fix {}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        FieldSet::new("fix")
            .field(FieldDefinition::required(IDENTIFIER).with_aliases(&["FIX_ID", "IDENT"]))
            .with_required_coordinates(),
        RowFilter::new().require_identifier(IDENTIFIER).require_coordinates(),
        IdentityResolver::natural(IDENTIFIER, IdShape::Any),
    )
}

fn parse_fix(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<Fix, RejectReason> {
    Ok(Fix {
        identifier: identity.key.to_string(),
        latitude: coordinate(row.float(LATITUDE)).ok_or(RejectReason::ParseError)?,
        longitude: coordinate(row.float(LONGITUDE)).ok_or(RejectReason::ParseError)?,
    })
}

pub fn build<R: Read>(base: SourceReader<R>) -> Result<DatasetOutput<Fix>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_fix)?;

    Ok(finish(parents, diagnostics))
}
