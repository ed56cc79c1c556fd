// 🧭 Procedure Entity - Departures (DP) and arrivals (STAR)
// Primary: *_BASE keyed by computer code. Children: *_RTE (route), *_APT (served airports).

use super::{finish, Entity};
use crate::aggregator::{Aggregator, ChildSet};
use crate::attributes::{FieldDefinition, FieldSet, AIRPORT, IDENTIFIER, NAME, RUNWAY, SEQUENCE, STATUS, TYPE};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, KeyPart, ResolvedIdentity};
use crate::ingest::{DatasetOutput, JoinPass, PrimaryPass};
use crate::join::JoinEngine;
use crate::parser::{SourceKind, SourceReader};
use crate::rules::RowFilter;
use crate::schema::Row;
use crate::serializer::sequence_key;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

/// Route columns carried into each segment under their lower-cased name
pub const ROUTE_COLUMNS: &[&str] = &[
    "FIX_ID",
    "FIX_TYPE",
    "NAV_ID",
    "NAV_TYPE",
    "PATH_TERM",
    "ALT_DESC",
    "SPEED",
    "SPEED_ALT",
    "RNV_LEG",
    "TRANSITION",
    "POINT",
    "POINT_TYPE",
    "NEXT_POINT",
    "ROUTE_NAME",
    "BODY_SEQ",
    "ARPT_RWY_ASSOC",
];

// ============================================================================
// PROCEDURE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Departure,
    Arrival,
}

impl ProcedureKind {
    pub fn dataset(&self) -> &'static str {
        match self {
            ProcedureKind::Departure => "departures",
            ProcedureKind::Arrival => "arrivals",
        }
    }

    /// (base, route, airports) extracts
    pub fn sources(&self) -> [SourceKind; 3] {
        match self {
            ProcedureKind::Departure => [SourceKind::DpBase, SourceKind::DpRte, SourceKind::DpApt],
            ProcedureKind::Arrival => [SourceKind::StarBase, SourceKind::StarRte, SourceKind::StarApt],
        }
    }

    fn id_aliases(&self) -> &'static [&'static str] {
        match self {
            ProcedureKind::Departure => &["DP_COMPUTER_CODE", "DP_NAME", "DP_ID"],
            ProcedureKind::Arrival => &[
                "STAR_COMPUTER_CODE",
                "ARRIVAL_NAME",
                "STAR_ID",
                "SID_STAR_ID",
                "ID",
            ],
        }
    }

    fn name_aliases(&self) -> &'static [&'static str] {
        match self {
            ProcedureKind::Departure => &["DP_NAME"],
            ProcedureKind::Arrival => &["ARRIVAL_NAME", "STAR_NAME", "NAME"],
        }
    }

    fn type_aliases(&self) -> &'static [&'static str] {
        match self {
            ProcedureKind::Departure => &["DP_TYPE", "GRAPHICAL_DP_TYPE"],
            ProcedureKind::Arrival => &["STAR_TYPE", "TYPE"],
        }
    }

    fn id_field(&self) -> FieldDefinition {
        FieldDefinition::required(IDENTIFIER).with_aliases(self.id_aliases())
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RouteSegment {
    pub seq: Option<i64>,

    /// Lower-cased column name → value, non-empty columns only
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl RouteSegment {
    fn attribute(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProcedureAirport {
    pub airport_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Procedure {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub procedure_type: Option<String>,
    pub status: Option<String>,
    pub airports: ChildSet<ProcedureAirport>,
    pub route: ChildSet<RouteSegment>,
}

impl Entity for Procedure {
    fn sort_children(&mut self) {
        self.airports.sort();
        self.route.sort_by(|a, b| {
            (sequence_key(a.seq), a.attribute("fix_id"), a.attribute("nav_id"))
                .cmp(&(sequence_key(b.seq), b.attribute("fix_id"), b.attribute("nav_id")))
                .then_with(|| a.cmp(b))
        });
    }
}

// ============================================================================
// PASSES
// ============================================================================

fn procedure_key() -> IdentityResolver {
    IdentityResolver::composite(vec![KeyPart::required(IDENTIFIER, IdShape::Any)])
}

pub fn primary_pass(kind: ProcedureKind) -> PrimaryPass {
    PrimaryPass::new(
        FieldSet::new("procedure")
            .field(kind.id_field())
            .field(FieldDefinition::optional(NAME).with_aliases(kind.name_aliases()))
            .field(FieldDefinition::optional(TYPE).with_aliases(kind.type_aliases()))
            .field(FieldDefinition::optional(STATUS).with_alias("STATUS_CODE")),
        RowFilter::new().require_identifier(IDENTIFIER),
        IdentityResolver::natural(IDENTIFIER, IdShape::Any),
    )
}

pub fn route_pass(kind: ProcedureKind) -> JoinPass {
    let mut fields = FieldSet::new("procedure-route")
        .field(kind.id_field())
        .field(FieldDefinition::optional(SEQUENCE).with_aliases(&["SEQNUM", "POINT_SEQ", "SEQNO"]));
    for &column in ROUTE_COLUMNS {
        fields = fields.field(FieldDefinition::optional(column));
    }

    JoinPass::new(
        fields,
        RowFilter::new().require_key(IDENTIFIER),
        procedure_key(),
        JoinEngine::exact(),
    )
}

pub fn airport_pass(kind: ProcedureKind) -> JoinPass {
    JoinPass::new(
        FieldSet::new("procedure-airport")
            .field(kind.id_field())
            .field(FieldDefinition::optional(AIRPORT).with_alias("ARPT_ID"))
            .field(FieldDefinition::optional(RUNWAY).with_aliases(&["RWY_END_ID", "RWY", "RUNWAY"])),
        RowFilter::new().require_key(IDENTIFIER),
        procedure_key(),
        JoinEngine::exact(),
    )
}

fn parse_procedure(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<Procedure, RejectReason> {
    Ok(Procedure {
        id: identity.key.to_string(),
        name: row.owned(NAME).unwrap_or_default(),
        procedure_type: row.owned(TYPE),
        status: row.owned(STATUS),
        airports: ChildSet::new(),
        route: ChildSet::new(),
    })
}

fn parse_route(row: &Row<'_>) -> Result<RouteSegment, RejectReason> {
    let attributes = ROUTE_COLUMNS
        .iter()
        .filter_map(|&column| row.owned(column).map(|value| (column.to_lowercase(), value)))
        .collect();

    Ok(RouteSegment {
        seq: row.int(SEQUENCE),
        attributes,
    })
}

fn parse_airport(row: &Row<'_>) -> Result<ProcedureAirport, RejectReason> {
    Ok(ProcedureAirport {
        airport_identifier: row.upper(AIRPORT).unwrap_or_default(),
        runway: row.upper(RUNWAY),
    })
}

pub fn build<R: Read>(
    kind: ProcedureKind,
    base: SourceReader<R>,
    route: SourceReader<R>,
    airports: SourceReader<R>,
) -> Result<DatasetOutput<Procedure>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(kind.dataset());

    primary_pass(kind).run(base, &mut parents, &mut diagnostics, parse_procedure)?;
    route_pass(kind).run(
        route,
        &mut parents,
        &mut diagnostics,
        parse_route,
        |procedure: &mut Procedure, segment| procedure.route.insert(segment),
    )?;
    airport_pass(kind).run(
        airports,
        &mut parents,
        &mut diagnostics,
        parse_airport,
        |procedure: &mut Procedure, airport| procedure.airports.insert(airport),
    )?;

    Ok(finish(parents, diagnostics))
}

// ============================================================================
// TESTS
// ============================================================================
