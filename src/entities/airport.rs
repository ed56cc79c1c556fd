// 🛫 Airport Entity - Public-use ICAO airports with runways and frequencies
// Primary: APT_BASE. Children: APT_RWY (runway designators), FRQ (frequencies by role).

use super::{finish, upper_or_empty, Entity};
use crate::aggregator::{Aggregator, ChildSet};
use crate::attributes::{
    FieldDefinition, FieldSet, AIRPORT, CITY, ELEVATION, IDENTIFIER, LATITUDE, LONGITUDE, NAME,
    RUNWAY, STATE, STATUS, TYPE,
};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, KeyPart, ResolvedIdentity};
use crate::ingest::{DatasetOutput, JoinPass, PrimaryPass};
use crate::join::JoinEngine;
use crate::parser::{SourceKind, SourceReader};
use crate::rules::{ExclusionRule, RowFilter};
use crate::schema::Row;
use crate::serializer::coordinate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

pub const DATASET: &str = "airports";

const FACILITY_USE: &str = "facility_use";
const FREQUENCY: &str = "frequency";

/// NASR frequency type → published role
pub const FREQUENCY_ROLES: &[(&str, &str)] = &[
    ("CLD", "clearance"),
    ("CLR", "clearance"),
    ("CLEARANCE", "clearance"),
    ("GND", "ground"),
    ("GROUND", "ground"),
    ("TWR", "tower"),
    ("TOWER", "tower"),
    ("DEP", "departure"),
    ("DEPARTURE", "departure"),
];

const AIRPORT_ID_ALIASES: &[&str] = &["ARPT_ID", "IDENT", "LOCID"];

// ============================================================================
// AIRPORT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    /// ICAO code, e.g. "KMSP"
    pub identifier: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_ft: Option<i64>,

    /// Runway designators ("12L/30R")
    pub runways: ChildSet<String>,

    /// Role ("tower", "ground", ...) → frequencies in MHz as published
    pub frequencies: BTreeMap<String, ChildSet<String>>,
}

impl Entity for Airport {
    fn sort_children(&mut self) {
        self.runways.sort();
        self.frequencies.retain(|_, values| !values.is_empty());
        for values in self.frequencies.values_mut() {
            values.sort();
        }
    }
}

// ============================================================================
// FIELD TABLES
// ============================================================================

pub fn base_fields() -> FieldSet {
    FieldSet::new("airport")
        .field(FieldDefinition::required(IDENTIFIER).with_aliases(AIRPORT_ID_ALIASES))
        .field(FieldDefinition::optional(NAME).with_aliases(&["ARPT_NAME", "NAME"]))
        .field(FieldDefinition::optional(CITY).with_aliases(&["CITY", "SERVCITY"]))
        .field(FieldDefinition::optional(STATE).with_aliases(&["STATE_CODE", "STATE"]))
        .field(FieldDefinition::optional(ELEVATION).with_aliases(&["ELEV", "ELEVATION", "ELEV_FT"]))
        .field(FieldDefinition::optional(TYPE).with_aliases(&[
            "SITE_TYPE_CODE",
            "TYPE",
            "FACILITY_TYPE",
            "SITE_TYPE",
            "TYPE_CODE",
        ]))
        .field(FieldDefinition::optional(FACILITY_USE).with_aliases(&["FACILITY_USE_CODE", "FACILITY_USE"]))
        .field(FieldDefinition::optional(STATUS).with_aliases(&["ARPT_STATUS", "STATUS", "SVC_IND"]))
        .with_required_coordinates()
}

/// Heliports, seaplane bases, private-use and closed facilities never publish
pub fn base_filter() -> RowFilter {
    RowFilter::new()
        .require_identifier(IDENTIFIER)
        .require_coordinates()
        .exclude(ExclusionRule::new("heliport").on(TYPE).matching(&["*HELI*", "H", "2"]))
        .exclude(
            ExclusionRule::new("seaplane")
                .on(TYPE)
                .matching(&["*SEAPLANE*", "*WATER*", "S", "C", "4"]),
        )
        .exclude(
            ExclusionRule::new("private")
                .on(TYPE)
                .on(FACILITY_USE)
                .matching(&["*PRIVATE*", "PR", "P"]),
        )
        .exclude(ExclusionRule::new("closed").on(STATUS).matching(&["*CLOSED*", "CI", "CP"]))
}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        base_fields(),
        base_filter(),
        IdentityResolver::natural(IDENTIFIER, IdShape::AirportIcao),
    )
}

fn airport_key() -> IdentityResolver {
    IdentityResolver::composite(vec![KeyPart::required(AIRPORT, IdShape::AirportIcao)])
}

pub fn runway_pass() -> JoinPass {
    JoinPass::new(
        FieldSet::new("airport-runway")
            .field(FieldDefinition::required(AIRPORT).with_aliases(&["ARPT_ID", "IDENT", "LOCID", "SITE_NUMBER"]))
            .field(FieldDefinition::required(RUNWAY).with_aliases(&["RWY_ID", "RUNWAY_ID", "BASE_RWY"])),
        RowFilter::new().require_key(AIRPORT).require_key(RUNWAY),
        airport_key(),
        JoinEngine::exact(),
    )
}

pub fn frequency_pass() -> JoinPass {
    JoinPass::new(
        FieldSet::new("airport-frequency")
            .field(FieldDefinition::required(AIRPORT).with_aliases(&["ARPT_ID", "IDENT", "LOCID", "SITE_NUMBER"]))
            .field(FieldDefinition::optional(TYPE).with_aliases(&["TYPE", "FREQ_TYPE", "FACILITY_TYPE"]))
            .field(FieldDefinition::optional(FREQUENCY).with_aliases(&["FREQ", "FREQUENCY", "FREQ_VALUE"])),
        RowFilter::new().require_key(AIRPORT),
        airport_key(),
        JoinEngine::exact(),
    )
}

// ============================================================================
// ROW PARSING
// ============================================================================

fn parse_airport(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<Airport, RejectReason> {
    Ok(Airport {
        identifier: identity.key.to_string(),
        name: upper_or_empty(row.text(NAME)),
        city: upper_or_empty(row.text(CITY)),
        state: upper_or_empty(row.text(STATE)),
        latitude: coordinate(row.float(LATITUDE)).ok_or(RejectReason::ParseError)?,
        longitude: coordinate(row.float(LONGITUDE)).ok_or(RejectReason::ParseError)?,
        elevation_ft: row.int(ELEVATION),
        runways: ChildSet::new(),
        frequencies: BTreeMap::new(),
    })
}

/// Map a NASR frequency type to its role, trying the first three letters as a fallback
pub fn frequency_role(raw: &str) -> Option<&'static str> {
    let raw = raw.trim().to_uppercase();
    let lookup = |code: &str| {
        FREQUENCY_ROLES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, role)| *role)
    };

    lookup(&raw).or_else(|| {
        let short: String = raw.chars().take(3).collect();
        lookup(&short)
    })
}

/// Three digits, a dot, then one to three digits ("118.3", "121.875")
pub fn is_frequency(value: &str) -> bool {
    match value.split_once('.') {
        Some((whole, fraction)) => {
            whole.len() == 3
                && whole.chars().all(|c| c.is_ascii_digit())
                && (1..=3).contains(&fraction.len())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn parse_frequency(row: &Row<'_>) -> Result<(&'static str, String), RejectReason> {
    let role = row
        .text(TYPE)
        .and_then(frequency_role)
        .ok_or(RejectReason::Excluded)?;

    match row.text(FREQUENCY) {
        Some(value) if is_frequency(value) => Ok((role, value.to_string())),
        _ => Err(RejectReason::ParseError),
    }
}

// ============================================================================
// BUILD
// ============================================================================

pub fn build<R: Read>(
    base: SourceReader<R>,
    runways: Option<SourceReader<R>>,
    frequencies: Option<SourceReader<R>>,
) -> Result<DatasetOutput<Airport>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_airport)?;

    match runways {
        Some(reader) => runway_pass().run(
            reader,
            &mut parents,
            &mut diagnostics,
            |row| row.upper(RUNWAY).ok_or(RejectReason::MissingKey),
            |airport: &mut Airport, runway| airport.runways.insert(runway),
        )?,
        None => diagnostics.record_missing_source(SourceKind::AptRwy.name()),
    }

    match frequencies {
        Some(reader) => frequency_pass().run(
            reader,
            &mut parents,
            &mut diagnostics,
            parse_frequency,
            |airport: &mut Airport, (role, value)| {
                airport
                    .frequencies
                    .entry(role.to_string())
                    .or_default()
                    .insert(value)
            },
        )?,
        None => diagnostics.record_missing_source(SourceKind::Frq.name()),
    }

    Ok(finish(parents, diagnostics))
}

// ============================================================================
// TESTS
// ============================================================================
