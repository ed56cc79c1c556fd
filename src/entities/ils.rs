// 📶 ILS Entity - Localizer sites with DME, glide slope and marker components
// Key: (airport, runway end, localizer id). Components fall back to (airport, runway end).

use super::{finish, Entity};
use crate::aggregator::{Aggregator, ChildSet};
use crate::attributes::{FieldDefinition, FieldSet, AIRPORT, LATITUDE, LONGITUDE, RUNWAY};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, KeyPart, ResolvedIdentity};
use crate::ingest::{DatasetOutput, JoinPass, PrimaryPass};
use crate::join::JoinEngine;
use crate::parser::SourceReader;
use crate::rules::RowFilter;
use crate::schema::Row;
use crate::serializer::coordinate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

pub const DATASET: &str = "ils";

/// Components that miss on localizer id still find the site by (airport, runway end)
pub const FALLBACK_KEY_LEN: usize = 2;

const LOCALIZER: &str = "localizer";
const FREQUENCY: &str = "frequency";

/// A component row as published: every non-empty column by its source name
pub type ComponentRecord = BTreeMap<String, String>;

/// Which component collection a secondary source feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Dme,
    GlideSlope,
    Marker,
}

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IlsComponents {
    pub dme: ChildSet<ComponentRecord>,
    pub gs: ChildSet<ComponentRecord>,
    pub markers: ChildSet<ComponentRecord>,
}

impl IlsComponents {
    fn collection_mut(&mut self, component: Component) -> &mut ChildSet<ComponentRecord> {
        match component {
            Component::Dme => &mut self.dme,
            Component::GlideSlope => &mut self.gs,
            Component::Marker => &mut self.markers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IlsSite {
    pub airport_identifier: String,
    pub runway_id: String,
    pub ident: String,
    pub frequency: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub components: IlsComponents,
}

impl Entity for IlsSite {
    fn sort_children(&mut self) {
        self.components.dme.sort();
        self.components.gs.sort();
        self.components.markers.sort();
    }
}

// ============================================================================
// PASSES
// ============================================================================

fn key_fields(entity: &'static str, localizer_aliases: &[&'static str]) -> FieldSet {
    FieldSet::new(entity)
        .field(FieldDefinition::required(AIRPORT).with_aliases(&["ARPT_ID", "LOCATION_ID"]))
        .field(FieldDefinition::required(RUNWAY).with_aliases(&["RWY_END_ID", "RWY_ID", "RUNWAY_ID"]))
        .field(FieldDefinition::optional(LOCALIZER).with_aliases(localizer_aliases))
}

/// Localizer id is optional: absent reads as "" in the key
fn site_key() -> IdentityResolver {
    IdentityResolver::composite(vec![
        KeyPart::required(AIRPORT, IdShape::Any),
        KeyPart::required(RUNWAY, IdShape::Any),
        KeyPart::optional(LOCALIZER),
    ])
}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        key_fields("ils", &["ILS_LOC_ID", "ILS_ID", "LOC_ID", "KEY"])
            .field(FieldDefinition::optional(FREQUENCY).with_aliases(&["LOC_FREQ", "FREQ"]))
            .with_optional_coordinates(),
        RowFilter::new().require_identifier(AIRPORT).require_identifier(RUNWAY),
        site_key(),
    )
}

pub fn component_pass() -> JoinPass {
    JoinPass::new(
        key_fields("ils-component", &["ILS_LOC_ID", "ILS_ID", "LOC_ID"]),
        RowFilter::new().require_key(AIRPORT).require_key(RUNWAY),
        site_key(),
        JoinEngine::with_fallback(FALLBACK_KEY_LEN),
    )
}

fn parse_site(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<IlsSite, RejectReason> {
    let key = identity.key.parts();
    Ok(IlsSite {
        airport_identifier: key[0].clone(),
        runway_id: key[1].clone(),
        ident: key[2].clone(),
        frequency: row.owned(FREQUENCY),
        latitude: coordinate(row.float(LATITUDE)),
        longitude: coordinate(row.float(LONGITUDE)),
        components: IlsComponents::default(),
    })
}

fn run_component<R: Read>(
    component: Component,
    reader: SourceReader<R>,
    parents: &mut Aggregator<IlsSite>,
    diagnostics: &mut Diagnostics,
) -> Result<(), BuildError> {
    component_pass().run(
        reader,
        parents,
        diagnostics,
        |row| Ok(row.non_empty_fields()),
        |site: &mut IlsSite, record| site.components.collection_mut(component).insert(record),
    )
}

pub fn build<R: Read>(
    base: SourceReader<R>,
    dme: SourceReader<R>,
    glide_slope: SourceReader<R>,
    markers: SourceReader<R>,
) -> Result<DatasetOutput<IlsSite>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_site)?;
    run_component(Component::Dme, dme, &mut parents, &mut diagnostics)?;
    run_component(Component::GlideSlope, glide_slope, &mut parents, &mut diagnostics)?;
    run_component(Component::Marker, markers, &mut parents, &mut diagnostics)?;

    Ok(finish(parents, diagnostics))
}

// ============================================================================
// TESTS
// ============================================================================
