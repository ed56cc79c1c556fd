// 🛬 Runway Entity - Runways keyed by (airport, runway) with their ends
// Primary: APT_RWY. Children: APT_RWY_END, falling back to the airport alone when the
// runway designator does not line up.

use super::{finish, Entity};
use crate::aggregator::{Aggregator, ChildSet};
use crate::attributes::{FieldDefinition, FieldSet, AIRPORT, ELEVATION, LATITUDE, LONGITUDE, RUNWAY};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, KeyPart, ResolvedIdentity};
use crate::ingest::{DatasetOutput, JoinPass, PrimaryPass};
use crate::join::JoinEngine;
use crate::parser::SourceReader;
use crate::rules::RowFilter;
use crate::schema::Row;
use crate::serializer::{coordinate, round_to};
use serde::Serialize;
use std::cmp::Ordering;
use std::io::Read;

pub const DATASET: &str = "runways";

/// Leading key parts shared by a runway end and any runway of the same airport
pub const FALLBACK_KEY_LEN: usize = 1;

/// Elevations are published to a tenth of a foot
const ELEVATION_PLACES: i32 = 1;

const LENGTH: &str = "length";
const WIDTH: &str = "width";
const SURFACE: &str = "surface";
const LIGHTING: &str = "lighting";
const END_ID: &str = "end_id";
const TRUE_ALIGNMENT: &str = "true_alignment";
const ILS_TYPE: &str = "ils_type";
const DISPLACED_THRESHOLD: &str = "displaced_threshold";
const TDZ_ELEVATION: &str = "tdz_elevation";

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunwayEnd {
    pub end_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_ft: Option<f64>,
    pub true_alignment: Option<String>,
    pub ils_type: Option<String>,
    pub displaced_threshold_ft: Option<i64>,
    pub tdz_elev_ft: Option<f64>,
}

/// Absent before present, then IEEE total order (values are already rounded and finite)
fn cmp_measure(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.is_some().cmp(&b.is_some()),
    }
}

/// End id first; remaining fields only break exact ties
impl Ord for RunwayEnd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end_id
            .cmp(&other.end_id)
            .then_with(|| cmp_measure(self.latitude, other.latitude))
            .then_with(|| cmp_measure(self.longitude, other.longitude))
            .then_with(|| cmp_measure(self.elevation_ft, other.elevation_ft))
            .then_with(|| self.true_alignment.cmp(&other.true_alignment))
            .then_with(|| self.ils_type.cmp(&other.ils_type))
            .then_with(|| self.displaced_threshold_ft.cmp(&other.displaced_threshold_ft))
            .then_with(|| cmp_measure(self.tdz_elev_ft, other.tdz_elev_ft))
    }
}

impl PartialOrd for RunwayEnd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RunwayEnd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RunwayEnd {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Runway {
    pub airport_identifier: String,
    pub runway_id: String,
    pub length_ft: Option<i64>,
    pub width_ft: Option<i64>,
    pub surface: Option<String>,
    pub lighting: Option<String>,
    pub ends: ChildSet<RunwayEnd>,
}

impl Entity for Runway {
    fn sort_children(&mut self) {
        self.ends.sort();
    }
}

// ============================================================================
// PASSES
// ============================================================================

fn runway_key() -> IdentityResolver {
    IdentityResolver::composite(vec![
        KeyPart::required(AIRPORT, IdShape::Any),
        KeyPart::required(RUNWAY, IdShape::Any),
    ])
}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        FieldSet::new("runway")
            .field(FieldDefinition::required(AIRPORT).with_alias("ARPT_ID"))
            .field(FieldDefinition::required(RUNWAY).with_alias("RWY_ID"))
            .field(FieldDefinition::optional(LENGTH).with_alias("RWY_LEN"))
            .field(FieldDefinition::optional(WIDTH).with_alias("RWY_WIDTH"))
            .field(FieldDefinition::optional(SURFACE).with_alias("SURFACE_TYPE_CODE"))
            .field(FieldDefinition::optional(LIGHTING).with_alias("RWY_LGT_CODE")),
        RowFilter::new().require_identifier(AIRPORT).require_identifier(RUNWAY),
        runway_key(),
    )
}

pub fn end_pass() -> JoinPass {
    JoinPass::new(
        FieldSet::new("runway-end")
            .field(FieldDefinition::required(AIRPORT).with_alias("ARPT_ID"))
            .field(FieldDefinition::required(RUNWAY).with_alias("RWY_ID"))
            .field(FieldDefinition::optional(END_ID).with_alias("RWY_END_ID"))
            .field(FieldDefinition::optional(ELEVATION).with_alias("RWY_END_ELEV"))
            .field(FieldDefinition::optional(TRUE_ALIGNMENT).with_alias("TRUE_ALIGNMENT"))
            .field(FieldDefinition::optional(ILS_TYPE).with_alias("ILS_TYPE"))
            .field(FieldDefinition::optional(DISPLACED_THRESHOLD).with_alias("DISPLACED_THR_LEN"))
            .field(FieldDefinition::optional(TDZ_ELEVATION).with_alias("TDZ_ELEV"))
            .with_optional_coordinates(),
        RowFilter::new().require_key(AIRPORT).require_key(RUNWAY),
        runway_key(),
        JoinEngine::with_fallback(FALLBACK_KEY_LEN),
    )
}

fn parse_runway(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<Runway, RejectReason> {
    let key = identity.key.parts();
    Ok(Runway {
        airport_identifier: key[0].clone(),
        runway_id: key[1].clone(),
        length_ft: row.int(LENGTH),
        width_ft: row.int(WIDTH),
        surface: row.owned(SURFACE),
        lighting: row.owned(LIGHTING),
        ends: ChildSet::new(),
    })
}

/// Malformed numbers inside an end are stored as absent, never rejected
fn parse_end(row: &Row<'_>) -> Result<RunwayEnd, RejectReason> {
    Ok(RunwayEnd {
        end_id: row.upper(END_ID).unwrap_or_default(),
        latitude: coordinate(row.float(LATITUDE)),
        longitude: coordinate(row.float(LONGITUDE)),
        elevation_ft: row.float(ELEVATION).and_then(|v| round_to(v, ELEVATION_PLACES)),
        true_alignment: row.owned(TRUE_ALIGNMENT),
        ils_type: row.owned(ILS_TYPE),
        displaced_threshold_ft: row.int(DISPLACED_THRESHOLD),
        tdz_elev_ft: row.float(TDZ_ELEVATION).and_then(|v| round_to(v, ELEVATION_PLACES)),
    })
}

pub fn build<R: Read>(
    base: SourceReader<R>,
    ends: SourceReader<R>,
) -> Result<DatasetOutput<Runway>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_runway)?;
    end_pass().run(
        ends,
        &mut parents,
        &mut diagnostics,
        parse_end,
        |runway: &mut Runway, end| runway.ends.insert(end),
    )?;

    Ok(finish(parents, diagnostics))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceKind;

    const END_HEADER: &str = "ARPT_ID,RWY_ID,RWY_END_ID,LAT_DECIMAL,LONG_DECIMAL,RWY_END_ELEV,DISPLACED_THR_LEN";

    fn build_csv(runways: &str, ends: &str) -> DatasetOutput<Runway> {
        build(
            SourceReader::from_reader(SourceKind::AptRwy, runways.as_bytes()).unwrap(),
            SourceReader::from_reader(SourceKind::AptRwyEnd, ends.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_ends_join_exactly_and_sort() {
        let out = build_csv(
            "ARPT_ID,RWY_ID,RWY_LEN,RWY_WIDTH,SURFACE_TYPE_CODE\nKMSP,12L/30R,8200,150,CONC\n",
            &format!(
                "{}\nKMSP,12L/30R,30R,44.87,-93.2,841.04,\nKMSP,12L/30R,12L,44.89,-93.23,841.3,abc\n",
                END_HEADER
            ),
        );

        let rwy = &out.entities[0];
        assert_eq!(rwy.length_ft, Some(8200));
        assert_eq!(rwy.surface.as_deref(), Some("CONC"));

        let ends: Vec<&str> = rwy.ends.iter().map(|e| e.end_id.as_str()).collect();
        assert_eq!(ends, vec!["12L", "30R"]);
        assert_eq!(rwy.ends.as_slice()[0].displaced_threshold_ft, None, "malformed numbers read as absent");
        assert_eq!(rwy.ends.as_slice()[1].elevation_ft, Some(841.0));
    }

    #[test]
    fn test_end_falls_back_to_airport() {
        let out = build_csv(
            "ARPT_ID,RWY_ID\nKMSP,12L/30R\nKMSP,17/35\n",
            &format!("{}\nKMSP,12,12,44.88,-93.22,,\n", END_HEADER),
        );

        let attached: Vec<(&str, usize)> = out
            .entities
            .iter()
            .map(|r| (r.runway_id.as_str(), r.ends.len()))
            .collect();
        assert_eq!(attached, vec![("12L/30R", 1), ("17/35", 0)]);
        assert_eq!(out.diagnostics.source("APT_RWY_END").unwrap().rows_written, 1);
    }

    #[test]
    fn test_end_without_any_parent_is_unmatched() {
        let out = build_csv(
            "ARPT_ID,RWY_ID\nKMSP,12L/30R\n",
            &format!("{}\nKDLH,09/27,09,,,,\nKMSP,,12L,,,,\n", END_HEADER),
        );

        let counters = out.diagnostics.source("APT_RWY_END").unwrap();
        assert_eq!(counters.rejected(RejectReason::Unmatched), 1);
        assert_eq!(counters.rejected(RejectReason::MissingKey), 1);
        assert!(out.diagnostics.is_balanced());
    }

    #[test]
    fn test_ends_with_same_id_ordered_by_measurements() {
        let out = build_csv(
            "ARPT_ID,RWY_ID\nKMSP,04/22\n",
            &format!(
                "{}\nKMSP,04/22,04,44.87,-93.2,842,\nKMSP,04/22,04,44.87,-93.2,,\nKMSP,04/22,04,44.86,-93.2,,\n",
                END_HEADER
            ),
        );

        let order: Vec<(Option<f64>, Option<f64>)> = out.entities[0]
            .ends
            .iter()
            .map(|e| (e.latitude, e.elevation_ft))
            .collect();
        assert_eq!(order, vec![(Some(44.86), None), (Some(44.87), None), (Some(44.87), Some(842.0))]);
    }

    #[test]
    fn test_repeated_end_row_is_merged() {
        let out = build_csv(
            "ARPT_ID,RWY_ID\nKMSP,04/22\n",
            &format!("{}\nKMSP,04/22,04,44.87,-93.2,,\nKMSP,04/22,04,44.87,-93.2,,\n", END_HEADER),
        );

        assert_eq!(out.entities[0].ends.len(), 1);
        assert_eq!(out.diagnostics.source("APT_RWY_END").unwrap().merged, 1);
    }
}
