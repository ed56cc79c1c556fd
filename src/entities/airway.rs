// 🛣️ Airway Entity - Airways with their ordered segments
// Primary: AWY_BASE. Children: AWY_SEG_ALT, sorted by (sequence, fix, navaid).

use super::{finish, Entity};
use crate::aggregator::{Aggregator, ChildSet};
use crate::attributes::{FieldDefinition, FieldSet, IDENTIFIER, SEQUENCE, STATUS, TYPE};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, KeyPart, ResolvedIdentity};
use crate::ingest::{DatasetOutput, JoinPass, PrimaryPass};
use crate::join::JoinEngine;
use crate::parser::SourceReader;
use crate::rules::RowFilter;
use crate::schema::Row;
use crate::serializer::sequence_key;
use serde::Serialize;
use std::io::Read;

pub const DATASET: &str = "airways";

const LEVEL: &str = "level";

/// Segment text columns: (canonical field, NASR column)
const SEGMENT_COLUMNS: &[(&str, &str)] = &[
    ("fix_id", "FIX_ID"),
    ("fix_type", "FIX_TYPE"),
    ("nav_id", "NAV_ID"),
    ("nav_type", "NAV_TYPE"),
    ("artcc", "ARTCC_ID"),
    ("mea", "MEA"),
    ("moca", "MOCA"),
    ("min_alt", "MIN_ALT"),
    ("max_alt", "MAX_ALT"),
    ("direction", "DIRECTION"),
];

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AirwaySegment {
    pub seq: Option<i64>,
    pub fix_id: Option<String>,
    pub fix_type: Option<String>,
    pub nav_id: Option<String>,
    pub nav_type: Option<String>,
    pub artcc: Option<String>,
    pub mea: Option<String>,
    pub moca: Option<String>,
    pub min_alt: Option<String>,
    pub max_alt: Option<String>,
    pub direction: Option<String>,
}

impl AirwaySegment {
    /// (sequence, fix, navaid); absent sequence first, absent ids as ""
    fn sort_key(&self) -> (i64, &str, &str) {
        (
            sequence_key(self.seq),
            self.fix_id.as_deref().unwrap_or(""),
            self.nav_id.as_deref().unwrap_or(""),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airway {
    pub airway_id: String,
    #[serde(rename = "type")]
    pub airway_type: Option<String>,
    pub level: Option<String>,
    pub status: Option<String>,
    pub segments: ChildSet<AirwaySegment>,
}

impl Entity for Airway {
    fn sort_children(&mut self) {
        self.segments
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()).then_with(|| a.cmp(b)));
    }
}

// ============================================================================
// PASSES
// ============================================================================

fn airway_id_field() -> FieldDefinition {
    FieldDefinition::required(IDENTIFIER).with_aliases(&["AWY_ID", "AIRWAY_ID"])
}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        FieldSet::new("airway")
            .field(airway_id_field())
            .field(FieldDefinition::optional(TYPE).with_alias("AWY_TYPE"))
            .field(FieldDefinition::optional(LEVEL).with_alias("AWY_LEVEL"))
            .field(FieldDefinition::optional(STATUS).with_alias("STATUS_CODE")),
        RowFilter::new().require_identifier(IDENTIFIER),
        IdentityResolver::natural(IDENTIFIER, IdShape::Any),
    )
}

pub fn segment_pass() -> JoinPass {
    let mut fields = FieldSet::new("airway-segment")
        .field(airway_id_field())
        .field(FieldDefinition::optional(SEQUENCE).with_aliases(&["SEQNO", "POINT_SEQ"]));
    for &(name, column) in SEGMENT_COLUMNS {
        fields = fields.field(FieldDefinition::optional(name).with_alias(column));
    }

    JoinPass::new(
        fields,
        RowFilter::new().require_key(IDENTIFIER),
        IdentityResolver::composite(vec![KeyPart::required(IDENTIFIER, IdShape::Any)]),
        JoinEngine::exact(),
    )
}

fn parse_airway(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<Airway, RejectReason> {
    Ok(Airway {
        airway_id: identity.key.to_string(),
        airway_type: row.owned(TYPE),
        level: row.owned(LEVEL),
        status: row.owned(STATUS),
        segments: ChildSet::new(),
    })
}

fn parse_segment(row: &Row<'_>) -> Result<AirwaySegment, RejectReason> {
    Ok(AirwaySegment {
        seq: row.int(SEQUENCE),
        fix_id: row.owned("fix_id"),
        fix_type: row.owned("fix_type"),
        nav_id: row.owned("nav_id"),
        nav_type: row.owned("nav_type"),
        artcc: row.owned("artcc"),
        mea: row.owned("mea"),
        moca: row.owned("moca"),
        min_alt: row.owned("min_alt"),
        max_alt: row.owned("max_alt"),
        direction: row.owned("direction"),
    })
}

pub fn build<R: Read>(
    base: SourceReader<R>,
    segments: SourceReader<R>,
) -> Result<DatasetOutput<Airway>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_airway)?;
    segment_pass().run(
        segments,
        &mut parents,
        &mut diagnostics,
        parse_segment,
        |airway: &mut Airway, segment| airway.segments.insert(segment),
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

    fn build_csv(base: &str, segments: &str) -> DatasetOutput<Airway> {
        build(
            SourceReader::from_reader(SourceKind::AwyBase, base.as_bytes()).unwrap(),
            SourceReader::from_reader(SourceKind::AwySegAlt, segments.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_segments_sorted_with_absent_sequence_first() {
        let out = build_csv(
            "AWY_ID,AWY_TYPE\nv2,V\n",
            "AWY_ID,SEQNO,FIX_ID,NAV_ID\nV2,20,BRAVO,\nV2,10,ALPHA,\nV2,,START,\nV2,10,AARDV,\n",
        );

        let order: Vec<(Option<i64>, Option<&str>)> = out.entities[0]
            .segments
            .iter()
            .map(|s| (s.seq, s.fix_id.as_deref()))
            .collect();
        assert_eq!(
            order,
            vec![
                (None, Some("START")),
                (Some(10), Some("AARDV")),
                (Some(10), Some("ALPHA")),
                (Some(20), Some("BRAVO")),
            ]
        );
    }

    #[test]
    fn test_segment_sequence_from_decimal_text() {
        let out = build_csv("AWY_ID\nJ10\n", "AWY_ID,SEQNO,FIX_ID\nJ10,30.0,FOO\nJ10,x,BAR\n");
        let seqs: Vec<Option<i64>> = out.entities[0].segments.iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![None, Some(30)]);
    }

    #[test]
    fn test_segments_for_unknown_airway_are_counted() {
        let out = build_csv("AWY_ID\nV2\n", "AWY_ID,SEQNO,FIX_ID\nV99,10,FOO\n,10,BAR\nV2,10,BAZ\n");

        let counters = out.diagnostics.source("AWY_SEG_ALT").unwrap();
        assert_eq!(counters.rows_written, 1);
        assert_eq!(counters.rejected(RejectReason::Unmatched), 1);
        assert_eq!(counters.rejected(RejectReason::MissingKey), 1);
    }
}
