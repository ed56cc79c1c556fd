// 📻 Communication Outlet Entity - COM outlets, natural or content-addressed ids
// Outlets without a published code get SYN:<sha256> over a fixed field list.

use super::{finish, Entity};
use crate::aggregator::Aggregator;
use crate::attributes::{FieldDefinition, FieldSet, COUNTRY, IDENTIFIER, LATITUDE, LONGITUDE, NAME, STATE, TYPE};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, ResolvedIdentity, SyntheticField, SyntheticKey};
use crate::ingest::{DatasetOutput, PrimaryPass};
use crate::parser::SourceReader;
use crate::rules::RowFilter;
use crate::schema::Row;
use crate::serializer::coordinate;
use serde::Serialize;
use std::io::Read;

pub const DATASET: &str = "comms";

const ARTCC: &str = "artcc";

/// Text columns hashed into a synthetic id, in hashing order
const SYNTHETIC_TEXT_COLUMNS: &[&str] = &[
    "COMM_TYPE",
    "COMM_OUTLET_NAME",
    "FACILITY_ID",
    "NAV_ID",
    "NAV_TYPE",
    "CITY",
    "STATE_CODE",
    "REGION_CODE",
    "COUNTRY_CODE",
];

/// Coordinate columns hashed after the text columns
const SYNTHETIC_COORDINATE_COLUMNS: &[&str] = &["LAT_DECIMAL", "LONG_DECIMAL"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommOutlet {
    pub outlet_id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub outlet_type: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub artcc_id: Option<String>,
}

impl Entity for CommOutlet {}

// ============================================================================
// IDENTITY
// ============================================================================

/// COMM_TYPE … COUNTRY_CODE, then LAT_DECIMAL, LONG_DECIMAL (never the effective date)
pub fn synthetic_key() -> SyntheticKey {
    let text = SYNTHETIC_TEXT_COLUMNS.iter().map(|&c| SyntheticField::Text(c));
    let coordinates = SYNTHETIC_COORDINATE_COLUMNS
        .iter()
        .map(|&c| SyntheticField::Coordinate(c));
    SyntheticKey::new(text.chain(coordinates).collect())
}

pub fn base_fields() -> FieldSet {
    let mut fields = FieldSet::new("comm")
        .field(FieldDefinition::optional(IDENTIFIER).with_aliases(&["COMM_LOC_ID", "COM_OUTLET_ID"]))
        .field(FieldDefinition::optional(NAME).with_alias("COMM_OUTLET_NAME"))
        .field(FieldDefinition::optional(TYPE).with_aliases(&["COMM_OUTLET_TYPE", "COMM_TYPE"]))
        .field(FieldDefinition::optional(STATE).with_alias("STATE_CODE"))
        .field(FieldDefinition::optional(COUNTRY).with_alias("COUNTRY_CODE"))
        .field(FieldDefinition::optional(ARTCC).with_aliases(&["ARTCC_ID", "FACILITY_ID"]))
        .with_optional_coordinates();

    for &column in SYNTHETIC_TEXT_COLUMNS.iter().chain(SYNTHETIC_COORDINATE_COLUMNS) {
        fields = fields.field(FieldDefinition::optional(column));
    }
    fields
}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        base_fields(),
        RowFilter::new(),
        IdentityResolver::natural(IDENTIFIER, IdShape::Published).with_synthetic_fallback(synthetic_key()),
    )
}

fn parse_outlet(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<CommOutlet, RejectReason> {
    Ok(CommOutlet {
        outlet_id: identity.key.to_string(),
        name: row.owned(NAME),
        outlet_type: row.owned(TYPE),
        state: row.owned(STATE),
        country: row.owned(COUNTRY),
        latitude: coordinate(row.float(LATITUDE)),
        longitude: coordinate(row.float(LONGITUDE)),
        artcc_id: row.owned(ARTCC),
    })
}

pub fn build<R: Read>(base: SourceReader<R>) -> Result<DatasetOutput<CommOutlet>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_outlet)?;

    Ok(finish(parents, diagnostics))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::is_synthetic;
    use crate::parser::SourceKind;

    const APPROACH_ID: &str = "SYN:0dc4842979bb67fa4cefb023f6492bbf04b2f0d405eda93b5817fffd9b3844dc";

    fn build_csv(data: &str) -> DatasetOutput<CommOutlet> {
        build(SourceReader::from_reader(SourceKind::Com, data.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_synthetic_id_for_outlet_without_code() {
        let data = "COMM_LOC_ID,COMM_TYPE,COMM_OUTLET_NAME,LAT_DECIMAL,LONG_DECIMAL\n,TWR,APPROACH,40.123456,-80.654321\n";

        let first = build_csv(data);
        let second = build_csv(data);

        assert_eq!(first.entities[0].outlet_id, APPROACH_ID);
        assert_eq!(first.entities[0].outlet_id, second.entities[0].outlet_id);
        assert_eq!(first.entities[0].latitude, Some(40.123));
    }

    #[test]
    fn test_natural_id_preferred() {
        let out = build_csv("COMM_LOC_ID,COMM_TYPE\nzmp,RCO\n");
        assert_eq!(out.entities[0].outlet_id, "ZMP");
        assert!(!is_synthetic(&out.entities[0].outlet_id));
    }

    #[test]
    fn test_natural_id_cannot_claim_synthetic_space() {
        let data = format!(
            "COMM_LOC_ID,COMM_TYPE,COMM_OUTLET_NAME,LAT_DECIMAL,LONG_DECIMAL\n{},TWR,APPROACH,40.123456,-80.654321\n",
            APPROACH_ID
        );
        let out = build_csv(&data);

        // The forged code is ignored and the row hashes to its real content id
        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.entities[0].outlet_id, APPROACH_ID);
    }

    #[test]
    fn test_identical_keyless_rows_are_duplicates() {
        let out = build_csv(
            "COMM_LOC_ID,COMM_TYPE,COMM_OUTLET_NAME,LAT_DECIMAL,LONG_DECIMAL,EFF_DATE\n\
             ,RCO,GRAND MARAIS,47.75,-90.33,2026/01/22\n\
             ,rco, Grand Marais ,47.7500001,-90.33,2026/02/19\n\
             ,RCO,DULUTH,46.84,-92.19,2026/01/22\n",
        );

        assert_eq!(out.entities.len(), 2);
        assert_eq!(out.diagnostics.rejected(RejectReason::Duplicate), 1);
        assert!(out.entities.iter().all(|c| is_synthetic(&c.outlet_id)));
    }
}
