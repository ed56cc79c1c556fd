// 📡 Navaid Entity - VORs, NDBs and friends from NAV_BASE
// Keyed by the 2-4 character navaid code; TACAN-only stations are not published.

use super::{finish, upper_or_empty, Entity};
use crate::aggregator::Aggregator;
use crate::attributes::{
    FieldDefinition, FieldSet, COUNTRY, ELEVATION, IDENTIFIER, LATITUDE, LONGITUDE, NAME, STATE,
    STATUS, TYPE,
};
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdShape, IdentityResolver, ResolvedIdentity};
use crate::ingest::{DatasetOutput, PrimaryPass};
use crate::parser::SourceReader;
use crate::rules::{ExclusionRule, RowFilter};
use crate::schema::Row;
use crate::serializer::coordinate;
use serde::Serialize;
use std::io::Read;

pub const DATASET: &str = "navaids";

/// Pass-through columns: (canonical field, NASR column)
const PASS_THROUGH: &[(&str, &str)] = &[
    ("icao_region", "ICAO_REGION_CODE"),
    ("frequency", "FREQ"),
    ("channel", "CHANNEL"),
    ("tacan_id", "TACAN_ID"),
    ("tacan_channel", "TACAN_CHAN"),
    ("tacan_call", "TACAN_CALL"),
    ("hiwas", "HIWAS"),
    ("voice", "VOICE"),
    ("tweb", "TWEB"),
    ("fanmarker", "FANMARKER"),
    ("lahso", "LAHSO"),
    ("public_use", "PUBLIC_USE"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tacan {
    pub id: Option<String>,
    pub channel: Option<String>,
    pub call: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavaidFlags {
    pub hiwas: Option<String>,
    pub voice: Option<String>,
    pub tweb: Option<String>,
    pub fanmarker: Option<String>,
    pub lahso: Option<String>,
    pub public_use: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navaid {
    pub identifier: String,
    #[serde(rename = "type")]
    pub nav_type: String,
    pub name: String,
    pub state: Option<String>,
    pub country: Option<String>,
    pub icao_region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_ft: Option<i64>,
    pub frequency_khz_or_mhz: Option<String>,
    pub channel: Option<String>,
    pub status: Option<String>,

    /// Present only when the row carries any TACAN column
    pub tacan: Option<Tacan>,
    pub flags: NavaidFlags,
}

impl Entity for Navaid {}

// ============================================================================
// FIELD TABLE + FILTER
// ============================================================================

pub fn base_fields() -> FieldSet {
    let mut fields = FieldSet::new("navaid")
        .field(FieldDefinition::required(IDENTIFIER).with_aliases(&["NAV_ID", "IDENT"]))
        .field(FieldDefinition::optional(TYPE).with_alias("NAV_TYPE"))
        .field(FieldDefinition::optional(NAME).with_aliases(&["NAV_NAME", "NAME"]))
        .field(FieldDefinition::optional(STATE).with_alias("STATE_CODE"))
        .field(FieldDefinition::optional(COUNTRY).with_alias("COUNTRY_CODE"))
        .field(FieldDefinition::optional(ELEVATION).with_alias("ELEV"))
        .field(FieldDefinition::optional(STATUS).with_alias("STATUS_CODE"))
        .with_required_coordinates();

    for &(name, column) in PASS_THROUGH {
        fields = fields.field(FieldDefinition::optional(name).with_alias(column));
    }
    fields
}

pub fn base_filter() -> RowFilter {
    RowFilter::new()
        .require_identifier(IDENTIFIER)
        .require_coordinates()
        .exclude(ExclusionRule::new("tacan-only").on(TYPE).matching(&["TACAN"]))
}

pub fn primary_pass() -> PrimaryPass {
    PrimaryPass::new(
        base_fields(),
        base_filter(),
        IdentityResolver::natural(IDENTIFIER, IdShape::NavaidCode),
    )
}

// ============================================================================
// ROW PARSING + BUILD
// ============================================================================

fn parse_navaid(row: &Row<'_>, identity: &ResolvedIdentity) -> Result<Navaid, RejectReason> {
    let tacan = Tacan {
        id: row.owned("tacan_id"),
        channel: row.owned("tacan_channel"),
        call: row.owned("tacan_call"),
    };
    let has_tacan = tacan.id.is_some() || tacan.channel.is_some() || tacan.call.is_some();

    Ok(Navaid {
        identifier: identity.key.to_string(),
        nav_type: upper_or_empty(row.text(TYPE)),
        name: upper_or_empty(row.text(NAME)),
        state: row.owned(STATE),
        country: row.owned(COUNTRY),
        icao_region: row.owned("icao_region"),
        latitude: coordinate(row.float(LATITUDE)).ok_or(RejectReason::ParseError)?,
        longitude: coordinate(row.float(LONGITUDE)).ok_or(RejectReason::ParseError)?,
        elevation_ft: row.int(ELEVATION),
        frequency_khz_or_mhz: row.owned("frequency"),
        channel: row.owned("channel"),
        status: row.owned(STATUS),
        tacan: has_tacan.then_some(tacan),
        flags: NavaidFlags {
            hiwas: row.owned("hiwas"),
            voice: row.owned("voice"),
            tweb: row.owned("tweb"),
            fanmarker: row.owned("fanmarker"),
            lahso: row.owned("lahso"),
            public_use: row.owned("public_use"),
        },
    })
}

pub fn build<R: Read>(base: SourceReader<R>) -> Result<DatasetOutput<Navaid>, BuildError> {
    let mut parents = Aggregator::new();
    let mut diagnostics = Diagnostics::new(DATASET);

    primary_pass().run(base, &mut parents, &mut diagnostics, parse_navaid)?;

    Ok(finish(parents, diagnostics))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceKind;

    fn build_rows(rows: &[&str]) -> DatasetOutput<Navaid> {
        let data = format!(
            "NAV_ID,NAV_TYPE,NAV_NAME,STATE_CODE,LAT_DECIMAL,LONG_DECIMAL,ELEV,FREQ,TACAN_CHAN,HIWAS\n{}\n",
            rows.join("\n")
        );
        let reader = SourceReader::from_reader(SourceKind::NavBase, data.as_bytes()).unwrap();
        build(reader).unwrap()
    }

    #[test]
    fn test_navaid_fields() {
        let out = build_rows(&["FCM,VOR/DME,Flying Cloud,MN,44.8272,-93.4572,906,111.8,55X,Y"]);

        let fcm = &out.entities[0];
        assert_eq!(fcm.identifier, "FCM");
        assert_eq!(fcm.nav_type, "VOR/DME");
        assert_eq!(fcm.name, "FLYING CLOUD");
        assert_eq!(fcm.latitude, 44.827);
        assert_eq!(fcm.frequency_khz_or_mhz.as_deref(), Some("111.8"));
        assert_eq!(fcm.tacan.as_ref().and_then(|t| t.channel.as_deref()), Some("55X"));
        assert_eq!(fcm.flags.hiwas.as_deref(), Some("Y"));
    }

    #[test]
    fn test_tacan_only_is_excluded() {
        let out = build_rows(&[
            "NUW,TACAN,Whidbey,WA,48.35,-122.65,,,109X,",
            "MSP,VORTAC,Minneapolis,MN,44.9,-93.2,,115.3,100X,",
        ]);

        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.entities[0].identifier, "MSP");
        assert_eq!(out.diagnostics.rejected(RejectReason::Excluded), 1);
    }

    #[test]
    fn test_identifier_shape_and_duplicates() {
        let out = build_rows(&[
            "X,NDB,Too Short,MN,44.9,-93.2,,,,",
            "ABCDE,NDB,Too Long,MN,44.9,-93.2,,,,",
            "MSP,VOR,First,MN,44.9,-93.2,,,,",
            "msp,NDB,Second,MN,44.9,-93.2,,,,",
        ]);

        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.entities[0].name, "FIRST");
        assert_eq!(out.diagnostics.rejected(RejectReason::MissingIdentifier), 2);
        assert_eq!(out.diagnostics.rejected(RejectReason::Duplicate), 1);
        assert!(out.entities[0].tacan.is_none());
    }

    #[test]
    fn test_navaid_json_shape() {
        let out = build_rows(&["MSP,VOR,Minneapolis,MN,44.9,-93.2,,,,"]);
        let json = serde_json::to_value(&out.entities[0]).unwrap();
        assert_eq!(json["type"], "VOR");
        assert!(json["tacan"].is_null());
        assert!(json["flags"].is_object());
    }
}
