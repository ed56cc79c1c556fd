// 🪪 Identity Resolver - Canonical identifiers, natural or synthetic
// Natural keys are trimmed + upper-cased + shape-checked; keyless rows get a content hash.

use crate::aggregator::CompositeKey;
use crate::schema::Row;
use sha2::{Digest, Sha256};

/// Prefix that marks a content-derived identifier
pub const SYNTHETIC_MARKER: &str = "SYN:";

/// Separator between canonicalized values in the synthetic key string
pub const SYNTHETIC_SEPARATOR: char = '|';

/// Decimal places for coordinates inside the synthetic key string
pub const SYNTHETIC_COORDINATE_PLACES: usize = 6;

// ============================================================================
// NATURAL KEYS
// ============================================================================

/// IdShape - the type-specific shape check applied after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdShape {
    /// Any non-empty value
    Any,
    /// ICAO airport code: "K" followed by 2-3 alphanumerics
    AirportIcao,
    /// Navigation aid code: 2-4 alphanumerics
    NavaidCode,
    /// Published code that must stay out of the synthetic namespace
    Published,
}

impl IdShape {
    pub fn accepts(&self, id: &str) -> bool {
        match self {
            IdShape::Any => !id.is_empty(),
            IdShape::AirportIcao => {
                (3..=4).contains(&id.len())
                    && id.starts_with('K')
                    && id.chars().all(|c| c.is_ascii_alphanumeric())
            }
            IdShape::NavaidCode => {
                (2..=4).contains(&id.len()) && id.chars().all(|c| c.is_ascii_alphanumeric())
            }
            IdShape::Published => !id.is_empty() && !id.starts_with(SYNTHETIC_MARKER),
        }
    }
}

/// Trim, upper-case, and shape-check a raw identifier; None means "treat as absent"
pub fn normalize_identifier(raw: &str, shape: IdShape) -> Option<String> {
    let id = raw.trim().to_uppercase();
    if id.is_empty() || !shape.accepts(&id) {
        None
    } else {
        Some(id)
    }
}

// ============================================================================
// SYNTHETIC KEYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticField {
    /// Upper-cased, trimmed text; absent reads as ""
    Text(&'static str),
    /// Finite number at fixed six decimals; absent or malformed reads as ""
    Coordinate(&'static str),
}

/// SyntheticKey - fixed, ordered field list hashed into an identifier
///
/// Field order, text normalization and numeric formatting are part of the
/// identifier contract; changing any of them changes every synthetic id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticKey {
    fields: Vec<SyntheticField>,
}

impl SyntheticKey {
    pub fn new(fields: Vec<SyntheticField>) -> Self {
        SyntheticKey { fields }
    }

    /// The joined, normalized string that gets hashed
    pub fn canonical_string(&self, row: &Row<'_>) -> String {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| match *field {
                SyntheticField::Text(name) => row.upper(name).unwrap_or_default(),
                SyntheticField::Coordinate(name) => row
                    .float(name)
                    .map(|v| format!("{:.*}", SYNTHETIC_COORDINATE_PLACES, v))
                    .unwrap_or_default(),
            })
            .collect();

        parts.join(&SYNTHETIC_SEPARATOR.to_string())
    }

    pub fn identifier(&self, row: &Row<'_>) -> String {
        synthetic_identifier(&self.canonical_string(row))
    }
}

/// SHA-256 of the canonical string, hex encoded, behind the synthetic marker
pub fn synthetic_identifier(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{}{:x}", SYNTHETIC_MARKER, hasher.finalize())
}

pub fn is_synthetic(id: &str) -> bool {
    id.starts_with(SYNTHETIC_MARKER)
}

// ============================================================================
// IDENTITY RESOLVER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPart {
    pub field: &'static str,
    pub shape: IdShape,
    /// Optional parts read as "" when absent instead of failing the key
    pub optional: bool,
}

impl KeyPart {
    pub fn required(field: &'static str, shape: IdShape) -> Self {
        KeyPart {
            field,
            shape,
            optional: false,
        }
    }

    pub fn optional(field: &'static str) -> Self {
        KeyPart {
            field,
            shape: IdShape::Any,
            optional: true,
        }
    }
}

/// Why a key could not be formed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// A required key field had no value
    Absent,
    /// A value was present but failed its shape check
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub key: CompositeKey,
    pub synthetic: bool,
}

/// IdentityResolver - builds the composite key of a row
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    parts: Vec<KeyPart>,
    synthetic: Option<SyntheticKey>,
}

impl IdentityResolver {
    /// Single natural key
    pub fn natural(field: &'static str, shape: IdShape) -> Self {
        IdentityResolver {
            parts: vec![KeyPart::required(field, shape)],
            synthetic: None,
        }
    }

    /// Ordered multi-field key (e.g., airport + runway)
    pub fn composite(parts: Vec<KeyPart>) -> Self {
        IdentityResolver {
            parts,
            synthetic: None,
        }
    }

    /// Builder: synthesize an identifier when the natural key is unusable
    pub fn with_synthetic_fallback(mut self, key: SyntheticKey) -> Self {
        self.synthetic = Some(key);
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn resolve(&self, row: &Row<'_>) -> Result<ResolvedIdentity, KeyError> {
        match self.natural_key(row) {
            Ok(key) => Ok(ResolvedIdentity {
                key,
                synthetic: false,
            }),
            Err(e) => match &self.synthetic {
                Some(synthetic) => Ok(ResolvedIdentity {
                    key: CompositeKey::single(synthetic.identifier(row)),
                    synthetic: true,
                }),
                None => Err(e),
            },
        }
    }

    fn natural_key(&self, row: &Row<'_>) -> Result<CompositeKey, KeyError> {
        let mut values = Vec::with_capacity(self.parts.len());

        for part in &self.parts {
            match row.text(part.field) {
                Some(raw) => {
                    let id = normalize_identifier(raw, part.shape).ok_or(KeyError::Invalid)?;
                    values.push(id);
                }
                None if part.optional => values.push(String::new()),
                None => return Err(KeyError::Absent),
            }
        }

        Ok(CompositeKey::new(values))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{FieldDefinition, FieldSet};
    use crate::parser::SourceRecord;
    use crate::schema::ResolvedSchema;

    fn schema(headers: &[&'static str]) -> ResolvedSchema {
        let mut set = FieldSet::new("test");
        for &h in headers {
            set = set.field(FieldDefinition::optional(h));
        }
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        ResolvedSchema::resolve("TEST", &headers, &set).unwrap()
    }

    fn record(values: &[&str]) -> SourceRecord {
        SourceRecord::new(2, values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize_identifier("  kmsp ", IdShape::AirportIcao), Some("KMSP".to_string()));
        assert_eq!(normalize_identifier("   ", IdShape::Any), None);
    }

    #[test]
    fn test_airport_shape() {
        assert!(IdShape::AirportIcao.accepts("KMSP"));
        assert!(IdShape::AirportIcao.accepts("K01"));
        assert!(!IdShape::AirportIcao.accepts("MSP"));
        assert!(!IdShape::AirportIcao.accepts("KMSPX"));
        assert!(!IdShape::AirportIcao.accepts("K-SP"));
    }

    #[test]
    fn test_navaid_shape() {
        assert!(IdShape::NavaidCode.accepts("MSP"));
        assert!(IdShape::NavaidCode.accepts("FG"));
        assert!(!IdShape::NavaidCode.accepts("F"));
        assert!(!IdShape::NavaidCode.accepts("ABCDE"));
    }

    #[test]
    fn test_published_ids_stay_out_of_synthetic_space() {
        assert!(IdShape::Published.accepts("ZMP01"));
        assert!(!IdShape::Published.accepts("SYN:ABC"));
    }

    #[test]
    fn test_synthetic_identifier_format() {
        let id = synthetic_identifier("TWR|APPROACH");
        assert!(id.starts_with("SYN:"));
        assert_eq!(id.len(), 4 + 64);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(is_synthetic(&id));
    }

    #[test]
    fn test_synthetic_canonical_string() {
        let s = schema(&["COMM_TYPE", "NAME", "LAT", "LON"]);
        let r = record(&[" twr ", "Approach", "40.1234564", "-80.654321"]);
        let key = SyntheticKey::new(vec![
            SyntheticField::Text("COMM_TYPE"),
            SyntheticField::Text("NAME"),
            SyntheticField::Text("CITY"),
            SyntheticField::Coordinate("LAT"),
            SyntheticField::Coordinate("LON"),
        ]);

        assert_eq!(
            key.canonical_string(&s.row(&r)),
            "TWR|APPROACH||40.123456|-80.654321"
        );
    }

    #[test]
    fn test_composite_key_with_optional_part() {
        let s = schema(&["ARPT", "RWY", "LOC"]);
        let resolver = IdentityResolver::composite(vec![
            KeyPart::required("ARPT", IdShape::Any),
            KeyPart::required("RWY", IdShape::Any),
            KeyPart::optional("LOC"),
        ]);

        let r = record(&["kmsp", "12r", ""]);
        let identity = resolver.resolve(&s.row(&r)).unwrap();
        assert_eq!(identity.key.parts(), &["KMSP", "12R", ""]);
        assert!(!identity.synthetic);

        let r = record(&["", "12R", "IMSP"]);
        assert_eq!(resolver.resolve(&s.row(&r)), Err(KeyError::Absent));
    }

    #[test]
    fn test_invalid_shape_is_distinguished_from_absent() {
        let s = schema(&["ID"]);
        let resolver = IdentityResolver::natural("ID", IdShape::AirportIcao);

        assert_eq!(resolver.resolve(&s.row(&record(&["MSP"]))), Err(KeyError::Invalid));
        assert_eq!(resolver.resolve(&s.row(&record(&[""]))), Err(KeyError::Absent));
    }

    #[test]
    fn test_synthetic_fallback() {
        let s = schema(&["ID", "NAME"]);
        let resolver = IdentityResolver::natural("ID", IdShape::Published)
            .with_synthetic_fallback(SyntheticKey::new(vec![SyntheticField::Text("NAME")]));

        let natural = resolver.resolve(&s.row(&record(&["zmp", "x"]))).unwrap();
        assert_eq!(natural.key.parts(), &["ZMP"]);
        assert!(!natural.synthetic);

        let first = resolver.resolve(&s.row(&record(&["", "minneapolis"]))).unwrap();
        let second = resolver.resolve(&s.row(&record(&["", " MINNEAPOLIS "]))).unwrap();
        assert!(first.synthetic);
        assert_eq!(first.key, second.key, "normalization makes ids stable");
        assert_eq!(first.key.parts()[0], synthetic_identifier("MINNEAPOLIS"));
    }
}
