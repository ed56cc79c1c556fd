// 📐 Schema Resolver - Binds canonical fields to source columns
// Fails fast when a required field has no column; optional fields resolve to absent.

use crate::attributes::{FieldDefinition, FieldSet};
use crate::error::BuildError;
use crate::parser::SourceRecord;
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// FIELD RESOLUTION
// ============================================================================

/// Find the column position carrying a canonical field.
///
/// Order: exact canonical name, then each alias exactly in listed order,
/// then a case-insensitive pass over the full candidate list.
pub fn resolve_column(headers: &[String], definition: &FieldDefinition) -> Option<usize> {
    let exact = |name: &str| headers.iter().position(|h| h == name);

    if let Some(index) = exact(definition.name) {
        return Some(index);
    }

    for &alias in &definition.aliases {
        if let Some(index) = exact(alias) {
            return Some(index);
        }
    }

    definition
        .candidates()
        .find_map(|name| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
}

/// Same as [`resolve_column`] but returns the matching source field name.
pub fn resolve_field<'h>(headers: &'h [String], definition: &FieldDefinition) -> Option<&'h str> {
    resolve_column(headers, definition).map(|i| headers[i].as_str())
}

// ============================================================================
// RESOLVED SCHEMA
// ============================================================================

/// ResolvedSchema - a FieldSet bound to one extract's header
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    source: String,
    headers: Vec<String>,
    columns: HashMap<&'static str, usize>,
}

impl ResolvedSchema {
    /// Resolve every field in the set; the first unresolved required field aborts.
    pub fn resolve(source: &str, headers: &[String], fields: &FieldSet) -> Result<Self, BuildError> {
        let mut columns = HashMap::new();

        for definition in fields.fields() {
            match resolve_column(headers, definition) {
                Some(index) => {
                    columns.insert(definition.name, index);
                }
                None if definition.is_required() => {
                    return Err(BuildError::MissingRequiredField {
                        source_name: source.to_string(),
                        field: definition.name.to_string(),
                        available: headers.to_vec(),
                    });
                }
                None => {}
            }
        }

        Ok(ResolvedSchema {
            source: source.to_string(),
            headers: headers.to_vec(),
            columns,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }

    /// Source column name bound to a canonical field
    pub fn column_name(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(|&i| self.headers[i].as_str())
    }

    pub fn row<'a>(&'a self, record: &'a SourceRecord) -> Row<'a> {
        Row {
            schema: self,
            record,
        }
    }
}

// ============================================================================
// ROW VIEW
// ============================================================================

/// Row - read access to one record through canonical field names
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    schema: &'a ResolvedSchema,
    record: &'a SourceRecord,
}

impl<'a> Row<'a> {
    pub fn line(&self) -> u64 {
        self.record.line
    }

    /// Trimmed value; empty, unresolved and missing all read as None
    pub fn text(&self, field: &str) -> Option<&'a str> {
        let index = *self.schema.columns.get(field)?;
        let value = self.record.get(index)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn owned(&self, field: &str) -> Option<String> {
        self.text(field).map(str::to_string)
    }

    pub fn upper(&self, field: &str) -> Option<String> {
        self.text(field).map(str::to_uppercase)
    }

    /// Finite float, or None (malformed numbers are absent, never an error)
    pub fn float(&self, field: &str) -> Option<f64> {
        self.text(field)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Integer via float truncation, so "1234.0" reads as 1234
    pub fn int(&self, field: &str) -> Option<i64> {
        let value = self.float(field)?.trunc();
        if value >= i64::MIN as f64 && value <= i64::MAX as f64 {
            Some(value as i64)
        } else {
            None
        }
    }

    /// Every non-empty column of the row, keyed by source header
    pub fn non_empty_fields(&self) -> BTreeMap<String, String> {
        self.schema
            .headers
            .iter()
            .zip(self.record.values.iter())
            .filter_map(|(h, v)| {
                let v = v.trim();
                if h.is_empty() || v.is_empty() {
                    None
                } else {
                    Some((h.clone(), v.to_string()))
                }
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{IDENTIFIER, LATITUDE, NAME};

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_canonical_wins_over_alias() {
        let def = FieldDefinition::required(IDENTIFIER).with_alias("ARPT_ID");
        let h = headers(&["ARPT_ID", "identifier"]);
        assert_eq!(resolve_field(&h, &def), Some("identifier"));
    }

    #[test]
    fn test_aliases_in_listed_order() {
        let def = FieldDefinition::required(IDENTIFIER).with_aliases(&["ARPT_ID", "IDENT"]);
        let h = headers(&["IDENT", "ARPT_ID"]);
        assert_eq!(resolve_field(&h, &def), Some("ARPT_ID"));
    }

    #[test]
    fn test_case_insensitive_is_last_resort() {
        let def = FieldDefinition::required(LATITUDE).with_aliases(&["LAT_DECIMAL", "LAT"]);
        let h = headers(&["lat", "Lat_Decimal"]);
        // Both match case-insensitively; candidate order decides
        assert_eq!(resolve_field(&h, &def), Some("Lat_Decimal"));

        let h = headers(&["lat", "LAT"]);
        assert_eq!(resolve_field(&h, &def), Some("LAT"));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let set = FieldSet::new("airport")
            .field(FieldDefinition::required(IDENTIFIER).with_alias("ARPT_ID"))
            .field(FieldDefinition::optional(NAME));

        let err = ResolvedSchema::resolve("APT_BASE", &headers(&["NAME", "CITY"]), &set).unwrap_err();
        match err {
            BuildError::MissingRequiredField { source_name, field, available } => {
                assert_eq!(source_name, "APT_BASE");
                assert_eq!(field, "identifier");
                assert_eq!(available, vec!["NAME", "CITY"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_optional_field_resolves_absent() {
        let set = FieldSet::new("airport")
            .field(FieldDefinition::required(IDENTIFIER).with_alias("ARPT_ID"))
            .field(FieldDefinition::optional(NAME));

        let schema = ResolvedSchema::resolve("APT_BASE", &headers(&["ARPT_ID"]), &set).unwrap();
        assert!(schema.has(IDENTIFIER));
        assert!(!schema.has(NAME));
        assert_eq!(schema.column_name(IDENTIFIER), Some("ARPT_ID"));

        let record = SourceRecord::new(2, vec!["KMSP".to_string()]);
        let row = schema.row(&record);
        assert_eq!(row.text(IDENTIFIER), Some("KMSP"));
        assert_eq!(row.text(NAME), None);
    }

    #[test]
    fn test_row_numeric_parsing() {
        let set = FieldSet::new("test")
            .field(FieldDefinition::optional("a"))
            .field(FieldDefinition::optional("b"))
            .field(FieldDefinition::optional("c"))
            .field(FieldDefinition::optional("d"));
        let schema = ResolvedSchema::resolve("T", &headers(&["a", "b", "c", "d"]), &set).unwrap();
        let record = SourceRecord::new(
            2,
            vec![" 44.882 ".into(), "abc".into(), "1234.9".into(), "NaN".into()],
        );
        let row = schema.row(&record);

        assert_eq!(row.float("a"), Some(44.882));
        assert_eq!(row.float("b"), None);
        assert_eq!(row.int("c"), Some(1234));
        assert_eq!(row.float("d"), None, "non-finite values are absent");
    }

    #[test]
    fn test_non_empty_fields() {
        let set = FieldSet::new("test");
        let schema = ResolvedSchema::resolve("T", &headers(&["A", "B", "C"]), &set).unwrap();
        let record = SourceRecord::new(2, vec!["x".into(), "  ".into(), " y ".into()]);

        let fields = schema.row(&record).non_empty_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("C").map(String::as_str), Some("y"));
    }
}
