// 🚧 Row Filter - Acceptance rules as data
// Fixed evaluation order: required fields, then coordinates, then domain exclusions.

use crate::attributes::{LATITUDE, LONGITUDE};
use crate::diagnostics::RejectReason;
use crate::schema::Row;
use serde::Serialize;

// ============================================================================
// PATTERN MATCHING
// ============================================================================

/// Case-insensitive pattern match.
///
/// Without `*` the pattern must equal the whole value. With `*`, the pieces
/// between wildcards must appear in order, anchored at the ends unless the
/// pattern starts/ends with `*` (so `*HELI*` is a substring test).
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_uppercase();
    let text = text.to_uppercase();

    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !text.starts_with(first) {
        return false;
    }
    if text.len() < first.len() + last.len() || !text.ends_with(last) {
        return false;
    }

    let end = text.len() - last.len();
    let mut cursor = first.len();
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match text[cursor..end].find(part) {
            Some(pos) => cursor += pos + part.len(),
            None => return false,
        }
    }

    true
}

// ============================================================================
// EXCLUSION RULE
// ============================================================================

/// ExclusionRule - rejects a row when any watched field matches any pattern
#[derive(Debug, Clone, Serialize)]
pub struct ExclusionRule {
    /// Rule ID for logs (e.g., "heliport")
    pub id: &'static str,

    /// Canonical fields inspected, in order
    pub fields: Vec<&'static str>,

    /// Patterns (supports wildcards with *)
    pub patterns: Vec<&'static str>,
}

impl ExclusionRule {
    pub fn new(id: &'static str) -> Self {
        ExclusionRule {
            id,
            fields: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Builder: inspect another canonical field
    pub fn on(mut self, field: &'static str) -> Self {
        self.fields.push(field);
        self
    }

    /// Builder: add match patterns
    pub fn matching(mut self, patterns: &[&'static str]) -> Self {
        self.patterns.extend_from_slice(patterns);
        self
    }

    pub fn matches(&self, row: &Row<'_>) -> bool {
        self.fields.iter().any(|field| {
            row.text(field)
                .map(|value| self.patterns.iter().any(|p| pattern_matches(p, value)))
                .unwrap_or(false)
        })
    }
}

// ============================================================================
// ROW FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
struct RequiredField {
    field: &'static str,
    reason: RejectReason,
}

/// RowFilter - the predicate chain run on every row before identity resolution
#[derive(Debug, Clone, Default, Serialize)]
pub struct RowFilter {
    required: Vec<RequiredField>,
    coordinates: bool,
    exclusions: Vec<ExclusionRule>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: the identifier field must be present
    pub fn require_identifier(self, field: &'static str) -> Self {
        self.require(field, RejectReason::MissingIdentifier)
    }

    /// Builder: a join key field must be present
    pub fn require_key(self, field: &'static str) -> Self {
        self.require(field, RejectReason::MissingKey)
    }

    fn require(mut self, field: &'static str, reason: RejectReason) -> Self {
        self.required.push(RequiredField { field, reason });
        self
    }

    /// Builder: latitude and longitude must be present and finite
    pub fn require_coordinates(mut self) -> Self {
        self.coordinates = true;
        self
    }

    /// Builder: add a domain exclusion
    pub fn exclude(mut self, rule: ExclusionRule) -> Self {
        self.exclusions.push(rule);
        self
    }

    pub fn exclusion_count(&self) -> usize {
        self.exclusions.len()
    }

    /// First failing predicate, in evaluation order
    pub fn evaluate(&self, row: &Row<'_>) -> Result<(), RejectReason> {
        for required in &self.required {
            if row.text(required.field).is_none() {
                return Err(required.reason);
            }
        }

        if self.coordinates {
            check_coordinates(row)?;
        }

        if let Some(rule) = self.exclusions.iter().find(|rule| rule.matches(row)) {
            tracing::trace!(rule = rule.id, line = row.line(), "row excluded");
            return Err(RejectReason::Excluded);
        }

        Ok(())
    }
}

/// Absent coordinates and unparseable coordinates are counted apart
fn check_coordinates(row: &Row<'_>) -> Result<(), RejectReason> {
    if row.text(LATITUDE).is_none() || row.text(LONGITUDE).is_none() {
        return Err(RejectReason::MissingCoordinates);
    }
    if row.float(LATITUDE).is_none() || row.float(LONGITUDE).is_none() {
        return Err(RejectReason::ParseError);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{FieldDefinition, FieldSet, IDENTIFIER, STATUS, TYPE};
    use crate::parser::SourceRecord;
    use crate::schema::ResolvedSchema;

    fn schema() -> ResolvedSchema {
        let set = FieldSet::new("test")
            .field(FieldDefinition::optional(IDENTIFIER).with_alias("ID"))
            .field(FieldDefinition::optional(TYPE).with_alias("TYPE"))
            .field(FieldDefinition::optional(STATUS).with_alias("STATUS"))
            .with_optional_coordinates();
        let headers: Vec<String> = ["ID", "LAT", "LON", "TYPE", "STATUS"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ResolvedSchema::resolve("TEST", &headers, &set).unwrap()
    }

    fn record(values: &[&str]) -> SourceRecord {
        SourceRecord::new(2, values.iter().map(|s| s.to_string()).collect())
    }

    fn airport_filter() -> RowFilter {
        RowFilter::new()
            .require_identifier(IDENTIFIER)
            .require_coordinates()
            .exclude(ExclusionRule::new("private").on(TYPE).matching(&["*PRIVATE*", "PR"]))
            .exclude(ExclusionRule::new("closed").on(STATUS).matching(&["*CLOSED*"]))
    }

    #[test]
    fn test_exact_pattern_is_whole_value() {
        assert!(pattern_matches("PR", "pr"));
        assert!(!pattern_matches("PR", "PRIVATE"));
        assert!(!pattern_matches("H", "HELIPORT"));
    }

    #[test]
    fn test_wildcard_pattern() {
        assert!(pattern_matches("*HELI*", "HELIPORT"));
        assert!(pattern_matches("*HELI*", "hospital heliport"));
        assert!(pattern_matches("SEA*", "SEAPLANE BASE"));
        assert!(!pattern_matches("SEA*", "BASE SEA"));
        assert!(pattern_matches("*BASE", "SEAPLANE BASE"));
        assert!(pattern_matches("S*P*E", "SEAPLANE"));
        assert!(!pattern_matches("AB*BA", "ABA"));
    }

    #[test]
    fn test_private_airport_is_excluded() {
        let s = schema();
        let r = record(&["KMSP", "44.882", "-93.222", "PRIVATE", ""]);
        assert_eq!(airport_filter().evaluate(&s.row(&r)), Err(RejectReason::Excluded));
    }

    #[test]
    fn test_public_airport_passes() {
        let s = schema();
        let r = record(&["KMSP", "44.882", "-93.222", "PU", "O"]);
        assert_eq!(airport_filter().evaluate(&s.row(&r)), Ok(()));
    }

    #[test]
    fn test_evaluation_order() {
        let s = schema();

        // Missing id wins over a private flag
        let r = record(&["", "44.882", "-93.222", "PRIVATE", ""]);
        assert_eq!(airport_filter().evaluate(&s.row(&r)), Err(RejectReason::MissingIdentifier));

        // Coordinates are checked before exclusions
        let r = record(&["KMSP", "", "-93.222", "PRIVATE", ""]);
        assert_eq!(airport_filter().evaluate(&s.row(&r)), Err(RejectReason::MissingCoordinates));
    }

    #[test]
    fn test_unparseable_coordinates_are_parse_errors() {
        let s = schema();
        let r = record(&["KMSP", "44-52-N", "-93.222", "", ""]);
        assert_eq!(airport_filter().evaluate(&s.row(&r)), Err(RejectReason::ParseError));
    }

    #[test]
    fn test_missing_key_reason() {
        let s = schema();
        let filter = RowFilter::new().require_key(IDENTIFIER);
        assert_eq!(filter.evaluate(&s.row(&record(&["", "", "", "", ""]))), Err(RejectReason::MissingKey));
    }
}
