// 🏛️ Field Tables - Canonical fields and their source aliases
// One table per (entity type, source role); extracts differ, canonical names don't.

use serde::Serialize;

// ============================================================================
// CANONICAL FIELD NAMES (shared across entity types)
// ============================================================================

pub const IDENTIFIER: &str = "identifier";
pub const AIRPORT: &str = "airport";
pub const RUNWAY: &str = "runway";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const NAME: &str = "name";
pub const CITY: &str = "city";
pub const STATE: &str = "state";
pub const COUNTRY: &str = "country";
pub const ELEVATION: &str = "elevation";
pub const STATUS: &str = "status";
pub const TYPE: &str = "type";
pub const SEQUENCE: &str = "sequence";

/// Aliases accepted for decimal latitude columns across NASR extracts.
pub const LATITUDE_ALIASES: &[&str] = &["LAT_DECIMAL", "LAT_DEG", "LATITUDE", "LAT", "Y"];

/// Aliases accepted for decimal longitude columns across NASR extracts.
pub const LONGITUDE_ALIASES: &[&str] = &["LONG_DECIMAL", "LONG_DEG", "LONGITUDE", "LON", "X"];

// ============================================================================
// FIELD DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Presence {
    /// Column must exist in the header; resolution failure aborts the build
    Required,
    /// Column may be missing; reads as absent
    Optional,
}

/// FieldDefinition - canonical field plus the ordered column names that can carry it
///
/// The canonical name is tried first, then aliases in listed order, then a
/// case-insensitive pass over the whole candidate list.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    /// Canonical name the engine reads by (e.g., "identifier")
    pub name: &'static str,

    /// Alternate column names, in preference order
    pub aliases: Vec<&'static str>,

    pub presence: Presence,
}

impl FieldDefinition {
    pub fn required(name: &'static str) -> Self {
        FieldDefinition {
            name,
            aliases: Vec::new(),
            presence: Presence::Required,
        }
    }

    pub fn optional(name: &'static str) -> Self {
        FieldDefinition {
            name,
            aliases: Vec::new(),
            presence: Presence::Optional,
        }
    }

    /// Builder: add one alternate column name
    pub fn with_alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Builder: add several alternate column names, keeping their order
    pub fn with_aliases(mut self, aliases: &[&'static str]) -> Self {
        self.aliases.extend_from_slice(aliases);
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Canonical name followed by every alias, in resolution order
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

// ============================================================================
// FIELD SET
// ============================================================================

/// FieldSet - the declarative schema of one source for one entity type
#[derive(Debug, Clone, Serialize)]
pub struct FieldSet {
    /// Entity type this set feeds (e.g., "airport", "airport-runway")
    pub entity: &'static str,
    fields: Vec<FieldDefinition>,
}

impl FieldSet {
    pub fn new(entity: &'static str) -> Self {
        FieldSet {
            entity,
            fields: Vec::new(),
        }
    }

    /// Builder: register a field (later registrations with the same name replace earlier ones)
    pub fn field(mut self, definition: FieldDefinition) -> Self {
        self.fields.retain(|f| f.name != definition.name);
        self.fields.push(definition);
        self
    }

    /// Builder: required latitude/longitude with the standard aliases
    pub fn with_required_coordinates(self) -> Self {
        self.field(FieldDefinition::required(LATITUDE).with_aliases(LATITUDE_ALIASES))
            .field(FieldDefinition::required(LONGITUDE).with_aliases(LONGITUDE_ALIASES))
    }

    /// Builder: optional latitude/longitude with the standard aliases
    pub fn with_optional_coordinates(self) -> Self {
        self.field(FieldDefinition::optional(LATITUDE).with_aliases(LATITUDE_ALIASES))
            .field(FieldDefinition::optional(LONGITUDE).with_aliases(LONGITUDE_ALIASES))
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
