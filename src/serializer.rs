// 🧾 Deterministic Serializer - Stable order, fixed precision, all-or-nothing writes
// Entities leave in canonical key order; each child collection is sorted by its own key.

use crate::aggregator::Aggregator;
use crate::entities::Entity;
use crate::error::BuildError;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Decimal places for geographic coordinates in every document
pub const COORDINATE_PLACES: i32 = 3;

/// Sort key for absent sequence numbers; lower than any valid sequence
pub const SEQ_SENTINEL: i64 = i64::MIN;

// ============================================================================
// NUMERIC FORMATTING
// ============================================================================

/// Round half away from zero to `places` decimals; non-finite input is absent
pub fn round_to(value: f64, places: i32) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        // Too large to carry any fractional digits
        return Some(value);
    }
    let rounded = scaled.round() / factor;
    // Normalize -0.0 so it renders as 0.0
    Some(if rounded == 0.0 { 0.0 } else { rounded })
}

pub fn coordinate(value: Option<f64>) -> Option<f64> {
    value.and_then(|v| round_to(v, COORDINATE_PLACES))
}

pub fn sequence_key(seq: Option<i64>) -> i64 {
    seq.unwrap_or(SEQ_SENTINEL)
}

// ============================================================================
// FINALIZE + RENDER
// ============================================================================

/// Entities in canonical order with every child collection sorted
pub fn finalize<E: Entity>(parents: Aggregator<E>) -> Vec<E> {
    let mut entities = parents.into_entities();
    for entity in &mut entities {
        entity.sort_children();
    }
    entities
}

/// Compact JSON array; an empty entity set is refused
pub fn render_document<E: Serialize>(dataset: &str, entities: &[E]) -> Result<Vec<u8>, BuildError> {
    if entities.is_empty() {
        return Err(BuildError::EmptyOutput {
            dataset: dataset.to_string(),
        });
    }
    Ok(serde_json::to_vec(entities)?)
}

/// Write through a sibling temp file and rename, so readers never see a partial document
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    let result = (|| -> Result<(), BuildError> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// TESTS
// ============================================================================
