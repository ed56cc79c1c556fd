// 🔄 Ingest Passes - One streaming pass per source
// Primary: resolve → filter → identify → insert. Secondary: resolve → filter → key → join.

use crate::aggregator::Aggregator;
use crate::attributes::FieldSet;
use crate::diagnostics::{Diagnostics, RejectReason};
use crate::error::BuildError;
use crate::identity::{IdentityResolver, KeyError, ResolvedIdentity};
use crate::join::{JoinEngine, JoinOutcome};
use crate::parser::{SourceReader, SourceRecord};
use crate::rules::RowFilter;
use crate::schema::{ResolvedSchema, Row};
use std::io::Read;
use tracing::debug;

/// Entities of one finished dataset build plus the counters that explain them
#[derive(Debug, Clone)]
pub struct DatasetOutput<E> {
    pub entities: Vec<E>,
    pub diagnostics: Diagnostics,
}

enum Pulled {
    Record(SourceRecord),
    Undecodable,
}

/// Pull the next record, turning record-level decode errors into counted rejections.
///
/// Returns Ok(None) at end of input; I/O failures abort the pass.
fn next_record<R: Read>(
    reader: &mut SourceReader<R>,
    diagnostics: &mut Diagnostics,
    source: &str,
) -> Result<Option<Pulled>, BuildError> {
    match reader.next() {
        None => Ok(None),
        Some(Ok(record)) => {
            diagnostics.record_read(source);
            Ok(Some(Pulled::Record(record)))
        }
        Some(Err(e)) if e.is_io_error() => Err(BuildError::Csv(e)),
        Some(Err(e)) => {
            diagnostics.record_read(source);
            diagnostics.record_rejected(source, RejectReason::ParseError);
            debug!(source, error = %e, "undecodable record");
            Ok(Some(Pulled::Undecodable))
        }
    }
}

// ============================================================================
// PRIMARY PASS
// ============================================================================

/// PrimaryPass - creates parent entities, first-seen wins
#[derive(Debug, Clone)]
pub struct PrimaryPass {
    pub fields: FieldSet,
    pub filter: RowFilter,
    pub identity: IdentityResolver,
}

impl PrimaryPass {
    pub fn new(fields: FieldSet, filter: RowFilter, identity: IdentityResolver) -> Self {
        PrimaryPass {
            fields,
            filter,
            identity,
        }
    }

    /// Stream `reader` into `parents`.
    ///
    /// `build` turns an accepted row into an entity; it may still reject the
    /// row (e.g., a malformed value the entity cannot do without).
    pub fn run<R, E, F>(
        &self,
        mut reader: SourceReader<R>,
        parents: &mut Aggregator<E>,
        diagnostics: &mut Diagnostics,
        mut build: F,
    ) -> Result<(), BuildError>
    where
        R: Read,
        F: FnMut(&Row<'_>, &ResolvedIdentity) -> Result<E, RejectReason>,
    {
        let source = reader.kind().name();
        let schema = ResolvedSchema::resolve(source, reader.headers(), &self.fields)?;
        diagnostics.track(source);

        while let Some(next) = next_record(&mut reader, diagnostics, source)? {
            let Pulled::Record(record) = next else { continue };
            let row = schema.row(&record);

            let outcome = self
                .filter
                .evaluate(&row)
                .and_then(|_| {
                    self.identity
                        .resolve(&row)
                        .map_err(|_| RejectReason::MissingIdentifier)
                })
                .and_then(|identity| build(&row, &identity).map(|entity| (identity, entity)));

            match outcome {
                Ok((identity, entity)) => {
                    if parents.insert(identity.key, entity) {
                        diagnostics.record_written(source);
                    } else {
                        diagnostics.record_rejected(source, RejectReason::Duplicate);
                    }
                }
                Err(reason) => diagnostics.record_rejected(source, reason),
            }
        }

        debug!(source, entities = parents.len(), "primary pass done");
        Ok(())
    }
}

// ============================================================================
// JOIN PASS
// ============================================================================

/// JoinPass - attaches child rows from a secondary source to existing parents
#[derive(Debug, Clone)]
pub struct JoinPass {
    pub fields: FieldSet,
    pub filter: RowFilter,
    /// Composite key built with the same normalization as the parents' keys
    pub key: IdentityResolver,
    pub join: JoinEngine,
}

impl JoinPass {
    pub fn new(fields: FieldSet, filter: RowFilter, key: IdentityResolver, join: JoinEngine) -> Self {
        JoinPass {
            fields,
            filter,
            key,
            join,
        }
    }

    /// Stream `reader`, attaching each parsed child with `attach`.
    ///
    /// `parse` builds the child value; `attach` appends it to a parent and
    /// returns whether it was new to the collection.
    pub fn run<R, E, C, P, A>(
        &self,
        mut reader: SourceReader<R>,
        parents: &mut Aggregator<E>,
        diagnostics: &mut Diagnostics,
        mut parse: P,
        mut attach: A,
    ) -> Result<(), BuildError>
    where
        R: Read,
        P: FnMut(&Row<'_>) -> Result<C, RejectReason>,
        A: FnMut(&mut E, C) -> bool,
    {
        let source = reader.kind().name();
        let schema = ResolvedSchema::resolve(source, reader.headers(), &self.fields)?;
        diagnostics.track(source);

        while let Some(next) = next_record(&mut reader, diagnostics, source)? {
            let Pulled::Record(record) = next else { continue };
            let row = schema.row(&record);

            let prepared = self
                .filter
                .evaluate(&row)
                .and_then(|_| {
                    self.key.resolve(&row).map_err(|e| match e {
                        KeyError::Absent => RejectReason::MissingKey,
                        KeyError::Invalid => RejectReason::Unmatched,
                    })
                })
                .and_then(|identity| parse(&row).map(|child| (identity, child)));

            let (identity, child) = match prepared {
                Ok(prepared) => prepared,
                Err(reason) => {
                    diagnostics.record_rejected(source, reason);
                    continue;
                }
            };

            match self.join.attach(parents, &identity.key, |parent| attach(parent, child)) {
                JoinOutcome::Attached { inserted: true, .. } => diagnostics.record_written(source),
                JoinOutcome::Attached { inserted: false, .. } => diagnostics.record_merged(source),
                JoinOutcome::Unmatched => diagnostics.record_rejected(source, RejectReason::Unmatched),
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
