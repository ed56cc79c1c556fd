// 📊 Diagnostics Collector - Explains every row a build reads
// Per source: rows read, rows written, rows merged, and one counter per rejection reason.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

// ============================================================================
// REJECT REASONS
// ============================================================================

/// Why a row was dropped; every rejection increments exactly one of these
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    #[serde(rename = "skipped-missing-identifier")]
    MissingIdentifier,
    #[serde(rename = "skipped-missing-coordinates")]
    MissingCoordinates,
    #[serde(rename = "skipped-parse-error")]
    ParseError,
    #[serde(rename = "skipped-excluded")]
    Excluded,
    #[serde(rename = "skipped-missing-key")]
    MissingKey,
    #[serde(rename = "skipped-unmatched")]
    Unmatched,
    #[serde(rename = "skipped-duplicate")]
    Duplicate,
}

impl RejectReason {
    pub const ALL: [RejectReason; 7] = [
        RejectReason::MissingIdentifier,
        RejectReason::MissingCoordinates,
        RejectReason::ParseError,
        RejectReason::Excluded,
        RejectReason::MissingKey,
        RejectReason::Unmatched,
        RejectReason::Duplicate,
    ];

    /// Counter name as it appears in summaries and serialized diagnostics
    pub fn counter_name(&self) -> &'static str {
        match self {
            RejectReason::MissingIdentifier => "skipped-missing-identifier",
            RejectReason::MissingCoordinates => "skipped-missing-coordinates",
            RejectReason::ParseError => "skipped-parse-error",
            RejectReason::Excluded => "skipped-excluded",
            RejectReason::MissingKey => "skipped-missing-key",
            RejectReason::Unmatched => "skipped-unmatched",
            RejectReason::Duplicate => "skipped-duplicate",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.counter_name())
    }
}

// ============================================================================
// SOURCE COUNTERS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounters {
    pub rows_read: u64,
    pub rows_written: u64,

    /// Child rows equal to one already attached (informational, not a rejection)
    pub merged: u64,

    pub rejected: BTreeMap<RejectReason, u64>,
}

impl SourceCounters {
    pub fn rejected(&self, reason: RejectReason) -> u64 {
        self.rejected.get(&reason).copied().unwrap_or(0)
    }

    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// rows read = written + rejected + merged
    pub fn is_balanced(&self) -> bool {
        self.rows_read == self.rows_written + self.rejected_total() + self.merged
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Diagnostics - counters for one dataset build, reset every run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub dataset: String,

    /// Keyed by source name (e.g., "APT_RWY_END")
    pub sources: BTreeMap<String, SourceCounters>,

    /// Optional sources that were not present on disk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_sources: Vec<String>,

    /// Entities in the final document
    pub entities_written: u64,
}

impl Diagnostics {
    pub fn new(dataset: &str) -> Self {
        Diagnostics {
            dataset: dataset.to_string(),
            ..Default::default()
        }
    }

    fn source_mut(&mut self, source: &str) -> &mut SourceCounters {
        self.sources.entry(source.to_string()).or_default()
    }

    /// Register a source so it shows up even if it yields no rows
    pub fn track(&mut self, source: &str) {
        self.source_mut(source);
    }

    pub fn record_read(&mut self, source: &str) {
        self.source_mut(source).rows_read += 1;
    }

    pub fn record_written(&mut self, source: &str) {
        self.source_mut(source).rows_written += 1;
    }

    pub fn record_merged(&mut self, source: &str) {
        self.source_mut(source).merged += 1;
    }

    pub fn record_rejected(&mut self, source: &str, reason: RejectReason) {
        *self.source_mut(source).rejected.entry(reason).or_insert(0) += 1;
    }

    pub fn record_missing_source(&mut self, source: &str) {
        if !self.missing_sources.iter().any(|s| s == source) {
            self.missing_sources.push(source.to_string());
        }
    }

    pub fn set_entities_written(&mut self, count: usize) {
        self.entities_written = count as u64;
    }

    pub fn source(&self, source: &str) -> Option<&SourceCounters> {
        self.sources.get(source)
    }

    /// Rejections of one reason summed over every source
    pub fn rejected(&self, reason: RejectReason) -> u64 {
        self.sources.values().map(|c| c.rejected(reason)).sum()
    }

    pub fn rejected_total(&self) -> u64 {
        self.sources.values().map(SourceCounters::rejected_total).sum()
    }

    pub fn rows_read(&self) -> u64 {
        self.sources.values().map(|c| c.rows_read).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.sources.values().all(SourceCounters::is_balanced)
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let mut rejections: BTreeMap<RejectReason, u64> = BTreeMap::new();
        for counters in self.sources.values() {
            for (reason, count) in &counters.rejected {
                *rejections.entry(*reason).or_insert(0) += count;
            }
        }

        let mut line = format!(
            "{}: {} entities from {} rows ({} sources)",
            self.dataset,
            self.entities_written,
            self.rows_read(),
            self.sources.len()
        );
        for (reason, count) in rejections {
            line.push_str(&format!(", {}={}", reason, count));
        }
        line
    }

    /// Emit the summary and per-source counters through tracing
    pub fn log(&self) {
        info!(
            dataset = %self.dataset,
            entities = self.entities_written,
            rows_read = self.rows_read(),
            rejected = self.rejected_total(),
            "dataset built"
        );

        for (source, counters) in &self.sources {
            let rejected: Vec<String> = counters
                .rejected
                .iter()
                .map(|(reason, count)| format!("{}={}", reason, count))
                .collect();
            info!(
                dataset = %self.dataset,
                source = %source,
                rows_read = counters.rows_read,
                rows_written = counters.rows_written,
                merged = counters.merged,
                rejected = %rejected.join(" "),
                "source counters"
            );
        }

        for source in &self.missing_sources {
            warn!(dataset = %self.dataset, source = %source, "optional source not found; skipped");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_balance() {
        let mut diag = Diagnostics::new("airports");
        for _ in 0..4 {
            diag.record_read("APT_BASE");
        }
        diag.record_written("APT_BASE");
        diag.record_written("APT_BASE");
        diag.record_rejected("APT_BASE", RejectReason::Excluded);
        assert!(!diag.is_balanced());

        diag.record_rejected("APT_BASE", RejectReason::Duplicate);
        assert!(diag.is_balanced());
        assert_eq!(diag.rejected_total(), 2);
        assert_eq!(diag.rejected(RejectReason::Excluded), 1);
    }

    #[test]
    fn test_merged_rows_keep_balance() {
        let mut diag = Diagnostics::new("runways");
        diag.record_read("APT_RWY_END");
        diag.record_read("APT_RWY_END");
        diag.record_written("APT_RWY_END");
        diag.record_merged("APT_RWY_END");

        let counters = diag.source("APT_RWY_END").unwrap();
        assert!(counters.is_balanced());
        assert_eq!(counters.rejected_total(), 0);
    }

    #[test]
    fn test_summary_line() {
        let mut diag = Diagnostics::new("navaids");
        diag.record_read("NAV_BASE");
        diag.record_read("NAV_BASE");
        diag.record_written("NAV_BASE");
        diag.record_rejected("NAV_BASE", RejectReason::Excluded);
        diag.set_entities_written(1);

        assert_eq!(
            diag.summary(),
            "navaids: 1 entities from 2 rows (1 sources), skipped-excluded=1"
        );
    }

    #[test]
    fn test_serialized_counter_names() {
        let mut diag = Diagnostics::new("fixes");
        diag.record_read("FIX_BASE");
        diag.record_rejected("FIX_BASE", RejectReason::MissingCoordinates);

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains(r#""skipped-missing-coordinates":1"#));
        assert!(!json.contains("missing_sources"));
    }

    #[test]
    fn test_missing_source_reported_once() {
        let mut diag = Diagnostics::new("airports");
        diag.record_missing_source("FRQ");
        diag.record_missing_source("FRQ");

        assert_eq!(diag.missing_sources, vec!["FRQ"]);
    }

    #[test]
    fn test_reason_names_are_distinct() {
        let mut names: Vec<&str> = RejectReason::ALL.iter().map(|r| r.counter_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), RejectReason::ALL.len());
    }
}
