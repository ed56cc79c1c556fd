// 🏗️ Source Reader - Streams NASR CSV extracts row by row
// Header row required; rows are decoded lossily and never held beyond one pass.

use crate::error::BuildError;
use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

// ============================================================================
// SOURCE KIND
// ============================================================================

/// SourceKind - which NASR extract a reader is streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    AptBase,
    AptRwy,
    AptRwyEnd,
    Frq,
    NavBase,
    FixBase,
    Com,
    AwyBase,
    AwySegAlt,
    IlsBase,
    IlsDme,
    IlsGs,
    IlsMkr,
    DpBase,
    DpRte,
    DpApt,
    StarBase,
    StarRte,
    StarApt,
}

impl SourceKind {
    pub const ALL: [SourceKind; 19] = [
        SourceKind::AptBase,
        SourceKind::AptRwy,
        SourceKind::AptRwyEnd,
        SourceKind::Frq,
        SourceKind::NavBase,
        SourceKind::FixBase,
        SourceKind::Com,
        SourceKind::AwyBase,
        SourceKind::AwySegAlt,
        SourceKind::IlsBase,
        SourceKind::IlsDme,
        SourceKind::IlsGs,
        SourceKind::IlsMkr,
        SourceKind::DpBase,
        SourceKind::DpRte,
        SourceKind::DpApt,
        SourceKind::StarBase,
        SourceKind::StarRte,
        SourceKind::StarApt,
    ];

    /// Extract name as published in the NASR CSV bundle
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::AptBase => "APT_BASE",
            SourceKind::AptRwy => "APT_RWY",
            SourceKind::AptRwyEnd => "APT_RWY_END",
            SourceKind::Frq => "FRQ",
            SourceKind::NavBase => "NAV_BASE",
            SourceKind::FixBase => "FIX_BASE",
            SourceKind::Com => "COM",
            SourceKind::AwyBase => "AWY_BASE",
            SourceKind::AwySegAlt => "AWY_SEG_ALT",
            SourceKind::IlsBase => "ILS_BASE",
            SourceKind::IlsDme => "ILS_DME",
            SourceKind::IlsGs => "ILS_GS",
            SourceKind::IlsMkr => "ILS_MKR",
            SourceKind::DpBase => "DP_BASE",
            SourceKind::DpRte => "DP_RTE",
            SourceKind::DpApt => "DP_APT",
            SourceKind::StarBase => "STAR_BASE",
            SourceKind::StarRte => "STAR_RTE",
            SourceKind::StarApt => "STAR_APT",
        }
    }

    /// Default file name inside the extracted bundle
    pub fn default_file(&self) -> String {
        format!("{}.csv", self.name())
    }
}

// ============================================================================
// SOURCE RECORD
// ============================================================================

/// SourceRecord - one data row, values aligned with the reader's headers
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// 1-indexed line in the extract (header is line 1)
    pub line: u64,
    pub values: Vec<String>,
}

impl SourceRecord {
    pub fn new(line: u64, values: Vec<String>) -> Self {
        SourceRecord { line, values }
    }

    /// Raw value at a column position; short rows read as absent
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|v| v.as_str())
    }
}

// ============================================================================
// SOURCE READER
// ============================================================================

pub struct SourceReader<R> {
    kind: SourceKind,
    headers: Vec<String>,
    reader: csv::Reader<R>,
    buffer: ByteRecord,
}

impl SourceReader<File> {
    /// Open an extract on disk
    pub fn open(kind: SourceKind, path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open {} extract: {}", kind.name(), path.display()))?;

        SourceReader::from_reader(kind, file)
            .with_context(|| format!("Failed to read header of {}", path.display()))
    }
}

impl<R: Read> SourceReader<R> {
    /// Wrap any reader; the header row is consumed immediately
    pub fn from_reader(kind: SourceKind, rdr: R) -> std::result::Result<Self, BuildError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| decode(h).trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        Ok(SourceReader {
            kind,
            headers,
            reader,
            buffer: ByteRecord::new(),
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> Iterator for SourceReader<R> {
    type Item = std::result::Result<SourceRecord, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.buffer) {
            Ok(true) => {
                let line = self.buffer.position().map(|p| p.line()).unwrap_or(0);
                let values = self.buffer.iter().map(decode).collect();
                Some(Ok(SourceRecord::new(line, values)))
            }
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Invalid UTF-8 is replaced, not rejected (extracts occasionally carry Latin-1 names)
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ============================================================================
// TESTS
// ============================================================================
