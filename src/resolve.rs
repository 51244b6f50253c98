//! Locating the raw data for an analysis.
//!
//! Candidate locations are tried strictly in order; the first one that can be
//! fetched wins. Failures of individual candidates are recorded and absorbed.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use url::Url;

use crate::error::{AcquisitionError, Result};
use crate::fetch::{AssetPath, SourceFetcher};

/// Opaque dataset token, taken from the final path segment of a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnalysisId(String);

impl AnalysisId {
    /// Accepts an absolute URL (`https://host/interactive/abc`) or a bare
    /// path (`/interactive/abc`). Query and fragment are ignored. The segment
    /// is percent-decoded once, so `a%20b` names the `a b` directory.
    pub fn from_location(location: &str) -> Result<Self> {
        let invalid = || AcquisitionError::InvalidLocation {
            location: location.to_string(),
        };
        let url = Url::parse(location)
            .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(location)))
            .map_err(|_| invalid())?;
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("");
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| invalid())?;
        // the id becomes a path segment of every candidate location
        if decoded.is_empty()
            || decoded == "."
            || decoded == ".."
            || decoded.contains(['/', '\\'])
        {
            return Err(invalid());
        }
        Ok(Self(decoded.into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Delimited,
    SpreadsheetConverted,
    ManualUpload,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Delimited => "delimited text",
            SourceKind::SpreadsheetConverted => "spreadsheet converted to delimited text",
            SourceKind::ManualUpload => "manual upload",
        })
    }
}

/// One place the data might live: `analyses/<id>/<file_name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub file_name: String,
    pub kind: SourceKind,
}

impl Candidate {
    pub fn path_for(&self, id: &AnalysisId) -> AssetPath {
        AssetPath::new(["analyses", id.as_str(), self.file_name.as_str()])
    }
}

/// `data.csv` first, then the spreadsheet export.
pub fn default_candidates() -> Vec<Candidate> {
    vec![
        Candidate {
            file_name: "data.csv".into(),
            kind: SourceKind::Delimited,
        },
        Candidate {
            file_name: "excel_as_csv.csv".into(),
            kind: SourceKind::SpreadsheetConverted,
        },
    ]
}

/// Text payload plus where it came from. Never modified after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    pub kind: SourceKind,
    pub origin: String,
    pub text: String,
}

impl RawSource {
    /// Decode `bytes` as UTF-8, replacing invalid sequences.
    pub fn from_bytes(kind: SourceKind, origin: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            kind,
            origin: origin.into(),
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Receives human-readable progress notes for the diagnostic log.
pub trait DiagnosticSink {
    fn note(&mut self, message: String);
}

impl DiagnosticSink for Vec<String> {
    fn note(&mut self, message: String) {
        self.push(message);
    }
}

/// Try each candidate in order, returning the first that can be fetched.
///
/// Records exactly one note per candidate tried. A later candidate is never
/// fetched once an earlier one has succeeded.
pub async fn resolve<F, D>(
    fetcher: &F,
    id: &AnalysisId,
    candidates: &[Candidate],
    diagnostics: &mut D,
) -> Result<RawSource>
where
    F: SourceFetcher,
    D: DiagnosticSink + Send,
{
    let total = candidates.len();
    for (idx, candidate) in candidates.iter().enumerate() {
        let path = candidate.path_for(id);
        let location = fetcher.describe(&path);

        match fetcher.fetch(&path).await {
            Ok(bytes) => {
                info!(%id, %location, bytes = bytes.len(), "candidate found");
                diagnostics.note(format!(
                    "candidate {}/{} ({}) loaded from {}, {} bytes",
                    idx + 1,
                    total,
                    candidate.kind,
                    location,
                    bytes.len()
                ));
                return Ok(RawSource::from_bytes(candidate.kind, location, &bytes));
            }
            Err(source) => {
                let err = AcquisitionError::Transport { location, source };
                warn!(%id, error = %err, "candidate unavailable");
                diagnostics.note(format!(
                    "candidate {}/{} ({}) unavailable: {}",
                    idx + 1,
                    total,
                    candidate.kind,
                    err
                ));
            }
        }
    }

    Err(AcquisitionError::SourceNotFound {
        analysis_id: id.to_string(),
        tried: total,
    })
}
