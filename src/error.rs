//! Error kinds for an acquisition attempt.

use thiserror::Error;

/// Everything that can end (or, for `Transport`, interrupt) an acquisition attempt.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// The navigation location carries no usable analysis id.
    #[error("no analysis id in location '{location}'")]
    InvalidLocation { location: String },

    /// Every candidate location was tried and none produced data.
    #[error("no supported data source found for analysis '{analysis_id}' (tried {tried})")]
    SourceNotFound { analysis_id: String, tried: usize },

    /// A single candidate could not be fetched. The resolver absorbs this and
    /// moves to the next candidate.
    #[error("fetching {location} failed: {source:#}")]
    Transport {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    /// Malformed delimited text.
    #[error("parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// The file-selection collaborator could not hand over the file contents.
    #[error("could not read uploaded file '{file_name}': {message}")]
    ManualRead { file_name: String, message: String },
}

pub type Result<T, E = AcquisitionError> = std::result::Result<T, E>;
