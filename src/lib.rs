//! Loads a delimited-text dataset for an analysis, types its cells, picks
//! the numeric columns and projects the result into a preview and a chart.

pub mod acquire;
pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod present;
pub mod resolve;

pub use acquire::{AcquisitionHandle, AcquisitionState, Dataset, ManualUpload, Snapshot};
pub use config::{AcquireSettings, Config};
pub use error::AcquisitionError;
