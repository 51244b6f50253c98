use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::AcquisitionError;
use crate::parse::{ParseIssue, Row};
use crate::resolve::SourceKind;

/// A parsed and classified dataset, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Numeric subset of `columns`, in header order.
    pub numeric_columns: Vec<String>,
    pub source_kind: SourceKind,
    pub origin: String,
    pub issues: Vec<ParseIssue>,
}

impl Dataset {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }

    /// The chart's value series: first numeric column in header order.
    pub fn value_column(&self) -> Option<&str> {
        self.numeric_columns.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AcquisitionState {
    Loading,
    Ready(Dataset),
    Failed { message: String },
}

impl AcquisitionState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, AcquisitionState::Loading)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match self {
            AcquisitionState::Ready(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEntry {
    pub at: DateTime<Utc>,
    pub generation: u64,
    pub message: String,
}

/// Append-only record of what each attempt did. Only ever read for display.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DiagnosticLog {
    entries: Vec<DiagnosticEntry>,
}

impl DiagnosticLog {
    fn append(&mut self, generation: u64, message: String) {
        info!(generation, "{}", message);
        self.entries.push(DiagnosticEntry {
            at: Utc::now(),
            generation,
            message,
        });
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `[HH:MM:SS.mmm] message` lines for a debug panel.
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("[{}] {}", e.at.format("%H:%M:%S%.3f"), e.message))
            .collect()
    }
}

/// What started an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    Automatic { location: String },
    Manual { file_name: String },
}

#[derive(Debug)]
pub enum Message {
    Started {
        generation: u64,
        trigger: Trigger,
    },
    Note {
        generation: u64,
        text: String,
    },
    Finished {
        generation: u64,
        outcome: Result<Dataset, AcquisitionError>,
    },
}

impl Message {
    fn generation(&self) -> u64 {
        match self {
            Message::Started { generation, .. }
            | Message::Note { generation, .. }
            | Message::Finished { generation, .. } => *generation,
        }
    }
}

/// Everything a renderer needs, as of one moment.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub state: AcquisitionState,
    pub log: DiagnosticLog,
}

/// Owns the acquisition state and the diagnostic log.
///
/// Messages from any generation other than the current one are dropped, so
/// a slow automatic attempt cannot overwrite a later manual upload. Once the
/// current attempt settles, further notes for it are dropped too.
#[derive(Debug)]
pub struct AcquisitionMachine {
    generation: u64,
    state: AcquisitionState,
    log: DiagnosticLog,
}

impl Default for AcquisitionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionMachine {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: AcquisitionState::Loading,
            log: DiagnosticLog::default(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            state: self.state.clone(),
            log: self.log.clone(),
        }
    }

    /// Apply one message. Returns false when it was discarded.
    pub fn update(&mut self, msg: Message) -> bool {
        let generation = msg.generation();
        match msg {
            Message::Started {
                generation,
                trigger,
            } => {
                if generation <= self.generation {
                    debug!(generation, current = self.generation, "stale start ignored");
                    return false;
                }
                self.generation = generation;
                self.state = AcquisitionState::Loading;
                let text = match trigger {
                    Trigger::Automatic { location } => {
                        format!("attempt {} started: automatic load for {}", generation, location)
                    }
                    Trigger::Manual { file_name } => {
                        format!("attempt {} started: manual upload of {}", generation, file_name)
                    }
                };
                self.log.append(generation, text);
                true
            }
            _ if generation != self.generation => {
                debug!(generation, current = self.generation, "message from stale attempt dropped");
                false
            }
            _ if self.state.is_settled() => {
                debug!(generation, "attempt already settled, message dropped");
                false
            }
            Message::Note { text, .. } => {
                self.log.append(generation, text);
                true
            }
            Message::Finished { outcome, .. } => {
                match outcome {
                    Ok(dataset) => {
                        self.log.append(
                            generation,
                            format!(
                                "ready: {} rows, {} columns from {}",
                                dataset.rows.len(),
                                dataset.columns.len(),
                                dataset.source_kind
                            ),
                        );
                        self.state = AcquisitionState::Ready(dataset);
                    }
                    Err(err) => {
                        let message = err.to_string();
                        self.log.append(generation, format!("failed: {}", message));
                        self.state = AcquisitionState::Failed { message };
                    }
                }
                true
            }
        }
    }
}
