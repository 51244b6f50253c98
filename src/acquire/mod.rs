//! Runs acquisition attempts and owns their outcome.
//!
//! [`AcquisitionHandle`] spawns a single reducer task that owns the
//! [`AcquisitionMachine`]. Each attempt runs in its own task and reports back
//! over an mpsc channel, tagged with its generation; the reducer publishes a
//! [`Snapshot`] through a watch channel after every accepted message.

pub mod state;
pub mod upload;

use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::config::AcquireSettings;
use crate::error::{AcquisitionError, Result};
use crate::fetch::SourceFetcher;
use crate::parse::parse;
use crate::resolve::{resolve, AnalysisId, DiagnosticSink, RawSource};

pub use state::{
    AcquisitionMachine, AcquisitionState, Dataset, DiagnosticEntry, DiagnosticLog, Message,
    Snapshot, Trigger,
};
pub use upload::ManualUpload;

/// Forwards notes from one attempt to the reducer.
#[derive(Clone)]
struct Reporter {
    generation: u64,
    tx: mpsc::UnboundedSender<Message>,
}

impl Reporter {
    fn finish(self, outcome: Result<Dataset>) {
        let _ = self.tx.send(Message::Finished {
            generation: self.generation,
            outcome,
        });
    }
}

impl DiagnosticSink for Reporter {
    fn note(&mut self, text: String) {
        // the reducer may already be gone during shutdown
        let _ = self.tx.send(Message::Note {
            generation: self.generation,
            text,
        });
    }
}

/// Parse and classify a raw source.
pub fn analyse<D: DiagnosticSink>(
    raw: RawSource,
    settings: &AcquireSettings,
    diagnostics: &mut D,
) -> Result<Dataset> {
    let parsed = parse(&raw.text, settings.parse)?;
    diagnostics.note(format!(
        "parsed {} rows; columns: {}",
        parsed.rows.len(),
        parsed.columns.join(", ")
    ));
    for issue in &parsed.issues {
        diagnostics.note(format!("line {}: {}", issue.line, issue.message));
    }

    let numeric = classify(&parsed.rows, &parsed.columns);
    if parsed.is_empty() {
        diagnostics.note(format!(
            "dataset is empty: no data rows under {} columns",
            parsed.columns.len()
        ));
    }
    let numeric_columns: Vec<String> = {
        let mut seen = HashSet::with_capacity(numeric.len());
        let ordered = parsed
            .columns
            .iter()
            .filter(|col| numeric.contains(*col) && seen.insert(col.as_str()))
            .cloned()
            .collect();
        ordered
    };
    diagnostics.note(format!("numeric columns: {}", numeric_columns.join(", ")));

    Ok(Dataset {
        columns: parsed.columns,
        rows: parsed.rows,
        numeric_columns,
        source_kind: raw.kind,
        origin: raw.origin,
        issues: parsed.issues,
    })
}

async fn resolve_location<F: SourceFetcher>(
    fetcher: &F,
    settings: &AcquireSettings,
    location: &str,
    reporter: &mut Reporter,
) -> Result<RawSource> {
    let id = AnalysisId::from_location(location)?;
    reporter.note(format!("analysis id: {}", id));
    let raw = resolve(fetcher, &id, &settings.candidates, reporter).await?;
    reporter.note(format!("received {} bytes of text", raw.text.len()));
    Ok(raw)
}

/// Run [`analyse`] on the blocking pool and report the attempt's outcome.
async fn analyse_and_finish(
    raw: Result<RawSource>,
    settings: Arc<AcquireSettings>,
    reporter: Reporter,
) {
    let fallback = reporter.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let mut reporter = reporter;
        let outcome = raw.and_then(|raw| analyse(raw, &settings, &mut reporter));
        reporter.finish(outcome);
    })
    .await;

    // a panicked parse would otherwise leave the attempt loading forever
    if let Err(e) = joined {
        error!(generation = fallback.generation, "analysis task failed: {}", e);
        fallback.finish(Err(AcquisitionError::Parse {
            line: 0,
            message: format!("analysis aborted: {}", e),
        }));
    }
}

/// Front door for the acquisition state machine.
pub struct AcquisitionHandle<F> {
    fetcher: Arc<F>,
    settings: Arc<AcquireSettings>,
    tx: mpsc::UnboundedSender<Message>,
    snapshots: watch::Receiver<Snapshot>,
    generation: AtomicU64,
    mounted: AtomicBool,
    reducer: JoinHandle<()>,
}

impl<F: SourceFetcher + 'static> AcquisitionHandle<F> {
    /// Spawn the reducer task. Must be called inside a tokio runtime.
    pub fn spawn(fetcher: F, settings: AcquireSettings) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let machine = AcquisitionMachine::new();
        let (snap_tx, snapshots) = watch::channel(machine.snapshot());

        let reducer = tokio::spawn(async move {
            let mut machine = machine;
            while let Some(msg) = rx.recv().await {
                if machine.update(msg) {
                    snap_tx.send_replace(machine.snapshot());
                }
            }
            debug!("acquisition reducer stopped");
        });

        Self {
            fetcher: Arc::new(fetcher),
            settings: Arc::new(settings),
            tx,
            snapshots,
            generation: AtomicU64::new(0),
            mounted: AtomicBool::new(false),
            reducer,
        }
    }

    fn begin(&self, trigger: Trigger) -> Reporter {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, ?trigger, "attempt started");
        // sent before the attempt task exists, so it precedes all of its notes
        let _ = self.tx.send(Message::Started {
            generation,
            trigger,
        });
        Reporter {
            generation,
            tx: self.tx.clone(),
        }
    }

    /// Run the automatic path for `location`. Only the first call does
    /// anything; returns whether an attempt was started.
    pub fn mount(&self, location: &str) -> bool {
        if self.mounted.swap(true, Ordering::SeqCst) {
            warn!(location, "already mounted; automatic load runs once");
            return false;
        }

        let mut reporter = self.begin(Trigger::Automatic {
            location: location.to_string(),
        });
        let fetcher = Arc::clone(&self.fetcher);
        let settings = Arc::clone(&self.settings);
        let location = location.to_string();
        tokio::spawn(async move {
            let raw = resolve_location(&*fetcher, &settings, &location, &mut reporter).await;
            analyse_and_finish(raw, settings, reporter).await;
        });
        true
    }

    /// Start a manual attempt from an already-read upload. Overrides any
    /// earlier or in-flight attempt. Returns the attempt's generation.
    pub fn manual_upload(&self, upload: ManualUpload) -> u64 {
        let mut reporter = self.begin(Trigger::Manual {
            file_name: upload.file_name.clone(),
        });
        let generation = reporter.generation;
        let settings = Arc::clone(&self.settings);
        tokio::spawn(async move {
            let raw = upload.into_raw_source(&mut reporter);
            analyse_and_finish(raw, settings, reporter).await;
        });
        generation
    }

    /// Start a manual attempt that first reads `path` from disk.
    pub fn upload_file(&self, path: impl Into<PathBuf>) -> u64 {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut reporter = self.begin(Trigger::Manual { file_name });
        let generation = reporter.generation;
        let settings = Arc::clone(&self.settings);
        tokio::spawn(async move {
            let raw = ManualUpload::read(&path).await.into_raw_source(&mut reporter);
            analyse_and_finish(raw, settings, reporter).await;
        });
        generation
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until the most recently started attempt reaches Ready or Failed.
    pub async fn wait_settled(&self) -> Snapshot {
        let target = self.generation.load(Ordering::SeqCst);
        if target == 0 {
            return self.snapshot();
        }
        let mut rx = self.snapshots.clone();
        let settled = match rx
            .wait_for(|s| s.generation >= target && s.state.is_settled())
            .await
        {
            Ok(snap) => Snapshot::clone(&snap),
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Watch receiver for renderers that redraw on every change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

impl<F> Drop for AcquisitionHandle<F> {
    fn drop(&mut self) {
        // in-flight attempts keep their own senders; nothing reads them now
        self.reducer.abort();
    }
}
