use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::error::{AcquisitionError, Result};
use crate::resolve::{DiagnosticSink, RawSource, SourceKind};

/// Extensions the file picker offers.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "xls", "xlsx"];

/// Extensions whose real format is binary. They are still decoded as text.
const BINARY_SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx"];

/// A file handed over by the file-selection collaborator: its name plus
/// either the bytes or the collaborator's read error.
#[derive(Debug, Clone)]
pub struct ManualUpload {
    pub file_name: String,
    pub contents: std::result::Result<Vec<u8>, String>,
}

impl ManualUpload {
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: Ok(bytes.into()),
        }
    }

    /// Read `path` from disk. Read failures and rejected extensions are kept
    /// in `contents` so they surface as a failed attempt, not a panic.
    pub async fn read(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let contents = match extension_of(&file_name) {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => fs::read(path)
                .await
                .map_err(|e| format!("{}: {}", path.display(), e)),
            _ => Err(format!(
                "unsupported file type; expected one of .{}",
                ACCEPTED_EXTENSIONS.join(", .")
            )),
        };

        Self {
            file_name,
            contents,
        }
    }

    /// Decode the upload as text, whatever its extension.
    pub fn into_raw_source<D: DiagnosticSink>(self, diagnostics: &mut D) -> Result<RawSource> {
        let bytes = self.contents.map_err(|message| AcquisitionError::ManualRead {
            file_name: self.file_name.clone(),
            message,
        })?;

        if let Some(ext) = extension_of(&self.file_name) {
            if BINARY_SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
                warn!(file = %self.file_name, "binary spreadsheet decoded as text");
                diagnostics.note(format!(
                    "warning: {} is a .{} spreadsheet and is read as plain text; convert it to CSV if the table looks wrong",
                    self.file_name, ext
                ));
            }
        }

        diagnostics.note(format!(
            "read {} bytes from {}",
            bytes.len(),
            self.file_name
        ));
        Ok(RawSource::from_bytes(
            SourceKind::ManualUpload,
            self.file_name,
            &bytes,
        ))
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_csv_from_disk() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("Sales.CSV");
        std::fs::write(&path, "a,b\n1,2\n")?;

        let upload = ManualUpload::read(&path).await;
        assert_eq!(upload.file_name, "Sales.CSV");

        let mut notes: Vec<String> = Vec::new();
        let raw = upload.into_raw_source(&mut notes)?;
        assert_eq!(raw.kind, SourceKind::ManualUpload);
        assert_eq!(raw.text, "a,b\n1,2\n");
        assert_eq!(notes.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_manual_read_error() -> Result<()> {
        let tmp = tempdir()?;
        let upload = ManualUpload::read(tmp.path().join("nope.csv")).await;
        let err = upload.into_raw_source(&mut Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, AcquisitionError::ManualRead { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_extension() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "a\n1\n")?;
        let err = ManualUpload::read(&path)
            .await
            .into_raw_source(&mut Vec::<String>::new())
            .unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
        Ok(())
    }

    #[test]
    fn test_spreadsheet_extension_warns() -> Result<()> {
        let mut notes: Vec<String> = Vec::new();
        let raw = ManualUpload::from_bytes("book.xlsx", "a\n1\n").into_raw_source(&mut notes)?;
        assert_eq!(raw.text, "a\n1\n");
        assert!(notes[0].starts_with("warning"));
        Ok(())
    }
}
