use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::fetch::AssetRoot;
use crate::parse::ParseOptions;
use crate::resolve::{default_candidates, Candidate};

/// Runtime configuration, read from an optional YAML file.
///
/// ```yaml
/// asset_root: https://example.org/static/
/// delimiter: ";"
/// preview_rows: 5
/// chart_rows: 10
/// candidates:
///   - { file_name: data.csv, kind: delimited }
///   - { file_name: excel_as_csv.csv, kind: spreadsheet_converted }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Web root (`http(s)://...`) or local directory holding `analyses/`.
    pub asset_root: String,
    pub candidates: Vec<Candidate>,
    pub delimiter: char,
    pub preview_rows: usize,
    pub chart_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: "static".into(),
            candidates: default_candidates(),
            delimiter: ',',
            preview_rows: 5,
            chart_rows: 10,
        }
    }
}

/// The part of [`Config`] an acquisition attempt needs.
#[derive(Debug, Clone)]
pub struct AcquireSettings {
    pub candidates: Vec<Candidate>,
    pub parse: ParseOptions,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            parse: ParseOptions::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing YAML config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            bail!("config: at least one candidate is required");
        }
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\n' | '\r') {
            bail!("config: delimiter {:?} must be a single ASCII character other than a quote or newline", self.delimiter);
        }
        Ok(())
    }

    pub fn asset_root(&self) -> Result<AssetRoot> {
        AssetRoot::parse(&self.asset_root)
    }

    pub fn acquire_settings(&self) -> AcquireSettings {
        AcquireSettings {
            candidates: self.candidates.clone(),
            parse: ParseOptions {
                delimiter: self.delimiter as u8,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::SourceKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.candidates, default_candidates());
        assert_eq!(c.acquire_settings().parse.delimiter, b',');
        assert_eq!(c.preview_rows, 5);
        assert_eq!(c.chart_rows, 10);
    }

    #[test]
    fn test_load_partial_yaml() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "asset_root: https://example.org/static/")?;
        writeln!(f, "delimiter: \";\"")?;
        writeln!(f, "candidates:")?;
        writeln!(f, "  - {{ file_name: export.csv, kind: spreadsheet_converted }}")?;

        let c = Config::load(f.path())?;
        assert!(matches!(c.asset_root()?, AssetRoot::Url(_)));
        assert_eq!(c.acquire_settings().parse.delimiter, b';');
        assert_eq!(c.candidates.len(), 1);
        assert_eq!(c.candidates[0].kind, SourceKind::SpreadsheetConverted);
        assert_eq!(c.preview_rows, 5);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_delimiter() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "delimiter: \"é\"")?;
        assert!(Config::load(f.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_keys() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "asset_rot: typo")?;
        assert!(Config::load(f.path()).is_err());
        Ok(())
    }
}
