use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

use super::{AssetPath, SourceFetcher};

/// Reads assets from a static directory on disk.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, path: &AssetPath) -> PathBuf {
        path.segments().fold(self.root.clone(), |acc, seg| acc.join(seg))
    }
}

impl SourceFetcher for DirFetcher {
    async fn fetch(&self, path: &AssetPath) -> Result<Vec<u8>> {
        let full = self.path_for(path);
        fs::read(&full)
            .await
            .with_context(|| format!("reading {}", full.display()))
    }

    fn describe(&self, path: &AssetPath) -> String {
        self.path_for(path).display().to_string()
    }
}
