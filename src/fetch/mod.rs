//! Fetching raw bytes for a candidate data location.
//!
//! The resolver only ever sees the [`SourceFetcher`] trait; the HTTP and
//! local-directory implementations live in the submodules.

pub mod dir;
pub mod http;

use anyhow::{Context, Result};
use std::{fmt, future::Future, path::PathBuf};
use url::Url;

pub use dir::DirFetcher;
pub use http::HttpFetcher;

/// A location relative to the static asset root, kept as path segments so
/// each fetcher can encode it for its own transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPath(Vec<String>);

impl AssetPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Something that can turn an [`AssetPath`] into bytes.
///
/// Any error means "this candidate is absent"; callers decide whether that
/// is fatal.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, path: &AssetPath) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Human-readable form of `path` for logs.
    fn describe(&self, path: &AssetPath) -> String {
        path.to_string()
    }
}

/// Where the static assets live: a web root or a directory on disk.
#[derive(Debug, Clone)]
pub enum AssetRoot {
    Url(Url),
    Dir(PathBuf),
}

impl AssetRoot {
    /// `http://` and `https://` roots are fetched over HTTP, anything else is
    /// treated as a local directory.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).with_context(|| format!("parsing asset root {}", raw))?;
            Ok(AssetRoot::Url(url))
        } else {
            Ok(AssetRoot::Dir(PathBuf::from(raw)))
        }
    }
}

/// Fetcher picked at runtime from an [`AssetRoot`].
#[derive(Debug, Clone)]
pub enum AnyFetcher {
    Http(HttpFetcher),
    Dir(DirFetcher),
}

impl AnyFetcher {
    pub fn for_root(root: AssetRoot) -> Self {
        match root {
            AssetRoot::Url(base) => AnyFetcher::Http(HttpFetcher::new(reqwest::Client::new(), base)),
            AssetRoot::Dir(dir) => AnyFetcher::Dir(DirFetcher::new(dir)),
        }
    }
}

impl SourceFetcher for AnyFetcher {
    async fn fetch(&self, path: &AssetPath) -> Result<Vec<u8>> {
        match self {
            AnyFetcher::Http(f) => f.fetch(path).await,
            AnyFetcher::Dir(f) => f.fetch(path).await,
        }
    }

    fn describe(&self, path: &AssetPath) -> String {
        match self {
            AnyFetcher::Http(f) => f.describe(path),
            AnyFetcher::Dir(f) => f.describe(path),
        }
    }
}
