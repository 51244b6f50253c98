use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{AssetPath, SourceFetcher};

/// Fetches assets below a web root.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Append `path` to the base, percent-encoding every segment.
    pub fn url_for(&self, path: &AssetPath) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("asset root {} cannot be a base", self.base))?
            .pop_if_empty()
            .extend(path.segments());
        Ok(url)
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, path: &AssetPath) -> Result<Vec<u8>> {
        let url = self.url_for(path)?;
        debug!(%url, "GET");
        let bytes = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("non-success status from {}", url))?
            .bytes()
            .await
            .with_context(|| format!("reading body from {}", url))?;
        Ok(bytes.to_vec())
    }

    fn describe(&self, path: &AssetPath) -> String {
        self.url_for(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{default_candidates, AnalysisId};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Minimal HTTP/1.1 server: 200 with `body` for `hit`, 404 for anything else.
    async fn serve_one_path(hit: &'static str, body: &'static str) -> Result<Url> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&buf);
                let path = request.split_whitespace().nth(1).unwrap_or("");
                let (status, body) = if path == hit {
                    ("200 OK", body)
                } else {
                    ("404 Not Found", "missing")
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        Ok(Url::parse(&format!("http://{}/static/", addr))?)
    }

    #[tokio::test]
    async fn test_fetch_success_and_404() -> Result<()> {
        let base = serve_one_path("/static/analyses/a1/data.csv", "a,b\n1,2\n").await?;
        let f = HttpFetcher::new(Client::new(), base);

        let bytes = f.fetch(&AssetPath::new(["analyses", "a1", "data.csv"])).await?;
        assert_eq!(bytes, b"a,b\n1,2\n");

        let err = f
            .fetch(&AssetPath::new(["analyses", "a1", "excel_as_csv.csv"]))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("404"));
        Ok(())
    }

    #[test]
    fn test_url_for_joins_segments() -> Result<()> {
        let f = HttpFetcher::new(Client::new(), Url::parse("https://example.org/static/")?);
        let url = f.url_for(&AssetPath::new(["analyses", "a1", "data.csv"]))?;
        assert_eq!(url.as_str(), "https://example.org/static/analyses/a1/data.csv");
        Ok(())
    }

    #[test]
    fn test_url_for_without_trailing_slash() -> Result<()> {
        let f = HttpFetcher::new(Client::new(), Url::parse("https://example.org/static")?);
        let url = f.url_for(&AssetPath::new(["analyses", "a1", "data.csv"]))?;
        assert_eq!(url.as_str(), "https://example.org/static/analyses/a1/data.csv");
        Ok(())
    }

    #[test]
    fn test_url_for_encodes_segments() -> Result<()> {
        let f = HttpFetcher::new(Client::new(), Url::parse("https://example.org/")?);
        let url = f.url_for(&AssetPath::new(["analyses", "a b?c", "data.csv"]))?;
        assert_eq!(url.as_str(), "https://example.org/analyses/a%20b%3Fc/data.csv");
        Ok(())
    }

    #[test]
    fn test_url_for_encoded_location_is_not_double_encoded() -> Result<()> {
        let f = HttpFetcher::new(Client::new(), Url::parse("https://host/static/")?);
        let id = AnalysisId::from_location("https://host/interactive/a%20b")?;
        let path = default_candidates()[0].path_for(&id);
        let url = f.url_for(&path)?;
        assert_eq!(url.as_str(), "https://host/static/analyses/a%20b/data.csv");
        Ok(())
    }
}
