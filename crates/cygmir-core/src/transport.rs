//! URL retrieval seam.
//!
//! The engine needs exactly two primitives: "fetch this URL into memory"
//! (for catalogues and mirror lists) and "download this URL to a local
//! path" (for package archives and the installer). Both are behind the
//! [`Transport`] trait so tests can serve fixture files without a network.
//!
//! [`HttpTransport`] is the production implementation: HTTP(S) via reqwest
//! with streamed bodies, plus `file:` URLs read straight from disk so the
//! same code path works offline.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Errors raised by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP-level failure (connect, status, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The URL scheme is not supported by this transport.
    #[error("unsupported URL scheme '{0}'")]
    Scheme(String),
}

/// Retrieval-by-URL primitive consumed by the mirror engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the resource at `url` into memory.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError>;

    /// Download the resource at `url` to `dest`, returning the byte count.
    ///
    /// A partially written file may remain on failure; callers are expected
    /// to delete it (the builder's retry loop does).
    async fn download(&self, url: &Url, dest: &Path) -> Result<u64, TransportError>;
}

/// Production transport: HTTP(S) through reqwest, `file:` from disk.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn file_path(url: &Url) -> Result<std::path::PathBuf, TransportError> {
        url.to_file_path()
            .map_err(|()| TransportError::Scheme(url.scheme().to_string()))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        match url.scheme() {
            "http" | "https" => {
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            "file" => Ok(tokio::fs::read(Self::file_path(url)?).await?),
            other => Err(TransportError::Scheme(other.to_string())),
        }
    }

    async fn download(&self, url: &Url, dest: &Path) -> Result<u64, TransportError> {
        match url.scheme() {
            "http" | "https" => {
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
                    .send()
                    .await?
                    .error_for_status()?;

                let mut file = tokio::fs::File::create(dest).await?;
                let mut stream = response.bytes_stream();
                let mut written: u64 = 0;

                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                file.flush().await?;
                Ok(written)
            }
            "file" => Ok(tokio::fs::copy(Self::file_path(url)?, dest).await?),
            other => Err(TransportError::Scheme(other.to_string())),
        }
    }
}
