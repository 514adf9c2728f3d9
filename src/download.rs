/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::download
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Fetch release archives over HTTPS into a local directory.

  Security / Safety Notes:
    Plain unauthenticated GET requests. No retries; any non-2xx
    response aborts the install. Payloads are not verified.

  Dependencies:
    reqwest for HTTP, tokio for async file writes.

  Operational Scope:
    Invoked by the installer on a cache miss only.

  Revision History:
    2025-11-02 COD  Implemented release archive fetcher.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Streaming writes; archives are never held in memory whole
    - Explicit status handling with actionable messages
============================================================*/

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::config::DownloadConfig;
use crate::error::{Result, SetupError};

/// Source of release archives.
pub trait ArchiveFetcher {
    /// Download `url` into `dest_dir`, returning the written file.
    fn download(&self, url: &str, dest_dir: &Path) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// Fetcher backed by a reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if config.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout));
        }
        let client = builder
            .build()
            .map_err(|err| SetupError::Download(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl ArchiveFetcher for HttpFetcher {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| SetupError::Download(format!("Request to {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SetupError::Download(format!(
                "GET {url} returned status {status}"
            )));
        }

        let target = dest_dir.join(file_name_from_url(url));
        let mut file = tokio::fs::File::create(&target).await.map_err(|err| {
            SetupError::Download(format!("Failed to create {}: {err}", target.display()))
        })?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| SetupError::Download(format!("Reading body of {url} failed: {err}")))?
        {
            file.write_all(&chunk).await.map_err(|err| {
                SetupError::Download(format!("Failed to write {}: {err}", target.display()))
            })?;
        }
        file.flush().await?;

        Ok(target)
    }
}

/// Last path segment of `url`, without query or fragment.
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
        .to_string()
}
