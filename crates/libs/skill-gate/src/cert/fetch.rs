use crate::error::{SkillError, SkillResult};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Retrieves the raw PEM chain a request points at.
///
/// Callers hand over a URL that already passed the chain-URL shape check.
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> SkillResult<Vec<u8>>;
}

/// Fetches chains over HTTPS on every call. No retry, no cache.
#[derive(Clone, Debug)]
pub struct HttpCertificateFetcher {
    http_client: reqwest::Client,
}

impl HttpCertificateFetcher {
    pub fn new(timeout: Duration) -> SkillResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(SkillError::HttpClient)?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl CertificateFetcher for HttpCertificateFetcher {
    async fn fetch(&self, url: &Url) -> SkillResult<Vec<u8>> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| download_failed(url, err.to_string()))?;

        // Redirects are not followed, so a 3xx lands here too.
        let status = response.status();
        if !status.is_success() {
            return Err(download_failed(url, format!("unexpected status {}", status)));
        }

        let body = response.bytes().await.map_err(|err| SkillError::CertRead {
            reason: err.to_string(),
        })?;
        if body.is_empty() {
            return Err(SkillError::CertRead { reason: "empty body".to_string() });
        }
        log::debug!("cert: fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

fn download_failed(url: &Url, reason: String) -> SkillError {
    log::warn!("cert: download failed url={} err={}", url, reason);
    SkillError::CertDownload { reason }
}
