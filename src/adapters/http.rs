use crate::config::toml_config::SourceConfig;
use crate::domain::ports::{FetchedBytes, PageFetcher};
use crate::utils::error::{EtlError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// reqwest-backed access to the bulletin board.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    page_timeout: Duration,
    image_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        let language = HeaderValue::from_str(&source.accept_language).map_err(|e| {
            EtlError::InvalidConfigValueError {
                field: "source.accept_language".to_string(),
                value: source.accept_language.clone(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = Client::builder()
            .user_agent(source.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            page_timeout: Duration::from_secs(source.timeout_seconds),
            image_timeout: Duration::from_secs(source.image_timeout_seconds),
        })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response> {
        tracing::debug!(url, "GET");
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.get(url, self.page_timeout).await?;
        let bytes = response.bytes().await?;
        // The board serves UTF-8 but does not always say so.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<FetchedBytes> {
        let response = self.get(url, self.image_timeout).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response.bytes().await?.to_vec();
        tracing::debug!(url, size = bytes.len(), "downloaded bytes");
        Ok(FetchedBytes {
            bytes,
            content_type,
        })
    }
}
