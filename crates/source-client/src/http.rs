//! HTTP(S) remote using `HEAD` for modification times.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use freshness_cache::{RemoteError, RemoteSource};
use reqwest::header::LAST_MODIFIED;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(connect_timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    /// `Last-Modified` of the resource.
    #[instrument(skip(self))]
    pub async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        let response = self.client.head(url).send().await.map_err(map_reqwest)?;
        let response = check_status(url, response)?;

        let header = response
            .headers()
            .get(LAST_MODIFIED)
            .ok_or_else(|| RemoteError::Protocol(format!("no Last-Modified header for {}", url)))?;
        let value = header
            .to_str()
            .map_err(|_| RemoteError::Protocol("Last-Modified is not ASCII".to_string()))?;

        DateTime::parse_from_rfc2822(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RemoteError::Protocol(format!("bad Last-Modified {:?}: {}", value, e)))
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        let response = check_status(url, response)?;
        let bytes = response.bytes().await.map_err(map_reqwest)?;
        debug!(bytes = bytes.len(), "HTTP download complete");
        Ok(bytes)
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        HttpSource::modified_at(self, url).await
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        HttpSource::fetch(self, url).await
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(RemoteError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}

fn map_reqwest(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_connect() {
        RemoteError::Connect(e.to_string())
    } else {
        RemoteError::Protocol(e.to_string())
    }
}
