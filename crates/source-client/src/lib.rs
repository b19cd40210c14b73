//! Remote file servers that publish observation bundles.
//!
//! [`RemoteClient::for_base_url`] picks the transport from the URL scheme:
//! `ftp://` goes through [`FtpSource`], `http://` and `https://` through
//! [`HttpSource`]. Both implement [`freshness_cache::RemoteSource`].

pub mod error;
pub mod ftp;
pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use freshness_cache::{RemoteError, RemoteSource};
use reqwest::Url;

pub use error::ClientError;
pub use ftp::FtpSource;
pub use http::HttpSource;

/// Connection timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A remote selected by URL scheme.
#[derive(Debug, Clone)]
pub enum RemoteClient {
    Ftp(FtpSource),
    Http(HttpSource),
}

impl RemoteClient {
    /// Build the client that serves URLs under `base_url`.
    pub fn for_base_url(base_url: &str, connect_timeout: Duration) -> Result<Self, ClientError> {
        let url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "ftp" => Ok(RemoteClient::Ftp(FtpSource::new(connect_timeout))),
            "http" | "https" => Ok(RemoteClient::Http(HttpSource::new(connect_timeout)?)),
            other => Err(ClientError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            RemoteClient::Ftp(_) => "ftp",
            RemoteClient::Http(_) => "http",
        }
    }
}

#[async_trait]
impl RemoteSource for RemoteClient {
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        match self {
            RemoteClient::Ftp(ftp) => ftp.modified_at(url).await,
            RemoteClient::Http(http) => http.modified_at(url).await,
        }
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        match self {
            RemoteClient::Ftp(ftp) => ftp.fetch(url).await,
            RemoteClient::Http(http) => http.fetch(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_selection() {
        let ftp = RemoteClient::for_base_url("ftp://ftp.bom.gov.au/anon/gen/fwo/", DEFAULT_CONNECT_TIMEOUT)
            .unwrap();
        assert_eq!(ftp.scheme(), "ftp");

        let http = RemoteClient::for_base_url("https://example.com/fwo/", DEFAULT_CONNECT_TIMEOUT)
            .unwrap();
        assert_eq!(http.scheme(), "http");
    }

    #[test]
    fn test_rejects_other_schemes() {
        let err = RemoteClient::for_base_url("file:///tmp/fwo/", DEFAULT_CONNECT_TIMEOUT).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedScheme(ref s) if s == "file"));

        let err = RemoteClient::for_base_url("not a url", DEFAULT_CONNECT_TIMEOUT).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }
}
