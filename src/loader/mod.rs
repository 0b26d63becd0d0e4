use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config;
use crate::model::{Dataset, DatasetError};

#[derive(Clone, Debug)]
pub struct LoaderOptions {
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            proxy: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },
}

/// Why a load cycle produced no dataset. Any of these collapses the whole view.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("invalid source locator: {locator}")]
    InvalidLocator { locator: String },

    #[error("request to {locator} failed: {source}")]
    Request {
        locator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{locator} responded with HTTP {status}")]
    Status { locator: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed payload from {locator}: {source}")]
    Malformed {
        locator: String,
        #[source]
        source: DatasetError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    Remote(reqwest::Url),
    Local(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Loader {
    client: reqwest::Client,
    base_url: Option<reqwest::Url>,
}

impl Loader {
    pub fn new(options: &LoaderOptions) -> Result<Self, LoaderError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "mycelial-board/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds.max(1)));
        // only the configured proxy is used; environment proxies are ignored
        match options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(proxy) => {
                let proxy_cfg = reqwest::Proxy::all(proxy).map_err(|e| LoaderError::ProxySetup {
                    proxy: proxy.to_string(),
                    source: e,
                })?;
                builder = builder.proxy(proxy_cfg);
            }
            None => builder = builder.no_proxy(),
        }
        let client = builder
            .build()
            .map_err(|e| LoaderError::HttpClientBuild { source: e })?;

        let base_url = match options.base_url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(reqwest::Url::parse(raw).map_err(|_| {
                LoaderError::InvalidBaseUrl {
                    url: raw.to_string(),
                }
            })?),
            _ => None,
        };

        Ok(Self { client, base_url })
    }

    pub fn resolve(&self, locator: &str) -> Result<Locator, LoadFailure> {
        let trimmed = locator.trim();
        let invalid = || LoadFailure::InvalidLocator {
            locator: locator.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let lower = trimmed.to_ascii_lowercase();
        let url = if lower.starts_with("http://")
            || lower.starts_with("https://")
            || lower.starts_with("file://")
        {
            Some(reqwest::Url::parse(trimmed).map_err(|_| invalid())?)
        } else if let Some(base) = self.base_url.as_ref() {
            Some(base.join(trimmed).map_err(|_| invalid())?)
        } else {
            None
        };

        match url {
            Some(url) if url.scheme() == "file" => {
                url.to_file_path().map(Locator::Local).map_err(|_| invalid())
            }
            Some(url) => Ok(Locator::Remote(url)),
            None => Ok(Locator::Local(config::expand_tilde(trimmed))),
        }
    }

    pub async fn load(&self, locator: &str) -> Result<Dataset, LoadFailure> {
        let bytes = match self.resolve(locator)? {
            Locator::Remote(url) => self.fetch(locator, url).await?,
            Locator::Local(path) => {
                info!(path = %path.display(), "reading dataset");
                tokio::fs::read(&path).await.map_err(|e| LoadFailure::Read {
                    path: path.display().to_string(),
                    source: e,
                })?
            }
        };

        let dataset =
            Dataset::from_json_slice(&bytes).map_err(|e| LoadFailure::Malformed {
                locator: locator.to_string(),
                source: e,
            })?;
        info!(
            fingerprint = %dataset.bank_fingerprint,
            items = dataset.items.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    async fn fetch(&self, locator: &str, url: reqwest::Url) -> Result<Vec<u8>, LoadFailure> {
        info!(url = %url, "fetching dataset");
        let request_failed = |e: reqwest::Error| LoadFailure::Request {
            locator: locator.to_string(),
            source: e,
        };
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(request_failed)?;
        let status = resp.status();
        debug!(status = status.as_u16(), "dataset response");
        if !status.is_success() {
            return Err(LoadFailure::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(request_failed)?;
        Ok(body.to_vec())
    }
}
