//! Outbound collaborators reachable from a [`HookContext`](crate::HookContext).
//!
//! Handlers never talk to the network directly. Link shortening and the rare
//! auxiliary lookup go through these traits so tests and offline deployments
//! can swap in [`Passthrough`] and [`NoFetch`].
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::DispatchConfig;
use crate::error::CollaboratorError;

/// Turns a long link into a short one.
#[async_trait]
pub trait UrlShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String, CollaboratorError>;
}

/// Fetches auxiliary documents a handler needs to complete a message.
#[async_trait]
pub trait AuxFetcher: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, CollaboratorError>;
    async fn get_text(&self, url: &str) -> Result<String, CollaboratorError>;
}

/// Collaborators shared by every dispatch.
#[derive(Clone)]
pub struct Services {
    pub shortener: Arc<dyn UrlShortener>,
    pub fetcher: Arc<dyn AuxFetcher>,
}

impl Services {
    /// No network access: links are kept as-is and fetches fail.
    pub fn offline() -> Self {
        Self {
            shortener: Arc::new(Passthrough),
            fetcher: Arc::new(NoFetch),
        }
    }

    /// Builds HTTP-backed collaborators from configuration.
    pub fn from_config(cfg: &DispatchConfig) -> Result<Self, CollaboratorError> {
        let shortener: Arc<dyn UrlShortener> = if cfg.shortener.enabled {
            Arc::new(HttpShortener::new(
                &cfg.shortener.endpoint,
                build_client(&cfg.user_agent, Duration::from_secs(cfg.shortener.timeout_secs))?,
            ))
        } else {
            Arc::new(Passthrough)
        };
        let fetcher = HttpFetcher::new(build_client(&cfg.user_agent, cfg.fetch_timeout())?);

        Ok(Self {
            shortener,
            fetcher: Arc::new(fetcher),
        })
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

fn build_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()?)
}

/// Leaves links untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl UrlShortener for Passthrough {
    async fn shorten(&self, url: &str) -> Result<String, CollaboratorError> {
        Ok(url.to_string())
    }
}

/// Shortener speaking the `GET {endpoint}?url=<encoded>` plain-text protocol.
#[derive(Debug, Clone)]
pub struct HttpShortener {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpShortener {
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl UrlShortener for HttpShortener {
    async fn shorten(&self, url: &str) -> Result<String, CollaboratorError> {
        let request_url = format!("{}?url={}", self.endpoint, urlencoding::encode(url));
        let response = self.client.get(&request_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let short = response.text().await?.trim().to_string();
        if short.is_empty() {
            return Err(CollaboratorError::InvalidResponse {
                url: self.endpoint.clone(),
                reason: "empty body".into(),
            });
        }
        debug!(long = %url, short = %short, "shortened url");
        Ok(short)
    }
}

/// Refuses every fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetch;

#[async_trait]
impl AuxFetcher for NoFetch {
    async fn get_json(&self, _url: &str) -> Result<Value, CollaboratorError> {
        Err(CollaboratorError::Disabled("auxiliary fetching"))
    }

    async fn get_text(&self, _url: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Disabled("auxiliary fetching"))
    }
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response, CollaboratorError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AuxFetcher for HttpFetcher {
    async fn get_json(&self, url: &str) -> Result<Value, CollaboratorError> {
        Ok(self.get_ok(url).await?.json::<Value>().await?)
    }

    async fn get_text(&self, url: &str) -> Result<String, CollaboratorError> {
        Ok(self.get_ok(url).await?.text().await?)
    }
}
