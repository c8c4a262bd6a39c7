//! HTTP plumbing shared by the embedding and completion clients.
//!
//! Both services speak the OpenAI-compatible REST dialect: JSON bodies,
//! bearer-token auth and a base URL ending in the API version segment.
//! Requests are attempted once; mapping a failure onto
//! [`SearchError::ProviderUnavailable`] or [`SearchError::ProviderQuotaExceeded`]
//! is the only error handling done here.


use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::{Result, SearchError};

const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// One configured service: agent, base URL, model and credentials
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    name: String,
    base_url: Url,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl ProviderEndpoint {
    #[inline]
    pub fn new(name: &str, config: &ProviderConfig, api_key: Option<String>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SearchError::Config(format!("{name} provider: {e}")))?;

        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            name: name.to_string(),
            base_url,
            model: config.model.clone(),
            api_key,
            agent: build_agent(config.timeout()),
        })
    }

    /// Build from configuration, reading the API key from the environment
    #[inline]
    pub fn from_config(name: &str, config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .map_err(|e| SearchError::Config(format!("{name} provider: {e}")))?;
        Self::new(name, config, api_key)
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path such as `embeddings` against the base URL
    #[inline]
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SearchError::Config(format!("Invalid {} endpoint {path}: {e}", self.name)))
    }

    /// POST a JSON body and hand back the raw response for the caller to read
    #[inline]
    pub fn post_json(&self, path: &str, body: &str) -> Result<ureq::http::Response<ureq::Body>> {
        let url = self.endpoint(path)?;
        debug!("POST {} ({} bytes)", url, body.len());

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }

        request.send(body).map_err(|e| self.classify(e))
    }

    /// Map a transport or status failure onto the provider error taxonomy
    #[inline]
    pub fn classify(&self, error: ureq::Error) -> SearchError {
        classify_error(&self.name, error)
    }

    #[inline]
    pub fn unavailable(&self, message: impl Into<String>) -> SearchError {
        SearchError::ProviderUnavailable {
            provider: self.name.clone(),
            message: message.into(),
        }
    }
}

/// The global timeout spans the whole call including the response body,
/// which for streamed completions is the full answer.
fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// 429 is the only status treated as a quota signal; everything else,
/// including auth failures, means the provider could not be used.
#[inline]
pub fn classify_error(provider: &str, error: ureq::Error) -> SearchError {
    match error {
        ureq::Error::StatusCode(STATUS_TOO_MANY_REQUESTS) => {
            warn!("{} rate limit or quota exceeded", provider);
            SearchError::ProviderQuotaExceeded {
                provider: provider.to_string(),
                message: format!("HTTP {STATUS_TOO_MANY_REQUESTS}"),
            }
        }
        ureq::Error::StatusCode(status) => {
            warn!("{} returned HTTP {}", provider, status);
            SearchError::ProviderUnavailable {
                provider: provider.to_string(),
                message: format!("HTTP {status}"),
            }
        }
        other => {
            warn!("{} request failed: {}", provider, other);
            SearchError::ProviderUnavailable {
                provider: provider.to_string(),
                message: other.to_string(),
            }
        }
    }
}
