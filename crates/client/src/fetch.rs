//! Profile retrieval from the admin API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use adminpanel_auth::Profile;

/// Why a profile fetch failed. Cloneable so a single outcome can be handed to
/// every caller waiting on the same request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("no session token")]
    Unauthenticated,
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("profile request was abandoned before completing")]
    Abandoned,
}

/// Response body of `GET /admin/profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEnvelope {
    pub data: Profile,
}

/// Source of the signed-in administrator's profile.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, FetchError>;
}

#[async_trait]
impl<F: ProfileFetcher + ?Sized> ProfileFetcher for Arc<F> {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, FetchError> {
        (**self).fetch_profile(token).await
    }
}

/// `reqwest`-backed fetcher for `GET {api_url}/admin/profile`.
#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
#[derive(Debug, Clone)]
pub struct HttpProfileFetcher {
    api_url: String,
    client: reqwest::Client,
}

#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
impl HttpProfileFetcher {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn profile_url(&self) -> String {
        format!("{}/admin/profile", self.api_url)
    }
}

#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, FetchError> {
        let resp = self
            .client
            .get(self.profile_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let envelope: ProfileEnvelope = resp
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(envelope.data)
    }
}
