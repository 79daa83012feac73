//! auth::oauth
//!
//! OAuth authorization-code client.
//!
//! # Flow
//!
//! 1. Generate a `state` with [`OAuthClient::new_state`] and remember it
//! 2. Send the user to [`OAuthClient::authorization_url`]
//! 3. On callback, check the returned state with [`OAuthClient::verify_state`]
//! 4. Trade the `code` for an access token with [`OAuthClient::exchange_code`]
//!
//! Client id and secret are passed in through [`OAuthConfig`] at
//! construction; nothing is read from global state.
//!
//! # Example
//!
//! ```ignore
//! use sorpush::auth::{OAuthClient, OAuthConfig};
//!
//! let mut config = OAuthConfig::new("Iv1.0123456789abcdef");
//! config.client_secret = Some(secret);
//! let client = OAuthClient::new(config)?;
//!
//! let state = OAuthClient::new_state();
//! println!("Visit {}", client.authorization_url(&state)?);
//!
//! // ...later, in the callback
//! OAuthClient::verify_state(Some(&state), &returned_state)?;
//! let credential = client.exchange_code(&code).await?;
//! ```

use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::AuthError;
use super::Credential;
use crate::core::config::{DEFAULT_CLIENT_ID, DEFAULT_TIMEOUT_SECS};
use crate::forge::correlation_headers;

/// Default authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// Default scopes requested.
pub const DEFAULT_SCOPE: &str = "repo";

const USER_AGENT_VALUE: &str = "sorpush";

/// OAuth application configuration.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
    /// Value for the `X-Client-Id` correlation header
    pub correlation_client_id: String,
    /// Bound on the token request; expiry is `AuthError::Network`
    pub timeout: Duration,
}

impl OAuthConfig {
    /// Configuration with default endpoints and scope.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            correlation_client_id: DEFAULT_CLIENT_ID.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Custom Debug to avoid exposing client_secret
impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Token endpoint response. GitHub answers 200 for both outcomes.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Client for the authorization-code flow.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: Client,
    config: OAuthConfig,
}

impl OAuthClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` if the client id is empty.
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        if config.client_id.trim().is_empty() {
            return Err(AuthError::NotConfigured("client_id is empty".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// A fresh, unguessable `state` value.
    pub fn new_state() -> String {
        Uuid::new_v4().to_string()
    }

    /// URL the user visits to authorize the application.
    pub fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
            ("state", state),
        ];
        if let Some(redirect) = self.config.redirect_uri.as_deref() {
            params.push(("redirect_uri", redirect));
        }

        let url = Url::parse_with_params(&self.config.authorize_url, &params).map_err(|e| {
            AuthError::NotConfigured(format!("invalid authorize_url: {}", e))
        })?;
        Ok(url.to_string())
    }

    /// Check the callback `state` against the one issued.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidState` if nothing was issued or the values differ.
    pub fn verify_state(expected: Option<&str>, received: &str) -> Result<(), AuthError> {
        match expected {
            Some(expected) if !expected.is_empty() && expected == received => Ok(()),
            _ => Err(AuthError::InvalidState),
        }
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` if no client secret is configured
    /// - `OAuth` if the endpoint returns an error payload
    /// - `ExchangeFailed` on a non-2xx status or a payload without a token
    /// - `Network` on transport failure
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        let secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or_else(|| AuthError::NotConfigured("client_secret is not set".into()))?;

        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", secret),
            ("code", code),
        ];
        if let Some(redirect) = self.config.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect));
        }

        let mut headers = correlation_headers(&self.config.correlation_client_id)
            .map_err(|e| AuthError::NotConfigured(format!("invalid client id header: {}", e)))?;
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        debug!(token_url = %self.config.token_url, "exchanging authorization code");
        let response = self
            .client
            .post(&self.config.token_url)
            .headers(headers)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ExchangeFailed(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("unreadable response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(AuthError::OAuth {
                error,
                description: body.error_description,
            });
        }

        let token = body
            .access_token
            .ok_or_else(|| AuthError::ExchangeFailed("response has no access_token".into()))?;
        info!("authorization code exchanged");
        Credential::new(token)
    }
}
