//! Identity provider client.
//!
//! The backend never authenticates users itself; it redirects the browser
//! to an external OAuth provider and exchanges the callback code for an
//! identity. Everything provider-specific sits behind [`SsoClient`].

pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct SsoConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
}

impl SsoConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let client_id = env::var("SSO_CLIENT_ID")
            .map_err(|_| AppError::Validation("SSO_CLIENT_ID is not set".to_string()))?;
        let client_secret = env::var("SSO_CLIENT_SECRET")
            .map_err(|_| AppError::Validation("SSO_CLIENT_SECRET is not set".to_string()))?;
        let authorize_url = env::var("SSO_AUTHORIZE_URL")
            .map_err(|_| AppError::Validation("SSO_AUTHORIZE_URL is not set".to_string()))?;
        let token_url = env::var("SSO_TOKEN_URL")
            .map_err(|_| AppError::Validation("SSO_TOKEN_URL is not set".to_string()))?;
        let endpoint = env::var("ENDPOINT")
            .map_err(|_| AppError::Validation("ENDPOINT is not set".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            authorize_url,
            token_url,
            redirect_uri: format!("{endpoint}/authenticate"),
        })
    }
}

/// Identity attributes returned by the provider after a code exchange.
#[derive(Debug, Clone)]
pub struct SsoIdentity {
    pub email: String,
}

#[async_trait]
pub trait SsoClient: Send + Sync {
    /// Provider URL the login endpoint redirects the browser to.
    fn authorization_url(&self) -> String;

    /// Exchange the callback code for the authenticated identity.
    async fn exchange_code(&self, code: &str) -> Result<SsoIdentity, AppError>;
}

pub struct HttpSsoClient {
    client: Client,
    config: SsoConfig,
}

impl HttpSsoClient {
    pub fn new(config: SsoConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SsoClient for HttpSsoClient {
    fn authorization_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}",
            self.config.authorize_url, self.config.client_id, self.config.redirect_uri
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<SsoIdentity, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Identity provider unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Identity provider error {status}: {body}"
            )));
        }

        let token = response
            .json::<dto::TokenResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse token response: {e}")))?;

        let profile = token
            .profile
            .ok_or_else(|| AppError::Upstream("Token response carried no profile".to_string()))?;

        Ok(SsoIdentity {
            email: profile.email,
        })
    }
}

/// Fixed-identity client for tests and local development.
pub struct StaticSsoClient {
    pub email: String,
}

#[async_trait]
impl SsoClient for StaticSsoClient {
    fn authorization_url(&self) -> String {
        "/authenticate?code=local".to_string()
    }

    async fn exchange_code(&self, _code: &str) -> Result<SsoIdentity, AppError> {
        Ok(SsoIdentity {
            email: self.email.clone(),
        })
    }
}
