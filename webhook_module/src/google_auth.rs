//! Google OAuth 2.0 access tokens for the Firestore REST API.
//!
//! Supports the service-account JWT bearer flow and a pre-generated access
//! token (sandbox environments, emulator).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error};

/// OAuth scope for Cloud Firestore.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for service-account assertions.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens closer than this to expiry are refreshed.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Configuration for Google OAuth.
#[derive(Debug, Clone)]
pub struct GoogleAuthConfig {
    /// Service account email (`client_email`)
    pub client_email: Option<String>,
    /// Service account PEM private key
    pub private_key: Option<String>,
    /// OAuth token endpoint
    pub token_uri: String,
    pub scopes: Vec<String>,
    /// Pre-generated access token, used as-is
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl GoogleAuthConfig {
    pub fn service_account(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: Some(client_email.into()),
            private_key: Some(private_key.into()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            scopes: vec![FIRESTORE_SCOPE.to_string()],
            access_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn static_token(access_token: impl Into<String>) -> Self {
        Self {
            client_email: None,
            private_key: None,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            scopes: vec![FIRESTORE_SCOPE.to_string()],
            access_token: Some(access_token.into()),
            timeout: Duration::from_secs(10),
        }
    }

    /// Check if the configuration has usable credentials.
    pub fn is_valid(&self) -> bool {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false)
        };
        present(&self.access_token) || (present(&self.client_email) && present(&self.private_key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GoogleAuthError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),
    #[error("token request failed: {0}")]
    TokenRequestFailed(String),
    #[error("service account auth failed: {0}")]
    ServiceAccountAuthFailed(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Google OAuth token source with a cached access token.
#[derive(Debug, Clone)]
pub struct GoogleAuth {
    config: Arc<GoogleAuthConfig>,
    client: Client,
    cached: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// `None` for pre-generated tokens, which never expire locally
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > Instant::now() + EXPIRY_BUFFER,
            None => true,
        }
    }
}

impl GoogleAuth {
    pub fn new(config: GoogleAuthConfig) -> Result<Self, GoogleAuthError> {
        if !config.is_valid() {
            return Err(GoogleAuthError::MissingCredentials(
                "either an access token or a service account email + private key must be set"
                    .to_string(),
            ));
        }

        let cached = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| CachedToken {
                access_token: token.to_string(),
                expires_at: None,
            });

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config: Arc::new(config),
            client,
            cached: Arc::new(RwLock::new(cached)),
        })
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn access_token(&self) -> Result<String, GoogleAuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let token = self.refresh_via_service_account().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn refresh_via_service_account(&self) -> Result<CachedToken, GoogleAuthError> {
        let (Some(client_email), Some(private_key)) = (
            self.config.client_email.as_deref(),
            self.config.private_key.as_deref(),
        ) else {
            return Err(GoogleAuthError::MissingCredentials(
                "no service account configured".to_string(),
            ));
        };

        debug!("requesting Google access token for {}", client_email);

        let assertion = build_assertion(
            client_email,
            private_key,
            &self.config.token_uri,
            &self.config.scopes,
        )?;

        let response = self
            .client
            .post(&self.config.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Google token request failed: {} - {}", status, body);
            return Err(GoogleAuthError::TokenRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|err| GoogleAuthError::TokenRequestFailed(err.to_string()))?;

        let expires_in = u64::try_from(token_response.expires_in).unwrap_or(0);
        debug!("Google access token refreshed, expires_in={}s", expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: Some(Instant::now() + Duration::from_secs(expires_in)),
        })
    }
}

#[derive(Debug, Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Sign the RS256 JWT assertion exchanged for an access token.
fn build_assertion(
    client_email: &str,
    private_key: &str,
    token_uri: &str,
    scopes: &[String],
) -> Result<String, GoogleAuthError> {
    let now = Utc::now().timestamp();
    let claims = ServiceAccountClaims {
        iss: client_email,
        scope: scopes.join(" "),
        aud: token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|err| GoogleAuthError::ServiceAccountAuthFailed(err.to_string()))?;
    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|err| GoogleAuthError::ServiceAccountAuthFailed(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: Option<String>,
}
