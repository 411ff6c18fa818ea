//! Token providers.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use breakwater_transport::TrustDecision;

use crate::error::OAuthError;
use crate::token::Token;

/// Default token endpoint; override it only in development or staging.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";

/// Fixed basic-auth client credential expected by the token service.
const BASIC_AUTH: &str = "Basic Yng6Yng=";
/// Grant type URN for the API-key exchange.
const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
const RESPONSE_TYPE: &str = "cloud_iam";

/// Retrieves bearer tokens for request authentication.
///
/// Implementations perform a single exchange per call; scheduling refreshes
/// ahead of expiry is the caller's concern.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Retrieve a fresh bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Service`] when the service answers non-200,
    /// [`OAuthError::Transport`] when it cannot be reached, and
    /// [`OAuthError::Parse`] when a 200 body is not a token record.
    async fn retrieve_token(&self) -> Result<Token, OAuthError>;
}

/// Default provider: exchanges an API key at an IAM-style token endpoint.
///
/// Each call builds its own short-lived client with the provider's
/// [`TrustDecision`] applied, independent of the pooled data-plane client —
/// token acquisition must keep working while the data-plane pool is being
/// reaped, swapped, or shut down.
///
/// # Examples
///
/// ```no_run
/// use breakwater_oauth::{DefaultTokenProvider, TokenProvider};
///
/// # async fn example() -> Result<(), breakwater_oauth::OAuthError> {
/// let provider = DefaultTokenProvider::new("my-api-key")?
///     .with_token_endpoint("https://iam.staging.example.com/identity/token");
/// let token = provider.retrieve_token().await?;
/// # Ok(())
/// # }
/// ```
pub struct DefaultTokenProvider {
    api_key: SecretString,
    endpoint: String,
    trust: TrustDecision,
}

impl DefaultTokenProvider {
    /// Create a provider for the given API key, targeting
    /// [`DEFAULT_TOKEN_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] for an empty API key.
    pub fn new(api_key: impl Into<SecretString>) -> Result<Self, OAuthError> {
        let api_key = api_key.into();
        if api_key.expose_secret().is_empty() {
            return Err(OAuthError::Configuration(
                "api key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            trust: TrustDecision::StrictValidation,
        })
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the TLS trust decision used for the exchange.
    #[must_use]
    pub const fn with_trust_decision(mut self, trust: TrustDecision) -> Self {
        self.trust = trust;
        self
    }
}

impl std::fmt::Debug for DefaultTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTokenProvider")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("trust", &self.trust)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for DefaultTokenProvider {
    async fn retrieve_token(&self) -> Result<Token, OAuthError> {
        debug!("retrieving bearer token from {}", self.endpoint);

        url::Url::parse(&self.endpoint).map_err(|e| {
            OAuthError::Configuration(format!("invalid token endpoint {}: {e}", self.endpoint))
        })?;

        let client = self
            .trust
            .apply(reqwest::Client::builder())
            .build()
            .map_err(OAuthError::Transport)?;

        let form = [
            ("grant_type", GRANT_TYPE),
            ("response_type", RESPONSE_TYPE),
            ("apikey", self.api_key.expose_secret()),
        ];

        let response = client
            .post(&self.endpoint)
            .header(AUTHORIZATION, BASIC_AUTH)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let status_message = status.canonical_reason().unwrap_or_default().to_string();
            info!(
                "token exchange rejected, status: {} reason: {status_message}",
                status.as_u16()
            );
            return Err(OAuthError::Service {
                status_code: status.as_u16(),
                status_message,
            });
        }

        let body = response.text().await?;
        let token = serde_json::from_str::<Token>(&body)?;
        Ok(token)
    }
}
