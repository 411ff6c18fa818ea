//! # breakwater-oauth
//!
//! Bearer-token acquisition for the breakwater object-storage transport.
//!
//! An object-storage caller holds a long-lived API key; every request is
//! authenticated with a short-lived bearer token instead. This crate does
//! exactly one thing: exchange the key for a token against an IAM-style
//! token endpoint, on its own short-lived client, independent of the pooled
//! data-plane client. Refresh scheduling, caching and retries belong to the
//! caller.
//!
//! Failures are fully typed — a caller can always distinguish "the service
//! rejected the key" ([`OAuthError::Service`]) from "the service was
//! unreachable" ([`OAuthError::Transport`]) from "the service returned 200
//! with a garbage body" ([`OAuthError::Parse`]).
//!
//! ## Example
//!
//! ```no_run
//! use breakwater_oauth::{DefaultTokenProvider, TokenProvider};
//!
//! # async fn example() -> Result<(), breakwater_oauth::OAuthError> {
//! let provider = DefaultTokenProvider::new("my-api-key")?;
//! let token = provider.retrieve_token().await?;
//! println!("token type: {}", token.token_type());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod provider;
pub mod token;

pub use error::OAuthError;
pub use provider::{DEFAULT_TOKEN_ENDPOINT, DefaultTokenProvider, TokenProvider};
pub use token::Token;
