//! Client-side lifecycle management for OAuth2 bearer tokens
//!
//! A token record, as handed out by an authorization server, knows nothing
//! about when it stops being useful. This crate binds such a record to the
//! server that issued it so that it can be asked whether it has expired,
//! probed against the server's user info endpoint, and refreshed through
//! the token endpoint using its refresh token.
//!
//! The central operation is [`ManagedToken::get`], which returns the token
//! as-is while it is still fresh and refreshes it once it falls within the
//! configured expiry margin. [`ManagedToken::get_validated`] asks the server
//! instead of trusting the local clock.
//!
//! ```
//! use access_token::{AccessTokenConfig, TokenManager, TokenRecord};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AccessTokenConfig::new("https://fake-oauth.com", "ABC123", "verySecret")?;
//! let manager = TokenManager::new(config);
//!
//! let record: TokenRecord = serde_json::from_str(
//!     r#"{"access_token":"abc","refresh_token":"rt1","expires_in":3600}"#,
//! )?;
//! let mut token = manager.wrap(record);
//!
//! if token.get().await?.was_refreshed() {
//!     tracing::info!("token was refreshed");
//! }
//!
//! let access_token = token.record().access_token();
//! # let _ = access_token;
//! # Ok(())
//! # }
//! ```
//!
//! No requests are retried. A failed validity probe or refresh is reported
//! once and it is up to the caller to decide whether to try again.
//!
//! # Features
//!
//! * `rustls-tls` (default): use `rustls` for HTTPS connections.
//! * `default-tls`: use the platform's native TLS implementation.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod config;
mod dto;
mod error;
mod manager;
mod record;

pub use access_token_clock::{Clock, DurationSecs, System, TestClock, UnixTime};
pub use braids::*;
pub use config::{AccessTokenConfig, AccessTokenOptions};
pub use error::{ConfigurationError, TokenError};
pub use manager::{ManagedToken, Obtained, TokenManager, ValidityCheck};
pub use record::{merge_fields, TokenRecord};
