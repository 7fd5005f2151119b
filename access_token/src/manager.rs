//! Expiry, validity, and refresh handling for individual token records

use std::sync::Arc;

use access_token_clock::{Clock, System, UnixTime};
use reqwest::header::ACCEPT;

use crate::{
    dto::{self, RefreshGrant},
    AccessTokenConfig, TokenError, TokenRecord,
};

/// How [`ManagedToken::get_with`] decides whether a token is still usable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidityCheck {
    /// Compare the token's expiry against the local clock
    #[default]
    Local,
    /// Ask the authorization server's user info endpoint
    Remote,
}

/// Whether a usable token was already on hand or had to be refreshed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Obtained {
    /// The existing token was still usable and was left untouched
    Current,
    /// A new token was obtained from the token endpoint
    Refreshed,
}

impl Obtained {
    /// Whether the token endpoint was called to produce the token
    #[inline]
    pub fn was_refreshed(self) -> bool {
        matches!(self, Self::Refreshed)
    }
}

/// Binds token records to an authorization server
///
/// The manager is cheap to clone; every [`ManagedToken`] carries its own
/// clone.
#[derive(Clone, Debug)]
pub struct TokenManager<C = System> {
    config: Arc<AccessTokenConfig>,
    client: reqwest::Client,
    clock: C,
}

impl TokenManager<System> {
    /// Constructs a new manager using a default HTTP client
    pub fn new(config: AccessTokenConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Constructs a new manager using the provided HTTP client
    ///
    /// Timeouts, proxies, and TLS settings of the client apply to every
    /// request made on behalf of managed tokens.
    pub fn with_client(config: AccessTokenConfig, client: reqwest::Client) -> Self {
        Self::with_clock(config, client, System)
    }
}

impl<C> TokenManager<C> {
    /// Constructs a new manager that tells time using `clock`
    pub fn with_clock(config: AccessTokenConfig, client: reqwest::Client, clock: C) -> Self {
        Self {
            config: Arc::new(config),
            client,
            clock,
        }
    }

    /// The connection parameters in use
    #[inline]
    pub fn config(&self) -> &AccessTokenConfig {
        &self.config
    }
}

impl<C: Clock + Clone> TokenManager<C> {
    /// Takes over lifecycle management of a token record
    ///
    /// The record's `expires_at` is computed from `expires_in` if it has not
    /// been computed before.
    pub fn wrap(&self, mut record: TokenRecord) -> ManagedToken<C> {
        record.normalize_with_clock(&self.clock);
        ManagedToken {
            manager: self.clone(),
            record,
        }
    }
}

/// A token record bound to the authorization server that issued it
///
/// Operations that can replace the token take `&mut self`, so at most one
/// refresh can be in flight for a given record. Share a managed token
/// between tasks by putting it behind an async mutex.
#[derive(Clone, Debug)]
pub struct ManagedToken<C = System> {
    manager: TokenManager<C>,
    record: TokenRecord,
}

impl<C: Clock> ManagedToken<C> {
    /// The current token record
    #[inline]
    pub fn record(&self) -> &TokenRecord {
        &self.record
    }

    /// Releases the token record from management
    #[inline]
    pub fn into_record(self) -> TokenRecord {
        self.record
    }

    /// Merges `fields` into the record and recomputes the expiry if it is unset
    pub fn set(&mut self, fields: TokenRecord) -> &mut Self {
        self.record.merge(fields);
        self.record.normalize_with_clock(&self.manager.clock);
        self
    }

    /// Whether the token is within the expiry margin, according to the manager's clock
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(self.manager.clock.now())
    }

    /// Whether the token is within the expiry margin as of `now`
    ///
    /// A record without a computed expiry is always considered expired.
    pub fn is_expired_at(&self, now: UnixTime) -> bool {
        match self.record.expires_at() {
            Some(expiry) => now >= expiry - self.manager.config.time_before_expiry(),
            None => true,
        }
    }

    /// Asks the user info endpoint whether it still accepts the access token
    ///
    /// Rejections by the server, including error statuses and bodies that
    /// are not JSON objects or that carry an `error` member, are reported as
    /// `Ok(false)`. Only a failure to reach the server is an error.
    #[tracing::instrument(
        err,
        skip(self),
        fields(user_info_url = %self.manager.config.user_info_url()),
    )]
    pub async fn is_valid(&self) -> Result<bool, TokenError> {
        let access_token = self
            .record
            .access_token()
            .ok_or(TokenError::MissingAccessToken)?;
        let config = &self.manager.config;

        tracing::trace!("probing user info endpoint");

        let resp = self
            .manager
            .client
            .get(config.user_info_url().clone())
            .query(&[(config.access_token_name(), access_token.as_str())])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(TokenError::RequestSend)?;

        let status = resp.status();
        tracing::debug!(
            response.status = status.as_u16(),
            "received user info response"
        );

        if status.as_u16() >= 400 {
            return Ok(false);
        }

        let body = resp.bytes().await.map_err(TokenError::BodyRead)?;
        let valid = dto::user_info_accepts(&body);
        if !valid {
            tracing::debug!("user info endpoint did not accept the access token");
        }

        Ok(valid)
    }

    /// Exchanges the refresh token for a new token
    ///
    /// On success the server's response is merged into the record, with the
    /// response winning on conflicts, and the expiry is recomputed from the
    /// new `expires_in`. On failure the record is left untouched.
    #[tracing::instrument(
        err,
        skip(self),
        fields(
            token_url = %self.manager.config.token_url(),
            credentials.grant_type = RefreshGrant::GRANT_TYPE,
            credentials.client_id = %self.manager.config.client_id(),
        ),
    )]
    pub async fn refresh(&mut self) -> Result<&TokenRecord, TokenError> {
        let config = &self.manager.config;
        let grant = RefreshGrant {
            refresh_token: self
                .record
                .refresh_token()
                .ok_or(TokenError::MissingRefreshToken)?,
            client_id: config.client_id(),
            client_secret: config.client_secret(),
        };

        tracing::trace!("requesting new token from authorization server");

        let resp = self
            .manager
            .client
            .post(config.token_url().clone())
            .form(&grant)
            .send()
            .await
            .map_err(TokenError::RequestSend)?;

        let status = resp.status();
        tracing::debug!(
            response.status = status.as_u16(),
            "received token response from authorization server"
        );

        let body = resp.bytes().await.map_err(TokenError::BodyRead)?;
        let fields = dto::token_body(&body)?;

        if status.as_u16() >= 400 {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::warn!(
                response.status = status.as_u16(),
                "authorization server refused to issue a new token"
            );
            return Err(TokenError::Rejected { status, body });
        }

        let fresh: TokenRecord =
            serde_json::from_value(dto::issued_token(fields).ok_or(TokenError::NoToken)?)?;

        self.record.clear_expires_at();
        self.record.merge(fresh);
        self.record.normalize_with_clock(&self.manager.clock);

        tracing::info!(
            has_refresh_token = self.record.refresh_token().is_some(),
            lifetime = self.record.expires_in().map(|l| l.0),
            expiry = self.record.expires_at().map(|e| e.0),
            "received new token"
        );

        Ok(&self.record)
    }

    /// Returns a usable token, refreshing it if it has expired locally
    pub async fn get(&mut self) -> Result<Obtained, TokenError> {
        self.get_with(ValidityCheck::Local).await
    }

    /// Returns a usable token, refreshing it if the server no longer accepts it
    pub async fn get_validated(&mut self) -> Result<Obtained, TokenError> {
        self.get_with(ValidityCheck::Remote).await
    }

    /// Returns a usable token, deciding whether to refresh according to `check`
    ///
    /// Even when the token is still usable and no request is made, the
    /// returned future yields to the runtime once before completing.
    pub async fn get_with(&mut self, check: ValidityCheck) -> Result<Obtained, TokenError> {
        let usable = match check {
            ValidityCheck::Remote => self.is_valid().await?,
            ValidityCheck::Local => {
                let expired = self.is_expired();
                if !expired {
                    tokio::task::yield_now().await;
                }
                !expired
            }
        };

        if usable {
            tracing::trace!(?check, "token still usable");
            Ok(Obtained::Current)
        } else {
            tracing::debug!(?check, "token no longer usable, refreshing");
            self.refresh().await?;
            Ok(Obtained::Refreshed)
        }
    }
}
