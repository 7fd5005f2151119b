//! Connection parameters for the authorization server

use access_token_clock::DurationSecs;
use serde::Deserialize;
use url::Url;

use crate::{error::ConfigurationError, ClientId, ClientIdRef, ClientSecret, ClientSecretRef};

const DEFAULT_TOKEN_PATH: &str = "/oauth/token";
const DEFAULT_USER_INFO_PATH: &str = "/oauth/userinfo";
const DEFAULT_ACCESS_TOKEN_NAME: &str = "access_token";
const DEFAULT_TIME_BEFORE_EXPIRY: DurationSecs = DurationSecs(600);

/// Loosely specified options for constructing an [`AccessTokenConfig`]
///
/// Every field is optional here so that options can be deserialized from
/// whatever configuration source the embedding application uses. Required
/// fields are checked when the options are converted into a config.
///
/// ```
/// use access_token::AccessTokenOptions;
///
/// let config = AccessTokenOptions::new()
///     .site("https://fake-oauth.com")
///     .client_id("ABC123")
///     .client_secret("verySecret")
///     .token_path("/token")
///     .build()?;
///
/// assert_eq!(config.token_url().as_str(), "https://fake-oauth.com/token");
/// # Ok::<(), access_token::ConfigurationError>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenOptions {
    /// Base URL of the authorization server
    #[serde(default)]
    pub site: Option<String>,
    /// The client ID
    #[serde(default, alias = "clientID", alias = "client_id")]
    pub client_id: Option<ClientId>,
    /// The client secret
    #[serde(default, alias = "client_secret")]
    pub client_secret: Option<ClientSecret>,
    /// Path of the token endpoint relative to `site`
    #[serde(default)]
    pub token_path: Option<String>,
    /// Path of the user info endpoint relative to `site`
    #[serde(default)]
    pub user_info_path: Option<String>,
    /// Query parameter name used to pass the access token to the user info endpoint
    #[serde(default)]
    pub access_token_name: Option<String>,
    /// Seconds before stated expiry at which a token is treated as expired
    #[serde(default, alias = "timeBeforeExp")]
    pub time_before_expiry_seconds: Option<u64>,
}

impl AccessTokenOptions {
    /// Constructs an empty set of options
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the authorization server
    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Sets the client ID
    pub fn client_id(mut self, client_id: impl Into<ClientId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the client secret
    pub fn client_secret(mut self, client_secret: impl Into<ClientSecret>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Overrides the token endpoint path
    pub fn token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// Overrides the user info endpoint path
    pub fn user_info_path(mut self, path: impl Into<String>) -> Self {
        self.user_info_path = Some(path.into());
        self
    }

    /// Overrides the query parameter name used when probing the user info endpoint
    pub fn access_token_name(mut self, name: impl Into<String>) -> Self {
        self.access_token_name = Some(name.into());
        self
    }

    /// Overrides the expiry safety margin
    pub fn time_before_expiry(mut self, margin: DurationSecs) -> Self {
        self.time_before_expiry_seconds = Some(margin.0);
        self
    }

    /// Validates the options and applies defaults
    pub fn build(self) -> Result<AccessTokenConfig, ConfigurationError> {
        AccessTokenConfig::try_from(self)
    }
}

/// Immutable connection parameters for an authorization server
#[derive(Clone, Debug)]
pub struct AccessTokenConfig {
    site: String,
    client_id: ClientId,
    client_secret: ClientSecret,
    token_path: String,
    user_info_path: String,
    access_token_name: String,
    time_before_expiry: DurationSecs,
    token_url: Url,
    user_info_url: Url,
}

impl AccessTokenConfig {
    /// Constructs a config with default paths and expiry margin
    pub fn new(
        site: impl Into<String>,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
    ) -> Result<Self, ConfigurationError> {
        AccessTokenOptions::new()
            .site(site)
            .client_id(client_id)
            .client_secret(client_secret)
            .build()
    }

    /// Replaces the expiry safety margin
    pub fn with_time_before_expiry(mut self, margin: DurationSecs) -> Self {
        self.time_before_expiry = margin;
        self
    }

    /// Base URL of the authorization server
    #[inline]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// The client ID
    #[inline]
    pub fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    /// The client secret
    #[inline]
    pub fn client_secret(&self) -> &ClientSecretRef {
        &self.client_secret
    }

    /// Path of the token endpoint
    #[inline]
    pub fn token_path(&self) -> &str {
        &self.token_path
    }

    /// Path of the user info endpoint
    #[inline]
    pub fn user_info_path(&self) -> &str {
        &self.user_info_path
    }

    /// Query parameter name carrying the access token on validity probes
    #[inline]
    pub fn access_token_name(&self) -> &str {
        &self.access_token_name
    }

    /// Safety margin subtracted from a token's expiry
    #[inline]
    pub fn time_before_expiry(&self) -> DurationSecs {
        self.time_before_expiry
    }

    /// Fully resolved token endpoint
    #[inline]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Fully resolved user info endpoint
    #[inline]
    pub fn user_info_url(&self) -> &Url {
        &self.user_info_url
    }
}

impl TryFrom<AccessTokenOptions> for AccessTokenConfig {
    type Error = ConfigurationError;

    fn try_from(options: AccessTokenOptions) -> Result<Self, Self::Error> {
        let site = options
            .site
            .filter(|s| !s.is_empty())
            .ok_or(ConfigurationError::MissingField("site"))?;
        let client_id = options
            .client_id
            .filter(|s| !s.as_str().is_empty())
            .ok_or(ConfigurationError::MissingField("clientId"))?;
        let client_secret = options
            .client_secret
            .filter(|s| !s.as_str().is_empty())
            .ok_or(ConfigurationError::MissingField("clientSecret"))?;

        let token_path = options
            .token_path
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_owned());
        let user_info_path = options
            .user_info_path
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_INFO_PATH.to_owned());
        let access_token_name = options
            .access_token_name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ACCESS_TOKEN_NAME.to_owned());
        // A zero margin is treated like an absent one.
        let time_before_expiry = options
            .time_before_expiry_seconds
            .filter(|&s| s > 0)
            .map(DurationSecs)
            .unwrap_or(DEFAULT_TIME_BEFORE_EXPIRY);

        let token_url = resolve(&site, &token_path, "tokenPath")?;
        let user_info_url = resolve(&site, &user_info_path, "userInfoPath")?;

        Ok(Self {
            site,
            client_id,
            client_secret,
            token_path,
            user_info_path,
            access_token_name,
            time_before_expiry,
            token_url,
            user_info_url,
        })
    }
}

fn resolve(site: &str, path: &str, field: &'static str) -> Result<Url, ConfigurationError> {
    Url::parse(&format!("{site}{path}"))
        .map_err(|source| ConfigurationError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    const SITE: &str = "https://fake-oauth.com";

    #[test]
    fn applies_defaults() -> Result<()> {
        let config = AccessTokenConfig::new(SITE, "ABC123", "verySecret")?;

        assert_eq!(config.site(), SITE);
        assert_eq!(config.client_id().as_str(), "ABC123");
        assert_eq!(config.client_secret().as_str(), "verySecret");
        assert_eq!(config.token_path(), "/oauth/token");
        assert_eq!(config.user_info_path(), "/oauth/userinfo");
        assert_eq!(config.access_token_name(), "access_token");
        assert_eq!(config.time_before_expiry(), DurationSecs(600));
        assert_eq!(
            config.token_url().as_str(),
            "https://fake-oauth.com/oauth/token"
        );
        assert_eq!(
            config.user_info_url().as_str(),
            "https://fake-oauth.com/oauth/userinfo"
        );
        Ok(())
    }

    #[test]
    fn requires_site() {
        let err = AccessTokenOptions::new()
            .client_id("ABC123")
            .client_secret("verySecret")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "option 'site' is required");
    }

    #[test]
    fn requires_client_id() {
        let err = AccessTokenOptions::new()
            .site(SITE)
            .client_secret("verySecret")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "option 'clientId' is required");
    }

    #[test]
    fn requires_client_secret() {
        let err = AccessTokenOptions::new()
            .site(SITE)
            .client_id("ABC123")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "option 'clientSecret' is required");
    }

    #[test]
    fn rejects_empty_required_fields() {
        let err = AccessTokenConfig::new("", "ABC123", "verySecret").unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingField("site")));

        let err = AccessTokenConfig::new(SITE, "", "verySecret").unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingField("clientId")));

        let err = AccessTokenConfig::new(SITE, "ABC123", "").unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingField("clientSecret")));
    }

    #[test]
    fn rejects_unresolvable_site() {
        let err = AccessTokenConfig::new("not a url", "ABC123", "verySecret").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidUrl {
                field: "tokenPath",
                ..
            }
        ));
    }

    #[test]
    fn deserializes_camel_case_options() -> Result<()> {
        let options: AccessTokenOptions = serde_json::from_value(serde_json::json!({
            "site": SITE,
            "clientID": "ABC123",
            "clientSecret": "verySecret",
            "tokenPath": "/token",
            "userInfoPath": "/me",
            "accessTokenName": "token",
            "timeBeforeExp": 30,
        }))?;
        let config = options.build()?;

        assert_eq!(config.client_id().as_str(), "ABC123");
        assert_eq!(config.token_url().as_str(), "https://fake-oauth.com/token");
        assert_eq!(config.user_info_url().as_str(), "https://fake-oauth.com/me");
        assert_eq!(config.access_token_name(), "token");
        assert_eq!(config.time_before_expiry(), DurationSecs(30));
        Ok(())
    }

    #[test]
    fn empty_paths_fall_back_to_defaults() -> Result<()> {
        let config = AccessTokenOptions::new()
            .site(SITE)
            .client_id("ABC123")
            .client_secret("verySecret")
            .token_path("")
            .user_info_path("")
            .access_token_name("")
            .build()?;

        assert_eq!(config.token_path(), "/oauth/token");
        assert_eq!(
            config.token_url().as_str(),
            "https://fake-oauth.com/oauth/token"
        );
        assert_eq!(config.user_info_path(), "/oauth/userinfo");
        assert_eq!(
            config.user_info_url().as_str(),
            "https://fake-oauth.com/oauth/userinfo"
        );
        assert_eq!(config.access_token_name(), "access_token");
        Ok(())
    }

    #[test]
    fn zero_margin_falls_back_to_default() -> Result<()> {
        let config = AccessTokenOptions::new()
            .site(SITE)
            .client_id("ABC123")
            .client_secret("verySecret")
            .time_before_expiry(DurationSecs(0))
            .build()?;
        assert_eq!(config.time_before_expiry(), DurationSecs(600));

        let config = config.with_time_before_expiry(DurationSecs(5));
        assert_eq!(config.time_before_expiry(), DurationSecs(5));
        Ok(())
    }
}
