//! Errors raised while configuring or managing tokens

use reqwest::StatusCode;
use thiserror::Error;

/// The connection parameters for the authorization server are unusable
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required option was absent or empty
    #[error("option '{0}' is required")]
    MissingField(&'static str),
    /// The site combined with an endpoint path does not form a valid URL
    #[error("option '{field}' does not form a valid URL with 'site'")]
    InvalidUrl {
        /// The path option that failed to resolve
        field: &'static str,
        /// The underlying parse failure
        source: url::ParseError,
    },
}

/// An error while validating or refreshing a token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token record has no access token to validate
    #[error("missing 'access_token' in token object")]
    MissingAccessToken,
    /// The token record has no refresh token to exchange
    #[error("missing 'refresh_token' in token object")]
    MissingRefreshToken,
    /// Unable to send a request to the authorization server
    #[error("error sending request to authorization server")]
    RequestSend(#[source] reqwest::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyRead(#[source] reqwest::Error),
    /// The token endpoint refused to issue a new token
    #[error("error requesting new token ({status}): {body}")]
    Rejected {
        /// The status returned by the token endpoint
        status: StatusCode,
        /// The raw response body, for diagnostics
        body: String,
    },
    /// The token endpoint answered successfully but without a token
    #[error("unable to retrieve a new token")]
    NoToken,
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authorization server")]
    Decode(#[from] serde_json::Error),
}

impl TokenError {
    /// Whether the failure happened before anything was sent to the server
    ///
    /// These indicate a malformed token record rather than a server problem
    /// and will not succeed if retried.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingAccessToken | Self::MissingRefreshToken)
    }

    /// Whether the failure came from the underlying HTTP transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestSend(_) | Self::BodyRead(_))
    }

    /// The status code returned by the token endpoint, if it rejected the request
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
