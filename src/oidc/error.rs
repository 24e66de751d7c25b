//! # Protocol Errors
//!
//! Wire-visible error codes for the authorization, token, introspection,
//! and logout endpoints, as prescribed by RFC 6749 section 5.2 and OpenID
//! Connect Core.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::core::urlencode;

/// Protocol error codes returned to clients.
#[derive(Error, Debug, Deserialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// The request is missing a required parameter, includes an unsupported
    /// parameter value, repeats a parameter, or is otherwise malformed.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// Client authentication failed (e.g., unknown client, no client
    /// authentication included, or unsupported authentication method).
    #[error(r#"{{"error": "invalid_client", "error_description": "{0}"}}"#)]
    InvalidClient(String),

    /// The provided authorization grant (e.g., authorization code, refresh
    /// token) is invalid, expired, does not match the redirection URI used
    /// in the authorization request, or was issued to another client.
    #[error(r#"{{"error": "invalid_grant", "error_description": "{0}"}}"#)]
    InvalidGrant(String),

    /// The authenticated client is not authorized to use this authorization
    /// grant type.
    #[error(r#"{{"error": "unauthorized_client", "error_description": "{0}"}}"#)]
    UnauthorizedClient(String),

    /// The authorization grant type is not supported by the authorization
    /// server.
    #[error(r#"{{"error": "unsupported_grant_type", "error_description": "{0}"}}"#)]
    UnsupportedGrantType(String),

    /// The authorization server does not support obtaining an authorization
    /// response using this method.
    #[error(r#"{{"error": "unsupported_response_type", "error_description": "{0}"}}"#)]
    UnsupportedResponseType(String),

    /// The authorization server encountered an unexpected condition that
    /// prevented it from fulfilling the request.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

impl Error {
    /// The wire error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::ServerError(_) => "server_error",
        }
    }

    /// The human-readable `error_description`.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::InvalidGrant(d)
            | Self::UnauthorizedClient(d)
            | Self::UnsupportedGrantType(d)
            | Self::UnsupportedResponseType(d)
            | Self::ServerError(d) => d,
        }
    }

    /// Transform the error to wire-compatible json format.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.to_string()).unwrap_or_default()
    }

    /// Transform the error to wire-compatible query string format.
    #[must_use]
    pub fn to_querystring(&self) -> String {
        urlencode::to_query(&[
            ("error".to_string(), self.code().to_string()),
            ("error_description".to_string(), self.description().to_string()),
        ])
    }
}

/// Error response body for the token and introspection endpoints.
#[allow(clippy::module_name_repetitions)]
#[derive(Deserialize, Serialize)]
struct WireError {
    error: String,
    error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_uri: Option<String>,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as SerdeError;

        let Ok(error) = serde_json::from_str::<WireError>(&self.to_string()) else {
            return Err(SerdeError::custom("issue deserializing Err"));
        };
        error.serialize(serializer)
    }
}

/// A provider rejection: the error to return plus an optional `error_uri`
/// pointing at documentation for the failure.
#[derive(Debug)]
pub struct Rejection {
    /// The error returned to the client.
    pub error: Error,

    /// A URI identifying a human-readable web page with information about
    /// the error.
    pub error_uri: Option<String>,
}

impl From<Error> for Rejection {
    fn from(error: Error) -> Self {
        Self {
            error,
            error_uri: None,
        }
    }
}

/// Construct an `Error::InvalidRequest` error from a string or existing
/// error value.
#[macro_export]
macro_rules! invalid {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::oidc::Error::InvalidRequest(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::oidc::Error::InvalidRequest(format!($err))
    };
}

/// Construct an `Error::ServerError` error from a string or existing error
/// value.
#[macro_export]
macro_rules! server {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::oidc::Error::ServerError(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::oidc::Error::ServerError(format!($err))
    };
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    // Test that error details are returned as json.
    #[test]
    fn err_json() {
        let err = invalid!("bad request");
        let ser: Value = serde_json::from_str(&err.to_string()).unwrap();
        assert_eq!(ser, json!({"error": "invalid_request", "error_description": "bad request"}));
    }

    // Test that the error details are returned as an http query string.
    #[test]
    fn err_querystring() {
        let err = Error::InvalidGrant("invalid grant description".to_string());
        assert_eq!(
            err.to_querystring(),
            "error=invalid_grant&error_description=invalid%20grant%20description"
        );
    }

    #[test]
    fn err_serialize() {
        let err = server!("unexpected condition");
        let ser = serde_json::to_value(&err).unwrap();
        assert_eq!(
            ser,
            json!({"error": "server_error", "error_description": "unexpected condition"})
        );
    }
}
