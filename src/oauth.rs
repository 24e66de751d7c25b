//! # OAuth 2.0 Vocabulary
//!
//! Shared OAuth 2.0 types and constants used across the endpoint handlers:
//! grant types, response modes, and the space-separated token sets used by
//! `response_type` and `scope`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Grant types understood by the token endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum GrantType {
    /// The authorization code grant, as defined in RFC 6749 section 4.1.
    #[default]
    #[serde(rename = "authorization_code")]
    AuthorizationCode,

    /// The refresh token grant, as defined in RFC 6749 section 6.
    #[serde(rename = "refresh_token")]
    RefreshToken,

    /// The resource owner password credentials grant, as defined in
    /// RFC 6749 section 4.3.
    #[serde(rename = "password")]
    Password,

    /// The client credentials grant, as defined in RFC 6749 section 4.4.
    #[serde(rename = "client_credentials")]
    ClientCredentials,

    /// The implicit flow. Advertised in discovery metadata; tokens are
    /// issued directly by the authorization endpoint rather than through a
    /// token endpoint grant.
    #[serde(rename = "implicit")]
    Implicit,
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizationCode => write!(f, "authorization_code"),
            Self::RefreshToken => write!(f, "refresh_token"),
            Self::Password => write!(f, "password"),
            Self::ClientCredentials => write!(f, "client_credentials"),
            Self::Implicit => write!(f, "implicit"),
        }
    }
}

/// The mechanism used to return authorization response parameters to the
/// client.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ResponseMode {
    /// Parameters are appended to the redirection URI's query string.
    #[default]
    #[serde(rename = "query")]
    Query,

    /// Parameters are carried in the redirection URI's fragment component.
    #[serde(rename = "fragment")]
    Fragment,

    /// Parameters are posted to the redirection URI by an auto-submitting
    /// HTML form, as defined in OAuth 2.0 Form Post Response Mode.
    #[serde(rename = "form_post")]
    FormPost,
}

impl ResponseMode {
    /// Parse a wire value. Returns `None` for an unrecognized mode.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "fragment" => Some(Self::Fragment),
            "form_post" => Some(Self::FormPost),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Fragment => write!(f, "fragment"),
            Self::FormPost => write!(f, "form_post"),
        }
    }
}

/// Well-known `response_type` tokens.
pub mod response_type {
    /// Request an authorization code.
    pub const CODE: &str = "code";
    /// Request an access token directly (implicit flow).
    pub const TOKEN: &str = "token";
    /// Request an identity token.
    pub const ID_TOKEN: &str = "id_token";
    /// Request a refresh token (token-endpoint re-issuance only).
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Well-known `scope` tokens.
pub mod scope {
    /// Requests OpenID Connect authentication.
    pub const OPENID: &str = "openid";
    /// Requests a refresh token.
    pub const OFFLINE_ACCESS: &str = "offline_access";
}

/// The `token_type` emitted with every access token.
pub const BEARER: &str = "Bearer";

/// Membership test over a space-separated token set such as
/// `response_type` or `scope`. Matching is exact-string equality on each
/// token.
#[must_use]
pub fn contains_token(set: &str, token: &str) -> bool {
    set.split(' ').any(|t| t == token)
}

/// True when every token in `subset` appears in `superset`.
#[must_use]
pub fn is_subset(subset: &str, superset: &str) -> bool {
    subset.split(' ').filter(|t| !t.is_empty()).all(|t| contains_token(superset, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_membership_is_exact() {
        assert!(contains_token("code id_token", "id_token"));
        assert!(contains_token("code id_token", "code"));
        // "token" is a substring of "id_token" but not a member
        assert!(!contains_token("code id_token", "token"));
    }

    #[test]
    fn subset() {
        assert!(is_subset("openid", "openid profile offline_access"));
        assert!(!is_subset("openid email", "openid profile"));
        assert!(is_subset("", "openid"));
    }

    #[test]
    fn grant_type_serializes_to_wire_name() {
        let json = serde_json::to_string(&GrantType::ClientCredentials).expect("should serialize");
        assert_eq!(json, r#""client_credentials""#);
    }
}
