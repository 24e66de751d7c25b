//! # Response Bodies
//!
//! JSON payloads returned by the token and introspection endpoints.

use serde::{Deserialize, Serialize};

/// A successful token endpoint response, per RFC 6749 section 5.1.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// The access token, when one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// The access token type. Always `Bearer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Remaining access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// A refresh token, when `offline_access` was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// An identity token, when `openid` was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// The granted scope, echoed when it differs from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A successful introspection response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IntrospectionResponse {
    /// Audiences the token is bound to.
    pub audiences: Vec<String>,

    /// Expiry instant as UTC epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Claims carried by the token.
    pub claims: Vec<ClaimEntry>,
}

/// A single claim on an introspection response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClaimEntry {
    /// The claim type.
    #[serde(rename = "type")]
    pub kind: String,

    /// The claim value.
    pub value: String,
}
