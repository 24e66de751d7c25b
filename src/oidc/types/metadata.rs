//! # Server Metadata
//!
//! Types serialized by the discovery and cryptography endpoints: the
//! OpenID Provider configuration document and the JSON Web Key Set.

use serde::{Deserialize, Serialize};

use crate::oauth::GrantType;

/// The OpenID Provider configuration document published at
/// `/.well-known/openid-configuration`, per OpenID Connect Discovery 1.0.
///
/// Optional members are omitted (not emitted as `null`) when the backing
/// endpoint is disabled.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerMetadata {
    /// The issuer identifier, used as `iss` in every token.
    pub issuer: String,

    /// URL of the authorization endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    /// URL of the token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// URL of the end-session (logout) endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// URL of the JSON Web Key Set document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// Grant types the token endpoint will process.
    pub grant_types_supported: Vec<GrantType>,

    /// Mechanisms available for returning authorization responses.
    pub response_modes_supported: Vec<String>,

    /// `response_type` combinations the authorization endpoint will accept.
    pub response_types_supported: Vec<String>,

    /// Subject identifier types. Always `public`.
    pub subject_types_supported: Vec<String>,

    /// Scope values this server understands.
    pub scopes_supported: Vec<String>,

    /// Signing algorithms for identity tokens. Always `RS256`.
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// A JSON Web Key Set, per RFC 7517.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwks {
    /// The published keys.
    pub keys: Vec<Jwk>,
}

/// A single JSON Web Key. X.509-backed keys carry `x5t`/`x5c`; bare RSA
/// keys carry `n`/`e`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type. Always `RSA`.
    pub kty: String,

    /// Intended use. Always `sig`.
    #[serde(rename = "use")]
    pub use_: String,

    /// Key identifier, matched against the `kid` JWT header.
    pub kid: String,

    /// Signing algorithm. Always `RS256`.
    pub alg: String,

    /// Base64url-encoded RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// Base64url-encoded RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Base64url-encoded SHA-1 thumbprint of the X.509 certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,

    /// The X.509 certificate chain, each entry base64-encoded DER.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
}
