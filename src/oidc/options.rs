//! # Server Options
//!
//! The configuration surface recognized by [`crate::oidc::Endpoint`]:
//! issuer identity, endpoint paths, token lifetimes, behavioral flags, and
//! signing credentials.

use std::fmt;

use anyhow::{Result, anyhow, bail};
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use sha1::{Digest, Sha1};

/// Serialization strategy for access tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessTokenFormat {
    /// RS256-signed JWTs (the default).
    #[default]
    Jwt,

    /// Opaque blobs produced by the host's data-protection primitive.
    Protected,
}

/// Authorization server configuration.
#[derive(Clone, Debug)]
pub struct Options {
    /// Absolute URI used as `iss` in every token and as the metadata
    /// issuer. Must carry no query or fragment.
    pub issuer: String,

    /// Path of the authorization endpoint. Empty disables the endpoint.
    pub authorization_endpoint_path: String,

    /// Path of the token endpoint. Empty disables the endpoint.
    pub token_endpoint_path: String,

    /// Path of the token introspection endpoint. Empty disables the
    /// endpoint.
    pub introspection_endpoint_path: String,

    /// Path of the logout (end-session) endpoint. Empty disables the
    /// endpoint.
    pub logout_endpoint_path: String,

    /// Path of the configuration (discovery) endpoint. Empty disables the
    /// endpoint.
    pub configuration_endpoint_path: String,

    /// Path of the cryptography (JWKS) endpoint. Empty disables the
    /// endpoint.
    pub jwks_endpoint_path: String,

    /// Lifetime of authorization codes.
    pub authorization_code_lifetime: Duration,

    /// Lifetime of access tokens.
    pub access_token_lifetime: Duration,

    /// Lifetime of identity tokens.
    pub identity_token_lifetime: Duration,

    /// Lifetime of refresh tokens.
    pub refresh_token_lifetime: Duration,

    /// When false, tokens minted on a refresh-token grant cannot outlive
    /// the incoming refresh token.
    pub use_sliding_expiration: bool,

    /// Permit plaintext HTTP requests and `http` redirection URIs.
    /// Development only.
    pub allow_insecure_http: bool,

    /// When true, errors that cannot be redirected to the client are
    /// surfaced to the host application instead of rendered as a native
    /// plain-text page.
    pub application_can_display_errors: bool,

    /// Signing credentials. The first signs; all are advertised on the
    /// JWKS endpoint.
    pub signing_credentials: Vec<SigningCredential>,

    /// Serialization strategy for access tokens.
    pub access_token_format: AccessTokenFormat,
}

impl Options {
    /// Options for the given issuer with the default endpoint paths,
    /// lifetimes, and flags.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            authorization_endpoint_path: "/connect/authorize".to_string(),
            token_endpoint_path: "/connect/token".to_string(),
            introspection_endpoint_path: "/connect/token_validation".to_string(),
            logout_endpoint_path: "/connect/logout".to_string(),
            configuration_endpoint_path: "/.well-known/openid-configuration".to_string(),
            jwks_endpoint_path: "/.well-known/jwks".to_string(),
            authorization_code_lifetime: Duration::minutes(5),
            access_token_lifetime: Duration::hours(1),
            identity_token_lifetime: Duration::minutes(20),
            refresh_token_lifetime: Duration::hours(6),
            use_sliding_expiration: true,
            allow_insecure_http: false,
            application_can_display_errors: false,
            signing_credentials: vec![],
            access_token_format: AccessTokenFormat::Jwt,
        }
    }

    /// Verify the options describe a usable server.
    ///
    /// # Errors
    ///
    /// Returns an error when the issuer is not an absolute URI, carries a
    /// query or fragment, or uses plaintext HTTP without
    /// `allow_insecure_http`.
    pub fn validate(&self) -> Result<()> {
        if !self.issuer.contains("://") {
            bail!("issuer must be an absolute URI: {}", self.issuer);
        }
        if self.issuer.contains('?') || self.issuer.contains('#') {
            bail!("issuer cannot contain a query or fragment: {}", self.issuer);
        }
        if !self.allow_insecure_http && !self.issuer.starts_with("https://") {
            bail!("issuer must use TLS: {}", self.issuer);
        }
        Ok(())
    }

    /// The credential used to sign, when one is configured.
    #[must_use]
    pub fn signing_credential(&self) -> Option<&SigningCredential> {
        self.signing_credentials.first()
    }

    /// An absolute endpoint URL below the issuer.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{path}", self.issuer.trim_end_matches('/'))
    }
}

/// An asymmetric signing key plus its algorithm, with an optional X.509
/// certificate. The key identifier is taken from the certificate when one
/// is present, otherwise derived from the RSA modulus.
#[derive(Clone)]
pub struct SigningCredential {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    key_id: String,
    modulus: String,
    exponent: String,
    certificate: Option<Vec<u8>>,
}

impl SigningCredential {
    /// Build a credential from a bare RSA private key.
    ///
    /// # Errors
    ///
    /// Returns an error when the key cannot be encoded for signing.
    pub fn new(key: &RsaPrivateKey) -> Result<Self> {
        Self::build(key, None)
    }

    /// Build a credential from an RSA private key and its DER-encoded
    /// X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns an error when the key cannot be encoded for signing.
    pub fn with_certificate(key: &RsaPrivateKey, certificate_der: Vec<u8>) -> Result<Self> {
        Self::build(key, Some(certificate_der))
    }

    fn build(key: &RsaPrivateKey, certificate: Option<Vec<u8>>) -> Result<Self> {
        let der = key.to_pkcs1_der().map_err(|e| anyhow!("issue encoding signing key: {e}"))?;
        let modulus = Base64UrlUnpadded::encode_string(&key.n().to_bytes_be());
        let exponent = Base64UrlUnpadded::encode_string(&key.e().to_bytes_be());

        let decoding = DecodingKey::from_rsa_components(&modulus, &exponent)
            .map_err(|e| anyhow!("issue building verification key: {e}"))?;

        Ok(Self {
            encoding: EncodingKey::from_rsa_der(der.as_bytes()),
            decoding,
            algorithm: Algorithm::RS256,
            key_id: derive_key_id(&modulus),
            modulus,
            exponent,
            certificate,
        })
    }

    /// The signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The key identifier emitted as the `kid` JWT header and JWK member.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Base64url-encoded RSA modulus.
    #[must_use]
    pub fn modulus(&self) -> &str {
        &self.modulus
    }

    /// Base64url-encoded RSA public exponent.
    #[must_use]
    pub fn exponent(&self) -> &str {
        &self.exponent
    }

    /// The DER-encoded X.509 certificate, when the credential carries one.
    #[must_use]
    pub fn certificate(&self) -> Option<&[u8]> {
        self.certificate.as_deref()
    }

    /// Base64url-encoded SHA-1 thumbprint of the certificate, emitted as
    /// the `x5t` JWT header and JWK member.
    #[must_use]
    pub fn thumbprint(&self) -> Option<String> {
        self.certificate
            .as_ref()
            .map(|der| Base64UrlUnpadded::encode_string(&Sha1::digest(der)))
    }

    /// The certificate chain as base64-encoded DER, emitted as the JWK
    /// `x5c` member.
    #[must_use]
    pub fn certificate_chain(&self) -> Option<Vec<String>> {
        self.certificate.as_ref().map(|der| vec![Base64::encode_string(der)])
    }

    pub(crate) const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("certificate", &self.certificate.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

// the first 40 uppercase characters of the base64url-encoded modulus
fn derive_key_id(modulus_b64: &str) -> String {
    modulus_b64.chars().take(40).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::new("https://server.example.com");
        assert!(options.validate().is_ok());
        assert_eq!(options.authorization_code_lifetime, Duration::minutes(5));
        assert_eq!(options.access_token_lifetime, Duration::hours(1));
        assert_eq!(options.identity_token_lifetime, Duration::minutes(20));
        assert_eq!(options.refresh_token_lifetime, Duration::hours(6));
        assert!(options.use_sliding_expiration);
        assert!(!options.allow_insecure_http);
    }

    #[test]
    fn issuer_validation() {
        assert!(Options::new("server.example.com").validate().is_err());
        assert!(Options::new("https://server.example.com?x=1").validate().is_err());
        assert!(Options::new("https://server.example.com#frag").validate().is_err());
        assert!(Options::new("http://server.example.com").validate().is_err());

        let mut insecure = Options::new("http://localhost:8080");
        insecure.allow_insecure_http = true;
        assert!(insecure.validate().is_ok());
    }

    #[test]
    fn endpoint_url_joins_paths() {
        let options = Options::new("https://server.example.com/");
        assert_eq!(
            options.endpoint_url("/connect/token"),
            "https://server.example.com/connect/token"
        );
    }

    #[test]
    fn key_id_derivation() {
        let key_id = derive_key_id("abcdefghijklmnopqrstuvwxyz0123456789abcdefghij");
        assert_eq!(key_id.len(), 40);
        assert_eq!(key_id, "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789ABCD");
    }
}
