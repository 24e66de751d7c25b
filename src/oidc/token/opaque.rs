//! # Opaque Serialization
//!
//! Data-protected ticket blobs, used for authorization codes and refresh
//! tokens (and for access tokens when the host opts out of JWTs). The
//! ciphertext is produced by the host's [`DataProtector`] and carried on
//! the wire base64url-encoded.

use anyhow::{Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};

use crate::oidc::provider::DataProtector;
use crate::oidc::ticket::AuthenticationTicket;

/// Protect a ticket and encode the ciphertext for the wire.
pub(crate) async fn protect(
    protector: &impl DataProtector, ticket: &AuthenticationTicket,
) -> Result<String> {
    let ciphertext = protect_raw(protector, ticket).await?;
    Ok(Base64UrlUnpadded::encode_string(&ciphertext))
}

/// Protect a ticket, returning the raw ciphertext (used when the
/// ciphertext is cached rather than sent to the client).
pub(crate) async fn protect_raw(
    protector: &impl DataProtector, ticket: &AuthenticationTicket,
) -> Result<Vec<u8>> {
    protector.protect(&ticket.to_vec()?).await
}

/// Reverse [`protect`].
pub(crate) async fn unprotect(
    protector: &impl DataProtector, token: &str,
) -> Result<AuthenticationTicket> {
    let ciphertext = Base64UrlUnpadded::decode_vec(token)
        .map_err(|e| anyhow!("malformed opaque token: {e}"))?;
    unprotect_raw(protector, &ciphertext).await
}

/// Reverse [`protect_raw`].
pub(crate) async fn unprotect_raw(
    protector: &impl DataProtector, ciphertext: &[u8],
) -> Result<AuthenticationTicket> {
    let plaintext = protector.unprotect(ciphertext).await?;
    AuthenticationTicket::from_slice(&plaintext)
}
