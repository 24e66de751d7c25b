//! # Token Serialization
//!
//! Minting and reading of the four token kinds. Access and identity tokens
//! are RS256 JWTs by default; authorization codes and refresh tokens are
//! opaque data-protected blobs. For authorization codes the ciphertext
//! never reaches the client: it is cached under a fresh 256-bit key and
//! the key is returned instead.
//!
//! Every serializer failure is caught and logged; callers observe a `None`
//! token and convert it to `server_error` (or `invalid_grant` when
//! reading).

mod jwt;
mod opaque;

use anyhow::{Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::oidc::events::{CreateTokenContext, ReceiveTokenContext};
use crate::oidc::options::{AccessTokenFormat, Options};
use crate::oidc::provider::{Provider, StateStore};
use crate::oidc::state::{CODE_NS, CachePolicy};
use crate::oidc::ticket::{AuthenticationTicket, Claim, Destination, claim};
use crate::{core::generate, oidc::events::Events};

/// Mint an authorization code for the ticket: the full ticket is
/// protected, the ciphertext cached until the ticket expires, and the
/// cache key returned as the code.
pub(crate) async fn create_authorization_code(
    provider: &impl Provider, _options: &Options, ticket: &AuthenticationTicket,
) -> Option<String> {
    let mut ctx = CreateTokenContext::new(ticket.clone());
    provider.create_authorization_code(&mut ctx).await;
    if let Some(token) = ctx.token {
        return Some(token);
    }

    let result: Result<String> = async {
        let expires_at =
            ctx.ticket.properties.expires_at.ok_or_else(|| anyhow!("ticket has no expiry"))?;
        let ciphertext = opaque::protect_raw(provider, &ctx.ticket).await?;

        let code = generate::code_key();
        StateStore::put(
            provider,
            &format!("{CODE_NS}{code}"),
            ciphertext,
            CachePolicy::Absolute(expires_at),
        )
        .await?;
        Ok(code)
    }
    .await;

    match result {
        Ok(code) => Some(code),
        Err(e) => {
            tracing::warn!("issue creating authorization code: {e}");
            None
        }
    }
}

/// Mint an access token for the ticket.
pub(crate) async fn create_access_token(
    provider: &impl Provider, options: &Options, ticket: &AuthenticationTicket,
) -> Option<String> {
    let mut ctx = CreateTokenContext::new(ticket.scoped_to(Destination::AccessToken));
    provider.create_access_token(&mut ctx).await;
    if let Some(token) = ctx.token {
        return Some(token);
    }

    let result = match options.access_token_format {
        AccessTokenFormat::Jwt => sign(options, &ctx.ticket, access_token_audiences(&ctx.ticket)),
        AccessTokenFormat::Protected => opaque::protect(provider, &ctx.ticket).await,
    };

    match result {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!("issue creating access token: {e}");
            None
        }
    }
}

/// Mint an identity token for the ticket. `code` and `access_token` are
/// the artifacts issued alongside it in the same response, hashed into
/// `c_hash` and `at_hash`.
pub(crate) async fn create_identity_token(
    provider: &impl Provider, options: &Options, ticket: &AuthenticationTicket,
    code: Option<&str>, access_token: Option<&str>,
) -> Option<String> {
    let mut ctx = CreateTokenContext::new(ticket.scoped_to(Destination::IdentityToken));
    provider.create_identity_token(&mut ctx).await;
    if let Some(token) = ctx.token {
        return Some(token);
    }

    let result: Result<String> = (|| {
        let mut extra = Map::new();
        if let Some(nonce) = ctx.ticket.properties.nonce() {
            extra.insert("nonce".to_string(), json!(nonce));
        }
        if let Some(code) = code {
            extra.insert("c_hash".to_string(), json!(hash_claim(code)));
        }
        if let Some(access_token) = access_token {
            extra.insert("at_hash".to_string(), json!(hash_claim(access_token)));
        }

        let mut payload = jwt_payload(options, &ctx.ticket, ctx.ticket.properties.audiences())?;
        payload.append(&mut extra);

        let credential =
            options.signing_credential().ok_or_else(|| anyhow!("no signing credential"))?;
        jwt::encode(credential, &payload)
    })();

    match result {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!("issue creating identity token: {e}");
            None
        }
    }
}

/// Mint a refresh token for the ticket: the full ticket, protected.
pub(crate) async fn create_refresh_token(
    provider: &impl Provider, _options: &Options, ticket: &AuthenticationTicket,
) -> Option<String> {
    let mut ctx = CreateTokenContext::new(ticket.clone());
    provider.create_refresh_token(&mut ctx).await;
    if let Some(token) = ctx.token {
        return Some(token);
    }

    match opaque::protect(provider, &ctx.ticket).await {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!("issue creating refresh token: {e}");
            None
        }
    }
}

/// Redeem an authorization code. The cache entry is removed as it is read,
/// making a second redemption fail.
pub(crate) async fn receive_authorization_code(
    provider: &impl Provider, _options: &Options, code: &str,
) -> Option<AuthenticationTicket> {
    let mut ctx = ReceiveTokenContext::new(code);
    provider.receive_authorization_code(&mut ctx).await;
    if let Some(ticket) = ctx.ticket {
        return Some(ticket);
    }

    let result: Result<Option<AuthenticationTicket>> = async {
        let Some(ciphertext) = StateStore::take(provider, &format!("{CODE_NS}{code}")).await?
        else {
            return Ok(None);
        };
        Ok(Some(opaque::unprotect_raw(provider, &ciphertext).await?))
    }
    .await;

    match result {
        Ok(ticket) => ticket,
        Err(e) => {
            tracing::warn!("issue receiving authorization code: {e}");
            None
        }
    }
}

/// Read an access token back into a ticket.
pub(crate) async fn receive_access_token(
    provider: &impl Provider, options: &Options, token: &str,
) -> Option<AuthenticationTicket> {
    let mut ctx = ReceiveTokenContext::new(token);
    provider.receive_access_token(&mut ctx).await;
    if let Some(ticket) = ctx.ticket {
        return Some(ticket);
    }

    let result = match options.access_token_format {
        AccessTokenFormat::Jwt => jwt::decode(options, token).map(ticket_from_claims),
        AccessTokenFormat::Protected => opaque::unprotect(provider, token).await,
    };

    match result {
        Ok(ticket) => Some(ticket),
        Err(e) => {
            tracing::warn!("issue receiving access token: {e}");
            None
        }
    }
}

/// Read an identity token back into a ticket.
pub(crate) async fn receive_identity_token(
    provider: &impl Provider, options: &Options, token: &str,
) -> Option<AuthenticationTicket> {
    let mut ctx = ReceiveTokenContext::new(token);
    provider.receive_identity_token(&mut ctx).await;
    if let Some(ticket) = ctx.ticket {
        return Some(ticket);
    }

    match jwt::decode(options, token).map(ticket_from_claims) {
        Ok(ticket) => Some(ticket),
        Err(e) => {
            tracing::warn!("issue receiving identity token: {e}");
            None
        }
    }
}

/// Read a refresh token back into a ticket.
pub(crate) async fn receive_refresh_token(
    provider: &impl Provider, _options: &Options, token: &str,
) -> Option<AuthenticationTicket> {
    let mut ctx = ReceiveTokenContext::new(token);
    provider.receive_refresh_token(&mut ctx).await;
    if let Some(ticket) = ctx.ticket {
        return Some(ticket);
    }

    match opaque::unprotect(provider, token).await {
        Ok(ticket) => Some(ticket),
        Err(e) => {
            tracing::warn!("issue receiving refresh token: {e}");
            None
        }
    }
}

/// Remaining lifetime in whole seconds, rounding half-up.
pub(crate) fn expires_in(from: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    ((until - from).num_milliseconds() + 500) / 1000
}

/// The `c_hash`/`at_hash` derivation: base64url of the left half of the
/// SHA-256 digest.
pub(crate) fn hash_claim(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    Base64UrlUnpadded::encode_string(&digest[..16])
}

// Sign the scoped ticket as a JWT with the given audiences.
fn sign(options: &Options, ticket: &AuthenticationTicket, audiences: Vec<String>) -> Result<String> {
    let payload = jwt_payload(options, ticket, audiences)?;
    let credential =
        options.signing_credential().ok_or_else(|| anyhow!("no signing credential"))?;
    jwt::encode(credential, &payload)
}

// access tokens are bound to the granted resources, falling back to the
// ticket's audiences
fn access_token_audiences(ticket: &AuthenticationTicket) -> Vec<String> {
    ticket.properties.resource().map_or_else(
        || ticket.properties.audiences(),
        |resource| resource.split(' ').map(ToString::to_string).collect(),
    )
}

// Build the JWT payload for a scoped ticket: registered claims, then the
// ticket's claims with duplicate kinds collected into arrays.
fn jwt_payload(
    options: &Options, ticket: &AuthenticationTicket, audiences: Vec<String>,
) -> Result<Map<String, Value>> {
    let mut payload = Map::new();

    payload.insert("iss".to_string(), json!(options.issuer));

    // string for one audience, array for several
    match audiences.len() {
        0 => {}
        1 => {
            payload.insert("aud".to_string(), json!(audiences[0]));
        }
        _ => {
            payload.insert("aud".to_string(), json!(audiences));
        }
    }

    let issued = ticket.properties.issued_at.unwrap_or_else(Utc::now);
    payload.insert("nbf".to_string(), json!(issued.timestamp()));
    payload.insert("iat".to_string(), json!(issued.timestamp()));
    if let Some(expires) = ticket.properties.expires_at {
        payload.insert("exp".to_string(), json!(expires.timestamp()));
    }

    // `sub` is mandatory, synthesized from the name identifier when absent
    let subject = ticket.subject().ok_or_else(|| anyhow!("ticket has no subject claim"))?;
    payload.insert("sub".to_string(), json!(subject));

    for entry in &ticket.claims {
        if matches!(entry.kind.as_str(), "iss" | "aud" | "nbf" | "iat" | "exp")
            || entry.kind == claim::SUBJECT
            // the name identifier was folded into `sub` above
            || entry.kind == claim::NAME_IDENTIFIER
        {
            continue;
        }
        insert_claim(&mut payload, &entry.kind, &entry.value);
    }

    Ok(payload)
}

fn insert_claim(payload: &mut Map<String, Value>, kind: &str, value: &str) {
    match payload.get_mut(kind) {
        None => {
            payload.insert(kind.to_string(), json!(value));
        }
        Some(Value::Array(values)) => values.push(json!(value)),
        Some(existing) => {
            let previous = existing.take();
            *existing = json!([previous, value]);
        }
    }
}

// Reconstruct ticket state from a verified JWT payload: lifetimes from
// nbf/exp, audiences from aud, everything else as claims.
fn ticket_from_claims(claims: Map<String, Value>) -> AuthenticationTicket {
    let mut ticket = AuthenticationTicket::default();

    if let Some(nbf) = claims.get("nbf").and_then(Value::as_i64) {
        ticket.properties.issued_at = DateTime::from_timestamp(nbf, 0);
    }
    if let Some(exp) = claims.get("exp").and_then(Value::as_i64) {
        ticket.properties.expires_at = DateTime::from_timestamp(exp, 0);
    }

    let audiences = match claims.get("aud") {
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(auds)) => {
            auds.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
        }
        _ => vec![],
    };
    if !audiences.is_empty() {
        ticket.properties.set_audiences(&audiences);
    }

    for (kind, value) in claims {
        if matches!(kind.as_str(), "iss" | "aud" | "nbf" | "iat" | "exp") {
            continue;
        }
        match value {
            Value::Array(values) => {
                for element in values {
                    ticket.add_claim(Claim::new(&kind, stringify(&element)));
                }
            }
            other => ticket.add_claim(Claim::new(&kind, stringify(&other))),
        }
    }

    ticket
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
