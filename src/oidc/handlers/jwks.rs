//! # Cryptography Endpoint
//!
//! Publishes the JSON Web Key Set: one key per configured signing
//! credential. Keys that cannot serve RS256 are skipped with a warning.

use http::StatusCode;
use jsonwebtoken::Algorithm;

use crate::oidc::endpoint::HttpResponse;
use crate::oidc::events::{EndpointContext, Events};
use crate::oidc::options::Options;
use crate::oidc::provider::Provider;
use crate::oidc::types::{Jwk, Jwks};

/// Cryptography (JWKS) endpoint handler.
pub(crate) async fn jwks(options: &Options, provider: &impl Provider) -> HttpResponse {
    tracing::debug!("jwks");

    let mut endpoint_ctx = EndpointContext::new(None);
    provider.cryptography_endpoint(&mut endpoint_ctx).await;
    if let Some(handled) = endpoint_ctx.response {
        return handled;
    }

    let mut keys = vec![];
    for credential in &options.signing_credentials {
        if credential.algorithm() != Algorithm::RS256 {
            tracing::warn!(
                "skipping signing credential {}: RS256 is not supported",
                credential.key_id()
            );
            continue;
        }

        let mut key = Jwk {
            kty: "RSA".to_string(),
            use_: "sig".to_string(),
            kid: credential.key_id().to_string(),
            alg: "RS256".to_string(),
            ..Jwk::default()
        };

        // certificate-backed keys publish the certificate, bare keys the
        // modulus and exponent
        if credential.certificate().is_some() {
            key.x5t = credential.thumbprint();
            key.x5c = credential.certificate_chain();
        } else {
            key.n = Some(credential.modulus().to_string());
            key.e = Some(credential.exponent().to_string());
        }

        keys.push(key);
    }

    let body = serde_json::to_value(&Jwks { keys }).unwrap_or_default();
    HttpResponse::json(StatusCode::OK, &body)
}
