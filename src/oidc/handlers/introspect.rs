//! # Introspection Endpoint
//!
//! Reads a previously issued token back into its ticket and reports the
//! ticket's audiences, expiry, and claims. The request must carry exactly
//! one of `access_token`, `id_token`, or `refresh_token`.

use chrono::Utc;
use http::{Method, StatusCode};
use serde_json::json;

use crate::invalid;
use crate::oauth;
use crate::oidc::endpoint::{HttpRequest, HttpResponse};
use crate::oidc::error::Error;
use crate::oidc::events::{EndpointContext, Events};
use crate::oidc::options::Options;
use crate::oidc::provider::Provider;
use crate::oidc::token as tokens;
use crate::oidc::types::{ClaimEntry, IntrospectionResponse, Message, MessageKind};
use crate::oidc::Result;
use crate::server;

/// Introspection (token validation) endpoint handler.
pub(crate) async fn introspect(
    options: &Options, provider: &impl Provider, request: &HttpRequest,
) -> Result<HttpResponse> {
    tracing::debug!("introspect");

    let params = match request.method {
        Method::GET => request.query_params(),
        Method::POST => {
            if !request.has_form_body() {
                return Ok(error_json(&invalid!(
                    "requests must use application/x-www-form-urlencoded content"
                )));
            }
            request.form_params()
        }
        _ => return Ok(error_json(&invalid!("method not supported"))),
    };
    let Ok(params) = params else {
        return Ok(error_json(&invalid!("request parameters are malformed")));
    };
    let message = Message::from_params(MessageKind::TokenRequest, params);

    // exactly one token kind may be introspected per request
    let supplied = [message.access_token(), message.id_token(), message.refresh_token()]
        .iter()
        .flatten()
        .count();
    if supplied != 1 {
        return Ok(error_json(&invalid!(
            "exactly one of access_token, id_token or refresh_token must be provided"
        )));
    }

    let ticket = if let Some(token) = message.access_token() {
        tokens::receive_access_token(provider, options, token).await
    } else if let Some(token) = message.id_token() {
        tokens::receive_identity_token(provider, options, token).await
    } else if let Some(token) = message.refresh_token() {
        tokens::receive_refresh_token(provider, options, token).await
    } else {
        None
    };
    let Some(ticket) = ticket else {
        return Ok(error_json(&Error::InvalidGrant("the token is not valid".to_string())));
    };

    if ticket.is_expired(Utc::now()) {
        return Ok(error_json(&Error::InvalidGrant("the token has expired".to_string())));
    }

    // a caller restricting itself to an audience must hold one the token
    // was issued for
    let audiences = ticket.properties.audiences();
    if !audiences.is_empty() {
        if let Some(requested) = message.audience() {
            let granted = audiences.join(" ");
            if !oauth::is_subset(requested, &granted) {
                return Ok(error_json(&Error::InvalidGrant(
                    "the token was not issued for this audience".to_string(),
                )));
            }
        }
    }

    let mut endpoint_ctx = EndpointContext::new(Some(message.clone()));
    provider.introspection_endpoint(&mut endpoint_ctx).await;
    if let Some(handled) = endpoint_ctx.response {
        return Ok(handled);
    }

    let response = IntrospectionResponse {
        audiences,
        // the expiry instant itself, as UTC epoch seconds
        expires_in: ticket.properties.expires_at.map(|at| at.timestamp()),
        claims: ticket
            .claims
            .iter()
            .map(|c| ClaimEntry {
                kind: c.kind.clone(),
                value: c.value.clone(),
            })
            .collect(),
    };

    let body = serde_json::to_value(&response)
        .map_err(|e| server!("issue serializing introspection response: {e}"))?;
    Ok(HttpResponse::json(StatusCode::OK, &body).no_cache())
}

fn error_json(error: &Error) -> HttpResponse {
    HttpResponse::json(StatusCode::BAD_REQUEST, &json!(error)).no_cache()
}
