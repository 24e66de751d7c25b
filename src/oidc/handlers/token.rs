//! # Token Endpoint
//!
//! Authenticates the client, dispatches per grant type, mints the
//! requested tokens, and returns the JSON payload. The
//! authorization-code and refresh-token grants share a prelude that
//! materializes the incoming ticket and enforces its bindings (client,
//! redirection URI, resource, and scope) before the grant hooks run.

use chrono::{DateTime, Utc};
use http::{Method, StatusCode};
use serde_json::json;

use crate::invalid;
use crate::oauth::{self, response_type, scope};
use crate::oidc::endpoint::{HttpRequest, HttpResponse};
use crate::oidc::error::{Error, Rejection};
use crate::oidc::events::{
    Decision, EndpointContext, Events, GrantContext, ValidateClientAuthenticationContext,
    ValidateRequestContext,
};
use crate::oidc::options::Options;
use crate::oidc::provider::Provider;
use crate::oidc::ticket::{AuthenticationTicket, property};
use crate::oidc::token as tokens;
use crate::oidc::types::{Message, MessageKind, TokenResponse, param};
use crate::oidc::Result;
use crate::server;

/// The materialized grant a token request resolves to.
struct Granted {
    ticket: AuthenticationTicket,
    /// The scope captured when the grant was originally authorized.
    scope: Option<String>,
    /// Expiry of the incoming refresh token, used to clamp minted tokens
    /// when sliding expiration is disabled.
    incoming_expiry: Option<DateTime<Utc>>,
}

/// Token endpoint handler.
pub(crate) async fn token(
    options: &Options, provider: &impl Provider, request: &HttpRequest,
) -> Result<HttpResponse> {
    tracing::debug!("token");

    if request.method != Method::POST {
        return Ok(error_json(&invalid!("method not supported"), None));
    }
    if !request.has_form_body() {
        return Ok(error_json(
            &invalid!("requests must use application/x-www-form-urlencoded content"),
            None,
        ));
    }
    let Ok(params) = request.form_params() else {
        return Ok(error_json(&invalid!("request parameters are malformed"), None));
    };
    let mut message = Message::from_params(MessageKind::TokenRequest, params);

    let Some(grant_type) = message.grant_type().map(ToString::to_string) else {
        return Ok(error_json(&invalid!("grant_type parameter missing"), None));
    };

    // client credentials come from the form body or, failing that, from a
    // Basic Authorization header
    let mut client_id = message.client_id().map(ToString::to_string);
    let mut client_secret = message.client_secret().map(ToString::to_string);
    match request.basic_credentials() {
        Some(Ok((basic_id, basic_secret))) => {
            if client_id.is_some() || client_secret.is_some() {
                return Ok(error_json(
                    &invalid!("only one client authentication method may be used"),
                    None,
                ));
            }
            message.set(param::CLIENT_ID, basic_id.clone());
            client_id = Some(basic_id);
            client_secret = Some(basic_secret);
        }
        Some(Err(e)) => {
            tracing::debug!("malformed Basic credentials: {e}");
            return Ok(error_json(&invalid!("malformed Authorization header"), None));
        }
        None => {}
    }

    let mut auth_ctx =
        ValidateClientAuthenticationContext::new(client_id.clone(), client_secret);
    provider.validate_client_authentication(&mut auth_ctx).await;
    let client_authenticated = match auth_ctx.decision {
        Decision::Rejected(rejection) => {
            return Ok(error_json(&rejection.error, rejection.error_uri));
        }
        Decision::Validated => true,
        Decision::Skipped => false,
    };

    let granted = match grant_type.as_str() {
        "authorization_code" | "refresh_token" => {
            exchange_ticket(options, provider, &message, &grant_type, client_authenticated).await
        }
        "password" => password_grant(provider, &message).await,
        "client_credentials" => {
            client_credentials_grant(provider, &message, client_authenticated).await
        }
        _ => extension_grant(provider, &message, &grant_type).await,
    };
    let granted = match granted {
        Ok(granted) => granted,
        Err(rejection) => return Ok(error_json(&rejection.error, rejection.error_uri)),
    };

    // bind the outcome of client authentication onto the minting ticket
    let mut ticket = granted.ticket;
    if let Some(client_id) = &client_id {
        ticket.properties.set_client_id(client_id);
    }
    ticket.properties.set_client_authenticated(client_authenticated);
    if ticket.properties.audiences().is_empty() {
        if let Some(client_id) = &client_id {
            ticket.properties.set_audiences(&[client_id.clone()]);
        }
    }

    let now = Utc::now();
    let wants = |token: &str| {
        message.response_type().is_none_or(|set| oauth::contains_token(set, token))
    };
    let clamp = |expires_at: DateTime<Utc>| match granted.incoming_expiry {
        Some(incoming) if !options.use_sliding_expiration => expires_at.min(incoming),
        _ => expires_at,
    };
    let has_scope = |token: &str| {
        granted.scope.as_deref().is_some_and(|set| oauth::contains_token(set, token))
    };

    let mut response = TokenResponse::default();

    if wants(response_type::TOKEN) {
        let mut copy = ticket.clone();
        copy.properties.issued_at = Some(now);
        copy.properties.expires_at = Some(clamp(now + options.access_token_lifetime));

        let Some(access_token) = tokens::create_access_token(provider, options, &copy).await
        else {
            return Ok(error_json(
                &server!("an internal error occurred while creating the access token"),
                None,
            ));
        };
        response.expires_in =
            Some(tokens::expires_in(now, copy.properties.expires_at.unwrap_or(now)));
        response.token_type = Some(oauth::BEARER.to_string());
        response.access_token = Some(access_token);
    }

    if wants(response_type::ID_TOKEN) && has_scope(scope::OPENID) {
        let mut copy = ticket.clone();
        copy.properties.issued_at = Some(now);
        copy.properties.expires_at = Some(clamp(now + options.identity_token_lifetime));

        let Some(id_token) = tokens::create_identity_token(
            provider,
            options,
            &copy,
            None,
            response.access_token.as_deref(),
        )
        .await
        else {
            return Ok(error_json(
                &server!("an internal error occurred while creating the identity token"),
                None,
            ));
        };
        response.id_token = Some(id_token);
    }

    if wants(response_type::REFRESH_TOKEN) && has_scope(scope::OFFLINE_ACCESS) {
        let mut copy = ticket.clone();
        copy.properties.issued_at = Some(now);
        copy.properties.expires_at = Some(clamp(now + options.refresh_token_lifetime));

        let Some(refresh_token) = tokens::create_refresh_token(provider, options, &copy).await
        else {
            return Ok(error_json(
                &server!("an internal error occurred while creating the refresh token"),
                None,
            ));
        };
        response.refresh_token = Some(refresh_token);
    }

    // echo the granted scope when it differs from the request
    if granted.scope.as_deref() != message.scope() {
        response.scope = granted.scope;
    }

    let mut endpoint_ctx = EndpointContext::new(Some(message.clone()));
    provider.token_endpoint(&mut endpoint_ctx).await;
    if let Some(handled) = endpoint_ctx.response {
        return Ok(handled);
    }

    let body = serde_json::to_value(&response)
        .map_err(|e| server!("issue serializing token response: {e}"))?;
    Ok(HttpResponse::json(StatusCode::OK, &body).no_cache())
}

// the shared prelude for the authorization_code and refresh_token grants
async fn exchange_ticket(
    options: &Options, provider: &impl Provider, message: &Message, grant_type: &str,
    client_authenticated: bool,
) -> Result<Granted, Rejection> {
    let is_code = grant_type == "authorization_code";

    let ticket = if is_code {
        let Some(code) = message.code() else {
            return Err(invalid!("code parameter missing").into());
        };
        tokens::receive_authorization_code(provider, options, code).await
    } else {
        let Some(refresh_token) = message.refresh_token() else {
            return Err(invalid!("refresh_token parameter missing").into());
        };
        tokens::receive_refresh_token(provider, options, refresh_token).await
    };
    let Some(mut ticket) = ticket else {
        return Err(Error::InvalidGrant("the grant is no longer valid".to_string()).into());
    };

    if ticket.is_expired(Utc::now()) {
        return Err(Error::InvalidGrant("the grant has expired".to_string()).into());
    }

    // the code is bound to the redirection URI used at authorization time
    if is_code {
        if let Some(bound) = ticket.properties.redirect_uri().map(ToString::to_string) {
            if message.redirect_uri() != Some(bound.as_str()) {
                return Err(
                    Error::InvalidGrant("redirect_uri does not match".to_string()).into()
                );
            }
            ticket.properties.remove(property::REDIRECT_URI);
        }
    }

    // a refresh token issued to an authenticated client can only be
    // redeemed by an authenticated client
    if !is_code && ticket.properties.client_authenticated() && !client_authenticated {
        return Err(Error::InvalidGrant("client authentication required".to_string()).into());
    }

    if let Some(bound) = ticket.properties.client_id() {
        if message.client_id() != Some(bound) {
            return Err(
                Error::InvalidGrant("the grant was issued to another client".to_string()).into()
            );
        }
    }

    // a narrower resource/scope may be requested, never a wider one
    for (requested, granted_set, name) in [
        (message.resource(), ticket.properties.resource(), "resource"),
        (message.scope(), ticket.properties.scope(), "scope"),
    ] {
        if let Some(requested) = requested {
            let Some(granted_set) = granted_set else {
                return Err(invalid!("{name} parameter is not valid for this grant").into());
            };
            if !oauth::is_subset(requested, granted_set) {
                return Err(invalid!("{name} parameter exceeds the original grant").into());
            }
        }
    }

    let original_scope = ticket.properties.scope().map(ToString::to_string);
    let incoming_expiry = (!is_code).then_some(ticket.properties.expires_at).flatten();

    let mut validate_ctx = ValidateRequestContext::new(message.clone(), Some(ticket.clone()));
    provider.validate_token_request(&mut validate_ctx).await;
    if let Decision::Rejected(rejection) = validate_ctx.decision {
        return Err(rejection);
    }

    // the grant hook arrives pre-validated and may replace the ticket
    let mut grant_ctx = GrantContext::new(grant_type, message.clone(), Some(ticket));
    if is_code {
        provider.grant_authorization_code(&mut grant_ctx).await;
    } else {
        provider.grant_refresh_token(&mut grant_ctx).await;
    }
    let ticket = resolve_grant(grant_ctx, Error::InvalidGrant("the grant was refused".to_string()))?;

    Ok(Granted {
        ticket,
        scope: original_scope,
        incoming_expiry,
    })
}

async fn password_grant(
    provider: &impl Provider, message: &Message,
) -> Result<Granted, Rejection> {
    if message.username().is_none() {
        return Err(invalid!("username parameter missing").into());
    }
    if message.password().is_none() {
        return Err(invalid!("password parameter missing").into());
    }

    let mut validate_ctx = ValidateRequestContext::new(message.clone(), None);
    provider.validate_token_request(&mut validate_ctx).await;
    if let Decision::Rejected(rejection) = validate_ctx.decision {
        return Err(rejection);
    }

    let mut grant_ctx = GrantContext::new("password", message.clone(), None);
    provider.grant_resource_owner_credentials(&mut grant_ctx).await;
    let ticket = resolve_grant(
        grant_ctx,
        Error::InvalidGrant("resource owner credentials were refused".to_string()),
    )?;

    let scope = ticket.properties.scope().map(ToString::to_string);
    Ok(Granted {
        ticket,
        scope,
        incoming_expiry: None,
    })
}

async fn client_credentials_grant(
    provider: &impl Provider, message: &Message, client_authenticated: bool,
) -> Result<Granted, Rejection> {
    // this grant is unusable without an authenticated client
    if !client_authenticated {
        return Err(Error::InvalidClient("client authentication required".to_string()).into());
    }

    let mut validate_ctx = ValidateRequestContext::new(message.clone(), None);
    provider.validate_token_request(&mut validate_ctx).await;
    if let Decision::Rejected(rejection) = validate_ctx.decision {
        return Err(rejection);
    }

    let mut grant_ctx = GrantContext::new("client_credentials", message.clone(), None);
    provider.grant_client_credentials(&mut grant_ctx).await;
    let ticket = resolve_grant(
        grant_ctx,
        Error::UnauthorizedClient("client credentials grant refused".to_string()),
    )?;

    let scope = ticket.properties.scope().map(ToString::to_string);
    Ok(Granted {
        ticket,
        scope,
        incoming_expiry: None,
    })
}

async fn extension_grant(
    provider: &impl Provider, message: &Message, grant_type: &str,
) -> Result<Granted, Rejection> {
    let mut validate_ctx = ValidateRequestContext::new(message.clone(), None);
    provider.validate_token_request(&mut validate_ctx).await;
    if let Decision::Rejected(rejection) = validate_ctx.decision {
        return Err(rejection);
    }

    let mut grant_ctx = GrantContext::new(grant_type, message.clone(), None);
    provider.grant_custom_extension(&mut grant_ctx).await;
    let ticket = resolve_grant(
        grant_ctx,
        Error::UnsupportedGrantType(format!("unsupported grant type: {grant_type}")),
    )?;

    let scope = ticket.properties.scope().map(ToString::to_string);
    Ok(Granted {
        ticket,
        scope,
        incoming_expiry: None,
    })
}

// a grant stands only when the hook left the context validated with a
// ticket attached
fn resolve_grant(
    ctx: GrantContext, default_error: Error,
) -> Result<AuthenticationTicket, Rejection> {
    match ctx.decision {
        Decision::Rejected(rejection) => Err(rejection),
        Decision::Validated => ctx
            .ticket
            .ok_or_else(|| server!("the grant was validated without a ticket").into()),
        Decision::Skipped => Err(default_error.into()),
    }
}

// token endpoint errors are JSON with the same no-cache headers as
// success responses
fn error_json(error: &Error, error_uri: Option<String>) -> HttpResponse {
    let mut body = error.to_json();
    if let Some(error_uri) = error_uri {
        body["error_uri"] = json!(error_uri);
    }
    HttpResponse::json(StatusCode::BAD_REQUEST, &body).no_cache()
}
