//! # Authorization Endpoint
//!
//! Validates authorization requests, caches them for the duration of user
//! authentication, and — once the host signs the user in — assembles the
//! authorization response for the requested response mode.
//!
//! The validation order is significant: failures occurring before the
//! client's redirection URI has been validated are never redirected (they
//! surface as a native error page, or to the host application when
//! `application_can_display_errors` is set); failures after are returned
//! to the client as a redirect carrying `error`, `error_description`,
//! `error_uri`, and `state`.

use chrono::Utc;
use http::Method;

use crate::core::{generate, html, urlencode};
use crate::invalid;
use crate::oauth::{self, ResponseMode, response_type, scope};
use crate::oidc::endpoint::{AuthorizationRequest, HttpRequest, HttpResponse, Outcome};
use crate::oidc::error::{Error, Rejection};
use crate::oidc::events::{
    Decision, EndpointContext, Events, ValidateClientRedirectUriContext, ValidateRequestContext,
};
use crate::oidc::options::Options;
use crate::oidc::provider::{Provider, StateStore};
use crate::oidc::state::{self, CachePolicy, Expire, REQUEST_NS};
use crate::oidc::ticket::{AuthenticationTicket, property};
use crate::oidc::token;
use crate::oidc::types::{Message, MessageKind, param};
use crate::oidc::Result;
use crate::server;

/// Parse and validate an authorization request. On success the request is
/// cached and control returns to the host for user authentication.
pub(crate) async fn authorize(
    options: &Options, provider: &impl Provider, request: &HttpRequest,
) -> Result<Outcome> {
    tracing::debug!("authorize");

    // parameters come from the query on GET, the form body on POST
    let params = match request.method {
        Method::GET => request.query_params(),
        Method::POST => {
            if !request.has_form_body() {
                return Ok(fatal(
                    options,
                    invalid!("requests must use application/x-www-form-urlencoded content"),
                ));
            }
            request.form_params()
        }
        _ => return Ok(fatal(options, invalid!("method not supported"))),
    };
    let Ok(params) = params else {
        return Ok(fatal(options, invalid!("request parameters are malformed")));
    };
    let mut message = Message::from_params(MessageKind::AuthenticationRequest, params);

    // a unique_id rehydrates the cached in-flight request; parameters from
    // this request win on conflict
    if let Some(unique_id) = message.unique_id().map(ToString::to_string) {
        let key = format!("{REQUEST_NS}{unique_id}");
        match StateStore::get(provider, &key).await.map_err(|e| server!("{e}"))? {
            Some(frame) => {
                let cached = match state::decode_message(MessageKind::AuthenticationRequest, &frame)
                {
                    Ok(cached) => cached,
                    Err(e) => {
                        tracing::warn!("issue decoding cached request: {e}");
                        return Ok(fatal(options, server!("an internal error occurred")));
                    }
                };
                message.merge_cached(&cached);
            }
            None => return Ok(fatal(options, invalid!("timeout expired"))),
        }
    }

    let Some(client_id) = message.client_id().map(ToString::to_string) else {
        return Ok(fatal(options, invalid!("client_id parameter missing")));
    };

    // redirect_uri is mandatory for OpenID Connect requests and, when
    // present, must be an absolute URI with no fragment
    if let Some(redirect_uri) = message.redirect_uri() {
        if redirect_uri.contains('#') {
            return Ok(fatal(options, invalid!("redirect_uri cannot contain a fragment")));
        }
        if !redirect_uri.contains("://") {
            return Ok(fatal(options, invalid!("redirect_uri must be an absolute URI")));
        }
        if redirect_uri.starts_with("http://") && !options.allow_insecure_http {
            return Ok(fatal(options, invalid!("redirect_uri must use TLS")));
        }
    } else if message.has_scope(scope::OPENID) {
        return Ok(fatal(options, invalid!("redirect_uri parameter missing")));
    }

    // the provider must explicitly validate the client and its
    // redirection URI
    let mut redirect_ctx = ValidateClientRedirectUriContext::new(
        &client_id,
        message.redirect_uri().map(ToString::to_string),
    );
    provider.validate_client_redirect_uri(&mut redirect_ctx).await;
    match redirect_ctx.decision {
        Decision::Rejected(rejection) => return Ok(fatal(options, rejection.error)),
        Decision::Skipped => {
            return Ok(fatal(options, Error::InvalidClient("client application is not known".to_string())));
        }
        Decision::Validated => {}
    }
    if let Some(redirect_uri) = &redirect_ctx.redirect_uri {
        message.set(param::REDIRECT_URI, redirect_uri.clone());
    }

    // from here on errors are redirected back to the client
    let Some(response_type) = message.response_type().map(ToString::to_string) else {
        return Ok(error_redirect(options, &message, invalid!("response_type parameter missing"), None));
    };

    if response_type.split(' ').any(|t| {
        !matches!(t, response_type::CODE | response_type::TOKEN | response_type::ID_TOKEN)
    }) {
        return Ok(error_redirect(
            options,
            &message,
            Error::UnsupportedResponseType("response_type is not supported".to_string()),
            None,
        ));
    }

    let response_mode = match message.response_mode() {
        None => None,
        Some(mode) => match ResponseMode::from_wire(mode) {
            Some(mode) => Some(mode),
            None => {
                return Ok(error_redirect(
                    options,
                    &message,
                    invalid!("response_mode is not supported"),
                    None,
                ));
            }
        },
    };

    // tokens must never transit the query string
    if response_mode == Some(ResponseMode::Query)
        && (oauth::contains_token(&response_type, response_type::TOKEN)
            || oauth::contains_token(&response_type, response_type::ID_TOKEN))
    {
        return Ok(error_redirect(
            options,
            &message,
            invalid!("response_type/response_mode combination is not allowed"),
            None,
        ));
    }

    let implicit_or_hybrid = oauth::contains_token(&response_type, response_type::TOKEN)
        || oauth::contains_token(&response_type, response_type::ID_TOKEN);
    if implicit_or_hybrid && message.has_scope(scope::OPENID) && message.nonce().is_none() {
        return Ok(error_redirect(options, &message, invalid!("nonce parameter missing"), None));
    }

    if oauth::contains_token(&response_type, response_type::ID_TOKEN)
        && !message.has_scope(scope::OPENID)
    {
        return Ok(error_redirect(options, &message, invalid!("openid scope missing"), None));
    }

    if oauth::contains_token(&response_type, response_type::CODE)
        && options.token_endpoint_path.is_empty()
    {
        return Ok(error_redirect(
            options,
            &message,
            Error::UnsupportedResponseType("authorization code flow is disabled".to_string()),
            None,
        ));
    }

    if oauth::contains_token(&response_type, response_type::ID_TOKEN)
        && options.signing_credential().is_none()
    {
        return Ok(error_redirect(
            options,
            &message,
            Error::UnsupportedResponseType("identity tokens cannot be issued".to_string()),
            None,
        ));
    }

    let mut validate_ctx = ValidateRequestContext::new(message.clone(), None);
    provider.validate_authorization_request(&mut validate_ctx).await;
    if let Decision::Rejected(Rejection { error, error_uri }) = validate_ctx.decision {
        return Ok(error_redirect(options, &message, error, error_uri));
    }

    // cache the validated request for the duration of user authentication
    if message.unique_id().is_none() {
        message.set(param::UNIQUE_ID, generate::request_id());
    }
    let unique_id = message.unique_id().unwrap_or_default().to_string();
    StateStore::put(
        provider,
        &format!("{REQUEST_NS}{unique_id}"),
        state::encode_message(&message),
        CachePolicy::Sliding(Expire::Request.duration()),
    )
    .await
    .map_err(|e| server!("issue saving request: {e}"))?;

    let mut endpoint_ctx = EndpointContext::new(Some(message.clone()));
    provider.authorization_endpoint(&mut endpoint_ctx).await;
    if let Some(response) = endpoint_ctx.response {
        return Ok(Outcome::Response(response));
    }

    // yield to the host application to authenticate the user
    Ok(Outcome::Authenticate(AuthorizationRequest { message }))
}

/// Assemble the authorization response once the host has signed the user
/// in: mint the artifacts the `response_type` requested — authorization
/// code, access token, then identity token, so the identity token can hash
/// its siblings — and return them per the response mode.
pub(crate) async fn sign_in(
    options: &Options, provider: &impl Provider, request: &AuthorizationRequest,
    ticket: AuthenticationTicket,
) -> Result<HttpResponse> {
    tracing::debug!("authorize::sign_in");

    let message = &request.message;
    let Some(redirect_uri) = message.redirect_uri().map(ToString::to_string) else {
        return Ok(HttpResponse::error_page(&server!("no validated redirect_uri is available")));
    };
    let response_type = message.response_type().unwrap_or_default().to_string();

    // bind the flow's parameters onto a defensive copy of the ticket
    let mut base = ticket;
    base.properties.set_client_id(message.client_id().unwrap_or_default());
    base.properties.set(property::REDIRECT_URI, redirect_uri.clone());
    if base.properties.scope().is_none() {
        if let Some(requested) = message.scope() {
            base.properties.set(property::SCOPE, requested);
        }
    }
    if base.properties.resource().is_none() {
        if let Some(requested) = message.resource() {
            base.properties.set(property::RESOURCE, requested);
        }
    }
    if let Some(nonce) = message.nonce() {
        base.properties.set(property::NONCE, nonce);
    }
    if base.properties.audiences().is_empty() {
        if let Some(client_id) = message.client_id() {
            base.properties.set_audiences(&[client_id.to_string()]);
        }
    }

    let now = Utc::now();
    let mut params: Vec<(String, String)> = vec![];

    // authorization code first: issued/expires are reset on a copy so the
    // code's lifetime is independent of the tokens'
    let mut code = None;
    if oauth::contains_token(&response_type, response_type::CODE) {
        let mut copy = base.clone();
        copy.properties.issued_at = Some(now);
        copy.properties.expires_at = Some(now + options.authorization_code_lifetime);

        let Some(value) = token::create_authorization_code(provider, options, &copy).await else {
            return Ok(HttpResponse::error_page(&server!(
                "an internal error occurred while creating the authorization code"
            )));
        };
        params.push((param::CODE.to_string(), value.clone()));
        code = Some(value);
    }

    let mut access_token = None;
    if oauth::contains_token(&response_type, response_type::TOKEN) {
        let mut copy = base.clone();
        copy.properties.issued_at = Some(now);
        copy.properties.expires_at = Some(now + options.access_token_lifetime);

        let Some(value) = token::create_access_token(provider, options, &copy).await else {
            return Ok(HttpResponse::error_page(&server!(
                "an internal error occurred while creating the access token"
            )));
        };
        params.push((param::ACCESS_TOKEN.to_string(), value.clone()));
        params.push((param::TOKEN_TYPE.to_string(), oauth::BEARER.to_string()));
        params.push((
            param::EXPIRES_IN.to_string(),
            token::expires_in(now, copy.properties.expires_at.unwrap_or(now)).to_string(),
        ));
        access_token = Some(value);
    }

    // identity token last so c_hash/at_hash can reference its siblings
    if oauth::contains_token(&response_type, response_type::ID_TOKEN) {
        let mut copy = base.clone();
        copy.properties.issued_at = Some(now);
        copy.properties.expires_at = Some(now + options.identity_token_lifetime);

        let Some(value) = token::create_identity_token(
            provider,
            options,
            &copy,
            code.as_deref(),
            access_token.as_deref(),
        )
        .await
        else {
            return Ok(HttpResponse::error_page(&server!(
                "an internal error occurred while creating the identity token"
            )));
        };
        params.push((param::ID_TOKEN.to_string(), value));
    }

    if let Some(state) = message.state() {
        params.push((param::STATE.to_string(), state.to_string()));
    }

    // the flow is complete: drop the cached request
    if let Some(unique_id) = message.unique_id() {
        StateStore::take(provider, &format!("{REQUEST_NS}{unique_id}"))
            .await
            .map_err(|e| server!("issue removing cached request: {e}"))?;
    }

    Ok(respond(&redirect_uri, resolved_mode(message), &params))
}

// errors occurring before redirect_uri validation are never redirected
fn fatal(options: &Options, error: Error) -> Outcome {
    if options.application_can_display_errors {
        Outcome::Error(error)
    } else {
        Outcome::Response(HttpResponse::error_page(&error))
    }
}

// errors occurring after redirect_uri validation are returned to the
// client via the requested response mode
fn error_redirect(
    options: &Options, message: &Message, error: Error, error_uri: Option<String>,
) -> Outcome {
    let Some(redirect_uri) = message.redirect_uri() else {
        return fatal(options, error);
    };

    let mut params = vec![
        (param::ERROR.to_string(), error.code().to_string()),
        (param::ERROR_DESCRIPTION.to_string(), error.description().to_string()),
    ];
    if let Some(error_uri) = error_uri {
        params.push((param::ERROR_URI.to_string(), error_uri));
    }
    if let Some(state) = message.state() {
        params.push((param::STATE.to_string(), state.to_string()));
    }

    Outcome::Response(respond(redirect_uri, resolved_mode(message), &params))
}

// an explicit response_mode wins; otherwise flows carrying tokens use the
// fragment and pure code flows use the query
fn resolved_mode(message: &Message) -> ResponseMode {
    if let Some(mode) = message.response_mode().and_then(ResponseMode::from_wire) {
        return mode;
    }
    let response_type = message.response_type().unwrap_or_default();
    if oauth::contains_token(response_type, response_type::TOKEN)
        || oauth::contains_token(response_type, response_type::ID_TOKEN)
    {
        ResponseMode::Fragment
    } else {
        ResponseMode::Query
    }
}

// materialize the response parameters per the response mode; the
// redirection URI itself is never included as a parameter
fn respond(redirect_uri: &str, mode: ResponseMode, params: &[(String, String)]) -> HttpResponse {
    match mode {
        ResponseMode::Query => {
            let separator = if redirect_uri.contains('?') { '&' } else { '?' };
            HttpResponse::redirect(&format!(
                "{redirect_uri}{separator}{}",
                urlencode::to_query(params)
            ))
        }
        ResponseMode::Fragment => {
            HttpResponse::redirect(&format!("{redirect_uri}#{}", urlencode::to_query(params)))
        }
        ResponseMode::FormPost => HttpResponse::html(form_post_body(redirect_uri, params)),
    }
}

// every interpolated value is HTML entity encoded
fn form_post_body(action: &str, params: &[(String, String)]) -> String {
    let mut fields = String::new();
    for (name, value) in params {
        fields.push_str(&format!(
            r#"<input type="hidden" name="{}" value="{}" />"#,
            html::escape(name),
            html::escape(value)
        ));
    }

    format!(
        concat!(
            "<!doctype html>\n",
            "<html><head><title>Working...</title></head>",
            "<body onload=\"document.forms[0].submit()\">",
            r#"<form method="post" action="{action}">{fields}"#,
            "<noscript><input type=\"submit\" value=\"Continue\" /></noscript>",
            "</form></body></html>"
        ),
        action = html::escape(action),
        fields = fields,
    )
}
