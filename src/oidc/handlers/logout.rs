//! # Logout Endpoint
//!
//! Validates end-session requests. When a `post_logout_redirect_uri` is
//! supplied the provider must explicitly validate it; after the host signs
//! the user out, [`sign_out`] redirects there with the request's remaining
//! parameters carried as query parameters.

use http::{Method, StatusCode};

use crate::core::urlencode;
use crate::invalid;
use crate::oidc::endpoint::{HttpRequest, HttpResponse, LogoutRequest, Outcome};
use crate::oidc::events::{
    Decision, EndpointContext, Events, ValidateClientLogoutRedirectUriContext,
};
use crate::oidc::provider::Provider;
use crate::oidc::types::{Message, MessageKind, param};
use crate::oidc::Result;

/// Logout (end-session) endpoint handler.
pub(crate) async fn logout(
    provider: &impl Provider, request: &HttpRequest,
) -> Result<Outcome> {
    tracing::debug!("logout");

    let params = match request.method {
        Method::GET => request.query_params(),
        Method::POST => {
            if !request.has_form_body() {
                return Ok(Outcome::Response(HttpResponse::error_page(&invalid!(
                    "requests must use application/x-www-form-urlencoded content"
                ))));
            }
            request.form_params()
        }
        _ => {
            return Ok(Outcome::Response(HttpResponse::error_page(&invalid!(
                "method not supported"
            ))));
        }
    };
    let Ok(params) = params else {
        return Ok(Outcome::Response(HttpResponse::error_page(&invalid!(
            "request parameters are malformed"
        ))));
    };
    let message = Message::from_params(MessageKind::LogoutRequest, params);

    let mut post_logout_redirect_uri = None;
    if let Some(uri) = message.post_logout_redirect_uri() {
        let mut ctx = ValidateClientLogoutRedirectUriContext::new(uri);
        provider.validate_client_logout_redirect_uri(&mut ctx).await;
        match ctx.decision {
            Decision::Validated => {
                post_logout_redirect_uri = Some(ctx.post_logout_redirect_uri);
            }
            Decision::Rejected(rejection) => {
                return Ok(Outcome::Response(HttpResponse::error_page(&rejection.error)));
            }
            Decision::Skipped => {
                return Ok(Outcome::Response(HttpResponse::error_page(&invalid!(
                    "post_logout_redirect_uri is not valid for this client"
                ))));
            }
        }
    }

    let mut endpoint_ctx = EndpointContext::new(Some(message.clone()));
    provider.logout_endpoint(&mut endpoint_ctx).await;
    if let Some(handled) = endpoint_ctx.response {
        return Ok(Outcome::Response(handled));
    }

    // yield to the host application to sign the user out
    Ok(Outcome::Logout(LogoutRequest {
        message,
        post_logout_redirect_uri,
    }))
}

/// Assemble the logout response once the host has signed the user out.
pub(crate) fn sign_out(request: &LogoutRequest) -> Result<HttpResponse> {
    tracing::debug!("logout::sign_out");

    let Some(redirect_uri) = &request.post_logout_redirect_uri else {
        return Ok(HttpResponse {
            status: StatusCode::OK,
            headers: http::HeaderMap::new(),
            body: vec![],
        });
    };

    // carry the remaining request parameters onto the redirect
    let params: Vec<(String, String)> = request
        .message
        .params()
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(param::POST_LOGOUT_REDIRECT_URI))
        .cloned()
        .collect();

    if params.is_empty() {
        return Ok(HttpResponse::redirect(redirect_uri));
    }
    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    Ok(HttpResponse::redirect(&format!(
        "{redirect_uri}{separator}{}",
        urlencode::to_query(&params)
    )))
}
