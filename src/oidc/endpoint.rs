//! # Endpoint
//!
//! The entry point for protocol requests. [`Endpoint::handle`] classifies
//! an inbound HTTP request against the six configured endpoint paths,
//! gives the provider a chance to reclassify or handle it, enforces TLS,
//! and routes to the matched handler.
//!
//! Two flows round-trip through the host: the authorization endpoint
//! yields [`Outcome::Authenticate`] so the host can sign the user in
//! (completed by [`Endpoint::sign_in`]), and the logout endpoint yields
//! [`Outcome::Logout`] (completed by [`Endpoint::sign_out`]).

use anyhow::Result as AnyResult;
use http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LOCATION, PRAGMA};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::oidc::error::Error;
use crate::oidc::events::{Events, MatchDisposition, MatchEndpointContext};
use crate::oidc::handlers;
use crate::oidc::options::Options;
use crate::oidc::provider::Provider;
use crate::oidc::ticket::AuthenticationTicket;
use crate::oidc::types::Message;
use crate::oidc::Result;
use crate::{core::urlencode, server};

/// The six endpoints a request can be classified as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointKind {
    /// The authorization endpoint.
    Authorization,
    /// The token endpoint.
    Token,
    /// The token introspection endpoint.
    Introspection,
    /// The logout (end-session) endpoint.
    Logout,
    /// The configuration (discovery) endpoint.
    Configuration,
    /// The cryptography (JWKS) endpoint.
    Jwks,
}

/// A framework-neutral inbound HTTP request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The request method.
    pub method: Method,

    /// The request path, excluding query.
    pub path: String,

    /// The raw query string, without the leading `?`.
    pub query: Option<String>,

    /// The request headers.
    pub headers: HeaderMap,

    /// The request body.
    pub body: Vec<u8>,

    /// Whether the request arrived over TLS.
    pub secure: bool,
}

impl HttpRequest {
    /// A GET request for the given path and query.
    #[must_use]
    pub fn get(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query,
            headers: HeaderMap::new(),
            body: vec![],
            secure: true,
        }
    }

    /// A POST request carrying a form-encoded body.
    #[must_use]
    pub fn form_post(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        Self {
            method: Method::POST,
            path: path.into(),
            query: None,
            headers,
            body: body.into(),
            secure: true,
        }
    }

    /// The `Content-Type` header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// True when the body is form-encoded. A prefix match, so parameters
    /// such as `charset=utf-8` are accepted.
    #[must_use]
    pub fn has_form_body(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    /// The body parsed as form parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid UTF-8 or carries
    /// malformed percent-encoding.
    pub fn form_params(&self) -> AnyResult<Vec<(String, String)>> {
        let body = std::str::from_utf8(&self.body)?;
        urlencode::from_form(body)
    }

    /// The query string parsed as parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when the query carries malformed percent-encoding.
    pub fn query_params(&self) -> AnyResult<Vec<(String, String)>> {
        self.query.as_deref().map_or_else(|| Ok(vec![]), urlencode::from_form)
    }

    /// Client credentials from a Basic `Authorization` header: the header
    /// value is base64-decoded to UTF-8 and split at the first colon.
    /// `None` when no Basic header is present, `Some(Err)` when one is
    /// present but malformed.
    #[must_use]
    pub fn basic_credentials(&self) -> Option<AnyResult<(String, String)>> {
        use anyhow::anyhow;
        use base64ct::{Base64, Encoding};

        let value = self.headers.get(AUTHORIZATION)?.to_str().ok()?;
        let encoded = value.strip_prefix("Basic ").or_else(|| value.strip_prefix("basic "))?;

        let parse = || {
            let decoded = Base64::decode_vec(encoded.trim())
                .map_err(|e| anyhow!("malformed Basic credentials: {e}"))?;
            let text = String::from_utf8(decoded)
                .map_err(|e| anyhow!("malformed Basic credentials: {e}"))?;
            let (client_id, client_secret) = text
                .split_once(':')
                .ok_or_else(|| anyhow!("malformed Basic credentials: missing separator"))?;
            Ok((client_id.to_string(), client_secret.to_string()))
        };

        Some(parse())
    }
}

/// A complete outbound HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    /// The response status.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 302 redirect to `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(location) {
            Ok(value) => {
                headers.insert(LOCATION, value);
            }
            Err(e) => tracing::warn!("issue setting Location header: {e}"),
        }
        Self {
            status: StatusCode::FOUND,
            headers,
            body: vec![],
        }
    }

    /// A JSON response with the given status.
    #[must_use]
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json;charset=UTF-8"));
        Self {
            status,
            headers,
            body: serde_json::to_vec(body).unwrap_or_default(),
        }
    }

    /// A 200 HTML response.
    #[must_use]
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html;charset=UTF-8"));
        Self {
            status: StatusCode::OK,
            headers,
            body: body.into(),
        }
    }

    /// The native plain-text error page used when no redirection URI has
    /// been validated.
    #[must_use]
    pub fn error_page(error: &Error) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain;charset=UTF-8"));
        Self {
            status: StatusCode::BAD_REQUEST,
            headers,
            body: format!("error: {}\nerror_description: {}", error.code(), error.description())
                .into_bytes(),
        }
    }

    /// Disable caching of the response, as required for token and
    /// introspection payloads.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        self.headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        self.headers.insert(EXPIRES, HeaderValue::from_static("-1"));
        self
    }
}

/// A validated authorization request awaiting user authentication.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
    /// The merged, validated request parameters.
    pub message: Message,
}

/// A validated logout request awaiting host sign-out.
#[derive(Clone, Debug)]
pub struct LogoutRequest {
    /// The request parameters.
    pub message: Message,

    /// The validated post-logout redirection URI, when one was supplied
    /// and accepted by the provider.
    pub post_logout_redirect_uri: Option<String>,
}

/// The result of dispatching a request.
#[derive(Debug)]
pub enum Outcome {
    /// The request matched no endpoint (or the provider skipped it); the
    /// host should pass it to the next middleware.
    Skipped,

    /// The server produced the response.
    Response(HttpResponse),

    /// An authorization request validated; the host must authenticate the
    /// user and complete the flow with [`Endpoint::sign_in`].
    Authenticate(AuthorizationRequest),

    /// A logout request validated; the host must sign the user out and
    /// complete the flow with [`Endpoint::sign_out`].
    Logout(LogoutRequest),

    /// The request failed before a redirection URI was validated and
    /// `application_can_display_errors` is set: the host renders the
    /// error.
    Error(Error),
}

/// An authorization server bound to its options and provider.
#[derive(Clone, Debug)]
pub struct Endpoint<P: Provider> {
    options: Options,
    provider: P,
}

impl<P: Provider> Endpoint<P> {
    /// Create a server from validated options.
    ///
    /// # Errors
    ///
    /// Returns an error when the options are unusable (see
    /// [`Options::validate`]).
    pub fn new(options: Options, provider: P) -> AnyResult<Self> {
        options.validate()?;
        Ok(Self { options, provider })
    }

    /// The configured options.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// The host provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Dispatch an inbound request.
    ///
    /// # Errors
    ///
    /// Protocol failures are returned as responses; an `Err` signals an
    /// infrastructure failure (state store or data protection) that the
    /// host should surface as a server fault.
    pub async fn handle(&self, request: &HttpRequest) -> Result<Outcome> {
        let classified = self.classify(&request.path);

        let mut ctx = MatchEndpointContext::new(&request.path, classified);
        self.provider.match_endpoint(&mut ctx).await;

        match ctx.control {
            MatchDisposition::Handled(response) => return Ok(Outcome::Response(response)),
            MatchDisposition::Skip => return Ok(Outcome::Skipped),
            MatchDisposition::Continue => {}
        }
        let Some(endpoint) = ctx.endpoint else {
            return Ok(Outcome::Skipped);
        };

        if !request.secure && !self.options.allow_insecure_http {
            tracing::debug!("rejecting non-TLS request to {}", request.path);
            return Ok(Outcome::Response(HttpResponse::error_page(&server!(
                "this server only accepts HTTPS requests"
            ))));
        }

        match endpoint {
            EndpointKind::Authorization => {
                handlers::authorize::authorize(&self.options, &self.provider, request).await
            }
            EndpointKind::Token => {
                let response =
                    handlers::token::token(&self.options, &self.provider, request).await?;
                Ok(Outcome::Response(response))
            }
            EndpointKind::Introspection => {
                let response =
                    handlers::introspect::introspect(&self.options, &self.provider, request)
                        .await?;
                Ok(Outcome::Response(response))
            }
            EndpointKind::Logout => {
                handlers::logout::logout(&self.provider, request).await
            }
            EndpointKind::Configuration => {
                let response =
                    handlers::metadata::metadata(&self.options, &self.provider).await;
                Ok(Outcome::Response(response))
            }
            EndpointKind::Jwks => {
                let response = handlers::jwks::jwks(&self.options, &self.provider).await;
                Ok(Outcome::Response(response))
            }
        }
    }

    /// Complete an authorization flow once the host has authenticated the
    /// user: mint the requested artifacts and assemble the response for
    /// the request's response mode.
    ///
    /// # Errors
    ///
    /// Returns an error on state store or data protection failure.
    pub async fn sign_in(
        &self, request: &AuthorizationRequest, ticket: AuthenticationTicket,
    ) -> Result<HttpResponse> {
        handlers::authorize::sign_in(&self.options, &self.provider, request, ticket).await
    }

    /// Complete a logout flow once the host has signed the user out.
    ///
    /// # Errors
    ///
    /// Returns an error on state store failure.
    pub async fn sign_out(&self, request: &LogoutRequest) -> Result<HttpResponse> {
        handlers::logout::sign_out(request)
    }

    // compare the request path against the configured endpoint paths; an
    // empty path means the endpoint is disabled
    fn classify(&self, path: &str) -> Option<EndpointKind> {
        let paths = [
            (&self.options.authorization_endpoint_path, EndpointKind::Authorization),
            (&self.options.token_endpoint_path, EndpointKind::Token),
            (&self.options.introspection_endpoint_path, EndpointKind::Introspection),
            (&self.options.logout_endpoint_path, EndpointKind::Logout),
            (&self.options.configuration_endpoint_path, EndpointKind::Configuration),
            (&self.options.jwks_endpoint_path, EndpointKind::Jwks),
        ];

        paths
            .into_iter()
            .find(|(configured, _)| !configured.is_empty() && configured.as_str() == path)
            .map(|(_, kind)| kind)
    }
}
