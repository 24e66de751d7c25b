//! # Protocol Messages
//!
//! The wire representation of an inbound or outbound protocol message: an
//! ordered, case-insensitive mapping from parameter name to value, tagged
//! with the kind of request it was read from.
//!
//! `response_type` and `scope` are unordered token sets serialized as
//! space-separated strings; membership tests are exact-string equality on
//! each token (see [`crate::oauth::contains_token`]).

use serde::{Deserialize, Serialize};

use crate::oauth;

/// Well-known protocol parameter names.
pub mod param {
    /// The client identifier.
    pub const CLIENT_ID: &str = "client_id";
    /// The client secret (token endpoint only).
    pub const CLIENT_SECRET: &str = "client_secret";
    /// The redirection URI.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// The requested response type token set.
    pub const RESPONSE_TYPE: &str = "response_type";
    /// The requested response mode.
    pub const RESPONSE_MODE: &str = "response_mode";
    /// The requested scope token set.
    pub const SCOPE: &str = "scope";
    /// Opaque client state echoed back on responses.
    pub const STATE: &str = "state";
    /// The identity token replay nonce.
    pub const NONCE: &str = "nonce";
    /// An authorization code.
    pub const CODE: &str = "code";
    /// The token endpoint grant type.
    pub const GRANT_TYPE: &str = "grant_type";
    /// Resource owner username (password grant).
    pub const USERNAME: &str = "username";
    /// Resource owner password (password grant).
    pub const PASSWORD: &str = "password";
    /// A refresh token.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// An access token (introspection).
    pub const ACCESS_TOKEN: &str = "access_token";
    /// An identity token (introspection, logout hint).
    pub const ID_TOKEN: &str = "id_token";
    /// A previously issued identity token, passed as a logout hint.
    pub const ID_TOKEN_HINT: &str = "id_token_hint";
    /// Target resource servers for the requested tokens.
    pub const RESOURCE: &str = "resource";
    /// Target audiences for the requested tokens.
    pub const AUDIENCE: &str = "audience";
    /// Where to send the user agent after logout.
    pub const POST_LOGOUT_REDIRECT_URI: &str = "post_logout_redirect_uri";
    /// Error code on an error response.
    pub const ERROR: &str = "error";
    /// Human-readable error detail.
    pub const ERROR_DESCRIPTION: &str = "error_description";
    /// URI of a page describing the error.
    pub const ERROR_URI: &str = "error_uri";
    /// Keys a cached in-flight authorization request.
    pub const UNIQUE_ID: &str = "unique_id";
    /// The access token lifetime on a token response.
    pub const EXPIRES_IN: &str = "expires_in";
    /// The access token type on a token response.
    pub const TOKEN_TYPE: &str = "token_type";
}

/// The request type a [`Message`] was read from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum MessageKind {
    /// An authentication (authorization endpoint) request.
    #[default]
    AuthenticationRequest,

    /// A token endpoint request.
    TokenRequest,

    /// A logout (end-session) request.
    LogoutRequest,
}

/// An ordered, case-insensitive protocol parameter mapping.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    params: Vec<(String, String)>,
}

impl Message {
    /// Create an empty message of the given kind.
    #[must_use]
    pub const fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            params: vec![],
        }
    }

    /// Create a message from ordered parameter pairs.
    #[must_use]
    pub const fn from_params(kind: MessageKind, params: Vec<(String, String)>) -> Self {
        Self { kind, params }
    }

    /// The request type this message was read from.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The first value recorded for `name`, matched case-insensitively.
    /// Empty values read as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Set `name` to `value`, replacing an existing entry of the same
    /// (case-insensitive) name or appending a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.params.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            entry.1 = value;
        } else {
            self.params.push((name, value));
        }
    }

    /// Remove every entry named `name` (case-insensitive).
    pub fn remove(&mut self, name: &str) {
        self.params.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// The ordered parameter pairs.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Overlay this message on top of a previously cached one: parameters
    /// from this message win on conflict, cached parameters fill the gaps.
    pub fn merge_cached(&mut self, cached: &Self) {
        for (name, value) in &cached.params {
            if self.get(name).is_none() {
                self.params.push((name.clone(), value.clone()));
            }
        }
    }

    // -- typed accessors ---------------------------------------------------

    /// The `client_id` parameter.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.get(param::CLIENT_ID)
    }

    /// The `client_secret` parameter.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.get(param::CLIENT_SECRET)
    }

    /// The `redirect_uri` parameter.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.get(param::REDIRECT_URI)
    }

    /// The `response_type` parameter (a space-separated token set).
    #[must_use]
    pub fn response_type(&self) -> Option<&str> {
        self.get(param::RESPONSE_TYPE)
    }

    /// The `response_mode` parameter.
    #[must_use]
    pub fn response_mode(&self) -> Option<&str> {
        self.get(param::RESPONSE_MODE)
    }

    /// The `scope` parameter (a space-separated token set).
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.get(param::SCOPE)
    }

    /// The `state` parameter.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.get(param::STATE)
    }

    /// The `nonce` parameter.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.get(param::NONCE)
    }

    /// The `code` parameter.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.get(param::CODE)
    }

    /// The `grant_type` parameter.
    #[must_use]
    pub fn grant_type(&self) -> Option<&str> {
        self.get(param::GRANT_TYPE)
    }

    /// The `username` parameter.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get(param::USERNAME)
    }

    /// The `password` parameter.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get(param::PASSWORD)
    }

    /// The `refresh_token` parameter.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.get(param::REFRESH_TOKEN)
    }

    /// The `access_token` parameter.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.get(param::ACCESS_TOKEN)
    }

    /// The `id_token` parameter.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.get(param::ID_TOKEN)
    }

    /// The `id_token_hint` parameter.
    #[must_use]
    pub fn id_token_hint(&self) -> Option<&str> {
        self.get(param::ID_TOKEN_HINT)
    }

    /// The `resource` parameter (a space-separated token set).
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.get(param::RESOURCE)
    }

    /// The `audience` parameter (a space-separated token set).
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.get(param::AUDIENCE)
    }

    /// The `post_logout_redirect_uri` parameter.
    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> Option<&str> {
        self.get(param::POST_LOGOUT_REDIRECT_URI)
    }

    /// The `unique_id` parameter keying the request cache.
    #[must_use]
    pub fn unique_id(&self) -> Option<&str> {
        self.get(param::UNIQUE_ID)
    }

    // -- token-set helpers -------------------------------------------------

    /// True when the `response_type` set contains `token` (exact match).
    #[must_use]
    pub fn has_response_type(&self, token: &str) -> bool {
        self.response_type().is_some_and(|set| oauth::contains_token(set, token))
    }

    /// True when the `scope` set contains `token` (exact match).
    #[must_use]
    pub fn has_scope(&self, token: &str) -> bool {
        self.scope().is_some_and(|set| oauth::contains_token(set, token))
    }
}
