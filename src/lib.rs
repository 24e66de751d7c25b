//! An OpenID Connect 1.0 / OAuth 2.0 authorization server based on the
//! [OpenID Connect Core](https://openid.net/specs/openid-connect-core-1_0.html)
//! and [OAuth 2.0](https://www.rfc-editor.org/rfc/rfc6749.html) specifications.
//!
//! The library implements the protocol surface of an identity provider —
//! authorization, token, introspection, logout, discovery, and JWKS
//! endpoints — and issues and validates authorization codes, access
//! tokens, identity tokens, and refresh tokens. The HTTP framework, TLS,
//! client registration store, and user-authentication UI remain the
//! host's, reached through the [`oidc::provider::Provider`] traits.
//!
//! See the [`oidc`] module for the endpoint architecture and a usage
//! example.

pub mod core;
pub mod oauth;
pub mod oidc;

pub use crate::oidc::endpoint::{Endpoint, HttpRequest, HttpResponse, Outcome};
pub use crate::oidc::options::{Options, SigningCredential};
pub use crate::oidc::ticket::AuthenticationTicket;
pub use crate::oidc::{Error, Result};
