//! An OpenID Connect 1.0 / OAuth 2.0 authorization server, implemented as
//! a framework-agnostic request handler.
//!
//! # Design
//!
//! **Endpoints**
//!
//! The library implements the wire-level surface of an identity provider:
//! the authorization, token, introspection, logout, configuration
//! (discovery), and cryptography (JWKS) endpoints, as specified by
//! [RFC6749], [OpenID Connect Core], [Discovery], and the logout subset of
//! [Session Management].
//!
//! [`endpoint::Endpoint::handle`] classifies an inbound HTTP request and
//! runs the matched handler. The library will work with most common Rust
//! HTTP servers with a few lines of 'wrapper' code: the host converts its
//! request type into [`endpoint::HttpRequest`], and writes the returned
//! [`endpoint::HttpResponse`] back out.
//!
//! Two flows deliberately round-trip through the host application. An
//! authorization request that validates yields
//! [`endpoint::Outcome::Authenticate`]: the host authenticates the user
//! however it likes (sign-in form, SSO cookie) and completes the flow with
//! [`endpoint::Endpoint::sign_in`], passing the authenticated
//! [`ticket::AuthenticationTicket`]. Logout works the same way through
//! [`endpoint::Outcome::Logout`] and [`endpoint::Endpoint::sign_out`].
//!
//! **Providers**
//!
//! Host integration happens through the [`provider::Provider`] trait
//! family: [`events::Events`] carries the extension hooks (client
//! validation, grant processing, token format overrides, per-endpoint
//! interception), [`provider::StateStore`] backs the short-lived request
//! cache, and [`provider::DataProtector`] protects opaque tokens.
//!
//! # Example
//!
//! ```rust,ignore
//! let endpoint = Endpoint::new(Options::new("https://server.example.com"), provider)?;
//!
//! match endpoint.handle(&request).await? {
//!     Outcome::Response(response) => write(response),
//!     Outcome::Authenticate(request) => {
//!         // authenticate the user, then:
//!         let ticket = AuthenticationTicket::for_subject("alice");
//!         write(endpoint.sign_in(&request, ticket).await?)
//!     }
//!     Outcome::Logout(request) => write(endpoint.sign_out(&request).await?),
//!     Outcome::Skipped => next_middleware(),
//!     Outcome::Error(error) => render(error),
//! }
//! ```
//!
//! [RFC6749]: (https://www.rfc-editor.org/rfc/rfc6749.html)
//! [OpenID Connect Core]: (https://openid.net/specs/openid-connect-core-1_0.html)
//! [Discovery]: (https://openid.net/specs/openid-connect-discovery-1_0.html)
//! [Session Management]: (https://openid.net/specs/openid-connect-session-1_0.html)

pub mod endpoint;
pub mod events;
pub mod options;
pub mod provider;
pub mod state;
pub mod ticket;
pub mod types;

mod error;
mod handlers;
mod token;

pub use error::{Error, Rejection};

/// Result type for protocol operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
