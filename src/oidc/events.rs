//! # Events
//!
//! The extensibility contract. The server invokes one [`Events`] method at
//! each well-defined point of a flow; every method has a default body so a
//! host overrides only what it needs.
//!
//! Validation and grant hooks record a three-state [`Decision`] on their
//! context: `Validated` (proceed), `Rejected` (abort with a protocol
//! error), or `Skipped` (let default behavior run). Endpoint-level hooks
//! may additionally write the response themselves, in which case the
//! server emits it verbatim and goes no further.

use std::future::Future;

use crate::oidc::endpoint::{EndpointKind, HttpResponse};
use crate::oidc::error::{Error, Rejection};
use crate::oidc::ticket::AuthenticationTicket;
use crate::oidc::types::Message;

/// The outcome a validation or grant hook records on its context.
#[derive(Debug, Default)]
pub enum Decision {
    /// The hook expressed no opinion; default behavior runs.
    #[default]
    Skipped,

    /// The hook accepted the request.
    Validated,

    /// The hook refused the request.
    Rejected(Rejection),
}

impl Decision {
    /// True when the hook accepted the request.
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        matches!(self, Self::Validated)
    }

    /// True when the hook refused the request.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Context for [`Events::match_endpoint`].
#[derive(Debug)]
pub struct MatchEndpointContext {
    /// The request path.
    pub path: String,

    /// The endpoint the request was classified as, if any. A hook may
    /// reclassify — for example flagging an accept/deny sub-path as the
    /// authorization endpoint.
    pub endpoint: Option<EndpointKind>,

    pub(crate) control: MatchDisposition,
}

#[derive(Debug, Default)]
pub(crate) enum MatchDisposition {
    #[default]
    Continue,
    Handled(HttpResponse),
    Skip,
}

impl MatchEndpointContext {
    pub(crate) fn new(path: impl Into<String>, endpoint: Option<EndpointKind>) -> Self {
        Self {
            path: path.into(),
            endpoint,
            control: MatchDisposition::Continue,
        }
    }

    /// Classify the request as the given endpoint.
    pub fn set_endpoint(&mut self, endpoint: EndpointKind) {
        self.endpoint = Some(endpoint);
    }

    /// The hook wrote the response; the server returns it immediately.
    pub fn respond(&mut self, response: HttpResponse) {
        self.control = MatchDisposition::Handled(response);
    }

    /// Yield the request to the next middleware in the host's pipeline.
    pub fn skip(&mut self) {
        self.control = MatchDisposition::Skip;
    }
}

/// Context for [`Events::validate_client_redirect_uri`]. The request is
/// rejected unless the hook explicitly validates.
#[derive(Debug)]
pub struct ValidateClientRedirectUriContext {
    /// The requesting client.
    pub client_id: String,

    /// The `redirect_uri` flowed on the request, when present. A hook may
    /// substitute the client's registered URI.
    pub redirect_uri: Option<String>,

    pub(crate) decision: Decision,
}

impl ValidateClientRedirectUriContext {
    pub(crate) fn new(client_id: impl Into<String>, redirect_uri: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            decision: Decision::Skipped,
        }
    }

    /// Accept the client and its redirection URI.
    pub fn validate(&mut self) {
        self.decision = Decision::Validated;
    }

    /// Accept the client, substituting the registered redirection URI.
    pub fn validate_with(&mut self, redirect_uri: impl Into<String>) {
        self.redirect_uri = Some(redirect_uri.into());
        self.decision = Decision::Validated;
    }

    /// Refuse the request.
    pub fn reject(&mut self, error: Error) {
        self.decision = Decision::Rejected(error.into());
    }
}

/// Context for [`Events::validate_client_logout_redirect_uri`]. The
/// post-logout redirection is dropped unless the hook explicitly
/// validates.
#[derive(Debug)]
pub struct ValidateClientLogoutRedirectUriContext {
    /// The `post_logout_redirect_uri` flowed on the request.
    pub post_logout_redirect_uri: String,

    pub(crate) decision: Decision,
}

impl ValidateClientLogoutRedirectUriContext {
    pub(crate) fn new(post_logout_redirect_uri: impl Into<String>) -> Self {
        Self {
            post_logout_redirect_uri: post_logout_redirect_uri.into(),
            decision: Decision::Skipped,
        }
    }

    /// Accept the redirection URI.
    pub fn validate(&mut self) {
        self.decision = Decision::Validated;
    }

    /// Refuse the request.
    pub fn reject(&mut self, error: Error) {
        self.decision = Decision::Rejected(error.into());
    }
}

/// Context for [`Events::validate_client_authentication`].
#[derive(Debug)]
pub struct ValidateClientAuthenticationContext {
    /// The client identifier, from the form body or Basic header.
    pub client_id: Option<String>,

    /// The client secret, from the form body or Basic header.
    pub client_secret: Option<String>,

    pub(crate) decision: Decision,
}

impl ValidateClientAuthenticationContext {
    pub(crate) fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id,
            client_secret,
            decision: Decision::Skipped,
        }
    }

    /// The credentials identify a known client.
    pub fn validate(&mut self) {
        self.decision = Decision::Validated;
    }

    /// Refuse client authentication.
    pub fn reject(&mut self, error: Error) {
        self.decision = Decision::Rejected(error.into());
    }
}

/// Context for [`Events::validate_authorization_request`] and
/// [`Events::validate_token_request`]. The request proceeds unless the
/// hook rejects.
#[derive(Debug)]
pub struct ValidateRequestContext {
    /// The request being validated.
    pub message: Message,

    /// The materialized ticket, attached when validating a token request
    /// for the authorization-code or refresh-token grants.
    pub ticket: Option<AuthenticationTicket>,

    pub(crate) decision: Decision,
}

impl ValidateRequestContext {
    pub(crate) fn new(message: Message, ticket: Option<AuthenticationTicket>) -> Self {
        Self {
            message,
            ticket,
            decision: Decision::Skipped,
        }
    }

    /// Accept the request.
    pub fn validate(&mut self) {
        self.decision = Decision::Validated;
    }

    /// Refuse the request.
    pub fn reject(&mut self, error: Error) {
        self.decision = Decision::Rejected(error.into());
    }

    /// Refuse the request, pointing at a page describing the failure.
    pub fn reject_with(&mut self, error: Error, error_uri: impl Into<String>) {
        self.decision = Decision::Rejected(Rejection {
            error,
            error_uri: Some(error_uri.into()),
        });
    }
}

/// Context for the grant hooks. A grant hook may accept the flow (with a
/// ticket describing what was granted), replace the ticket, or reject.
#[derive(Debug)]
pub struct GrantContext {
    /// The wire `grant_type`.
    pub grant_type: String,

    /// The token request.
    pub message: Message,

    /// The ticket the grant will mint tokens from. Pre-populated (and
    /// pre-validated) for the authorization-code and refresh-token grants;
    /// `None` until the hook supplies one for the password, client
    /// credentials, and extension grants.
    pub ticket: Option<AuthenticationTicket>,

    pub(crate) decision: Decision,
}

impl GrantContext {
    pub(crate) fn new(
        grant_type: impl Into<String>, message: Message, ticket: Option<AuthenticationTicket>,
    ) -> Self {
        let decision =
            if ticket.is_some() { Decision::Validated } else { Decision::Skipped };
        Self {
            grant_type: grant_type.into(),
            message,
            ticket,
            decision,
        }
    }

    /// Accept the grant, minting tokens from `ticket`.
    pub fn validate(&mut self, ticket: AuthenticationTicket) {
        self.ticket = Some(ticket);
        self.decision = Decision::Validated;
    }

    /// Refuse the grant.
    pub fn reject(&mut self, error: Error) {
        self.decision = Decision::Rejected(error.into());
    }
}

/// Context for the per-endpoint hooks, invoked after validation and before
/// the server assembles its own response.
#[derive(Debug)]
pub struct EndpointContext {
    /// The validated request, when the endpoint parses one.
    pub message: Option<Message>,

    pub(crate) response: Option<HttpResponse>,
}

impl EndpointContext {
    pub(crate) const fn new(message: Option<Message>) -> Self {
        Self {
            message,
            response: None,
        }
    }

    /// The hook wrote the response; the server emits it verbatim.
    pub fn respond(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }
}

/// Context for the `create_*` token hooks. A hook that records a token
/// replaces the default serializer for that token kind.
#[derive(Debug)]
pub struct CreateTokenContext {
    /// The (already claim-scoped) ticket the token is minted from.
    pub ticket: AuthenticationTicket,

    pub(crate) token: Option<String>,
}

impl CreateTokenContext {
    pub(crate) const fn new(ticket: AuthenticationTicket) -> Self {
        Self {
            ticket,
            token: None,
        }
    }

    /// Supply the serialized token, bypassing the default serializer.
    pub fn issue(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }
}

/// Context for the `receive_*` token hooks. A hook that records a ticket
/// replaces the default deserializer for that token kind.
#[derive(Debug)]
pub struct ReceiveTokenContext {
    /// The serialized token as presented by the client.
    pub token: String,

    /// The materialized ticket, when the hook performed deserialization.
    pub ticket: Option<AuthenticationTicket>,
}

impl ReceiveTokenContext {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ticket: None,
        }
    }
}

/// The hook surface. Every method has a default body: validation hooks
/// default to `Skipped`, grant hooks for the password, client-credentials,
/// and extension grants default to rejection, and token hooks default to
/// the built-in serializer.
#[allow(unused_variables)]
pub trait Events: Send + Sync {
    /// Reclassify, handle, or skip a request before routing.
    fn match_endpoint(
        &self, ctx: &mut MatchEndpointContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Validate the client and redirection URI of an authorization
    /// request. The request is rejected unless this hook explicitly
    /// validates.
    fn validate_client_redirect_uri(
        &self, ctx: &mut ValidateClientRedirectUriContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Validate the `post_logout_redirect_uri` of a logout request.
    fn validate_client_logout_redirect_uri(
        &self, ctx: &mut ValidateClientLogoutRedirectUriContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Authenticate the client credentials presented to the token
    /// endpoint.
    fn validate_client_authentication(
        &self, ctx: &mut ValidateClientAuthenticationContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Final validation of an authorization request; a rejection is
    /// returned to the client as a redirect.
    fn validate_authorization_request(
        &self, ctx: &mut ValidateRequestContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Final validation of a token request.
    fn validate_token_request(
        &self, ctx: &mut ValidateRequestContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Approve, amend, or refuse an authorization-code exchange. The
    /// context arrives validated with the code's ticket.
    fn grant_authorization_code(
        &self, ctx: &mut GrantContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Approve, amend, or refuse a refresh-token exchange. The context
    /// arrives validated with the refresh token's ticket.
    fn grant_refresh_token(&self, ctx: &mut GrantContext) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Process a resource owner password credentials grant. Rejected
    /// unless the hook validates with a ticket.
    fn grant_resource_owner_credentials(
        &self, ctx: &mut GrantContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Process a client credentials grant. Rejected unless the hook
    /// validates with a ticket.
    fn grant_client_credentials(
        &self, ctx: &mut GrantContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Process an extension grant. Rejected unless the hook validates with
    /// a ticket.
    fn grant_custom_extension(&self, ctx: &mut GrantContext) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Invoked after an authorization request validates, before control
    /// returns to the host for user authentication.
    fn authorization_endpoint(
        &self, ctx: &mut EndpointContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Invoked before the token endpoint assembles its response.
    fn token_endpoint(&self, ctx: &mut EndpointContext) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Invoked before the introspection endpoint assembles its response.
    fn introspection_endpoint(
        &self, ctx: &mut EndpointContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Invoked after a logout request validates, before control returns to
    /// the host for sign-out.
    fn logout_endpoint(&self, ctx: &mut EndpointContext) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Invoked before the configuration endpoint assembles the discovery
    /// document.
    fn configuration_endpoint(
        &self, ctx: &mut EndpointContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Invoked before the cryptography endpoint assembles the key set.
    fn cryptography_endpoint(
        &self, ctx: &mut EndpointContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override serialization of an authorization code.
    fn create_authorization_code(
        &self, ctx: &mut CreateTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override serialization of an access token.
    fn create_access_token(
        &self, ctx: &mut CreateTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override serialization of an identity token.
    fn create_identity_token(
        &self, ctx: &mut CreateTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override serialization of a refresh token.
    fn create_refresh_token(
        &self, ctx: &mut CreateTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override deserialization of an authorization code.
    fn receive_authorization_code(
        &self, ctx: &mut ReceiveTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override deserialization of an access token.
    fn receive_access_token(
        &self, ctx: &mut ReceiveTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override deserialization of an identity token.
    fn receive_identity_token(
        &self, ctx: &mut ReceiveTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Override deserialization of a refresh token.
    fn receive_refresh_token(
        &self, ctx: &mut ReceiveTokenContext,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }
}
