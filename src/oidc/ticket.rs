//! # Authentication Tickets
//!
//! The authentication ticket is the currency passed between endpoints: a
//! flat record of claims about the authenticated subject plus an ordered
//! property map describing the flow that produced it. Tickets are value
//! types — token minting always operates on a defensive copy so that one
//! token's claim filtering can never leak into another's.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known claim types.
pub mod claim {
    /// The subject identifier. Mandatory on every identity token.
    pub const SUBJECT: &str = "sub";
    /// The subject's name identifier; used to synthesize `sub` when the
    /// host did not set one.
    pub const NAME_IDENTIFIER: &str = "name_id";
    /// The subject's display name.
    pub const NAME: &str = "name";
}

/// Reserved property names.
pub mod property {
    /// The client the ticket was issued to. Write-once.
    pub const CLIENT_ID: &str = "client_id";
    /// The redirection URI recorded at authorization time.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// Resource servers granted at authorization time.
    pub const RESOURCE: &str = "resource";
    /// Scope granted at authorization time.
    pub const SCOPE: &str = "scope";
    /// The replay nonce from the authorization request.
    pub const NONCE: &str = "nonce";
    /// Audiences for tokens minted from the ticket.
    pub const AUDIENCES: &str = "audiences";
    /// Whether the client had authenticated when the ticket was created.
    pub const CLIENT_AUTHENTICATED: &str = "client_authenticated";
}

/// The token kinds a claim may be copied into.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Destination {
    /// The claim is copied into identity tokens.
    #[serde(rename = "id_token")]
    IdentityToken,

    /// The claim is copied into access tokens.
    #[serde(rename = "token")]
    AccessToken,
}

/// A single claim about the authenticated subject.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Claim {
    /// The claim type.
    #[serde(rename = "type")]
    pub kind: String,

    /// The claim value.
    pub value: String,

    /// The token kinds this claim may be serialized into. An empty set
    /// keeps the claim out of every token except for the subject and
    /// name-identifier claims, which are always kept.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub destinations: BTreeSet<Destination>,
}

impl Claim {
    /// Create a claim with no destinations.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            destinations: BTreeSet::new(),
        }
    }

    /// Add a destination the claim may flow to.
    #[must_use]
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destinations.insert(destination);
        self
    }

    // sub and name_id survive filtering so tokens always carry a subject
    pub(crate) fn always_kept(&self) -> bool {
        self.kind == claim::SUBJECT || self.kind == claim::NAME_IDENTIFIER
    }
}

/// Flow properties attached to a ticket: lifetime bounds plus an ordered
/// mapping of reserved entries.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Properties {
    /// When the ticket (and any token minted from it) was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,

    /// When the ticket expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// The value recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Record `value` under `name`, replacing any existing entry.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove the entry recorded under `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// The client the ticket was issued to.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.get(property::CLIENT_ID)
    }

    /// Record the owning client. The entry is write-once: once a ticket is
    /// bound to a client it stays bound for the remainder of the flow.
    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        if !self.entries.contains_key(property::CLIENT_ID) {
            self.entries.insert(property::CLIENT_ID.to_string(), client_id.into());
        }
    }

    /// The redirection URI recorded at authorization time.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.get(property::REDIRECT_URI)
    }

    /// The granted resource set (space-separated).
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.get(property::RESOURCE)
    }

    /// The granted scope set (space-separated).
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.get(property::SCOPE)
    }

    /// The authorization request nonce.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.get(property::NONCE)
    }

    /// Audiences for minted tokens.
    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        self.get(property::AUDIENCES)
            .map(|set| set.split(' ').map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Record the audience set.
    pub fn set_audiences(&mut self, audiences: &[String]) {
        self.set(property::AUDIENCES, audiences.join(" "));
    }

    /// Whether the client had authenticated when the ticket was created.
    #[must_use]
    pub fn client_authenticated(&self) -> bool {
        self.get(property::CLIENT_AUTHENTICATED) == Some("true")
    }

    /// Record whether the client authenticated.
    pub fn set_client_authenticated(&mut self, authenticated: bool) {
        self.set(property::CLIENT_AUTHENTICATED, if authenticated { "true" } else { "false" });
    }
}

/// An authenticated subject plus the properties of the flow that produced
/// it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthenticationTicket {
    /// Claims asserted about the subject.
    pub claims: Vec<Claim>,

    /// Flow properties.
    pub properties: Properties,
}

impl AuthenticationTicket {
    /// Create a ticket for the given subject identifier, destined for both
    /// token kinds.
    #[must_use]
    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            claims: vec![
                Claim::new(claim::SUBJECT, subject)
                    .with_destination(Destination::IdentityToken)
                    .with_destination(Destination::AccessToken),
            ],
            properties: Properties::default(),
        }
    }

    /// The subject identifier: the `sub` claim, falling back to the
    /// name-identifier claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claim(claim::SUBJECT).or_else(|| self.claim(claim::NAME_IDENTIFIER))
    }

    /// The first value of the claim of the given type.
    #[must_use]
    pub fn claim(&self, kind: &str) -> Option<&str> {
        self.claims.iter().find(|c| c.kind == kind).map(|c| c.value.as_str())
    }

    /// Add a claim.
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// A defensive copy containing only claims destined for `destination`
    /// (the subject and name-identifier claims are always kept).
    #[must_use]
    pub fn scoped_to(&self, destination: Destination) -> Self {
        let mut copy = self.clone();
        copy.claims.retain(|c| c.always_kept() || c.destinations.contains(&destination));
        copy
    }

    /// True when the ticket's expiry is in the past.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.properties.expires_at.is_some_and(|at| at <= now)
    }

    /// Serialize the ticket for data protection.
    ///
    /// # Errors
    ///
    /// Returns an error when the ticket cannot be serialized.
    pub fn to_vec(&self) -> anyhow::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| anyhow::anyhow!("issue serializing ticket: {e}"))
    }

    /// Reconstruct a ticket from its serialized form.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not a serialized ticket.
    pub fn from_slice(value: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(value).map_err(|e| anyhow::anyhow!("issue deserializing ticket: {e}"))
    }
}
