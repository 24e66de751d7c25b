#![allow(dead_code)]

//! Shared test fixtures: an in-memory provider double and request/response
//! helpers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::{DateTime, Duration, Utc};
use credibil_oidc::oidc::events::{
    Events, GrantContext, ValidateClientAuthenticationContext, ValidateClientLogoutRedirectUriContext,
    ValidateClientRedirectUriContext,
};
use credibil_oidc::oidc::provider::{DataProtector, Result, StateStore};
use credibil_oidc::oidc::state::CachePolicy;
use credibil_oidc::oidc::ticket::{Claim, Destination, claim, property};
use credibil_oidc::{AuthenticationTicket, Endpoint, HttpRequest, HttpResponse, Options, SigningCredential};
use rsa::RsaPrivateKey;
use serde_json::{Map, Value};

pub const ISSUER: &str = "https://server.example.com";

/// Initialize tracing output for a test run.
pub fn init_tracer() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub const CLIENT_ID: &str = "app1";
pub const CLIENT_SECRET: &str = "s3cret";
pub const REDIRECT_URI: &str = "https://client.example.com/cb";
pub const NORMAL_USER: &str = "alice";
pub const USER_PASSWORD: &str = "wonderland";

/// Options with a freshly generated RS256 signing credential.
pub fn options() -> Options {
    let mut options = Options::new(ISSUER);
    options.signing_credentials.push(credential());
    options
}

/// The RSA-2048 key shared by a test binary. Key generation is slow in
/// debug builds, so it happens once per process.
pub fn test_key() -> &'static RsaPrivateKey {
    static TEST_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    TEST_KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).expect("should generate key")
    })
}

/// A signing credential backed by the shared test key.
pub fn credential() -> SigningCredential {
    SigningCredential::new(test_key()).expect("should build credential")
}

/// An endpoint wired to a fresh provider double.
pub fn endpoint() -> Endpoint<ProviderImpl> {
    Endpoint::new(options(), ProviderImpl::new()).expect("should create endpoint")
}

/// A ticket for the test user, destined for both token kinds.
pub fn ticket() -> AuthenticationTicket {
    let mut ticket = AuthenticationTicket::for_subject(NORMAL_USER);
    ticket.add_claim(
        Claim::new(claim::NAME, "Alice Example").with_destination(Destination::IdentityToken),
    );
    ticket
}

// --------------------------------------------------------------------
// Provider double
// --------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ProviderImpl {
    pub store: Store,
}

impl ProviderImpl {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Events for ProviderImpl {
    fn validate_client_redirect_uri(
        &self, ctx: &mut ValidateClientRedirectUriContext,
    ) -> impl Future<Output = ()> + Send {
        async move {
            if ctx.client_id == CLIENT_ID
                && ctx.redirect_uri.as_deref().is_none_or(|uri| uri == REDIRECT_URI)
            {
                ctx.validate();
            }
        }
    }

    fn validate_client_logout_redirect_uri(
        &self, ctx: &mut ValidateClientLogoutRedirectUriContext,
    ) -> impl Future<Output = ()> + Send {
        async move {
            if ctx.post_logout_redirect_uri == "https://client.example.com/bye" {
                ctx.validate();
            }
        }
    }

    fn validate_client_authentication(
        &self, ctx: &mut ValidateClientAuthenticationContext,
    ) -> impl Future<Output = ()> + Send {
        async move {
            if ctx.client_id.as_deref() == Some(CLIENT_ID)
                && ctx.client_secret.as_deref() == Some(CLIENT_SECRET)
            {
                ctx.validate();
            }
        }
    }

    fn grant_resource_owner_credentials(
        &self, ctx: &mut GrantContext,
    ) -> impl Future<Output = ()> + Send {
        async move {
            if ctx.message.username() == Some(NORMAL_USER)
                && ctx.message.password() == Some(USER_PASSWORD)
            {
                let mut granted = AuthenticationTicket::for_subject(NORMAL_USER);
                if let Some(scope) = ctx.message.scope() {
                    granted.properties.set(property::SCOPE, scope);
                }
                ctx.validate(granted);
            }
        }
    }

    fn grant_client_credentials(&self, ctx: &mut GrantContext) -> impl Future<Output = ()> + Send {
        async move {
            let subject = ctx.message.client_id().unwrap_or_default().to_string();
            let mut granted = AuthenticationTicket::for_subject(subject);
            if let Some(scope) = ctx.message.scope() {
                granted.properties.set(property::SCOPE, scope);
            }
            ctx.validate(granted);
        }
    }
}

impl StateStore for ProviderImpl {
    async fn put(&self, key: &str, value: Vec<u8>, policy: CachePolicy) -> Result<()> {
        self.store.put(key, value, policy);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.get(key))
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.take(key))
    }
}

impl DataProtector for ProviderImpl {
    async fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(scramble(plaintext))
    }

    async fn unprotect(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(scramble(ciphertext))
    }
}

// a self-inverse stand-in for real data protection
fn scramble(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ 0x5a).collect()
}

#[derive(Clone, Default)]
pub struct Store {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
    sliding: Option<Duration>,
}

impl Store {
    pub fn put(&self, key: &str, value: Vec<u8>, policy: CachePolicy) {
        let entry = match policy {
            CachePolicy::Absolute(expires_at) => Entry {
                value,
                expires_at,
                sliding: None,
            },
            CachePolicy::Sliding(window) => Entry {
                value,
                expires_at: Utc::now() + window,
                sliding: Some(window),
            },
        };
        self.entries.lock().expect("should lock").insert(key.to_string(), entry);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().expect("should lock");
        if entries.get(key).is_some_and(|e| e.expires_at <= Utc::now()) {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        if let Some(window) = entry.sliding {
            entry.expires_at = Utc::now() + window;
        }
        Some(entry.value.clone())
    }

    pub fn take(&self, key: &str) -> Option<Vec<u8>> {
        let entry = self.entries.lock().expect("should lock").remove(key)?;
        (entry.expires_at > Utc::now()).then_some(entry.value)
    }
}

// --------------------------------------------------------------------
// Request/response helpers
// --------------------------------------------------------------------

/// A GET authorization request with the given query string.
pub fn authorize_get(query: &str) -> HttpRequest {
    HttpRequest::get("/connect/authorize", Some(query.to_string()))
}

/// A POST authorization request with the given form body.
pub fn authorize_post(body: &str) -> HttpRequest {
    HttpRequest::form_post("/connect/authorize", body.as_bytes().to_vec())
}

/// A POST token request with the given form body.
pub fn token_post(body: &str) -> HttpRequest {
    HttpRequest::form_post("/connect/token", body.as_bytes().to_vec())
}

/// The response's `Location` header.
pub fn location(response: &HttpResponse) -> String {
    response
        .headers
        .get(http::header::LOCATION)
        .expect("should have Location header")
        .to_str()
        .expect("should be a string")
        .to_string()
}

/// Parameters carried after `#` in a redirect.
pub fn fragment_params(location: &str) -> HashMap<String, String> {
    let (_, fragment) = location.split_once('#').expect("should have a fragment");
    parse_params(fragment)
}

/// Parameters carried in a redirect's query string.
pub fn query_params(location: &str) -> HashMap<String, String> {
    let (_, query) = location.split_once('?').expect("should have a query");
    parse_params(query)
}

fn parse_params(encoded: &str) -> HashMap<String, String> {
    credibil_oidc::core::urlencode::from_form(encoded)
        .expect("should parse")
        .into_iter()
        .collect()
}

/// The response body parsed as JSON.
pub fn json_body(response: &HttpResponse) -> Value {
    serde_json::from_slice(&response.body).expect("should be JSON")
}

/// Decode a JWT issued with the given options, verifying the signature
/// with the first signing credential.
pub fn decode_jwt(options: &Options, token: &str) -> Map<String, Value> {
    let credential = options.signing_credential().expect("should have credential");
    let key = jsonwebtoken::DecodingKey::from_rsa_components(
        credential.modulus(),
        credential.exponent(),
    )
    .expect("should build key");

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Map<String, Value>>(token, &key, &validation)
        .expect("should verify")
        .claims
}
