//! # Provider
//!
//! Traits the host application implements to back the server: the hook
//! surface ([`Events`]), the short-lived state store, and the symmetric
//! data-protection primitive used for opaque tokens.
//!
//! A blanket implementation makes any type implementing the super traits a
//! [`Provider`].

use std::future::Future;

pub use anyhow::Result;

use crate::oidc::events::Events;
use crate::oidc::state::CachePolicy;

/// The host-provided collaborator set.
pub trait Provider: Events + StateStore + DataProtector + Clone {}

/// A blanket implementation for `Provider` so that any type implementing
/// the required super traits is considered a `Provider`.
impl<T> Provider for T where T: Events + StateStore + DataProtector + Clone {}

/// A short-lived keyed store backing in-flight authorization requests and
/// issued authorization codes.
///
/// Implementations must be safe for concurrent `put`/`get`/`take`; all
/// operations are point queries.
pub trait StateStore: Send + Sync {
    /// Store `value` under `key` with the given expiry policy, replacing
    /// any existing entry.
    fn put(
        &self, key: &str, value: Vec<u8>, policy: CachePolicy,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve the entry stored under `key`, restarting its lifetime when
    /// the entry uses a sliding expiry.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Atomically remove and return the entry stored under `key`. The
    /// single-use guarantee for authorization codes rests on this
    /// operation: lookup and removal are one step.
    fn take(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

/// A reversible symmetric data-protection primitive used to serialize
/// authorization codes and refresh tokens (and access tokens when the host
/// opts out of JWTs).
pub trait DataProtector: Send + Sync {
    /// Protect `plaintext`, returning an opaque ciphertext.
    fn protect(&self, plaintext: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Reverse [`DataProtector::protect`].
    fn unprotect(&self, ciphertext: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
