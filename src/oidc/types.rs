//! # Protocol Types
//!
//! Wire types shared across the endpoint handlers: the protocol message
//! model, server metadata, and response bodies.

mod message;
mod metadata;
mod response;

pub use message::{Message, MessageKind, param};
pub use metadata::{Jwk, Jwks, ServerMetadata};
pub use response::{ClaimEntry, IntrospectionResponse, TokenResponse};
