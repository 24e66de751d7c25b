//! # URL Encoding
//!
//! Query-string assembly and `application/x-www-form-urlencoded` parsing
//! shared by the endpoint handlers.

use anyhow::{Result, anyhow};

/// Serialize parameter pairs into a query (or fragment) string, percent-
/// encoding names and values.
#[must_use]
pub fn to_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(name, value)| {
            format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse an `application/x-www-form-urlencoded` payload (a form body or a
/// URL query) into ordered parameter pairs.
///
/// # Errors
///
/// Returns an error when a percent-encoded sequence does not decode to
/// valid UTF-8.
pub fn from_form(payload: &str) -> Result<Vec<(String, String)>> {
    let mut params = vec![];

    for pair in payload.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.push((decode(name)?, decode(value)?));
    }

    Ok(params)
}

// form encoding represents spaces as '+'
fn decode(encoded: &str) -> Result<String> {
    let spaced = encoded.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| anyhow!("malformed percent-encoding: {e}"))
}
