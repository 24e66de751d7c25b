//! # Request Cache State
//!
//! Short-lived state persisted between steps of a flow: the serialized
//! in-flight authorization request (keyed by its `unique_id`, sliding
//! expiration) and the ciphertext of an issued authorization code (keyed
//! by the opaque value handed to the client, absolute expiration).

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};

use crate::oidc::types::{Message, MessageKind};

/// Key namespace for cached in-flight authorization requests.
pub(crate) const REQUEST_NS: &str = "authreq-";

/// Key namespace for cached authorization code ciphertexts.
pub(crate) const CODE_NS: &str = "authcode-";

/// Frame format version written by [`encode_message`].
const FRAME_VERSION: u32 = 1;

/// Expiry policies for cached state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// The entry is evicted at the given instant regardless of use.
    Absolute(DateTime<Utc>),

    /// The entry's lifetime restarts on every read.
    Sliding(Duration),
}

/// State lifetimes.
#[derive(Clone, Copy, Debug)]
pub enum Expire {
    /// An in-flight authorization request.
    Request,
}

impl Expire {
    /// The sliding window applied to the state item.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Request => Duration::hours(1),
        }
    }
}

/// Serialize a protocol message into the versioned binary frame stored in
/// the request cache: version, parameter count, then each name/value as a
/// length-prefixed UTF-8 string. All integers are little-endian `u32`.
#[must_use]
pub fn encode_message(message: &Message) -> Vec<u8> {
    let params = message.params();
    let mut frame = Vec::with_capacity(64);

    frame.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    frame.extend_from_slice(&u32::try_from(params.len()).unwrap_or(u32::MAX).to_le_bytes());
    for (name, value) in params {
        write_string(&mut frame, name);
        write_string(&mut frame, value);
    }

    frame
}

/// Reconstruct a protocol message from a cached frame.
///
/// # Errors
///
/// Returns an error when the frame is truncated, carries an unknown
/// version, or contains invalid UTF-8.
pub fn decode_message(kind: MessageKind, frame: &[u8]) -> Result<Message> {
    let mut cursor = 0usize;

    let version = read_u32(frame, &mut cursor)?;
    if version != FRAME_VERSION {
        bail!("unknown frame version: {version}");
    }

    let count = read_u32(frame, &mut cursor)?;
    let mut params = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = read_string(frame, &mut cursor)?;
        let value = read_string(frame, &mut cursor)?;
        params.push((name, value));
    }

    Ok(Message::from_params(kind, params))
}

fn write_string(frame: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    frame.extend_from_slice(&u32::try_from(bytes.len()).unwrap_or(u32::MAX).to_le_bytes());
    frame.extend_from_slice(bytes);
}

fn read_u32(frame: &[u8], cursor: &mut usize) -> Result<u32> {
    let end = cursor.checked_add(4).ok_or_else(|| anyhow!("frame offset overflow"))?;
    let bytes = frame.get(*cursor..end).ok_or_else(|| anyhow!("truncated frame"))?;
    *cursor = end;
    let bytes: [u8; 4] = bytes.try_into().map_err(|_| anyhow!("truncated frame"))?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_string(frame: &[u8], cursor: &mut usize) -> Result<String> {
    let len = read_u32(frame, cursor)? as usize;
    let end = cursor.checked_add(len).ok_or_else(|| anyhow!("frame offset overflow"))?;
    let bytes = frame.get(*cursor..end).ok_or_else(|| anyhow!("truncated frame"))?;
    *cursor = end;
    String::from_utf8(bytes.to_vec()).map_err(|e| anyhow!("invalid UTF-8 in frame: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrip() {
        let message = Message::from_params(MessageKind::AuthenticationRequest, vec![
            ("client_id".to_string(), "app1".to_string()),
            ("scope".to_string(), "openid profile".to_string()),
            ("state".to_string(), String::new()),
        ]);

        let frame = encode_message(&message);
        // version 1, little-endian
        assert_eq!(&frame[..4], &[1, 0, 0, 0]);
        assert_eq!(&frame[4..8], &[3, 0, 0, 0]);

        let decoded =
            decode_message(MessageKind::AuthenticationRequest, &frame).expect("should decode");
        assert_eq!(decoded, message);
    }

    #[test]
    fn truncated_frame_rejected() {
        let message = Message::from_params(MessageKind::AuthenticationRequest, vec![(
            "client_id".to_string(),
            "app1".to_string(),
        )]);
        let frame = encode_message(&message);

        assert!(decode_message(MessageKind::AuthenticationRequest, &frame[..frame.len() - 2])
            .is_err());
    }

    #[test]
    fn unknown_version_rejected() {
        let mut frame = encode_message(&Message::new(MessageKind::AuthenticationRequest));
        frame[0] = 9;
        assert!(decode_message(MessageKind::AuthenticationRequest, &frame).is_err());
    }
}
