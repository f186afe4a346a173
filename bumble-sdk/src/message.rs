//! Message model: headers, envelopes and message codes.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Message kind carried in a [`Header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    /// Free-text informational message.
    GenericMessage,
    /// Any code this client does not know about. Still delivered.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GenericMessage => "generic_message",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Message header: identity, addressing and the informational text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub id: String,
    pub code: Code,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub date: DateTime<Utc>,
}

impl Header {
    pub fn new(code: Code) -> Self {
        Self {
            id: new_message_id(),
            code,
            from: None,
            to: None,
            info: None,
            date: Utc::now(),
        }
    }

    /// A [`Code::GenericMessage`] header.
    pub fn generic() -> Self {
        Self::new(Code::GenericMessage)
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] id={} from={} to={}",
            self.code,
            self.id,
            self.from.as_deref().unwrap_or("-"),
            self.to.as_deref().unwrap_or("-"),
        )?;
        if let Some(info) = &self.info {
            write!(f, " info={info:?}")?;
        }
        Ok(())
    }
}

/// Transport-level container: routing metadata plus the message itself.
///
/// `from`/`to` are what the router routes on; the header repeats them for the
/// recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub message: Header,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Wrap a header, copying its addressing onto the envelope.
    pub fn wrap(message: Header) -> Self {
        Self {
            from: message.from.clone(),
            to: message.to.clone(),
            message,
            payload: serde_json::Value::Null,
        }
    }

    /// Stamp the sender on both the envelope and the header, unless already set.
    pub fn stamp_sender(&mut self, from: &str) {
        if self.from.is_none() {
            self.from = Some(from.to_string());
        }
        if self.message.from.is_none() {
            self.message.from = Some(from.to_string());
        }
    }
}

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Time-sortable 26-character message id (48 bits ms timestamp + 80 bits random,
/// Crockford base32).
pub fn new_message_id() -> String {
    let now_ms = Utc::now().timestamp_millis().max(0) as u128;
    let mut rng = rand::thread_rng();
    let rand_hi: u16 = rng.r#gen();
    let rand_lo: u64 = rng.r#gen();

    let value = (now_ms << 80) | ((rand_hi as u128) << 64) | rand_lo as u128;
    (0..26)
        .rev()
        .map(|i| CROCKFORD[((value >> (i * 5)) & 0x1F) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_builder() {
        let header = Header::generic().with_to("alice").with_info("hi");
        assert_eq!(header.code, Code::GenericMessage);
        assert_eq!(header.to.as_deref(), Some("alice"));
        assert_eq!(header.info.as_deref(), Some("hi"));
        assert!(header.from.is_none());
    }

    #[test]
    fn test_wrap_copies_addressing() {
        let env = Envelope::wrap(Header::generic().with_to("alice"));
        assert_eq!(env.to.as_deref(), Some("alice"));
        assert!(env.from.is_none());
    }

    #[test]
    fn test_stamp_sender_keeps_existing() {
        let mut header = Header::generic();
        header.from = Some("bob".into());
        let mut env = Envelope::wrap(header);
        env.from = None;
        env.stamp_sender("alice");
        assert_eq!(env.from.as_deref(), Some("alice"));
        assert_eq!(env.message.from.as_deref(), Some("bob"));
    }

    #[test]
    fn test_unknown_code_still_decodes() {
        let json = r#"{"id":"x","code":"presence_update","date":"2025-01-01T00:00:00Z"}"#;
        let header: Header = serde_json::from_str(json).unwrap();
        assert_eq!(header.code, Code::Unknown);
    }

    #[test]
    fn test_display_includes_info() {
        let mut header = Header::generic().with_to("alice").with_info("hello");
        header.id = "01ABC".into();
        let shown = header.to_string();
        assert_eq!(
            shown,
            "[generic_message] id=01ABC from=- to=alice info=\"hello\""
        );
    }

    #[test]
    fn test_message_id_shape() {
        let a = new_message_id();
        let b = new_message_id();
        assert_eq!(a.len(), 26);
        assert!(a.bytes().all(|c| CROCKFORD.contains(&c)));
        assert_ne!(a, b);
    }
}
