//! Wire protocol: newline-delimited JSON frames.
//!
//! ```text
//! C → R  {"type":"hello","name":"alice"}
//! R → C  {"type":"challenge","nonce":"<base64url>"}
//! C → R  {"type":"proof","signature":"<base64url ed25519 over the nonce bytes>"}
//! R → C  {"type":"auth_result","success":true}
//! C ↔ R  {"type":"envelope","from":..,"to":..,"message":{..}}
//! C ↔ R  {"type":"goodbye","reason":".."}
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::identity::ClientIdentity;
use crate::message::Envelope;

/// One line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Hello {
        name: String,
    },
    Challenge {
        nonce: String,
    },
    Proof {
        signature: String,
    },
    AuthResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Envelope(Envelope),
    Goodbye {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Frame {
    /// Serialize to a single line, including the trailing `\n`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn decode(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

/// Build the `proof` frame answering a router challenge.
pub fn answer_challenge(
    identity: &ClientIdentity,
    nonce: &str,
) -> Result<Frame, base64::DecodeError> {
    let nonce_bytes = URL_SAFE_NO_PAD.decode(nonce.trim())?;
    let signature = identity.sign(&nonce_bytes);
    Ok(Frame::Proof {
        signature: URL_SAFE_NO_PAD.encode(signature.to_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Header;
    use ed25519_dalek::{Signature, SigningKey, Verifier};

    #[test]
    fn test_hello_wire_format() {
        let line = Frame::Hello {
            name: "alice".into(),
        }
        .encode()
        .unwrap();
        assert_eq!(line, "{\"type\":\"hello\",\"name\":\"alice\"}\n");
    }

    #[test]
    fn test_decode_auth_result_without_reason() {
        let frame = Frame::decode("{\"type\":\"auth_result\",\"success\":false}\r\n").unwrap();
        assert_eq!(
            frame,
            Frame::AuthResult {
                success: false,
                reason: None
            }
        );
    }

    #[test]
    fn test_envelope_frame_is_flat() {
        let env = Envelope::wrap(Header::generic().with_to("alice").with_info("hi"));
        let line = Frame::Envelope(env).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "envelope");
        assert_eq!(value["to"], "alice");
        assert_eq!(value["message"]["code"], "generic_message");
        assert_eq!(value["message"]["info"], "hi");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Frame::decode("PING :irc.example").is_err());
        assert!(Frame::decode("{\"type\":\"launch_rockets\"}").is_err());
    }

    #[test]
    fn test_answer_challenge_signature_verifies() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let identity = ClientIdentity::new("alice", key.clone());
        let nonce = URL_SAFE_NO_PAD.encode(b"router-nonce-123");

        let Frame::Proof { signature } = answer_challenge(&identity, &nonce).unwrap() else {
            panic!("expected proof frame");
        };
        let sig_bytes: [u8; 64] = URL_SAFE_NO_PAD
            .decode(signature)
            .unwrap()
            .try_into()
            .unwrap();
        let sig = Signature::from_bytes(&sig_bytes);
        assert!(key.verifying_key().verify(b"router-nonce-123", &sig).is_ok());
    }

    #[test]
    fn test_answer_challenge_bad_nonce() {
        let identity = ClientIdentity::new("alice", SigningKey::from_bytes(&[3u8; 32]));
        assert!(answer_challenge(&identity, "not base64!!").is_err());
    }
}
