//! Wire encoding for queue bodies.
//!
//! Bodies travel as standard padded base64 so that any text survives
//! transports that are not 8-bit clean.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{QueueError, Result};

/// Encodes a text body for the wire.
pub fn encode(body: &str) -> String {
    BASE64.encode(body.as_bytes())
}

/// Decodes a wire body back to text.
pub fn decode(wire: &str) -> Result<String> {
    let bytes = BASE64
        .decode(wire.trim())
        .map_err(|e| QueueError::Decode(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| QueueError::Decode(format!("invalid utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_customer_id_as_base64() {
        assert_eq!(encode("7"), "Nw==");
        assert_eq!(encode("12345"), "MTIzNDU=");
    }

    #[test]
    fn decodes_wire_body() {
        assert_eq!(decode("Nw==").unwrap(), "7");
        assert_eq!(decode("MTIzNDU=\n").unwrap(), "12345");
    }

    #[test]
    fn plain_text_is_not_valid_wire_body() {
        assert!(matches!(decode("7"), Err(QueueError::Decode(_))));
        assert!(matches!(decode("not base64!"), Err(QueueError::Decode(_))));
    }

    #[test]
    fn non_utf8_payload_is_rejected() {
        let wire = BASE64.encode([0xff, 0xfe, 0x00]);
        assert!(matches!(decode(&wire), Err(QueueError::Decode(_))));
    }
}
