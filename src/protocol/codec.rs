//! Base64 codec for embedding binary payloads in text frames
//!
//! Datagram bytes cross the serial link inside textual frames, so they are
//! Base64-encoded (RFC 4648 standard alphabet). Decode failures are surfaced
//! as errors rather than silently falling back to the raw input; callers
//! route them into the normal dispatch failure path.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid Base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Encode `data` as Base64 text.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode Base64 text back into bytes.
///
/// Leading/trailing whitespace (e.g. a stray newline from the serial link)
/// is stripped before decoding.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let cases: [&[u8]; 4] = [b"a", b"\x01\x02", b"hello world", &[0xff, 0x00, 0x7f]];
        for data in cases {
            let encoded = encode(data);
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, data);
        }
    }

    #[test]
    fn test_encode_known_vector() {
        assert_eq!(encode(b"Hello"), "SGVsbG8=");
        assert_eq!(encode(&[0x01, 0x02]), "AQI=");
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        assert_eq!(decode("SGVsbG8=\n").unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(decode("not base64!!").is_err());
    }
}
