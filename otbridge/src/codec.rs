//! Inline-header span context codec.
//!
//! The single-header propagation format carries the tracer-serialized span
//! context as base64 text under [`OT_SPAN_CONTEXT_HEADER`]. The standard
//! alphabet (`A-Za-z0-9+/=`) contains no bytes illegal in HTTP header
//! values, and decoding what was encoded always reproduces the serialized
//! context byte for byte, so causal lineage survives the round trip.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::PropagationError;

/// Header carrying the base64-encoded serialized span context.
pub const OT_SPAN_CONTEXT_HEADER: &str = "x-ot-span-context";

/// Encode a tracer-serialized span context for the inline header.
pub fn encode_span_context(serialized: &[u8]) -> String {
    STANDARD.encode(serialized)
}

/// Decode an inline header value back into the tracer's serialized form.
pub fn decode_span_context(header_value: &str) -> Result<Vec<u8>, PropagationError> {
    Ok(STANDARD.decode(header_value.as_bytes())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_bytes() {
        let contexts: &[&[u8]] = &[
            b"",
            b"trace-id:span-id",
            &[0x00, 0xff, 0x7f, 0x80, 0x0a, 0x0d],
        ];
        for serialized in contexts {
            let encoded = encode_span_context(serialized);
            assert_eq!(decode_span_context(&encoded).unwrap(), *serialized);
        }
    }

    #[test]
    fn encoded_form_is_header_safe() {
        // Control characters and separators would corrupt the header line.
        let encoded = encode_span_context(&(0u8..=255).collect::<Vec<_>>());
        assert!(encoded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            decode_span_context("not base64!"),
            Err(PropagationError::Base64(_))
        ));
    }
}
