use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Standard (padded) base64 encoding of raw bytes.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Data URI for an already base64-encoded JPEG payload.
pub fn jpeg_data_uri(base64_payload: &str) -> String {
    format!("data:image/jpeg;base64,{base64_payload}")
}
