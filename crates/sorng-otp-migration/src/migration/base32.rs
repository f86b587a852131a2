//! RFC 4648 base-32 for OTP secrets.
//!
//! [`decode`] is deliberately lenient: it accepts any case, drops trailing
//! `=` padding and silently skips characters outside `A–Z2–7`, so secrets
//! typed with spaces or copied with stray punctuation still import.
//! [`decode_strict`] is the variant used on export, where a malformed
//! secret must surface as an error instead of a broken QR code.

use crate::migration::types::*;

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

fn in_alphabet(c: char) -> bool {
    matches!(c, 'A'..='Z' | '2'..='7')
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode(bytes: &[u8]) -> String {
    base32::encode(ALPHABET, bytes)
}

/// Decode base-32 text, skipping anything the alphabet does not contain.
///
/// A trailing group of fewer than eight bits is discarded. Never fails.
pub fn decode(text: &str) -> Vec<u8> {
    let cleaned: String = text
        .trim_end_matches('=')
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| in_alphabet(*c))
        .collect();
    base32::decode(ALPHABET, &cleaned).unwrap_or_default()
}

/// Uppercase the secret and strip spaces and dashes.
pub fn normalise(text: &str) -> String {
    text.replace(' ', "").replace('-', "").to_uppercase()
}

/// Decode a secret that must be well-formed base-32.
///
/// Spaces and dashes are allowed as separators and trailing `=` padding is
/// ignored; any other character outside the alphabet is an error, as is a
/// secret that decodes to no bytes.
pub fn decode_strict(text: &str) -> Result<Vec<u8>, MigrationError> {
    let normalised = normalise(text);
    let body = normalised.trim_end_matches('=');
    if body.is_empty() {
        return Err(MigrationError::new(
            MigrationErrorKind::InvalidSecret,
            "Secret is empty",
        ));
    }
    if let Some(pos) = body.chars().position(|c| !in_alphabet(c)) {
        return Err(MigrationError::new(
            MigrationErrorKind::InvalidSecret,
            "Secret is not valid base-32",
        )
        .with_detail(format!("unexpected character at position {}", pos)));
    }
    let bytes = base32::decode(ALPHABET, body).ok_or_else(|| {
        MigrationError::new(MigrationErrorKind::InvalidSecret, "Secret is not valid base-32")
    })?;
    if bytes.is_empty() {
        return Err(MigrationError::new(
            MigrationErrorKind::InvalidSecret,
            "Secret is shorter than one byte",
        ));
    }
    Ok(bytes)
}

/// Check whether `text` would pass [`decode_strict`].
pub fn is_valid(text: &str) -> bool {
    decode_strict(text).is_ok()
}
