pub mod hash_algorithm;
pub mod rand;

use base64::Engine as _;
use once_cell::sync::Lazy;

use crate::JweError;

pub use crate::util::hash_algorithm::HashAlgorithm;
pub use crate::util::rand::{RandomSource, ReplayRandom, SecureRandom};

pub(crate) fn ceiling(len: usize, div: usize) -> usize {
    (len + (div - 1)) / div
}

pub(crate) fn is_base64_urlsafe_nopad(input: &str) -> bool {
    static RE_BASE64_URL_SAFE_NOPAD: Lazy<regex::Regex> = Lazy::new(|| {
        regex::Regex::new(
            r"^(?:[A-Za-z0-9_-]{4})*(?:[A-Za-z0-9_-][AQgw]|[A-Za-z0-9_-]{2}[AEIMQUYcgkosw048])?$",
        )
        .unwrap()
    });

    RE_BASE64_URL_SAFE_NOPAD.is_match(input)
}

/// Encode bytes as unpadded base64url (the JOSE segment encoding).
///
/// Empty input encodes to an empty string. The output never contains `=`.
pub fn encode_base64_urlsafe_nopad(input: impl AsRef<[u8]>) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn encode_base64_urlsafe_nopad_buf(input: impl AsRef<[u8]>, output_buf: &mut String) {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode_string(input, output_buf);
}

/// Decode base64url text, with or without trailing `=` padding.
///
/// A remainder of one character after stripping padding has no valid
/// decoding and is rejected, as is any character outside the base64url
/// alphabet.
pub fn decode_base64_urlsafe_nopad(input: &str) -> Result<Vec<u8>, JweError> {
    let trimmed = input.trim_end_matches('=');
    if trimmed.len() % 4 == 1 {
        return Err(JweError::InvalidBase64(anyhow::anyhow!(
            "Invalid base64url length: {}",
            trimmed.len()
        )));
    }
    if !is_base64_urlsafe_nopad(trimmed) {
        return Err(JweError::InvalidBase64(anyhow::anyhow!(
            "Invalid base64url character."
        )));
    }

    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|err| JweError::InvalidBase64(err.into()))
}
