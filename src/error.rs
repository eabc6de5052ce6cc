use thiserror::Error;

/// Errors reported by the JWE engine.
///
/// Structural failures (base64, segment count, header JSON, unknown
/// algorithm names) are reported specifically because they involve no
/// secret-dependent branching. Every cryptographic failure during
/// decryption collapses into the payload-free `DecryptionFailed` variant.
#[derive(Error, Debug)]
pub enum JweError {
    #[error("Invalid base64url text: {0}")]
    InvalidBase64(anyhow::Error),

    #[error("Invalid compact JWE format.")]
    MalformedToken,

    #[error("Invalid json format: {0}")]
    InvalidJson(anyhow::Error),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Decryption failed.")]
    DecryptionFailed,

    #[error("Random source exhausted: requested {requested} bytes, {remaining} remaining.")]
    RandomSourceExhausted { requested: usize, remaining: usize },

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(anyhow::Error),
}
