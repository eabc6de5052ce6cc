use std::fmt::Display;

use anyhow::bail;
use openssl::symm::{self, Cipher};

use crate::jwe::JweContentEncryption;
use crate::JweError;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AesGcmJweEncryption {
    /// AES GCM using 128-bit key
    A128Gcm,
    /// AES GCM using 256-bit key
    A256Gcm,
}

impl AesGcmJweEncryption {
    fn cipher(&self) -> Cipher {
        match self {
            Self::A128Gcm => Cipher::aes_128_gcm(),
            Self::A256Gcm => Cipher::aes_256_gcm(),
        }
    }
}

impl JweContentEncryption for AesGcmJweEncryption {
    fn name(&self) -> &str {
        match self {
            Self::A128Gcm => "A128GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    fn key_len(&self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }

    fn iv_len(&self) -> usize {
        12
    }

    fn tag_len(&self) -> usize {
        16
    }

    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        message: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JweError> {
        (|| -> anyhow::Result<(Vec<u8>, Vec<u8>)> {
            if key.len() != self.key_len() {
                bail!(
                    "The key size is expected to be {}: {}",
                    self.key_len(),
                    key.len()
                );
            }
            if iv.len() != self.iv_len() {
                bail!(
                    "The iv size is expected to be {}: {}",
                    self.iv_len(),
                    iv.len()
                );
            }

            let mut tag = vec![0; self.tag_len()];
            let ciphertext =
                symm::encrypt_aead(self.cipher(), key, Some(iv), aad, message, &mut tag)?;
            Ok((ciphertext, tag))
        })()
        .map_err(JweError::InvalidKeyFormat)
    }

    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JweError> {
        // tag verification happens inside the AEAD open; every failure
        // mode reports the same generic error
        (|| -> anyhow::Result<Vec<u8>> {
            if key.len() != self.key_len() {
                bail!("Invalid key size.");
            }
            if iv.len() != self.iv_len() {
                bail!("Invalid iv size.");
            }
            if tag.len() != self.tag_len() {
                bail!("Invalid tag size.");
            }

            let plaintext = symm::decrypt_aead(self.cipher(), key, Some(iv), aad, ciphertext, tag)?;
            Ok(plaintext)
        })()
        .map_err(|_| JweError::DecryptionFailed)
    }

    fn box_clone(&self) -> Box<dyn JweContentEncryption> {
        Box::new(*self)
    }
}

impl Display for AesGcmJweEncryption {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        fmt.write_str(self.name())
    }
}
