use std::fmt::Display;

use anyhow::bail;
use openssl::hash::MessageDigest;
use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use openssl::symm::{Cipher, Crypter, Mode};
use zeroize::Zeroizing;

use crate::jwe::JweContentEncryption;
use crate::JweError;

const BLOCK_SIZE: usize = 16;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AesCbcHmacJweEncryption {
    /// AES_128_CBC_HMAC_SHA_256 authenticated encryption algorithm
    A128CbcHS256,
    /// AES_256_CBC_HMAC_SHA_512 authenticated encryption algorithm
    A256CbcHS512,
}

impl AesCbcHmacJweEncryption {
    fn cipher(&self) -> Cipher {
        match self {
            Self::A128CbcHS256 => Cipher::aes_128_cbc(),
            Self::A256CbcHS512 => Cipher::aes_256_cbc(),
        }
    }

    fn message_digest(&self) -> MessageDigest {
        match self {
            Self::A128CbcHS256 => MessageDigest::sha256(),
            Self::A256CbcHS512 => MessageDigest::sha512(),
        }
    }

    /// HMAC over AAD || IV || ciphertext || 64-bit big-endian bit length
    /// of the AAD, keyed with the MAC half of the CEK.
    fn sign(
        &self,
        aad: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        mac_key: &[u8],
    ) -> Result<Vec<u8>, JweError> {
        (|| -> anyhow::Result<Vec<u8>> {
            let al = ((aad.len() as u64) * 8).to_be_bytes();

            let pkey = PKey::hmac(mac_key)?;
            let mut signer = Signer::new(self.message_digest(), &pkey)?;
            signer.update(aad)?;
            signer.update(iv)?;
            signer.update(ciphertext)?;
            signer.update(&al)?;
            let signature = signer.sign_to_vec()?;
            Ok(signature)
        })()
        .map_err(JweError::InvalidKeyFormat)
    }

    fn cbc(
        &self,
        mode: Mode,
        enc_key: &[u8],
        iv: &[u8],
        input: &[u8],
    ) -> Result<Vec<u8>, JweError> {
        (|| -> anyhow::Result<Vec<u8>> {
            // PKCS#7 is applied by hand; the cipher runs unpadded
            let mut crypter = Crypter::new(self.cipher(), mode, enc_key, Some(iv))?;
            crypter.pad(false);

            let mut output = vec![0; input.len() + BLOCK_SIZE];
            let mut count = crypter.update(input, &mut output)?;
            count += crypter.finalize(&mut output[count..])?;
            output.truncate(count);
            Ok(output)
        })()
        .map_err(JweError::InvalidKeyFormat)
    }
}

impl JweContentEncryption for AesCbcHmacJweEncryption {
    fn name(&self) -> &str {
        match self {
            Self::A128CbcHS256 => "A128CBC-HS256",
            Self::A256CbcHS512 => "A256CBC-HS512",
        }
    }

    fn key_len(&self) -> usize {
        match self {
            Self::A128CbcHS256 => 32,
            Self::A256CbcHS512 => 64,
        }
    }

    fn iv_len(&self) -> usize {
        16
    }

    fn tag_len(&self) -> usize {
        match self {
            Self::A128CbcHS256 => 16,
            Self::A256CbcHS512 => 32,
        }
    }

    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        message: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JweError> {
        if key.len() != self.key_len() {
            return Err(JweError::InvalidKeyFormat(anyhow::anyhow!(
                "The key size is expected to be {}: {}",
                self.key_len(),
                key.len()
            )));
        }
        if iv.len() != self.iv_len() {
            return Err(JweError::InvalidKeyFormat(anyhow::anyhow!(
                "The iv size is expected to be {}: {}",
                self.iv_len(),
                iv.len()
            )));
        }

        let (mac_key, enc_key) = key.split_at(self.key_len() / 2);

        let padded = Zeroizing::new(pad_pkcs7(message, BLOCK_SIZE));
        let ciphertext = self.cbc(Mode::Encrypt, enc_key, iv, &padded)?;

        let signature = self.sign(aad, iv, &ciphertext, mac_key)?;
        let tag = signature[..self.tag_len()].to_vec();
        Ok((ciphertext, tag))
    }

    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JweError> {
        // every failure mode below collapses into the one generic error;
        // a caller can not tell a tag mismatch from bad padding
        (|| -> Result<Vec<u8>, JweError> {
            if key.len() != self.key_len()
                || iv.len() != self.iv_len()
                || tag.len() != self.tag_len()
                || ciphertext.is_empty()
                || ciphertext.len() % BLOCK_SIZE != 0
            {
                return Err(JweError::DecryptionFailed);
            }

            let (mac_key, enc_key) = key.split_at(self.key_len() / 2);

            // the tag is verified in constant time before any decryption
            let signature = self.sign(aad, iv, ciphertext, mac_key)?;
            if !memcmp::eq(&signature[..self.tag_len()], tag) {
                return Err(JweError::DecryptionFailed);
            }

            let padded = Zeroizing::new(self.cbc(Mode::Decrypt, enc_key, iv, ciphertext)?);
            match unpad_pkcs7(&padded, BLOCK_SIZE) {
                Some(message) => Ok(message),
                None => Err(JweError::DecryptionFailed),
            }
        })()
        .map_err(|_| JweError::DecryptionFailed)
    }

    fn box_clone(&self) -> Box<dyn JweContentEncryption> {
        Box::new(*self)
    }
}

impl Display for AesCbcHmacJweEncryption {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        fmt.write_str(self.name())
    }
}

/// PKCS#7: pad to a multiple of `block_size`; a full extra block is added
/// when the input is already aligned.
pub(crate) fn pad_pkcs7(message: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - message.len() % block_size;
    let mut padded = Vec::with_capacity(message.len() + pad_len);
    padded.extend_from_slice(message);
    padded.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    padded
}

/// PKCS#7 removal: the final byte `p` must satisfy 1 <= p <= block_size
/// and the last `p` bytes must all equal `p`.
pub(crate) fn unpad_pkcs7(padded: &[u8], block_size: usize) -> Option<Vec<u8>> {
    let pad_len = *padded.last()? as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > padded.len() {
        return None;
    }
    if padded[(padded.len() - pad_len)..]
        .iter()
        .any(|&val| val as usize != pad_len)
    {
        return None;
    }
    Some(padded[..(padded.len() - pad_len)].to_vec())
}
