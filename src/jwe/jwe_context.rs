use std::collections::BTreeMap;

use openssl::pkey::{Private, Public};
use openssl::rsa::Rsa;
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use crate::jwe::alg::rsaes::RsaesJweAlgorithm;
use crate::jwe::enc::aes_cbc_hmac::AesCbcHmacJweEncryption;
use crate::jwe::enc::aes_gcm::AesGcmJweEncryption;
use crate::jwe::{JweContentEncryption, JweHeader, JweKeyWrap};
use crate::util::{self, RandomSource};
use crate::JweError;

/// The JWE engine: a registry of the supported key-wrap and content
/// encryption algorithms plus the compact serialization round trip.
///
/// The registries are the closed set of the supported algorithm pairs;
/// every name lookup and every length (CEK, IV, tag) resolves through
/// them.
#[derive(Debug, Clone)]
pub struct JweContext {
    key_wraps: BTreeMap<String, Box<dyn JweKeyWrap>>,
    content_encryptions: BTreeMap<String, Box<dyn JweContentEncryption>>,
}

impl JweContext {
    pub fn new() -> Self {
        Self {
            key_wraps: {
                let key_wraps: Vec<Box<dyn JweKeyWrap>> = vec![
                    Box::new(RsaesJweAlgorithm::Rsa1_5),
                    Box::new(RsaesJweAlgorithm::RsaOaep),
                ];

                let mut map = BTreeMap::new();
                for key_wrap in key_wraps {
                    map.insert(key_wrap.name().to_string(), key_wrap);
                }
                map
            },
            content_encryptions: {
                let content_encryptions: Vec<Box<dyn JweContentEncryption>> = vec![
                    Box::new(AesCbcHmacJweEncryption::A128CbcHS256),
                    Box::new(AesCbcHmacJweEncryption::A256CbcHS512),
                    Box::new(AesGcmJweEncryption::A128Gcm),
                    Box::new(AesGcmJweEncryption::A256Gcm),
                ];

                let mut map = BTreeMap::new();
                for content_encryption in content_encryptions {
                    map.insert(content_encryption.name().to_string(), content_encryption);
                }
                map
            },
        }
    }

    /// Find a registered key-wrap algorithm by name.
    ///
    /// # Arguments
    ///
    /// * `name` - a key-wrap algorithm name (alg)
    pub fn get_key_wrap(&self, name: &str) -> Option<&dyn JweKeyWrap> {
        self.key_wraps.get(name).map(|val| val.as_ref())
    }

    /// Find a registered content encryption method by name.
    ///
    /// # Arguments
    ///
    /// * `name` - a content encryption method name (enc)
    pub fn get_content_encryption(&self, name: &str) -> Option<&dyn JweContentEncryption> {
        self.content_encryptions.get(name).map(|val| val.as_ref())
    }

    /// Return a representation of the data that is formatted by compact
    /// serialization: five dot-joined unpadded base64url segments.
    ///
    /// # Arguments
    ///
    /// * `payload` - The payload data.
    /// * `header` - The JWE header claims; alg and enc are required.
    /// * `public_key` - The recipient's RSA public key.
    /// * `rng` - The randomness source; consumed in fixed order
    ///   (CEK, then IV, then key-wrap randomness).
    pub fn serialize_compact(
        &self,
        payload: &[u8],
        header: &JweHeader,
        public_key: &Rsa<Public>,
        rng: &mut dyn RandomSource,
    ) -> Result<String, JweError> {
        let key_wrap = match header.algorithm() {
            Some(name) => match self.get_key_wrap(name) {
                Some(val) => val,
                None => return Err(JweError::UnsupportedAlgorithm(name.to_string())),
            },
            None => {
                return Err(JweError::UnsupportedAlgorithm(
                    "alg header claim is required".to_string(),
                ))
            }
        };
        let cencryption = match header.content_encryption() {
            Some(name) => match self.get_content_encryption(name) {
                Some(val) => val,
                None => return Err(JweError::UnsupportedAlgorithm(name.to_string())),
            },
            None => {
                return Err(JweError::UnsupportedAlgorithm(
                    "enc header claim is required".to_string(),
                ))
            }
        };

        let key = Zeroizing::new(rng.pull(cencryption.key_len())?);
        let iv = rng.pull(cencryption.iv_len())?;

        let encrypted_key = key_wrap.wrap_key(public_key, &key, rng)?;

        let header_b64 = util::encode_base64_urlsafe_nopad(header.to_vec()?);

        // the AAD is the header segment exactly as it appears in the token
        let (ciphertext, tag) = cencryption.encrypt(&key, &iv, payload, header_b64.as_bytes())?;

        let mut capacity = 4;
        capacity += header_b64.len();
        capacity += util::ceiling(encrypted_key.len() * 4, 3);
        capacity += util::ceiling(iv.len() * 4, 3);
        capacity += util::ceiling(ciphertext.len() * 4, 3);
        capacity += util::ceiling(tag.len() * 4, 3);

        let mut message = String::with_capacity(capacity);
        message.push_str(&header_b64);
        message.push('.');
        util::encode_base64_urlsafe_nopad_buf(&encrypted_key, &mut message);
        message.push('.');
        util::encode_base64_urlsafe_nopad_buf(&iv, &mut message);
        message.push('.');
        util::encode_base64_urlsafe_nopad_buf(&ciphertext, &mut message);
        message.push('.');
        util::encode_base64_urlsafe_nopad_buf(&tag, &mut message);

        Ok(message)
    }

    /// Deserialize the input that is formatted by compact serialization,
    /// trying each private key in order.
    ///
    /// Keys are tried sequentially; the first one that unwraps a CEK
    /// passing the content integrity check wins. Every per-key
    /// cryptographic failure is normalized away, and only after the whole
    /// list is exhausted does the one generic
    /// [`JweError::DecryptionFailed`] surface. Callers modelling key
    /// rotation list the most likely key first.
    ///
    /// # Arguments
    ///
    /// * `rng` - The randomness source for unwrap blinding.
    /// * `private_keys` - The candidate RSA private keys, in trial order.
    /// * `input` - The compact serialization token.
    pub fn deserialize_compact(
        &self,
        rng: &mut dyn RandomSource,
        private_keys: &[Rsa<Private>],
        input: &str,
    ) -> Result<(Vec<u8>, JweHeader), JweError> {
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() != 5 {
            return Err(JweError::MalformedToken);
        }

        let header_b64 = parts[0];
        let header_bytes = util::decode_base64_urlsafe_nopad(header_b64)?;
        let encrypted_key = util::decode_base64_urlsafe_nopad(parts[1])?;
        let iv = util::decode_base64_urlsafe_nopad(parts[2])?;
        let ciphertext = util::decode_base64_urlsafe_nopad(parts[3])?;
        let tag = util::decode_base64_urlsafe_nopad(parts[4])?;

        let claims: Map<String, Value> = serde_json::from_slice(&header_bytes)
            .map_err(|err| JweError::InvalidJson(err.into()))?;
        let header = JweHeader::from_map(claims);

        let key_wrap = match header.algorithm() {
            Some(name) => match self.get_key_wrap(name) {
                Some(val) => val,
                None => return Err(JweError::UnsupportedAlgorithm(name.to_string())),
            },
            None => {
                return Err(JweError::UnsupportedAlgorithm(
                    "alg header claim is required".to_string(),
                ))
            }
        };
        let cencryption = match header.content_encryption() {
            Some(name) => match self.get_content_encryption(name) {
                Some(val) => val,
                None => return Err(JweError::UnsupportedAlgorithm(name.to_string())),
            },
            None => {
                return Err(JweError::UnsupportedAlgorithm(
                    "enc header claim is required".to_string(),
                ))
            }
        };

        // the AAD is the raw first segment, never re-derived from the
        // parsed header
        let aad = header_b64.as_bytes();

        for private_key in private_keys {
            let key = match key_wrap.unwrap_key(
                private_key,
                &encrypted_key,
                cencryption.key_len(),
                rng,
            ) {
                Ok(val) => Zeroizing::new(val),
                // randomness exhaustion is a configuration fault, not a
                // per-key crypto failure
                Err(err @ JweError::RandomSourceExhausted { .. }) => return Err(err),
                Err(_) => continue,
            };

            match cencryption.decrypt(&key, &iv, &ciphertext, aad, &tag) {
                Ok(content) => return Ok((content, header)),
                Err(_) => continue,
            }
        }

        Err(JweError::DecryptionFailed)
    }
}

impl Default for JweContext {
    fn default() -> Self {
        Self::new()
    }
}
