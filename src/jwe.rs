pub mod alg;
pub mod enc;

mod jwe_context;
mod jwe_header;

use std::fmt::Debug;

use once_cell::sync::Lazy;
use openssl::pkey::{Private, Public};
use openssl::rsa::Rsa;

pub use crate::jwe::jwe_context::JweContext;
pub use crate::jwe::jwe_header::JweHeader;

pub use crate::jwe::alg::rsaes::RsaesJweAlgorithm::Rsa1_5;
pub use crate::jwe::alg::rsaes::RsaesJweAlgorithm::RsaOaep;

pub use crate::jwe::enc::aes_cbc_hmac::AesCbcHmacJweEncryption::A128CbcHS256;
pub use crate::jwe::enc::aes_cbc_hmac::AesCbcHmacJweEncryption::A256CbcHS512;
pub use crate::jwe::enc::aes_gcm::AesGcmJweEncryption::A128Gcm;
pub use crate::jwe::enc::aes_gcm::AesGcmJweEncryption::A256Gcm;

use crate::util::RandomSource;
use crate::JweError;

static DEFAULT_CONTEXT: Lazy<JweContext> = Lazy::new(JweContext::new);

/// Return a representation of the data that is formatted by compact
/// serialization.
///
/// # Arguments
///
/// * `payload` - The payload data.
/// * `header` - The JWE header claims; alg and enc are required.
/// * `public_key` - The recipient's RSA public key.
/// * `rng` - The randomness source.
pub fn serialize_compact(
    payload: &[u8],
    header: &JweHeader,
    public_key: &Rsa<Public>,
    rng: &mut dyn RandomSource,
) -> Result<String, JweError> {
    DEFAULT_CONTEXT.serialize_compact(payload, header, public_key, rng)
}

/// Deserialize the input that is formatted by compact serialization,
/// trying each private key in order.
///
/// # Arguments
///
/// * `rng` - The randomness source for unwrap blinding.
/// * `private_keys` - The candidate RSA private keys, in trial order.
/// * `input` - The compact serialization token.
pub fn deserialize_compact(
    rng: &mut dyn RandomSource,
    private_keys: &[Rsa<Private>],
    input: &str,
) -> Result<(Vec<u8>, JweHeader), JweError> {
    DEFAULT_CONTEXT.deserialize_compact(rng, private_keys, input)
}

/// A key-wrap algorithm: transports the content encryption key inside an
/// envelope under the recipient's key.
pub trait JweKeyWrap: Debug + Send + Sync {
    /// Return the name of this algorithm (the alg header claim value).
    fn name(&self) -> &str;

    /// Wrap a content encryption key under the recipient's public key.
    fn wrap_key(
        &self,
        public_key: &Rsa<Public>,
        key: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<u8>, JweError>;

    /// Unwrap a candidate content encryption key of `key_len` bytes.
    ///
    /// A structurally invalid envelope still yields a candidate of the
    /// right length (drawn from `rng`), so the caller's integrity check
    /// is always reached and a padding failure is indistinguishable from
    /// a wrong key.
    fn unwrap_key(
        &self,
        private_key: &Rsa<Private>,
        encrypted_key: &[u8],
        key_len: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<u8>, JweError>;

    fn box_clone(&self) -> Box<dyn JweKeyWrap>;
}

impl Clone for Box<dyn JweKeyWrap> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A content encryption method: seals and opens the payload under the
/// content encryption key, authenticating the AAD.
pub trait JweContentEncryption: Debug + Send + Sync {
    /// Return the name of this method (the enc header claim value).
    fn name(&self) -> &str;

    fn key_len(&self) -> usize;

    fn iv_len(&self) -> usize;

    fn tag_len(&self) -> usize;

    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        message: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JweError>;

    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JweError>;

    fn box_clone(&self) -> Box<dyn JweContentEncryption>;
}

impl Clone for Box<dyn JweContentEncryption> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use openssl::pkey::{Private, Public};
    use openssl::rsa::Rsa;

    use crate::jwe::{self, JweHeader};
    use crate::util::{self, RandomSource, ReplayRandom, SecureRandom};
    use crate::JweError;

    fn keypair() -> Result<(Rsa<Public>, Rsa<Private>)> {
        let private_key = Rsa::generate(2048)?;
        let public_key = Rsa::from_public_components(
            private_key.n().to_owned()?,
            private_key.e().to_owned()?,
        )?;
        Ok((public_key, private_key))
    }

    #[test]
    fn serialize_and_deserialize_compact() -> Result<()> {
        let (public_key, private_key) = keypair()?;
        let payload = b"The true sign of intelligence is not knowledge but imagination.";

        let mut rng = SecureRandom::new();
        for alg in ["RSA1_5", "RSA-OAEP"] {
            for enc in ["A128CBC-HS256", "A256CBC-HS512", "A128GCM", "A256GCM"] {
                let mut header = JweHeader::new();
                header.set_algorithm(alg);
                header.set_content_encryption(enc);

                let token = jwe::serialize_compact(payload, &header, &public_key, &mut rng)?;
                assert_eq!(token.split('.').count(), 5);
                assert!(!token.contains('='));

                let (decoded, decoded_header) = jwe::deserialize_compact(
                    &mut rng,
                    std::slice::from_ref(&private_key),
                    &token,
                )?;
                assert_eq!(decoded, payload);
                assert_eq!(decoded_header, header);
            }
        }

        Ok(())
    }

    #[test]
    fn header_segment_matches_reference() -> Result<()> {
        let (public_key, _) = keypair()?;

        let mut header = JweHeader::new();
        header.set_algorithm("RSA-OAEP");
        header.set_content_encryption("A256GCM");

        let mut rng = SecureRandom::new();
        let token = jwe::serialize_compact(b"payload", &header, &public_key, &mut rng)?;

        // RFC 7516 appendix A.1 protected header segment
        assert_eq!(
            token.split('.').next().unwrap(),
            "eyJhbGciOiJSU0EtT0FFUCIsImVuYyI6IkEyNTZHQ00ifQ"
        );

        Ok(())
    }

    #[test]
    fn serialize_is_deterministic_with_replayed_randomness() -> Result<()> {
        let (public_key, private_key) = keypair()?;

        let mut header = JweHeader::new();
        header.set_algorithm("RSA-OAEP");
        header.set_content_encryption("A256GCM");

        // 32 CEK bytes, then 12 IV bytes, then the 20-byte OAEP seed
        let script: Vec<u8> = (0u8..64).collect();

        let first = jwe::serialize_compact(
            b"payload",
            &header,
            &public_key,
            &mut ReplayRandom::new(script.clone()),
        )?;
        let mut replay = ReplayRandom::new(script);
        let second = jwe::serialize_compact(b"payload", &header, &public_key, &mut replay)?;
        assert_eq!(first, second);
        assert_eq!(replay.remaining(), 0);

        let mut rng = SecureRandom::new();
        let (decoded, _) =
            jwe::deserialize_compact(&mut rng, std::slice::from_ref(&private_key), &first)?;
        assert_eq!(decoded, b"payload");

        Ok(())
    }

    #[test]
    fn deserialize_tries_each_key_in_order() -> Result<()> {
        let (public_key, private_key) = keypair()?;
        let (_, wrong_key) = keypair()?;

        let mut header = JweHeader::new();
        header.set_algorithm("RSA1_5");
        header.set_content_encryption("A128CBC-HS256");

        let mut rng = SecureRandom::new();
        let token = jwe::serialize_compact(b"rotated", &header, &public_key, &mut rng)?;

        let keys = vec![wrong_key, private_key];
        let (decoded, decoded_header) = jwe::deserialize_compact(&mut rng, &keys, &token)?;
        assert_eq!(decoded, b"rotated");
        assert_eq!(decoded_header, header);

        Ok(())
    }

    #[test]
    fn deserialize_with_only_wrong_keys_fails_generically() -> Result<()> {
        let (public_key, _) = keypair()?;
        let (_, wrong_key1) = keypair()?;
        let (_, wrong_key2) = keypair()?;

        let mut header = JweHeader::new();
        header.set_algorithm("RSA-OAEP");
        header.set_content_encryption("A128GCM");

        let mut rng = SecureRandom::new();
        let token = jwe::serialize_compact(b"secret", &header, &public_key, &mut rng)?;

        assert!(matches!(
            jwe::deserialize_compact(&mut rng, &[wrong_key1, wrong_key2], &token),
            Err(JweError::DecryptionFailed)
        ));

        Ok(())
    }

    #[test]
    fn tampered_segments_fail_with_the_generic_error() -> Result<()> {
        let (public_key, private_key) = keypair()?;

        let mut header = JweHeader::new();
        header.set_algorithm("RSA-OAEP");
        header.set_content_encryption("A256CBC-HS512");
        header.set_key_id("key-1");

        let mut rng = SecureRandom::new();
        let token = jwe::serialize_compact(b"do not tamper", &header, &public_key, &mut rng)?;
        let keys = vec![private_key];

        // flip one bit inside each binary segment in turn
        for segment in 1..5 {
            let mut parts: Vec<String> = token.split('.').map(|val| val.to_string()).collect();
            let mut bytes = util::decode_base64_urlsafe_nopad(&parts[segment])?;
            bytes[0] ^= 0x01;
            parts[segment] = util::encode_base64_urlsafe_nopad(&bytes);
            let tampered = parts.join(".");

            assert!(
                matches!(
                    jwe::deserialize_compact(&mut rng, &keys, &tampered),
                    Err(JweError::DecryptionFailed)
                ),
                "segment {} tampering was not caught generically",
                segment
            );
        }

        // a header segment that re-encodes a modified claim no longer
        // matches the authenticated AAD
        let mut parts: Vec<String> = token.split('.').map(|val| val.to_string()).collect();
        let mut tampered_header = JweHeader::from_bytes(&util::decode_base64_urlsafe_nopad(
            &parts[0],
        )?)?;
        tampered_header.set_key_id("key-2");
        parts[0] = util::encode_base64_urlsafe_nopad(tampered_header.to_vec()?);
        let tampered = parts.join(".");

        assert!(matches!(
            jwe::deserialize_compact(&mut rng, &keys, &tampered),
            Err(JweError::DecryptionFailed)
        ));

        Ok(())
    }

    #[test]
    fn deserialize_rejects_wrong_segment_count() {
        let mut rng = SecureRandom::new();
        for input in ["", "a.b.c.d", "a.b.c.d.e.f"] {
            assert!(matches!(
                jwe::deserialize_compact(&mut rng, &[], input),
                Err(JweError::MalformedToken)
            ));
        }
    }

    #[test]
    fn deserialize_rejects_unknown_algorithms() -> Result<()> {
        let mut rng = SecureRandom::new();

        let mut header = JweHeader::new();
        header.set_algorithm("ECDH-ES");
        header.set_content_encryption("A256GCM");
        let header_b64 = util::encode_base64_urlsafe_nopad(header.to_vec()?);
        let token = format!("{}....", header_b64);
        match jwe::deserialize_compact(&mut rng, &[], &token) {
            Err(JweError::UnsupportedAlgorithm(name)) => assert_eq!(name, "ECDH-ES"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }

        let mut header = JweHeader::new();
        header.set_algorithm("RSA-OAEP");
        header.set_content_encryption("A192GCM");
        let header_b64 = util::encode_base64_urlsafe_nopad(header.to_vec()?);
        let token = format!("{}....", header_b64);
        match jwe::deserialize_compact(&mut rng, &[], &token) {
            Err(JweError::UnsupportedAlgorithm(name)) => assert_eq!(name, "A192GCM"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }

        Ok(())
    }

    #[test]
    fn serialize_fails_on_exhausted_random_source() -> Result<()> {
        let (public_key, _) = keypair()?;

        let mut header = JweHeader::new();
        header.set_algorithm("RSA-OAEP");
        header.set_content_encryption("A256GCM");

        // too short for CEK + IV + OAEP seed
        let mut rng = ReplayRandom::new(vec![0; 40]);
        assert!(matches!(
            jwe::serialize_compact(b"payload", &header, &public_key, &mut rng),
            Err(JweError::RandomSourceExhausted { .. })
        ));

        Ok(())
    }
}
