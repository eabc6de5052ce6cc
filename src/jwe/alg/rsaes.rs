use std::fmt::Display;

use anyhow::bail;
use openssl::pkey::{Private, Public};
use openssl::rsa::{Padding, Rsa};
use zeroize::Zeroizing;

use crate::jwe::JweKeyWrap;
use crate::util::{HashAlgorithm, RandomSource};
use crate::JweError;

/// RSA key-wrap algorithms: the content encryption key is transported
/// inside an RSA envelope of the recipient's modulus length.
///
/// Both paddings are assembled here over the raw RSA primitive
/// (`Padding::NONE`) so that the seed and filler bytes route through the
/// injectable [`RandomSource`] in a fixed order.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RsaesJweAlgorithm {
    /// RSAES-PKCS1-v1_5
    Rsa1_5,
    /// RSAES OAEP using default parameters (SHA-1 and MGF1 with SHA-1)
    RsaOaep,
}

impl RsaesJweAlgorithm {
    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha1
    }

    fn build_pkcs1_block(
        &self,
        k: usize,
        key: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<Zeroizing<Vec<u8>>, JweError> {
        if key.len() + 11 > k {
            return Err(JweError::InvalidKeyFormat(anyhow::anyhow!(
                "The key is too long for the modulus: {}",
                key.len()
            )));
        }

        let mut em = Zeroizing::new(Vec::with_capacity(k));
        em.push(0x00);
        em.push(0x02);
        for _ in 0..(k - 3 - key.len()) {
            // the filler must be nonzero; resample zero draws
            loop {
                let byte = rng.pull(1)?[0];
                if byte != 0 {
                    em.push(byte);
                    break;
                }
            }
        }
        em.push(0x00);
        em.extend_from_slice(key);
        Ok(em)
    }

    fn open_pkcs1_block(&self, em: &[u8], key_len: usize) -> Option<Vec<u8>> {
        if em.len() < 11 {
            return None;
        }
        if em[0] != 0x00 || em[1] != 0x02 {
            return None;
        }

        // first zero terminates the filler, which must span at least 8 bytes
        let delimiter = em[2..].iter().position(|&val| val == 0)? + 2;
        if delimiter < 10 {
            return None;
        }

        let candidate = &em[(delimiter + 1)..];
        if candidate.len() != key_len {
            return None;
        }
        Some(candidate.to_vec())
    }

    fn build_oaep_block(
        &self,
        k: usize,
        key: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<Zeroizing<Vec<u8>>, JweError> {
        let hash = self.hash_algorithm();
        let h_len = hash.output_len();
        if key.len() + 2 * h_len + 2 > k {
            return Err(JweError::InvalidKeyFormat(anyhow::anyhow!(
                "The key is too long for the modulus: {}",
                key.len()
            )));
        }

        // DB = lHash || PS || 0x01 || K, with an empty label
        let mut db = Zeroizing::new(Vec::with_capacity(k - h_len - 1));
        db.extend_from_slice(&hash.hash(b"")?);
        db.resize(k - key.len() - h_len - 2, 0x00);
        db.push(0x01);
        db.extend_from_slice(key);

        let seed = Zeroizing::new(rng.pull(h_len)?);

        let db_mask = hash.mgf1(&seed, k - h_len - 1)?;
        let masked_db: Vec<u8> = db.iter().zip(&db_mask).map(|(a, b)| a ^ b).collect();

        let seed_mask = hash.mgf1(&masked_db, h_len)?;
        let masked_seed: Vec<u8> = seed.iter().zip(&seed_mask).map(|(a, b)| a ^ b).collect();

        let mut em = Zeroizing::new(Vec::with_capacity(k));
        em.push(0x00);
        em.extend_from_slice(&masked_seed);
        em.extend_from_slice(&masked_db);
        Ok(em)
    }

    fn open_oaep_block(&self, em: &[u8], key_len: usize) -> Option<Vec<u8>> {
        let hash = self.hash_algorithm();
        let h_len = hash.output_len();
        if em.len() < 2 * h_len + 2 {
            return None;
        }

        let masked_seed = &em[1..(1 + h_len)];
        let masked_db = &em[(1 + h_len)..];

        let seed_mask = hash.mgf1(masked_db, h_len).ok()?;
        let seed: Zeroizing<Vec<u8>> = Zeroizing::new(
            masked_seed
                .iter()
                .zip(&seed_mask)
                .map(|(a, b)| a ^ b)
                .collect(),
        );

        let db_mask = hash.mgf1(&seed, em.len() - h_len - 1).ok()?;
        let db: Zeroizing<Vec<u8>> = Zeroizing::new(
            masked_db.iter().zip(&db_mask).map(|(a, b)| a ^ b).collect(),
        );

        let lhash = hash.hash(b"").ok()?;

        // accumulate the structural checks into one flag so each failure
        // mode exits through the same path
        let mut bad = em[0];
        for (a, b) in db[..h_len].iter().zip(&lhash) {
            bad |= a ^ b;
        }

        let mut delimiter = 0;
        for (i, &val) in db[h_len..].iter().enumerate() {
            if val != 0 {
                delimiter = h_len + i;
                break;
            }
        }
        if delimiter == 0 || db[delimiter] != 0x01 {
            return None;
        }

        let candidate = &db[(delimiter + 1)..];
        if bad != 0 || candidate.len() != key_len {
            return None;
        }
        Some(candidate.to_vec())
    }
}

impl JweKeyWrap for RsaesJweAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Rsa1_5 => "RSA1_5",
            Self::RsaOaep => "RSA-OAEP",
        }
    }

    fn wrap_key(
        &self,
        public_key: &Rsa<Public>,
        key: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<u8>, JweError> {
        let k = public_key.size() as usize;
        let em = match self {
            Self::Rsa1_5 => self.build_pkcs1_block(k, key, rng)?,
            Self::RsaOaep => self.build_oaep_block(k, key, rng)?,
        };

        (|| -> anyhow::Result<Vec<u8>> {
            let mut encrypted_key = vec![0; k];
            let len = public_key.public_encrypt(&em, &mut encrypted_key, Padding::NONE)?;
            if len != k {
                bail!("The encrypted key length is expected to be {}: {}", k, len);
            }
            Ok(encrypted_key)
        })()
        .map_err(JweError::InvalidKeyFormat)
    }

    fn unwrap_key(
        &self,
        private_key: &Rsa<Private>,
        encrypted_key: &[u8],
        key_len: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<u8>, JweError> {
        // One blinding draw per attempt, taken before any structural
        // check, so randomness consumption does not depend on the padding
        // outcome. A structurally invalid block yields this fallback key
        // of the expected length instead of an error; the content
        // integrity check downstream then fails the same way as any other
        // wrong-key attempt.
        let fallback = rng.pull(key_len)?;

        let k = private_key.size() as usize;
        if encrypted_key.len() != k {
            return Ok(fallback);
        }

        let mut em = Zeroizing::new(vec![0; k]);
        match private_key.private_decrypt(encrypted_key, &mut em, Padding::NONE) {
            Ok(len) if len == k => {}
            _ => return Ok(fallback),
        }

        let candidate = match self {
            Self::Rsa1_5 => self.open_pkcs1_block(&em, key_len),
            Self::RsaOaep => self.open_oaep_block(&em, key_len),
        };
        Ok(candidate.unwrap_or(fallback))
    }

    fn box_clone(&self) -> Box<dyn JweKeyWrap> {
        Box::new(*self)
    }
}

impl Display for RsaesJweAlgorithm {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        fmt.write_str(self.name())
    }
}
