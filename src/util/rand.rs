use crate::JweError;

/// A sequential byte generator feeding every random draw in the engine:
/// CEK bytes, IV bytes, the OAEP seed, the RSAES-PKCS1-v1_5 filler and the
/// unwrap blinding fallback all route through `pull`.
///
/// The consumption order within one operation is fixed, so a replayed
/// script can reproduce published test vectors byte for byte.
pub trait RandomSource {
    /// Draw exactly `len` bytes, consuming state sequentially.
    ///
    /// `pull(0)` returns empty without consuming. A source must never
    /// return a short result: running dry is a fatal
    /// [`JweError::RandomSourceExhausted`].
    fn pull(&mut self, len: usize) -> Result<Vec<u8>, JweError>;
}

/// A [`RandomSource`] backed by the OpenSSL CSPRNG. Never exhausts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureRandom;

impl SecureRandom {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for SecureRandom {
    fn pull(&mut self, len: usize) -> Result<Vec<u8>, JweError> {
        let mut vec = vec![0; len];
        openssl::rand::rand_bytes(&mut vec)
            .map_err(|err| JweError::InvalidKeyFormat(err.into()))?;
        Ok(vec)
    }
}

/// A [`RandomSource`] that replays a fixed byte script.
///
/// Used to reproduce test vectors deterministically. Pulling past the end
/// of the script fails rather than returning a short key or IV.
#[derive(Debug, Clone)]
pub struct ReplayRandom {
    script: Vec<u8>,
    position: usize,
}

impl ReplayRandom {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: script.into(),
            position: 0,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len() - self.position
    }
}

impl RandomSource for ReplayRandom {
    fn pull(&mut self, len: usize) -> Result<Vec<u8>, JweError> {
        if len == 0 {
            return Ok(Vec::new());
        }

        let remaining = self.remaining();
        if len > remaining {
            return Err(JweError::RandomSourceExhausted {
                requested: len,
                remaining,
            });
        }

        let vec = self.script[self.position..(self.position + len)].to_vec();
        self.position += len;
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_random_pulls_requested_len() -> anyhow::Result<()> {
        let mut rng = SecureRandom::new();
        assert_eq!(rng.pull(0)?.len(), 0);
        assert_eq!(rng.pull(16)?.len(), 16);
        assert_eq!(rng.pull(64)?.len(), 64);

        Ok(())
    }

    #[test]
    fn replay_random_replays_script_in_order() -> anyhow::Result<()> {
        let mut rng = ReplayRandom::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(rng.pull(2)?, vec![1, 2]);
        assert_eq!(rng.pull(0)?, Vec::<u8>::new());
        assert_eq!(rng.pull(3)?, vec![3, 4, 5]);
        assert_eq!(rng.remaining(), 0);

        Ok(())
    }

    #[test]
    fn replay_random_exhaustion_is_fatal() {
        let mut rng = ReplayRandom::new(vec![1, 2, 3]);
        assert_eq!(rng.pull(2).unwrap(), vec![1, 2]);

        match rng.pull(2) {
            Err(JweError::RandomSourceExhausted {
                requested: 2,
                remaining: 1,
            }) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
