//! Challenge generation.
//!
//! A challenge is 32 bytes of enclave randomness. The challenged block is
//! the first four bytes read as a little-endian `u32`, reduced modulo the
//! block count.

use crate::crypto::RandomSource;
use crate::error::ProtocolError;
use crate::types::{Challenge, HASH_LEN};

/// Draws challenges from a [`RandomSource`].
#[derive(Clone, Debug, Default)]
pub struct ChallengeGenerator<R> {
    random: R,
}

impl<R: RandomSource> ChallengeGenerator<R> {
    pub fn new(random: R) -> Self {
        Self { random }
    }

    /// Fills a fresh 32-byte challenge.
    pub fn generate_random_challenge(&self) -> Result<Challenge, ProtocolError> {
        let mut bytes = [0u8; HASH_LEN];
        self.random.fill(&mut bytes)?;
        Ok(Challenge(bytes))
    }

    /// Draws `count` challenges and their block indices.
    ///
    /// The first failure aborts the batch; no partial result is returned.
    pub fn generate_batch_challenges(
        &self,
        count: usize,
        total_blocks: u32,
    ) -> Result<Vec<(Challenge, u32)>, ProtocolError> {
        if total_blocks == 0 {
            return Err(ProtocolError::NoBlocks);
        }
        (0..count)
            .map(|_| {
                let challenge = self.generate_random_challenge()?;
                let index = calculate_challenge_index(&challenge, total_blocks)?;
                Ok((challenge, index))
            })
            .collect()
    }
}

/// Maps a challenge to a block index in `0..total_blocks`.
pub fn calculate_challenge_index(
    challenge: &Challenge,
    total_blocks: u32,
) -> Result<u32, ProtocolError> {
    if total_blocks == 0 {
        return Err(ProtocolError::NoBlocks);
    }
    let b = challenge.as_bytes();
    let raw = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    Ok(raw % total_blocks)
}
