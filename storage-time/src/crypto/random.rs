//! OS-backed random source.

use rand::RngCore;
use rand::rngs::OsRng;

use super::RandomSource;
use crate::error::CryptoError;

/// [`RandomSource`] backed by the operating system CSPRNG.
///
/// Stands in for an in-enclave hardware generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        let mut rng = OsRng;
        rng.try_fill_bytes(buf)
            .map_err(|e| CryptoError::RandomSource(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_whole_buffer() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsRandomSource.fill(&mut a).expect("os rng available");
        OsRandomSource.fill(&mut b).expect("os rng available");

        // 2^-256 chance of a false failure.
        assert_ne!(a, b);
    }

    #[test]
    fn works_through_a_reference() {
        fn draw<R: RandomSource>(r: R) -> [u8; 8] {
            let mut buf = [0u8; 8];
            r.fill(&mut buf).unwrap();
            buf
        }
        let source = OsRandomSource;
        let _ = draw(&source);
    }
}
