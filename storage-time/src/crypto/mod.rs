//! Cryptographic capabilities consumed by the protocol.
//!
//! The enclave is simulated. Everything the prover and verifiers need from
//! it is expressed as a small trait so a hardware-backed implementation can
//! be dropped in without touching protocol code:
//!
//! - [`RandomSource`]: cryptographically secure randomness,
//! - [`EnclaveSigner`]: signing with a non-exportable key,
//! - [`SignatureVerifier`]: checking an enclave signature against a public
//!   key.
//!
//! Concrete implementations: [`OsRandomSource`], [`SimulatedEnclave`]
//! (ECDSA over P-256 with SHA-256) and [`EcdsaP256Verifier`].

pub mod attestation;
pub mod enclave;
pub mod random;

pub use attestation::AttestationReport;
pub use enclave::{EcdsaP256Verifier, SimulatedEnclave};
pub use random::OsRandomSource;

use crate::error::CryptoError;
use crate::types::{EnclavePublicKey, EnclaveSignature};

/// Source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `buf` entirely, or fails without a partial result.
    fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError>;
}

impl<T: RandomSource + ?Sized> RandomSource for &T {
    fn fill(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        (**self).fill(buf)
    }
}

/// Signing capability of a (simulated) trusted enclave.
pub trait EnclaveSigner: Send + Sync {
    /// Public half of the enclave key pair.
    fn public_key(&self) -> EnclavePublicKey;

    /// Signs `message` with the enclave's secret key.
    fn sign(&self, message: &[u8]) -> Result<EnclaveSignature, CryptoError>;
}

impl<T: EnclaveSigner + ?Sized> EnclaveSigner for &T {
    fn public_key(&self) -> EnclavePublicKey {
        (**self).public_key()
    }

    fn sign(&self, message: &[u8]) -> Result<EnclaveSignature, CryptoError> {
        (**self).sign(message)
    }
}

/// Verification capability for enclave signatures.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `Ok(true)` for a valid signature, `Ok(false)` for a
    /// well-formed but non-matching one, and an error when the key or
    /// signature bytes cannot be parsed.
    fn verify(
        &self,
        public_key: &EnclavePublicKey,
        message: &[u8],
        signature: &EnclaveSignature,
    ) -> Result<bool, CryptoError>;
}
