//! Simulated enclave key pair (ECDSA P-256 / SHA-256).
//!
//! The secret key never leaves [`SimulatedEnclave`]; callers only see the
//! 65-byte SEC1 uncompressed public key and 64-byte `r || s` signatures.
//! Messages are hashed with SHA-256 as part of signing.

use std::fmt;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

use super::attestation::AttestationReport;
use super::{EnclaveSigner, RandomSource, SignatureVerifier};
use crate::error::CryptoError;
use crate::types::{
    EnclavePublicKey, EnclaveSignature, HASH_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN,
};

/// Simulated enclave holding a P-256 signing key.
pub struct SimulatedEnclave {
    signing_key: SigningKey,
    public_key: EnclavePublicKey,
}

impl SimulatedEnclave {
    /// Generates a fresh key pair from `random`.
    pub fn generate<R: RandomSource>(random: &R) -> Result<Self, CryptoError> {
        let mut secret = [0u8; HASH_LEN];
        random.fill(&mut secret)?;
        Self::from_secret_bytes(&secret)
    }

    /// Rebuilds an enclave from a 32-byte secret scalar.
    pub fn from_secret_bytes(secret: &[u8; HASH_LEN]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
        let public_key = encode_public_key(signing_key.verifying_key())?;
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    /// Generates a key pair and the matching simulated attestation report.
    pub fn provision<R: RandomSource>(random: &R) -> Result<(Self, AttestationReport), CryptoError> {
        let enclave = Self::generate(random)?;
        let report = AttestationReport::create(&enclave.public_key);
        Ok((enclave, report))
    }
}

impl fmt::Debug for SimulatedEnclave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedEnclave")
            .field("public_key", &hex::encode(self.public_key.as_bytes()))
            .finish_non_exhaustive()
    }
}

impl EnclaveSigner for SimulatedEnclave {
    fn public_key(&self) -> EnclavePublicKey {
        self.public_key
    }

    fn sign(&self, message: &[u8]) -> Result<EnclaveSignature, CryptoError> {
        let signature: Signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&bytes);
        Ok(EnclaveSignature(out))
    }
}

fn encode_public_key(key: &VerifyingKey) -> Result<EnclavePublicKey, CryptoError> {
    let point = key.to_encoded_point(false);
    let bytes: [u8; PUBLIC_KEY_LEN] = point
        .as_bytes()
        .try_into()
        .map_err(|_| CryptoError::MalformedKey("unexpected SEC1 point length".to_string()))?;
    Ok(EnclavePublicKey(bytes))
}

/// ECDSA P-256 / SHA-256 implementation of [`SignatureVerifier`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaP256Verifier;

impl SignatureVerifier for EcdsaP256Verifier {
    fn verify(
        &self,
        public_key: &EnclavePublicKey,
        message: &[u8],
        signature: &EnclaveSignature,
    ) -> Result<bool, CryptoError> {
        let key = VerifyingKey::from_sec1_bytes(public_key.as_bytes())
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
        let sig = Signature::from_slice(signature.as_bytes())
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        Ok(key.verify(message, &sig).is_ok())
    }
}
