//! Simulated remote-attestation report.
//!
//! Layout: `report_type (1) || enclave public key (65) || quote filler (64)`.
//! Verification checks the shape and that the embedded key matches. There
//! is no quote signature and no hardware root of trust behind it.

use crate::types::{EnclavePublicKey, PUBLIC_KEY_LEN};

/// Report type byte of a simulated EPID-style report.
pub const SIMULATED_REPORT_TYPE: u8 = 0x01;

const QUOTE_LEN: usize = 64;
const QUOTE_FILLER: u8 = 0xAA;

/// Total length of a simulated report.
pub const REPORT_LEN: usize = 1 + PUBLIC_KEY_LEN + QUOTE_LEN;

/// Simulated attestation report binding an enclave public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttestationReport(pub Vec<u8>);

impl AttestationReport {
    /// Creates the report for `public_key`.
    pub fn create(public_key: &EnclavePublicKey) -> Self {
        let mut report = Vec::with_capacity(REPORT_LEN);
        report.push(SIMULATED_REPORT_TYPE);
        report.extend_from_slice(public_key.as_bytes());
        report.resize(REPORT_LEN, QUOTE_FILLER);
        AttestationReport(report)
    }

    /// Public key embedded in the report, if the report is well-formed.
    pub fn public_key(&self) -> Option<EnclavePublicKey> {
        if self.0.len() != REPORT_LEN || self.0[0] != SIMULATED_REPORT_TYPE {
            return None;
        }
        let bytes: [u8; PUBLIC_KEY_LEN] = self.0[1..1 + PUBLIC_KEY_LEN].try_into().ok()?;
        Some(EnclavePublicKey(bytes))
    }

    /// Returns `true` if the report is well-formed and binds `expected`.
    pub fn verify(&self, expected: &EnclavePublicKey) -> bool {
        self.public_key().is_some_and(|pk| pk == *expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EnclaveSigner, OsRandomSource, SimulatedEnclave};

    #[test]
    fn provisioned_report_binds_enclave_key() {
        let (enclave, report) = SimulatedEnclave::provision(&OsRandomSource).unwrap();

        assert_eq!(report.0.len(), REPORT_LEN);
        assert!(report.verify(&enclave.public_key()));
    }

    #[test]
    fn report_for_other_key_is_rejected() {
        let report = AttestationReport::create(&EnclavePublicKey([4u8; PUBLIC_KEY_LEN]));
        assert!(!report.verify(&EnclavePublicKey([5u8; PUBLIC_KEY_LEN])));
    }

    #[test]
    fn truncated_report_is_rejected() {
        let pk = EnclavePublicKey([4u8; PUBLIC_KEY_LEN]);
        let mut report = AttestationReport::create(&pk);
        report.0.pop();
        assert!(!report.verify(&pk));
        assert_eq!(report.public_key(), None);
    }
}
