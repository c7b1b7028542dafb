//! Single proof-package verification.
//!
//! Checks run in a fixed order and the first failure short-circuits:
//!
//! 1. enclave signature over the five signed fields,
//! 2. submission time inside `[t_start, t_start + t_slot + max_delay]`,
//! 3. `|rep_snapshot - current_rep| <= delta_rep`,
//! 4. stored `t_slot` matches the slot formula within the tolerance,
//! 5. `merkle_path` is a whole number of 33-byte steps.
//!
//! [`SingleVerifier::verify`] stops there, so the path is only checked for
//! shape. [`SingleVerifier::verify_with_inclusion`] also takes the
//! challenged block's leaf digest and the data root and checks the path
//! against them.

use crate::config::{ReputationParams, VerifierConfig};
use crate::crypto::{EcdsaP256Verifier, SignatureVerifier};
use crate::error::ValidationError;
use crate::merkle::{MerkleTree, PATH_STEP_LEN};
use crate::prover::{SlotSchedule, calculate_challenge_index};
use crate::time::is_time_valid;
use crate::types::{EnclavePublicKey, Hash256, ProofPackage};

/// What a verifier needs to check a package's Merkle path against the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InclusionEvidence {
    /// Leaf digest of the challenged block.
    pub leaf: Hash256,
    /// Root of the data tree the node committed to.
    pub data_root: Hash256,
    /// Number of blocks in the data tree.
    pub total_blocks: u32,
}

/// Verifier for individual [`ProofPackage`]s.
#[derive(Clone, Debug)]
pub struct SingleVerifier<V = EcdsaP256Verifier> {
    schedule: SlotSchedule,
    delta_rep: f64,
    slot_tolerance_secs: u32,
    signatures: V,
}

impl SingleVerifier<EcdsaP256Verifier> {
    pub fn new(params: &ReputationParams, cfg: &VerifierConfig) -> Self {
        Self::with_verifier(params, cfg, EcdsaP256Verifier)
    }
}

impl<V: SignatureVerifier> SingleVerifier<V> {
    /// Builds a verifier using a custom signature backend.
    pub fn with_verifier(params: &ReputationParams, cfg: &VerifierConfig, signatures: V) -> Self {
        Self {
            schedule: SlotSchedule::from_params(params),
            delta_rep: params.delta_rep,
            slot_tolerance_secs: cfg.slot_tolerance_secs,
            signatures,
        }
    }

    pub fn delta_rep(&self) -> f64 {
        self.delta_rep
    }

    fn check_signature(
        &self,
        proof: &ProofPackage,
        public_key: &EnclavePublicKey,
    ) -> Result<(), ValidationError> {
        let message = proof.signing_message();
        match self.signatures.verify(public_key, &message, &proof.enclave_sig) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ValidationError::Invalid("enclave signature mismatch")),
            Err(e) => Err(ValidationError::Custom(format!(
                "enclave signature could not be checked: {e}"
            ))),
        }
    }

    fn check_time(
        &self,
        proof: &ProofPackage,
        submit_ms: u64,
        max_delay_secs: u32,
    ) -> Result<(), ValidationError> {
        if !is_time_valid(proof.t_start, proof.t_slot, submit_ms, max_delay_secs) {
            return Err(ValidationError::Custom(format!(
                "submitted at {submit_ms} ms, outside slot starting {} ms with t_slot={}s and max_delay={}s",
                proof.t_start, proof.t_slot, max_delay_secs
            )));
        }
        Ok(())
    }

    fn check_reputation(
        &self,
        proof: &ProofPackage,
        current_rep: f64,
        tolerance: f64,
    ) -> Result<(), ValidationError> {
        let drift = (proof.rep_snapshot - current_rep).abs();
        // Written so NaN fails.
        if !(drift <= tolerance) {
            return Err(ValidationError::Custom(format!(
                "rep_snapshot={} drifts from current reputation {} by more than {}",
                proof.rep_snapshot, current_rep, tolerance
            )));
        }
        Ok(())
    }

    fn check_slot_length(&self, proof: &ProofPackage) -> Result<(), ValidationError> {
        let expected = self.schedule.slot_length(proof.rep_snapshot);
        if expected.abs_diff(proof.t_slot) > self.slot_tolerance_secs {
            return Err(ValidationError::Custom(format!(
                "t_slot={} does not match expected {} for rep_snapshot={}",
                proof.t_slot, expected, proof.rep_snapshot
            )));
        }
        Ok(())
    }

    fn check_path_format(&self, proof: &ProofPackage) -> Result<(), ValidationError> {
        if proof.merkle_path.len() % PATH_STEP_LEN != 0 {
            return Err(ValidationError::Invalid(
                "merkle_path length is not a multiple of 33 bytes",
            ));
        }
        Ok(())
    }

    fn check_inclusion(
        &self,
        proof: &ProofPackage,
        evidence: &InclusionEvidence,
    ) -> Result<(), ValidationError> {
        let expected_idx = calculate_challenge_index(&proof.random_r, evidence.total_blocks)
            .map_err(|_| ValidationError::Invalid("data tree has no blocks"))?;
        if proof.challenge_idx != expected_idx {
            return Err(ValidationError::Custom(format!(
                "challenge_idx={} but random_r selects block {}",
                proof.challenge_idx, expected_idx
            )));
        }

        let path = proof
            .path()
            .ok_or(ValidationError::Invalid("merkle_path is malformed"))?;
        if path.leaf_index() != Some(u64::from(expected_idx)) {
            return Err(ValidationError::Invalid(
                "merkle_path does not lead to the challenged block",
            ));
        }
        if !MerkleTree::verify_proof(&evidence.leaf, &path, &evidence.data_root) {
            return Err(ValidationError::Invalid(
                "challenged block is not included under the data root",
            ));
        }
        Ok(())
    }

    pub(crate) fn verify_with_tolerance(
        &self,
        proof: &ProofPackage,
        public_key: &EnclavePublicKey,
        current_rep: f64,
        rep_tolerance: f64,
        submit_ms: u64,
        max_delay_secs: u32,
    ) -> Result<(), ValidationError> {
        self.check_signature(proof, public_key)?;
        self.check_time(proof, submit_ms, max_delay_secs)?;
        self.check_reputation(proof, current_rep, rep_tolerance)?;
        self.check_slot_length(proof)?;
        self.check_path_format(proof)?;
        Ok(())
    }

    /// Runs the five package checks.
    pub fn verify(
        &self,
        proof: &ProofPackage,
        public_key: &EnclavePublicKey,
        current_rep: f64,
        submit_ms: u64,
        max_delay_secs: u32,
    ) -> Result<(), ValidationError> {
        let result = self.verify_with_tolerance(
            proof,
            public_key,
            current_rep,
            self.delta_rep,
            submit_ms,
            max_delay_secs,
        );
        match &result {
            Ok(()) => tracing::debug!(slot = proof.time_slot_id, "proof package verified"),
            Err(e) => tracing::debug!(slot = proof.time_slot_id, "proof package rejected: {e}"),
        }
        result
    }

    /// Runs [`SingleVerifier::verify`], then checks the challenged block's
    /// inclusion under `evidence.data_root`.
    pub fn verify_with_inclusion(
        &self,
        proof: &ProofPackage,
        public_key: &EnclavePublicKey,
        current_rep: f64,
        submit_ms: u64,
        max_delay_secs: u32,
        evidence: &InclusionEvidence,
    ) -> Result<(), ValidationError> {
        self.verify(proof, public_key, current_rep, submit_ms, max_delay_secs)?;
        self.check_inclusion(proof, evidence)
    }
}
