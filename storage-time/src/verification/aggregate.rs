//! Segment-credential verification and randomized spot-checks.
//!
//! [`AggregateVerifier::verify`] checks that a node's credential list
//! covers slots `0..=n` without gaps or overlap and that the reputation
//! band never jumps upward by more than the continuity tolerance between
//! neighbours. [`AggregateVerifier::spot_check`] recomputes one
//! credential's commitments from the packages it covers and re-verifies a
//! random sample of them.

use rand::Rng;
use rand::seq::index;

use super::single::SingleVerifier;
use crate::config::{ReputationParams, VerifierConfig};
use crate::crypto::{EcdsaP256Verifier, SignatureVerifier};
use crate::error::ValidationError;
use crate::prover::segment_commitment;
use crate::types::{EnclavePublicKey, ProofPackage, SegmentCredential};

/// Verifier for segment credentials.
#[derive(Clone, Debug)]
pub struct AggregateVerifier<V = EcdsaP256Verifier> {
    single: SingleVerifier<V>,
    rep_continuity_tolerance: f64,
    spot_check_count: usize,
    max_delay_secs: u32,
}

impl AggregateVerifier<EcdsaP256Verifier> {
    pub fn new(params: &ReputationParams, cfg: &VerifierConfig) -> Self {
        Self::with_single(SingleVerifier::new(params, cfg), cfg)
    }
}

impl<V: SignatureVerifier> AggregateVerifier<V> {
    /// Builds an aggregate verifier around an existing single verifier.
    pub fn with_single(single: SingleVerifier<V>, cfg: &VerifierConfig) -> Self {
        Self {
            single,
            rep_continuity_tolerance: cfg.rep_continuity_tolerance,
            spot_check_count: cfg.spot_check_count,
            max_delay_secs: cfg.max_delay_secs,
        }
    }

    pub fn single(&self) -> &SingleVerifier<V> {
        &self.single
    }

    pub fn max_delay_secs(&self) -> u32 {
        self.max_delay_secs
    }

    /// Default number of packages sampled by [`AggregateVerifier::spot_check`].
    pub fn spot_check_count(&self) -> usize {
        self.spot_check_count
    }

    fn check_bounds(&self, cred: &SegmentCredential) -> Result<(), ValidationError> {
        if cred.epoch_start > cred.epoch_end {
            return Err(ValidationError::Custom(format!(
                "epoch_start={} is after epoch_end={}",
                cred.epoch_start, cred.epoch_end
            )));
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&cred.rep_low) || !unit.contains(&cred.rep_high) {
            return Err(ValidationError::Invalid("reputation band outside [0, 1]"));
        }
        if cred.rep_low > cred.rep_high {
            return Err(ValidationError::Invalid("rep_low exceeds rep_high"));
        }
        Ok(())
    }

    fn check_link(
        &self,
        prev: Option<&SegmentCredential>,
        cred: &SegmentCredential,
    ) -> Result<(), ValidationError> {
        let Some(prev) = prev else {
            if cred.epoch_start != 0 {
                return Err(ValidationError::Custom(format!(
                    "first credential starts at epoch {}, expected 0",
                    cred.epoch_start
                )));
            }
            return Ok(());
        };

        if prev.epoch_end.checked_add(1) != Some(cred.epoch_start) {
            return Err(ValidationError::Custom(format!(
                "epoch gap or overlap: previous ends at {}, next starts at {}",
                prev.epoch_end, cred.epoch_start
            )));
        }
        if cred.rep_low > prev.rep_high + self.rep_continuity_tolerance {
            return Err(ValidationError::Custom(format!(
                "reputation jumps from rep_high={} to rep_low={}",
                prev.rep_high, cred.rep_low
            )));
        }
        Ok(())
    }

    /// Checks that `cred` can be appended after `prev` (`None` = first).
    pub fn verify_extends(
        &self,
        prev: Option<&SegmentCredential>,
        cred: &SegmentCredential,
    ) -> Result<(), ValidationError> {
        self.check_bounds(cred)?;
        self.check_link(prev, cred)
    }

    /// Checks a chronologically ordered, non-empty credential list.
    pub fn verify(&self, credentials: &[SegmentCredential]) -> Result<(), ValidationError> {
        if credentials.is_empty() {
            return Err(ValidationError::Invalid("credential list is empty"));
        }

        let mut prev = None;
        for cred in credentials {
            self.verify_extends(prev, cred)?;
            prev = Some(cred);
        }
        Ok(())
    }

    fn check_coverage(
        &self,
        cred: &SegmentCredential,
        proofs: &[ProofPackage],
    ) -> Result<(), ValidationError> {
        let expected = cred
            .slot_count()
            .ok_or(ValidationError::Invalid("epoch_start is after epoch_end"))?;
        if proofs.len() as u64 != expected {
            return Err(ValidationError::Custom(format!(
                "segment covers {expected} slots but {} packages were supplied",
                proofs.len()
            )));
        }
        if proofs.first().map(|p| p.time_slot_id) != Some(cred.epoch_start) {
            return Err(ValidationError::Invalid(
                "first package does not start the segment",
            ));
        }
        Ok(())
    }

    fn check_commitment(
        &self,
        cred: &SegmentCredential,
        proofs: &[ProofPackage],
    ) -> Result<(), ValidationError> {
        let (seg_root, anchor_hash) = segment_commitment(proofs)
            .map_err(|e| ValidationError::Custom(format!("cannot recompute segment: {e}")))?;
        if seg_root != cred.seg_root {
            return Err(ValidationError::Invalid("seg_root mismatch"));
        }
        if anchor_hash != cred.anchor_hash {
            return Err(ValidationError::Invalid("anchor_hash mismatch"));
        }
        Ok(())
    }

    fn check_sampled(
        &self,
        cred: &SegmentCredential,
        proofs: &[ProofPackage],
        i: usize,
        public_key: &EnclavePublicKey,
    ) -> Result<(), ValidationError> {
        let proof = &proofs[i];
        if let Some(prev) = i.checked_sub(1).map(|j| &proofs[j]) {
            if !proof.follows(prev) {
                return Err(ValidationError::Custom(format!(
                    "package {} is not chained to its predecessor",
                    proof.time_slot_id
                )));
            }
        }
        if !(cred.rep_low..=cred.rep_high).contains(&proof.rep_snapshot) {
            return Err(ValidationError::Custom(format!(
                "rep_snapshot={} outside band [{}, {}]",
                proof.rep_snapshot, cred.rep_low, cred.rep_high
            )));
        }

        // Re-verified as if submitted at slot start, against the band
        // midpoint; the band half-width widens the drift tolerance.
        let midpoint = cred.rep_midpoint();
        let tolerance = self
            .single
            .delta_rep()
            .max((cred.rep_high - cred.rep_low) / 2.0);
        self.single.verify_with_tolerance(
            proof,
            public_key,
            midpoint,
            tolerance,
            proof.t_start,
            self.max_delay_secs,
        )
    }

    /// Spot-checks `cred` with `check_count` samples drawn from `rng`.
    pub fn spot_check_with_rng<G: Rng + ?Sized>(
        &self,
        cred: &SegmentCredential,
        proofs: &[ProofPackage],
        public_key: &EnclavePublicKey,
        check_count: usize,
        rng: &mut G,
    ) -> Result<(), ValidationError> {
        if check_count == 0 {
            return Err(ValidationError::Invalid(
                "spot-check requires at least one sample",
            ));
        }
        if proofs.is_empty() {
            return Err(ValidationError::Invalid("no packages supplied for segment"));
        }
        self.check_bounds(cred)?;
        self.check_coverage(cred, proofs)?;
        self.check_commitment(cred, proofs)?;

        let amount = check_count.min(proofs.len());
        for i in index::sample(rng, proofs.len(), amount) {
            if let Err(e) = self.check_sampled(cred, proofs, i, public_key) {
                tracing::warn!(
                    epoch_start = cred.epoch_start,
                    epoch_end = cred.epoch_end,
                    sampled = i,
                    "spot-check failed: {e}"
                );
                return Err(e);
            }
        }

        tracing::debug!(
            epoch_start = cred.epoch_start,
            epoch_end = cred.epoch_end,
            sampled = amount,
            "spot-check passed"
        );
        Ok(())
    }

    /// Spot-checks `cred` with the configured sample size and an
    /// unpredictable thread-local RNG.
    pub fn spot_check(
        &self,
        cred: &SegmentCredential,
        proofs: &[ProofPackage],
        public_key: &EnclavePublicKey,
    ) -> Result<(), ValidationError> {
        self.spot_check_with_rng(
            cred,
            proofs,
            public_key,
            self.spot_check_count,
            &mut rand::thread_rng(),
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::crypto::{EnclaveSigner, SimulatedEnclave};
    use crate::merkle::MerkleTree;
    use crate::prover::challenge::tests::CountingRandom;
    use crate::prover::{ProofBuilder, ProofChain, SlotSchedule};
    use crate::types::{AnchorHash, HASH_LEN, Hash256, ProofHash};

    const T0: u64 = 1_700_000_000_000;

    fn dummy_credential(start: u64, end: u64, low: f64, high: f64) -> SegmentCredential {
        SegmentCredential {
            rep_low: low,
            rep_high: high,
            epoch_start: start,
            epoch_end: end,
            seg_root: Hash256([1u8; HASH_LEN]),
            anchor_hash: AnchorHash::from_ends(&ProofHash::GENESIS, &ProofHash::GENESIS),
        }
    }

    fn dummy_verifier() -> AggregateVerifier {
        AggregateVerifier::new(&ReputationParams::default(), &VerifierConfig::default())
    }

    fn expect_custom(err: ValidationError, needle: &str) {
        match err {
            ValidationError::Custom(msg) => {
                assert!(msg.contains(needle), "unexpected message: {msg}")
            }
            _ => panic!("unexpected error variant: {err:?}"),
        }
    }

    /// Proves `reps.len()` slots and folds them into one segment.
    fn dummy_segment(reps: &[f64]) -> (SimulatedEnclave, SegmentCredential, Vec<ProofPackage>) {
        let tree = MerkleTree::new((0..4u8).map(|i| Hash256([i; HASH_LEN])).collect());
        let enclave = SimulatedEnclave::from_secret_bytes(&[0x55; HASH_LEN]).unwrap();
        let builder = ProofBuilder::new(SlotSchedule::default(), CountingRandom::default());
        let mut chain = ProofChain::new(builder, &enclave, tree, 1.0, reps[0], T0);
        for rep in reps {
            assert!(chain.prove_slot(*rep).unwrap().closed.is_none());
        }
        let closed = chain.flush().unwrap().expect("pending packages");
        drop(chain);
        (enclave, closed.credential, closed.proofs)
    }

    #[test]
    fn contiguous_list_is_accepted() {
        let v = dummy_verifier();
        let creds = vec![
            dummy_credential(0, 4, 0.4, 0.5),
            dummy_credential(5, 5, 0.5, 0.6),
            dummy_credential(6, 9, 0.3, 0.5),
        ];
        v.verify(&creds).unwrap();
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = dummy_verifier().verify(&[]).unwrap_err();
        assert!(matches!(err, ValidationError::Invalid("credential list is empty")));
    }

    #[test]
    fn list_must_start_at_epoch_zero() {
        let err = dummy_verifier()
            .verify(&[dummy_credential(1, 4, 0.4, 0.5)])
            .unwrap_err();
        expect_custom(err, "expected 0");
    }

    #[test]
    fn gaps_and_overlaps_are_rejected() {
        let v = dummy_verifier();

        let gap = vec![dummy_credential(0, 4, 0.4, 0.5), dummy_credential(6, 9, 0.4, 0.5)];
        expect_custom(v.verify(&gap).unwrap_err(), "gap or overlap");

        let overlap = vec![dummy_credential(0, 4, 0.4, 0.5), dummy_credential(4, 9, 0.4, 0.5)];
        expect_custom(v.verify(&overlap).unwrap_err(), "gap or overlap");
    }

    #[test]
    fn inverted_bounds_and_bands_are_rejected() {
        let v = dummy_verifier();
        expect_custom(
            v.verify(&[dummy_credential(0, 0, 0.4, 0.5), dummy_credential(3, 1, 0.4, 0.5)])
                .unwrap_err(),
            "is after",
        );
        assert!(v.verify(&[dummy_credential(0, 2, 0.6, 0.5)]).is_err());
        assert!(v.verify(&[dummy_credential(0, 2, 0.5, 1.2)]).is_err());
    }

    #[test]
    fn upward_reputation_jump_is_rejected() {
        let v = dummy_verifier();
        let jump = vec![dummy_credential(0, 4, 0.4, 0.5), dummy_credential(5, 9, 0.502, 0.6)];
        expect_custom(v.verify(&jump).unwrap_err(), "reputation jumps");

        let within = vec![dummy_credential(0, 4, 0.4, 0.5), dummy_credential(5, 9, 0.5005, 0.6)];
        v.verify(&within).unwrap();
    }

    #[test]
    fn verify_extends_checks_against_the_stored_tail() {
        let v = dummy_verifier();
        let first = dummy_credential(0, 4, 0.4, 0.5);
        v.verify_extends(None, &first).unwrap();
        v.verify_extends(Some(&first), &dummy_credential(5, 7, 0.45, 0.5))
            .unwrap();
        assert!(v.verify_extends(Some(&first), &dummy_credential(0, 7, 0.45, 0.5)).is_err());
    }

    #[test]
    fn honest_segment_passes_every_sample() {
        let v = dummy_verifier();
        let (enclave, cred, proofs) = dummy_segment(&[0.5, 0.52, 0.55, 0.5, 0.48]);
        let mut rng = StdRng::seed_from_u64(7);

        v.spot_check_with_rng(&cred, &proofs, &enclave.public_key(), proofs.len(), &mut rng)
            .unwrap();
        v.spot_check(&cred, &proofs, &enclave.public_key()).unwrap();
    }

    #[test]
    fn tampered_package_breaks_the_commitment() {
        let v = dummy_verifier();
        let (enclave, cred, mut proofs) = dummy_segment(&[0.5, 0.5, 0.5]);
        proofs[1].challenge_idx ^= 1;

        let err = v
            .spot_check(&cred, &proofs, &enclave.public_key())
            .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid("seg_root mismatch")));
    }

    #[test]
    fn missing_package_is_rejected() {
        let v = dummy_verifier();
        let (enclave, cred, mut proofs) = dummy_segment(&[0.5, 0.5, 0.5]);
        proofs.pop();

        let err = v
            .spot_check(&cred, &proofs, &enclave.public_key())
            .unwrap_err();
        expect_custom(err, "packages were supplied");
        assert!(v.spot_check(&cred, &[], &enclave.public_key()).is_err());
    }

    #[test]
    fn sampled_bad_signature_fails_the_check() {
        let v = dummy_verifier();
        let (enclave, _, mut proofs) = dummy_segment(&[0.5, 0.5, 0.5]);

        // Rebuild a consistent chain whose middle package is signed by
        // another key, then commit to it honestly.
        let other = SimulatedEnclave::from_secret_bytes(&[0x66; HASH_LEN]).unwrap();
        proofs[1].enclave_sig = other.sign(&proofs[1].signing_message()).unwrap();
        proofs[2].prev_hash = proofs[1].content_hash();
        let cred = crate::prover::build_segment_credential(0.5, 0.5, 0, 2, &proofs).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let err = v
            .spot_check_with_rng(&cred, &proofs, &enclave.public_key(), 3, &mut rng)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid("enclave signature mismatch")));
    }

    #[test]
    fn broken_chain_is_detected_when_sampled() {
        let v = dummy_verifier();
        let (enclave, _, mut proofs) = dummy_segment(&[0.5, 0.5, 0.5]);
        proofs[2].prev_hash = ProofHash::GENESIS;
        let cred = crate::prover::build_segment_credential(0.5, 0.5, 0, 2, &proofs).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let err = v
            .spot_check_with_rng(&cred, &proofs, &enclave.public_key(), 3, &mut rng)
            .unwrap_err();
        expect_custom(err, "not chained");
    }

    #[test]
    fn snapshot_outside_band_is_rejected() {
        let v = dummy_verifier();
        let (enclave, cred, proofs) = dummy_segment(&[0.5, 0.5]);
        let narrowed = SegmentCredential {
            rep_low: 0.6,
            rep_high: 0.7,
            ..cred
        };

        let mut rng = StdRng::seed_from_u64(5);
        let err = v
            .spot_check_with_rng(&narrowed, &proofs, &enclave.public_key(), 2, &mut rng)
            .unwrap_err();
        expect_custom(err, "outside band");
    }

    #[test]
    fn zero_sample_spot_check_is_rejected() {
        let (enclave, _, mut proofs) = dummy_segment(&[0.5, 0.5]);

        // Forged signatures under an honest commitment.
        proofs[0].enclave_sig = crate::types::EnclaveSignature([1u8; 64]);
        proofs[1].prev_hash = proofs[0].content_hash();
        proofs[1].enclave_sig = crate::types::EnclaveSignature([1u8; 64]);
        let cred = crate::prover::build_segment_credential(0.5, 0.5, 0, 1, &proofs).unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        let v = dummy_verifier();
        let err = v
            .spot_check_with_rng(&cred, &proofs, &enclave.public_key(), 0, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Invalid("spot-check requires at least one sample")
        ));

        let unsampled = AggregateVerifier::new(
            &ReputationParams::default(),
            &VerifierConfig {
                spot_check_count: 0,
                ..VerifierConfig::default()
            },
        );
        assert!(unsampled.spot_check(&cred, &proofs, &enclave.public_key()).is_err());
    }
}
