//! Proof-package and segment-credential assembly.
//!
//! The builder is stateless with respect to the chain: the caller passes
//! the slot id, slot start and predecessor hash for every package, and
//! the enclave and data tree at call time. See [`super::ProofChain`] for
//! the stateful proving session built on top of it.

use super::challenge::{ChallengeGenerator, calculate_challenge_index};
use super::slot::{SlotSchedule, clamp_unit};
use crate::crypto::{EnclaveSigner, RandomSource};
use crate::error::ProtocolError;
use crate::merkle::MerkleTree;
use crate::types::proof::signing_message;
use crate::types::{AnchorHash, Hash256, ProofHash, ProofPackage, SegmentCredential};

/// Assembles chained proof packages and segment credentials.
#[derive(Clone, Debug)]
pub struct ProofBuilder<R> {
    schedule: SlotSchedule,
    challenges: ChallengeGenerator<R>,
}

impl<R: RandomSource> ProofBuilder<R> {
    pub fn new(schedule: SlotSchedule, random: R) -> Self {
        Self {
            schedule,
            challenges: ChallengeGenerator::new(random),
        }
    }

    pub fn schedule(&self) -> &SlotSchedule {
        &self.schedule
    }

    /// Builds and signs the proof package for one slot.
    ///
    /// `current_rep` is clamped into `[0, 1]` before it is recorded as the
    /// snapshot and fed to the slot formula. The challenged block must be
    /// present in `tree`.
    #[allow(clippy::too_many_arguments)]
    pub fn build_proof_package<S: EnclaveSigner>(
        &self,
        enclave: &S,
        tree: &MerkleTree,
        current_rep: f64,
        time_slot_id: u64,
        t_start: u64,
        prev_hash: ProofHash,
        total_blocks: u32,
    ) -> Result<ProofPackage, ProtocolError> {
        let random_r = self.challenges.generate_random_challenge()?;
        let challenge_idx = calculate_challenge_index(&random_r, total_blocks)?;
        let path = tree.get_proof(challenge_idx as usize)?;

        let rep_snapshot = clamp_unit(current_rep);
        let t_slot = self.schedule.slot_length(rep_snapshot);

        let message = signing_message(time_slot_id, t_start, t_slot, rep_snapshot, &random_r);
        let enclave_sig = enclave.sign(&message)?;

        tracing::debug!(
            time_slot_id,
            challenge_idx,
            t_slot,
            rep_snapshot,
            "built proof package"
        );

        Ok(ProofPackage {
            time_slot_id,
            prev_hash,
            rep_snapshot,
            t_slot,
            random_r,
            challenge_idx,
            merkle_path: path.encode(),
            enclave_sig,
            t_start,
        })
    }
}

/// Folds a run of packages into a [`SegmentCredential`].
///
/// `proofs` must be in chronological order; the bounds and band are taken
/// as given.
pub fn build_segment_credential(
    rep_low: f64,
    rep_high: f64,
    epoch_start: u64,
    epoch_end: u64,
    proofs: &[ProofPackage],
) -> Result<SegmentCredential, ProtocolError> {
    let (seg_root, anchor_hash) = segment_commitment(proofs)?;
    Ok(SegmentCredential {
        rep_low,
        rep_high,
        epoch_start,
        epoch_end,
        seg_root,
        anchor_hash,
    })
}

/// Merkle root over the packages' content hashes, and the anchor built
/// from the first and last of them.
pub fn segment_commitment(proofs: &[ProofPackage]) -> Result<(Hash256, AnchorHash), ProtocolError> {
    let hashes: Vec<ProofHash> = proofs.iter().map(ProofPackage::content_hash).collect();
    let (Some(first), Some(last)) = (hashes.first(), hashes.last()) else {
        return Err(ProtocolError::EmptyProofList);
    };
    let anchor = AnchorHash::from_ends(first, last);

    let tree = MerkleTree::new(hashes.iter().map(|h| h.0).collect());
    let root = tree.root().ok_or(ProtocolError::EmptyTree)?;
    Ok((root, anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EcdsaP256Verifier, SignatureVerifier, SimulatedEnclave};
    use crate::merkle::MerklePath;
    use crate::prover::challenge::tests::{CountingRandom, FailingRandom};
    use crate::types::HASH_LEN;

    const T0: u64 = 1_700_000_000_000;

    fn dummy_tree(n: u8) -> MerkleTree {
        MerkleTree::new((0..n).map(|i| Hash256([i; HASH_LEN])).collect())
    }

    fn dummy_enclave() -> SimulatedEnclave {
        SimulatedEnclave::from_secret_bytes(&[0x11; HASH_LEN]).unwrap()
    }

    fn dummy_builder() -> ProofBuilder<CountingRandom> {
        ProofBuilder::new(SlotSchedule::default(), CountingRandom::default())
    }

    #[test]
    fn package_is_signed_and_inclusion_checks() {
        let builder = dummy_builder();
        let enclave = dummy_enclave();
        let tree = dummy_tree(4);

        let p = builder
            .build_proof_package(&enclave, &tree, 0.5, 0, T0, ProofHash::GENESIS, 4)
            .unwrap();

        assert_eq!(p.t_slot, 43_350);
        assert_eq!(p.rep_snapshot, 0.5);
        assert_eq!(p.prev_hash, ProofHash::GENESIS);
        assert_eq!(p.challenge_idx, calculate_challenge_index(&p.random_r, 4).unwrap());

        let ok = EcdsaP256Verifier
            .verify(&enclave.public_key(), &p.signing_message(), &p.enclave_sig)
            .unwrap();
        assert!(ok);

        let path = MerklePath::decode(&p.merkle_path).expect("well-formed path");
        let leaf = tree.leaf(p.challenge_idx as usize).unwrap();
        assert!(MerkleTree::verify_proof(leaf, &path, &tree.root().unwrap()));
    }

    #[test]
    fn snapshot_is_clamped() {
        let builder = dummy_builder();
        let p = builder
            .build_proof_package(&dummy_enclave(), &dummy_tree(2), 1.4, 0, T0, ProofHash::GENESIS, 2)
            .unwrap();
        assert_eq!(p.rep_snapshot, 1.0);
        assert_eq!(p.t_slot, 300);
    }

    #[test]
    fn empty_tree_cannot_be_challenged() {
        let builder = dummy_builder();
        let err = builder
            .build_proof_package(&dummy_enclave(), &MerkleTree::default(), 0.5, 0, T0, ProofHash::GENESIS, 4)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyTree));
    }

    #[test]
    fn block_count_larger_than_tree_is_rejected() {
        // CountingRandom's first challenge starts 00 01 02 03, index 0x03020100 % 1000.
        let builder = dummy_builder();
        let err = builder
            .build_proof_package(&dummy_enclave(), &dummy_tree(2), 0.5, 0, T0, ProofHash::GENESIS, 1000)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::LeafIndexOutOfRange { .. }));
    }

    #[test]
    fn zero_blocks_is_rejected() {
        let builder = dummy_builder();
        let err = builder
            .build_proof_package(&dummy_enclave(), &dummy_tree(2), 0.5, 0, T0, ProofHash::GENESIS, 0)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NoBlocks));
    }

    #[test]
    fn random_failure_aborts_the_build() {
        let builder = ProofBuilder::new(SlotSchedule::default(), FailingRandom::after(0));
        let err = builder
            .build_proof_package(&dummy_enclave(), &dummy_tree(2), 0.5, 0, T0, ProofHash::GENESIS, 2)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Crypto(_)));
    }

    #[test]
    fn segment_credential_commits_to_every_package() {
        let builder = dummy_builder();
        let enclave = dummy_enclave();
        let tree = dummy_tree(4);

        let mut proofs = Vec::new();
        let mut prev = ProofHash::GENESIS;
        for slot in 0..3u64 {
            let p = builder
                .build_proof_package(&enclave, &tree, 0.5, slot, T0 + slot, prev, 4)
                .unwrap();
            prev = p.content_hash();
            proofs.push(p);
        }

        let cred = build_segment_credential(0.45, 0.55, 0, 2, &proofs).unwrap();
        let leaves: Vec<Hash256> = proofs.iter().map(|p| p.content_hash().0).collect();

        assert_eq!(Some(cred.seg_root), MerkleTree::new(leaves).root());
        assert_eq!(
            cred.anchor_hash,
            AnchorHash::from_ends(&proofs[0].content_hash(), &proofs[2].content_hash())
        );
        assert_eq!((cred.epoch_start, cred.epoch_end), (0, 2));

        let mut tampered = proofs.clone();
        tampered[1].challenge_idx ^= 1;
        let other = build_segment_credential(0.45, 0.55, 0, 2, &tampered).unwrap();
        assert_ne!(other.seg_root, cred.seg_root);
        assert_eq!(other.anchor_hash, cred.anchor_hash);
    }

    #[test]
    fn single_package_segment_anchors_to_itself() {
        let builder = dummy_builder();
        let p = builder
            .build_proof_package(&dummy_enclave(), &dummy_tree(1), 0.5, 0, T0, ProofHash::GENESIS, 1)
            .unwrap();
        let cred = build_segment_credential(0.5, 0.5, 0, 0, std::slice::from_ref(&p)).unwrap();

        assert_eq!(cred.seg_root, p.content_hash().0);
        assert_eq!(cred.anchor_hash, AnchorHash::from_ends(&p.content_hash(), &p.content_hash()));
    }

    #[test]
    fn empty_segment_is_rejected() {
        let err = build_segment_credential(0.4, 0.6, 0, 0, &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyProofList));
    }
}
