//! Stateful proving session for one node.
//!
//! [`ProofChain`] keeps what the stateless [`ProofBuilder`] needs from one
//! slot to the next (slot id, slot start, predecessor hash) and the run of
//! packages not yet folded into a segment. A run is folded when the
//! reputation drifts more than `delta_rep` away from the reputation at the
//! start of the run; the package that observed the drift closes the run.

use super::builder::{ProofBuilder, build_segment_credential};
use super::slot::clamp_unit;
use crate::crypto::{EnclaveSigner, RandomSource};
use crate::error::ProtocolError;
use crate::merkle::MerkleTree;
use crate::types::{ProofHash, ProofPackage, SegmentCredential};

/// A folded run: the credential and the packages it commits to.
#[derive(Clone, Debug, PartialEq)]
pub struct ClosedSegment {
    pub credential: SegmentCredential,
    pub proofs: Vec<ProofPackage>,
}

/// Result of proving one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotOutcome {
    pub package: ProofPackage,
    /// Set when this slot closed the current run.
    pub closed: Option<ClosedSegment>,
}

/// Proving session chaining packages over a fixed data tree.
#[derive(Debug)]
pub struct ProofChain<R, S> {
    builder: ProofBuilder<R>,
    enclave: S,
    tree: MerkleTree,
    delta_rep: f64,
    next_slot_id: u64,
    next_t_start: u64,
    prev_hash: ProofHash,
    run: Vec<ProofPackage>,
    run_start_rep: f64,
}

impl<R: RandomSource, S: EnclaveSigner> ProofChain<R, S> {
    /// Starts a session at slot 0 with the genesis predecessor.
    pub fn new(
        builder: ProofBuilder<R>,
        enclave: S,
        tree: MerkleTree,
        delta_rep: f64,
        initial_rep: f64,
        t_start: u64,
    ) -> Self {
        Self {
            builder,
            enclave,
            tree,
            delta_rep,
            next_slot_id: 0,
            next_t_start: t_start,
            prev_hash: ProofHash::GENESIS,
            run: Vec::new(),
            run_start_rep: clamp_unit(initial_rep),
        }
    }

    pub fn next_slot_id(&self) -> u64 {
        self.next_slot_id
    }

    /// Start of the next slot, in milliseconds.
    pub fn next_t_start(&self) -> u64 {
        self.next_t_start
    }

    /// Packages proved since the last fold.
    pub fn pending(&self) -> &[ProofPackage] {
        &self.run
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    /// Builds the next package and folds the run if reputation drifted.
    ///
    /// On error the session state is left untouched.
    pub fn prove_slot(&mut self, current_rep: f64) -> Result<SlotOutcome, ProtocolError> {
        let total_blocks = u32::try_from(self.tree.leaf_count()).unwrap_or(u32::MAX);
        let package = self.builder.build_proof_package(
            &self.enclave,
            &self.tree,
            current_rep,
            self.next_slot_id,
            self.next_t_start,
            self.prev_hash,
            total_blocks,
        )?;

        self.prev_hash = package.content_hash();
        self.next_slot_id += 1;
        self.next_t_start = package.next_slot_start();
        self.run.push(package.clone());

        let drift = (clamp_unit(current_rep) - self.run_start_rep).abs();
        let closed = if drift > self.delta_rep {
            let closed = self.fold()?;
            self.run_start_rep = clamp_unit(current_rep);
            closed
        } else {
            None
        };

        Ok(SlotOutcome { package, closed })
    }

    /// Folds any pending packages into a final segment.
    pub fn flush(&mut self) -> Result<Option<ClosedSegment>, ProtocolError> {
        self.fold()
    }

    fn fold(&mut self) -> Result<Option<ClosedSegment>, ProtocolError> {
        let (Some(first), Some(last)) = (self.run.first(), self.run.last()) else {
            return Ok(None);
        };

        let (rep_low, rep_high) = self
            .run
            .iter()
            .map(|p| p.rep_snapshot)
            .fold((self.run_start_rep, self.run_start_rep), |(lo, hi), r| {
                (lo.min(r), hi.max(r))
            });

        let credential = build_segment_credential(
            rep_low,
            rep_high,
            first.time_slot_id,
            last.time_slot_id,
            &self.run,
        )?;

        tracing::info!(
            epoch_start = credential.epoch_start,
            epoch_end = credential.epoch_end,
            rep_low,
            rep_high,
            "folded segment"
        );

        let proofs = std::mem::take(&mut self.run);
        Ok(Some(ClosedSegment { credential, proofs }))
    }
}
