//! Verification contract: verifiers wired to the reputation registry.
//!
//! Single proofs are verified against the node's current reputation and
//! the clock, and the outcome is applied to the score under the node's
//! lock. Segment credentials must extend the node's stored ledger and
//! pass a spot-check; accepted credentials are appended, rejected ones
//! cost a reputation penalty. Each node's ledger has its own lock, so
//! segment submissions for different nodes do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::reputation::{ReputationContract, Verdict};
use crate::config::VerifierConfig;
use crate::crypto::{EcdsaP256Verifier, SignatureVerifier};
use crate::error::ProtocolError;
use crate::metrics::ProtocolMetrics;
use crate::time::Clock;
use crate::types::{EnclavePublicKey, NodeId, ProofPackage, SegmentCredential};
use crate::verification::{AggregateVerifier, InclusionEvidence, SingleVerifier};

/// Verification front-end over a shared [`ReputationContract`].
pub struct VerificationContract<C, V = EcdsaP256Verifier> {
    reputation: Arc<ReputationContract>,
    verifier: AggregateVerifier<V>,
    clock: C,
    ledgers: Mutex<HashMap<NodeId, Arc<Mutex<Vec<SegmentCredential>>>>>,
    metrics: Option<ProtocolMetrics>,
}

impl<C: Clock> VerificationContract<C, EcdsaP256Verifier> {
    pub fn new(reputation: Arc<ReputationContract>, cfg: &VerifierConfig, clock: C) -> Self {
        Self::with_verifier(reputation, cfg, clock, EcdsaP256Verifier)
    }
}

impl<C: Clock, V: SignatureVerifier> VerificationContract<C, V> {
    /// Builds a contract using a custom signature backend.
    pub fn with_verifier(
        reputation: Arc<ReputationContract>,
        cfg: &VerifierConfig,
        clock: C,
        signatures: V,
    ) -> Self {
        let single = SingleVerifier::with_verifier(reputation.params(), cfg, signatures);
        Self {
            reputation,
            verifier: AggregateVerifier::with_single(single, cfg),
            clock,
            ledgers: Mutex::new(HashMap::new()),
            metrics: None,
        }
    }

    /// Records outcomes into `metrics`.
    pub fn with_metrics(mut self, metrics: ProtocolMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn reputation(&self) -> &Arc<ReputationContract> {
        &self.reputation
    }

    fn ledger_cell(&self, node_id: &NodeId) -> Arc<Mutex<Vec<SegmentCredential>>> {
        Arc::clone(self.ledgers.lock().entry(node_id.clone()).or_default())
    }

    /// Verifies one package submitted now and updates the node's score.
    ///
    /// With `evidence`, the challenged block's inclusion under the data
    /// root is checked as well. Returns whether the package was verified;
    /// an unknown node is an error.
    pub fn submit_single_proof(
        &self,
        node_id: &NodeId,
        proof: &ProofPackage,
        public_key: &EnclavePublicKey,
        evidence: Option<&InclusionEvidence>,
    ) -> Result<bool, ProtocolError> {
        let submit_ms = self.clock.now_ms();
        let timer = self
            .metrics
            .as_ref()
            .map(|m| m.verification_seconds.start_timer());
        let single = self.verifier.single();
        let max_delay = self.verifier.max_delay_secs();

        let update = self.reputation.evaluate(node_id, |current_rep| {
            let result = match evidence {
                Some(ev) => single.verify_with_inclusion(
                    proof,
                    public_key,
                    current_rep,
                    submit_ms,
                    max_delay,
                    ev,
                ),
                None => single.verify(proof, public_key, current_rep, submit_ms, max_delay),
            };
            if let Err(e) = &result {
                tracing::warn!(node = %node_id, slot = proof.time_slot_id, "proof rejected: {e}");
            }
            Verdict::from_verified(result.is_ok())
        })?;

        if let Some(timer) = timer {
            timer.observe_duration();
        }
        let verified = update.verdict == Verdict::Reward;
        if let Some(m) = &self.metrics {
            if verified {
                m.proofs_accepted.inc();
            } else {
                m.proofs_rejected.inc();
            }
            m.last_reputation.set(update.current);
        }
        Ok(verified)
    }

    /// Checks `credential` against the node's ledger, spot-checks it
    /// against `proofs` and appends it on success.
    ///
    /// A rejected credential costs the node a reputation penalty; an
    /// accepted one leaves the score unchanged.
    pub fn submit_segment_credential(
        &self,
        node_id: &NodeId,
        credential: &SegmentCredential,
        proofs: &[ProofPackage],
        public_key: &EnclavePublicKey,
    ) -> Result<bool, ProtocolError> {
        if !self.reputation.has_node(node_id) {
            return Err(ProtocolError::UnknownNode(node_id.clone()));
        }

        // Held across verification so appends for a node stay ordered.
        let cell = self.ledger_cell(node_id);
        let mut ledger = cell.lock();
        let tail = ledger.last();
        let result = self
            .verifier
            .verify_extends(tail, credential)
            .and_then(|()| self.verifier.spot_check(credential, proofs, public_key));

        match result {
            Ok(()) => {
                ledger.push(credential.clone());
                tracing::info!(
                    node = %node_id,
                    epoch_start = credential.epoch_start,
                    epoch_end = credential.epoch_end,
                    "segment credential accepted"
                );
                if let Some(m) = &self.metrics {
                    m.segments_accepted.inc();
                }
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(
                    node = %node_id,
                    epoch_start = credential.epoch_start,
                    epoch_end = credential.epoch_end,
                    "segment credential rejected: {e}"
                );
                let update = self.reputation.evaluate(node_id, |_| Verdict::Penalize)?;
                if let Some(m) = &self.metrics {
                    m.segments_rejected.inc();
                    m.last_reputation.set(update.current);
                }
                Ok(false)
            }
        }
    }

    /// Credentials accepted for `node_id`, in epoch order.
    pub fn get_node_credentials(&self, node_id: &NodeId) -> Vec<SegmentCredential> {
        let cell = self.ledgers.lock().get(node_id).cloned();
        cell.map(|c| c.lock().clone()).unwrap_or_default()
    }
}
