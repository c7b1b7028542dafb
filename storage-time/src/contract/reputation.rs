//! Reputation registry.
//!
//! One explicitly constructed [`ReputationContract`] owns every node's
//! score. Scores live behind per-node locks so that a read, a
//! verification and the resulting update for one node happen as a single
//! step ([`ReputationContract::evaluate`]) while other nodes proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{ReputationParams, ReputationPolicy};
use crate::error::ProtocolError;
use crate::types::NodeId;

/// How an evaluation changes a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Add `rep_inc`, clamped at `max_rep`.
    Reward,
    /// Subtract `rep_dec`, clamped at `min_rep`.
    Penalize,
    /// Leave the score unchanged.
    Keep,
}

impl Verdict {
    pub fn from_verified(verified: bool) -> Self {
        if verified {
            Verdict::Reward
        } else {
            Verdict::Penalize
        }
    }
}

/// Score change produced by one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReputationUpdate {
    pub verdict: Verdict,
    pub previous: f64,
    pub current: f64,
}

/// Per-node reputation registry.
#[derive(Debug)]
pub struct ReputationContract {
    params: ReputationParams,
    policy: ReputationPolicy,
    nodes: Mutex<HashMap<NodeId, Arc<Mutex<f64>>>>,
}

impl ReputationContract {
    /// Creates an empty registry.
    ///
    /// Fails with [`ProtocolError::InvalidConfig`] if `policy` does not
    /// validate.
    pub fn new(params: ReputationParams, policy: ReputationPolicy) -> Result<Self, ProtocolError> {
        policy.validate()?;
        Ok(Self {
            params,
            policy,
            nodes: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a registry with `node_id` registered at `params.init_rep`.
    pub fn deploy(
        params: ReputationParams,
        policy: ReputationPolicy,
        node_id: NodeId,
    ) -> Result<Self, ProtocolError> {
        let contract = Self::new(params, policy)?;
        let initial = contract.policy.clamp(contract.params.init_rep);
        contract
            .nodes
            .lock()
            .insert(node_id, Arc::new(Mutex::new(initial)));
        Ok(contract)
    }

    pub fn params(&self) -> &ReputationParams {
        &self.params
    }

    pub fn policy(&self) -> &ReputationPolicy {
        &self.policy
    }

    /// Registers `node_id` with `initial_rep`, clamped into bounds. NaN
    /// registers at `min_rep`.
    pub fn add_node(&self, node_id: NodeId, initial_rep: f64) -> Result<(), ProtocolError> {
        let mut nodes = self.nodes.lock();
        if nodes.contains_key(&node_id) {
            return Err(ProtocolError::NodeExists(node_id));
        }
        let initial = self.policy.clamp(initial_rep);
        tracing::info!(node = %node_id, initial, "registered node");
        nodes.insert(node_id, Arc::new(Mutex::new(initial)));
        Ok(())
    }

    pub fn has_node(&self, node_id: &NodeId) -> bool {
        self.nodes.lock().contains_key(node_id)
    }

    /// Registered node ids, in no particular order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.lock().keys().cloned().collect()
    }

    fn cell(&self, node_id: &NodeId) -> Result<Arc<Mutex<f64>>, ProtocolError> {
        self.nodes
            .lock()
            .get(node_id)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownNode(node_id.clone()))
    }

    pub fn get_reputation(&self, node_id: &NodeId) -> Result<f64, ProtocolError> {
        Ok(*self.cell(node_id)?.lock())
    }

    fn apply(&self, rep: f64, verdict: Verdict) -> f64 {
        match verdict {
            Verdict::Reward => self.policy.clamp(rep + self.policy.rep_inc),
            Verdict::Penalize => self.policy.clamp(rep - self.policy.rep_dec),
            Verdict::Keep => rep,
        }
    }

    /// Applies the bump or penalty for one verification outcome and
    /// returns the new score.
    pub fn update_reputation(&self, node_id: &NodeId, success: bool) -> Result<f64, ProtocolError> {
        self.evaluate(node_id, |_| Verdict::from_verified(success))
            .map(|update| update.current)
    }

    /// Runs `judge` on the node's current score and applies its verdict,
    /// holding the node's lock throughout.
    pub fn evaluate<F>(&self, node_id: &NodeId, judge: F) -> Result<ReputationUpdate, ProtocolError>
    where
        F: FnOnce(f64) -> Verdict,
    {
        let cell = self.cell(node_id)?;
        let mut score = cell.lock();

        let previous = *score;
        let verdict = judge(previous);
        let current = self.apply(previous, verdict);
        *score = current;

        tracing::debug!(node = %node_id, ?verdict, previous, current, "reputation evaluated");
        Ok(ReputationUpdate {
            verdict,
            previous,
            current,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn dummy_contract() -> ReputationContract {
        ReputationContract::deploy(
            ReputationParams::default(),
            ReputationPolicy::default(),
            NodeId::from("node_001"),
        )
        .unwrap()
    }

    #[test]
    fn deploy_registers_node_at_initial_reputation() {
        let c = dummy_contract();
        assert!(c.has_node(&NodeId::from("node_001")));
        assert_eq!(c.get_reputation(&NodeId::from("node_001")).unwrap(), 0.5);
        assert_eq!(c.params().t_min, 300);
    }

    #[test]
    fn unknown_node_is_an_error() {
        let c = dummy_contract();
        let ghost = NodeId::from("ghost");
        assert!(matches!(
            c.get_reputation(&ghost),
            Err(ProtocolError::UnknownNode(_))
        ));
        assert!(c.update_reputation(&ghost, true).is_err());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let c = dummy_contract();
        let err = c.add_node(NodeId::from("node_001"), 0.9).unwrap_err();
        assert!(matches!(err, ProtocolError::NodeExists(_)));
        assert_eq!(c.get_reputation(&NodeId::from("node_001")).unwrap(), 0.5);
    }

    #[test]
    fn initial_reputation_is_clamped() {
        let c = dummy_contract();
        c.add_node(NodeId::from("high"), 3.0).unwrap();
        c.add_node(NodeId::from("low"), -1.0).unwrap();
        assert_eq!(c.get_reputation(&NodeId::from("high")).unwrap(), 1.0);
        assert_eq!(c.get_reputation(&NodeId::from("low")).unwrap(), 0.0);
        assert_eq!(c.node_ids().len(), 3);
    }

    #[test]
    fn nan_registration_starts_at_the_floor() {
        let c = dummy_contract();
        let node = NodeId::from("nan");
        c.add_node(node.clone(), f64::NAN).unwrap();
        assert_eq!(c.get_reputation(&node).unwrap(), 0.0);

        for _ in 0..3 {
            c.update_reputation(&node, true).unwrap();
        }
        let rep = c.get_reputation(&node).unwrap();
        assert!((rep - 0.15).abs() < 1e-12, "score {rep}");
    }

    #[test]
    fn inverted_policy_is_rejected_at_construction() {
        let policy = ReputationPolicy {
            min_rep: 0.8,
            max_rep: 0.2,
            ..ReputationPolicy::default()
        };
        let err = ReputationContract::new(ReputationParams::default(), policy.clone()).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfig(_)));
        assert!(
            ReputationContract::deploy(ReputationParams::default(), policy, NodeId::from("n"))
                .is_err()
        );
    }

    #[test]
    fn success_and_failure_move_the_score() {
        let c = dummy_contract();
        let node = NodeId::from("node_001");

        let up = c.update_reputation(&node, true).unwrap();
        assert!((up - 0.55).abs() < 1e-12);
        let down = c.update_reputation(&node, false).unwrap();
        assert!((down - 0.45).abs() < 1e-12);
    }

    #[test]
    fn score_stays_within_bounds() {
        let c = dummy_contract();
        let node = NodeId::from("node_001");

        for _ in 0..50 {
            c.update_reputation(&node, true).unwrap();
        }
        assert_eq!(c.get_reputation(&node).unwrap(), 1.0);

        for _ in 0..50 {
            c.update_reputation(&node, false).unwrap();
        }
        assert_eq!(c.get_reputation(&node).unwrap(), 0.0);
    }

    #[test]
    fn evaluate_reports_the_judged_score() {
        let c = dummy_contract();
        let node = NodeId::from("node_001");

        let update = c
            .evaluate(&node, |rep| {
                assert_eq!(rep, 0.5);
                Verdict::Keep
            })
            .unwrap();
        assert_eq!(update.previous, 0.5);
        assert_eq!(update.current, 0.5);
        assert_eq!(update.verdict, Verdict::Keep);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let c = Arc::new(ReputationContract::new(
            ReputationParams::default(),
            ReputationPolicy {
                rep_inc: 0.001,
                ..ReputationPolicy::default()
            },
        )
        .unwrap());
        let node = NodeId::from("busy");
        c.add_node(node.clone(), 0.0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&c);
                let node = node.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        c.update_reputation(&node, true).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let rep = c.get_reputation(&node).unwrap();
        assert!((rep - 0.4).abs() < 1e-9, "lost updates: {rep}");
    }
}
