//! Top-level protocol configuration.
//!
//! This module aggregates configuration for:
//!
//! - reputation parameters feeding the slot formula (`ReputationParams`),
//! - the reputation update rule (`ReputationPolicy`),
//! - verifier tolerances and spot-check sizing (`VerifierConfig`),
//! - the metrics registry (`MetricsConfig`).
//!
//! Every struct has protocol defaults. `ProtocolConfig` can also be read
//! from JSON, where missing fields fall back to those defaults, and must
//! pass [`ProtocolConfig::validate`] before use.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Reputation parameters agreed at contract deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationParams {
    /// Initial reputation of a newly deployed node.
    pub init_rep: f64,
    /// Drift threshold: reputation consistency tolerance for single
    /// proofs, and the drift that closes a segment.
    pub delta_rep: f64,
    /// Shortest slot, in seconds (reached at reputation 1.0).
    pub t_min: u32,
    /// Longest slot, in seconds (reached at reputation 0.0).
    pub t_max: u32,
}

impl Default for ReputationParams {
    fn default() -> Self {
        Self {
            init_rep: 0.5,
            delta_rep: 0.1,
            t_min: 300,
            t_max: 86_400,
        }
    }
}

/// Bump / penalty rule applied after each verification outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationPolicy {
    /// Increase on a verified proof.
    pub rep_inc: f64,
    /// Decrease on a rejected proof.
    pub rep_dec: f64,
    /// Lower clamp for every score.
    pub min_rep: f64,
    /// Upper clamp for every score.
    pub max_rep: f64,
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            rep_inc: 0.05,
            rep_dec: 0.1,
            min_rep: 0.0,
            max_rep: 1.0,
        }
    }
}

impl ReputationPolicy {
    /// Clamps `rep` into `[min_rep, max_rep]`. NaN maps to `min_rep`.
    ///
    /// Assumes a policy that passed [`ReputationPolicy::validate`].
    pub fn clamp(&self, rep: f64) -> f64 {
        if rep.is_nan() {
            return self.min_rep;
        }
        rep.max(self.min_rep).min(self.max_rep)
    }

    /// Rejects bounds outside `[0, 1]`, inverted bounds and negative steps.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.min_rep) || !unit.contains(&self.max_rep) {
            return Err(invalid("min_rep and max_rep must lie in [0, 1]"));
        }
        if self.min_rep > self.max_rep {
            return Err(invalid("min_rep exceeds max_rep"));
        }
        if !(self.rep_inc >= 0.0) || !(self.rep_dec >= 0.0) {
            return Err(invalid("rep_inc and rep_dec must be non-negative"));
        }
        Ok(())
    }
}

/// Verifier tolerances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Accepted network delay after the end of a slot, in seconds.
    pub max_delay_secs: u32,
    /// Accepted difference between stored and recomputed `t_slot`.
    pub slot_tolerance_secs: u32,
    /// Largest upward step from one credential's `rep_high` to the next
    /// credential's `rep_low`.
    pub rep_continuity_tolerance: f64,
    /// Number of packages re-verified per spot-check.
    pub spot_check_count: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_delay_secs: 30,
            slot_tolerance_secs: 1,
            rep_continuity_tolerance: 0.001,
            spot_check_count: 3,
        }
    }
}

/// Configuration for the Prometheus metrics registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the verification contract records metrics.
    pub enabled: bool,
    /// Prefix applied to every metric name.
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "storage_time".to_string(),
        }
    }
}

/// Top-level configuration for the protocol core.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub reputation: ReputationParams,
    pub policy: ReputationPolicy,
    pub verifier: VerifierConfig,
    pub metrics: MetricsConfig,
}

impl ProtocolConfig {
    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self, ProtocolError> {
        let cfg: ProtocolConfig = serde_json::from_str(json)
            .map_err(|e| ProtocolError::InvalidConfig(format!("malformed JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects inconsistent parameter combinations.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let rep = &self.reputation;
        let policy = &self.policy;
        let verifier = &self.verifier;

        policy.validate()?;
        if !(0.0..=1.0).contains(&rep.init_rep) {
            return Err(invalid("init_rep must lie in [0, 1]"));
        }
        if !(rep.delta_rep >= 0.0) {
            return Err(invalid("delta_rep must be non-negative"));
        }
        if rep.t_min == 0 {
            return Err(invalid("t_min must be at least one second"));
        }
        if rep.t_min > rep.t_max {
            return Err(invalid("t_min exceeds t_max"));
        }
        if !(verifier.rep_continuity_tolerance >= 0.0) {
            return Err(invalid("rep_continuity_tolerance must be non-negative"));
        }
        if verifier.spot_check_count == 0 {
            return Err(invalid("spot_check_count must be at least 1"));
        }
        if self.metrics.prefix.is_empty() {
            return Err(invalid("metrics prefix must not be empty"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> ProtocolError {
    ProtocolError::InvalidConfig(msg.to_string())
}
