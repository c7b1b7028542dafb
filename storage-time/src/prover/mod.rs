//! Prover side of the protocol.
//!
//! - [`challenge`]: random challenges and their block indices,
//! - [`slot`]: the reputation-driven slot formula and the slot timer,
//! - [`builder`]: signed, chained proof packages and segment credentials,
//! - [`chain`]: a stateful per-node proving session that folds runs into
//!   segments on reputation drift.

pub mod builder;
pub mod chain;
pub mod challenge;
pub mod slot;

pub use builder::{ProofBuilder, build_segment_credential, segment_commitment};
pub use chain::{ClosedSegment, ProofChain, SlotOutcome};
pub use challenge::{ChallengeGenerator, calculate_challenge_index};
pub use slot::{SlotSchedule, SlotTimer, clamp_unit};
