//! Storage-time library crate.
//!
//! This crate implements the core of a simulated proof-of-storage-time
//! protocol: a storage node periodically proves it still holds previously
//! stored data by answering random block challenges, signs each answer
//! with a (simulated) enclave key, chains the answers together over time,
//! and is audited more often the more it is trusted.
//!
//! - strongly-typed domain types (`types`),
//! - Merkle trees and inclusion paths (`merkle`),
//! - enclave, randomness and attestation capabilities (`crypto`),
//! - clocks and slot-window arithmetic (`time`),
//! - proof construction and the slot timer (`prover`),
//! - single and aggregate verification (`verification`),
//! - reputation and verification contracts (`contract`),
//! - block storage (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level protocol configuration (`config`).
//!
//! Network transport, durable ledgers and orchestration are left to the
//! embedding service.

pub mod config;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod merkle;
pub mod metrics;
pub mod prover;
pub mod storage;
pub mod time;
pub mod types;
pub mod verification;

// Re-export top-level configuration types.
pub use config::{MetricsConfig, ProtocolConfig, ReputationParams, ReputationPolicy, VerifierConfig};

// Re-export errors.
pub use error::{CryptoError, ProtocolError, ValidationError};

// Re-export capabilities and their default implementations.
pub use crypto::{
    AttestationReport, EcdsaP256Verifier, EnclaveSigner, OsRandomSource, RandomSource,
    SignatureVerifier, SimulatedEnclave,
};
pub use time::{Clock, ManualClock, SystemClock, is_time_valid};

// Re-export the protocol pipeline.
pub use merkle::{MerklePath, MerkleTree, PathStep};
pub use prover::{
    ChallengeGenerator, ClosedSegment, ProofBuilder, ProofChain, SlotOutcome, SlotSchedule,
    SlotTimer, build_segment_credential, calculate_challenge_index,
};
pub use verification::{AggregateVerifier, InclusionEvidence, SingleVerifier};
pub use contract::{ReputationContract, ReputationUpdate, Verdict, VerificationContract};

// Re-export storage and metrics.
pub use metrics::{MetricsRegistry, ProtocolMetrics};
pub use storage::{BlockStore, InMemoryBlockStore, build_merkle_tree};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Proof builder backed by the OS random source.
pub type DefaultProofBuilder = ProofBuilder<OsRandomSource>;

/// Proving session with OS randomness and the simulated enclave.
pub type DefaultProofChain = ProofChain<OsRandomSource, SimulatedEnclave>;

/// Verification contract on the system clock with ECDSA P-256 signatures.
pub type DefaultVerificationContract = VerificationContract<SystemClock, EcdsaP256Verifier>;
