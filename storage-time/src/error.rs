//! Error types.
//!
//! Three kinds of failure are kept apart:
//!
//! - [`ProtocolError`]: malformed or out-of-range input (empty tree, index
//!   out of range, empty proof list, unknown node) and wrapped
//!   [`CryptoError`]s. Always surfaced to the caller, never retried.
//! - [`CryptoError`]: a random, signing or key-parsing primitive failed.
//! - [`ValidationError`]: a structurally valid artefact broke a protocol
//!   rule (stale timestamp, reputation drift, slot-length mismatch, broken
//!   chain or epoch continuity). Verifiers report these; the contract layer
//!   turns them into a "not verified" outcome and a reputation penalty.

use thiserror::Error;

use crate::types::NodeId;

/// Failure of a cryptographic capability.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The random source could not fill the buffer.
    #[error("random source failure: {0}")]
    RandomSource(String),
    /// The enclave could not produce a signature.
    #[error("enclave signing failure: {0}")]
    Signing(String),
    /// A public or secret key could not be parsed.
    #[error("malformed key: {0}")]
    MalformedKey(String),
    /// A signature could not be parsed.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

/// Input errors and capability failures raised by protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The Merkle tree has no leaves.
    #[error("merkle tree is empty")]
    EmptyTree,
    /// A leaf index is outside the tree.
    #[error("leaf index {index} out of range for {leaves} leaves")]
    LeafIndexOutOfRange { index: usize, leaves: usize },
    /// A challenge was requested against zero blocks.
    #[error("total block count must be non-zero")]
    NoBlocks,
    /// A segment credential was requested for an empty run.
    #[error("segment requires at least one proof package")]
    EmptyProofList,
    /// The node is not registered with the reputation contract.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    /// The node is already registered with the reputation contract.
    #[error("node already registered: {0}")]
    NodeExists(NodeId),
    /// Configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Underlying cryptographic capability failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Error type returned when a proof or credential fails verification.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The artefact breaks a fixed protocol rule.
    #[error("not verified: {0}")]
    Invalid(&'static str),
    /// The artefact breaks a rule, with a dynamic message.
    #[error("not verified: {0}")]
    Custom(String),
}
